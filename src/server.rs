//! HTTP binding of the orchestration and mock surfaces.
//!
//! Two routers: the control API (generate, start/stop mock, status, health)
//! and the mock listener, which answers every method and path from the
//! active session.

use crate::contract::Contract;
use crate::error::MockError;
use crate::orchestrator::SpecOrchestrator;
use crate::session::MockSessionController;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Header telling clients whether a mock answer came from the contract.
pub const MOCK_ROUTE_HEADER: &str = "x-mock-route";

/// Shared state of the control API.
pub struct AppState {
    pub orchestrator: SpecOrchestrator,
    pub session: Arc<MockSessionController>,
}

pub type SharedState = Arc<AppState>;

/// Build the control API router.
pub fn control_router(state: SharedState, cors_permissive: bool) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/generate-spec", post(generate_spec_handler))
        .route("/start-mock", post(start_mock_handler))
        .route("/stop-mock", post(stop_mock_handler))
        .route("/mock-status", get(mock_status_handler))
        .with_state(state);

    let router = if cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };
    router.layer(TraceLayer::new_for_http())
}

/// Build the mock listener router.
pub fn mock_router(session: Arc<MockSessionController>) -> Router {
    Router::new()
        .fallback(mock_handler)
        .with_state(session)
        .layer(TraceLayer::new_for_http())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Default, Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    requirement: String,
}

/// Bodies are read as raw bytes so a missing content type or an empty body
/// does not turn into a 415.
async fn generate_spec_handler(State(state): State<SharedState>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateRequest::default()
    } else {
        match serde_json::from_slice::<GenerateRequest>(&body) {
            Ok(request) => request,
            Err(err) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &format!("invalid request body: {}", err),
                )
            }
        }
    };

    match state.orchestrator.generate(&request.requirement).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

#[derive(Deserialize)]
struct StartMockRequest {
    #[serde(default, alias = "contract")]
    openapi: Option<Value>,
}

async fn start_mock_handler(State(state): State<SharedState>, body: Bytes) -> Response {
    // An absent or unreadable body carries no contract
    let contract = serde_json::from_slice::<StartMockRequest>(&body)
        .ok()
        .and_then(|request| request.openapi)
        .map(Contract::new)
        .filter(|contract| !contract.is_blank());

    match state.session.start(contract).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err @ MockError::ContractRequired) | Err(err @ MockError::InvalidContract(_)) => {
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

async fn stop_mock_handler(State(state): State<SharedState>) -> Response {
    Json(state.session.stop().await).into_response()
}

async fn mock_status_handler(State(state): State<SharedState>) -> Response {
    Json(state.session.status().await).into_response()
}

async fn mock_handler(
    State(session): State<Arc<MockSessionController>>,
    method: Method,
    uri: Uri,
) -> Response {
    let path = uri.path();
    match session.handle(method.as_str(), path).await {
        Ok(mock) => {
            let status = StatusCode::from_u16(mock.status).unwrap_or(StatusCode::OK);
            let response = match mock.body {
                Some(body) => (status, Json(body)).into_response(),
                None => status.into_response(),
            };
            with_route_header(response, "matched")
        }
        Err(err @ MockError::UnmatchedRoute { .. }) => {
            let body = json!({"error": "unmatched_route", "message": err.to_string()});
            with_route_header((StatusCode::NOT_FOUND, Json(body)).into_response(), "unmatched")
        }
        Err(err) => {
            let body = json!({"error": "no_session", "message": err.to_string()});
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

fn with_route_header(mut response: Response, value: &'static str) -> Response {
    response
        .headers_mut()
        .insert(MOCK_ROUTE_HEADER, HeaderValue::from_static(value));
    response
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
