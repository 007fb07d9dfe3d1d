//! Mock session lifecycle.
//!
//! One controller per process, passed by handle to whoever serves mock
//! traffic. A repeated `start` while a session is active is idempotent: it
//! returns the running session's URL and leaves its contract in place.

use crate::contract::Contract;
use crate::error::MockError;
use crate::matcher::MatcherTable;
use crate::synthesizer::{synthesize, MockResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// State of an active session.
struct ActiveSession {
    contract: Contract,
    matchers: MatcherTable,
    started_at: DateTime<Utc>,
}

/// Answer to `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartOutcome {
    pub message: String,
    pub mock_url: String,
    pub already_running: bool,
}

/// Answer to `stop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopOutcome {
    pub stopped: bool,
    pub message: String,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub paths: Vec<String>,
    pub requests_total: u64,
    pub requests_matched: u64,
    pub requests_unmatched: u64,
    pub requests_without_session: u64,
}

/// Logging switches for per-request mock traffic.
#[derive(Debug, Clone, Copy)]
pub struct SessionLogging {
    pub log_matches: bool,
    pub log_unmatched: bool,
}

impl Default for SessionLogging {
    fn default() -> Self {
        Self {
            log_matches: true,
            log_unmatched: true,
        }
    }
}

/// Mock session controller.
pub struct MockSessionController {
    base_url: String,
    logging: SessionLogging,
    state: RwLock<Option<ActiveSession>>,
    /// Total requests processed.
    requests_total: AtomicU64,
    /// Total requests matched to an operation.
    requests_matched: AtomicU64,
    /// Total requests with no route in the active contract.
    requests_unmatched: AtomicU64,
    /// Total requests received while no session was active.
    requests_without_session: AtomicU64,
}

impl MockSessionController {
    /// Create an inactive controller serving under `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_logging(base_url, SessionLogging::default())
    }

    pub fn with_logging(base_url: impl Into<String>, logging: SessionLogging) -> Self {
        Self {
            base_url: base_url.into(),
            logging,
            state: RwLock::new(None),
            requests_total: AtomicU64::new(0),
            requests_matched: AtomicU64::new(0),
            requests_unmatched: AtomicU64::new(0),
            requests_without_session: AtomicU64::new(0),
        }
    }

    /// Start a session for `contract`.
    pub async fn start(&self, contract: Option<Contract>) -> Result<StartOutcome, MockError> {
        let contract = contract
            .filter(|c| !c.is_blank())
            .ok_or(MockError::ContractRequired)?;

        let mut state = self.state.write().await;
        if state.is_some() {
            info!(mock_url = %self.base_url, "Mock session already running");
            return Ok(StartOutcome {
                message: "Mock server already running".to_string(),
                mock_url: self.base_url.clone(),
                already_running: true,
            });
        }

        let matchers = MatcherTable::compile(&contract)?;
        info!(
            mock_url = %self.base_url,
            paths = matchers.len(),
            "Mock session started"
        );

        *state = Some(ActiveSession {
            contract,
            matchers,
            started_at: Utc::now(),
        });

        Ok(StartOutcome {
            message: "Mock server started".to_string(),
            mock_url: self.base_url.clone(),
            already_running: false,
        })
    }

    /// Stop the session. Stopping an inactive controller is a no-op.
    pub async fn stop(&self) -> StopOutcome {
        match self.state.write().await.take() {
            Some(_) => {
                info!("Mock session stopped");
                StopOutcome {
                    stopped: true,
                    message: "Mock server stopped".to_string(),
                }
            }
            None => StopOutcome {
                stopped: false,
                message: "Mock server is not running".to_string(),
            },
        }
    }

    /// Answer one mock request.
    pub async fn handle(&self, method: &str, path: &str) -> Result<MockResponse, MockError> {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let state = self.state.read().await;
        let Some(session) = state.as_ref() else {
            self.requests_without_session.fetch_add(1, Ordering::Relaxed);
            return Err(MockError::NoSession);
        };

        match session.matchers.find_match(method, path) {
            Some(result) => {
                self.requests_matched.fetch_add(1, Ordering::Relaxed);
                if self.logging.log_matches {
                    info!(
                        template = %result.matcher.path_template,
                        method = %method,
                        path = %path,
                        "Request matched operation"
                    );
                }
                Ok(synthesize(result.operation, method, path))
            }
            None => {
                self.requests_unmatched.fetch_add(1, Ordering::Relaxed);
                if self.logging.log_unmatched {
                    warn!(method = %method, path = %path, "No matching operation found");
                }
                Err(MockError::UnmatchedRoute {
                    method: method.to_uppercase(),
                    path: path.to_string(),
                })
            }
        }
    }

    /// The contract of the active session.
    pub async fn contract(&self) -> Option<Contract> {
        self.state.read().await.as_ref().map(|s| s.contract.clone())
    }

    pub async fn is_active(&self) -> bool {
        self.state.read().await.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn status(&self) -> SessionStatus {
        let state = self.state.read().await;
        SessionStatus {
            active: state.is_some(),
            mock_url: state.as_ref().map(|_| self.base_url.clone()),
            started_at: state.as_ref().map(|s| s.started_at),
            paths: state
                .as_ref()
                .map(|s| {
                    s.matchers
                        .matchers()
                        .iter()
                        .map(|m| m.path_template.clone())
                        .collect()
                })
                .unwrap_or_default(),
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_matched: self.requests_matched.load(Ordering::Relaxed),
            requests_unmatched: self.requests_unmatched.load(Ordering::Relaxed),
            requests_without_session: self.requests_without_session.load(Ordering::Relaxed),
        }
    }
}
