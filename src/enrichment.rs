//! Optional enrichment collaborators.
//!
//! Each collaborator answers with a typed report. When it cannot (transport
//! failure, timeout, non-2xx, malformed body) the call degrades to a fixed
//! fallback report instead of failing.

use crate::config::EndpointConfig;
use crate::error::CollaboratorError;
use crate::transport::Transport;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A report produced by one optional collaborator.
pub trait EnrichmentPayload: Clone + Serialize + DeserializeOwned + Send + Sync {
    /// Collaborator name used in logs.
    const COLLABORATOR: &'static str;

    /// Parse a collaborator answer.
    fn from_body(body: Value) -> Result<Self, CollaboratorError> {
        serde_json::from_value(body).map_err(|e| CollaboratorError::MalformedBody(e.to_string()))
    }
}

/// Structural validation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Default fallback when the validator cannot answer.
    pub fn unavailable() -> Self {
        Self {
            valid: false,
            errors: vec!["validation unavailable".to_string()],
        }
    }
}

/// Validator answers may carry lint objects instead of plain messages.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawIssue {
    Text(String),
    Lint { message: String },
    Other(Value),
}

#[derive(Deserialize)]
struct RawValidation {
    valid: bool,
    #[serde(default)]
    errors: Vec<RawIssue>,
}

impl EnrichmentPayload for ValidationReport {
    const COLLABORATOR: &'static str = "validator";

    fn from_body(body: Value) -> Result<Self, CollaboratorError> {
        // `{status, service, result: {valid, errors, ...}}` envelope
        let body = match body {
            Value::Object(mut envelope) if !envelope.contains_key("valid") => {
                match envelope.remove("result") {
                    Some(result @ Value::Object(_)) => result,
                    _ => Value::Object(envelope),
                }
            }
            other => other,
        };

        let raw: RawValidation = serde_json::from_value(body)
            .map_err(|e| CollaboratorError::MalformedBody(e.to_string()))?;

        Ok(Self {
            valid: raw.valid,
            errors: raw
                .errors
                .into_iter()
                .map(|issue| match issue {
                    RawIssue::Text(text) => text,
                    RawIssue::Lint { message } => message,
                    RawIssue::Other(value) => value.to_string(),
                })
                .collect(),
        })
    }
}

/// Ambiguities found in the requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguityReport {
    pub ambiguities: Vec<String>,
    #[serde(alias = "clarificationQuestions")]
    pub clarification_questions: Vec<String>,
}

impl EnrichmentPayload for AmbiguityReport {
    const COLLABORATOR: &'static str = "ambiguity";
}

/// Security findings on the contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityReport {
    pub issues: Vec<SecurityIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityIssue {
    pub severity: String,
    pub message: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

impl EnrichmentPayload for SecurityReport {
    const COLLABORATOR: &'static str = "security";
}

/// Outcome of one optional collaborator call.
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment<T> {
    /// The collaborator answered with a well-formed report.
    Completed(T),
    /// The collaborator could not answer; `fallback` stands in.
    Degraded { fallback: T, reason: CollaboratorError },
}

impl<T> Enrichment<T> {
    /// The report, whichever way it was obtained.
    pub fn value(&self) -> &T {
        match self {
            Enrichment::Completed(value) => value,
            Enrichment::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Enrichment::Completed(value) => value,
            Enrichment::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Enrichment::Degraded { .. })
    }
}

/// Only the report is serialized; degradation stays internal.
impl<T: Serialize> Serialize for Enrichment<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

/// Bounded, single-shot calls to collaborators.
#[derive(Clone)]
pub struct EnrichmentClient {
    transport: Arc<dyn Transport>,
}

impl EnrichmentClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Call an optional collaborator, degrading to `fallback` on any failure.
    pub async fn invoke<T: EnrichmentPayload>(
        &self,
        endpoint: &EndpointConfig,
        payload: Value,
        fallback: &T,
    ) -> Enrichment<T> {
        let url = endpoint.endpoint();
        match self
            .call(&url, &payload, endpoint.timeout())
            .await
            .and_then(T::from_body)
        {
            Ok(report) => {
                debug!(collaborator = T::COLLABORATOR, endpoint = %url, "Collaborator answered");
                Enrichment::Completed(report)
            }
            Err(reason) => {
                warn!(
                    collaborator = T::COLLABORATOR,
                    endpoint = %url,
                    error = %reason,
                    "Collaborator unavailable, using fallback"
                );
                Enrichment::Degraded {
                    fallback: fallback.clone(),
                    reason,
                }
            }
        }
    }

    /// One call with the timeout enforced around the transport.
    pub async fn call(
        &self,
        url: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Value, CollaboratorError> {
        match tokio::time::timeout(timeout, self.transport.post_json(url, payload, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FakeTransport, Reply};
    use serde_json::json;

    const URL: &str = "http://validator.test/validate";

    fn endpoint() -> EndpointConfig {
        EndpointConfig::new("http://validator.test", "/validate", 500)
    }

    fn client(transport: FakeTransport) -> EnrichmentClient {
        EnrichmentClient::new(Arc::new(transport))
    }

    #[tokio::test]
    async fn test_completed_verbatim() {
        let client = client(
            FakeTransport::new().with(URL, Reply::Json(json!({"valid": true, "errors": []}))),
        );

        let result = client
            .invoke(&endpoint(), json!({}), &ValidationReport::unavailable())
            .await;

        assert!(!result.is_degraded());
        assert_eq!(
            result.into_value(),
            ValidationReport {
                valid: true,
                errors: vec![]
            }
        );
    }

    #[tokio::test]
    async fn test_transport_failure_degrades() {
        let client = client(FakeTransport::new());

        let result = client
            .invoke(&endpoint(), json!({}), &ValidationReport::unavailable())
            .await;

        assert!(result.is_degraded());
        assert_eq!(result.value(), &ValidationReport::unavailable());
    }

    #[tokio::test]
    async fn test_status_failure_degrades() {
        let client = client(FakeTransport::new().with(
            URL,
            Reply::Fail(CollaboratorError::Status { status: 500 }),
        ));

        let result = client
            .invoke(&endpoint(), json!({}), &SecurityReport::default())
            .await;

        match result {
            Enrichment::Degraded { fallback, reason } => {
                assert!(fallback.issues.is_empty());
                assert_eq!(reason, CollaboratorError::Status { status: 500 });
            }
            other => panic!("Expected degraded result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_degrades() {
        let client = client(FakeTransport::new().with(URL, Reply::Json(json!({"foo": 1}))));

        let result = client
            .invoke(&endpoint(), json!({}), &AmbiguityReport::default())
            .await;

        assert!(matches!(
            result,
            Enrichment::Degraded {
                reason: CollaboratorError::MalformedBody(_),
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_collaborator_times_out() {
        let client = client(FakeTransport::new().with(
            URL,
            Reply::Delayed(Duration::from_secs(5), json!({"valid": true})),
        ));

        let result = client
            .invoke(&endpoint(), json!({}), &ValidationReport::unavailable())
            .await;

        match result {
            Enrichment::Degraded { reason, .. } => {
                assert_eq!(reason, CollaboratorError::Timeout { timeout_ms: 500 });
            }
            other => panic!("Expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_envelope_and_lint_objects() {
        let body = json!({
            "status": "success",
            "service": "openapi-validator",
            "result": {
                "valid": false,
                "errors": [
                    {"level": "error", "message": "GET /pets has no responses defined", "location": "paths./pets.get.responses"},
                    "plain message"
                ],
                "warnings": []
            }
        });

        let report = tokio_test::assert_ok!(ValidationReport::from_body(body));
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                "GET /pets has no responses defined".to_string(),
                "plain message".to_string()
            ]
        );
    }

    #[test]
    fn test_ambiguity_accepts_camel_case() {
        let body = json!({
            "ambiguities": ["unspecified pagination"],
            "clarificationQuestions": ["how many pets per page?"]
        });
        let report = tokio_test::assert_ok!(AmbiguityReport::from_body(body));
        assert_eq!(report.clarification_questions, vec!["how many pets per page?".to_string()]);
    }

    #[test]
    fn test_security_issue_rule_id_optional() {
        let body = json!({"issues": [
            {"rule_id": "SEC-003", "severity": "CRITICAL", "message": "DELETE endpoint without authorization", "location": "/pets/{id}.delete"},
            {"severity": "HIGH", "message": "No global authentication defined"}
        ]});
        let report = tokio_test::assert_ok!(SecurityReport::from_body(body));
        assert_eq!(report.issues[0].rule_id.as_deref(), Some("SEC-003"));
        assert_eq!(report.issues[1].location, "");
        tokio_test::assert_err!(SecurityReport::from_body(json!("not a report")));
    }

    #[test]
    fn test_serialize_hides_degradation() {
        let degraded: Enrichment<SecurityReport> = Enrichment::Degraded {
            fallback: SecurityReport::default(),
            reason: CollaboratorError::Transport("refused".into()),
        };
        let completed = Enrichment::Completed(SecurityReport::default());

        assert_eq!(
            serde_json::to_value(&degraded).unwrap(),
            serde_json::to_value(&completed).unwrap()
        );
    }
}
