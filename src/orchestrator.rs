//! Spec orchestration.
//!
//! One mandatory generator call, then the validator, ambiguity analyzer and
//! security analyzer concurrently. Only the generator can fail a request.

use crate::config::{CollaboratorsConfig, FallbackValues};
use crate::contract::Contract;
use crate::enrichment::{
    AmbiguityReport, Enrichment, EnrichmentClient, SecurityReport, ValidationReport,
};
use crate::error::{CollaboratorError, OrchestrationError};
use crate::transport::Transport;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

/// Merged result of one orchestration request.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationResult {
    #[serde(rename = "openapi")]
    pub contract: Arc<Contract>,
    pub validation: Enrichment<ValidationReport>,
    pub ambiguity: Enrichment<AmbiguityReport>,
    pub security: Enrichment<SecurityReport>,
}

/// Spec orchestration engine.
pub struct SpecOrchestrator {
    client: EnrichmentClient,
    collaborators: CollaboratorsConfig,
    fallbacks: FallbackValues,
}

impl SpecOrchestrator {
    pub fn new(
        transport: Arc<dyn Transport>,
        collaborators: CollaboratorsConfig,
        fallbacks: FallbackValues,
    ) -> Self {
        Self {
            client: EnrichmentClient::new(transport),
            collaborators,
            fallbacks,
        }
    }

    /// Generate a contract for `requirement` and enrich it.
    ///
    /// Empty requirements are forwarded; the generator decides whether they
    /// are acceptable.
    pub async fn generate(
        &self,
        requirement: &str,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        let contract = Arc::new(self.generate_contract(requirement).await.map_err(|source| {
            error!(error = %source, "Spec generation failed");
            OrchestrationError::GenerationFailed { source }
        })?);

        let contract_payload = json!({ "openapi": contract.document() });
        let requirement_payload = json!({ "requirement": requirement });

        let (validation, ambiguity, security) = tokio::join!(
            self.client.invoke(
                &self.collaborators.validator,
                contract_payload.clone(),
                &self.fallbacks.validation,
            ),
            self.client.invoke(
                &self.collaborators.ambiguity,
                requirement_payload,
                &self.fallbacks.ambiguity,
            ),
            self.client.invoke(
                &self.collaborators.security,
                contract_payload,
                &self.fallbacks.security,
            ),
        );

        info!(
            validation_degraded = validation.is_degraded(),
            ambiguity_degraded = ambiguity.is_degraded(),
            security_degraded = security.is_degraded(),
            "Spec generated"
        );

        Ok(OrchestrationResult {
            contract,
            validation,
            ambiguity,
            security,
        })
    }

    async fn generate_contract(&self, requirement: &str) -> Result<Contract, CollaboratorError> {
        let endpoint = &self.collaborators.generator;
        let body = self
            .client
            .call(
                &endpoint.endpoint(),
                &json!({ "requirement": requirement }),
                endpoint.timeout(),
            )
            .await?;

        extract_contract(body)
    }
}

/// Pull the contract out of a generator answer (`openapi` or `contract` key).
///
/// A null `openapi` falls through to `contract`.
fn extract_contract(body: Value) -> Result<Contract, CollaboratorError> {
    let Value::Object(mut body) = body else {
        return Err(CollaboratorError::MalformedBody(
            "generator answer is not an object".to_string(),
        ));
    };

    ["openapi", "contract"]
        .into_iter()
        .filter_map(|key| body.remove(key))
        .find(|document| !document.is_null())
        .map(Contract::new)
        .ok_or_else(|| {
            CollaboratorError::MalformedBody("generator answer has no contract".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FakeTransport, Reply};
    use std::time::Duration;

    const GENERATOR: &str = "http://localhost:8000/generate";
    const VALIDATOR: &str = "http://localhost:8001/validate";
    const AMBIGUITY: &str = "http://localhost:8002/analyze";
    const SECURITY: &str = "http://localhost:8003/analyze";

    fn pets_contract() -> Value {
        json!({
            "openapi": "3.0.0",
            "paths": {
                "/pets": {
                    "get": {"responses": {"200": {"description": "list"}}},
                    "post": {"responses": {"201": {"description": "created"}}}
                }
            }
        })
    }

    fn orchestrator(transport: Arc<FakeTransport>) -> SpecOrchestrator {
        SpecOrchestrator::new(
            transport,
            CollaboratorsConfig::default(),
            FallbackValues::default(),
        )
    }

    fn healthy_transport() -> FakeTransport {
        FakeTransport::new()
            .with(GENERATOR, Reply::Json(json!({ "openapi": pets_contract() })))
            .with(VALIDATOR, Reply::Json(json!({"valid": true, "errors": []})))
            .with(
                AMBIGUITY,
                Reply::Json(json!({"ambiguities": ["auth"], "clarification_questions": ["who?"]})),
            )
            .with(SECURITY, Reply::Json(json!({"issues": []})))
    }

    #[tokio::test]
    async fn test_all_collaborators_answer() {
        let transport = Arc::new(healthy_transport());
        let result = orchestrator(transport.clone()).generate("pets").await.unwrap();

        assert_eq!(result.contract.document(), &pets_contract());
        assert!(!result.validation.is_degraded());
        assert!(result.validation.value().valid);
        assert_eq!(result.ambiguity.value().ambiguities, vec!["auth".to_string()]);
        assert!(!result.security.is_degraded());
        assert_eq!(transport.calls().len(), 4);
        assert_eq!(transport.calls()[0], GENERATOR);
    }

    #[tokio::test]
    async fn test_payloads_per_phase() {
        let transport = Arc::new(healthy_transport());
        orchestrator(transport.clone()).generate("pets").await.unwrap();

        assert_eq!(
            transport.payload_for(GENERATOR),
            Some(json!({"requirement": "pets"}))
        );
        assert_eq!(
            transport.payload_for(VALIDATOR),
            Some(json!({"openapi": pets_contract()}))
        );
        assert_eq!(
            transport.payload_for(AMBIGUITY),
            Some(json!({"requirement": "pets"}))
        );
        assert_eq!(
            transport.payload_for(SECURITY),
            Some(json!({"openapi": pets_contract()}))
        );
    }

    #[tokio::test]
    async fn test_every_optional_failure_combination() {
        let optional = [VALIDATOR, AMBIGUITY, SECURITY];

        for mask in 0u8..8 {
            let mut transport = FakeTransport::new()
                .with(GENERATOR, Reply::Json(json!({ "openapi": pets_contract() })));
            for (bit, url) in optional.iter().enumerate() {
                if mask & (1 << bit) == 0 {
                    let body = match *url {
                        VALIDATOR => json!({"valid": true, "errors": []}),
                        AMBIGUITY => json!({"ambiguities": [], "clarification_questions": []}),
                        _ => json!({"issues": []}),
                    };
                    transport = transport.with(url, Reply::Json(body));
                }
            }

            let result = orchestrator(Arc::new(transport))
                .generate("pets")
                .await
                .unwrap();

            assert_eq!(result.validation.is_degraded(), mask & 1 != 0);
            assert_eq!(result.ambiguity.is_degraded(), mask & 2 != 0);
            assert_eq!(result.security.is_degraded(), mask & 4 != 0);

            let json = serde_json::to_value(&result).unwrap();
            assert!(json["validation"]["valid"].is_boolean());
            assert!(json["validation"]["errors"].is_array());
            assert!(json["ambiguity"]["ambiguities"].is_array());
            assert!(json["ambiguity"]["clarification_questions"].is_array());
            assert!(json["security"]["issues"].is_array());
        }
    }

    #[tokio::test]
    async fn test_generator_failure_makes_no_optional_calls() {
        let failures = [
            Reply::Fail(CollaboratorError::Transport("refused".into())),
            Reply::Fail(CollaboratorError::Status { status: 502 }),
            Reply::Json(json!({"message": "no contract here"})),
            Reply::Json(json!({"openapi": null})),
            Reply::Json(json!("text")),
        ];

        for reply in failures {
            let transport = Arc::new(
                healthy_transport().with(GENERATOR, reply),
            );
            let err = orchestrator(transport.clone())
                .generate("pets")
                .await
                .unwrap_err();

            assert!(matches!(err, OrchestrationError::GenerationFailed { .. }));
            assert_eq!(err.to_string(), "Spec generation failed");
            assert_eq!(transport.calls(), vec![GENERATOR.to_string()]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_generator_timeout_fails() {
        let transport = Arc::new(healthy_transport().with(
            GENERATOR,
            Reply::Delayed(Duration::from_secs(120), json!({ "openapi": pets_contract() })),
        ));

        let err = orchestrator(transport.clone()).generate("pets").await.unwrap_err();
        let OrchestrationError::GenerationFailed { source } = err;
        assert_eq!(source, CollaboratorError::Timeout { timeout_ms: 60_000 });
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_null_openapi_falls_back_to_contract_key() {
        let transport = Arc::new(
            healthy_transport().with(
                GENERATOR,
                Reply::Json(json!({ "openapi": null, "contract": pets_contract() })),
            ),
        );
        let result = orchestrator(transport).generate("pets").await.unwrap();
        assert_eq!(result.contract.document(), &pets_contract());

        assert!(matches!(
            extract_contract(json!({"openapi": null, "contract": null})),
            Err(CollaboratorError::MalformedBody(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_requirement_still_forwarded() {
        let transport = Arc::new(healthy_transport());
        orchestrator(transport.clone()).generate("").await.unwrap();
        assert_eq!(
            transport.payload_for(GENERATOR),
            Some(json!({"requirement": ""}))
        );
    }

    #[tokio::test]
    async fn test_contract_key_accepted() {
        let transport = Arc::new(
            healthy_transport().with(GENERATOR, Reply::Json(json!({ "contract": pets_contract() }))),
        );
        let result = orchestrator(transport).generate("pets").await.unwrap();
        assert_eq!(result.contract.document(), &pets_contract());
    }

    #[tokio::test(start_paused = true)]
    async fn test_optional_calls_run_concurrently() {
        let slow = Duration::from_secs(8);
        let transport = Arc::new(
            FakeTransport::new()
                .with(GENERATOR, Reply::Json(json!({ "openapi": pets_contract() })))
                .with(VALIDATOR, Reply::Delayed(slow, json!({"valid": true, "errors": []})))
                .with(
                    AMBIGUITY,
                    Reply::Delayed(slow, json!({"ambiguities": [], "clarification_questions": []})),
                )
                .with(SECURITY, Reply::Delayed(slow, json!({"issues": []}))),
        );

        let started = tokio::time::Instant::now();
        let result = orchestrator(transport).generate("pets").await.unwrap();

        assert!(!result.validation.is_degraded());
        assert!(!result.security.is_degraded());
        assert!(started.elapsed() < slow * 2);
    }
}
