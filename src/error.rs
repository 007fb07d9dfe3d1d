//! Error types for orchestration and mock serving.

use thiserror::Error;

/// Failure of a single collaborator call.
///
/// Inside an enrichment call this never reaches the caller: it is the signal
/// that swaps in the collaborator's fallback value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("unexpected status {status}")]
    Status { status: u16 },

    #[error("malformed body: {0}")]
    MalformedBody(String),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CollaboratorError::MalformedBody(err.to_string())
        } else {
            CollaboratorError::Transport(err.to_string())
        }
    }
}

/// Errors surfaced by the orchestration engine.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The mandatory generator call failed. Detail stays in the logs.
    #[error("Spec generation failed")]
    GenerationFailed {
        #[source]
        source: CollaboratorError,
    },
}

/// Errors surfaced by the mock session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MockError {
    #[error("OpenAPI spec is required to start mock server")]
    ContractRequired,

    #[error("no route for {method} {path} in the active contract")]
    UnmatchedRoute { method: String, path: String },

    #[error("no mock session is running")]
    NoSession,

    #[error("invalid contract: {0}")]
    InvalidContract(String),
}
