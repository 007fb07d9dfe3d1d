//! API Architect
//!
//! Turns a natural-language API requirement into an API contract through an
//! external generator, enriches it with best-effort validation, ambiguity and
//! security reports, and serves mock responses from the contract.
//!
//! # Features
//!
//! - **Orchestration**: one mandatory generator call, then three optional
//!   collaborators called concurrently with independent timeouts
//! - **Graceful degradation**: an unavailable collaborator yields its
//!   configured fallback report, never an error
//! - **Mock serving**: path templates compiled once per session, matched in
//!   declaration order
//! - **Example extraction**: lowest status code first, literal example, then
//!   the first named example, then a placeholder
//!
//! # Example Configuration
//!
//! ```yaml
//! collaborators:
//!   generator:
//!     url: http://localhost:8000
//!     path: /generate
//!     timeout_ms: 60000
//! mock:
//!   host: 0.0.0.0
//!   port: 4010
//! fallbacks:
//!   validation:
//!     valid: false
//!     errors: ["validation unavailable"]
//! ```

pub mod config;
pub mod contract;
pub mod enrichment;
pub mod error;
pub mod matcher;
pub mod orchestrator;
pub mod server;
pub mod session;
pub mod synthesizer;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use config::ArchitectConfig;
pub use orchestrator::SpecOrchestrator;
pub use session::MockSessionController;
