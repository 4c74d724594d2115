//! ---
//! volta_section: "01-core-functionality"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Error taxonomy for session orchestration."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
use thiserror::Error;
use uuid::Uuid;
use volta_sim::SimError;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures surfaced to callers. Unknown observers and components on
/// stop/update are not errors and never appear here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("design {0} not found")]
    DesignNotFound(Uuid),
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error(transparent)]
    Simulation(#[from] SimError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
