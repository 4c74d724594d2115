//! ---
//! volta_section: "11-simulation"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Error taxonomy of the simulation engine."
//! volta_version: "v0.1.0"
//! volta_owner: "tbd"
//! ---
use thiserror::Error;

use crate::design::ComponentId;
use crate::session::SessionState;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("component {component} evaluation failed: {reason}")]
    ComponentEvaluation {
        component: ComponentId,
        reason: String,
    },
    #[error("session is {0:?}; only running sessions can simulate")]
    SessionNotActive(SessionState),
    #[error("step size must be a positive number, got {0}")]
    InvalidStepSize(f64),
}
