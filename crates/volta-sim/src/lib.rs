//! ---
//! volta_section: "11-simulation"
//! volta_subsection: "01-bootstrap"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Simulation runtime module exports and shared types."
//! volta_version: "v0.1.0"
//! volta_owner: "tbd"
//! ---
//! Electrical simulation engine for Volta designs.
//!
//! The crate is synchronous and free of I/O: component models, snapshot
//! aggregation, the session state machine and the batch runner. Timers and
//! observers live in `volta-core`.

pub mod batch;
pub mod catalog;
pub mod design;
pub mod errors;
pub mod models;
pub mod noise;
pub mod session;
pub mod snapshot;

pub use batch::run_batch;
pub use catalog::{catalog, ComponentTypeInfo};
pub use design::{
    Component, ComponentId, ComponentKind, Connection, Design, Properties, PropertyValue,
};
pub use errors::{Result, SimError};
pub use models::{
    analyze, compute_electrical_state, evaluate_component, ComponentAnalysis, ComponentStatus,
    ElectricalState,
};
pub use noise::{ConstantNoise, NoiseFactory, NoiseSource, SeededNoise};
pub use session::{SessionCommand, SessionOutcome, SessionState, SimulationSession};
pub use snapshot::{NodeState, PerformanceMetrics, Snapshot};
