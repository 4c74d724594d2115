//! ---
//! volta_section: "01-core-functionality"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Session orchestration and batch service exports."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
//! Streaming session registry, wire protocol and batch service for Volta.

pub mod batch;
pub mod errors;
pub mod protocol;
pub mod registry;
pub mod scheduling;
pub mod store;

pub use batch::{BatchDefaults, BatchMetadata, BatchReport, BatchRequest, BatchService};
pub use errors::{EngineError, Result};
pub use protocol::{
    ClientRequest, ObserverId, ServerMessage, SimulationEvent, StreamConfig, StreamOverrides,
};
pub use registry::{ObserverSink, SessionRegistry};
pub use scheduling::RateLimiter;
pub use store::{DesignStore, InMemoryDesignStore};
