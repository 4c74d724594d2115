//! ---
//! volta_section: "01-core-functionality"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Shared primitives and utilities for the core runtime."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
//! Shared primitives for the Volta workspace: configuration loading and
//! tracing initialisation consumed by the daemon and the engine crates.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, DesignsConfig, LoadedAppConfig, LoggingConfig, ServerConfig, SimulationConfig,
};
pub use logging::{init_tracing, LogFormat};
