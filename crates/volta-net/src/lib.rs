//! ---
//! volta_section: "05-networking-external-interfaces"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Network surfaces for streaming and batch simulation."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
//! HTTP and WebSocket transport for the Volta engine.
//!
//! `GET /ws` streams sessions from the [`volta_core::SessionRegistry`];
//! `/api` serves batch runs, the component catalog and a health probe.
#![warn(missing_docs)]

pub mod rest;
pub mod server;
mod websocket;

pub use rest::HealthReport;
pub use server::{ServerBuilder, ServerHandle};
