//! ---
//! volta_section: "02-messaging-ipc-data-model"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Streaming request and event schema."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use volta_common::SimulationConfig;
use volta_sim::{ComponentId, Properties, Snapshot};

use crate::errors::{EngineError, Result};

/// Identity of one streaming endpoint, assigned by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObserverId(Uuid);

impl ObserverId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Effective cadence of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamConfig {
    pub tick_interval_ms: u64,
    pub duration_ms: u64,
}

impl StreamConfig {
    pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;
    pub const DEFAULT_DURATION_MS: u64 = 30_000;

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: Self::DEFAULT_TICK_INTERVAL_MS,
            duration_ms: Self::DEFAULT_DURATION_MS,
        }
    }
}

impl From<&SimulationConfig> for StreamConfig {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            tick_interval_ms: config.tick_interval.as_millis() as u64,
            duration_ms: config.duration.as_millis() as u64,
        }
    }
}

/// Partial config carried by a start request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamOverrides {
    #[serde(default)]
    pub tick_interval_ms: Option<u64>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl StreamOverrides {
    /// Fill unset fields from `defaults`; zero values are rejected.
    pub fn resolve(&self, defaults: StreamConfig) -> Result<StreamConfig> {
        let config = StreamConfig {
            tick_interval_ms: self.tick_interval_ms.unwrap_or(defaults.tick_interval_ms),
            duration_ms: self.duration_ms.unwrap_or(defaults.duration_ms),
        };
        if config.tick_interval_ms == 0 {
            return Err(EngineError::MalformedRequest(
                "tickIntervalMs must be positive".into(),
            ));
        }
        if config.duration_ms == 0 {
            return Err(EngineError::MalformedRequest(
                "durationMs must be positive".into(),
            ));
        }
        Ok(config)
    }
}

/// Inbound messages accepted on a streaming connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    StartSimulation {
        #[serde(rename = "designId")]
        design_id: Uuid,
        #[serde(default)]
        config: Option<StreamOverrides>,
    },
    StopSimulation,
    UpdateComponent {
        #[serde(rename = "componentId")]
        component_id: ComponentId,
        #[serde(default)]
        properties: Properties,
    },
}

impl ClientRequest {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| EngineError::MalformedRequest(err.to_string()))
    }
}

/// Events delivered to an observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimulationEvent {
    SimulationStarted {
        #[serde(rename = "designId")]
        design_id: Uuid,
        config: StreamConfig,
    },
    SimulationData {
        data: Box<Snapshot>,
    },
    SimulationStopped,
    ComponentUpdated {
        #[serde(rename = "componentId")]
        component_id: ComponentId,
        properties: Properties,
    },
}

/// Everything an observer can receive: an event or a rejected request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Event(SimulationEvent),
    Error { error: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            error: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<SimulationEvent> for ServerMessage {
    fn from(event: SimulationEvent) -> Self {
        ServerMessage::Event(event)
    }
}

impl From<&EngineError> for ServerMessage {
    fn from(err: &EngineError) -> Self {
        ServerMessage::error(err.to_string())
    }
}
