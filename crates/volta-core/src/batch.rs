//! ---
//! volta_section: "01-core-functionality"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "One-shot batch runs against stored designs."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use volta_common::SimulationConfig;
use volta_sim::{run_batch, Design, NoiseFactory, Snapshot};

use crate::errors::{EngineError, Result};
use crate::store::DesignStore;

/// Body of a batch request; missing fields fall back to the service defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(default)]
    pub steps: Option<usize>,
    #[serde(default)]
    pub time_step: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetadata {
    pub steps: usize,
    pub time_step: f64,
    /// Simulated span in seconds.
    pub duration: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub design_id: Uuid,
    pub simulation_results: Vec<Snapshot>,
    pub metadata: BatchMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchDefaults {
    pub steps: usize,
    pub time_step: f64,
    /// Largest `steps` a request may ask for.
    pub max_steps: usize,
}

impl Default for BatchDefaults {
    fn default() -> Self {
        Self {
            steps: 100,
            time_step: 0.001,
            max_steps: 100_000,
        }
    }
}

impl From<&SimulationConfig> for BatchDefaults {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            steps: config.batch_steps,
            time_step: config.batch_time_step,
            max_steps: config.max_batch_steps,
        }
    }
}

/// Runs batch requests against the design store.
#[derive(Clone)]
pub struct BatchService {
    store: Arc<dyn DesignStore>,
    noise: NoiseFactory,
    defaults: BatchDefaults,
}

impl std::fmt::Debug for BatchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchService")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl BatchService {
    pub fn new(store: Arc<dyn DesignStore>, noise: NoiseFactory, defaults: BatchDefaults) -> Self {
        Self {
            store,
            noise,
            defaults,
        }
    }

    pub fn defaults(&self) -> BatchDefaults {
        self.defaults
    }

    pub fn run(&self, design_id: Uuid, request: BatchRequest) -> Result<BatchReport> {
        let design = self
            .store
            .get_design(design_id)
            .ok_or(EngineError::DesignNotFound(design_id))?;
        self.run_design(&design, request)
    }

    /// Run a design that did not come from the store.
    pub fn run_design(&self, design: &Design, request: BatchRequest) -> Result<BatchReport> {
        let steps = request.steps.unwrap_or(self.defaults.steps);
        let time_step = request.time_step.unwrap_or(self.defaults.time_step);
        if steps > self.defaults.max_steps {
            return Err(EngineError::MalformedRequest(format!(
                "steps must not exceed {}, got {steps}",
                self.defaults.max_steps
            )));
        }
        let simulation_results = run_batch(design, steps, time_step, (self.noise)())?;
        info!(design = %design.id, steps, time_step, "batch simulation served");
        Ok(BatchReport {
            design_id: design.id,
            simulation_results,
            metadata: BatchMetadata {
                steps,
                time_step,
                duration: steps as f64 * time_step,
                timestamp: Utc::now(),
            },
        })
    }
}
