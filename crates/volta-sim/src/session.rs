//! ---
//! volta_section: "11-simulation"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Simulation session state machine."
//! volta_version: "v0.1.0"
//! volta_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::design::{Component, ComponentId, Connection, Design, Properties};
use crate::errors::{Result, SimError};
use crate::models::evaluate_component;
use crate::noise::NoiseSource;
use crate::snapshot::Snapshot;

/// Lifecycle of a session. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Created,
    Running,
    Stopped,
}

/// Commands accepted by [`SimulationSession::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Start,
    Simulate { time_ms: f64 },
    UpdateComponent {
        component: ComponentId,
        properties: Properties,
    },
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// The session moved into `Running`.
    Started,
    Snapshot(Box<Snapshot>),
    /// Whether the targeted component exists in the working copy.
    ComponentUpdated(bool),
    /// The session moved into `Stopped`.
    Stopped,
    /// The command had no effect in the current state.
    Unchanged,
}

/// One design's working copy plus the step counter advanced by `simulate`.
///
/// Components and connections are cloned out of the design on creation, so
/// property updates never reach the stored design and the store is never
/// consulted again.
pub struct SimulationSession {
    design_id: Uuid,
    components: Vec<Component>,
    connections: Vec<Connection>,
    state: SessionState,
    step_index: u64,
    noise: Box<dyn NoiseSource>,
}

impl SimulationSession {
    pub fn from_design(design: &Design, noise: Box<dyn NoiseSource>) -> Self {
        Self {
            design_id: design.id,
            components: design.components.clone(),
            connections: design.connections.clone(),
            state: SessionState::Created,
            step_index: 0,
            noise,
        }
    }

    pub fn design_id(&self) -> Uuid {
        self.design_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn apply(&mut self, command: SessionCommand) -> Result<SessionOutcome> {
        let outcome = match command {
            SessionCommand::Start => {
                if self.start() {
                    SessionOutcome::Started
                } else {
                    SessionOutcome::Unchanged
                }
            }
            SessionCommand::Simulate { time_ms } => {
                SessionOutcome::Snapshot(Box::new(self.simulate(time_ms)?))
            }
            SessionCommand::UpdateComponent {
                component,
                properties,
            } => SessionOutcome::ComponentUpdated(self.update_component(component, &properties)),
            SessionCommand::Stop => {
                if self.stop() {
                    SessionOutcome::Stopped
                } else {
                    SessionOutcome::Unchanged
                }
            }
        };
        Ok(outcome)
    }

    /// `Created -> Running`. Returns `false` in any other state.
    pub fn start(&mut self) -> bool {
        if self.state != SessionState::Created {
            return false;
        }
        self.state = SessionState::Running;
        debug!(design = %self.design_id, "session running");
        true
    }

    /// Move to `Stopped`. Returns `false` when already stopped.
    pub fn stop(&mut self) -> bool {
        if self.state == SessionState::Stopped {
            return false;
        }
        self.state = SessionState::Stopped;
        debug!(design = %self.design_id, steps = self.step_index, "session stopped");
        true
    }

    /// Evaluate every component at `time_ms` and advance the step counter.
    ///
    /// The snapshot's `time_step` is the counter value before the increment.
    pub fn simulate(&mut self, time_ms: f64) -> Result<Snapshot> {
        if self.state != SessionState::Running {
            return Err(SimError::SessionNotActive(self.state));
        }
        let mut readings = Vec::with_capacity(self.components.len());
        for component in &self.components {
            let reading = evaluate_component(component, time_ms, self.noise.as_mut());
            readings.push((component.id, reading));
        }
        let snapshot = Snapshot::assemble(
            time_ms,
            self.step_index,
            readings,
            self.components.len(),
            self.connections.len(),
        );
        self.step_index += 1;
        Ok(snapshot)
    }

    /// Merge `properties` into the working copy of `component`.
    ///
    /// Returns `false` when the component is unknown or the session is stopped.
    pub fn update_component(&mut self, component: ComponentId, properties: &Properties) -> bool {
        if self.state == SessionState::Stopped {
            return false;
        }
        match self.components.iter_mut().find(|c| c.id == component) {
            Some(target) => {
                target.merge_properties(properties);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for SimulationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationSession")
            .field("design_id", &self.design_id)
            .field("components", &self.components.len())
            .field("connections", &self.connections.len())
            .field("state", &self.state)
            .field("step_index", &self.step_index)
            .finish_non_exhaustive()
    }
}
