//! ---
//! volta_section: "11-simulation"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Snapshot records and aggregate performance metrics."
//! volta_version: "v0.1.0"
//! volta_owner: "tbd"
//! ---
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::design::ComponentId;
use crate::models::{
    ComponentAnalysis, ComponentReading, ElectricalState, AMBIENT_TEMPERATURE,
    FALLBACK_FREQUENCY_HZ,
};

/// Picoseconds attributed to each component and each connection.
const COMPONENT_DELAY_PS: f64 = 10.0;
const CONNECTION_DELAY_PS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub temperature: f64,
    pub frequency: f64,
}

impl NodeState {
    pub fn from_state(state: &ElectricalState) -> Self {
        Self {
            voltage: state.voltage,
            current: state.current,
            power: state.power(),
            temperature: state.temperature,
            frequency: state.frequency,
        }
    }

    /// Record reported for a component whose evaluation failed.
    pub fn degraded() -> Self {
        Self {
            voltage: 0.0,
            current: 0.0,
            power: 0.0,
            temperature: AMBIENT_TEMPERATURE,
            frequency: FALLBACK_FREQUENCY_HZ,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub total_power: f64,
    pub max_voltage: f64,
    pub max_current: f64,
    pub efficiency: f64,
    /// Picosecond-equivalents.
    pub propagation_delay: f64,
    pub bandwidth: f64,
}

impl PerformanceMetrics {
    /// Aggregate one tick's node records.
    ///
    /// Every field is `0.0` for an empty design; no field can divide by zero.
    ///
    /// `propagation_delay` is `component_count * 10 + connection_count * 5`,
    /// except that it stays `0.0` when `component_count` is zero, even if
    /// dangling connections are present.
    pub fn aggregate<'a>(
        nodes: impl IntoIterator<Item = &'a NodeState>,
        component_count: usize,
        connection_count: usize,
    ) -> Self {
        let mut metrics = PerformanceMetrics::default();
        let mut sourced = 0.0;
        let mut consumed = 0.0;
        let mut seen = false;

        for node in nodes {
            metrics.total_power += node.power;
            if seen {
                metrics.max_voltage = metrics.max_voltage.max(node.voltage);
                metrics.max_current = metrics.max_current.max(node.current);
                metrics.bandwidth = metrics.bandwidth.max(node.frequency);
            } else {
                metrics.max_voltage = node.voltage;
                metrics.max_current = node.current;
                metrics.bandwidth = node.frequency;
                seen = true;
            }
            if node.power < 0.0 {
                sourced += node.power.abs();
            } else if node.power > 0.0 {
                consumed += node.power;
            }
        }

        if consumed > 0.0 {
            metrics.efficiency = 100.0 * sourced / consumed;
        }
        if component_count > 0 {
            metrics.propagation_delay = component_count as f64 * COMPONENT_DELAY_PS
                + connection_count as f64 * CONNECTION_DELAY_PS;
        }
        metrics
    }
}

/// One timestamped evaluation of every component in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Simulated time in milliseconds at which the components were evaluated.
    pub timestamp: f64,
    pub time_step: u64,
    pub nodes: IndexMap<ComponentId, NodeState>,
    pub components: IndexMap<ComponentId, ComponentAnalysis>,
    pub performance: PerformanceMetrics,
}

impl Snapshot {
    /// Combine per-component readings into a snapshot.
    ///
    /// A repeated component id keeps its last reading.
    pub fn assemble(
        timestamp: f64,
        time_step: u64,
        readings: impl IntoIterator<Item = (ComponentId, ComponentReading)>,
        component_count: usize,
        connection_count: usize,
    ) -> Self {
        let mut nodes = IndexMap::new();
        let mut components = IndexMap::new();
        for (id, reading) in readings {
            nodes.insert(id, reading.node);
            components.insert(id, reading.analysis);
        }
        let performance =
            PerformanceMetrics::aggregate(nodes.values(), component_count, connection_count);
        Self {
            timestamp,
            time_step,
            nodes,
            components,
            performance,
        }
    }
}
