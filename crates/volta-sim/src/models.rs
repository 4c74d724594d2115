//! ---
//! volta_section: "11-simulation"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Closed-form per-component electrical models."
//! volta_version: "v0.1.0"
//! volta_owner: "tbd"
//! ---
//! Component model library.
//!
//! Each component type maps simulated time (milliseconds) plus noise draws to
//! an instantaneous voltage, current, temperature and frequency using fixed
//! closed-form approximations. These are not circuit solutions: components do
//! not interact electrically and nothing here performs nodal analysis.

use std::f64::consts::PI;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::design::{Component, ComponentKind, PropertyValue};
use crate::errors::{Result, SimError};
use crate::noise::NoiseSource;
use crate::snapshot::NodeState;

pub const BASE_VOLTAGE: f64 = 3.3;
pub const AMBIENT_TEMPERATURE: f64 = 25.0;
/// Degrees per watt of dissipated power.
pub const THERMAL_RESISTANCE: f64 = 100.0;
/// Probe frequency used for reactive impedances.
pub const PROBE_FREQUENCY_HZ: f64 = 1000.0;
/// Frequency reported for components whose evaluation failed.
pub const FALLBACK_FREQUENCY_HZ: f64 = 1000.0;

const BOLTZMANN: f64 = 1.380_649e-23;
const NOISE_TEMPERATURE_K: f64 = 300.0;
const NOISE_BANDWIDTH_HZ: f64 = 1000.0;
const DIODE_TEMPCO_V_PER_C: f64 = -0.002;
const THERMAL_VOLTAGE: f64 = 0.026;
const MICRO: f64 = 1e-6;

/// Property names and documented fallbacks for every modelled type.
pub mod defaults {
    pub const THRESHOLD: (&str, f64) = ("threshold", 0.7);
    pub const MOBILITY: (&str, f64) = ("mobility", 400.0);
    pub const OXIDE_CAPACITANCE: (&str, f64) = ("oxideCapacitance", 1.0);
    pub const WIDTH: (&str, f64) = ("width", 10.0);
    pub const LENGTH: (&str, f64) = ("length", 1.0);

    pub const RESISTANCE: (&str, f64) = ("resistance", 1000.0);
    pub const RATED_POWER: (&str, f64) = ("power", 0.25);

    pub const CAPACITANCE: (&str, f64) = ("capacitance", 1e-6);
    pub const RATED_VOLTAGE: (&str, f64) = ("voltage", 5.0);

    pub const INDUCTANCE: (&str, f64) = ("inductance", 1e-3);

    pub const FORWARD_VOLTAGE: (&str, f64) = ("forwardVoltage", 0.7);

    pub const TRANSISTOR_MAX_VOLTAGE: f64 = 5.0;
    pub const TRANSISTOR_MAX_CURRENT: f64 = 0.1;
}

fn prop(component: &Component, (key, default): (&str, f64)) -> f64 {
    component.number_or(key, default)
}

/// Instantaneous electrical quantities for one component at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectricalState {
    pub voltage: f64,
    pub current: f64,
    pub temperature: f64,
    pub frequency: f64,
}

impl ElectricalState {
    pub fn power(&self) -> f64 {
        self.voltage * self.current
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Normal,
    Overvoltage,
    Overcurrent,
    Overpower,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingPoint {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
}

pub type Characteristics = IndexMap<String, PropertyValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentAnalysis {
    pub operating_point: OperatingPoint,
    pub characteristics: Characteristics,
    pub status: ComponentStatus,
}

impl ComponentAnalysis {
    fn failed(reason: &str) -> Self {
        let mut characteristics = Characteristics::new();
        characteristics.insert("error".into(), PropertyValue::Text(reason.to_owned()));
        Self {
            operating_point: OperatingPoint {
                voltage: 0.0,
                current: 0.0,
                power: 0.0,
            },
            characteristics,
            status: ComponentStatus::Error,
        }
    }
}

/// Evaluate the electrical state of `component` at `time_ms`.
///
/// Missing or unparseable properties fall back to their defaults; the only
/// failure is a non-finite result, e.g. a zero resistance or capacitance.
pub fn compute_electrical_state(
    component: &Component,
    time_ms: f64,
    noise: &mut dyn NoiseSource,
) -> Result<ElectricalState> {
    let voltage = voltage(component, time_ms, noise);
    let current = current(component, voltage, noise);
    let power = voltage * current;
    let temperature = AMBIENT_TEMPERATURE + power * THERMAL_RESISTANCE + noise.uniform(0.0, 2.0);
    let frequency = frequency(component, noise);

    let state = ElectricalState {
        voltage,
        current,
        temperature,
        frequency,
    };
    for (quantity, value) in [
        ("voltage", voltage),
        ("current", current),
        ("power", power),
        ("temperature", temperature),
        ("frequency", frequency),
    ] {
        if !value.is_finite() {
            return Err(SimError::ComponentEvaluation {
                component: component.id,
                reason: format!("{quantity} evaluated to {value}"),
            });
        }
    }
    Ok(state)
}

fn voltage(component: &Component, t: f64, noise: &mut dyn NoiseSource) -> f64 {
    match component.kind {
        ComponentKind::Transistor => {
            BASE_VOLTAGE * (1.0 + (t / 1000.0).sin() * 0.2) + noise.uniform(-0.05, 0.05)
        }
        ComponentKind::Resistor => {
            let resistance = prop(component, defaults::RESISTANCE);
            let johnson = (4.0 * BOLTZMANN * NOISE_TEMPERATURE_K * NOISE_BANDWIDTH_HZ).sqrt();
            BASE_VOLTAGE * (1.0 - resistance / 10_000.0) + johnson * noise.unit()
        }
        ComponentKind::Capacitor => {
            let capacitance = prop(component, defaults::CAPACITANCE);
            let phase = t.rem_euclid(2000.0) / 2000.0;
            BASE_VOLTAGE * (1.0 - (-phase / (1000.0 * capacitance)).exp())
        }
        ComponentKind::Inductor => BASE_VOLTAGE + 0.5 * (t / 500.0).sin() * (-t / 5000.0).exp(),
        ComponentKind::Diode => {
            let forward = prop(component, defaults::FORWARD_VOLTAGE);
            let junction = noise.uniform(25.0, 35.0);
            forward + DIODE_TEMPCO_V_PER_C * (junction - AMBIENT_TEMPERATURE)
                + noise.uniform(0.0, 0.01)
        }
        ComponentKind::Unknown => BASE_VOLTAGE + noise.uniform(0.0, 0.1),
    }
}

fn current(component: &Component, voltage: f64, noise: &mut dyn NoiseSource) -> f64 {
    match component.kind {
        ComponentKind::Transistor => {
            let threshold = prop(component, defaults::THRESHOLD);
            let vgs = voltage;
            if vgs > threshold {
                let mobility = prop(component, defaults::MOBILITY);
                let cox = prop(component, defaults::OXIDE_CAPACITANCE);
                let aspect = prop(component, defaults::WIDTH) / prop(component, defaults::LENGTH);
                let vds = 0.8 * voltage;
                0.5 * mobility * cox * aspect * (vgs - threshold).powi(2) * (1.0 + 0.1 * vds) * MICRO
            } else {
                0.001 + noise.uniform(0.0, 1e-4)
            }
        }
        ComponentKind::Resistor => voltage / prop(component, defaults::RESISTANCE),
        ComponentKind::Capacitor => {
            voltage / capacitive_reactance(prop(component, defaults::CAPACITANCE))
        }
        ComponentKind::Inductor => {
            voltage / inductive_reactance(prop(component, defaults::INDUCTANCE))
        }
        ComponentKind::Diode | ComponentKind::Unknown => voltage / 1000.0,
    }
}

fn frequency(component: &Component, noise: &mut dyn NoiseSource) -> f64 {
    match component.kind {
        ComponentKind::Transistor => 10_000.0 + noise.uniform(0.0, 1000.0),
        ComponentKind::Capacitor => capacitive_reactance(prop(component, defaults::CAPACITANCE)),
        _ => 1000.0 + noise.uniform(0.0, 500.0),
    }
}

fn capacitive_reactance(capacitance: f64) -> f64 {
    1.0 / (2.0 * PI * PROBE_FREQUENCY_HZ * capacitance)
}

fn inductive_reactance(inductance: f64) -> f64 {
    2.0 * PI * PROBE_FREQUENCY_HZ * inductance
}

/// Derive type-specific characteristics and a status flag for an operating point.
pub fn analyze(component: &Component, voltage: f64, current: f64) -> ComponentAnalysis {
    let power = voltage * current;
    let mut characteristics = Characteristics::new();
    let mut status = ComponentStatus::Normal;
    let mut put = |key: &str, value: PropertyValue| {
        characteristics.insert(key.to_owned(), value);
    };

    match component.kind {
        ComponentKind::Transistor => {
            let threshold = prop(component, defaults::THRESHOLD);
            let vds = 0.8 * voltage;
            let region = if voltage <= threshold {
                "cutoff"
            } else if vds < voltage - threshold {
                "linear"
            } else {
                "saturation"
            };
            let transconductance = if voltage > threshold {
                2.0 * current / (voltage - threshold)
            } else {
                0.0
            };
            put("region", region.into());
            put("thresholdVoltage", threshold.into());
            put("transconductance", transconductance.into());

            // Both checks run; overcurrent overwrites overvoltage when both trip.
            if voltage > defaults::TRANSISTOR_MAX_VOLTAGE {
                status = ComponentStatus::Overvoltage;
            }
            if current > defaults::TRANSISTOR_MAX_CURRENT {
                status = ComponentStatus::Overcurrent;
            }
        }
        ComponentKind::Resistor => {
            let rated = prop(component, defaults::RATED_POWER);
            put("resistance", prop(component, defaults::RESISTANCE).into());
            put("powerDissipation", power.into());
            put("ratedPower", rated.into());
            if power > rated {
                status = ComponentStatus::Overpower;
            }
        }
        ComponentKind::Capacitor => {
            let capacitance = prop(component, defaults::CAPACITANCE);
            let rated = prop(component, defaults::RATED_VOLTAGE);
            put("capacitance", capacitance.into());
            put("reactance", capacitive_reactance(capacitance).into());
            put("storedEnergy", (0.5 * capacitance * voltage * voltage).into());
            put("ratedVoltage", rated.into());
            if voltage > rated {
                status = ComponentStatus::Overvoltage;
            }
        }
        ComponentKind::Inductor => {
            let inductance = prop(component, defaults::INDUCTANCE);
            put("inductance", inductance.into());
            put("reactance", inductive_reactance(inductance).into());
            put("storedEnergy", (0.5 * inductance * current * current).into());
        }
        ComponentKind::Diode => {
            let region = if voltage > 0.0 { "forward" } else { "reverse" };
            let dynamic = if current > 0.0 {
                THERMAL_VOLTAGE / current
            } else {
                0.0
            };
            put("forwardVoltage", prop(component, defaults::FORWARD_VOLTAGE).into());
            put("region", region.into());
            put("dynamicResistance", dynamic.into());
        }
        ComponentKind::Unknown => {}
    }

    ComponentAnalysis {
        operating_point: OperatingPoint {
            voltage,
            current,
            power,
        },
        characteristics,
        status,
    }
}

/// Node record and analysis for one component within one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentReading {
    pub node: NodeState,
    pub analysis: ComponentAnalysis,
}

/// Evaluate and analyse a component, degrading to an error reading instead of
/// failing so one bad component never aborts a snapshot.
pub fn evaluate_component(
    component: &Component,
    time_ms: f64,
    noise: &mut dyn NoiseSource,
) -> ComponentReading {
    match compute_electrical_state(component, time_ms, noise) {
        Ok(state) => ComponentReading {
            node: NodeState::from_state(&state),
            analysis: analyze(component, state.voltage, state.current),
        },
        Err(err) => {
            warn!(component = component.id, kind = %component.kind, error = %err, "component evaluation failed");
            ComponentReading {
                node: NodeState::degraded(),
                analysis: ComponentAnalysis::failed(&err.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::{ConstantNoise, SeededNoise};

    fn quiet() -> ConstantNoise {
        ConstantNoise(0.0)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn resistor_follows_ohms_law() {
        let resistor = Component::new(1, ComponentKind::Resistor, "R1")
            .with_property("resistance", 1000.0);
        let state = compute_electrical_state(&resistor, 0.0, &mut quiet()).unwrap();
        assert!(approx(state.voltage, 3.3 * 0.9));
        assert_eq!(state.current, state.voltage / 1000.0);
        assert!(approx(state.temperature, 25.0 + state.power() * 100.0));
    }

    #[test]
    fn resistor_johnson_noise_is_tiny() {
        let resistor = Component::new(1, ComponentKind::Resistor, "R1");
        let state = compute_electrical_state(&resistor, 0.0, &mut ConstantNoise(0.999)).unwrap();
        assert!((state.voltage - 2.97).abs() < 1e-8);
    }

    #[test]
    fn transistor_square_law_above_threshold() {
        let transistor = Component::new(2, ComponentKind::Transistor, "M1");
        let state = compute_electrical_state(&transistor, 0.0, &mut ConstantNoise(0.5)).unwrap();
        // sin(0) = 0 and uniform(-0.05, 0.05) at 0.5 is 0.
        assert!(approx(state.voltage, 3.3));
        let expected = 0.5 * 400.0 * 1.0 * 10.0 * (3.3f64 - 0.7).powi(2) * (1.0 + 0.1 * 2.64) * 1e-6;
        assert!(approx(state.current, expected));
        assert!(approx(state.frequency, 10_500.0));
    }

    #[test]
    fn transistor_below_threshold_leaks() {
        let transistor =
            Component::new(2, ComponentKind::Transistor, "M1").with_property("threshold", 10.0);
        let state = compute_electrical_state(&transistor, 0.0, &mut quiet()).unwrap();
        assert!(approx(state.current, 0.001));
        assert!(state.current > 0.0);
    }

    #[test]
    fn capacitor_charges_within_each_period() {
        let capacitor = Component::new(3, ComponentKind::Capacitor, "C1")
            .with_property("capacitance", 1e-3);
        let start = compute_electrical_state(&capacitor, 0.0, &mut quiet()).unwrap();
        let mid = compute_electrical_state(&capacitor, 1000.0, &mut quiet()).unwrap();
        let wrapped = compute_electrical_state(&capacitor, 2000.0, &mut quiet()).unwrap();
        assert_eq!(start.voltage, 0.0);
        assert!(approx(mid.voltage, 3.3 * (1.0 - (-0.5f64).exp())));
        assert_eq!(wrapped.voltage, 0.0);
        let reactance = 1.0 / (2.0 * PI * 1000.0 * 1e-3);
        assert!(approx(mid.current, mid.voltage / reactance));
        assert!(approx(mid.frequency, reactance));
    }

    #[test]
    fn inductor_oscillation_decays() {
        let inductor = Component::new(4, ComponentKind::Inductor, "L1");
        let early = compute_electrical_state(&inductor, 785.0, &mut quiet()).unwrap();
        let late = compute_electrical_state(&inductor, 50_785.0, &mut quiet()).unwrap();
        assert!((early.voltage - 3.3).abs() > (late.voltage - 3.3).abs());
        assert!(approx(early.current, early.voltage / (2.0 * PI * 1000.0 * 1e-3)));
    }

    #[test]
    fn diode_forward_voltage_tracks_junction_temperature() {
        let diode = Component::new(5, ComponentKind::Diode, "D1");
        let cold = compute_electrical_state(&diode, 0.0, &mut quiet()).unwrap();
        assert!(approx(cold.voltage, 0.7));
        let warm = compute_electrical_state(&diode, 0.0, &mut ConstantNoise(0.5)).unwrap();
        assert!(approx(warm.voltage, 0.7 - 0.002 * 5.0 + 0.005));
        assert!(approx(cold.current, cold.voltage / 1000.0));
    }

    #[test]
    fn unknown_type_uses_default_laws() {
        let part = Component::new(6, ComponentKind::Unknown, "X1");
        let state = compute_electrical_state(&part, 0.0, &mut quiet()).unwrap();
        assert!(approx(state.voltage, 3.3));
        assert!(approx(state.current, 0.0033));
        assert!(approx(state.frequency, 1000.0));
    }

    #[test]
    fn unparseable_properties_fall_back_to_defaults() {
        let cases = [
            (
                ComponentKind::Transistor,
                vec!["threshold", "mobility", "oxideCapacitance", "width", "length"],
            ),
            (ComponentKind::Resistor, vec!["resistance", "power"]),
            (ComponentKind::Capacitor, vec!["capacitance", "voltage"]),
            (ComponentKind::Inductor, vec!["inductance"]),
            (ComponentKind::Diode, vec!["forwardVoltage"]),
        ];
        for (kind, keys) in cases {
            let baseline = Component::new(9, kind, "baseline");
            let expected_state = compute_electrical_state(&baseline, 1234.0, &mut quiet()).unwrap();
            let expected_analysis =
                analyze(&baseline, expected_state.voltage, expected_state.current);
            for key in keys {
                let garbled = Component::new(9, kind, "garbled").with_property(key, "not-a-number");
                let state = compute_electrical_state(&garbled, 1234.0, &mut quiet())
                    .unwrap_or_else(|err| panic!("{kind}/{key} raised {err}"));
                assert_eq!(state, expected_state, "{kind}/{key}");
                assert_eq!(
                    analyze(&garbled, state.voltage, state.current),
                    expected_analysis,
                    "{kind}/{key}"
                );
            }
        }
    }

    #[test]
    fn transistor_overcurrent_wins_over_overvoltage() {
        let transistor = Component::new(1, ComponentKind::Transistor, "M1");
        assert_eq!(analyze(&transistor, 6.0, 0.01).status, ComponentStatus::Overvoltage);
        assert_eq!(analyze(&transistor, 3.0, 0.2).status, ComponentStatus::Overcurrent);
        assert_eq!(analyze(&transistor, 6.0, 0.2).status, ComponentStatus::Overcurrent);
        assert_eq!(analyze(&transistor, 3.0, 0.01).status, ComponentStatus::Normal);
    }

    #[test]
    fn transistor_regions() {
        let transistor = Component::new(1, ComponentKind::Transistor, "M1");
        let region = |v: f64| analyze(&transistor, v, 0.01).characteristics["region"].clone();
        assert_eq!(region(0.5), PropertyValue::from("cutoff"));
        // Vds = 2.64 < 3.3 - 0.7 is false, so saturation.
        assert_eq!(region(3.3), PropertyValue::from("saturation"));
        // Vds = 8.0 < 10 - 0.7 holds.
        assert_eq!(region(10.0), PropertyValue::from("linear"));
    }

    #[test]
    fn resistor_and_capacitor_ratings() {
        let resistor = Component::new(1, ComponentKind::Resistor, "R1");
        assert_eq!(analyze(&resistor, 3.0, 0.1).status, ComponentStatus::Overpower);
        assert_eq!(analyze(&resistor, 3.0, 0.01).status, ComponentStatus::Normal);
        let rated = resistor.clone().with_property("power", "1");
        assert_eq!(analyze(&rated, 3.0, 0.1).status, ComponentStatus::Normal);

        let capacitor = Component::new(2, ComponentKind::Capacitor, "C1");
        assert_eq!(analyze(&capacitor, 5.5, 0.0).status, ComponentStatus::Overvoltage);
        assert_eq!(analyze(&capacitor, 3.3, 0.0).status, ComponentStatus::Normal);
    }

    #[test]
    fn inductor_and_diode_are_always_normal() {
        let inductor = Component::new(1, ComponentKind::Inductor, "L1");
        let diode = Component::new(2, ComponentKind::Diode, "D1");
        assert_eq!(analyze(&inductor, 100.0, 100.0).status, ComponentStatus::Normal);
        assert_eq!(analyze(&diode, 100.0, 100.0).status, ComponentStatus::Normal);
        assert!(analyze(&Component::new(3, ComponentKind::Unknown, "X"), 1.0, 1.0)
            .characteristics
            .is_empty());
    }

    #[test]
    fn zero_resistance_degrades_instead_of_failing() {
        let shorted =
            Component::new(8, ComponentKind::Resistor, "R0").with_property("resistance", 0.0);
        assert!(matches!(
            compute_electrical_state(&shorted, 0.0, &mut quiet()),
            Err(SimError::ComponentEvaluation { component: 8, .. })
        ));
        let reading = evaluate_component(&shorted, 0.0, &mut quiet());
        assert_eq!(reading.node, NodeState::degraded());
        assert_eq!(reading.analysis.status, ComponentStatus::Error);
        assert!(reading.analysis.characteristics.contains_key("error"));
    }

    #[test]
    fn seeded_evaluation_is_finite_for_every_kind() {
        let mut noise = SeededNoise::from_seed(11);
        for kind in [
            ComponentKind::Transistor,
            ComponentKind::Resistor,
            ComponentKind::Capacitor,
            ComponentKind::Inductor,
            ComponentKind::Diode,
            ComponentKind::Unknown,
        ] {
            let component = Component::new(1, kind, "part");
            for step in 0..50 {
                let reading = evaluate_component(&component, step as f64 * 37.0, &mut noise);
                assert_ne!(reading.analysis.status, ComponentStatus::Error, "{kind}");
            }
        }
    }
}
