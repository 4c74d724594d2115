//! ---
//! volta_section: "11-simulation"
//! volta_subsection: "tests"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "End-to-end checks of the simulation engine."
//! volta_version: "v0.1.0"
//! volta_owner: "tbd"
//! ---
use serde_json::json;
use volta_sim::{
    run_batch, ComponentStatus, ConstantNoise, Design, PerformanceMetrics, SeededNoise,
    SessionState, SimulationSession,
};

fn design_from_json(value: serde_json::Value) -> Design {
    serde_json::from_value(value).expect("design fixture")
}

#[test]
fn single_resistor_batch_matches_ohms_law() {
    let design = design_from_json(json!({
        "id": "7c7b3f2e-6a4e-4d55-9f55-2b8f3c0e4a11",
        "name": "one resistor",
        "components": [
            {"id": 1, "type": "resistor", "name": "R1",
             "properties": {"resistance": 1000, "power": 0.25}}
        ],
        "connections": []
    }));

    let snapshots = run_batch(&design, 1, 0.001, Box::new(SeededNoise::from_seed(3))).unwrap();
    assert_eq!(snapshots.len(), 1);
    let snapshot = &snapshots[0];
    let node = snapshot.nodes[&1u64];
    assert_eq!(node.current, node.voltage / 1000.0);
    assert_eq!(snapshot.performance.total_power, node.power);
    assert_eq!(snapshot.components[&1u64].status, ComponentStatus::Normal);
}

#[test]
fn zero_component_designs_stay_neutral() {
    let design = design_from_json(json!({
        "id": "00000000-0000-4000-8000-000000000001",
        "name": "empty",
        "connections": [{"from": 1, "to": 2, "signal": "ghost"}]
    }));
    let snapshots = run_batch(&design, 10, 0.05, Box::new(SeededNoise::from_entropy())).unwrap();
    assert_eq!(snapshots.len(), 10);
    for snapshot in snapshots {
        assert!(snapshot.nodes.is_empty());
        assert!(snapshot.components.is_empty());
        assert_eq!(snapshot.performance, PerformanceMetrics::default());
        let metrics = serde_json::to_value(snapshot.performance).unwrap();
        for field in ["totalPower", "maxVoltage", "maxCurrent", "efficiency", "propagationDelay", "bandwidth"] {
            assert_eq!(metrics[field], 0.0, "{field}");
        }
    }
}

#[test]
fn batch_runs_are_reproducible_with_a_seed() {
    let design = design_from_json(json!({
        "id": "00000000-0000-4000-8000-000000000002",
        "name": "amp stage",
        "components": [
            {"id": 1, "type": "transistor", "name": "M1", "properties": {"threshold": "0.9"}},
            {"id": 2, "type": "resistor", "name": "RD", "properties": {"resistance": "4700"}},
            {"id": 3, "type": "capacitor", "name": "CC", "properties": {"capacitance": 1e-4}},
            {"id": 4, "type": "diode", "name": "D1"},
            {"id": 5, "type": "fuse", "name": "F1"}
        ],
        "connections": [
            {"from": 1, "to": 2, "signal": "drain"},
            {"from": 2, "to": 3, "signal": "out"}
        ]
    }));
    let first = run_batch(&design, 5, 0.01, Box::new(SeededNoise::from_seed(2024))).unwrap();
    let second = run_batch(&design, 5, 0.01, Box::new(SeededNoise::from_seed(2024))).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn failing_component_does_not_abort_the_snapshot() {
    let design = design_from_json(json!({
        "id": "00000000-0000-4000-8000-000000000003",
        "name": "shorted",
        "components": [
            {"id": 1, "type": "resistor", "name": "R0", "properties": {"resistance": 0}},
            {"id": 2, "type": "inductor", "name": "L1"}
        ]
    }));
    let mut session = SimulationSession::from_design(&design, Box::new(ConstantNoise(0.0)));
    session.start();
    let snapshot = session.simulate(0.0).unwrap();
    assert_eq!(snapshot.components[&1u64].status, ComponentStatus::Error);
    assert_eq!(snapshot.nodes[&1u64].temperature, 25.0);
    assert_eq!(snapshot.nodes[&1u64].frequency, 1000.0);
    assert_eq!(snapshot.components[&2u64].status, ComponentStatus::Normal);
    assert_eq!(snapshot.performance.total_power, snapshot.nodes[&2u64].power);
    assert_eq!(session.state(), SessionState::Running);
    assert!(session.is_running());
}
