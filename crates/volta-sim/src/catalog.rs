//! ---
//! volta_section: "11-simulation"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Static component-type catalog served to editors."
//! volta_version: "v0.1.0"
//! volta_owner: "tbd"
//! ---
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::design::ComponentKind;
use crate::models::defaults;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Active,
    Passive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Number,
    Select,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySchema {
    pub name: &'static str,
    pub kind: PropertyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub default: serde_json::Value,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub options: &'static [&'static str],
}

impl PropertySchema {
    fn number(
        (name, default): (&'static str, f64),
        unit: &'static str,
        min: f64,
        max: f64,
    ) -> Self {
        Self {
            name,
            kind: PropertyKind::Number,
            unit: Some(unit),
            min: Some(min),
            max: Some(max),
            default: default.into(),
            options: &[],
        }
    }

    fn select(name: &'static str, options: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: PropertyKind::Select,
            unit: None,
            min: None,
            max: None,
            default: options.first().copied().unwrap_or_default().into(),
            options,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentTypeInfo {
    pub display_name: &'static str,
    pub category: Category,
    pub properties: Vec<PropertySchema>,
    pub pins: &'static [&'static str],
}

impl ComponentTypeInfo {
    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.iter().find(|p| p.name == name)
    }
}

static CATALOG: Lazy<IndexMap<ComponentKind, ComponentTypeInfo>> = Lazy::new(|| {
    let mut catalog = IndexMap::new();
    catalog.insert(
        ComponentKind::Transistor,
        ComponentTypeInfo {
            display_name: "MOSFET Transistor",
            category: Category::Active,
            properties: vec![
                PropertySchema::select("channel", &["nmos", "pmos"]),
                PropertySchema::number(defaults::THRESHOLD, "V", 0.1, 5.0),
                PropertySchema::number(defaults::MOBILITY, "cm²/V·s", 1.0, 2000.0),
                PropertySchema::number(defaults::OXIDE_CAPACITANCE, "µF/cm²", 0.01, 10.0),
                PropertySchema::number(defaults::WIDTH, "µm", 0.1, 1000.0),
                PropertySchema::number(defaults::LENGTH, "µm", 0.01, 100.0),
            ],
            pins: &["gate", "drain", "source"],
        },
    );
    catalog.insert(
        ComponentKind::Resistor,
        ComponentTypeInfo {
            display_name: "Resistor",
            category: Category::Passive,
            properties: vec![
                PropertySchema::number(defaults::RESISTANCE, "Ω", 0.1, 1e7),
                PropertySchema::number(defaults::RATED_POWER, "W", 0.125, 100.0),
            ],
            pins: &["a", "b"],
        },
    );
    catalog.insert(
        ComponentKind::Capacitor,
        ComponentTypeInfo {
            display_name: "Capacitor",
            category: Category::Passive,
            properties: vec![
                PropertySchema::number(defaults::CAPACITANCE, "F", 1e-12, 1.0),
                PropertySchema::number(defaults::RATED_VOLTAGE, "V", 1.0, 1000.0),
            ],
            pins: &["positive", "negative"],
        },
    );
    catalog.insert(
        ComponentKind::Inductor,
        ComponentTypeInfo {
            display_name: "Inductor",
            category: Category::Passive,
            properties: vec![PropertySchema::number(defaults::INDUCTANCE, "H", 1e-9, 10.0)],
            pins: &["a", "b"],
        },
    );
    catalog.insert(
        ComponentKind::Diode,
        ComponentTypeInfo {
            display_name: "Diode",
            category: Category::Active,
            properties: vec![PropertySchema::number(
                defaults::FORWARD_VOLTAGE,
                "V",
                0.1,
                3.0,
            )],
            pins: &["anode", "cathode"],
        },
    );
    catalog
});

/// The full catalog, keyed by component type in display order.
pub fn catalog() -> &'static IndexMap<ComponentKind, ComponentTypeInfo> {
    &CATALOG
}

pub fn lookup(kind: ComponentKind) -> Option<&'static ComponentTypeInfo> {
    CATALOG.get(&kind)
}
