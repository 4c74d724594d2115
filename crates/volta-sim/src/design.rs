//! ---
//! volta_section: "11-simulation"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Design data model consumed by the simulation engine."
//! volta_version: "v0.1.0"
//! volta_owner: "tbd"
//! ---
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ComponentId = u64;

/// Property bag attached to a component, kept in insertion order.
pub type Properties = IndexMap<String, PropertyValue>;

/// Electronic component families understood by the model library.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Transistor,
    Resistor,
    Capacitor,
    Inductor,
    Diode,
    /// Any type tag the engine has no dedicated model for.
    #[serde(other)]
    Unknown,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Transistor => "transistor",
            ComponentKind::Resistor => "resistor",
            ComponentKind::Capacitor => "capacitor",
            ComponentKind::Inductor => "inductor",
            ComponentKind::Diode => "diode",
            ComponentKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property value as submitted by editors: either a JSON number or a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
}

impl PropertyValue {
    /// Interpret the value as a finite number, if possible.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            PropertyValue::Number(value) => *value,
            PropertyValue::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Component {
    pub id: ComponentId,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: Properties,
}

impl Component {
    pub fn new(id: ComponentId, kind: ComponentKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Numeric property lookup falling back to `default` when the key is
    /// absent or its value does not parse as a finite number.
    pub fn number_or(&self, key: &str, default: f64) -> f64 {
        self.properties
            .get(key)
            .and_then(PropertyValue::as_f64)
            .unwrap_or(default)
    }

    /// Merge `updates` into the property bag, overwriting existing keys.
    pub fn merge_properties(&mut self, updates: &Properties) {
        for (key, value) in updates {
            self.properties.insert(key.clone(), value.clone());
        }
    }
}

/// Descriptive link between two components. Only the count is consumed by
/// the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub from: ComponentId,
    pub to: ComponentId,
    #[serde(default)]
    pub signal: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Design {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub metadata: IndexMap<String, serde_json::Value>,
}

impl Design {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            components: Vec::new(),
            connections: Vec::new(),
            created: now,
            modified: now,
            metadata: IndexMap::new(),
        }
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_connection(mut self, from: ComponentId, to: ComponentId, signal: &str) -> Self {
        self.connections.push(Connection {
            from,
            to,
            signal: signal.to_owned(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_type_tags_deserialize_to_unknown() {
        let component: Component =
            serde_json::from_value(json!({"id": 3, "type": "opamp", "name": "U1"})).unwrap();
        assert_eq!(component.kind, ComponentKind::Unknown);
        assert!(component.properties.is_empty());
    }

    #[test]
    fn number_or_accepts_numbers_and_numeric_strings() {
        let component = Component::new(1, ComponentKind::Resistor, "R1")
            .with_property("resistance", "2200")
            .with_property("power", 0.5)
            .with_property("tolerance", "5%")
            .with_property("broken", f64::NAN);
        assert_eq!(component.number_or("resistance", 1000.0), 2200.0);
        assert_eq!(component.number_or("power", 0.25), 0.5);
        assert_eq!(component.number_or("tolerance", 1.0), 1.0);
        assert_eq!(component.number_or("broken", 9.0), 9.0);
        assert_eq!(component.number_or("missing", 4.0), 4.0);
    }

    #[test]
    fn merge_overwrites_and_appends() {
        let mut component =
            Component::new(1, ComponentKind::Resistor, "R1").with_property("resistance", 1000.0);
        let mut updates = Properties::new();
        updates.insert("resistance".into(), 470.0.into());
        updates.insert("power".into(), "1".into());
        component.merge_properties(&updates);
        assert_eq!(component.number_or("resistance", 0.0), 470.0);
        assert_eq!(component.number_or("power", 0.0), 1.0);
    }

    #[test]
    fn design_json_uses_type_field() {
        let design = Design::new("divider")
            .with_component(Component::new(7, ComponentKind::Capacitor, "C1"))
            .with_connection(7, 7, "loop");
        let value = serde_json::to_value(&design).unwrap();
        assert_eq!(value["components"][0]["type"], "capacitor");
        assert_eq!(value["connections"][0]["signal"], "loop");
    }
}
