//! Analytics event descriptors.
//!
//! An `EventDescriptor` is the read-only view of an application event that
//! the routing engine evaluates rules against. Events carry a name, a kind
//! tag, an optional category, a primitive-valued property map and the
//! policy flags (PII / high-volume / essential).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Runtime discriminant for an event.
///
/// Rules can match on this tag exactly; applications that do not
/// distinguish kinds submit everything as `Custom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Action,
    Screen,
    Lifecycle,
    Error,
    Custom,
}

/// Primitive property value on an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{}", s),
            PropertyValue::Int(n) => write!(f, "{}", n),
            PropertyValue::Float(n) => write!(f, "{}", n),
            PropertyValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

/// An application-generated analytics event, immutable per routing call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDescriptor {
    pub name: String,
    pub kind: EventKind,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(default)]
    pub contains_pii: bool,
    #[serde(default)]
    pub is_high_volume: bool,
    #[serde(default)]
    pub is_essential: bool,
    /// Informational only: the rule's own consent flags are authoritative
    /// and this field never overrides them.
    #[serde(default)]
    pub requires_consent: bool,
    pub timestamp: DateTime<Utc>,
}

impl EventDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EventKind::Custom,
            category: None,
            properties: BTreeMap::new(),
            contains_pii: false,
            is_high_volume: false,
            is_essential: false,
            requires_consent: false,
            timestamp: Utc::now(),
        }
    }

    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_pii(mut self, contains_pii: bool) -> Self {
        self.contains_pii = contains_pii;
        self
    }

    pub fn with_high_volume(mut self, is_high_volume: bool) -> Self {
        self.is_high_volume = is_high_volume;
        self
    }

    pub fn with_essential(mut self, is_essential: bool) -> Self {
        self.is_essential = is_essential;
        self
    }

    pub fn with_requires_consent(mut self, requires_consent: bool) -> Self {
        self.requires_consent = requires_consent;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder_chain() {
        let event = EventDescriptor::new("purchase_completed")
            .with_kind(EventKind::Action)
            .with_category("business")
            .with_property("plan", "pro")
            .with_property("amount", 49.99)
            .with_pii(true);

        assert_eq!(event.name, "purchase_completed");
        assert_eq!(event.kind, EventKind::Action);
        assert_eq!(event.category.as_deref(), Some("business"));
        assert_eq!(
            event.properties.get("plan"),
            Some(&PropertyValue::String("pro".to_string()))
        );
        assert!(event.contains_pii);
        assert!(!event.is_essential);
    }

    #[test]
    fn test_property_value_display() {
        assert_eq!(PropertyValue::from("abc").to_string(), "abc");
        assert_eq!(PropertyValue::from(42i64).to_string(), "42");
        assert_eq!(PropertyValue::from(true).to_string(), "true");
    }

    #[test]
    fn test_event_serde_round_trip() {
        let event = EventDescriptor::new("app_opened")
            .with_kind(EventKind::Lifecycle)
            .with_property("cold_start", true);

        let json = serde_json::to_value(&event).unwrap();
        let back: EventDescriptor = serde_json::from_value(json).unwrap();

        assert_eq!(back.name, event.name);
        assert_eq!(back.kind, event.kind);
        assert_eq!(back.properties, event.properties);
    }
}
