//! Graph node

use super::property::{self, PropertyMap, PropertyValue};
use super::types::{Label, NodeId};
use serde::{Deserialize, Serialize};

/// A labeled node; every entity kind maps to exactly one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub label: Label,
    pub properties: PropertyMap,
}

impl Node {
    pub fn new(id: NodeId, label: impl Into<Label>, properties: PropertyMap) -> Self {
        Node {
            id,
            label: label.into(),
            properties,
        }
    }

    pub fn has_label(&self, label: &Label) -> bool {
        &self.label == label
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Option<PropertyValue> {
        self.properties.insert(key.into(), value.into())
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Text property, empty when absent
    pub fn text(&self, key: &str) -> &str {
        property::text(&self.properties, key)
    }

    /// Integer property, zero when absent
    pub fn integer(&self, key: &str) -> i64 {
        property::integer(&self.properties, key)
    }

    /// Correlation timestamp (µs)
    pub fn timestamp(&self) -> i64 {
        self.integer("timestamp")
    }

    /// True when the node carries every pair of `key`
    pub fn matches(&self, key: &PropertyMap) -> bool {
        property::contains_all(&self.properties, key)
    }
}
