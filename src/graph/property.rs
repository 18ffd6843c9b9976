//! Property values of nodes and edges
//!
//! Entities only ever need text, integers (timestamps, PIDs, ports),
//! booleans and lists of text (evidence, registry values).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    List(Vec<String>),
    Null,
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::Integer(_) => "Integer",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::List(_) => "List",
            PropertyValue::Null => "Null",
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::String(s) => Value::from(s.as_str()),
            PropertyValue::Integer(i) => Value::from(*i),
            PropertyValue::Boolean(b) => Value::from(*b),
            PropertyValue::List(items) => Value::from(items.clone()),
            PropertyValue::Null => Value::Null,
        }
    }

    /// Convert a value returned by a remote store
    ///
    /// Non-integral numbers and nested objects are kept as their text.
    pub fn from_json(value: &Value) -> PropertyValue {
        match value {
            Value::Null => PropertyValue::Null,
            Value::Bool(b) => PropertyValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => PropertyValue::Integer(i),
                None => PropertyValue::String(n.to_string()),
            },
            Value::String(s) => PropertyValue::String(s.clone()),
            Value::Array(items) => PropertyValue::List(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            Value::Object(_) => PropertyValue::String(value.to_string()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::List(items) => write!(f, "[{}]", items.join(", ")),
            PropertyValue::Null => Ok(()),
        }
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<&String> for PropertyValue {
    fn from(s: &String) -> Self {
        PropertyValue::String(s.clone())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(items: Vec<String>) -> Self {
        PropertyValue::List(items)
    }
}

impl From<&[String]> for PropertyValue {
    fn from(items: &[String]) -> Self {
        PropertyValue::List(items.to_vec())
    }
}

/// Properties of one node or edge, ordered by key
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Build a [`PropertyMap`] from `key => value` pairs
#[macro_export]
macro_rules! props {
    () => { $crate::graph::PropertyMap::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::graph::PropertyMap::new();
        $(map.insert($key.to_string(), $crate::graph::PropertyValue::from($value));)+
        map
    }};
}

/// Text property, empty when absent or not text
pub fn text<'a>(properties: &'a PropertyMap, key: &str) -> &'a str {
    properties.get(key).and_then(|v| v.as_string()).unwrap_or("")
}

/// Integer property, zero when absent or not an integer
pub fn integer(properties: &PropertyMap, key: &str) -> i64 {
    properties.get(key).and_then(|v| v.as_integer()).unwrap_or(0)
}

/// True when every pair of `key` is present in `properties`
pub fn contains_all(properties: &PropertyMap, key: &PropertyMap) -> bool {
    key.iter().all(|(k, v)| properties.get(k) == Some(v))
}
