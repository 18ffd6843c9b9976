//! Computers, domains and groups
//!
//! Plain value types: two values are the same entity when their identity
//! fields are equal.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Computer {
    pub name: String,
    pub domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
}

/// A security group named by a group-management event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub domain: String,
    pub computer: String,
    pub evidence: Vec<String>,
}

impl Group {
    pub fn same_group(&self, other: &Group) -> bool {
        self.name == other.name && self.domain == other.domain
    }
}
