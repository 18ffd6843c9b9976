//! Directed graph edge

use super::property::{self, PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, NodeId};
use serde::{Deserialize, Serialize};

/// A directed, typed relationship between two nodes
///
/// Several edges of the same type may connect the same pair of nodes when
/// their properties differ (e.g. two logons at different times).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    /// Edge goes FROM this node
    pub source: NodeId,
    /// Edge goes TO this node
    pub target: NodeId,
    pub edge_type: EdgeType,
    pub properties: PropertyMap,
}

impl Edge {
    pub fn new(
        id: EdgeId,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> Self {
        Edge {
            id,
            source,
            target,
            edge_type: edge_type.into(),
            properties,
        }
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Correlation timestamp (µs), zero when the edge has none
    pub fn timestamp(&self) -> i64 {
        property::integer(&self.properties, "timestamp")
    }

    pub fn starts_from(&self, node: NodeId) -> bool {
        self.source == node
    }

    pub fn ends_at(&self, node: NodeId) -> bool {
        self.target == node
    }

    /// Same endpoints, type and properties
    pub fn same_as(
        &self,
        source: NodeId,
        target: NodeId,
        edge_type: &EdgeType,
        properties: &PropertyMap,
    ) -> bool {
        self.source == source
            && self.target == target
            && &self.edge_type == edge_type
            && &self.properties == properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    #[test]
    fn test_edge_direction() {
        let edge = Edge::new(
            EdgeId::new(1),
            NodeId::new(10),
            NodeId::new(20),
            "EXECUTE",
            props! { "timestamp" => 5i64 },
        );
        assert!(edge.starts_from(NodeId::new(10)));
        assert!(edge.ends_at(NodeId::new(20)));
        assert!(!edge.ends_at(NodeId::new(10)));
        assert_eq!(edge.timestamp(), 5);
    }

    #[test]
    fn test_same_as() {
        let props = props! { "timestamp" => 5i64 };
        let edge = Edge::new(EdgeId::new(1), NodeId::new(1), NodeId::new(2), "LOGON", props.clone());
        let logon = EdgeType::new("LOGON");
        assert!(edge.same_as(NodeId::new(1), NodeId::new(2), &logon, &props));
        assert!(!edge.same_as(NodeId::new(2), NodeId::new(1), &logon, &props));
        assert!(!edge.same_as(NodeId::new(1), NodeId::new(2), &logon, &props! { "timestamp" => 6i64 }));
        assert!(!edge.same_as(NodeId::new(1), NodeId::new(2), &EdgeType::new("LOGOFF"), &props));
    }
}
