//! In-memory graph storage
//!
//! Nodes are never deleted (the linker only adds nodes), edges are. Label
//! and edge-type indices keep insertion order so that scans are
//! deterministic.

use super::edge::Edge;
use super::node::Node;
use super::property::PropertyMap;
use super::types::{EdgeId, EdgeType, Label, NodeId};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Property graph held in memory
///
/// - nodes / edges: arenas indexed by id
/// - outgoing / incoming: adjacency lists per node
/// - label_index: label -> node ids in creation order
/// - edge_type_index: edge type -> live edge ids
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    edges: Vec<Option<Edge>>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    label_index: FxHashMap<Label, Vec<NodeId>>,
    edge_type_index: FxHashMap<EdgeType, BTreeSet<EdgeId>>,
    live_edges: usize,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_node(&mut self, label: impl Into<Label>, properties: PropertyMap) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u64);
        let label = label.into();
        self.label_index.entry(label.clone()).or_default().push(id);
        self.nodes.push(Node::new(id, label, properties));
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    /// First node with `label` carrying every pair of `key`
    pub fn find_node(&self, label: &Label, key: &PropertyMap) -> Option<NodeId> {
        self.label_index
            .get(label)?
            .iter()
            .copied()
            .find(|&id| self.nodes[id.as_u64() as usize].matches(key))
    }

    /// Match on `key`, else create a node with `key` and `properties`
    ///
    /// Returns the node id and whether it was created. Properties of a
    /// matched node are left untouched.
    pub fn merge_node(
        &mut self,
        label: impl Into<Label>,
        key: PropertyMap,
        properties: PropertyMap,
    ) -> (NodeId, bool) {
        let label = label.into();
        if let Some(id) = self.find_node(&label, &key) {
            return (id, false);
        }
        let mut all = properties;
        all.extend(key);
        (self.create_node(label, all), true)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.as_u64() as usize)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        (id.as_u64() as usize) < self.nodes.len()
    }

    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId> {
        if !self.has_node(source) {
            return Err(GraphError::InvalidEdgeSource(source));
        }
        if !self.has_node(target) {
            return Err(GraphError::InvalidEdgeTarget(target));
        }

        let id = EdgeId::new(self.edges.len() as u64);
        let edge_type = edge_type.into();
        self.outgoing[source.as_u64() as usize].push(id);
        self.incoming[target.as_u64() as usize].push(id);
        self.edge_type_index.entry(edge_type.clone()).or_default().insert(id);
        self.edges.push(Some(Edge::new(id, source, target, edge_type, properties)));
        self.live_edges += 1;
        Ok(id)
    }

    /// Edge with exactly these endpoints, type and properties
    pub fn find_edge(
        &self,
        source: NodeId,
        target: NodeId,
        edge_type: &EdgeType,
        properties: &PropertyMap,
    ) -> Option<EdgeId> {
        self.get_outgoing_edges(source)
            .into_iter()
            .find(|e| e.same_as(source, target, edge_type, properties))
            .map(|e| e.id)
    }

    /// Match an identical edge, else create it
    pub fn merge_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> GraphResult<(EdgeId, bool)> {
        let edge_type = edge_type.into();
        if let Some(id) = self.find_edge(source, target, &edge_type, &properties) {
            return Ok((id, false));
        }
        self.create_edge(source, target, edge_type, properties)
            .map(|id| (id, true))
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.as_u64() as usize)?.as_ref()
    }

    pub fn has_edge(&self, id: EdgeId) -> bool {
        self.get_edge(id).is_some()
    }

    pub fn delete_edge(&mut self, id: EdgeId) -> GraphResult<Edge> {
        let edge = self
            .edges
            .get_mut(id.as_u64() as usize)
            .and_then(Option::take)
            .ok_or(GraphError::EdgeNotFound(id))?;

        if let Some(ids) = self.edge_type_index.get_mut(&edge.edge_type) {
            ids.remove(&id);
        }
        if let Some(adj) = self.outgoing.get_mut(edge.source.as_u64() as usize) {
            adj.retain(|&eid| eid != id);
        }
        if let Some(adj) = self.incoming.get_mut(edge.target.as_u64() as usize) {
            adj.retain(|&eid| eid != id);
        }
        self.live_edges -= 1;
        Ok(edge)
    }

    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.adjacent(&self.outgoing, node_id)
    }

    pub fn get_incoming_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.adjacent(&self.incoming, node_id)
    }

    fn adjacent<'a>(&'a self, lists: &'a [Vec<EdgeId>], node_id: NodeId) -> Vec<&'a Edge> {
        lists
            .get(node_id.as_u64() as usize)
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Nodes with `label`, in creation order
    pub fn get_nodes_by_label(&self, label: &Label) -> Vec<&Node> {
        self.label_index
            .get(label)
            .map(|ids| ids.iter().filter_map(|&id| self.get_node(id)).collect())
            .unwrap_or_default()
    }

    /// Live edges of `edge_type`, in creation order
    pub fn get_edges_by_type(&self, edge_type: &EdgeType) -> Vec<&Edge> {
        self.edge_type_index
            .get(edge_type)
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.live_edges
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
