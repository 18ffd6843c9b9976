//! Graph backends
//!
//! [`GraphBackend`] is the unified interface the graph sink and the linker
//! write through. Implemented by:
//! - [`EmbeddedGraph`]: in-process [`GraphStore`](crate::graph::GraphStore)
//! - [`Neo4jHttp`]: a Neo4j server over its transactional HTTP endpoint

pub mod embedded;
pub mod neo4j;

pub use embedded::EmbeddedGraph;
pub use neo4j::Neo4jHttp;

use async_trait::async_trait;
use thiserror::Error;

use crate::graph::{Edge, EdgeId, EdgeType, GraphError, Label, Node, NodeId, PropertyMap};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Neo4j error {code}: {message}")]
    Neo4j { code: String, message: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Invalid label or relationship type: {0:?}")]
    InvalidName(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One edge to merge
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSpec {
    pub source: NodeId,
    pub target: NodeId,
    pub properties: PropertyMap,
}

impl EdgeSpec {
    pub fn new(source: NodeId, target: NodeId, properties: PropertyMap) -> Self {
        Self {
            source,
            target,
            properties,
        }
    }
}

/// Write and read access to a property graph
#[async_trait]
pub trait GraphBackend: Send + Sync {
    async fn create_node(&self, label: &Label, properties: PropertyMap) -> StoreResult<NodeId>;

    /// Create many nodes of one label
    async fn create_nodes(&self, label: &Label, rows: Vec<PropertyMap>) -> StoreResult<Vec<NodeId>> {
        let mut ids = Vec::with_capacity(rows.len());
        for properties in rows {
            ids.push(self.create_node(label, properties).await?);
        }
        Ok(ids)
    }

    /// Match a node on `key`, else create it with `key` and `properties`
    async fn merge_node(
        &self,
        label: &Label,
        key: PropertyMap,
        properties: PropertyMap,
    ) -> StoreResult<NodeId>;

    /// Every node with `label`
    async fn match_nodes(&self, label: &Label) -> StoreResult<Vec<Node>>;

    /// Every edge of `edge_type`
    async fn match_edges(&self, edge_type: &EdgeType) -> StoreResult<Vec<Edge>>;

    /// Match an edge with identical endpoints, type and properties, else create it
    ///
    /// Returns `true` when an edge was created.
    async fn merge_edge(
        &self,
        source: NodeId,
        target: NodeId,
        edge_type: &EdgeType,
        properties: PropertyMap,
    ) -> StoreResult<bool>;

    /// Merge many edges of one type, returning how many were written
    async fn merge_edges(&self, edge_type: &EdgeType, edges: Vec<EdgeSpec>) -> StoreResult<usize> {
        let mut written = 0;
        for edge in edges {
            if self
                .merge_edge(edge.source, edge.target, edge_type, edge.properties)
                .await?
            {
                written += 1;
            }
        }
        Ok(written)
    }

    async fn delete_edge(&self, id: EdgeId) -> StoreResult<()>;
}
