//! EmbeddedGraph: in-process backend over a shared `GraphStore`

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{GraphBackend, StoreResult};
use crate::graph::{Edge, EdgeId, EdgeType, GraphStore, Label, Node, NodeId, PropertyMap};

/// In-process backend; no network, used by tests and the `memory` output
#[derive(Clone, Default)]
pub struct EmbeddedGraph {
    store: Arc<RwLock<GraphStore>>,
}

impl EmbeddedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn store_read(&self) -> tokio::sync::RwLockReadGuard<'_, GraphStore> {
        self.store.read().await
    }
}

#[async_trait]
impl GraphBackend for EmbeddedGraph {
    async fn create_node(&self, label: &Label, properties: PropertyMap) -> StoreResult<NodeId> {
        Ok(self.store.write().await.create_node(label.clone(), properties))
    }

    async fn create_nodes(&self, label: &Label, rows: Vec<PropertyMap>) -> StoreResult<Vec<NodeId>> {
        let mut store = self.store.write().await;
        Ok(rows
            .into_iter()
            .map(|properties| store.create_node(label.clone(), properties))
            .collect())
    }

    async fn merge_node(
        &self,
        label: &Label,
        key: PropertyMap,
        properties: PropertyMap,
    ) -> StoreResult<NodeId> {
        let (id, _) = self.store.write().await.merge_node(label.clone(), key, properties);
        Ok(id)
    }

    async fn match_nodes(&self, label: &Label) -> StoreResult<Vec<Node>> {
        let store = self.store.read().await;
        Ok(store.get_nodes_by_label(label).into_iter().cloned().collect())
    }

    async fn match_edges(&self, edge_type: &EdgeType) -> StoreResult<Vec<Edge>> {
        let store = self.store.read().await;
        Ok(store.get_edges_by_type(edge_type).into_iter().cloned().collect())
    }

    async fn merge_edge(
        &self,
        source: NodeId,
        target: NodeId,
        edge_type: &EdgeType,
        properties: PropertyMap,
    ) -> StoreResult<bool> {
        let (_, created) = self
            .store
            .write()
            .await
            .merge_edge(source, target, edge_type.clone(), properties)?;
        Ok(created)
    }

    async fn delete_edge(&self, id: EdgeId) -> StoreResult<()> {
        self.store.write().await.delete_edge(id)?;
        Ok(())
    }
}
