//! Graph output: entities become labeled nodes, linked on finish

use std::sync::Arc;
use tracing::{debug, info};

use super::{Mapped, SinkResult};
use crate::collection::EntityBatch;
use crate::graph::Label;
use crate::link::{LinkReport, Linker};
use crate::store::GraphBackend;

/// Rows sent to the backend per call
const CHUNK: usize = 1000;

pub struct GraphSink {
    backend: Arc<dyn GraphBackend>,
    nodes: usize,
}

impl GraphSink {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self { backend, nodes: 0 }
    }

    pub async fn emit(&mut self, batch: &EntityBatch) -> SinkResult<()> {
        self.create(batch.processes.as_slice()).await?;
        self.create(batch.users.as_slice()).await?;
        self.create(batch.computers.as_slice()).await?;
        self.create(batch.domains.as_slice()).await?;
        self.create(batch.groups.as_slice()).await?;
        self.create(batch.connections.as_slice()).await?;
        self.create(batch.events.as_slice()).await?;
        self.create(batch.files.as_slice()).await?;
        self.create(batch.registries.as_slice()).await?;
        self.create(batch.services.as_slice()).await?;
        self.create(batch.tasks.as_slice()).await?;
        self.create(batch.script_blocks.as_slice()).await?;
        self.create(batch.web_histories.as_slice()).await?;
        info!("Created {} nodes", self.nodes);
        Ok(())
    }

    async fn create<T: Mapped>(&mut self, items: &[T]) -> SinkResult<()> {
        let label = Label::new(T::LABEL);
        for chunk in items.chunks(CHUNK) {
            let rows = chunk.iter().map(Mapped::properties).collect();
            let ids = self.backend.create_nodes(&label, rows).await?;
            self.nodes += ids.len();
        }
        debug!("{} {} nodes", items.len(), T::LABEL);
        Ok(())
    }

    /// Link the persisted nodes
    pub async fn finish(self) -> SinkResult<LinkReport> {
        let linker = Linker::new(self.backend);
        Ok(linker.run().await?)
    }
}
