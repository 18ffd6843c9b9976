//! Graph linking
//!
//! Runs once after the entities are persisted as nodes. Each [`Pass`] infers
//! one family of relationships from natural keys and timestamp ordering.
//! Passes are scheduled in dependency levels: the passes of a level run as
//! concurrent tasks and the next level starts when all of them finished.

mod collapse;
mod index;
mod passes;
mod report;

pub use collapse::{redundant_edges, Collapse};
pub use index::{nearest, NameIndex, ProcessIndex, ProcessKey};
pub use report::{LinkReport, PassReport};

use futures::future::try_join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::store::{GraphBackend, StoreError};

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Pass dependencies form a cycle among {0:?}")]
    Cycle(Vec<&'static str>),

    #[error("Pass task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type LinkResult<T> = Result<T, LinkError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    Execute,
    ExecuteCollapse,
    ScriptBlocks,
    ScriptBlockCollapse,
    Computers,
    Authors,
    Connections,
    FileEvents,
    EventUsers,
    Loads,
    MemoryAccess,
    MemoryAccessCollapse,
    AccountActions,
    Sessions,
    Groups,
}

impl Pass {
    pub const ALL: [Pass; 15] = [
        Pass::Execute,
        Pass::ExecuteCollapse,
        Pass::ScriptBlocks,
        Pass::ScriptBlockCollapse,
        Pass::Computers,
        Pass::Authors,
        Pass::Connections,
        Pass::FileEvents,
        Pass::EventUsers,
        Pass::Loads,
        Pass::MemoryAccess,
        Pass::MemoryAccessCollapse,
        Pass::AccountActions,
        Pass::Sessions,
        Pass::Groups,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Pass::Execute => "execute",
            Pass::ExecuteCollapse => "execute_collapse",
            Pass::ScriptBlocks => "script_blocks",
            Pass::ScriptBlockCollapse => "script_block_collapse",
            Pass::Computers => "computers",
            Pass::Authors => "authors",
            Pass::Connections => "connections",
            Pass::FileEvents => "file_events",
            Pass::EventUsers => "event_users",
            Pass::Loads => "loads",
            Pass::MemoryAccess => "memory_access",
            Pass::MemoryAccessCollapse => "memory_access_collapse",
            Pass::AccountActions => "account_actions",
            Pass::Sessions => "sessions",
            Pass::Groups => "groups",
        }
    }

    /// Passes whose edges this pass reads or prunes, or whose nodes it links
    pub fn dependencies(&self) -> &'static [Pass] {
        match self {
            Pass::Computers => &[Pass::FileEvents, Pass::Loads, Pass::Groups],
            Pass::ExecuteCollapse => &[Pass::Execute],
            Pass::ScriptBlockCollapse => &[Pass::ScriptBlocks],
            Pass::MemoryAccessCollapse => &[Pass::MemoryAccess],
            Pass::AccountActions | Pass::Sessions | Pass::Groups => &[Pass::EventUsers],
            Pass::Loads | Pass::MemoryAccess => &[Pass::FileEvents],
            _ => &[],
        }
    }

    pub async fn run(self, backend: &dyn GraphBackend) -> LinkResult<PassReport> {
        match self {
            Pass::Execute => passes::execute(backend).await,
            Pass::ExecuteCollapse => passes::execute_collapse(backend).await,
            Pass::ScriptBlocks => passes::script_blocks(backend).await,
            Pass::ScriptBlockCollapse => passes::script_block_collapse(backend).await,
            Pass::Computers => passes::computers(backend).await,
            Pass::Authors => passes::authors(backend).await,
            Pass::Connections => passes::connections(backend).await,
            Pass::FileEvents => passes::file_events(backend).await,
            Pass::EventUsers => passes::event_users(backend).await,
            Pass::Loads => passes::loads(backend).await,
            Pass::MemoryAccess => passes::memory_access(backend).await,
            Pass::MemoryAccessCollapse => passes::memory_access_collapse(backend).await,
            Pass::AccountActions => passes::account_actions(backend).await,
            Pass::Sessions => passes::sessions(backend).await,
            Pass::Groups => passes::groups(backend).await,
        }
    }
}

/// Split `passes` into levels; a pass runs after every dependency it shares
/// with `passes`
pub fn schedule<F>(passes: &[Pass], dependencies: F) -> LinkResult<Vec<Vec<Pass>>>
where
    F: Fn(Pass) -> Vec<Pass>,
{
    let mut pending: Vec<Pass> = passes.to_vec();
    let mut done: Vec<Pass> = Vec::with_capacity(passes.len());
    let mut levels = Vec::new();

    while !pending.is_empty() {
        let (ready, blocked): (Vec<Pass>, Vec<Pass>) = pending.iter().partition(|pass| {
            dependencies(**pass)
                .iter()
                .all(|dep| done.contains(dep) || !passes.contains(dep))
        });
        if ready.is_empty() {
            return Err(LinkError::Cycle(blocked.iter().map(Pass::name).collect()));
        }
        done.extend(&ready);
        levels.push(ready);
        pending = blocked;
    }
    Ok(levels)
}

pub struct Linker {
    backend: Arc<dyn GraphBackend>,
    passes: Vec<Pass>,
}

impl Linker {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self::with_passes(backend, Pass::ALL.to_vec())
    }

    pub fn with_passes(backend: Arc<dyn GraphBackend>, passes: Vec<Pass>) -> Self {
        Self { backend, passes }
    }

    pub async fn run(&self) -> LinkResult<LinkReport> {
        let levels = schedule(&self.passes, |pass| pass.dependencies().to_vec())?;
        let mut report = LinkReport::default();

        for (depth, level) in levels.into_iter().enumerate() {
            debug!(
                "Link level {}: {:?}",
                depth,
                level.iter().map(Pass::name).collect::<Vec<_>>()
            );
            let tasks = level.into_iter().map(|pass| {
                let backend = Arc::clone(&self.backend);
                tokio::spawn(async move { pass.run(backend.as_ref()).await })
            });
            for outcome in try_join_all(tasks).await? {
                let pass = outcome?;
                debug!(
                    "Pass {}: {} edges created, {} deleted, {} nodes",
                    pass.pass, pass.edges_created, pass.edges_deleted, pass.nodes_synthesized
                );
                report.passes.push(pass);
            }
        }

        info!(
            "Linking done: {} edges created, {} deleted, {} nodes synthesized",
            report.edges_created(),
            report.edges_deleted(),
            report.nodes_synthesized()
        );
        Ok(report)
    }
}
