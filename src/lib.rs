//! Timegraph
//!
//! Forensic timeline normalization, deduplication and temporal graph linking.
//!
//! # Architecture
//!
//! A run reads a plaso `json_line` timeline and moves through these stages:
//! - [`record`]: one line becomes a [`Record`], with embedded Windows Event
//!   XML decoded on demand
//! - [`extract`]: pure functions turn a record into canonical entities
//! - [`collection`]: typed collections deduplicate entities on insertion
//! - [`pipeline`]: batches lines, extracts in parallel, merges processes
//!   through [`correlate`]
//! - [`sink`]: writes the entities as CSV, JSON, XML or graph nodes
//! - [`link`]: infers time-ordered relationships between the graph nodes
//!
//! The graph side is the [`store::GraphBackend`] trait, backed either by the
//! in-process [`graph::GraphStore`] or by a Neo4j server.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use timegraph::{Config, OutputTarget, Pipeline, Sink};
//!
//! # async fn run() -> timegraph::Result<()> {
//! let config = Config {
//!     input: "timeline.jsonl".into(),
//!     output: OutputTarget::Memory,
//!     ..Default::default()
//! };
//!
//! let (entities, stats) = Pipeline::new(&config.pipeline).run(&config.input).await?;
//! let mut sink = Sink::open(&config.output)?;
//! sink.emit(&entities).await?;
//! let report = sink.finish().await?;
//! println!("{} lines, {:?}", stats.lines, report.map(|r| r.edges_created()));
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod config;
pub mod correlate;
pub mod entity;
pub mod error;
pub mod extract;
pub mod graph;
pub mod link;
pub mod pipeline;
pub mod record;
pub mod sink;
pub mod store;

// Re-export main types for convenience
pub use collection::{Collection, Dedup, EntityBatch, EntityCounts};
pub use config::{Config, ConfigError, Neo4jConfig, OutputTarget, PipelineConfig};
pub use error::{Error, Result};
pub use extract::extract;
pub use graph::{
    Edge, EdgeId, EdgeType, GraphError, GraphResult, GraphStore, Label, Node, NodeId,
    PropertyMap, PropertyValue,
};
pub use link::{LinkError, LinkReport, Linker, Pass, PassReport};
pub use pipeline::{Pipeline, PipelineStats};
pub use record::{DataType, Record};
pub use sink::{Mapped, Sink, SinkError, SinkResult};
pub use store::{EdgeSpec, EmbeddedGraph, GraphBackend, Neo4jHttp, StoreError, StoreResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
