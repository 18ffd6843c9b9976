//! Output sinks
//!
//! A [`Sink`] receives the final [`EntityBatch`] of a run. File sinks write
//! one file per entity kind into an output directory; the graph sink turns
//! entities into labeled nodes and links them when finished.

pub mod csv;
pub mod graph;
pub mod json;
pub mod mapping;
pub mod xml;

pub use self::csv::CsvSink;
pub use self::graph::GraphSink;
pub use self::json::JsonSink;
pub use self::mapping::Mapped;
pub use self::xml::XmlSink;

use rustc_hash::FxHashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::collection::EntityBatch;
use crate::config::OutputTarget;
use crate::link::{LinkError, LinkReport};
use crate::store::{EmbeddedGraph, GraphBackend, Neo4jHttp, StoreError};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Link error: {0}")]
    Link(#[from] LinkError),
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Destination of one run
pub enum Sink {
    Csv(CsvSink),
    Json(JsonSink),
    Xml(XmlSink),
    Graph(GraphSink),
}

impl Sink {
    pub fn open(target: &OutputTarget) -> SinkResult<Sink> {
        Ok(match target {
            OutputTarget::Csv { dir } => Sink::Csv(CsvSink::new(dir)?),
            OutputTarget::Json { dir } => Sink::Json(JsonSink::new(dir)?),
            OutputTarget::Xml { dir } => Sink::Xml(XmlSink::new(dir)?),
            OutputTarget::Neo4j(config) => Sink::graph(Arc::new(Neo4jHttp::new(config))),
            OutputTarget::Memory => Sink::graph(Arc::new(EmbeddedGraph::new())),
        })
    }

    pub fn graph(backend: Arc<dyn GraphBackend>) -> Sink {
        Sink::Graph(GraphSink::new(backend))
    }

    pub async fn emit(&mut self, batch: &EntityBatch) -> SinkResult<()> {
        match self {
            Sink::Csv(sink) => write_batch(sink, batch),
            Sink::Json(sink) => write_batch(sink, batch),
            Sink::Xml(sink) => write_batch(sink, batch),
            Sink::Graph(sink) => sink.emit(batch).await,
        }
    }

    /// Complete the output; the graph sink links its nodes here
    pub async fn finish(self) -> SinkResult<Option<LinkReport>> {
        match self {
            Sink::Csv(_) | Sink::Json(_) | Sink::Xml(_) => Ok(None),
            Sink::Graph(sink) => Ok(Some(sink.finish().await?)),
        }
    }
}

/// Writes every entity of one kind
pub(crate) trait KindWriter {
    fn write<T: Mapped>(&mut self, items: &[T]) -> SinkResult<()>;
}

pub(crate) fn write_batch<W: KindWriter>(writer: &mut W, batch: &EntityBatch) -> SinkResult<()> {
    writer.write(batch.processes.as_slice())?;
    writer.write(batch.users.as_slice())?;
    writer.write(batch.computers.as_slice())?;
    writer.write(batch.domains.as_slice())?;
    writer.write(batch.groups.as_slice())?;
    writer.write(batch.connections.as_slice())?;
    writer.write(batch.events.as_slice())?;
    writer.write(batch.files.as_slice())?;
    writer.write(batch.registries.as_slice())?;
    writer.write(batch.services.as_slice())?;
    writer.write(batch.tasks.as_slice())?;
    writer.write(batch.script_blocks.as_slice())?;
    writer.write(batch.web_histories.as_slice())?;
    info!("Wrote {} entities", batch.counts().total());
    Ok(())
}

/// Output directory holding one `<kind>.<extension>` file per entity kind
///
/// A kind's file is truncated the first time it is opened by this value and
/// appended to afterwards.
pub(crate) struct OutputDir {
    dir: PathBuf,
    extension: &'static str,
    opened: FxHashSet<&'static str>,
}

impl OutputDir {
    pub fn create(dir: &Path, extension: &'static str) -> SinkResult<Self> {
        std::fs::create_dir_all(dir).map_err(|source| SinkError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            extension,
            opened: FxHashSet::default(),
        })
    }

    pub fn path(&self, kind: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", kind, self.extension))
    }

    /// Open the file of `kind`; the flag is true when it was just created
    pub fn open(&mut self, kind: &'static str) -> SinkResult<(KindFile, bool)> {
        let path = self.path(kind);
        let fresh = self.opened.insert(kind);
        let file = if fresh {
            File::create(&path)
        } else {
            OpenOptions::new().append(true).open(&path)
        };
        let file = file.map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;
        Ok((
            KindFile {
                path,
                writer: BufWriter::new(file),
            },
            fresh,
        ))
    }
}

pub(crate) struct KindFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl KindFile {
    pub fn line(&mut self, text: &str) -> SinkResult<()> {
        writeln!(self.writer, "{}", text).map_err(|source| self.io_error(source))
    }

    pub fn close(mut self) -> SinkResult<()> {
        self.writer.flush().map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
