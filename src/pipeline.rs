//! Batch ingestion pipeline
//!
//! Lines are read asynchronously and grouped into batches. Each batch is
//! analyzed on the blocking pool: records are decoded and extracted in
//! parallel, then folded in input order into the accumulated entities.
//! The accumulator is owned by the single in-flight task and handed back
//! when it completes, so reading continues while a batch is analyzed and
//! there is never more than one mutator.

use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::collection::{EntityBatch, EntityCounts};
use crate::config::PipelineConfig;
use crate::correlate;
use crate::error::{Error, Result};
use crate::extract::extract;
use crate::record::Record;

/// Summary of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    /// Non-blank input lines
    pub lines: usize,
    pub batches: usize,
    /// Lines that were not a JSON object
    pub decode_failures: usize,
    /// Entities per kind after the final merge
    pub counts: EntityCounts,
}

/// State moved in and out of the analysis task
#[derive(Default)]
struct Accumulator {
    entities: EntityBatch,
    /// Processes collected since the last windowed merge
    new_processes: usize,
    decode_failures: usize,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Ingest a timeline file
    pub async fn run(&self, input: impl AsRef<Path>) -> Result<(EntityBatch, PipelineStats)> {
        let path = input.as_ref();
        let io_error = |source| Error::InputIo {
            path: path.to_path_buf(),
            source,
        };

        let file = tokio::fs::File::open(path).await.map_err(io_error)?;
        let mut lines = BufReader::new(file).lines();
        info!("Reading timeline {}", path.display());

        let mut stats = PipelineStats::default();
        let mut idle = Some(Accumulator::default());
        let mut in_flight: Option<JoinHandle<Accumulator>> = None;
        let mut batch = Vec::with_capacity(self.config.batch_size);

        while let Some(line) = lines.next_line().await.map_err(io_error)? {
            if line.trim().is_empty() {
                continue;
            }
            stats.lines += 1;
            batch.push(line);

            if batch.len() >= self.config.batch_size {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(self.config.batch_size));
                let acc = reclaim(&mut idle, &mut in_flight).await?;
                stats.batches += 1;
                in_flight = Some(self.dispatch(acc, full, stats.batches));
            }
        }

        let mut acc = reclaim(&mut idle, &mut in_flight).await?;
        if !batch.is_empty() {
            stats.batches += 1;
            acc = self.dispatch(acc, batch, stats.batches).await?;
        }

        let tolerance = self.config.final_merge_tolerance();
        let entities = tokio::task::spawn_blocking(move || {
            let absorbed = correlate::merge_all(&mut acc.entities.processes, tolerance);
            debug!("Final process merge absorbed {} records", absorbed);
            acc
        })
        .await?;

        stats.decode_failures = entities.decode_failures;
        stats.counts = entities.entities.counts();
        info!(
            "Ingested {} lines in {} batches: {} entities ({} undecodable lines)",
            stats.lines,
            stats.batches,
            stats.counts.total(),
            stats.decode_failures
        );
        Ok((entities.entities, stats))
    }

    fn dispatch(&self, acc: Accumulator, lines: Vec<String>, number: usize) -> JoinHandle<Accumulator> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || analyze(acc, lines, &config, number))
    }
}

/// Take the accumulator back from the running task, or from the idle slot
async fn reclaim(
    idle: &mut Option<Accumulator>,
    in_flight: &mut Option<JoinHandle<Accumulator>>,
) -> Result<Accumulator> {
    if let Some(handle) = in_flight.take() {
        return Ok(handle.await?);
    }
    Ok(idle.take().unwrap_or_default())
}

fn analyze(mut acc: Accumulator, lines: Vec<String>, config: &PipelineConfig, number: usize) -> Accumulator {
    let extracted: Vec<Option<EntityBatch>> = lines
        .par_iter()
        .map(|line| match Record::try_decode(line) {
            Ok(record) => Some(extract(&record)),
            Err(e) => {
                warn!("Skipping undecodable line: {}", e);
                None
            }
        })
        .collect();

    for batch in extracted {
        let Some(batch) = batch else {
            acc.decode_failures += 1;
            continue;
        };
        let before = acc.entities.processes.len();
        acc.entities.union(batch);
        acc.new_processes += acc.entities.processes.len().saturating_sub(before);

        if acc.new_processes >= config.merge_every {
            correlate::merge_recent(
                &mut acc.entities.processes,
                config.merge_window,
                config.merge_tolerance(),
            );
            acc.new_processes = 0;
        }
    }

    debug!(
        "Batch {} analyzed: {} lines, {} entities so far",
        number,
        lines.len(),
        acc.entities.counts().total()
    );
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn timeline(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    const PREFETCH: &str = r#"{"data_type": "windows:prefetch:execution", "executable": "A.EXE", "timestamp": 1000000, "message": "pf"}"#;
    const USERASSIST: &str = r#"{"data_type": "windows:registry:userassist", "value_name": "C:\\a.exe", "filename": "C:\\Users\\bob\\NTUSER.DAT", "timestamp": 1500000, "message": "ua"}"#;

    #[tokio::test]
    async fn test_run_counts_and_merges() {
        let file = timeline(&[PREFETCH, "", "not json", USERASSIST]);
        let config = PipelineConfig {
            batch_size: 2,
            ..Default::default()
        };

        let (entities, stats) = Pipeline::new(&config).run(file.path()).await.unwrap();
        assert_eq!(stats.lines, 3);
        assert_eq!(stats.batches, 2);
        assert_eq!(stats.decode_failures, 1);
        assert_eq!(entities.processes.len(), 1);
        let p = &entities.processes.as_slice()[0];
        assert_eq!(p.evidence, vec!["pf", "ua"]);
        assert_eq!(p.user, "bob");
        assert_eq!(stats.counts.users, 1);
    }

    #[tokio::test]
    async fn test_windowed_merge_runs_during_ingestion() {
        let file = timeline(&[PREFETCH, USERASSIST, PREFETCH]);
        let config = PipelineConfig {
            batch_size: 10,
            merge_every: 2,
            merge_window: 2,
            ..Default::default()
        };
        let (entities, _) = Pipeline::new(&config).run(file.path()).await.unwrap();
        assert_eq!(entities.processes.len(), 1);
        assert_eq!(entities.processes.as_slice()[0].evidence.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = Pipeline::new(&PipelineConfig::default())
            .run(dir.path().join("missing.jsonl"))
            .await;
        assert!(matches!(result, Err(Error::InputIo { .. })));
    }
}
