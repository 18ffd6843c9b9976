//! Top-level error type
//!
//! Only unrecoverable conditions surface here: the input cannot be read, the
//! graph store rejects a write, a sink cannot write its files, or the
//! configuration is unusable. Malformed records never reach this type.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::sink::SinkError;
use crate::store::StoreError;

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot read input {path}: {source}")]
    InputIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
