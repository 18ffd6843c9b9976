//! Run configuration
//!
//! A typed value built once (from CLI flags or a YAML file) and handed to
//! each stage constructor.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete configuration of one ingestion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timeline file (one JSON record per line)
    pub input: PathBuf,
    /// Where extracted entities go
    pub output: OutputTarget,
    /// Batching and process-merge parameters
    pub pipeline: PipelineConfig,
    /// 0 = warnings only, 1 = info, 2 = debug, 3+ = trace
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("timeline.jsonl"),
            output: OutputTarget::default(),
            pipeline: PipelineConfig::default(),
            verbosity: 1,
        }
    }
}

impl Config {
    /// Load a configuration from a YAML file and validate it
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.pipeline.validate()?;
        self.output.validate()
    }

    /// Tracing level matching the verbosity count
    pub fn log_level(&self) -> tracing::Level {
        match self.verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

/// Output target selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum OutputTarget {
    Csv { dir: PathBuf },
    Json { dir: PathBuf },
    Xml { dir: PathBuf },
    Neo4j(Neo4jConfig),
    /// In-process graph store, mostly useful for tests and dry runs
    Memory,
}

impl Default for OutputTarget {
    fn default() -> Self {
        OutputTarget::Json {
            dir: PathBuf::from("output"),
        }
    }
}

impl OutputTarget {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            OutputTarget::Csv { dir } | OutputTarget::Json { dir } | OutputTarget::Xml { dir } => {
                if dir.as_os_str().is_empty() {
                    return Err(ConfigError::Invalid("output directory is empty".to_string()));
                }
                Ok(())
            }
            OutputTarget::Neo4j(neo4j) => {
                if neo4j.url.is_empty() {
                    return Err(ConfigError::Invalid("neo4j url is empty".to_string()));
                }
                if neo4j.database.is_empty() {
                    return Err(ConfigError::Invalid("neo4j database is empty".to_string()));
                }
                Ok(())
            }
            OutputTarget::Memory => Ok(()),
        }
    }
}

/// Connection parameters for a Neo4j HTTP endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Neo4jConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:7474".to_string(),
            username: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
        }
    }
}

/// Batching and correlation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Lines per extraction batch
    pub batch_size: usize,
    /// Run the windowed process merge every this many new processes
    pub merge_every: usize,
    /// Number of most recent processes the windowed merge looks at
    pub merge_window: usize,
    /// Timestamp tolerance of the windowed merge (milliseconds)
    pub merge_tolerance_ms: i64,
    /// Timestamp tolerance of the final full merge (milliseconds)
    pub final_merge_tolerance_ms: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 10_000,
            merge_every: 100,
            merge_window: 100,
            merge_tolerance_ms: 2_000,
            final_merge_tolerance_ms: 10_000,
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be positive".to_string()));
        }
        if self.merge_every == 0 || self.merge_window == 0 {
            return Err(ConfigError::Invalid(
                "merge_every and merge_window must be positive".to_string(),
            ));
        }
        if self.merge_tolerance_ms < 0 || self.final_merge_tolerance_ms < 0 {
            return Err(ConfigError::Invalid("merge tolerances must not be negative".to_string()));
        }
        Ok(())
    }

    /// Windowed tolerance in timestamp units (microseconds)
    pub fn merge_tolerance(&self) -> i64 {
        self.merge_tolerance_ms.saturating_mul(1_000)
    }

    /// Final-pass tolerance in timestamp units (microseconds)
    pub fn final_merge_tolerance(&self) -> i64 {
        self.final_merge_tolerance_ms.saturating_mul(1_000)
    }
}
