use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::to_datetime;

/// A registry key with the values it held at its last write time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    /// Last write time of the key
    pub timestamp: i64,
    /// Hive file the key was read from
    pub hive: String,
    pub key: String,
    pub entries: Vec<String>,
    pub computer: String,
    pub evidence: Vec<String>,
}

impl Registry {
    pub fn date(&self) -> DateTime<Utc> {
        to_datetime(self.timestamp)
    }
}
