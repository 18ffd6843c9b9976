use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::to_datetime;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub timestamp: i64,
    pub full_path: String,
    pub filename: String,
    pub extension: String,
    /// Which file-system time the timestamp is (creation, modification, ...)
    pub timestamp_desc: String,
    pub is_allocated: bool,
    pub computer: String,
    pub evidence: Vec<String>,
}

impl File {
    pub fn date(&self) -> DateTime<Utc> {
        to_datetime(self.timestamp)
    }
}
