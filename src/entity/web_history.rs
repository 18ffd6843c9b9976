use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::to_datetime;

/// One browser history visit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebHistory {
    /// Last visit time
    pub timestamp: i64,
    pub url: String,
    pub domain: String,
    pub path: String,
    pub title: String,
    pub user: String,
    pub visit_count: i64,
    pub computer: String,
    pub evidence: Vec<String>,
}

impl WebHistory {
    pub fn date(&self) -> DateTime<Utc> {
        to_datetime(self.timestamp)
    }
}
