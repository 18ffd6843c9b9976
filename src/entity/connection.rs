use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::to_datetime;

/// A network connection attributed to a process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub timestamp: i64,
    pub source_ip: String,
    pub source_port: i64,
    pub destination_ip: String,
    pub destination_port: i64,
    pub protocol: String,
    pub initiated: bool,
    pub process_name: String,
    pub process_id: i64,
    pub user: String,
    pub user_domain: String,
    pub computer: String,
    pub evidence: Vec<String>,
}

impl Connection {
    pub fn date(&self) -> DateTime<Utc> {
        to_datetime(self.timestamp)
    }

    /// Both endpoints carry an address
    pub fn is_resolved(&self) -> bool {
        !self.source_ip.trim().is_empty() && !self.destination_ip.trim().is_empty()
    }
}
