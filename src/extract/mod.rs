//! Entity extraction
//!
//! One pure function per record kind turns a decoded [`Record`] into an
//! [`EntityBatch`]. Dispatch is on `data_type`, then, for Windows events,
//! on the provider (Sysmon or standard auditing) and the numeric event ID.
//! Anything without an extractor yields an empty batch.

pub mod artifacts;
pub mod security;
pub mod sysmon;

use tracing::{trace, warn};

use crate::collection::EntityBatch;
use crate::entity::is_absent;
use crate::record::{parse_int, DataType, EvtxLog, Record};

/// Extract every entity one record describes
pub fn extract(record: &Record) -> EntityBatch {
    match record.data_type {
        DataType::EvtxRecord => match &record.evtx {
            Some(log) if log.is_sysmon() => sysmon::extract(record, log),
            Some(log) => security::extract(record, log),
            None => {
                trace!("Event record without XML payload (parser {})", record.parser);
                EntityBatch::new()
            }
        },
        DataType::VolumeCreation if record.parser == "prefetch" => artifacts::prefetch(record),
        DataType::PrefetchExecution => artifacts::prefetch(record),
        DataType::UserAssist => artifacts::user_assist(record),
        DataType::ShellItemFileEntry => artifacts::shell_bag(record),
        DataType::TaskJob => artifacts::task_job(record),
        DataType::FirefoxPageVisited => artifacts::firefox_visit(record),
        DataType::ChromePageVisited => artifacts::chrome_visit(record),
        DataType::RegistryKeyValue => artifacts::registry_key(record),
        DataType::SamUsers => artifacts::sam_user(record),
        DataType::RegistryService => artifacts::registry_service(record),
        DataType::FileStat => artifacts::file_stat(record),
        DataType::VolumeCreation | DataType::Unknown => {
            trace!("No extractor for data_type {:?}", record.data_type_tag);
            EntityBatch::new()
        }
    }
}

/// Fields shared by everything extracted from one Windows event
pub(crate) struct EventContext<'a> {
    pub log: &'a EvtxLog,
    pub timestamp: i64,
    pub computer: String,
    pub evidence: String,
}

impl<'a> EventContext<'a> {
    pub fn new(record: &Record, log: &'a EvtxLog) -> Self {
        EventContext {
            log,
            timestamp: record.event_timestamp(),
            computer: log.system.computer.clone(),
            evidence: record.xml_string.clone(),
        }
    }

    /// Field value, empty when absent
    pub fn text(&self, name: &str) -> String {
        self.log.text(name)
    }

    /// Field value with the `-` placeholder treated as absent
    pub fn identity(&self, name: &str) -> String {
        match self.log.lookup(name) {
            Some(value) if !is_absent(value) => value.to_string(),
            _ => String::new(),
        }
    }

    /// Numeric field with base auto-detection
    ///
    /// Absent fields are zero. Unparsable ones are logged and zero; the rest
    /// of the record is still extracted.
    pub fn number(&self, name: &str) -> i64 {
        let Some(value) = self.log.lookup(name) else {
            return 0;
        };
        if is_absent(value) {
            return 0;
        }
        match parse_int(value) {
            Some(n) => n,
            None => {
                warn!(
                    "Event {} on {}: field {} is not a number: {:?}",
                    self.log.event_id(),
                    self.computer,
                    name,
                    value
                );
                0
            }
        }
    }

    /// `System/Execution/@ProcessID` of the logging process
    pub fn execution_pid(&self) -> i64 {
        parse_int(&self.log.system.process_id).unwrap_or(0)
    }
}
