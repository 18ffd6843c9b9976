//! Timeline record decoding
//!
//! One line of plaso `json_line` output becomes one [`Record`]. Field access
//! is lenient: a missing or mistyped field resolves to its zero value, so a
//! record never fails because one attribute has an unexpected shape. Only a
//! line that is not a JSON object at all is a [`DecodeError`].

pub mod evtx;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub use evtx::{DataField, EvtxError, EvtxLog, SystemBlock};

/// Parser tag carried by records with an embedded Windows Event XML payload
pub const WINEVTX_PARSER: &str = "winevtx";

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record is not a JSON object")]
    NotAnObject,
}

/// Closed vocabulary of timeline `data_type` values the extractors understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    EvtxRecord,
    VolumeCreation,
    PrefetchExecution,
    UserAssist,
    ShellItemFileEntry,
    TaskJob,
    FirefoxPageVisited,
    ChromePageVisited,
    RegistryKeyValue,
    SamUsers,
    RegistryService,
    FileStat,
    #[default]
    Unknown,
}

impl DataType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "windows:evtx:record" => DataType::EvtxRecord,
            "windows:volume:creation" => DataType::VolumeCreation,
            "windows:prefetch:execution" => DataType::PrefetchExecution,
            "windows:registry:userassist" => DataType::UserAssist,
            "windows:shell_item:file_entry" => DataType::ShellItemFileEntry,
            "windows:tasks:job" => DataType::TaskJob,
            "firefox:places:page_visited" => DataType::FirefoxPageVisited,
            "chrome:history:page_visited" => DataType::ChromePageVisited,
            "windows:registry:key_value" => DataType::RegistryKeyValue,
            "windows:registry:sam_users" => DataType::SamUsers,
            "windows:registry:service" => DataType::RegistryService,
            "fs:stat" | "fs:stat:ntfs" => DataType::FileStat,
            _ => DataType::Unknown,
        }
    }
}

/// One decoded timeline record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub data_type: DataType,
    /// The `data_type` text as found in the input
    pub data_type_tag: String,
    pub parser: String,
    pub filename: String,
    pub display_name: String,
    pub hostname: String,
    pub key_path: String,
    pub message: String,
    pub path_hints: Vec<String>,
    /// Microseconds since the Unix epoch
    pub timestamp: i64,
    pub timestamp_desc: String,
    pub xml_string: String,

    // Registry, UserAssist and ShellBags
    pub value_name: String,
    pub number_of_executions: i64,
    pub shell_item_path: String,
    pub entries: Vec<String>,

    // Prefetch
    pub executable: String,
    pub run_count: i64,

    // Task Scheduler jobs
    pub application: String,
    pub comment: String,

    // Browser history
    pub url: String,
    pub title: String,
    pub typed_count: i64,
    pub host: String,
    pub visit_count: i64,

    // SAM users
    pub username: String,
    pub fullname: String,
    pub comments: String,

    // Registry services
    pub name: String,
    pub image_path: String,
    pub service_type: i64,
    pub start_type: i64,
    pub error_control: i64,
    pub service_dll: String,
    pub object_name: String,

    // File system stat
    pub is_allocated: bool,

    /// Decoded Windows Event XML, present when `parser == "winevtx"`
    pub evtx: Option<EvtxLog>,
}

impl Record {
    /// Decode one line, never failing
    ///
    /// A malformed line is logged and yields an empty `Unknown` record, which
    /// every extractor ignores.
    pub fn decode(line: &str) -> Record {
        match Record::try_decode(line) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed record: {}", e);
                Record::default()
            }
        }
    }

    /// Decode one line, reporting malformed JSON
    pub fn try_decode(line: &str) -> Result<Record, DecodeError> {
        let value: Value = serde_json::from_str(line)?;
        match value {
            Value::Object(obj) => Ok(Record::from_object(&obj)),
            _ => Err(DecodeError::NotAnObject),
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Record {
        let data_type_tag = text(obj, "data_type");
        let parser = text(obj, "parser");
        let xml_string = text(obj, "xml_string");

        let evtx = if parser == WINEVTX_PARSER {
            match EvtxLog::parse(&xml_string) {
                Ok(log) => Some(log),
                Err(e) => {
                    debug!("Keeping event record without event data: {}", e);
                    Some(EvtxLog::default())
                }
            }
        } else {
            None
        };

        Record {
            data_type: DataType::from_tag(&data_type_tag),
            data_type_tag,
            parser,
            filename: text(obj, "filename"),
            display_name: text(obj, "display_name"),
            hostname: text(obj, "hostname"),
            key_path: text(obj, "key_path"),
            message: text(obj, "message"),
            path_hints: text_list(obj, "path_hints"),
            timestamp: integer(obj, "timestamp"),
            timestamp_desc: text(obj, "timestamp_desc"),
            xml_string,
            value_name: text(obj, "value_name"),
            number_of_executions: integer(obj, "number_of_executions"),
            shell_item_path: text(obj, "shell_item_path"),
            entries: match obj.get("values") {
                Some(_) => text_list(obj, "values"),
                None => text_list(obj, "entries"),
            },
            executable: text(obj, "executable"),
            run_count: integer(obj, "run_count"),
            application: text(obj, "application"),
            comment: text(obj, "comment"),
            url: text(obj, "url"),
            title: text(obj, "title"),
            typed_count: integer(obj, "typed_count"),
            host: text(obj, "host"),
            visit_count: integer(obj, "visit_count"),
            username: text(obj, "username"),
            fullname: text(obj, "fullname"),
            comments: text(obj, "comments"),
            name: text(obj, "name"),
            image_path: text(obj, "image_path"),
            service_type: integer(obj, "service_type"),
            start_type: integer(obj, "start_type"),
            error_control: integer(obj, "error_control"),
            service_dll: text(obj, "service_dll"),
            object_name: text(obj, "object_name"),
            is_allocated: boolean(obj, "is_allocated"),
            evtx,
        }
    }

    /// Timestamp of the underlying event in microseconds
    ///
    /// Windows events carry their own creation time; everything else uses
    /// the timeline timestamp.
    pub fn event_timestamp(&self) -> i64 {
        self.evtx
            .as_ref()
            .and_then(|log| log.timestamp())
            .unwrap_or(self.timestamp)
    }

    /// Host the record was collected from, as far as it is known
    pub fn computer(&self) -> &str {
        match &self.evtx {
            Some(log) if !log.system.computer.is_empty() => &log.system.computer,
            _ => &self.hostname,
        }
    }
}

/// Parse an integer with base auto-detection
///
/// Accepts `0x` (hex), `0o` or a leading `0` (octal), `0b` (binary) and plain
/// decimal, with an optional sign.
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() {
        return None;
    }

    let lower = digits.to_ascii_lowercase();
    let parsed = if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8)
    } else if lower.len() > 1 && lower.starts_with('0') {
        i64::from_str_radix(&lower[1..], 8)
    } else {
        lower.parse::<i64>()
    };

    parsed.ok().map(|n| if negative { -n } else { n })
}

fn text(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn integer(obj: &Map<String, Value>, key: &str) -> i64 {
    match obj.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => parse_int(s).unwrap_or(0),
        Some(Value::Bool(b)) => *b as i64,
        _ => 0,
    }
}

fn boolean(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().map(|i| i != 0).unwrap_or(false),
        Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

fn text_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_bases() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x1f4"), Some(500));
        assert_eq!(parse_int("0X10"), Some(16));
        assert_eq!(parse_int("010"), Some(8));
        assert_eq!(parse_int("0o17"), Some(15));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("0"), Some(0));
        assert_eq!(parse_int("-12"), Some(-12));
        assert_eq!(parse_int(" 7 "), Some(7));
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("-"), None);
        assert_eq!(parse_int("0xZZ"), None);
        assert_eq!(parse_int("09"), None);
    }

    #[test]
    fn test_decode_lenient_fields() {
        let line = r#"{"data_type": "chrome:history:page_visited", "parser": "chrome_27_history",
            "timestamp": 1600000000123456, "url": "https://example.com/a", "typed_count": "3",
            "visit_count": 2.0, "is_allocated": "true", "title": 5}"#;
        let record = Record::try_decode(line).unwrap();
        assert_eq!(record.data_type, DataType::ChromePageVisited);
        assert_eq!(record.timestamp, 1_600_000_000_123_456);
        assert_eq!(record.url, "https://example.com/a");
        assert_eq!(record.typed_count, 3);
        assert_eq!(record.visit_count, 2);
        assert!(record.is_allocated);
        assert_eq!(record.title, "5");
        assert!(record.evtx.is_none());
    }

    #[test]
    fn test_decode_unknown_data_type() {
        let record = Record::decode(r#"{"data_type": "macos:fseventsd:record"}"#);
        assert_eq!(record.data_type, DataType::Unknown);
        assert_eq!(record.data_type_tag, "macos:fseventsd:record");
    }

    #[test]
    fn test_decode_malformed_line() {
        assert!(matches!(Record::try_decode("{not json"), Err(DecodeError::Json(_))));
        assert!(matches!(Record::try_decode("[1, 2]"), Err(DecodeError::NotAnObject)));
        assert_eq!(Record::decode("{not json"), Record::default());
    }

    #[test]
    fn test_decode_registry_values() {
        let line = r#"{"data_type": "windows:registry:key_value", "key_path": "HKLM\\Software\\Run",
            "values": ["Updater: [REG_SZ] C:\\u.exe", {"name": "x"}]}"#;
        let record = Record::decode(line);
        assert_eq!(record.data_type, DataType::RegistryKeyValue);
        assert_eq!(record.entries.len(), 2);
        assert_eq!(record.entries[0], "Updater: [REG_SZ] C:\\u.exe");
    }

    #[test]
    fn test_decode_evtx_with_bad_xml_keeps_record() {
        let line = r#"{"data_type": "windows:evtx:record", "parser": "winevtx",
            "timestamp": 10, "xml_string": "<Event><System></Event>"}"#;
        let record = Record::decode(line);
        assert_eq!(record.data_type, DataType::EvtxRecord);
        let evtx = record.evtx.as_ref().unwrap();
        assert!(evtx.event_data.is_empty());
        assert_eq!(record.event_timestamp(), 10);
    }
}
