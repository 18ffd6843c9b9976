//! Windows Event XML payloads
//!
//! Decodes the `System` and `EventData` blocks of one event with a pull
//! parser. Elements outside those blocks (`UserData`, rendering info) are
//! skipped.

use chrono::DateTime;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvtxError {
    #[error("XML error at byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },
}

/// The `System` block of an event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemBlock {
    pub provider_name: String,
    pub provider_guid: String,
    pub event_id: u32,
    pub version: String,
    /// `TimeCreated/@SystemTime`, ISO-8601 as written by the event log
    pub time_created: String,
    pub event_record_id: String,
    /// `Execution/@ProcessID`
    pub process_id: String,
    /// `Execution/@ThreadID`
    pub thread_id: String,
    pub channel: String,
    pub computer: String,
    /// `Security/@UserID`
    pub user_id: String,
}

/// One `<Data Name="...">value</Data>` pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataField {
    pub name: String,
    pub value: String,
}

/// A decoded Windows event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvtxLog {
    pub system: SystemBlock,
    /// EventData pairs in document order
    pub event_data: Vec<DataField>,
}

impl EvtxLog {
    pub fn parse(xml: &str) -> Result<EvtxLog, EvtxError> {
        let mut reader = Reader::from_reader(xml.as_bytes());
        reader.trim_text(true);

        let mut log = EvtxLog::default();
        let mut path: Vec<String> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|source| EvtxError::Xml {
                position: reader.buffer_position(),
                source,
            })?;

            match event {
                XmlEvent::Start(ref e) => {
                    let tag = local_name(e);
                    log.open_element(&path, &tag, e);
                    path.push(tag);
                }
                XmlEvent::Empty(ref e) => {
                    let tag = local_name(e);
                    log.open_element(&path, &tag, e);
                }
                XmlEvent::Text(ref t) => {
                    let text = t.unescape().map_err(|source| EvtxError::Xml {
                        position: reader.buffer_position(),
                        source,
                    })?;
                    log.element_text(&path, &text);
                }
                XmlEvent::CData(ref t) => {
                    let text = String::from_utf8_lossy(t).to_string();
                    log.element_text(&path, &text);
                }
                XmlEvent::End(_) => {
                    path.pop();
                }
                XmlEvent::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(log)
    }

    fn open_element(&mut self, path: &[String], tag: &str, e: &BytesStart) {
        let parent = path.last().map(String::as_str).unwrap_or("");
        match (parent, tag) {
            ("System", "Provider") => {
                self.system.provider_name = attribute(e, "Name").unwrap_or_default();
                self.system.provider_guid = attribute(e, "Guid").unwrap_or_default();
            }
            ("System", "TimeCreated") => {
                self.system.time_created = attribute(e, "SystemTime").unwrap_or_default();
            }
            ("System", "Execution") => {
                self.system.process_id = attribute(e, "ProcessID").unwrap_or_default();
                self.system.thread_id = attribute(e, "ThreadID").unwrap_or_default();
            }
            ("System", "Security") => {
                self.system.user_id = attribute(e, "UserID").unwrap_or_default();
            }
            ("EventData", "Data") => {
                self.event_data.push(DataField {
                    name: attribute(e, "Name").unwrap_or_default(),
                    value: String::new(),
                });
            }
            _ => {}
        }
    }

    fn element_text(&mut self, path: &[String], text: &str) {
        let n = path.len();
        if n < 2 {
            return;
        }
        match (path[n - 2].as_str(), path[n - 1].as_str()) {
            ("System", "EventID") => {
                self.system.event_id = text.trim().parse().unwrap_or(0);
            }
            ("System", "Version") => self.system.version = text.to_string(),
            ("System", "EventRecordID") => self.system.event_record_id = text.to_string(),
            ("System", "Channel") => self.system.channel = text.to_string(),
            ("System", "Computer") => self.system.computer = text.to_string(),
            ("EventData", "Data") => {
                if let Some(field) = self.event_data.last_mut() {
                    field.value.push_str(text);
                }
            }
            _ => {}
        }
    }

    /// Value of the named EventData field, `None` when absent
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.event_data
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }

    /// Value of the named EventData field, empty when absent
    pub fn text(&self, name: &str) -> String {
        self.lookup(name).unwrap_or_default().to_string()
    }

    pub fn event_id(&self) -> u32 {
        self.system.event_id
    }

    /// True for events emitted by the Sysmon provider
    pub fn is_sysmon(&self) -> bool {
        self.system.provider_name.contains("Sysmon")
    }

    /// Creation time in microseconds since the Unix epoch
    pub fn timestamp(&self) -> Option<i64> {
        DateTime::parse_from_rfc3339(self.system.time_created.trim())
            .ok()
            .map(|dt| dt.timestamp_micros())
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

fn attribute(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .filter_map(Result::ok)
        .find(|attr| attr.key.local_name().as_ref() == name.as_bytes())
        .map(|attr| match attr.unescape_value() {
            Ok(value) => value.to_string(),
            Err(_) => String::from_utf8_lossy(&attr.value).to_string(),
        })
}
