//! Timeline builders shared by the integration tests
#![allow(dead_code)]

use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

pub const SECURITY: &str = "Microsoft-Windows-Security-Auditing";
pub const SYSMON: &str = "Microsoft-Windows-Sysmon";
pub const COMPUTER: &str = "WS01.corp.local";

/// 2021-03-04T10:20:00Z in microseconds
pub const BASE: i64 = 1_614_853_200_000_000;

/// One `windows:evtx:record` line, `second` seconds after [`BASE`]
pub fn evtx_line(provider: &str, event_id: u32, second: u32, data: &[(&str, &str)]) -> String {
    let fields: String = data
        .iter()
        .map(|(name, value)| format!("<Data Name=\"{}\">{}</Data>", name, value))
        .collect();
    let xml = format!(
        "<Event xmlns=\"http://schemas.microsoft.com/win/2004/08/events/event\">\
         <System><Provider Name=\"{}\"/><EventID>{}</EventID>\
         <TimeCreated SystemTime=\"2021-03-04T10:20:{:02}.000000Z\"/>\
         <Execution ProcessID=\"4\" ThreadID=\"8\"/>\
         <Computer>{}</Computer></System>\
         <EventData>{}</EventData></Event>",
        provider, event_id, second, COMPUTER, fields
    );
    json!({
        "data_type": "windows:evtx:record",
        "parser": "winevtx",
        "timestamp": BASE + i64::from(second) * 1_000_000,
        "timestamp_desc": "Content Modification Time",
        "xml_string": xml,
    })
    .to_string()
}

/// Write `lines` into a temporary timeline file
pub fn timeline(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

pub fn sysmon_process(second: u32, image: &str, pid: &str, parent: &str, ppid: &str) -> String {
    evtx_line(
        SYSMON,
        1,
        second,
        &[
            ("Image", image),
            ("ProcessId", pid),
            ("CommandLine", image),
            ("ParentImage", parent),
            ("ParentProcessId", ppid),
            ("User", r"CORP\alice"),
            ("LogonId", "0x3e7"),
        ],
    )
}

/// Route `tracing` output through the test harness; safe to call repeatedly
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
