//! Canonical forensic entities
//!
//! Every entity carries its timestamp in microseconds since the Unix epoch
//! and keeps the raw record(s) it was built from as `evidence`. Absent
//! fields are empty strings or zero, never placeholder text.

pub mod connection;
pub mod event;
pub mod file;
pub mod host;
pub mod process;
pub mod registry;
pub mod script_block;
pub mod service;
pub mod task;
pub mod user;
pub mod web_history;

pub use connection::Connection;
pub use event::{Event, EventSource, EventType};
pub use file::File;
pub use host::{Computer, Domain, Group};
pub use process::Process;
pub use registry::Registry;
pub use script_block::{ScriptBlock, ScriptFragment};
pub use service::Service;
pub use task::ScheduledTask;
pub use user::User;
pub use web_history::WebHistory;

use chrono::{DateTime, Utc};

/// Render a microsecond timestamp as a UTC date
pub fn to_datetime(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(timestamp).unwrap_or_default()
}

/// Last component of a Windows or POSIX path
pub fn filename(path: &str) -> String {
    path.rsplit(['\\', '/']).next().unwrap_or_default().to_string()
}

/// Text after the last `.` of a file name, empty when there is none
pub fn extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_string(),
        None => String::new(),
    }
}

/// Account name embedded in a profile path such as `C:\Users\bob\NTUSER.DAT`
///
/// Both separators are accepted. The user is the component right after a
/// `Users` component (case-insensitive); paths without one yield `None`.
pub fn username_from_path(path: &str) -> Option<String> {
    let mut components = path.split(['\\', '/']).filter(|c| !c.is_empty());
    while let Some(component) = components.next() {
        if component.eq_ignore_ascii_case("users") {
            return components.next().map(str::to_string);
        }
    }
    None
}

/// Split a `DOMAIN\name` value into `(domain, name)`
///
/// A value without a separator only populates the name.
pub fn split_identity(value: &str) -> (String, String) {
    match value.split_once('\\') {
        Some((domain, name)) => (domain.to_string(), name.to_string()),
        None => (String::new(), value.to_string()),
    }
}

/// Windows writes `-` where an identity field does not apply
pub fn is_absent(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == "-"
}

/// Append the items of `src` not already present in `dst`
pub fn union_evidence(dst: &mut Vec<String>, src: Vec<String>) {
    for item in src {
        if !dst.contains(&item) {
            dst.push(item);
        }
    }
}

pub(crate) fn fill(dst: &mut String, src: &str) {
    if dst.is_empty() && !src.is_empty() {
        *dst = src.to_string();
    }
}

pub(crate) fn fill_int(dst: &mut i64, src: i64) {
    if *dst == 0 {
        *dst = src;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_and_extension() {
        assert_eq!(filename(r"C:\Windows\System32\cmd.exe"), "cmd.exe");
        assert_eq!(filename("/usr/bin/python3"), "python3");
        assert_eq!(filename("notepad.exe"), "notepad.exe");
        assert_eq!(filename(""), "");
        assert_eq!(extension("cmd.exe"), "exe");
        assert_eq!(extension("archive.tar.gz"), "gz");
        assert_eq!(extension("README"), "");
    }

    #[test]
    fn test_username_from_path() {
        assert_eq!(
            username_from_path(r"C:\Users\bob\AppData\Local\Google\Chrome\User Data\Default\History"),
            Some("bob".to_string())
        );
        assert_eq!(
            username_from_path("/mnt/c/Users/alice/NTUSER.DAT"),
            Some("alice".to_string())
        );
        assert_eq!(username_from_path(r"\USERS\carol\ntuser.dat"), Some("carol".to_string()));
        assert_eq!(username_from_path(r"C:\Windows\System32\config\SAM"), None);
        assert_eq!(username_from_path(r"C:\Users"), None);
    }

    #[test]
    fn test_split_identity() {
        assert_eq!(
            split_identity(r"NT AUTHORITY\SYSTEM"),
            ("NT AUTHORITY".to_string(), "SYSTEM".to_string())
        );
        assert_eq!(split_identity("alice"), (String::new(), "alice".to_string()));
    }

    #[test]
    fn test_union_evidence() {
        let mut dst = vec!["a".to_string(), "b".to_string()];
        union_evidence(&mut dst, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(dst, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_to_datetime() {
        let date = to_datetime(1_000_000);
        assert_eq!(date.timestamp(), 1);
    }
}
