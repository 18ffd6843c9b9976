//! Non-event-log artifacts: prefetch, registry, shell items, task jobs,
//! browser history and file system metadata
//!
//! Artifact records carry the collecting host in `hostname` and keep the
//! timeline `message` as evidence.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::collection::EntityBatch;
use crate::entity::service::{error_control_name, service_type_name, start_type_name};
use crate::entity::{
    extension, filename, split_identity, username_from_path, File, Process, Registry,
    ScheduledTask, Service, User, WebHistory,
};
use crate::record::Record;

const EXECUTABLE_EXTENSIONS: [&str; 7] = ["exe", "com", "bat", "cmd", "ps1", "scr", "msi"];

fn is_executable(name: &str) -> bool {
    let ext = extension(name);
    EXECUTABLE_EXTENSIONS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(&ext))
}

fn evidence(record: &Record) -> Vec<String> {
    vec![record.message.clone()]
}

/// Process launched from `full_path` on the record's host
fn launched(record: &Record, full_path: &str) -> Process {
    Process {
        timestamp: record.timestamp,
        full_path: full_path.to_string(),
        filename: filename(full_path),
        computer: record.hostname.clone(),
        evidence: evidence(record),
        ..Default::default()
    }
}

fn add_profile_user(batch: &mut EntityBatch, name: &str) {
    if let Some(user) = User::from_account(name, "", "") {
        batch.users.add(user);
    }
}

/// Executable named by a prefetch file, `CMD.EXE-0BD30981.pf` → `CMD.EXE`
fn prefetch_executable(pf_path: &str) -> String {
    let name = filename(pf_path);
    let stem = match name.len().checked_sub(3) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".pf") => {
            &name[..cut]
        }
        _ => name.as_str(),
    };
    match stem.rsplit_once('-') {
        Some((executable, _hash)) => executable.to_string(),
        None => stem.to_string(),
    }
}

pub fn prefetch(record: &Record) -> EntityBatch {
    let executable = if record.executable.is_empty() {
        prefetch_executable(&record.filename)
    } else {
        record.executable.clone()
    };
    let full_path = record
        .path_hints
        .first()
        .filter(|hint| !hint.is_empty())
        .cloned()
        .unwrap_or_else(|| executable.clone());

    let mut process = launched(record, &full_path);
    if process.filename.is_empty() {
        process.filename = executable;
    }

    let mut batch = EntityBatch::new();
    batch.processes.add(process);
    batch
}

pub fn user_assist(record: &Record) -> EntityBatch {
    let mut batch = EntityBatch::new();
    if !is_executable(&record.value_name) {
        debug!("UserAssist entry is not a program: {}", record.value_name);
        return batch;
    }

    let mut process = launched(record, &record.value_name);
    if let Some(user) = username_from_path(&record.filename) {
        add_profile_user(&mut batch, &user);
        process.user = user;
    }
    batch.processes.add(process);
    batch
}

pub fn shell_bag(record: &Record) -> EntityBatch {
    let mut batch = EntityBatch::new();
    if is_executable(&record.shell_item_path) {
        let mut process = launched(record, &record.shell_item_path);
        if let Some(user) = username_from_path(&record.filename) {
            process.user = user;
        }
        batch.processes.add(process);
    }
    batch
}

fn task_message_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"by: (?P<user>.*) Working directory.*Trigger type: (?P<trigger>.*)").ok()
        })
        .as_ref()
}

pub fn task_job(record: &Record) -> EntityBatch {
    let mut task = ScheduledTask {
        application: record.application.clone(),
        comment: record.comment.clone(),
        computer: record.hostname.clone(),
        evidence: evidence(record),
        ..Default::default()
    };

    if let Some(caps) = task_message_pattern().and_then(|re| re.captures(&record.message)) {
        if let Some(user) = caps.name("user") {
            task.user = split_identity(user.as_str().trim()).1;
        }
        if let Some(trigger) = caps.name("trigger") {
            task.trigger = trigger.as_str().trim().to_string();
        }
    }

    let mut batch = EntityBatch::new();
    batch.tasks.add(task);
    batch
}

fn url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^https?://(?P<domain>[^/]+)(?P<path>.*)").ok())
        .as_ref()
}

/// Split an http(s) URL into domain and path
fn split_url(url: &str) -> Option<(String, String)> {
    let caps = url_pattern()?.captures(url)?;
    Some((caps["domain"].to_string(), caps["path"].to_string()))
}

fn visit(record: &Record, visit_count: i64) -> EntityBatch {
    let mut visit = WebHistory {
        timestamp: record.timestamp,
        url: record.url.clone(),
        title: record.title.clone(),
        visit_count,
        computer: record.hostname.clone(),
        evidence: evidence(record),
        ..Default::default()
    };

    match split_url(&record.url) {
        Some((domain, path)) => {
            visit.domain = domain;
            visit.path = path;
        }
        None => debug!("Unable to split domain and path from {:?}", record.url),
    }
    if !record.host.is_empty() {
        visit.domain = record.host.clone();
    }

    let mut batch = EntityBatch::new();
    if let Some(user) = username_from_path(&record.filename) {
        add_profile_user(&mut batch, &user);
        visit.user = user;
    }
    batch.web_histories.add(visit);
    batch
}

pub fn firefox_visit(record: &Record) -> EntityBatch {
    visit(record, record.visit_count)
}

pub fn chrome_visit(record: &Record) -> EntityBatch {
    let count = if record.visit_count != 0 {
        record.visit_count
    } else {
        record.typed_count
    };
    visit(record, count)
}

pub fn registry_key(record: &Record) -> EntityBatch {
    let mut batch = EntityBatch::new();
    batch.registries.add(Registry {
        timestamp: record.timestamp,
        hive: record.filename.clone(),
        key: record.key_path.clone(),
        entries: record.entries.clone(),
        computer: record.hostname.clone(),
        evidence: evidence(record),
    });
    batch
}

pub fn sam_user(record: &Record) -> EntityBatch {
    let mut batch = EntityBatch::new();
    let user = User {
        username: record.username.clone(),
        full_name: record.fullname.clone(),
        comments: record.comments.clone(),
        last_password_change: if record.timestamp_desc.contains("Password") {
            record.timestamp
        } else {
            0
        },
        ..Default::default()
    };
    batch.users.add(user);
    batch
}

pub fn registry_service(record: &Record) -> EntityBatch {
    let mut batch = EntityBatch::new();
    batch.services.add(Service {
        name: record.name.clone(),
        filename: record.image_path.clone(),
        user: record.object_name.clone(),
        dll: record.service_dll.clone(),
        service_type: service_type_name(record.service_type),
        start_type: start_type_name(record.start_type),
        error_control: error_control_name(record.error_control),
        computer: record.hostname.clone(),
        evidence: evidence(record),
    });
    batch
}

pub fn file_stat(record: &Record) -> EntityBatch {
    let full_path = record
        .path_hints
        .first()
        .filter(|hint| !hint.is_empty())
        .cloned()
        .unwrap_or_else(|| record.filename.clone());
    let name = filename(&full_path);

    let mut batch = EntityBatch::new();
    batch.files.add(File {
        timestamp: record.timestamp,
        extension: extension(&name),
        filename: name,
        full_path,
        timestamp_desc: record.timestamp_desc.clone(),
        is_allocated: record.is_allocated,
        computer: record.hostname.clone(),
        evidence: evidence(record),
    });
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;

    #[test]
    fn test_prefetch_executable_name() {
        assert_eq!(prefetch_executable(r"\Windows\Prefetch\CMD.EXE-0BD30981.pf"), "CMD.EXE");
        assert_eq!(prefetch_executable("NOTEPAD.EXE.PF"), "NOTEPAD.EXE");
        assert_eq!(prefetch_executable("odd"), "odd");
    }

    #[test]
    fn test_prefetch_volume_creation() {
        let record = Record::decode(
            r#"{"data_type": "windows:volume:creation", "parser": "prefetch",
                "filename": "\\Windows\\Prefetch\\CMD.EXE-0BD30981.pf",
                "hostname": "WS01", "timestamp": 1000, "message": "pf"}"#,
        );
        let batch = extract(&record);
        let p = &batch.processes.as_slice()[0];
        assert_eq!(p.filename, "CMD.EXE");
        assert_eq!(p.computer, "WS01");
        assert_eq!(p.evidence, vec!["pf"]);
    }

    #[test]
    fn test_prefetch_execution_with_path_hint() {
        let record = Record::decode(
            r#"{"data_type": "windows:prefetch:execution", "executable": "NC.EXE",
                "path_hints": ["\\TOOLS\\NC.EXE"], "timestamp": 5}"#,
        );
        let batch = extract(&record);
        let p = &batch.processes.as_slice()[0];
        assert_eq!(p.full_path, r"\TOOLS\NC.EXE");
        assert_eq!(p.filename, "NC.EXE");
    }

    #[test]
    fn test_user_assist() {
        let record = Record::decode(
            r#"{"data_type": "windows:registry:userassist",
                "filename": "C:\\Users\\bob\\NTUSER.DAT",
                "value_name": "C:\\Tools\\procdump.exe", "message": "ua"}"#,
        );
        let batch = extract(&record);
        let p = &batch.processes.as_slice()[0];
        assert_eq!(p.filename, "procdump.exe");
        assert_eq!(p.user, "bob");
        assert_eq!(batch.users.as_slice()[0].username, "bob");

        let shortcut = Record::decode(
            r#"{"data_type": "windows:registry:userassist", "value_name": "UEME_CTLSESSION"}"#,
        );
        assert!(extract(&shortcut).is_empty());
    }

    #[test]
    fn test_shell_bag_only_executables() {
        let exe = Record::decode(
            r#"{"data_type": "windows:shell_item:file_entry",
                "shell_item_path": "My Computer\\C:\\Tools\\nc.exe"}"#,
        );
        assert_eq!(extract(&exe).processes.as_slice()[0].filename, "nc.exe");

        let doc = Record::decode(
            r#"{"data_type": "windows:shell_item:file_entry",
                "shell_item_path": "My Computer\\C:\\Docs\\report.docx"}"#,
        );
        assert!(extract(&doc).processes.is_empty());
    }

    #[test]
    fn test_task_job_message() {
        let record = Record::decode(
            r#"{"data_type": "windows:tasks:job", "application": "C:\\u.exe",
                "comment": "updater",
                "message": "Application: C:\\u.exe Scheduled by: NT AUTHORITY\\SYSTEM Working directory: C:\\ Trigger type: DAILY"}"#,
        );
        let batch = extract(&record);
        let task = &batch.tasks.as_slice()[0];
        assert_eq!(task.user, "SYSTEM");
        assert_eq!(task.trigger, "DAILY");
        assert_eq!(task.application, r"C:\u.exe");
    }

    #[test]
    fn test_chrome_visit() {
        let record = Record::decode(
            r#"{"data_type": "chrome:history:page_visited",
                "url": "https://example.com/a/b?q=1", "title": "Example",
                "typed_count": 3,
                "filename": "/mnt/c/Users/alice/AppData/Local/Google/Chrome/User Data/Default/History"}"#,
        );
        let batch = extract(&record);
        let visit = &batch.web_histories.as_slice()[0];
        assert_eq!(visit.domain, "example.com");
        assert_eq!(visit.path, "/a/b?q=1");
        assert_eq!(visit.visit_count, 3);
        assert_eq!(visit.user, "alice");
    }

    #[test]
    fn test_firefox_visit_prefers_host() {
        let record = Record::decode(
            r#"{"data_type": "firefox:places:page_visited",
                "url": "http://intranet/login", "host": "intranet.corp", "visit_count": 2}"#,
        );
        let extracted = extract(&record);
        let visit = &extracted.web_histories.as_slice()[0];
        assert_eq!(visit.domain, "intranet.corp");
        assert_eq!(visit.path, "/login");
        assert_eq!(visit.user, "");
    }

    #[test]
    fn test_registry_service_codes() {
        let record = Record::decode(
            r#"{"data_type": "windows:registry:service", "name": "evil",
                "image_path": "C:\\evil.exe", "service_type": 16, "start_type": 2,
                "error_control": 1, "object_name": "LocalSystem"}"#,
        );
        let extracted = extract(&record);
        let svc = &extracted.services.as_slice()[0];
        assert_eq!(svc.service_type, "Win32OwnProcess");
        assert_eq!(svc.start_type, "Automatic");
        assert_eq!(svc.error_control, "Normal");
        assert_eq!(svc.user, "LocalSystem");
    }

    #[test]
    fn test_sam_user_password_change() {
        let record = Record::decode(
            r#"{"data_type": "windows:registry:sam_users", "username": "carol",
                "fullname": "Carol C", "timestamp": 77,
                "timestamp_desc": "Last Password Reset Time"}"#,
        );
        let extracted = extract(&record);
        let user = &extracted.users.as_slice()[0];
        assert_eq!(user.full_name, "Carol C");
        assert_eq!(user.last_password_change, 77);
    }

    #[test]
    fn test_file_stat() {
        let record = Record::decode(
            r#"{"data_type": "fs:stat:ntfs", "filename": "\\Temp\\x.ps1",
                "is_allocated": true, "timestamp_desc": "Creation Time"}"#,
        );
        let extracted = extract(&record);
        let file = &extracted.files.as_slice()[0];
        assert_eq!(file.filename, "x.ps1");
        assert_eq!(file.extension, "ps1");
        assert!(file.is_allocated);
    }

    #[test]
    fn test_registry_key() {
        let record = Record::decode(
            r#"{"data_type": "windows:registry:key_value",
                "key_path": "HKEY_LOCAL_MACHINE\\Software\\Run",
                "values": ["evil: C:\\evil.exe"], "filename": "SOFTWARE"}"#,
        );
        let extracted = extract(&record);
        let reg = &extracted.registries.as_slice()[0];
        assert_eq!(reg.hive, "SOFTWARE");
        assert_eq!(reg.entries.len(), 1);
    }
}
