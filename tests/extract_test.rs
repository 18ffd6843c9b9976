mod common;

use common::*;
use serde_json::json;
use timegraph::entity::EventType;
use timegraph::{extract, PipelineConfig, Pipeline, Record};

#[test]
fn test_process_creation_from_security_log() {
    let line = evtx_line(
        SECURITY,
        4688,
        30,
        &[
            ("SubjectUserName", "alice"),
            ("SubjectDomainName", "CORP"),
            ("SubjectLogonId", "0x1f4"),
            ("NewProcessId", "0x4"),
            ("NewProcessName", r"C:\a.exe"),
            ("ProcessId", "0x2"),
            ("CommandLine", r"C:\a.exe /quiet"),
            ("TargetUserName", "-"),
            ("ParentProcessName", r"C:\b.exe"),
        ],
    );
    let batch = extract(&Record::decode(&line));

    assert_eq!(batch.processes.len(), 1);
    let process = &batch.processes.as_slice()[0];
    assert_eq!(process.full_path, r"C:\a.exe");
    assert_eq!(process.filename, "a.exe");
    assert_eq!(process.pid, 4);
    assert_eq!(process.ppid, 2);
    assert_eq!(process.parent_process_name, r"C:\b.exe");
    assert_eq!(process.user, "alice");
    assert_eq!(process.computer, COMPUTER);
    assert_eq!(process.timestamp, BASE + 30_000_000);
    assert_eq!(process.evidence.len(), 1);
}

#[test]
fn test_password_change_roles() {
    let line = evtx_line(
        SECURITY,
        4723,
        0,
        &[
            ("TargetUserName", "bob"),
            ("TargetDomainName", "CORP"),
            ("SubjectUserName", "alice"),
            ("SubjectDomainName", "CORP"),
        ],
    );
    let batch = extract(&Record::decode(&line));

    let event = &batch.events.as_slice()[0];
    assert_eq!(event.event_type, EventType::PasswordChangeAttempted);
    assert_eq!(event.user_source, "alice");
    assert_eq!(event.user_destination, "bob");
    assert_eq!(event.title, "User alice attempted to change the password of bob.");
    assert_eq!(batch.users.len(), 2);
    assert_eq!(batch.domains.len(), 1);
}

#[test]
fn test_unresolved_connection_is_dropped() {
    let connection = |destination: &str| {
        evtx_line(
            SYSMON,
            3,
            5,
            &[
                ("Image", r"C:\x.exe"),
                ("ProcessId", "77"),
                ("Protocol", "tcp"),
                ("Initiated", "true"),
                ("SourceIp", "10.0.0.5"),
                ("SourcePort", "49700"),
                ("DestinationIp", destination),
                ("DestinationPort", "443"),
            ],
        )
    };

    let resolved = extract(&Record::decode(&connection("93.184.216.34")));
    assert_eq!(resolved.connections.len(), 1);
    assert!(resolved.connections.as_slice()[0].initiated);

    let unresolved = extract(&Record::decode(&connection("")));
    assert!(unresolved.connections.is_empty());
    assert_eq!(unresolved.computers.len(), 1);
}

#[test]
fn test_malformed_lines_yield_nothing() {
    for line in ["{not json", "[1, 2]", r#"{"data_type": "windows:evtx:record", "parser": "winevtx", "xml_string": "<Event><Sys"}"#] {
        let batch = extract(&Record::decode(line));
        assert!(batch.processes.is_empty());
        assert!(batch.events.is_empty());
    }
}

#[tokio::test]
async fn test_repeated_visits_stay_apart() {
    let chrome = json!({
        "data_type": "chrome:history:page_visited",
        "parser": "sqlite/chrome_66_history",
        "timestamp": BASE,
        "url": "https://example.com/login?next=/",
        "title": "Sign in",
        "typed_count": 1,
        "filename": r"C:\Users\alice\AppData\Local\Google\Chrome\User Data\Default\History",
        "hostname": "WS01",
        "message": "https://example.com/login?next=/ (Sign in)",
    })
    .to_string();
    let firefox = json!({
        "data_type": "firefox:places:page_visited",
        "parser": "sqlite/firefox_history",
        "timestamp": BASE + 2_000_000,
        "url": "https://example.com/login?next=/",
        "title": "Sign in",
        "host": "example.com",
        "visit_count": 3,
        "filename": r"C:\Users\alice\AppData\Roaming\Mozilla\Firefox\Profiles\x1.default\places.sqlite",
        "hostname": "WS01",
        "message": "https://example.com/login?next=/ (Sign in) [count: 3]",
    })
    .to_string();
    let file = timeline(&[chrome, firefox]);

    let (entities, stats) = Pipeline::new(&PipelineConfig::default()).run(file.path()).await.unwrap();
    assert_eq!(stats.lines, 2);
    assert_eq!(entities.web_histories.len(), 2);

    let visits = entities.web_histories.as_slice();
    assert_eq!(visits[0].domain, "example.com");
    assert_eq!(visits[0].path, "/login?next=/");
    assert_eq!(visits[0].user, "alice");
    assert_eq!(visits[0].visit_count, 1);
    assert_eq!(visits[1].domain, "example.com");
    assert_eq!(visits[1].user, "alice");
    assert_eq!(visits[1].visit_count, 3);
    assert_eq!(entities.users.len(), 1);
}
