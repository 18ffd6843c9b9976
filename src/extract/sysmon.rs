//! Sysmon operational log
//!
//! Sysmon writes accounts as a single `DOMAIN\name` value and always names
//! the acting process by image path and PID.

use super::EventContext;
use crate::collection::EntityBatch;
use crate::entity::{
    extension, filename, split_identity, Computer, Connection, Domain, Event, EventSource,
    EventType, Process, User,
};
use crate::record::{EvtxLog, Record};

pub fn extract(record: &Record, log: &EvtxLog) -> EntityBatch {
    let ctx = EventContext::new(record, log);
    let event_id = log.event_id();
    let mut batch = EntityBatch::new();

    batch.computers.add(Computer {
        name: ctx.computer.clone(),
        domain: String::new(),
    });

    let account_fields: &[&str] = match event_id {
        1 => &["User", "ParentUser"],
        10 => &["SourceUser", "TargetUser"],
        _ => &["User"],
    };
    for field in account_fields {
        let (domain, name) = split_identity(&ctx.identity(field));
        batch.domains.add(Domain {
            name: domain.clone(),
        });
        if let Some(user) = User::from_account(&name, "", &domain) {
            batch.users.add(user);
        }
    }

    match event_id {
        1 => {
            batch.processes.add(process_creation(&ctx));
        }
        3 => {
            batch.connections.add(network_connection(&ctx));
        }
        _ => {
            let event_type = EventType::from_code(EventSource::Sysmon, event_id);
            if event_type.is_known() {
                batch.events.add(activity(&ctx, event_type));
            }
        }
    }

    batch
}

/// 1: process creation
fn process_creation(ctx: &EventContext) -> Process {
    let full_path = ctx.text("Image");
    let (user_domain, user) = split_identity(&ctx.identity("User"));
    let (parent_user_domain, parent_user) = split_identity(&ctx.identity("ParentUser"));
    Process {
        timestamp: ctx.timestamp,
        filename: filename(&full_path),
        full_path,
        pid: ctx.number("ProcessId"),
        commandline: ctx.text("CommandLine"),
        ppid: ctx.number("ParentProcessId"),
        parent_process_name: ctx.text("ParentImage"),
        parent_commandline: ctx.text("ParentCommandLine"),
        user,
        user_domain,
        parent_user,
        parent_user_domain,
        logon_id: ctx.number("LogonId"),
        computer: ctx.computer.clone(),
        hash: ctx.text("Hashes"),
        evidence: vec![ctx.evidence.clone()],
    }
}

/// 3: network connection
fn network_connection(ctx: &EventContext) -> Connection {
    let (user_domain, user) = split_identity(&ctx.identity("User"));
    Connection {
        timestamp: ctx.timestamp,
        source_ip: ctx.text("SourceIp"),
        source_port: ctx.number("SourcePort"),
        destination_ip: ctx.text("DestinationIp"),
        destination_port: ctx.number("DestinationPort"),
        protocol: ctx.text("Protocol"),
        initiated: ctx.text("Initiated").eq_ignore_ascii_case("true"),
        process_name: ctx.text("Image"),
        process_id: ctx.number("ProcessId"),
        user,
        user_domain,
        computer: ctx.computer.clone(),
        evidence: vec![ctx.evidence.clone()],
    }
}

/// 7, 9, 10, 11, 23 and 26
fn activity(ctx: &EventContext, event_type: EventType) -> Event {
    let mut event = Event {
        timestamp: ctx.timestamp,
        computer: ctx.computer.clone(),
        event_type,
        evidence: vec![ctx.evidence.clone()],
        ..Default::default()
    };

    let user_field = if event_type == EventType::ProcessAccess {
        event.process_source = ctx.text("SourceImage");
        event.process_source_id = ctx.number("SourceProcessId");
        event.process_target = ctx.text("TargetImage");
        event.process_target_id = ctx.number("TargetProcessId");
        let (domain, user) = split_identity(&ctx.identity("TargetUser"));
        event.user_destination = user;
        event.domain_destination = domain;
        "SourceUser"
    } else {
        event.process_source = ctx.text("Image");
        event.process_source_id = ctx.number("ProcessId");
        "User"
    };
    let (domain, user) = split_identity(&ctx.identity(user_field));
    event.user_source = user;
    event.domain_source = domain;

    event.full_path = match event_type {
        EventType::ImageLoaded => ctx.text("ImageLoaded"),
        EventType::RawAccessRead => ctx.text("Device"),
        EventType::FileCreated | EventType::FileDeleted => ctx.text("TargetFilename"),
        _ => String::new(),
    };
    if !event.full_path.is_empty() {
        event.filename = filename(&event.full_path);
        event.extension = extension(&event.filename);
    }

    event.title = title(&event);
    event
}

fn title(event: &Event) -> String {
    let process = format!("{} ({})", event.process_source, event.process_source_id);
    match event.event_type {
        EventType::ImageLoaded => format!("Image {} loaded by {}.", event.full_path, process),
        EventType::RawAccessRead => format!("Device {} read by {}.", event.full_path, process),
        EventType::ProcessAccess => format!(
            "Process {} accessed the memory of {} ({}).",
            process, event.process_target, event.process_target_id
        ),
        EventType::FileCreated => format!("File {} created by {}.", event.full_path, process),
        EventType::FileDeleted => format!("File {} deleted by {}.", event.full_path, process),
        other => other.label().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract as extract_record;
    use crate::extract::testing::{evtx_record, SYSMON};

    #[test]
    fn test_process_creation() {
        let record = evtx_record(
            SYSMON,
            1,
            &[
                ("Image", r"C:\Windows\System32\cmd.exe"),
                ("ProcessId", "6120"),
                ("CommandLine", "cmd.exe /c whoami"),
                ("User", r"CORP\alice"),
                ("LogonId", "0x5a3f1"),
                ("Hashes", "SHA256=ABCD"),
                ("ParentImage", r"C:\Windows\explorer.exe"),
                ("ParentProcessId", "3000"),
                ("ParentUser", r"CORP\alice"),
            ],
        );
        let batch = extract_record(&record);
        let p = &batch.processes.as_slice()[0];
        assert_eq!(p.filename, "cmd.exe");
        assert_eq!(p.pid, 6120);
        assert_eq!(p.ppid, 3000);
        assert_eq!(p.user, "alice");
        assert_eq!(p.user_domain, "CORP");
        assert_eq!(p.parent_user, "alice");
        assert_eq!(p.logon_id, 0x5a3f1);
        assert_eq!(p.hash, "SHA256=ABCD");

        assert_eq!(batch.users.len(), 1);
        assert_eq!(batch.domains.len(), 1);
        assert_eq!(batch.computers.len(), 1);
    }

    #[test]
    fn test_network_connection() {
        let record = evtx_record(
            SYSMON,
            3,
            &[
                ("Image", r"C:\Tools\nc.exe"),
                ("ProcessId", "812"),
                ("User", r"CORP\bob"),
                ("Protocol", "tcp"),
                ("Initiated", "true"),
                ("SourceIp", "10.0.0.5"),
                ("SourcePort", "49832"),
                ("DestinationIp", "203.0.113.9"),
                ("DestinationPort", "443"),
            ],
        );
        let batch = extract_record(&record);
        let c = &batch.connections.as_slice()[0];
        assert!(c.initiated);
        assert_eq!(c.destination_port, 443);
        assert_eq!(c.process_id, 812);
        assert_eq!(c.user, "bob");
    }

    #[test]
    fn test_unresolved_connection_is_dropped() {
        let record = evtx_record(
            SYSMON,
            3,
            &[("Image", r"C:\a.exe"), ("SourceIp", "10.0.0.5"), ("DestinationIp", "")],
        );
        assert!(extract_record(&record).connections.is_empty());
    }

    #[test]
    fn test_file_created() {
        let record = evtx_record(
            SYSMON,
            11,
            &[
                ("Image", r"C:\Windows\System32\cmd.exe"),
                ("ProcessId", "6120"),
                ("TargetFilename", r"C:\Temp\payload.dll"),
                ("User", r"CORP\alice"),
            ],
        );
        let batch = extract_record(&record);
        let e = &batch.events.as_slice()[0];
        assert_eq!(e.event_type, EventType::FileCreated);
        assert_eq!(e.filename, "payload.dll");
        assert_eq!(e.extension, "dll");
        assert_eq!(e.process_source_id, 6120);
        assert_eq!(e.user_source, "alice");
        assert_eq!(
            e.title,
            r"File C:\Temp\payload.dll created by C:\Windows\System32\cmd.exe (6120)."
        );
    }

    #[test]
    fn test_process_access_uses_source_process() {
        let record = evtx_record(
            SYSMON,
            10,
            &[
                ("SourceProcessId", "700"),
                ("SourceImage", r"C:\Tools\mimikatz.exe"),
                ("TargetProcessId", "640"),
                ("TargetImage", r"C:\Windows\System32\lsass.exe"),
                ("SourceUser", r"CORP\alice"),
                ("TargetUser", r"NT AUTHORITY\SYSTEM"),
            ],
        );
        let batch = extract_record(&record);
        let e = &batch.events.as_slice()[0];
        assert_eq!(e.event_type, EventType::ProcessAccess);
        assert_eq!(e.process_source_id, 700);
        assert_eq!(e.process_target_id, 640);
        assert_eq!(e.user_source, "alice");
        assert_eq!(e.user_destination, "SYSTEM");
        assert_eq!(batch.users.len(), 2);
    }
}
