//! Standard Windows auditing events
//!
//! The `Subject*` and `Target*` fields play different roles depending on the
//! event ID:
//!
//! | IDs | source user | destination user |
//! |-----|-------------|------------------|
//! | 4624, 4625, 4634, 4647 | target (session principal) | subject (requester) |
//! | 4648, 4720-4726, 4738, 4740, 4767 | subject (actor) | target (account) |
//! | 4704, 4705 | subject (actor) | `TargetSid` |
//! | group management | subject (actor) | member |
//!
//! For group management the target fields name the group itself and the
//! member comes from `MemberName` (CN of the DN) or `MemberSid`.

use regex::Regex;
use std::sync::OnceLock;

use super::EventContext;
use crate::collection::EntityBatch;
use crate::entity::service::{service_type_name, start_type_name};
use crate::entity::{
    filename, Computer, Domain, Event, EventSource, EventType, Group, Process,
    ScheduledTask, ScriptBlock, ScriptFragment, Service, User,
};
use crate::record::{parse_int, EvtxLog, Record};

/// Who a user field of an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Roles {
    /// Target is the principal of the session, subject the requester
    Session,
    /// Subject acts on the target account
    ActorOnAccount,
    /// Subject assigns or removes a right of `TargetSid`
    ActorOnSid,
    /// Subject manages the group named by the target fields
    ActorOnGroup,
}

fn roles(event_type: EventType) -> Option<Roles> {
    match event_type {
        EventType::Logon | EventType::FailedLogon | EventType::Logoff => Some(Roles::Session),
        EventType::UserRightAssigned | EventType::UserRightRemoved => Some(Roles::ActorOnSid),
        t if t.is_group_event() => Some(Roles::ActorOnGroup),
        EventType::Unknown => None,
        _ => Some(Roles::ActorOnAccount),
    }
}

/// IDs whose target fields name a group rather than an account
fn targets_group(event_id: u32) -> bool {
    matches!(
        event_id,
        4727..=4735 | 4737 | 4754..=4758 | 4764 | 4799
    )
}

pub fn extract(record: &Record, log: &EvtxLog) -> EntityBatch {
    let ctx = EventContext::new(record, log);
    let event_id = log.event_id();
    let event_type = EventType::from_code(EventSource::Security, event_id);
    let mut batch = EntityBatch::new();

    batch.computers.add(Computer {
        name: ctx.computer.clone(),
        domain: String::new(),
    });
    batch.domains.add(Domain {
        name: ctx.identity("SubjectDomainName"),
    });

    if let Some(subject) = User::from_account(
        &ctx.text("SubjectUserName"),
        &ctx.text("SubjectUserSid"),
        &ctx.text("SubjectDomainName"),
    ) {
        batch.users.add(subject);
    }

    if targets_group(event_id) {
        if let Some(member) = User::from_account(&member_name(&ctx), "", "") {
            batch.users.add(member);
        }
    } else if !matches!(event_id, 4704 | 4705) {
        batch.domains.add(Domain {
            name: ctx.identity("TargetDomainName"),
        });
        if let Some(target) = User::from_account(
            &ctx.text("TargetUserName"),
            &ctx.text("TargetUserSid"),
            &ctx.text("TargetDomainName"),
        ) {
            batch.users.add(target);
        }
    }

    match event_id {
        4688 => {
            batch.processes.add(process_creation(&ctx));
        }
        4103 | 4104 if log.system.provider_name.contains("PowerShell") => {
            batch.script_blocks.add(script_block(&ctx, event_id));
        }
        4697 | 7045 => {
            batch.services.add(service_install(&ctx, event_id));
        }
        4698 => {
            batch.tasks.add(task_registration(&ctx));
        }
        _ => {}
    }

    if let Some(roles) = roles(event_type) {
        let event = account_event(&ctx, event_type, roles);
        if roles == Roles::ActorOnGroup {
            batch.groups.add(Group {
                name: event.group_name.clone(),
                domain: event.group_domain.clone(),
                computer: ctx.computer.clone(),
                evidence: vec![ctx.evidence.clone()],
            });
        }
        batch.events.add(event);
    }

    batch
}

/// 4688: a new process has been created
fn process_creation(ctx: &EventContext) -> Process {
    let full_path = ctx.text("NewProcessName");
    // Since Windows 10 the target fields name the new process' account when
    // it differs from the creator; otherwise they are `-`.
    let (user, user_domain, logon_id) = if ctx.identity("TargetUserName").is_empty() {
        (
            ctx.identity("SubjectUserName"),
            ctx.identity("SubjectDomainName"),
            ctx.number("SubjectLogonId"),
        )
    } else {
        (
            ctx.identity("TargetUserName"),
            ctx.identity("TargetDomainName"),
            ctx.number("TargetLogonId"),
        )
    };

    Process {
        timestamp: ctx.timestamp,
        filename: filename(&full_path),
        full_path,
        pid: ctx.number("NewProcessId"),
        commandline: ctx.text("CommandLine"),
        ppid: ctx.number("ProcessId"),
        parent_process_name: ctx.text("ParentProcessName"),
        parent_commandline: String::new(),
        user,
        user_domain,
        parent_user: ctx.identity("SubjectUserName"),
        parent_user_domain: ctx.identity("SubjectDomainName"),
        logon_id,
        computer: ctx.computer.clone(),
        hash: String::new(),
        evidence: vec![ctx.evidence.clone()],
    }
}

/// 4104 (script block logging) and 4103 (module logging)
fn script_block(ctx: &EventContext, event_id: u32) -> ScriptBlock {
    let mut block = ScriptBlock {
        timestamp: ctx.timestamp,
        computer: ctx.computer.clone(),
        process_id: ctx.execution_pid(),
        evidence: vec![ctx.evidence.clone()],
        ..Default::default()
    };

    if event_id == 4103 || ctx.log.lookup("MessageNumber").is_none() {
        block.text = ctx.text("Payload");
        block.context = ctx.text("ContextInfo");
        return block;
    }

    block.message_number = ctx.number("MessageNumber");
    block.message_total = ctx.number("MessageTotal");
    block.script_block_id = ctx.text("ScriptBlockId");
    block.text = ctx.text("ScriptBlockText");
    block.path = ctx.text("Path");
    block.fragments = vec![ScriptFragment {
        number: block.message_number,
        text: block.text.clone(),
    }];
    block
}

/// 4697 (Security) and 7045 (Service Control Manager): a service was installed
fn service_install(ctx: &EventContext, event_id: u32) -> Service {
    let (image, start, account) = if event_id == 4697 {
        ("ServiceFileName", "ServiceStartType", "ServiceAccount")
    } else {
        ("ImagePath", "StartType", "AccountName")
    };
    Service {
        name: ctx.text("ServiceName"),
        filename: ctx.text(image),
        user: ctx.identity(account),
        dll: String::new(),
        service_type: code_or_text(&ctx.text("ServiceType"), service_type_name),
        start_type: code_or_text(&ctx.text(start), start_type_name),
        error_control: String::new(),
        computer: ctx.computer.clone(),
        evidence: vec![ctx.evidence.clone()],
    }
}

/// 7045 writes readable names, 4697 raw codes
fn code_or_text(value: &str, name: fn(i64) -> String) -> String {
    match parse_int(value) {
        Some(code) => name(code),
        None => value.to_string(),
    }
}

fn task_command_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?s)<Command>(?P<command>.*?)</Command>").ok())
        .as_ref()
}

fn task_trigger_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"<(?P<trigger>\w+Trigger)[ >]").ok())
        .as_ref()
}

/// 4698: a scheduled task was created
fn task_registration(ctx: &EventContext) -> ScheduledTask {
    let name = ctx.text("TaskName");
    let content = ctx.text("TaskContent");

    let application = task_command_pattern()
        .and_then(|re| re.captures(&content))
        .and_then(|caps| caps.name("command"))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| name.clone());
    let trigger = task_trigger_pattern()
        .and_then(|re| re.captures(&content))
        .and_then(|caps| caps.name("trigger"))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    ScheduledTask {
        application,
        comment: name,
        trigger,
        user: ctx.identity("SubjectUserName"),
        computer: ctx.computer.clone(),
        evidence: vec![ctx.evidence.clone()],
    }
}

/// Member of a group-management event: the CN of `MemberName`, else `MemberSid`
fn member_name(ctx: &EventContext) -> String {
    let dn = ctx.identity("MemberName");
    if dn.is_empty() {
        return ctx.identity("MemberSid");
    }
    dn.split(',')
        .find_map(|rdn| {
            let (key, value) = rdn.split_once('=')?;
            key.trim().eq_ignore_ascii_case("CN").then(|| value.trim().to_string())
        })
        .unwrap_or(dn)
}

fn account_event(ctx: &EventContext, event_type: EventType, roles: Roles) -> Event {
    let mut event = Event {
        timestamp: ctx.timestamp,
        computer: ctx.computer.clone(),
        event_type,
        evidence: vec![ctx.evidence.clone()],
        ..Default::default()
    };

    match roles {
        Roles::Session => {
            event.user_source = ctx.identity("TargetUserName");
            event.domain_source = ctx.identity("TargetDomainName");
            event.logon_id_source = ctx.identity("TargetLogonId");
            event.user_destination = ctx.identity("SubjectUserName");
            event.domain_destination = ctx.identity("SubjectDomainName");
        }
        Roles::ActorOnAccount | Roles::ActorOnSid | Roles::ActorOnGroup => {
            event.user_source = ctx.identity("SubjectUserName");
            event.domain_source = ctx.identity("SubjectDomainName");
            event.logon_id_source = ctx.identity("SubjectLogonId");
        }
    }

    match roles {
        Roles::Session => {}
        Roles::ActorOnAccount => {
            event.user_destination = ctx.identity("TargetUserName");
            event.domain_destination = ctx.identity("TargetDomainName");
        }
        Roles::ActorOnSid => {
            event.user_destination = ctx.identity("TargetSid");
        }
        Roles::ActorOnGroup => {
            event.user_destination = member_name(ctx);
            event.group_name = ctx.identity("TargetUserName");
            event.group_domain = ctx.identity("TargetDomainName");
        }
    }

    event.title = title(&event);
    event
}

fn title(event: &Event) -> String {
    let src = &event.user_source;
    let dst = &event.user_destination;
    let group = &event.group_name;
    match event.event_type {
        EventType::Logon => format!("User {} logged on.", src),
        EventType::FailedLogon => format!("User {} failed to log on.", src),
        EventType::Logoff => format!("User {} logged off.", src),
        EventType::ExplicitCredentialLogon => {
            format!("User {} used the explicit credentials of {}.", src, dst)
        }
        EventType::UserRightAssigned => format!("User {} assigned a user right to {}.", src, dst),
        EventType::UserRightRemoved => format!("User {} removed a user right from {}.", src, dst),
        EventType::UserAccountCreated => format!("User {} created account {}.", src, dst),
        EventType::UserAccountEnabled => format!("User {} enabled account {}.", src, dst),
        EventType::PasswordChangeAttempted => {
            format!("User {} attempted to change the password of {}.", src, dst)
        }
        EventType::PasswordResetAttempted => {
            format!("User {} attempted to reset the password of {}.", src, dst)
        }
        EventType::UserAccountDisabled => format!("User {} disabled account {}.", src, dst),
        EventType::UserAccountDeleted => format!("User {} deleted account {}.", src, dst),
        EventType::UserAccountChanged => format!("User {} changed account {}.", src, dst),
        EventType::UserAccountLockedOut => format!("Account {} was locked out.", dst),
        EventType::UserAccountUnlocked => format!("User {} unlocked account {}.", src, dst),
        EventType::GroupCreated => format!("User {} created group {}.", src, group),
        EventType::GroupDeleted => format!("User {} deleted group {}.", src, group),
        EventType::MemberAddedToGroup => format!("User {} added {} to group {}.", src, dst, group),
        EventType::MemberRemovedFromGroup => {
            format!("User {} removed {} from group {}.", src, dst, group)
        }
        other => other.label().to_string(),
    }
}
