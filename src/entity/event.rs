//! Generic activity events
//!
//! The kind of an event is a closed enumeration keyed by the event source
//! and its numeric code. Security auditing and Sysmon number their events
//! independently, so the same code means different things per source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::to_datetime;

/// Numbering scheme an event code belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSource {
    /// Standard Windows auditing (Security log and friends)
    Security,
    Sysmon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventType {
    #[default]
    Unknown,
    Logon,
    FailedLogon,
    Logoff,
    ExplicitCredentialLogon,
    UserRightAssigned,
    UserRightRemoved,
    UserAccountCreated,
    UserAccountEnabled,
    PasswordChangeAttempted,
    PasswordResetAttempted,
    UserAccountDisabled,
    UserAccountDeleted,
    UserAccountChanged,
    UserAccountLockedOut,
    UserAccountUnlocked,
    GroupCreated,
    GroupDeleted,
    MemberAddedToGroup,
    MemberRemovedFromGroup,
    ImageLoaded,
    RawAccessRead,
    ProcessAccess,
    FileCreated,
    FileDeleted,
}

impl EventType {
    pub fn from_code(source: EventSource, code: u32) -> EventType {
        match source {
            EventSource::Security => match code {
                4624 => EventType::Logon,
                4625 => EventType::FailedLogon,
                4634 | 4647 => EventType::Logoff,
                4648 => EventType::ExplicitCredentialLogon,
                4704 => EventType::UserRightAssigned,
                4705 => EventType::UserRightRemoved,
                4720 => EventType::UserAccountCreated,
                4722 => EventType::UserAccountEnabled,
                4723 => EventType::PasswordChangeAttempted,
                4724 => EventType::PasswordResetAttempted,
                4725 => EventType::UserAccountDisabled,
                4726 => EventType::UserAccountDeleted,
                4738 => EventType::UserAccountChanged,
                4740 => EventType::UserAccountLockedOut,
                4767 => EventType::UserAccountUnlocked,
                4727 | 4731 | 4754 => EventType::GroupCreated,
                4730 | 4734 | 4758 => EventType::GroupDeleted,
                4728 | 4732 | 4756 => EventType::MemberAddedToGroup,
                4729 | 4733 | 4757 => EventType::MemberRemovedFromGroup,
                _ => EventType::Unknown,
            },
            EventSource::Sysmon => match code {
                7 => EventType::ImageLoaded,
                9 => EventType::RawAccessRead,
                10 => EventType::ProcessAccess,
                11 => EventType::FileCreated,
                23 | 26 => EventType::FileDeleted,
                _ => EventType::Unknown,
            },
        }
    }

    /// Human-readable name, also used as the `event_type` graph property
    pub fn label(&self) -> &'static str {
        match self {
            EventType::Unknown => "Unknown",
            EventType::Logon => "Logon",
            EventType::FailedLogon => "Failed Logon",
            EventType::Logoff => "Logoff",
            EventType::ExplicitCredentialLogon => "Explicit Credential Logon",
            EventType::UserRightAssigned => "User Right Assigned",
            EventType::UserRightRemoved => "User Right Removed",
            EventType::UserAccountCreated => "User Account Created",
            EventType::UserAccountEnabled => "User Account Enabled",
            EventType::PasswordChangeAttempted => "Password Change Attempted",
            EventType::PasswordResetAttempted => "Password Reset Attempted",
            EventType::UserAccountDisabled => "User Account Disabled",
            EventType::UserAccountDeleted => "User Account Deleted",
            EventType::UserAccountChanged => "User Account Changed",
            EventType::UserAccountLockedOut => "User Account Locked Out",
            EventType::UserAccountUnlocked => "User Account Unlocked",
            EventType::GroupCreated => "Group Created",
            EventType::GroupDeleted => "Group Deleted",
            EventType::MemberAddedToGroup => "Member Added To Group",
            EventType::MemberRemovedFromGroup => "Member Removed From Group",
            EventType::ImageLoaded => "Image Loaded",
            EventType::RawAccessRead => "Raw Access Read",
            EventType::ProcessAccess => "Process Memory Access",
            EventType::FileCreated => "File Created",
            EventType::FileDeleted => "File Deleted",
        }
    }

    pub fn from_label(label: &str) -> EventType {
        ALL_EVENT_TYPES
            .iter()
            .copied()
            .find(|t| t.label() == label)
            .unwrap_or_default()
    }

    pub fn is_known(&self) -> bool {
        *self != EventType::Unknown
    }

    pub fn is_group_event(&self) -> bool {
        matches!(
            self,
            EventType::GroupCreated
                | EventType::GroupDeleted
                | EventType::MemberAddedToGroup
                | EventType::MemberRemovedFromGroup
        )
    }

    pub fn is_session_event(&self) -> bool {
        matches!(self, EventType::Logon | EventType::FailedLogon | EventType::Logoff)
    }
}

const ALL_EVENT_TYPES: [EventType; 25] = [
    EventType::Unknown,
    EventType::Logon,
    EventType::FailedLogon,
    EventType::Logoff,
    EventType::ExplicitCredentialLogon,
    EventType::UserRightAssigned,
    EventType::UserRightRemoved,
    EventType::UserAccountCreated,
    EventType::UserAccountEnabled,
    EventType::PasswordChangeAttempted,
    EventType::PasswordResetAttempted,
    EventType::UserAccountDisabled,
    EventType::UserAccountDeleted,
    EventType::UserAccountChanged,
    EventType::UserAccountLockedOut,
    EventType::UserAccountUnlocked,
    EventType::GroupCreated,
    EventType::GroupDeleted,
    EventType::MemberAddedToGroup,
    EventType::MemberRemovedFromGroup,
    EventType::ImageLoaded,
    EventType::RawAccessRead,
    EventType::ProcessAccess,
    EventType::FileCreated,
    EventType::FileDeleted,
];

/// One activity record
///
/// Only the sub-fields relevant to the event type are populated: account
/// events fill the user fields, group events the group fields, Sysmon file
/// and memory events the process and path fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: i64,
    pub computer: String,
    pub event_type: EventType,
    /// Cosmetic summary, never used for matching
    pub title: String,

    /// Principal of a session event, actor of every other account event
    pub user_source: String,
    pub domain_source: String,
    pub logon_id_source: String,
    /// Requester of a session event, affected account of every other one
    pub user_destination: String,
    pub domain_destination: String,

    pub group_name: String,
    pub group_domain: String,

    pub process_source: String,
    pub process_source_id: i64,
    pub process_target: String,
    pub process_target_id: i64,

    pub full_path: String,
    pub filename: String,
    pub extension: String,

    pub evidence: Vec<String>,
}

impl Event {
    pub fn date(&self) -> DateTime<Utc> {
        to_datetime(self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_scoped_by_source() {
        assert_eq!(EventType::from_code(EventSource::Sysmon, 11), EventType::FileCreated);
        assert_eq!(EventType::from_code(EventSource::Security, 11), EventType::Unknown);
        assert_eq!(EventType::from_code(EventSource::Security, 4723), EventType::PasswordChangeAttempted);
        assert_eq!(EventType::from_code(EventSource::Sysmon, 4723), EventType::Unknown);
        assert_eq!(EventType::from_code(EventSource::Sysmon, 26), EventType::FileDeleted);
    }

    #[test]
    fn test_label_round_trip() {
        for t in ALL_EVENT_TYPES {
            assert_eq!(EventType::from_label(t.label()), t);
        }
        assert_eq!(EventType::from_label("no such thing"), EventType::Unknown);
    }

    #[test]
    fn test_group_ids() {
        for code in [4727, 4731, 4754, 4730, 4734, 4758, 4728, 4732, 4756, 4729, 4733, 4757] {
            assert!(EventType::from_code(EventSource::Security, code).is_group_event());
        }
    }
}
