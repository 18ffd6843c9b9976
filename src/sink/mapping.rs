//! Flat representation of each entity kind
//!
//! Property keys are the names graph queries and CSV consumers rely on;
//! they are shared by the CSV columns and the graph nodes.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::entity::{
    Computer, Connection, Domain, Event, File, Group, Process, Registry, ScheduledTask,
    ScriptBlock, Service, User, WebHistory,
};
use crate::graph::PropertyMap;
use crate::props;

/// An entity kind as written by the sinks
pub trait Mapped: Serialize + DeserializeOwned {
    /// File stem (`process.csv`, `process.json`, ...)
    const KIND: &'static str;
    /// Graph node label
    const LABEL: &'static str;
    /// CSV header and the property each column is read from
    const COLUMNS: &'static [(&'static str, &'static str)];

    fn properties(&self) -> PropertyMap;
}

fn date(timestamp: i64) -> String {
    crate::entity::to_datetime(timestamp).to_rfc3339()
}

impl Mapped for Process {
    const KIND: &'static str = "process";
    const LABEL: &'static str = "Process";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("Timestamp", "timestamp"),
        ("CreatedTime", "created_time"),
        ("Filename", "filename"),
        ("FullPath", "fullpath"),
        ("Commandline", "commandline"),
        ("PID", "pid"),
        ("ParentProcessName", "pprocess_name"),
        ("ParentProcessCommandline", "pprocess_commandline"),
        ("PPID", "ppid"),
        ("User", "user"),
        ("UserDomain", "user_domain"),
        ("Computer", "computer"),
        ("LogonID", "logonid"),
        ("Evidence", "evidence"),
    ];

    fn properties(&self) -> PropertyMap {
        props! {
            "timestamp" => self.timestamp,
            "created_time" => date(self.timestamp),
            "filename" => &self.filename,
            "fullpath" => &self.full_path,
            "pid" => self.pid,
            "commandline" => &self.commandline,
            "ppid" => self.ppid,
            "pprocess_name" => &self.parent_process_name,
            "pprocess_commandline" => &self.parent_commandline,
            "user" => &self.user,
            "user_domain" => &self.user_domain,
            "puser" => &self.parent_user,
            "puser_domain" => &self.parent_user_domain,
            "logonid" => self.logon_id,
            "computer" => &self.computer,
            "hash" => &self.hash,
            "evidence" => self.evidence.clone(),
        }
    }
}

impl Mapped for User {
    const KIND: &'static str = "user";
    const LABEL: &'static str = "User";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("Name", "fullname"),
        ("Username", "username"),
        ("Domain", "domain"),
        ("SID", "sid"),
        ("Comments", "comments"),
    ];

    fn properties(&self) -> PropertyMap {
        props! {
            "fullname" => &self.full_name,
            "username" => &self.username,
            "comments" => &self.comments,
            "sid" => &self.sid,
            "domain" => &self.domain,
            "last_password_change" => self.last_password_change,
        }
    }
}

impl Mapped for Computer {
    const KIND: &'static str = "computer";
    const LABEL: &'static str = "Computer";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[("Name", "name"), ("Domain", "domain")];

    fn properties(&self) -> PropertyMap {
        props! { "name" => &self.name, "domain" => &self.domain }
    }
}

impl Mapped for Domain {
    const KIND: &'static str = "domain";
    const LABEL: &'static str = "Domain";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[("Name", "name")];

    fn properties(&self) -> PropertyMap {
        props! { "name" => &self.name }
    }
}

impl Mapped for Group {
    const KIND: &'static str = "group";
    const LABEL: &'static str = "Group";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("Name", "name"),
        ("Domain", "domain"),
        ("Computer", "computer"),
        ("Evidence", "evidence"),
    ];

    fn properties(&self) -> PropertyMap {
        props! {
            "name" => &self.name,
            "domain" => &self.domain,
            "computer" => &self.computer,
            "evidence" => self.evidence.clone(),
        }
    }
}

impl Mapped for Connection {
    const KIND: &'static str = "connection";
    const LABEL: &'static str = "Connection";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("Timestamp", "timestamp"),
        ("Date", "created_time"),
        ("SourceIP", "ip_source"),
        ("SourcePort", "port_source"),
        ("DestinationIP", "ip_destination"),
        ("DestinationPort", "port_destination"),
        ("Protocol", "protocol"),
        ("Process", "process"),
        ("ProcessID", "process_id"),
        ("User", "user"),
        ("UserDomain", "user_domain"),
        ("Computer", "computer"),
        ("Evidence", "evidence"),
    ];

    fn properties(&self) -> PropertyMap {
        props! {
            "timestamp" => self.timestamp,
            "created_time" => date(self.timestamp),
            "ip_source" => &self.source_ip,
            "port_source" => self.source_port,
            "ip_destination" => &self.destination_ip,
            "port_destination" => self.destination_port,
            "protocol" => &self.protocol,
            "initiated" => self.initiated,
            "process" => &self.process_name,
            "process_id" => self.process_id,
            "user" => &self.user,
            "user_domain" => &self.user_domain,
            "computer" => &self.computer,
            "evidence" => self.evidence.clone(),
        }
    }
}

impl Mapped for Event {
    const KIND: &'static str = "event";
    const LABEL: &'static str = "Event";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("Timestamp", "timestamp"),
        ("Date", "created_time"),
        ("EventType", "event_type"),
        ("Title", "title"),
        ("UserSource", "user_source"),
        ("DomainSource", "domain_source"),
        ("UserDestination", "user_destination"),
        ("DomainDestination", "domain_destination"),
        ("Group", "group"),
        ("ProcessSource", "process_source"),
        ("ProcessSourceID", "process_source_id"),
        ("ProcessTarget", "process_target"),
        ("ProcessTargetID", "process_target_id"),
        ("FullPath", "fullpath"),
        ("Computer", "computer"),
        ("Evidence", "evidence"),
    ];

    fn properties(&self) -> PropertyMap {
        props! {
            "timestamp" => self.timestamp,
            "created_time" => date(self.timestamp),
            "event_type" => self.event_type.label(),
            "title" => &self.title,
            "user_source" => &self.user_source,
            "domain_source" => &self.domain_source,
            "logonid_source" => &self.logon_id_source,
            "user_destination" => &self.user_destination,
            "domain_destination" => &self.domain_destination,
            "group" => &self.group_name,
            "group_domain" => &self.group_domain,
            "process_source" => &self.process_source,
            "process_source_id" => self.process_source_id,
            "process_target" => &self.process_target,
            "process_target_id" => self.process_target_id,
            "fullpath" => &self.full_path,
            "filename" => &self.filename,
            "extension" => &self.extension,
            "computer" => &self.computer,
            "evidence" => self.evidence.clone(),
        }
    }
}

impl Mapped for File {
    const KIND: &'static str = "file";
    const LABEL: &'static str = "File";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("Timestamp", "timestamp"),
        ("Date", "created_time"),
        ("TimestampDesc", "timestamp_desc"),
        ("Filename", "filename"),
        ("FullPath", "fullpath"),
        ("Extension", "extension"),
        ("IsAllocated", "is_allocated"),
        ("Evidence", "evidence"),
    ];

    fn properties(&self) -> PropertyMap {
        props! {
            "timestamp" => self.timestamp,
            "created_time" => date(self.timestamp),
            "fullpath" => &self.full_path,
            "filename" => &self.filename,
            "extension" => &self.extension,
            "timestamp_desc" => &self.timestamp_desc,
            "is_allocated" => self.is_allocated,
            "computer" => &self.computer,
            "evidence" => self.evidence.clone(),
        }
    }
}

impl Mapped for Registry {
    const KIND: &'static str = "registry";
    const LABEL: &'static str = "Registry";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("Timestamp", "timestamp"),
        ("Hive", "hive"),
        ("Key", "key"),
        ("Value", "value"),
        ("Computer", "computer"),
        ("Evidence", "evidence"),
    ];

    fn properties(&self) -> PropertyMap {
        props! {
            "timestamp" => self.timestamp,
            "created_time" => date(self.timestamp),
            "hive" => &self.hive,
            "key" => &self.key,
            "value" => self.entries.clone(),
            "computer" => &self.computer,
            "evidence" => self.evidence.clone(),
        }
    }
}

impl Mapped for Service {
    const KIND: &'static str = "service";
    const LABEL: &'static str = "Service";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("Name", "name"),
        ("Filename", "filename"),
        ("ServiceType", "service_type"),
        ("StartType", "start_type"),
        ("ErrorControl", "error_control"),
        ("User", "user"),
        ("DLL", "dll"),
        ("Computer", "computer"),
    ];

    fn properties(&self) -> PropertyMap {
        props! {
            "name" => &self.name,
            "filename" => &self.filename,
            "service_type" => &self.service_type,
            "start_type" => &self.start_type,
            "error_control" => &self.error_control,
            "user" => &self.user,
            "dll" => &self.dll,
            "computer" => &self.computer,
            "evidence" => self.evidence.clone(),
        }
    }
}

impl Mapped for ScheduledTask {
    const KIND: &'static str = "task";
    const LABEL: &'static str = "ScheduledTask";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("Application", "application"),
        ("Comment", "comment"),
        ("Trigger", "trigger"),
        ("User", "user"),
    ];

    fn properties(&self) -> PropertyMap {
        props! {
            "application" => &self.application,
            "comment" => &self.comment,
            "trigger" => &self.trigger,
            "user" => &self.user,
            "computer" => &self.computer,
            "evidence" => self.evidence.clone(),
        }
    }
}

impl Mapped for ScriptBlock {
    const KIND: &'static str = "scriptblock";
    const LABEL: &'static str = "ScriptBlock";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("Timestamp", "timestamp"),
        ("Date", "created_time"),
        ("ScriptBlockID", "scriptblockid"),
        ("ProcessID", "process_id"),
        ("Path", "path"),
        ("MessageNumber", "message_number"),
        ("MessageTotal", "message_total"),
        ("Computer", "computer"),
        ("Text", "scriptblocktext"),
    ];

    fn properties(&self) -> PropertyMap {
        props! {
            "timestamp" => self.timestamp,
            "created_time" => date(self.timestamp),
            "scriptblockid" => &self.script_block_id,
            "scriptblocktext" => &self.text,
            "context" => &self.context,
            "process_id" => self.process_id,
            "message_number" => self.message_number,
            "message_total" => self.message_total,
            "path" => &self.path,
            "computer" => &self.computer,
            "evidence" => self.evidence.clone(),
        }
    }
}

impl Mapped for WebHistory {
    const KIND: &'static str = "webhistory";
    const LABEL: &'static str = "WebHistory";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("Timestamp", "timestamp"),
        ("LastTimeVisited", "last_visit_time"),
        ("URL", "url"),
        ("Title", "title"),
        ("User", "user"),
        ("Domain", "domain"),
        ("Path", "path"),
        ("VisitCount", "visit_count"),
        ("Evidence", "evidence"),
    ];

    fn properties(&self) -> PropertyMap {
        props! {
            "timestamp" => self.timestamp,
            "last_visit_time" => date(self.timestamp),
            "url" => &self.url,
            "domain" => &self.domain,
            "path" => &self.path,
            "title" => &self.title,
            "user" => &self.user,
            "visit_count" => self.visit_count,
            "computer" => &self.computer,
            "evidence" => self.evidence.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns_are_properties<T: Mapped + Default>() {
        let props = T::default().properties();
        for (header, key) in T::COLUMNS {
            assert!(props.contains_key(*key), "{}: column {} reads missing {}", T::KIND, header, key);
        }
    }

    #[test]
    fn test_every_column_has_a_property() {
        columns_are_properties::<Process>();
        columns_are_properties::<User>();
        columns_are_properties::<Computer>();
        columns_are_properties::<Domain>();
        columns_are_properties::<Group>();
        columns_are_properties::<Connection>();
        columns_are_properties::<Event>();
        columns_are_properties::<File>();
        columns_are_properties::<Registry>();
        columns_are_properties::<Service>();
        columns_are_properties::<ScheduledTask>();
        columns_are_properties::<ScriptBlock>();
        columns_are_properties::<WebHistory>();
    }

    #[test]
    fn test_event_type_is_written_by_label() {
        let event = Event {
            event_type: crate::entity::EventType::FileCreated,
            ..Default::default()
        };
        assert_eq!(crate::graph::property::text(&event.properties(), "event_type"), "File Created");
    }
}
