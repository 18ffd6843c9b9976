//! Linking passes
//!
//! Every pass reads the nodes it needs, matches them in memory and writes
//! its edges in bulk. Edges carry the correlation `timestamp` of the record
//! that justified them.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::debug;

use super::collapse::{collapse, Collapse};
use super::index::{nearest, preceding, NameIndex, ProcessIndex, ProcessKey};
use super::{LinkResult, Pass, PassReport};
use crate::entity::EventType;
use crate::graph::{EdgeType, Label, Node, NodeId, PropertyMap};
use crate::props;
use crate::store::{EdgeSpec, GraphBackend};

const PROCESS: &str = "Process";
const SCRIPT_BLOCK: &str = "ScriptBlock";
const COMPUTER: &str = "Computer";
const USER: &str = "User";
const GROUP: &str = "Group";
const EVENT: &str = "Event";
const FILE: &str = "File";
const HOST: &str = "Host";
const CONNECTION: &str = "Connection";

const EXECUTE: &str = "EXECUTE";
const MEMORY_ACCESS: &str = "MEMORY_ACCESS";
const ACTS: &str = "ACTS";
const ON: &str = "ON";

/// Labels whose nodes record the computer they were observed on
const HOSTED: [&str; 10] = [
    PROCESS,
    GROUP,
    CONNECTION,
    EVENT,
    FILE,
    "Registry",
    "Service",
    "ScheduledTask",
    SCRIPT_BLOCK,
    "WebHistory",
];

/// Labels whose nodes name the user they ran as or belong to
const AUTHORED: [&str; 5] = [PROCESS, CONNECTION, "Service", "ScheduledTask", "WebHistory"];

async fn nodes(backend: &dyn GraphBackend, label: &str) -> LinkResult<Vec<Node>> {
    Ok(backend.match_nodes(&Label::new(label)).await?)
}

fn at(source: NodeId, target: NodeId, timestamp: i64) -> EdgeSpec {
    EdgeSpec::new(source, target, props! { "timestamp" => timestamp })
}

fn event_type(event: &Node) -> EventType {
    EventType::from_label(event.text("event_type"))
}

/// Edges to write, grouped by type
#[derive(Default)]
struct Edges {
    by_type: BTreeMap<&'static str, Vec<EdgeSpec>>,
}

impl Edges {
    fn push(&mut self, edge_type: &'static str, edge: EdgeSpec) {
        self.by_type.entry(edge_type).or_default().push(edge);
    }

    async fn write(self, backend: &dyn GraphBackend, report: &mut PassReport) -> LinkResult<()> {
        for (edge_type, edges) in self.by_type {
            let count = edges.len();
            let written = backend.merge_edges(&EdgeType::new(edge_type), edges).await?;
            debug!("{}: {} of {} {} edges written", report.pass, written, count, edge_type);
            report.edges_created += written;
        }
        Ok(())
    }
}

/// Nodes merged on demand, cached by key
struct Synthesized {
    label: Label,
    ids: FxHashMap<Vec<String>, NodeId>,
}

impl Synthesized {
    fn new(label: &str) -> Self {
        Self {
            label: Label::new(label),
            ids: FxHashMap::default(),
        }
    }

    async fn merge(
        &mut self,
        backend: &dyn GraphBackend,
        key: PropertyMap,
        properties: PropertyMap,
    ) -> LinkResult<NodeId> {
        let cache_key: Vec<String> = key.values().map(|v| v.to_string().to_lowercase()).collect();
        if let Some(id) = self.ids.get(&cache_key) {
            return Ok(*id);
        }
        let id = backend.merge_node(&self.label, key, properties).await?;
        self.ids.insert(cache_key, id);
        Ok(id)
    }

    fn count(&self) -> usize {
        self.ids.len()
    }
}

/// File node for the path an event refers to
async fn file_node(
    files: &mut Synthesized,
    backend: &dyn GraphBackend,
    event: &Node,
) -> LinkResult<NodeId> {
    files
        .merge(
            backend,
            props! { "fullpath" => event.text("fullpath"), "computer" => event.text("computer") },
            props! { "filename" => event.text("filename"), "extension" => event.text("extension") },
        )
        .await
}

/// Users acting in and acted on by each event
struct Roles {
    actors: FxHashMap<NodeId, Vec<NodeId>>,
    targets: FxHashMap<NodeId, Vec<NodeId>>,
}

impl Roles {
    async fn load(backend: &dyn GraphBackend) -> LinkResult<Self> {
        let mut actors: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        for edge in backend.match_edges(&EdgeType::new(ACTS)).await? {
            actors.entry(edge.target).or_default().push(edge.source);
        }
        let mut targets: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        for edge in backend.match_edges(&EdgeType::new(ON)).await? {
            targets.entry(edge.source).or_default().push(edge.target);
        }
        Ok(Self { actors, targets })
    }

    fn actors(&self, event: NodeId) -> &[NodeId] {
        self.actors.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }

    fn targets(&self, event: NodeId) -> &[NodeId] {
        self.targets.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Process -EXECUTE-> Process for every earlier process matching the parent
pub async fn execute(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::Execute);
    let processes = nodes(backend, PROCESS).await?;
    let index = ProcessIndex::new(&processes);

    let mut edges = Edges::default();
    for child in &processes {
        let candidates = index.get(
            child.text("pprocess_name"),
            child.integer("ppid"),
            child.text("computer"),
        );
        for parent in preceding(candidates, child.timestamp(), true) {
            edges.push(EXECUTE, at(parent.id, child.id, child.timestamp()));
        }
    }
    edges.write(backend, &mut report).await?;
    Ok(report)
}

pub async fn execute_collapse(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::ExecuteCollapse);
    report.edges_deleted = collapse(
        backend,
        &Collapse {
            edge_type: EXECUTE,
            source: PROCESS,
            target: PROCESS,
            key: ProcessKey::of,
        },
    )
    .await?;
    Ok(report)
}

/// Process -EXECUTE-> ScriptBlock by pid and computer
pub async fn script_blocks(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::ScriptBlocks);
    let processes = nodes(backend, PROCESS).await?;
    let index = ProcessIndex::new(&processes);

    let mut edges = Edges::default();
    for block in nodes(backend, SCRIPT_BLOCK).await? {
        let candidates = index.by_pid(block.integer("process_id"), block.text("computer"));
        for process in preceding(candidates, block.timestamp(), false) {
            edges.push(EXECUTE, at(process.id, block.id, block.timestamp()));
        }
    }
    edges.write(backend, &mut report).await?;
    Ok(report)
}

pub async fn script_block_collapse(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::ScriptBlockCollapse);
    report.edges_deleted = collapse(
        backend,
        &Collapse {
            edge_type: EXECUTE,
            source: PROCESS,
            target: SCRIPT_BLOCK,
            key: ProcessKey::of_pid,
        },
    )
    .await?;
    Ok(report)
}

/// Computer -HOSTS-> every entity observed on it
pub async fn computers(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::Computers);
    let computers = nodes(backend, COMPUTER).await?;
    let index = NameIndex::computers(&computers);

    let mut edges = Edges::default();
    for label in HOSTED {
        for node in nodes(backend, label).await? {
            for computer in index.get(node.text("computer")) {
                edges.push("HOSTS", at(computer.id, node.id, node.timestamp()));
            }
        }
    }
    edges.write(backend, &mut report).await?;
    Ok(report)
}

/// User -BY-> every entity naming it as its user
pub async fn authors(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::Authors);
    let users = nodes(backend, USER).await?;
    let index = NameIndex::users(&users);

    let mut edges = Edges::default();
    for label in AUTHORED {
        for node in nodes(backend, label).await? {
            for user in index.in_domain(node.text("user"), node.text("user_domain")) {
                edges.push("BY", at(user, node.id, node.timestamp()));
            }
        }
    }
    edges.write(backend, &mut report).await?;
    Ok(report)
}

/// Host nodes for remote addresses; Process -CONNECT-> Host
pub async fn connections(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::Connections);
    let processes = nodes(backend, PROCESS).await?;
    let index = ProcessIndex::new(&processes);
    let mut hosts = Synthesized::new(HOST);

    let mut edges = Edges::default();
    for connection in nodes(backend, CONNECTION).await? {
        let initiated = connection
            .get_property("initiated")
            .and_then(|v| v.as_boolean())
            .unwrap_or(false);
        let (remote, port) = if initiated {
            (connection.text("ip_destination"), connection.integer("port_destination"))
        } else {
            (connection.text("ip_source"), connection.integer("port_source"))
        };
        if remote.is_empty() {
            continue;
        }
        let candidates = index.get(
            connection.text("process"),
            connection.integer("process_id"),
            connection.text("computer"),
        );
        let Some(process) = nearest(candidates, connection.timestamp(), true) else {
            continue;
        };
        let host = hosts
            .merge(backend, props! { "ip" => remote }, PropertyMap::new())
            .await?;
        edges.push(
            "CONNECT",
            EdgeSpec::new(
                process.id,
                host,
                props! {
                    "timestamp" => connection.timestamp(),
                    "port" => port,
                    "protocol" => connection.text("protocol"),
                },
            ),
        );
    }
    report.nodes_synthesized = hosts.count();
    edges.write(backend, &mut report).await?;
    Ok(report)
}

/// File nodes for created and deleted files; Process -CREATE/DELETE-> File
pub async fn file_events(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::FileEvents);
    let processes = nodes(backend, PROCESS).await?;
    let index = ProcessIndex::new(&processes);
    let mut files = Synthesized::new(FILE);

    let mut edges = Edges::default();
    for event in nodes(backend, EVENT).await? {
        let edge_type = match event_type(&event) {
            EventType::FileCreated => "CREATE",
            EventType::FileDeleted => "DELETE",
            _ => continue,
        };
        if event.text("fullpath").is_empty() {
            continue;
        }
        let file = file_node(&mut files, backend, &event).await?;
        let candidates = index.get(
            event.text("process_source"),
            event.integer("process_source_id"),
            event.text("computer"),
        );
        if let Some(process) = nearest(candidates, event.timestamp(), false) {
            edges.push(edge_type, at(process.id, file, event.timestamp()));
        }
    }
    report.nodes_synthesized = files.count();
    edges.write(backend, &mut report).await?;
    Ok(report)
}

/// User -ACTS-> Event for the source user, Event -ON-> User for the destination
pub async fn event_users(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::EventUsers);
    let users = nodes(backend, USER).await?;
    let index = NameIndex::users(&users);

    let mut edges = Edges::default();
    for event in nodes(backend, EVENT).await? {
        let timestamp = event.timestamp();
        for user in index.in_domain(event.text("user_source"), event.text("domain_source")) {
            edges.push(ACTS, at(user, event.id, timestamp));
        }
        for user in index.in_domain(event.text("user_destination"), event.text("domain_destination")) {
            edges.push(ON, at(event.id, user, timestamp));
        }
    }
    edges.write(backend, &mut report).await?;
    Ok(report)
}

/// File nodes for loaded images and raw reads; Process -LOAD-> File
pub async fn loads(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::Loads);
    let processes = nodes(backend, PROCESS).await?;
    let index = ProcessIndex::new(&processes);
    let mut files = Synthesized::new(FILE);

    let mut edges = Edges::default();
    for event in nodes(backend, EVENT).await? {
        if !matches!(event_type(&event), EventType::ImageLoaded | EventType::RawAccessRead) {
            continue;
        }
        if event.text("fullpath").is_empty() {
            continue;
        }
        let candidates = index.get(
            event.text("process_source"),
            event.integer("process_source_id"),
            event.text("computer"),
        );
        let Some(process) = nearest(candidates, event.timestamp(), false) else {
            continue;
        };
        let file = file_node(&mut files, backend, &event).await?;
        edges.push("LOAD", at(process.id, file, event.timestamp()));
    }
    report.nodes_synthesized = files.count();
    edges.write(backend, &mut report).await?;
    Ok(report)
}

/// Process -MEMORY_ACCESS-> Process for process access events
pub async fn memory_access(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::MemoryAccess);
    let processes = nodes(backend, PROCESS).await?;
    let index = ProcessIndex::new(&processes);

    let mut edges = Edges::default();
    for event in nodes(backend, EVENT).await? {
        if event_type(&event) != EventType::ProcessAccess {
            continue;
        }
        let computer = event.text("computer");
        let timestamp = event.timestamp();
        let targets = index.get(event.text("process_target"), event.integer("process_target_id"), computer);
        let Some(target) = nearest(targets, timestamp, false) else {
            continue;
        };
        let sources = index.get(event.text("process_source"), event.integer("process_source_id"), computer);
        for source in preceding(sources, timestamp, false) {
            if source.id != target.id {
                edges.push(MEMORY_ACCESS, at(source.id, target.id, timestamp));
            }
        }
    }
    edges.write(backend, &mut report).await?;
    Ok(report)
}

pub async fn memory_access_collapse(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::MemoryAccessCollapse);
    report.edges_deleted = collapse(
        backend,
        &Collapse {
            edge_type: MEMORY_ACCESS,
            source: PROCESS,
            target: PROCESS,
            key: ProcessKey::of,
        },
    )
    .await?;
    Ok(report)
}

fn account_action(event_type: EventType) -> Option<&'static str> {
    Some(match event_type {
        EventType::UserAccountCreated => "CREATE",
        EventType::UserAccountDeleted => "DELETE",
        EventType::UserAccountEnabled => "ENABLE",
        EventType::UserAccountDisabled => "DISABLE",
        EventType::UserAccountChanged
        | EventType::PasswordChangeAttempted
        | EventType::PasswordResetAttempted => "CHANGE",
        EventType::UserAccountLockedOut => "LOCK",
        EventType::UserAccountUnlocked => "UNLOCK",
        _ => return None,
    })
}

/// Actor User -CREATE/DELETE/...-> target User, through the event's ACTS and ON
pub async fn account_actions(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::AccountActions);
    let roles = Roles::load(backend).await?;

    let mut edges = Edges::default();
    for event in nodes(backend, EVENT).await? {
        let Some(edge_type) = account_action(event_type(&event)) else {
            continue;
        };
        for actor in roles.actors(event.id) {
            for target in roles.targets(event.id) {
                edges.push(edge_type, at(*actor, *target, event.timestamp()));
            }
        }
    }
    edges.write(backend, &mut report).await?;
    Ok(report)
}

/// User -LOGON/LOGOFF-> Computer, requester User -LOGON-> principal User
pub async fn sessions(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::Sessions);
    let roles = Roles::load(backend).await?;
    let computers = nodes(backend, COMPUTER).await?;
    let index = NameIndex::computers(&computers);

    let mut edges = Edges::default();
    for event in nodes(backend, EVENT).await? {
        let kind = event_type(&event);
        let edge_type = match kind {
            EventType::Logon | EventType::FailedLogon | EventType::ExplicitCredentialLogon => "LOGON",
            EventType::Logoff => "LOGOFF",
            _ => continue,
        };
        let properties = props! {
            "timestamp" => event.timestamp(),
            "success" => kind != EventType::FailedLogon,
        };

        // The logon family names the account logging on as the source; explicit
        // credential use names it as the destination.
        let (principals, requesters) = match kind {
            EventType::ExplicitCredentialLogon => (roles.targets(event.id), roles.actors(event.id)),
            _ => (roles.actors(event.id), roles.targets(event.id)),
        };

        for principal in principals {
            for computer in index.get(event.text("computer")) {
                edges.push(edge_type, EdgeSpec::new(*principal, computer.id, properties.clone()));
            }
        }
        if kind == EventType::Logoff {
            continue;
        }
        for requester in requesters {
            for principal in principals {
                if requester != principal {
                    edges.push(edge_type, EdgeSpec::new(*requester, *principal, properties.clone()));
                }
            }
        }
    }
    edges.write(backend, &mut report).await?;
    Ok(report)
}

/// Event -ABOUT-> Group, member -ADDED_TO/REMOVED_FROM-> Group, actor -CREATE/DELETE-> Group
pub async fn groups(backend: &dyn GraphBackend) -> LinkResult<PassReport> {
    let mut report = PassReport::new(Pass::Groups);
    let roles = Roles::load(backend).await?;
    let known = nodes(backend, GROUP).await?;
    let index = NameIndex::new(&known, &["name"]);
    let mut synthesized = Synthesized::new(GROUP);

    let mut edges = Edges::default();
    for event in nodes(backend, EVENT).await? {
        let kind = event_type(&event);
        if !kind.is_group_event() {
            continue;
        }
        let name = event.text("group");
        if name.is_empty() {
            continue;
        }
        let timestamp = event.timestamp();
        let mut groups = index.in_domain(name, event.text("group_domain"));
        if groups.is_empty() {
            let key = props! { "name" => name, "domain" => event.text("group_domain") };
            let properties = props! { "computer" => event.text("computer") };
            groups.push(synthesized.merge(backend, key, properties).await?);
        }

        for group in groups {
            edges.push("ABOUT", at(event.id, group, timestamp));
            let (users, edge_type) = match kind {
                EventType::MemberAddedToGroup => (roles.targets(event.id), "ADDED_TO"),
                EventType::MemberRemovedFromGroup => (roles.targets(event.id), "REMOVED_FROM"),
                EventType::GroupCreated => (roles.actors(event.id), "CREATE"),
                _ => (roles.actors(event.id), "DELETE"),
            };
            for user in users {
                edges.push(edge_type, at(*user, group, timestamp));
            }
        }
    }
    report.nodes_synthesized = synthesized.count();
    edges.write(backend, &mut report).await?;
    Ok(report)
}
