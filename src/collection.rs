//! Deduplicating entity collections
//!
//! A [`Collection`] enforces its element type's [`Dedup`] policy on every
//! insertion:
//! - identity-bearing types (users, computers, domains, groups, scheduled
//!   tasks, script blocks, services) hold at most one element per identity;
//!   inserting a duplicate merges it into the stored element
//! - list types (processes, files, connections, events, registry keys, web
//!   history) append anything that passes their validity check
//!
//! Collections are not synchronized; the batch pipeline guarantees a
//! single mutator.

use serde::Serialize;

use crate::entity::{
    is_absent, union_evidence, Computer, Connection, Domain, Event, File, Group, Process,
    Registry, ScheduledTask, ScriptBlock, Service, User, WebHistory,
};

/// Per-type insertion policy
pub trait Dedup: Sized {
    /// Minimal validity check; rejected items never enter a collection
    fn admit(&self) -> bool {
        true
    }

    /// Position of a stored item with the same identity
    ///
    /// List types have no identity and always return `None`.
    fn find(_existing: &[Self], _item: &Self) -> Option<usize> {
        None
    }

    /// Fold a duplicate into the stored item
    fn merge(_stored: &mut Self, _item: Self) {}
}

/// A typed, deduplicating container
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection { items: Vec::new() }
    }
}

impl<T: Dedup> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one item
    ///
    /// Returns `true` when the item was appended, `false` when it was
    /// rejected or merged into an existing element.
    pub fn add(&mut self, item: T) -> bool {
        if !item.admit() {
            return false;
        }
        match T::find(&self.items, &item) {
            Some(idx) => {
                T::merge(&mut self.items[idx], item);
                false
            }
            None => {
                self.items.push(item);
                true
            }
        }
    }

    /// Fold every element of `other` through [`Collection::add`]
    pub fn union(&mut self, other: Collection<T>) {
        for item in other.items {
            self.add(item);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Direct access for batch passes that maintain the invariant themselves
    pub(crate) fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }
}

impl<T: Dedup> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = Collection::new();
        for item in iter {
            collection.add(item);
        }
        collection
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// Identity-bearing types

impl Dedup for User {
    fn admit(&self) -> bool {
        self.names().next().is_some()
    }

    fn find(existing: &[Self], item: &Self) -> Option<usize> {
        existing.iter().position(|u| u.same_account(item))
    }

    fn merge(stored: &mut Self, item: Self) {
        stored.fill_from(&item);
    }
}

impl Dedup for Computer {
    fn admit(&self) -> bool {
        !is_absent(&self.name)
    }

    fn find(existing: &[Self], item: &Self) -> Option<usize> {
        existing.iter().position(|c| {
            c.name.eq_ignore_ascii_case(&item.name) && c.domain.eq_ignore_ascii_case(&item.domain)
        })
    }
}

impl Dedup for Domain {
    fn admit(&self) -> bool {
        !is_absent(&self.name)
    }

    fn find(existing: &[Self], item: &Self) -> Option<usize> {
        existing.iter().position(|d| d.name.eq_ignore_ascii_case(&item.name))
    }
}

impl Dedup for Group {
    fn admit(&self) -> bool {
        !is_absent(&self.name)
    }

    fn find(existing: &[Self], item: &Self) -> Option<usize> {
        existing.iter().position(|g| g.same_group(item))
    }

    fn merge(stored: &mut Self, item: Self) {
        if stored.computer.is_empty() {
            stored.computer = item.computer;
        }
        union_evidence(&mut stored.evidence, item.evidence);
    }
}

impl Dedup for ScheduledTask {
    fn admit(&self) -> bool {
        !(self.application.is_empty() && self.comment.is_empty() && self.trigger.is_empty())
    }

    fn find(existing: &[Self], item: &Self) -> Option<usize> {
        existing.iter().position(|t| t.same_task(item))
    }

    fn merge(stored: &mut Self, item: Self) {
        union_evidence(&mut stored.evidence, item.evidence);
    }
}

impl Dedup for ScriptBlock {
    fn admit(&self) -> bool {
        !self.text.is_empty() || !self.script_block_id.is_empty()
    }

    fn find(existing: &[Self], item: &Self) -> Option<usize> {
        if item.script_block_id.is_empty() {
            return None;
        }
        existing.iter().position(|s| s.same_block(item))
    }

    fn merge(stored: &mut Self, item: Self) {
        stored.merge(item);
    }
}

impl Dedup for Service {
    fn admit(&self) -> bool {
        !self.name.is_empty()
    }

    fn find(existing: &[Self], item: &Self) -> Option<usize> {
        existing.iter().position(|s| s.same_service(item))
    }

    fn merge(stored: &mut Self, item: Self) {
        for (dst, src) in [
            (&mut stored.user, item.user),
            (&mut stored.dll, item.dll),
            (&mut stored.service_type, item.service_type),
            (&mut stored.start_type, item.start_type),
            (&mut stored.error_control, item.error_control),
        ] {
            if dst.is_empty() {
                *dst = src;
            }
        }
        union_evidence(&mut stored.evidence, item.evidence);
    }
}

// List types

impl Dedup for Process {
    fn admit(&self) -> bool {
        !self.filename.trim().is_empty()
    }
}

impl Dedup for File {
    fn admit(&self) -> bool {
        !self.filename.trim().is_empty()
    }
}

impl Dedup for Connection {
    fn admit(&self) -> bool {
        self.is_resolved()
    }
}

impl Dedup for Event {
    fn admit(&self) -> bool {
        self.event_type.is_known()
    }
}

impl Dedup for Registry {
    fn admit(&self) -> bool {
        !self.key.is_empty()
    }
}

impl Dedup for WebHistory {
    fn admit(&self) -> bool {
        !self.url.is_empty()
    }
}

/// One named collection per entity kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityBatch {
    pub processes: Collection<Process>,
    pub users: Collection<User>,
    pub computers: Collection<Computer>,
    pub domains: Collection<Domain>,
    pub groups: Collection<Group>,
    pub connections: Collection<Connection>,
    pub events: Collection<Event>,
    pub files: Collection<File>,
    pub registries: Collection<Registry>,
    pub services: Collection<Service>,
    pub tasks: Collection<ScheduledTask>,
    pub script_blocks: Collection<ScriptBlock>,
    pub web_histories: Collection<WebHistory>,
}

impl EntityBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold every collection of `other` into this batch
    pub fn union(&mut self, other: EntityBatch) {
        self.processes.union(other.processes);
        self.users.union(other.users);
        self.computers.union(other.computers);
        self.domains.union(other.domains);
        self.groups.union(other.groups);
        self.connections.union(other.connections);
        self.events.union(other.events);
        self.files.union(other.files);
        self.registries.union(other.registries);
        self.services.union(other.services);
        self.tasks.union(other.tasks);
        self.script_blocks.union(other.script_blocks);
        self.web_histories.union(other.web_histories);
    }

    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            processes: self.processes.len(),
            users: self.users.len(),
            computers: self.computers.len(),
            domains: self.domains.len(),
            groups: self.groups.len(),
            connections: self.connections.len(),
            events: self.events.len(),
            files: self.files.len(),
            registries: self.registries.len(),
            services: self.services.len(),
            tasks: self.tasks.len(),
            script_blocks: self.script_blocks.len(),
            web_histories: self.web_histories.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }
}

/// Number of entities per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub processes: usize,
    pub users: usize,
    pub computers: usize,
    pub domains: usize,
    pub groups: usize,
    pub connections: usize,
    pub events: usize,
    pub files: usize,
    pub registries: usize,
    pub services: usize,
    pub tasks: usize,
    pub script_blocks: usize,
    pub web_histories: usize,
}

impl EntityCounts {
    pub fn total(&self) -> usize {
        self.processes
            + self.users
            + self.computers
            + self.domains
            + self.groups
            + self.connections
            + self.events
            + self.files
            + self.registries
            + self.services
            + self.tasks
            + self.script_blocks
            + self.web_histories
    }
}
