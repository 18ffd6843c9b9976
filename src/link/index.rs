//! In-memory lookups over matched nodes

use rustc_hash::FxHashMap;

use crate::graph::{Node, NodeId};

fn fold(value: &str) -> String {
    value.to_lowercase()
}

/// Natural key of a process: full path, pid and computer, case-folded
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessKey {
    path: String,
    pid: i64,
    computer: String,
}

impl ProcessKey {
    pub fn new(path: &str, pid: i64, computer: &str) -> Self {
        Self {
            path: fold(path),
            pid,
            computer: fold(computer),
        }
    }

    pub fn of(process: &Node) -> Self {
        Self::new(process.text("fullpath"), process.integer("pid"), process.text("computer"))
    }

    /// Key ignoring the path, for records that only know the pid
    pub fn of_pid(process: &Node) -> Self {
        Self::new("", process.integer("pid"), process.text("computer"))
    }
}

/// Processes by natural key and by pid + computer
pub struct ProcessIndex<'a> {
    by_key: FxHashMap<ProcessKey, Vec<&'a Node>>,
    by_pid: FxHashMap<ProcessKey, Vec<&'a Node>>,
}

impl<'a> ProcessIndex<'a> {
    pub fn new(processes: &'a [Node]) -> Self {
        let mut by_key: FxHashMap<ProcessKey, Vec<&'a Node>> = FxHashMap::default();
        let mut by_pid: FxHashMap<ProcessKey, Vec<&'a Node>> = FxHashMap::default();
        for process in processes {
            by_key.entry(ProcessKey::of(process)).or_default().push(process);
            by_pid.entry(ProcessKey::of_pid(process)).or_default().push(process);
        }
        Self { by_key, by_pid }
    }

    pub fn get(&self, path: &str, pid: i64, computer: &str) -> &[&'a Node] {
        if path.is_empty() || pid == 0 {
            return &[];
        }
        self.by_key
            .get(&ProcessKey::new(path, pid, computer))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn by_pid(&self, pid: i64, computer: &str) -> &[&'a Node] {
        if pid == 0 {
            return &[];
        }
        self.by_pid
            .get(&ProcessKey::new("", pid, computer))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Candidates observed before `timestamp` (or at it, unless `strict`)
pub fn preceding<'a, 'b>(
    candidates: &'b [&'a Node],
    timestamp: i64,
    strict: bool,
) -> impl Iterator<Item = &'a Node> + 'b {
    candidates.iter().copied().filter(move |node| {
        if strict {
            node.timestamp() < timestamp
        } else {
            node.timestamp() <= timestamp
        }
    })
}

/// The latest of [`preceding`]
pub fn nearest<'a>(candidates: &[&'a Node], timestamp: i64, strict: bool) -> Option<&'a Node> {
    preceding(candidates, timestamp, strict).max_by_key(|node| (node.timestamp(), node.id))
}

/// Nodes by case-folded name
pub struct NameIndex<'a> {
    by_name: FxHashMap<String, Vec<&'a Node>>,
}

impl<'a> NameIndex<'a> {
    /// Index `nodes` under each non-empty value of `keys`
    pub fn new(nodes: &'a [Node], keys: &[&str]) -> Self {
        let mut by_name: FxHashMap<String, Vec<&'a Node>> = FxHashMap::default();
        for node in nodes {
            let mut names: Vec<String> = keys
                .iter()
                .map(|key| fold(node.text(key)))
                .filter(|name| !name.is_empty())
                .collect();
            names.dedup();
            for name in names {
                by_name.entry(name).or_default().push(node);
            }
        }
        Self { by_name }
    }

    pub fn users(users: &'a [Node]) -> Self {
        Self::new(users, &["username", "fullname"])
    }

    pub fn computers(computers: &'a [Node]) -> Self {
        Self::new(computers, &["name"])
    }

    pub fn get(&self, name: &str) -> &[&'a Node] {
        if name.is_empty() {
            return &[];
        }
        self.by_name.get(&fold(name)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes named `name`, narrowed to `domain` when some node agrees on it
    pub fn in_domain(&self, name: &str, domain: &str) -> Vec<NodeId> {
        let candidates = self.get(name);
        if !domain.is_empty() {
            let domain = fold(domain);
            let agreeing: Vec<NodeId> = candidates
                .iter()
                .filter(|node| fold(node.text("domain")) == domain)
                .map(|node| node.id)
                .collect();
            if !agreeing.is_empty() {
                return agreeing;
            }
        }
        candidates.iter().map(|node| node.id).collect()
    }
}
