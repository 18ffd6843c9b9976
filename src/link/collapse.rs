//! Duplicate-edge collapse
//!
//! When a target has several incoming edges of one kind whose sources share
//! a natural key, only the edge whose source was observed nearest the edge's
//! correlation timestamp is kept.

use rustc_hash::{FxHashMap, FxHashSet};

use super::index::ProcessKey;
use super::LinkResult;
use crate::graph::{Edge, EdgeId, EdgeType, Label, Node, NodeId};
use crate::store::GraphBackend;

pub struct Collapse {
    pub edge_type: &'static str,
    pub source: &'static str,
    pub target: &'static str,
    pub key: fn(&Node) -> ProcessKey,
}

/// Delete the redundant edges, returning how many were deleted
pub async fn collapse(backend: &dyn GraphBackend, rule: &Collapse) -> LinkResult<usize> {
    let edges = backend.match_edges(&EdgeType::new(rule.edge_type)).await?;
    if edges.is_empty() {
        return Ok(0);
    }
    let sources: FxHashMap<NodeId, Node> = backend
        .match_nodes(&Label::new(rule.source))
        .await?
        .into_iter()
        .map(|node| (node.id, node))
        .collect();
    let targets: FxHashSet<NodeId> = backend
        .match_nodes(&Label::new(rule.target))
        .await?
        .iter()
        .map(|node| node.id)
        .collect();

    let doomed = redundant_edges(&edges, &sources, &targets, rule.key);
    for id in &doomed {
        backend.delete_edge(*id).await?;
    }
    Ok(doomed.len())
}

pub fn redundant_edges(
    edges: &[Edge],
    sources: &FxHashMap<NodeId, Node>,
    targets: &FxHashSet<NodeId>,
    key: fn(&Node) -> ProcessKey,
) -> Vec<EdgeId> {
    let mut groups: FxHashMap<(NodeId, ProcessKey, i64), Vec<(&Edge, &Node)>> =
        FxHashMap::default();
    for edge in edges {
        if !targets.contains(&edge.target) {
            continue;
        }
        let Some(source) = sources.get(&edge.source) else {
            continue;
        };
        groups
            .entry((edge.target, key(source), edge.timestamp()))
            .or_default()
            .push((edge, source));
    }

    let mut doomed = Vec::new();
    for ((_, _, reference), mut group) in groups {
        if group.len() < 2 {
            continue;
        }
        group.sort_by_key(|(edge, source)| (source.timestamp().abs_diff(reference), edge.id));
        doomed.extend(group[1..].iter().map(|(edge, _)| edge.id));
    }
    doomed.sort();
    doomed
}
