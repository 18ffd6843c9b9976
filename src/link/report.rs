use serde::Serialize;

use super::Pass;

/// Outcome of one linking pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub pass: &'static str,
    pub edges_created: usize,
    pub edges_deleted: usize,
    /// Host, File and Group nodes merged in by the pass
    pub nodes_synthesized: usize,
}

impl PassReport {
    pub fn new(pass: Pass) -> Self {
        Self {
            pass: pass.name(),
            edges_created: 0,
            edges_deleted: 0,
            nodes_synthesized: 0,
        }
    }
}

/// Outcome of a linker run, passes in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub passes: Vec<PassReport>,
}

impl LinkReport {
    pub fn pass(&self, pass: Pass) -> Option<&PassReport> {
        self.passes.iter().find(|report| report.pass == pass.name())
    }

    pub fn edges_created(&self) -> usize {
        self.passes.iter().map(|p| p.edges_created).sum()
    }

    pub fn edges_deleted(&self) -> usize {
        self.passes.iter().map(|p| p.edges_deleted).sum()
    }

    pub fn nodes_synthesized(&self) -> usize {
        self.passes.iter().map(|p| p.nodes_synthesized).sum()
    }
}
