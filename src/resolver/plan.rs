// src/resolver/plan.rs

//! Installation plan data structures
//!
//! The plan is built once per install request, immutable after `resolve()`
//! returns, and consumed exactly once by the scheduler.

use crate::catalog::Component;
use crate::resolver::conflict::{ConflictRecord, Severity};
use std::sync::Arc;

/// One component placed in the plan
#[derive(Debug, Clone)]
pub struct PlanNode {
    pub component: Arc<Component>,
    /// Longest dependency chain ending at this component
    pub level: usize,
    /// Already satisfied on the host; kept in the graph so dependents
    /// resolve, but never executed
    pub skip_install: bool,
}

impl PlanNode {
    pub fn id(&self) -> &str {
        &self.component.id
    }
}

/// Level-grouped installation order plus the conflicts found against it
#[derive(Debug, Default)]
pub struct InstallationPlan {
    /// One inner vec per dependency level, ascending, each sorted by id
    pub ordered_groups: Vec<Vec<PlanNode>>,
    /// Conflict records from the vetting pass; Critical entries block
    /// execution until the caller re-plans without one of the offenders
    pub conflicts: Vec<ConflictRecord>,
}

impl InstallationPlan {
    /// All nodes that will actually execute (skips excluded)
    pub fn executable_nodes(&self) -> impl Iterator<Item = &PlanNode> {
        self.ordered_groups
            .iter()
            .flatten()
            .filter(|n| !n.skip_install)
    }

    /// All nodes including satisfied anchors
    pub fn nodes(&self) -> impl Iterator<Item = &PlanNode> {
        self.ordered_groups.iter().flatten()
    }

    pub fn node(&self, id: &str) -> Option<&PlanNode> {
        self.nodes().find(|n| n.id() == id)
    }

    pub fn executable_count(&self) -> usize {
        self.executable_nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_groups.iter().all(Vec::is_empty)
    }

    pub fn has_critical_conflicts(&self) -> bool {
        self.conflicts
            .iter()
            .any(|c| c.severity == Severity::Critical)
    }

    pub fn critical_conflict_count(&self) -> usize {
        self.conflicts
            .iter()
            .filter(|c| c.severity == Severity::Critical)
            .count()
    }
}
