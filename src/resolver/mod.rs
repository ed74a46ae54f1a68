// src/resolver/mod.rs

//! Dependency resolution: graph construction, cycle detection, and
//! level-ordered plan building
//!
//! `Resolver::resolve` turns a requested component set into an
//! `InstallationPlan` whose groups are dependency levels, or fails with
//! the full normalized cycle list / missing dependency report.

mod conflict;
mod graph;
mod plan;

pub use conflict::{ConflictDetector, ConflictKind, ConflictRecord, Severity};
pub use graph::DependencyGraph;
pub use plan::{InstallationPlan, PlanNode};

use crate::catalog::ComponentCatalog;
use crate::error::{Error, Result};
use std::collections::BTreeSet;
use tracing::info;

/// Builds level-ordered installation plans from the catalog
pub struct Resolver;

impl Resolver {
    /// Resolve a requested set into a level-grouped plan
    ///
    /// `satisfied` names components already present on the host; they are
    /// retained as level-0 anchors flagged `skip_install` so dependents
    /// still see their dependency as resolved. The returned plan carries
    /// no conflict records yet; run `ConflictDetector::detect` and attach
    /// the result before handing the plan to the scheduler.
    pub fn resolve(
        requested: &[String],
        catalog: &ComponentCatalog,
        satisfied: &BTreeSet<String>,
    ) -> Result<InstallationPlan> {
        let graph = DependencyGraph::build(requested, catalog, satisfied)?;

        let cycles = graph.detect_cycles();
        if !cycles.is_empty() {
            return Err(Error::DependencyCycle { cycles });
        }

        let levels = graph.levels()?;
        let depth = levels.values().copied().max().map_or(0, |d| d + 1);
        let mut ordered_groups: Vec<Vec<PlanNode>> = vec![Vec::new(); depth];

        // BTreeMap iteration is id-sorted, so each group comes out sorted
        for (id, level) in &levels {
            let component = graph.node(id).expect("leveled node in graph").clone();
            ordered_groups[*level].push(PlanNode {
                component,
                level: *level,
                skip_install: graph.is_satisfied(id),
            });
        }

        let plan = InstallationPlan {
            ordered_groups,
            conflicts: Vec::new(),
        };
        info!(
            "resolved {} component(s) into {} level(s), {} to execute",
            graph.len(),
            depth,
            plan.executable_count()
        );
        Ok(plan)
    }
}
