// src/resolver/conflict.rs

//! Pairwise conflict detection over a resolved plan
//!
//! Runs once after resolution, before any execution. Three detectors run
//! independently over every pair of non-skipped components, so one pair can
//! produce multiple records. Critical records block scheduling entirely;
//! Warning records are advisory.

use crate::catalog::Component;
use crate::resolver::plan::InstallationPlan;
use serde::Serialize;
use std::fmt;
use strum_macros::Display;
use tracing::warn;

/// What kind of incompatibility was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    /// Declared in the catalog (symmetric)
    Explicit,
    /// One install path is a segment-wise prefix of the other
    PathOverlap,
    /// Same underlying software, mutually unsatisfiable constraints
    VersionClash,
}

/// How serious a conflict is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// Advisory; execution may proceed
    Warning,
    /// Blocks execution until the caller resolves it
    Critical,
}

/// One detected incompatibility between two components
#[derive(Debug, Clone, Serialize)]
pub struct ConflictRecord {
    pub component_a: String,
    pub component_b: String,
    pub kind: ConflictKind,
    pub severity: Severity,
    pub resolution_hint: String,
}

impl fmt::Display for ConflictRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} between {} and {}: {}",
            self.severity, self.kind, self.component_a, self.component_b, self.resolution_hint
        )
    }
}

/// Finds pairwise incompatibilities in a resolved plan
pub struct ConflictDetector;

impl ConflictDetector {
    /// Vet the full pairwise combination of non-skipped plan components
    ///
    /// Pairs are visited in sorted id order so the record list is
    /// deterministic for a given plan.
    pub fn detect(plan: &InstallationPlan) -> Vec<ConflictRecord> {
        let mut components: Vec<&Component> = plan
            .executable_nodes()
            .map(|n| n.component.as_ref())
            .collect();
        components.sort_by(|a, b| a.id.cmp(&b.id));

        let mut records = Vec::new();
        for (i, a) in components.iter().enumerate() {
            for b in &components[i + 1..] {
                Self::check_explicit(a, b, &mut records);
                Self::check_path_overlap(a, b, &mut records);
                Self::check_version_clash(a, b, &mut records);
            }
        }

        for record in &records {
            warn!("{}", record);
        }
        records
    }

    /// Declared conflicts are symmetric: either side's declaration counts
    fn check_explicit(a: &Component, b: &Component, records: &mut Vec<ConflictRecord>) {
        if a.declared_conflict_ids.contains(&b.id) || b.declared_conflict_ids.contains(&a.id) {
            records.push(ConflictRecord {
                component_a: a.id.clone(),
                component_b: b.id.clone(),
                kind: ConflictKind::Explicit,
                severity: Severity::Critical,
                resolution_hint: "mutually exclusive by declaration".to_string(),
            });
        }
    }

    /// Segment-wise path prefix check, Critical when paths are identical
    fn check_path_overlap(a: &Component, b: &Component, records: &mut Vec<ConflictRecord>) {
        let (Some(path_a), Some(path_b)) = (&a.install_path, &b.install_path) else {
            return;
        };

        // starts_with compares whole path components, never substrings
        if !path_a.starts_with(path_b) && !path_b.starts_with(path_a) {
            return;
        }

        let severity = if path_a == path_b {
            Severity::Critical
        } else {
            Severity::Warning
        };
        records.push(ConflictRecord {
            component_a: a.id.clone(),
            component_b: b.id.clone(),
            kind: ConflictKind::PathOverlap,
            severity,
            resolution_hint: format!(
                "install paths overlap: {} vs {}",
                path_a.display(),
                path_b.display()
            ),
        });
    }

    /// Same normalized base name with constraints no single install satisfies
    fn check_version_clash(a: &Component, b: &Component, records: &mut Vec<ConflictRecord>) {
        if a.base_name() != b.base_name() {
            return;
        }
        if a.constraint.is_compatible_with(&b.constraint) {
            return;
        }
        records.push(ConflictRecord {
            component_a: a.id.clone(),
            component_b: b.id.clone(),
            kind: ConflictKind::VersionClash,
            severity: Severity::Warning,
            resolution_hint: format!(
                "constraints {} and {} cannot both be satisfied; pick the higher \
                 constraint or isolate the installs under separate prefixes",
                a.constraint, b.constraint
            ),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Component;
    use crate::resolver::plan::PlanNode;
    use crate::version::VersionConstraint;
    use std::sync::Arc;

    fn plan_of(components: Vec<Component>) -> InstallationPlan {
        InstallationPlan {
            ordered_groups: vec![components
                .into_iter()
                .map(|c| PlanNode {
                    component: Arc::new(c),
                    level: 0,
                    skip_install: false,
                })
                .collect()],
            conflicts: Vec::new(),
        }
    }

    #[test]
    fn test_explicit_conflict_is_critical() {
        let plan = plan_of(vec![
            Component::new("a"),
            Component::new("b").with_conflicts(["a"]),
        ]);
        let records = ConflictDetector::detect(&plan);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ConflictKind::Explicit);
        assert_eq!(records[0].severity, Severity::Critical);
    }

    #[test]
    fn test_explicit_conflict_symmetric() {
        // Declared only on one side; both orderings must be caught
        let plan = plan_of(vec![
            Component::new("a").with_conflicts(["b"]),
            Component::new("b"),
        ]);
        let records = ConflictDetector::detect(&plan);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ConflictKind::Explicit);
    }

    #[test]
    fn test_path_prefix_overlap_is_warning() {
        let plan = plan_of(vec![
            Component::new("a").with_install_path("/opt/x"),
            Component::new("b").with_install_path("/opt/x/sub"),
        ]);
        let records = ConflictDetector::detect(&plan);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ConflictKind::PathOverlap);
        assert_eq!(records[0].severity, Severity::Warning);
    }

    #[test]
    fn test_identical_paths_are_critical() {
        let plan = plan_of(vec![
            Component::new("a").with_install_path("/opt/x"),
            Component::new("b").with_install_path("/opt/x"),
        ]);
        let records = ConflictDetector::detect(&plan);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Critical);
    }

    #[test]
    fn test_sibling_paths_do_not_overlap() {
        let plan = plan_of(vec![
            Component::new("a").with_install_path("/opt/x"),
            Component::new("b").with_install_path("/opt/x2"),
        ]);
        assert!(ConflictDetector::detect(&plan).is_empty());
    }

    #[test]
    fn test_version_clash_same_base_name() {
        let plan = plan_of(vec![
            Component::new("python-3.8")
                .with_constraint(VersionConstraint::parse("< 3.9").unwrap()),
            Component::new("python-3.12")
                .with_constraint(VersionConstraint::parse(">= 3.12").unwrap()),
        ]);
        let records = ConflictDetector::detect(&plan);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ConflictKind::VersionClash);
        assert_eq!(records[0].severity, Severity::Warning);
    }

    #[test]
    fn test_no_version_clash_when_constraints_overlap() {
        let plan = plan_of(vec![
            Component::new("node-a")
                .with_constraint(VersionConstraint::parse(">= 18").unwrap()),
            Component::new("node-b")
                .with_constraint(VersionConstraint::parse(">= 20").unwrap()),
        ]);
        // Different base names, and overlapping ranges anyway
        assert!(ConflictDetector::detect(&plan).is_empty());
    }

    #[test]
    fn test_pair_can_produce_multiple_records() {
        let plan = plan_of(vec![
            Component::new("a")
                .with_conflicts(["b"])
                .with_install_path("/opt/shared"),
            Component::new("b").with_install_path("/opt/shared"),
        ]);
        let records = ConflictDetector::detect(&plan);
        assert_eq!(records.len(), 2);
        assert!(records.iter().any(|r| r.kind == ConflictKind::Explicit));
        assert!(records.iter().any(|r| r.kind == ConflictKind::PathOverlap));
    }

    #[test]
    fn test_skipped_nodes_not_vetted() {
        let mut plan = plan_of(vec![Component::new("b").with_conflicts(["a"])]);
        plan.ordered_groups[0].push(PlanNode {
            component: Arc::new(Component::new("a")),
            level: 0,
            skip_install: true,
        });
        assert!(ConflictDetector::detect(&plan).is_empty());
    }
}
