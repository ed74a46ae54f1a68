// src/orchestrator/mod.rs

//! Orchestrator facade
//!
//! Ties the detector, prioritizer, resolver, conflict detector, and
//! scheduler into the two-call surface exposed to callers: `plan` builds a
//! vetted `InstallationPlan`, `execute` consumes it. Requests are plain
//! value objects; the orchestrator holds no mutable state across batches.

use crate::catalog::ComponentCatalog;
use crate::detect::ApplicationDetector;
use crate::error::{Error, Result};
use crate::priority::{HierarchicalPrioritizer, PriorityResult};
use crate::progress::ProgressTracker;
use crate::record::BatchResult;
use crate::resolver::{ConflictDetector, ConflictRecord, InstallationPlan, Resolver};
use crate::scheduler::ParallelExecutionScheduler;
use semver::Version;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One planning request: which components, and which versions they must
/// meet when the host already has something installed
#[derive(Debug, Clone, Default)]
pub struct PlanRequest {
    pub requested: Vec<String>,
    /// Per-component required version; components absent here fall back
    /// to the lower bound of their catalog constraint
    pub required_versions: BTreeMap<String, Version>,
}

impl PlanRequest {
    pub fn new<I, S>(requested: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            requested: requested.into_iter().map(Into::into).collect(),
            required_versions: BTreeMap::new(),
        }
    }

    pub fn require_version(mut self, id: impl Into<String>, version: Version) -> Self {
        self.required_versions.insert(id.into(), version);
        self
    }
}

/// Outcome of planning: the vetted plan plus the detection reasoning
#[derive(Debug)]
pub struct PlanResult {
    pub plan: InstallationPlan,
    /// Per-component prioritization, for rendering why something was
    /// treated as already satisfied
    pub reports: Vec<PriorityResult>,
}

impl PlanResult {
    pub fn conflicts(&self) -> &[ConflictRecord] {
        &self.plan.conflicts
    }
}

/// One execution request, consuming a plan exactly once
pub struct ExecuteRequest {
    pub plan: InstallationPlan,
    pub max_parallel: usize,
    pub recovery_enabled: bool,
    pub cancel: CancellationToken,
}

impl ExecuteRequest {
    pub fn new(plan: InstallationPlan) -> Self {
        Self {
            plan,
            max_parallel: 4,
            recovery_enabled: true,
            cancel: CancellationToken::new(),
        }
    }

    pub fn max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    pub fn recovery_enabled(mut self, enabled: bool) -> Self {
        self.recovery_enabled = enabled;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Batch installation orchestrator
///
/// Owns the catalog and detector for its lifetime; each `plan`/`execute`
/// pair operates on its own value objects, so one orchestrator can serve
/// sequential batches without carrying state between them.
pub struct Orchestrator {
    catalog: ComponentCatalog,
    detector: Box<dyn ApplicationDetector>,
}

impl Orchestrator {
    pub fn new(catalog: ComponentCatalog, detector: Box<dyn ApplicationDetector>) -> Self {
        Self { catalog, detector }
    }

    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    /// Build a vetted installation plan for the requested components
    ///
    /// Probes the host for every component in the transitive closure,
    /// prioritizes the results into satisfied verdicts, resolves the
    /// dependency graph into level groups, and attaches the conflict
    /// records. Fails only for planning-phase problems: unknown ids,
    /// missing dependencies, cycles.
    pub fn plan(&self, request: &PlanRequest) -> Result<PlanResult> {
        for id in &request.requested {
            if !self.catalog.contains(id) {
                return Err(Error::Catalog(format!(
                    "requested component '{}' is not in the catalog",
                    id
                )));
            }
        }

        let closure = self.dependency_closure(&request.requested);
        let mut satisfied: BTreeSet<String> = BTreeSet::new();
        let mut reports = Vec::new();

        for id in &closure {
            let component = self.catalog.get(id).expect("closure ids are cataloged");
            let candidates = self.detector.probe(component)?;
            let required = request
                .required_versions
                .get(id)
                .cloned()
                .or_else(|| component.constraint.minimum());
            let report =
                HierarchicalPrioritizer::prioritize(id, candidates, required.as_ref());
            if report.is_satisfied() {
                debug!("component '{}' already satisfied on host", id);
                satisfied.insert(id.clone());
            }
            reports.push(report);
        }

        let mut plan = Resolver::resolve(&request.requested, &self.catalog, &satisfied)?;
        plan.conflicts = ConflictDetector::detect(&plan);
        info!(
            "plan ready: {} to execute, {} satisfied, {} conflict record(s)",
            plan.executable_count(),
            satisfied.len(),
            plan.conflicts.len()
        );

        Ok(PlanResult { plan, reports })
    }

    /// Probe and prioritize components without resolving dependencies
    ///
    /// Detection-only surface for inventory front-ends; a broken graph
    /// (cycles, missing deps) does not prevent probing.
    pub fn detect_report(&self, ids: &[String]) -> Result<Vec<PriorityResult>> {
        let mut reports = Vec::new();
        for id in ids {
            let Some(component) = self.catalog.get(id) else {
                return Err(Error::Catalog(format!(
                    "requested component '{}' is not in the catalog",
                    id
                )));
            };
            let candidates = self.detector.probe(component)?;
            let required = component.constraint.minimum();
            reports.push(HierarchicalPrioritizer::prioritize(
                id,
                candidates,
                required.as_ref(),
            ));
        }
        Ok(reports)
    }

    /// Execute a vetted plan
    ///
    /// Refuses plans still carrying Critical conflicts. Execution-phase
    /// failures are reported inside the returned `BatchResult`, never as
    /// `Err`.
    pub async fn execute(&self, request: ExecuteRequest) -> Result<BatchResult> {
        let scheduler =
            ParallelExecutionScheduler::new(request.max_parallel, request.recovery_enabled);
        scheduler.execute(&request.plan, request.cancel).await
    }

    /// Execute with a progress sink (CLI front-ends)
    pub async fn execute_with_progress(
        &self,
        request: ExecuteRequest,
        progress: Arc<dyn ProgressTracker>,
    ) -> Result<BatchResult> {
        let scheduler =
            ParallelExecutionScheduler::new(request.max_parallel, request.recovery_enabled)
                .with_progress(progress);
        scheduler.execute(&request.plan, request.cancel).await
    }

    /// Breadth-first transitive closure of the requested ids, sorted
    ///
    /// Walked before satisfied verdicts exist, so every potentially
    /// relevant component gets probed; the resolver re-walks afterwards
    /// with satisfied anchors pruning their subtrees. Ids missing from
    /// the catalog are left out here; the resolver reports them fatally
    /// with their requirers.
    fn dependency_closure(&self, requested: &[String]) -> BTreeSet<String> {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<&str> = requested.iter().map(String::as_str).collect();

        while let Some(id) = queue.pop_front() {
            if seen.contains(id) {
                continue;
            }
            let Some(component) = self.catalog.get(id) else {
                continue;
            };
            seen.insert(id.to_string());
            for dep in &component.dependency_ids {
                queue.push_back(dep);
            }
        }

        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Component;
    use crate::detect::{Confidence, DetectedApplication, StaticDetector};
    use crate::version::VersionConstraint;

    fn orchestrator(components: Vec<Component>, detector: StaticDetector) -> Orchestrator {
        Orchestrator::new(
            ComponentCatalog::from_components(components).unwrap(),
            Box::new(detector),
        )
    }

    #[test]
    fn test_plan_unknown_component_rejected() {
        let orch = orchestrator(vec![Component::new("a")], StaticDetector::new());
        let err = orch.plan(&PlanRequest::new(["ghost"])).unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
    }

    #[test]
    fn test_satisfied_component_excluded_from_execution() {
        let detector = StaticDetector::new().with_detection(
            DetectedApplication::new("runtime", Confidence::Installed)
                .with_version(Version::new(2, 0, 0)),
        );
        let orch = orchestrator(
            vec![
                Component::new("runtime")
                    .with_constraint(VersionConstraint::parse(">= 2.0").unwrap()),
                Component::new("app").with_dependencies(["runtime"]),
            ],
            detector,
        );

        let result = orch.plan(&PlanRequest::new(["app"])).unwrap();
        let runtime = result.plan.node("runtime").unwrap();
        assert!(runtime.skip_install);
        assert_eq!(result.plan.executable_count(), 1);

        // The prioritization reasoning is returned for auditability
        let report = result
            .reports
            .iter()
            .find(|r| r.component_id == "runtime")
            .unwrap();
        assert!(report.is_satisfied());
    }

    #[test]
    fn test_outdated_host_version_still_installs() {
        let detector = StaticDetector::new().with_detection(
            DetectedApplication::new("runtime", Confidence::Installed)
                .with_version(Version::new(1, 0, 0)),
        );
        let orch = orchestrator(
            vec![Component::new("runtime")
                .with_constraint(VersionConstraint::parse(">= 2.0").unwrap())],
            detector,
        );

        let result = orch.plan(&PlanRequest::new(["runtime"])).unwrap();
        assert_eq!(result.plan.executable_count(), 1);
    }

    #[test]
    fn test_explicit_required_version_overrides_catalog_hint() {
        let detector = StaticDetector::new().with_detection(
            DetectedApplication::new("tool", Confidence::Installed)
                .with_version(Version::new(3, 2, 0)),
        );
        let orch = orchestrator(vec![Component::new("tool")], detector);

        // Host has 3.2, caller pins 3.2 exactly: satisfied
        let request =
            PlanRequest::new(["tool"]).require_version("tool", Version::new(3, 2, 0));
        let result = orch.plan(&request).unwrap();
        assert_eq!(result.plan.executable_count(), 0);
    }

    #[tokio::test]
    async fn test_plan_then_execute_roundtrip() {
        let orch = orchestrator(
            vec![
                Component::new("base"),
                Component::new("app").with_dependencies(["base"]),
            ],
            StaticDetector::new(),
        );

        let planned = orch.plan(&PlanRequest::new(["app"])).unwrap();
        assert!(planned.conflicts().is_empty());

        let result = orch
            .execute(ExecuteRequest::new(planned.plan))
            .await
            .unwrap();
        assert!(result.overall_success);
        assert_eq!(result.records.len(), 2);
    }

    #[tokio::test]
    async fn test_critical_conflict_blocks_execute_until_replanned() {
        let orch = orchestrator(
            vec![
                Component::new("a"),
                Component::new("b").with_conflicts(["a"]),
            ],
            StaticDetector::new(),
        );

        let planned = orch.plan(&PlanRequest::new(["a", "b"])).unwrap();
        assert!(planned.plan.has_critical_conflicts());

        let err = orch
            .execute(ExecuteRequest::new(planned.plan))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CriticalConflicts { .. }));

        // Dropping one offender and re-planning unblocks execution
        let replanned = orch.plan(&PlanRequest::new(["b"])).unwrap();
        assert!(!replanned.plan.has_critical_conflicts());
        let result = orch
            .execute(ExecuteRequest::new(replanned.plan))
            .await
            .unwrap();
        assert!(result.overall_success);
    }
}
