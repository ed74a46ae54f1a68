// src/scheduler/mod.rs

//! Level-ordered parallel execution
//!
//! Consumes an `InstallationPlan` strictly in ascending level order: a
//! level never starts until every component of the previous level is
//! terminal. Within a level, parallel-eligible components run concurrently
//! on a semaphore-bounded worker pool; components that opted out of
//! parallelism, or that share a declared conflict with a same-level peer,
//! run sequentially afterwards in ascending id order.
//!
//! Execution-phase failures never surface as `Err`: every attempt is
//! captured as an `OperationRecord` and the batch always returns a
//! `BatchResult`.

mod recovery;

pub use recovery::{RecoveryController, MAX_ATTEMPTS};

use crate::error::{Error, Result};
use crate::progress::{ProgressTracker, SilentProgress};
use crate::record::{AttemptOutcome, BatchResult, OperationRecord};
use crate::resolver::{InstallationPlan, PlanNode};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Terminal state of a component, tracked for skip propagation
#[derive(Debug, Clone)]
enum Terminal {
    Success,
    /// Failed or skipped; carries the originally failing ancestor's id
    Failed(String),
}

/// Executes one plan with bounded within-level parallelism
pub struct ParallelExecutionScheduler {
    max_parallel: usize,
    recovery_enabled: bool,
    recovery: RecoveryController,
    progress: Arc<dyn ProgressTracker>,
}

impl ParallelExecutionScheduler {
    pub fn new(max_parallel: usize, recovery_enabled: bool) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
            recovery_enabled,
            recovery: RecoveryController::new(),
            progress: Arc::new(SilentProgress::new()),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressTracker>) -> Self {
        self.progress = progress;
        self
    }

    /// Run the plan to completion, cancellation, or exhausted failure
    ///
    /// Refuses a plan carrying Critical conflict records; the caller must
    /// re-plan without one of the offenders first. Cancellation is checked
    /// before each level and before dispatching each component; in-flight
    /// attempts always reach their terminal state, and completed results
    /// are preserved in the returned batch.
    pub async fn execute(
        &self,
        plan: &InstallationPlan,
        cancel: CancellationToken,
    ) -> Result<BatchResult> {
        if plan.has_critical_conflicts() {
            return Err(Error::CriticalConflicts {
                count: plan.critical_conflict_count(),
            });
        }

        let records: Arc<Mutex<Vec<OperationRecord>>> = Arc::new(Mutex::new(Vec::new()));
        let mut terminal: BTreeMap<String, Terminal> = BTreeMap::new();
        let mut cancelled = false;

        self.progress.set_length(plan.executable_count() as u64);

        for (level, group) in plan.ordered_groups.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            // Settle satisfied anchors and dependency-failure skips first
            let mut executable: Vec<&PlanNode> = Vec::new();
            for node in group {
                if node.skip_install {
                    terminal.insert(node.id().to_string(), Terminal::Success);
                    continue;
                }
                if let Some(origin) = failed_ancestor(node, &terminal) {
                    debug!(
                        "skipping '{}': ancestor '{}' failed",
                        node.id(),
                        origin
                    );
                    append(&records, vec![OperationRecord::skipped(node.id(), &origin)]);
                    terminal.insert(node.id().to_string(), Terminal::Failed(origin));
                    self.progress.increment(1);
                    continue;
                }
                executable.push(node);
            }

            let (parallel_set, sequential_set) = partition_by_parallelism(&executable);
            info!(
                "level {}: {} parallel, {} sequential, {} settled",
                level,
                parallel_set.len(),
                sequential_set.len(),
                group.len() - executable.len()
            );

            // Parallel subset: semaphore-bounded worker pool
            let semaphore = Arc::new(Semaphore::new(self.max_parallel));
            let outcomes: Vec<(String, Option<AttemptOutcome>)> =
                stream::iter(parallel_set)
                    .map(|node| {
                        let semaphore = semaphore.clone();
                        let cancel = cancel.clone();
                        let records = records.clone();
                        async move {
                            let _permit =
                                semaphore.acquire().await.expect("semaphore never closed");
                            if cancel.is_cancelled() {
                                return (node.id().to_string(), None);
                            }
                            self.progress.set_message(&node.component.display_name);
                            let attempt_records =
                                self.recovery.attempt(node, self.recovery_enabled).await;
                            let outcome = recovery::final_outcome(&attempt_records);
                            append(&records, attempt_records);
                            (node.id().to_string(), Some(outcome))
                        }
                    })
                    .buffer_unordered(self.max_parallel)
                    .collect()
                    .await;

            for (id, outcome) in outcomes {
                match outcome {
                    Some(AttemptOutcome::Success) => {
                        terminal.insert(id, Terminal::Success);
                        self.progress.increment(1);
                    }
                    Some(_) => {
                        terminal.insert(id.clone(), Terminal::Failed(id));
                        self.progress.increment(1);
                    }
                    None => cancelled = true,
                }
            }

            // Sequential subset, ascending id, after the parallel subset
            for node in sequential_set {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                self.progress.set_message(&node.component.display_name);
                let attempt_records = self.recovery.attempt(node, self.recovery_enabled).await;
                let outcome = recovery::final_outcome(&attempt_records);
                append(&records, attempt_records);
                let state = if outcome == AttemptOutcome::Success {
                    Terminal::Success
                } else {
                    Terminal::Failed(node.id().to_string())
                };
                terminal.insert(node.id().to_string(), state);
                self.progress.increment(1);
            }
        }

        let records = Arc::try_unwrap(records)
            .map(|m| m.into_inner().unwrap_or_default())
            .unwrap_or_default();
        let result = BatchResult::new(records, cancelled);

        if result.cancelled {
            self.progress.finish_with_error("batch cancelled");
        } else if result.overall_success {
            self.progress.finish_with_message("batch complete");
        } else {
            self.progress.finish_with_error("batch finished with failures");
        }
        info!(
            "batch {}: success={} cancelled={} skipped={}",
            result.batch_id,
            result.overall_success,
            result.cancelled,
            result.skipped_ids.len()
        );
        Ok(result)
    }
}

fn append(records: &Arc<Mutex<Vec<OperationRecord>>>, mut batch: Vec<OperationRecord>) {
    records
        .lock()
        .expect("record mutex poisoned")
        .append(&mut batch);
}

/// First failed or skipped dependency's originating ancestor, if any
fn failed_ancestor(node: &PlanNode, terminal: &BTreeMap<String, Terminal>) -> Option<String> {
    for dep in &node.component.dependency_ids {
        if let Some(Terminal::Failed(origin)) = terminal.get(dep) {
            return Some(origin.clone());
        }
    }
    None
}

/// Split a level's executable nodes into parallel and sequential subsets
///
/// Sequential: parallelism disabled on the component, or a declared
/// conflict shared with another executable component of the same level
/// (even a non-critical one). Input order (ascending id) is preserved.
fn partition_by_parallelism<'a>(
    executable: &[&'a PlanNode],
) -> (Vec<&'a PlanNode>, Vec<&'a PlanNode>) {
    let mut parallel = Vec::new();
    let mut sequential = Vec::new();

    for node in executable {
        let conflicted = executable.iter().any(|other| {
            other.id() != node.id()
                && (node
                    .component
                    .declared_conflict_ids
                    .contains(other.id())
                    || other
                        .component
                        .declared_conflict_ids
                        .contains(node.id()))
        });
        if node.component.allow_parallel && !conflicted {
            parallel.push(*node);
        } else {
            sequential.push(*node);
        }
    }

    (parallel, sequential)
}
