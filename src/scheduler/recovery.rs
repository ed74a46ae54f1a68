// src/scheduler/recovery.rs

//! Automatic retry with exponential backoff
//!
//! Classifies each failed attempt by its closed error-kind tag: transient
//! kinds are retried with backoff, fatal kinds terminate the component on
//! the first failure. The controller never rolls back a failed action's
//! partial side effects; safe-state on failure is the action's contract.

use crate::action::InstallContext;
use crate::record::{AttemptOutcome, OperationRecord};
use crate::resolver::PlanNode;
use std::time::Duration;
use tracing::{info, warn};

/// Total attempts for a retryable failure: 1 initial + 2 retries
pub const MAX_ATTEMPTS: u32 = 3;

/// Drives the attempt/retry loop for one component
#[derive(Debug, Clone, Copy)]
pub struct RecoveryController {
    max_attempts: u32,
}

impl Default for RecoveryController {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

impl RecoveryController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a component's install action until it reaches a terminal state
    ///
    /// Returns every attempt's record in order; the last record's outcome
    /// is the one that surfaces to the scheduler. With `recovery_enabled`
    /// false every failure is terminal after a single attempt. The backoff
    /// sleep (1s, then 2s) delays only this component's own retry path,
    /// never its siblings.
    pub async fn attempt(
        &self,
        node: &PlanNode,
        recovery_enabled: bool,
    ) -> Vec<OperationRecord> {
        let component = &node.component;
        let mut records = Vec::new();

        for attempt in 1..=self.max_attempts {
            let record = OperationRecord::begin(&component.id, attempt);
            let ctx = InstallContext {
                component_id: component.id.clone(),
                install_path: component.install_path.clone(),
                attempt,
            };

            let outcome = component.action.install(&ctx).await;
            if outcome.success {
                info!(
                    "installed '{}' on attempt {}",
                    component.id, attempt
                );
                records.push(record.succeed(outcome.message));
                break;
            }

            let kind = outcome.error_kind;
            let retry = recovery_enabled
                && kind.is_some_and(|k| k.is_retryable())
                && attempt < self.max_attempts;
            records.push(record.fail(kind, outcome.message));

            if !retry {
                warn!(
                    "install of '{}' failed terminally on attempt {} ({})",
                    component.id,
                    attempt,
                    kind.map_or_else(|| "unclassified".to_string(), |k| k.to_string())
                );
                break;
            }

            // 2^n seconds after the nth failed attempt: 1s, then 2s
            let delay = Duration::from_secs(1 << (attempt - 1));
            warn!(
                "install of '{}' failed with retryable {} on attempt {}, retrying in {:?}",
                component.id,
                kind.map_or_else(|| "unclassified".to_string(), |k| k.to_string()),
                attempt,
                delay
            );
            tokio::time::sleep(delay).await;
        }

        records
    }
}

/// Terminal outcome of a full attempt loop
pub(crate) fn final_outcome(records: &[OperationRecord]) -> AttemptOutcome {
    records
        .last()
        .map_or(AttemptOutcome::Failed, |r| r.outcome)
}
