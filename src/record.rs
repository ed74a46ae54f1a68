// src/record.rs

//! Execution audit trail
//!
//! One `OperationRecord` per component execution attempt, created at
//! attempt start and sealed at attempt end. The full ordered list is
//! returned to the caller as the batch audit trail; nothing about an
//! execution failure has to be re-derived from logs.

use crate::action::InstallErrorKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::Display;
use uuid::Uuid;

/// Terminal state of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AttemptOutcome {
    Success,
    Failed,
    /// Never attempted: a dependency failed terminally
    Skipped,
}

/// Audit record for one execution attempt of one component
#[derive(Debug, Clone, Serialize)]
pub struct OperationRecord {
    pub component_id: String,
    /// 1-based; retries increment this
    pub attempt_number: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub outcome: AttemptOutcome,
    pub error_kind: Option<InstallErrorKind>,
    /// Whether the error kind is eligible for automatic retry
    pub retryable: bool,
    pub message: String,
    /// For skips: the failed ancestor that caused this component to skip
    pub skipped_due_to: Option<String>,
}

impl OperationRecord {
    /// Open a record at attempt start
    pub fn begin(component_id: impl Into<String>, attempt_number: u32) -> Self {
        Self {
            component_id: component_id.into(),
            attempt_number,
            started_at: Utc::now(),
            ended_at: None,
            outcome: AttemptOutcome::Failed,
            error_kind: None,
            retryable: false,
            message: String::new(),
            skipped_due_to: None,
        }
    }

    /// Seal the record with a success outcome
    pub fn succeed(mut self, message: impl Into<String>) -> Self {
        self.ended_at = Some(Utc::now());
        self.outcome = AttemptOutcome::Success;
        self.message = message.into();
        self
    }

    /// Seal the record with a failure outcome
    pub fn fail(mut self, kind: Option<InstallErrorKind>, message: impl Into<String>) -> Self {
        self.ended_at = Some(Utc::now());
        self.outcome = AttemptOutcome::Failed;
        self.retryable = kind.is_some_and(|k| k.is_retryable());
        self.error_kind = kind;
        self.message = message.into();
        self
    }

    /// Record a component that was never attempted because `ancestor`
    /// failed terminally
    pub fn skipped(component_id: impl Into<String>, ancestor: impl Into<String>) -> Self {
        let ancestor = ancestor.into();
        let now = Utc::now();
        Self {
            component_id: component_id.into(),
            attempt_number: 0,
            started_at: now,
            ended_at: Some(now),
            outcome: AttemptOutcome::Skipped,
            error_kind: None,
            retryable: false,
            message: format!("dependency '{}' failed", ancestor),
            skipped_due_to: Some(ancestor),
        }
    }
}

/// Aggregated result of one batch execution
///
/// Always returned for execution-phase problems; only planning-phase
/// errors fail the call itself.
#[derive(Debug, Serialize)]
pub struct BatchResult {
    pub batch_id: Uuid,
    /// Every attempt record in completion order
    pub records: Vec<OperationRecord>,
    /// True when nothing failed, nothing was skipped, and the batch ran
    /// to completion
    pub overall_success: bool,
    /// Components never attempted because an ancestor failed
    pub skipped_ids: Vec<String>,
    /// The cancellation signal fired; completed levels are preserved
    pub cancelled: bool,
}

impl BatchResult {
    pub fn new(records: Vec<OperationRecord>, cancelled: bool) -> Self {
        let mut skipped_ids: Vec<String> = records
            .iter()
            .filter(|r| r.outcome == AttemptOutcome::Skipped)
            .map(|r| r.component_id.clone())
            .collect();
        skipped_ids.sort();
        skipped_ids.dedup();

        let overall_success = !cancelled
            && records
                .iter()
                .all(|r| r.outcome != AttemptOutcome::Skipped)
            && Self::final_outcomes_ok(&records);

        Self {
            batch_id: Uuid::new_v4(),
            records,
            overall_success,
            skipped_ids,
            cancelled,
        }
    }

    /// Per component, only the last record counts: a retried failure that
    /// eventually succeeded is a success
    fn final_outcomes_ok(records: &[OperationRecord]) -> bool {
        use std::collections::BTreeMap;
        let mut last: BTreeMap<&str, AttemptOutcome> = BTreeMap::new();
        for record in records {
            last.insert(&record.component_id, record.outcome);
        }
        last.values().all(|o| *o == AttemptOutcome::Success)
    }

    /// Records belonging to one component, in attempt order
    pub fn history(&self, component_id: &str) -> Vec<&OperationRecord> {
        self.records
            .iter()
            .filter(|r| r.component_id == component_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_lifecycle() {
        let record = OperationRecord::begin("git", 1).succeed("done");
        assert_eq!(record.outcome, AttemptOutcome::Success);
        assert!(record.ended_at.is_some());
        assert!(record.ended_at.unwrap() >= record.started_at);
    }

    #[test]
    fn test_failed_record_retryability_follows_kind() {
        let transient = OperationRecord::begin("a", 1)
            .fail(Some(InstallErrorKind::NetworkTransient), "flaky");
        assert!(transient.retryable);

        let fatal = OperationRecord::begin("a", 1)
            .fail(Some(InstallErrorKind::InsufficientPrivileges), "denied");
        assert!(!fatal.retryable);
    }

    #[test]
    fn test_skip_record_names_ancestor() {
        let record = OperationRecord::skipped("app", "runtime");
        assert_eq!(record.outcome, AttemptOutcome::Skipped);
        assert_eq!(record.skipped_due_to.as_deref(), Some("runtime"));
        assert_eq!(record.attempt_number, 0);
    }

    #[test]
    fn test_batch_success_after_retries() {
        let records = vec![
            OperationRecord::begin("a", 1)
                .fail(Some(InstallErrorKind::NetworkTransient), "try 1"),
            OperationRecord::begin("a", 2).succeed("try 2"),
        ];
        let result = BatchResult::new(records, false);
        assert!(result.overall_success);
        assert!(result.skipped_ids.is_empty());
    }

    #[test]
    fn test_batch_failure_with_skip() {
        let records = vec![
            OperationRecord::begin("a", 1)
                .fail(Some(InstallErrorKind::ConfigurationError), "broken"),
            OperationRecord::skipped("b", "a"),
        ];
        let result = BatchResult::new(records, false);
        assert!(!result.overall_success);
        assert_eq!(result.skipped_ids, vec!["b".to_string()]);
    }

    #[test]
    fn test_cancelled_batch_is_not_success() {
        let records = vec![OperationRecord::begin("a", 1).succeed("ok")];
        let result = BatchResult::new(records, true);
        assert!(!result.overall_success);
        assert!(result.cancelled);
    }

    #[test]
    fn test_history_filters_by_component() {
        let records = vec![
            OperationRecord::begin("a", 1).succeed("ok"),
            OperationRecord::begin("b", 1).succeed("ok"),
            OperationRecord::begin("a", 2).succeed("ok"),
        ];
        let result = BatchResult::new(records, false);
        assert_eq!(result.history("a").len(), 2);
        assert_eq!(result.history("b").len(), 1);
    }
}
