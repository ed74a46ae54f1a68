// src/lib.rs

//! Loadout installation orchestrator
//!
//! Dependency-aware, parallel, conflict-resolving batch installation,
//! fed by hierarchical detection of software already present on the host.
//!
//! # Architecture
//!
//! - Catalog-first: components are immutable descriptors consumed from a
//!   TOML catalog or built in-process
//! - Detection feeds planning: already-satisfied components stay in the
//!   graph as anchors but are never executed
//! - Level-ordered execution: strict barriers between dependency levels,
//!   bounded parallelism within them
//! - Structured failure: every attempt is an `OperationRecord`; execution
//!   errors never escape as exceptions

pub mod action;
pub mod catalog;
pub mod detect;
mod error;
pub mod orchestrator;
pub mod priority;
pub mod progress;
pub mod record;
pub mod resolver;
pub mod scheduler;
pub mod version;

pub use action::{CommandAction, InstallAction, InstallContext, InstallErrorKind, InstallOutcome, NoopAction};
pub use catalog::{Component, ComponentCatalog};
pub use detect::{ApplicationDetector, Confidence, DetectedApplication, FilesystemDetector, StaticDetector};
pub use error::{Error, Result};
pub use orchestrator::{ExecuteRequest, Orchestrator, PlanRequest, PlanResult};
pub use priority::{HierarchicalPrioritizer, PriorityResult, PriorityScore, RankedCandidate};
pub use progress::{CliProgress, LogProgress, ProgressTracker, SilentProgress};
pub use record::{AttemptOutcome, BatchResult, OperationRecord};
pub use resolver::{
    ConflictDetector, ConflictKind, ConflictRecord, DependencyGraph, InstallationPlan, PlanNode,
    Resolver, Severity,
};
pub use scheduler::{ParallelExecutionScheduler, RecoveryController, MAX_ATTEMPTS};
pub use version::{parse_version, CompatibilityLevel, VersionConstraint};
