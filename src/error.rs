// src/error.rs

//! Error types for the loadout orchestrator
//!
//! Planning-phase problems (catalog, cycles, critical conflicts) surface as
//! `Err`; execution-phase failures never do — they are captured in
//! structured `OperationRecord`s inside the returned `BatchResult`.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed catalog entry or unloadable catalog file
    #[error("catalog error: {0}")]
    Catalog(String),

    /// A dependency id referenced by the catalog does not exist
    #[error("missing dependency '{id}' required by {}", format_requirers(.required_by))]
    MissingDependency {
        id: String,
        required_by: Vec<String>,
    },

    /// The dependency graph contains one or more cycles
    ///
    /// Each cycle is normalized to start at its lexicographically smallest
    /// component id, so the same cycle is always reported identically.
    #[error("dependency cycle(s): {}", format_cycles(.cycles))]
    DependencyCycle { cycles: Vec<Vec<String>> },

    /// The plan carries Critical conflict records and must not be executed
    #[error("{count} critical conflict(s) unresolved; drop a component and re-plan")]
    CriticalConflicts { count: usize },

    /// A detector probe failed
    #[error("detection error: {0}")]
    Detection(String),

    /// Invalid version or version constraint string
    #[error("version error: {0}")]
    Version(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_requirers(required_by: &[String]) -> String {
    if required_by.is_empty() {
        "the request".to_string()
    } else {
        required_by.join(", ")
    }
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|c| c.join(" -> "))
        .collect::<Vec<_>>()
        .join("; ")
}
