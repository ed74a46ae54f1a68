// src/detect/mod.rs

//! Host application detection
//!
//! Probes the host for already-present software and reports matches with a
//! confidence tier and version estimate. Detection results are ephemeral:
//! they are recomputed on every planning pass and never persisted.
//!
//! The `ApplicationDetector` trait is the seam; shipped implementations:
//! - `FilesystemDetector`: probes install paths and standard locations
//! - `StaticDetector`: preconfigured results, for tests and embedders

use crate::catalog::Component;
use crate::error::Result;
use crate::version::parse_version;
use semver::Version;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use strum_macros::Display;
use tracing::debug;
use walkdir::WalkDir;

/// How strongly a probe believes the component is present
///
/// Ordered strongest first; `tier()` gives the numeric rank used by the
/// prioritizer (lower = higher priority).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Confidence {
    /// Found at the component's own install path
    Installed,
    /// Near-miss name match in a probed location
    ProbableMatch,
    /// Exact name match in a standard location
    StandardLocation,
    /// Only a configuration marker was found
    CustomConfig,
}

impl Confidence {
    pub fn tier(&self) -> u8 {
        match self {
            Confidence::Installed => 1,
            Confidence::ProbableMatch => 2,
            Confidence::StandardLocation => 3,
            Confidence::CustomConfig => 4,
        }
    }
}

/// One probe result for a component
#[derive(Debug, Clone, Serialize)]
pub struct DetectedApplication {
    pub component_id: String,
    pub installed_version: Option<Version>,
    pub path_found: Option<PathBuf>,
    pub confidence: Confidence,
}

impl DetectedApplication {
    pub fn new(component_id: impl Into<String>, confidence: Confidence) -> Self {
        Self {
            component_id: component_id.into(),
            installed_version: None,
            path_found: None,
            confidence,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.installed_version = Some(version);
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path_found = Some(path.into());
        self
    }
}

/// Host introspection seam
pub trait ApplicationDetector: Send + Sync {
    /// Probe the host for traces of one component
    ///
    /// An empty vec means "not found"; errors are reserved for probe
    /// infrastructure failures (unreadable roots, not absence).
    fn probe(&self, component: &Component) -> Result<Vec<DetectedApplication>>;

    /// Human-readable name (for logging)
    fn name(&self) -> &str;
}

/// Detector backed by a fixed result table
///
/// Useful for tests and for embedding callers that already know the host
/// state from their own inventory.
#[derive(Debug, Default)]
pub struct StaticDetector {
    results: BTreeMap<String, Vec<DetectedApplication>>,
}

impl StaticDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detection(mut self, detection: DetectedApplication) -> Self {
        self.results
            .entry(detection.component_id.clone())
            .or_default()
            .push(detection);
        self
    }
}

impl ApplicationDetector for StaticDetector {
    fn probe(&self, component: &Component) -> Result<Vec<DetectedApplication>> {
        Ok(self.results.get(&component.id).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Detector that probes the filesystem
///
/// Probe order per component:
/// 1. The component's own `install_path` → Installed
/// 2. `<root>/<id>` for each probe root → StandardLocation
/// 3. Case-insensitive directory name match under a root → ProbableMatch
/// 4. `<root>/<id>.conf` marker file → CustomConfig
///
/// A `.version` file inside a found directory supplies the version estimate.
pub struct FilesystemDetector {
    roots: Vec<PathBuf>,
}

impl FilesystemDetector {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Probe roots for a typical Unix host
    pub fn with_default_roots() -> Self {
        let mut roots = vec![PathBuf::from("/opt"), PathBuf::from("/usr/local")];
        if let Some(home) = dirs::home_dir() {
            roots.push(home.join(".local"));
        }
        Self::new(roots)
    }

    fn read_version_marker(dir: &Path) -> Option<Version> {
        let text = std::fs::read_to_string(dir.join(".version")).ok()?;
        parse_version(text.trim()).ok()
    }
}

impl ApplicationDetector for FilesystemDetector {
    fn probe(&self, component: &Component) -> Result<Vec<DetectedApplication>> {
        let mut found = Vec::new();
        let id_lower = component.id.to_lowercase();

        if let Some(install_path) = &component.install_path
            && install_path.is_dir()
        {
            let mut detection =
                DetectedApplication::new(&component.id, Confidence::Installed)
                    .with_path(install_path.clone());
            if let Some(version) = Self::read_version_marker(install_path) {
                detection = detection.with_version(version);
            }
            found.push(detection);
        }

        for root in &self.roots {
            if !root.is_dir() {
                continue;
            }

            let exact = root.join(&component.id);
            if exact.is_dir() {
                let mut detection =
                    DetectedApplication::new(&component.id, Confidence::StandardLocation)
                        .with_path(exact.clone());
                if let Some(version) = Self::read_version_marker(&exact) {
                    detection = detection.with_version(version);
                }
                found.push(detection);
            } else {
                // Case-insensitive scan of the root's direct children
                for entry in WalkDir::new(root)
                    .min_depth(1)
                    .max_depth(1)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_dir())
                {
                    let name = entry.file_name().to_string_lossy().to_lowercase();
                    if name == id_lower {
                        let mut detection =
                            DetectedApplication::new(&component.id, Confidence::ProbableMatch)
                                .with_path(entry.path().to_path_buf());
                        if let Some(version) = Self::read_version_marker(entry.path()) {
                            detection = detection.with_version(version);
                        }
                        found.push(detection);
                    }
                }
            }

            let marker = root.join(format!("{}.conf", component.id));
            if marker.is_file() {
                found.push(
                    DetectedApplication::new(&component.id, Confidence::CustomConfig)
                        .with_path(marker),
                );
            }
        }

        debug!(
            "probe '{}' found {} candidate(s)",
            component.id,
            found.len()
        );
        Ok(found)
    }

    fn name(&self) -> &str {
        "filesystem"
    }
}
