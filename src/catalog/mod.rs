// src/catalog/mod.rs

//! Component catalog
//!
//! The catalog is the static description of installable units: ids,
//! version constraints, dependencies, declared conflicts, and the install
//! action. It is consumed by the orchestrator, never mutated by it.
//!
//! Catalogs can be built in-process or loaded from a TOML file:
//!
//! ```toml
//! [[component]]
//! id = "vcredist-2022"
//! name = "Visual C++ Redistributable 2022"
//! version = ">=14.30"
//! dependencies = []
//! conflicts = []
//! install_path = "/opt/vcredist"
//! allow_parallel = true
//! command = ["/usr/bin/true"]
//! ```

use crate::action::{CommandAction, InstallAction, NoopAction};
use crate::error::{Error, Result};
use crate::version::VersionConstraint;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Immutable descriptor of one installable unit
#[derive(Clone)]
pub struct Component {
    pub id: String,
    pub display_name: String,
    pub constraint: VersionConstraint,
    pub dependency_ids: BTreeSet<String>,
    /// Symmetric: a conflict declared on either side applies to both
    pub declared_conflict_ids: BTreeSet<String>,
    /// Normalized path-prefix the install will occupy, when known
    pub install_path: Option<PathBuf>,
    pub allow_parallel: bool,
    pub action: Arc<dyn InstallAction>,
}

impl Component {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            constraint: VersionConstraint::Any,
            dependency_ids: BTreeSet::new(),
            declared_conflict_ids: BTreeSet::new(),
            install_path: None,
            allow_parallel: true,
            action: Arc::new(NoopAction),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_constraint(mut self, constraint: VersionConstraint) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependency_ids = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_conflicts<I, S>(mut self, conflicts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared_conflict_ids = conflicts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_install_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.install_path = Some(normalize_path(&path.into()));
        self
    }

    pub fn sequential(mut self) -> Self {
        self.allow_parallel = false;
        self
    }

    pub fn with_action(mut self, action: Arc<dyn InstallAction>) -> Self {
        self.action = action;
        self
    }

    /// Base name used for version-clash grouping: lowercased id with
    /// trailing version-suffix tokens stripped ("Python-3.11" → "python")
    pub fn base_name(&self) -> String {
        normalize_base_name(&self.id)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("constraint", &self.constraint)
            .field("dependency_ids", &self.dependency_ids)
            .field("declared_conflict_ids", &self.declared_conflict_ids)
            .field("install_path", &self.install_path)
            .field("allow_parallel", &self.allow_parallel)
            .field("action", &self.action.name())
            .finish()
    }
}

/// Strip redundant components from a path without touching the filesystem
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Lowercase an id and drop trailing tokens that look like version suffixes
pub(crate) fn normalize_base_name(id: &str) -> String {
    let lowered = id.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(['-', '_', ' '])
        .filter(|t| !t.is_empty())
        .collect();

    let mut end = tokens.len();
    while end > 1 && is_version_token(tokens[end - 1]) {
        end -= 1;
    }

    tokens[..end].join("-")
}

fn is_version_token(token: &str) -> bool {
    let t = token.strip_prefix('v').unwrap_or(token);
    !t.is_empty() && t.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// The full set of installable components, keyed by id
#[derive(Debug, Default)]
pub struct ComponentCatalog {
    components: BTreeMap<String, Arc<Component>>,
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from in-process components
    ///
    /// Duplicate ids are a configuration error.
    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Result<Self> {
        let mut catalog = Self::new();
        for component in components {
            catalog.insert(component)?;
        }
        Ok(catalog)
    }

    /// Load a catalog from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Catalog(format!("cannot read {}: {}", path.display(), e)))?;
        let catalog = Self::parse_toml(&text)?;
        debug!(
            "loaded catalog from {} ({} components)",
            path.display(),
            catalog.len()
        );
        Ok(catalog)
    }

    /// Parse catalog TOML text
    pub fn parse_toml(text: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(text)
            .map_err(|e| Error::Catalog(format!("invalid catalog: {}", e)))?;

        let mut catalog = Self::new();
        for entry in file.component {
            catalog.insert(entry.into_component()?)?;
        }
        Ok(catalog)
    }

    fn insert(&mut self, component: Component) -> Result<()> {
        if component.id.is_empty() {
            return Err(Error::Catalog("component with empty id".to_string()));
        }
        if self.components.contains_key(&component.id) {
            return Err(Error::Catalog(format!(
                "duplicate component id '{}'",
                component.id
            )));
        }
        self.components
            .insert(component.id.clone(), Arc::new(component));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Component>> {
        self.components.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    /// Component ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn components(&self) -> impl Iterator<Item = &Arc<Component>> {
        self.components.values()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Top-level catalog file structure
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    component: Vec<ComponentEntry>,
}

/// One `[[component]]` table in the catalog file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ComponentEntry {
    id: String,
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    conflicts: Vec<String>,
    install_path: Option<PathBuf>,
    allow_parallel: Option<bool>,
    command: Option<Vec<String>>,
    timeout_secs: Option<u64>,
}

impl ComponentEntry {
    fn into_component(self) -> Result<Component> {
        let constraint = match &self.version {
            Some(v) => VersionConstraint::parse(v)
                .map_err(|e| Error::Catalog(format!("component '{}': {}", self.id, e)))?,
            None => VersionConstraint::Any,
        };

        let action: Arc<dyn InstallAction> = match self.command {
            Some(argv) => {
                let mut action = CommandAction::new(argv);
                if let Some(secs) = self.timeout_secs {
                    action = action.with_timeout(Duration::from_secs(secs));
                }
                Arc::new(action)
            }
            None => Arc::new(NoopAction),
        };

        let mut component = Component::new(self.id)
            .with_constraint(constraint)
            .with_dependencies(self.dependencies)
            .with_conflicts(self.conflicts)
            .with_action(action);
        if let Some(name) = self.name {
            component = component.with_display_name(name);
        }
        if let Some(path) = self.install_path {
            component = component.with_install_path(path);
        }
        if self.allow_parallel == Some(false) {
            component = component.sequential();
        }
        Ok(component)
    }
}
