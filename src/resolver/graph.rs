// src/resolver/graph.rs

//! Dependency graph construction and algorithms
//!
//! Builds the transitive closure of a requested component set, detects all
//! dependency cycles in one pass, and computes longest-chain dependency
//! levels. All iteration is over sorted keys so repeated runs over the same
//! catalog produce identical output.

use crate::catalog::{Component, ComponentCatalog};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Dependency graph over the transitive closure of a request
#[derive(Debug)]
pub struct DependencyGraph {
    /// Map from component id to its descriptor
    nodes: BTreeMap<String, Arc<Component>>,
    /// Map from component id to its dependency ids (sorted)
    edges: BTreeMap<String, Vec<String>>,
    /// Map from component id to the ids that depend on it
    reverse_edges: BTreeMap<String, Vec<String>>,
    /// Nodes already present on the host; anchors that expand no edges
    satisfied: BTreeSet<String>,
}

impl DependencyGraph {
    /// Build the closure of `requested` against the catalog
    ///
    /// Satisfied components are retained as anchor nodes but their own
    /// dependencies are not expanded: what is already installed needs no
    /// further resolution. A dependency id absent from the catalog is a
    /// fatal configuration error naming every requirer.
    pub fn build(
        requested: &[String],
        catalog: &ComponentCatalog,
        satisfied: &BTreeSet<String>,
    ) -> Result<Self> {
        let mut graph = Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            reverse_edges: BTreeMap::new(),
            satisfied: BTreeSet::new(),
        };
        let mut missing: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut queue: VecDeque<String> = requested.iter().cloned().collect();

        while let Some(id) = queue.pop_front() {
            if graph.nodes.contains_key(&id) {
                continue;
            }
            let Some(component) = catalog.get(&id) else {
                // Requested directly; requirers recorded below for deps
                missing.entry(id).or_default();
                continue;
            };

            graph.nodes.insert(id.clone(), component.clone());
            if satisfied.contains(&id) {
                graph.satisfied.insert(id.clone());
                graph.edges.insert(id, Vec::new());
                continue;
            }

            let mut deps: Vec<String> = Vec::new();
            for dep_id in &component.dependency_ids {
                if !catalog.contains(dep_id) {
                    missing
                        .entry(dep_id.clone())
                        .or_default()
                        .insert(id.clone());
                    continue;
                }
                deps.push(dep_id.clone());
                graph
                    .reverse_edges
                    .entry(dep_id.clone())
                    .or_default()
                    .push(id.clone());
                queue.push_back(dep_id.clone());
            }
            deps.sort();
            graph.edges.insert(id, deps);
        }

        if let Some((id, required_by)) = missing.into_iter().next() {
            return Err(Error::MissingDependency {
                id,
                required_by: required_by.into_iter().collect(),
            });
        }

        debug!(
            "dependency graph: {} nodes ({} satisfied)",
            graph.nodes.len(),
            graph.satisfied.len()
        );
        Ok(graph)
    }

    pub fn node(&self, id: &str) -> Option<&Arc<Component>> {
        self.nodes.get(id)
    }

    pub fn is_satisfied(&self, id: &str) -> bool {
        self.satisfied.contains(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Dependency ids of a node (empty for satisfied anchors)
    pub fn dependencies(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Ids that directly depend on this node
    pub fn dependents(&self, id: &str) -> &[String] {
        self.reverse_edges
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Find every dependency cycle in one pass
    ///
    /// Three-color DFS; a back-edge to a gray node reconstructs the cycle
    /// from the active stack. The walk continues from remaining white nodes
    /// rather than aborting, so all cycles are reported together. Each
    /// cycle is normalized by rotating to its lexicographically smallest
    /// id, then the set is deduplicated and sorted.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut colors: BTreeMap<&str, Color> = self
            .nodes
            .keys()
            .map(|id| (id.as_str(), Color::White))
            .collect();
        let mut stack: Vec<String> = Vec::new();
        let mut cycles: BTreeSet<Vec<String>> = BTreeSet::new();

        for id in self.nodes.keys() {
            if colors[id.as_str()] == Color::White {
                self.dfs_collect(id, &mut colors, &mut stack, &mut cycles);
            }
        }

        cycles.into_iter().collect()
    }

    fn dfs_collect<'a>(
        &'a self,
        id: &'a str,
        colors: &mut BTreeMap<&'a str, Color>,
        stack: &mut Vec<String>,
        cycles: &mut BTreeSet<Vec<String>>,
    ) {
        colors.insert(id, Color::Gray);
        stack.push(id.to_string());

        for dep in self.dependencies(id) {
            match colors.get(dep.as_str()) {
                Some(Color::White) => {
                    let (key, _) = self.nodes.get_key_value(dep).expect("dep in graph");
                    self.dfs_collect(key, colors, stack, cycles);
                }
                Some(Color::Gray) => {
                    // Back-edge: the cycle is the stack slice from `dep`
                    if let Some(pos) = stack.iter().position(|s| s == dep) {
                        cycles.insert(normalize_cycle(&stack[pos..]));
                    }
                }
                _ => {}
            }
        }

        stack.pop();
        colors.insert(id, Color::Black);
    }

    /// Compute the dependency level of every node
    ///
    /// Kahn stripping: repeatedly remove nodes whose remaining dependencies
    /// are all resolved; a node's level is the strip iteration that removed
    /// it, which equals the longest dependency chain ending at it. Returns
    /// an error when cycles keep nodes from ever stripping (callers run
    /// `detect_cycles` first for the full report).
    pub fn levels(&self) -> Result<BTreeMap<String, usize>> {
        let mut remaining: BTreeMap<&str, usize> = self
            .nodes
            .keys()
            .map(|id| (id.as_str(), self.dependencies(id).len()))
            .collect();
        let mut levels: BTreeMap<String, usize> = BTreeMap::new();
        let mut level = 0usize;

        while levels.len() < self.nodes.len() {
            let ready: Vec<&str> = remaining
                .iter()
                .filter(|(id, count)| **count == 0 && !levels.contains_key(**id))
                .map(|(id, _)| *id)
                .collect();

            if ready.is_empty() {
                return Err(Error::DependencyCycle {
                    cycles: self.detect_cycles(),
                });
            }

            for id in ready {
                levels.insert(id.to_string(), level);
                for dependent in self.dependents(id) {
                    if let Some(count) = remaining.get_mut(dependent.as_str()) {
                        *count -= 1;
                    }
                }
            }
            level += 1;
        }

        Ok(levels)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Rotate a cycle so it starts at its lexicographically smallest id
///
/// The same cycle found from different entry points then reports
/// identically.
fn normalize_cycle(cycle: &[String]) -> Vec<String> {
    let Some(min_pos) = cycle
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };

    let mut rotated = Vec::with_capacity(cycle.len());
    rotated.extend_from_slice(&cycle[min_pos..]);
    rotated.extend_from_slice(&cycle[..min_pos]);
    rotated
}
