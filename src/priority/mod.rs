// src/priority/mod.rs

//! Hierarchical prioritization of detection results
//!
//! Ranks a component's detection candidates by confidence tier and version
//! compatibility, then picks the authoritative "already satisfied" verdict.
//! The full ranked list is returned alongside the recommendation so callers
//! can render the decision without re-deriving it.

use crate::detect::{Confidence, DetectedApplication};
use crate::version::CompatibilityLevel;
use semver::Version;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// Score breakdown for one candidate, total clamped to [0, 1]
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PriorityScore {
    pub base_score: f64,
    pub compatibility_bonus: f64,
    pub location_bonus: f64,
    pub config_bonus: f64,
    pub total: f64,
}

impl PriorityScore {
    fn compute(detection: &DetectedApplication, compatibility: CompatibilityLevel) -> Self {
        let base_score: f64 = match detection.confidence.tier() {
            1 => 0.9,
            2 => 0.7,
            3 => 0.5,
            _ => 0.3,
        };

        let compatibility_bonus = match compatibility {
            CompatibilityLevel::Perfect => 0.10,
            CompatibilityLevel::Compatible => 0.05,
            CompatibilityLevel::Outdated => 0.0,
            CompatibilityLevel::Incompatible => -0.2,
        };

        let location_bonus = if detection.path_found.is_some() {
            0.05
        } else {
            0.0
        };
        let config_bonus = if detection.confidence == Confidence::CustomConfig {
            0.03
        } else {
            0.0
        };

        // The incompatibility penalty cannot push the tier score below zero
        let total = ((base_score + compatibility_bonus).max(0.0) + location_bonus + config_bonus)
            .clamp(0.0, 1.0);

        Self {
            base_score,
            compatibility_bonus,
            location_bonus,
            config_bonus,
            total,
        }
    }
}

/// One candidate with its computed compatibility and score
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub detection: DetectedApplication,
    pub compatibility: CompatibilityLevel,
    pub score: PriorityScore,
}

/// Outcome of prioritizing one component's candidates
#[derive(Debug, Clone, Serialize)]
pub struct PriorityResult {
    pub component_id: String,
    /// All candidates, best first; ties broken by tier then detection order
    pub ranked: Vec<RankedCandidate>,
    /// Index 0 of `ranked`, when any candidate exists
    pub recommended: Option<RankedCandidate>,
}

impl PriorityResult {
    /// Whether the component is already satisfied on the host
    ///
    /// True when the recommended candidate is Perfect or Compatible; such a
    /// component is excluded from execution but stays in the dependency
    /// graph as a satisfied node.
    pub fn is_satisfied(&self) -> bool {
        self.recommended.as_ref().is_some_and(|r| {
            matches!(
                r.compatibility,
                CompatibilityLevel::Perfect | CompatibilityLevel::Compatible
            )
        })
    }
}

/// Ranks detection candidates and picks the authoritative verdict
pub struct HierarchicalPrioritizer;

impl HierarchicalPrioritizer {
    /// Rank `candidates` for a component against a required version
    ///
    /// Candidates keep their probe order as the final tie-break, so the
    /// result is deterministic for a given detector output.
    pub fn prioritize(
        component_id: &str,
        candidates: Vec<DetectedApplication>,
        required: Option<&Version>,
    ) -> PriorityResult {
        let mut ranked: Vec<RankedCandidate> = candidates
            .into_iter()
            .map(|detection| {
                let authoritative = detection.confidence == Confidence::Installed;
                let compatibility = CompatibilityLevel::classify(
                    detection.installed_version.as_ref(),
                    required,
                    authoritative,
                );
                let score = PriorityScore::compute(&detection, compatibility);
                RankedCandidate {
                    detection,
                    compatibility,
                    score,
                }
            })
            .collect();

        // Stable sort: equal (total, tier) pairs keep earliest-detected order
        ranked.sort_by(|a, b| {
            b.score
                .total
                .partial_cmp(&a.score.total)
                .unwrap_or(Ordering::Equal)
                .then(a.detection.confidence.tier().cmp(&b.detection.confidence.tier()))
        });

        let recommended = ranked.first().cloned();
        if let Some(best) = &recommended {
            debug!(
                "prioritized '{}': best {} ({}, score {:.2})",
                component_id, best.detection.confidence, best.compatibility, best.score.total
            );
        }

        PriorityResult {
            component_id: component_id.to_string(),
            ranked,
            recommended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(confidence: Confidence, version: Option<Version>) -> DetectedApplication {
        let mut d = DetectedApplication::new("app", confidence);
        if let Some(v) = version {
            d = d.with_version(v);
        }
        d
    }

    #[test]
    fn test_empty_candidates_not_satisfied() {
        let result = HierarchicalPrioritizer::prioritize("app", vec![], None);
        assert!(result.ranked.is_empty());
        assert!(result.recommended.is_none());
        assert!(!result.is_satisfied());
    }

    #[test]
    fn test_installed_tier_outranks_standard_location() {
        let required = Version::new(1, 0, 0);
        let result = HierarchicalPrioritizer::prioritize(
            "app",
            vec![
                candidate(Confidence::StandardLocation, Some(Version::new(1, 0, 0))),
                candidate(Confidence::Installed, Some(Version::new(1, 0, 0))),
            ],
            Some(&required),
        );
        let best = result.recommended.as_ref().unwrap();
        assert_eq!(best.detection.confidence, Confidence::Installed);
        assert!(result.is_satisfied());
    }

    #[test]
    fn test_perfect_match_scoring() {
        let required = Version::new(2, 1, 0);
        let result = HierarchicalPrioritizer::prioritize(
            "app",
            vec![candidate(Confidence::Installed, Some(Version::new(2, 1, 0)))
                .with_path("/opt/app")],
            Some(&required),
        );
        let best = result.recommended.unwrap();
        assert_eq!(best.compatibility, CompatibilityLevel::Perfect);
        // 0.9 base + 0.10 perfect + 0.05 location, clamped to 1.0
        assert!((best.score.total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_incompatible_penalty_does_not_go_negative() {
        let required = Version::new(9, 0, 0);
        let result = HierarchicalPrioritizer::prioritize(
            "app",
            vec![candidate(Confidence::CustomConfig, Some(Version::new(1, 0, 0)))],
            Some(&required),
        );
        let best = result.recommended.as_ref().unwrap();
        assert_eq!(best.compatibility, CompatibilityLevel::Incompatible);
        // (0.3 - 0.2 -> 0.1) + 0.03 config bonus, no path so no location bonus
        assert!((best.score.total - 0.13).abs() < 1e-9);
        assert!(!result.is_satisfied());
    }

    #[test]
    fn test_outdated_not_satisfied() {
        let required = Version::new(3, 11, 0);
        let result = HierarchicalPrioritizer::prioritize(
            "app",
            vec![candidate(Confidence::Installed, Some(Version::new(3, 8, 0)))],
            Some(&required),
        );
        assert_eq!(
            result.recommended.as_ref().unwrap().compatibility,
            CompatibilityLevel::Outdated
        );
        assert!(!result.is_satisfied());
    }

    #[test]
    fn test_tie_breaks_by_detection_order() {
        // Two identical candidates: the one probed first must win
        let required = Version::new(1, 0, 0);
        let first = candidate(Confidence::StandardLocation, Some(Version::new(1, 0, 0)))
            .with_path("/opt/first");
        let second = candidate(Confidence::StandardLocation, Some(Version::new(1, 0, 0)))
            .with_path("/opt/second");
        let result = HierarchicalPrioritizer::prioritize(
            "app",
            vec![first, second],
            Some(&required),
        );
        assert_eq!(
            result.recommended.unwrap().detection.path_found,
            Some("/opt/first".into())
        );
    }

    #[test]
    fn test_compatible_newer_minor_satisfies() {
        let required = Version::new(2, 4, 0);
        let result = HierarchicalPrioritizer::prioritize(
            "app",
            vec![candidate(Confidence::Installed, Some(Version::new(2, 7, 1)))],
            Some(&required),
        );
        assert!(result.is_satisfied());
    }

    #[test]
    fn test_no_required_version_any_versioned_candidate_satisfies() {
        let result = HierarchicalPrioritizer::prioritize(
            "app",
            vec![candidate(Confidence::StandardLocation, Some(Version::new(0, 3, 0)))],
            None,
        );
        assert!(result.is_satisfied());
    }
}
