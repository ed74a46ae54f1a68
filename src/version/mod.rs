// src/version/mod.rs

//! Version handling and constraint satisfaction for components
//!
//! Provides lenient version parsing (partial versions fill missing parts
//! with zero), constraint parsing and satisfaction, and the compatibility
//! classification used by the prioritizer.

use crate::error::{Error, Result};
use semver::Version;
use serde::Serialize;
use std::fmt;

/// Parse a version string, tolerating partial forms
///
/// Examples:
/// - "1.2.3" → 1.2.3
/// - "1.2" → 1.2.0
/// - "14" → 14.0.0
pub fn parse_version(s: &str) -> Result<Version> {
    let s = s.trim();
    if let Ok(v) = Version::parse(s) {
        return Ok(v);
    }

    let parts: Vec<&str> = s.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(Error::Version(format!("invalid version '{}'", s)));
    }

    let mut nums = [0u64; 3];
    for (i, part) in parts.iter().enumerate() {
        nums[i] = part
            .parse::<u64>()
            .map_err(|e| Error::Version(format!("invalid version '{}': {}", s, e)))?;
    }

    Ok(Version::new(nums[0], nums[1], nums[2]))
}

/// Version constraint operators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// Any version is acceptable
    Any,
    /// Exact version match
    Exact(Version),
    /// Greater than
    GreaterThan(Version),
    /// Greater than or equal
    GreaterOrEqual(Version),
    /// Less than
    LessThan(Version),
    /// Less than or equal
    LessOrEqual(Version),
    /// Caret range: same major (or same minor below 1.0), at least this version
    Compatible(Version),
    /// Both constraints must be satisfied (for ranges like ">= 1.0, < 2.0")
    And(Box<VersionConstraint>, Box<VersionConstraint>),
}

impl VersionConstraint {
    /// Parse a version constraint string
    ///
    /// Examples:
    /// - "*" or "" → Any
    /// - "1.2.3" or "= 1.2.3" → Exact(1.2.3)
    /// - ">= 1.2" → GreaterOrEqual(1.2.0)
    /// - "^1.4" → Compatible(1.4.0)
    /// - ">= 1.0, < 2.0" → And(GreaterOrEqual, LessThan)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s == "*" {
            return Ok(VersionConstraint::Any);
        }

        if s.contains(',') {
            let parts: Vec<&str> = s.split(',').map(|p| p.trim()).collect();
            if parts.len() == 2 {
                let left = Self::parse(parts[0])?;
                let right = Self::parse(parts[1])?;
                return Ok(VersionConstraint::And(Box::new(left), Box::new(right)));
            }
            return Err(Error::Version(format!("invalid constraint '{}'", s)));
        }

        if let Some(rest) = s.strip_prefix(">=") {
            Ok(VersionConstraint::GreaterOrEqual(parse_version(rest)?))
        } else if let Some(rest) = s.strip_prefix("<=") {
            Ok(VersionConstraint::LessOrEqual(parse_version(rest)?))
        } else if let Some(rest) = s.strip_prefix('>') {
            Ok(VersionConstraint::GreaterThan(parse_version(rest)?))
        } else if let Some(rest) = s.strip_prefix('<') {
            Ok(VersionConstraint::LessThan(parse_version(rest)?))
        } else if let Some(rest) = s.strip_prefix('^') {
            Ok(VersionConstraint::Compatible(parse_version(rest)?))
        } else if let Some(rest) = s.strip_prefix('=') {
            Ok(VersionConstraint::Exact(parse_version(rest)?))
        } else {
            Ok(VersionConstraint::Exact(parse_version(s)?))
        }
    }

    /// Check if a version satisfies this constraint
    pub fn satisfies(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::Any => true,
            VersionConstraint::Exact(v) => version == v,
            VersionConstraint::GreaterThan(v) => version > v,
            VersionConstraint::GreaterOrEqual(v) => version >= v,
            VersionConstraint::LessThan(v) => version < v,
            VersionConstraint::LessOrEqual(v) => version <= v,
            VersionConstraint::Compatible(v) => version >= v && version < &caret_upper(v),
            VersionConstraint::And(left, right) => {
                left.satisfies(version) && right.satisfies(version)
            }
        }
    }

    /// Lower-bound version implied by this constraint, if any
    ///
    /// Used to derive a required version for the prioritizer when the
    /// caller does not pin one explicitly.
    pub fn minimum(&self) -> Option<Version> {
        match self {
            VersionConstraint::Exact(v)
            | VersionConstraint::GreaterThan(v)
            | VersionConstraint::GreaterOrEqual(v)
            | VersionConstraint::Compatible(v) => Some(v.clone()),
            VersionConstraint::And(left, right) => {
                left.minimum().or_else(|| right.minimum())
            }
            _ => None,
        }
    }

    /// Check if two constraints admit at least one common version
    ///
    /// Each constraint is reduced to an interval on the version line; the
    /// constraints are compatible when the intervals intersect.
    pub fn is_compatible_with(&self, other: &VersionConstraint) -> bool {
        self.as_range().intersects(&other.as_range())
    }

    fn as_range(&self) -> VersionRange {
        match self {
            VersionConstraint::Any => VersionRange::unbounded(),
            VersionConstraint::Exact(v) => VersionRange {
                lower: Some((v.clone(), true)),
                upper: Some((v.clone(), true)),
            },
            VersionConstraint::GreaterThan(v) => VersionRange {
                lower: Some((v.clone(), false)),
                upper: None,
            },
            VersionConstraint::GreaterOrEqual(v) => VersionRange {
                lower: Some((v.clone(), true)),
                upper: None,
            },
            VersionConstraint::LessThan(v) => VersionRange {
                lower: None,
                upper: Some((v.clone(), false)),
            },
            VersionConstraint::LessOrEqual(v) => VersionRange {
                lower: None,
                upper: Some((v.clone(), true)),
            },
            VersionConstraint::Compatible(v) => VersionRange {
                lower: Some((v.clone(), true)),
                upper: Some((caret_upper(v), false)),
            },
            VersionConstraint::And(left, right) => {
                left.as_range().intersect(&right.as_range())
            }
        }
    }
}

/// Exclusive upper bound for a caret constraint
fn caret_upper(v: &Version) -> Version {
    if v.major > 0 {
        Version::new(v.major + 1, 0, 0)
    } else if v.minor > 0 {
        Version::new(0, v.minor + 1, 0)
    } else {
        Version::new(0, 0, v.patch + 1)
    }
}

/// An interval over versions; bounds carry an inclusive flag
#[derive(Debug, Clone)]
struct VersionRange {
    lower: Option<(Version, bool)>,
    upper: Option<(Version, bool)>,
}

impl VersionRange {
    fn unbounded() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    fn intersect(&self, other: &VersionRange) -> VersionRange {
        let lower = match (&self.lower, &other.lower) {
            (Some((a, ai)), Some((b, bi))) => {
                if a > b {
                    Some((a.clone(), *ai))
                } else if b > a {
                    Some((b.clone(), *bi))
                } else {
                    Some((a.clone(), *ai && *bi))
                }
            }
            (Some(l), None) | (None, Some(l)) => Some(l.clone()),
            (None, None) => None,
        };
        let upper = match (&self.upper, &other.upper) {
            (Some((a, ai)), Some((b, bi))) => {
                if a < b {
                    Some((a.clone(), *ai))
                } else if b < a {
                    Some((b.clone(), *bi))
                } else {
                    Some((a.clone(), *ai && *bi))
                }
            }
            (Some(u), None) | (None, Some(u)) => Some(u.clone()),
            (None, None) => None,
        };
        VersionRange { lower, upper }
    }

    fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some((lo, lo_inc)), Some((hi, hi_inc))) => {
                lo > hi || (lo == hi && !(*lo_inc && *hi_inc))
            }
            _ => false,
        }
    }

    fn intersects(&self, other: &VersionRange) -> bool {
        !self.intersect(other).is_empty()
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Any => write!(f, "*"),
            VersionConstraint::Exact(v) => write!(f, "= {}", v),
            VersionConstraint::GreaterThan(v) => write!(f, "> {}", v),
            VersionConstraint::GreaterOrEqual(v) => write!(f, ">= {}", v),
            VersionConstraint::LessThan(v) => write!(f, "< {}", v),
            VersionConstraint::LessOrEqual(v) => write!(f, "<= {}", v),
            VersionConstraint::Compatible(v) => write!(f, "^{}", v),
            VersionConstraint::And(left, right) => write!(f, "{}, {}", left, right),
        }
    }
}

/// How an installed version relates to a required version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompatibilityLevel {
    /// Exact match
    Perfect,
    /// Same major, installed minor at least the required minor
    Compatible,
    /// Off by one major, or same major with a lower minor
    Outdated,
    /// More than one major apart, or nothing usable detected
    Incompatible,
}

impl CompatibilityLevel {
    /// Classify an installed version against a required one
    ///
    /// `installed_authoritative` marks a candidate whose presence was
    /// positively confirmed (Installed confidence); such a candidate with no
    /// version information still counts Compatible, anything weaker without
    /// a version is Incompatible. With no required version at all, any
    /// candidate that produced a version counts Compatible.
    pub fn classify(
        installed: Option<&Version>,
        required: Option<&Version>,
        installed_authoritative: bool,
    ) -> Self {
        let Some(installed) = installed else {
            return if installed_authoritative {
                CompatibilityLevel::Compatible
            } else {
                CompatibilityLevel::Incompatible
            };
        };

        let Some(required) = required else {
            return CompatibilityLevel::Compatible;
        };

        if installed == required {
            return CompatibilityLevel::Perfect;
        }

        if installed.major == required.major {
            if installed.minor >= required.minor {
                CompatibilityLevel::Compatible
            } else {
                CompatibilityLevel::Outdated
            }
        } else if installed.major.abs_diff(required.major) == 1 {
            CompatibilityLevel::Outdated
        } else {
            CompatibilityLevel::Incompatible
        }
    }
}

impl fmt::Display for CompatibilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompatibilityLevel::Perfect => "perfect",
            CompatibilityLevel::Compatible => "compatible",
            CompatibilityLevel::Outdated => "outdated",
            CompatibilityLevel::Incompatible => "incompatible",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_partial() {
        assert_eq!(parse_version("1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(parse_version("14").unwrap(), Version::new(14, 0, 0));
        assert_eq!(parse_version("1.2.3").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn test_parse_version_invalid() {
        assert!(parse_version("abc").is_err());
        assert!(parse_version("1.2.3.4").is_err());
    }

    #[test]
    fn test_constraint_parse_exact() {
        let c = VersionConstraint::parse("1.2.3").unwrap();
        assert!(c.satisfies(&Version::new(1, 2, 3)));
        assert!(!c.satisfies(&Version::new(1, 2, 4)));
    }

    #[test]
    fn test_constraint_parse_greater_or_equal() {
        let c = VersionConstraint::parse(">= 1.2").unwrap();
        assert!(c.satisfies(&Version::new(1, 2, 0)));
        assert!(c.satisfies(&Version::new(2, 0, 0)));
        assert!(!c.satisfies(&Version::new(1, 1, 9)));
    }

    #[test]
    fn test_constraint_parse_caret() {
        let c = VersionConstraint::parse("^1.4").unwrap();
        assert!(c.satisfies(&Version::new(1, 9, 0)));
        assert!(!c.satisfies(&Version::new(2, 0, 0)));
        assert!(!c.satisfies(&Version::new(1, 3, 0)));
    }

    #[test]
    fn test_constraint_parse_range() {
        let c = VersionConstraint::parse(">= 1.0, < 2.0").unwrap();
        assert!(c.satisfies(&Version::new(1, 5, 0)));
        assert!(!c.satisfies(&Version::new(2, 0, 0)));
        assert!(!c.satisfies(&Version::new(0, 9, 0)));
    }

    #[test]
    fn test_constraint_any() {
        let c = VersionConstraint::parse("*").unwrap();
        assert!(c.satisfies(&Version::new(99, 99, 99)));
    }

    #[test]
    fn test_constraint_display_roundtrip() {
        for s in [">= 1.2.0", "< 2.0.0", "^1.4.0", "= 1.5.0", "*"] {
            let c = VersionConstraint::parse(s).unwrap();
            assert_eq!(VersionConstraint::parse(&c.to_string()).unwrap(), c);
        }
    }

    #[test]
    fn test_compatible_ranges_overlap() {
        let a = VersionConstraint::parse(">= 1.0, < 2.0").unwrap();
        let b = VersionConstraint::parse(">= 1.5").unwrap();
        assert!(a.is_compatible_with(&b));
        assert!(b.is_compatible_with(&a));
    }

    #[test]
    fn test_incompatible_disjoint_ranges() {
        let a = VersionConstraint::parse("< 2.0").unwrap();
        let b = VersionConstraint::parse(">= 2.0").unwrap();
        assert!(!a.is_compatible_with(&b));
    }

    #[test]
    fn test_incompatible_exact_versions() {
        let a = VersionConstraint::parse("= 1.2.3").unwrap();
        let b = VersionConstraint::parse("= 2.0.0").unwrap();
        assert!(!a.is_compatible_with(&b));
        assert!(a.is_compatible_with(&a.clone()));
    }

    #[test]
    fn test_caret_vs_caret_disjoint() {
        let a = VersionConstraint::parse("^1.0").unwrap();
        let b = VersionConstraint::parse("^2.0").unwrap();
        assert!(!a.is_compatible_with(&b));
    }

    #[test]
    fn test_classify_perfect_and_compatible() {
        let installed = Version::new(3, 11, 0);
        assert_eq!(
            CompatibilityLevel::classify(Some(&installed), Some(&Version::new(3, 11, 0)), true),
            CompatibilityLevel::Perfect
        );
        assert_eq!(
            CompatibilityLevel::classify(Some(&installed), Some(&Version::new(3, 9, 0)), true),
            CompatibilityLevel::Compatible
        );
    }

    #[test]
    fn test_classify_outdated() {
        // Same major, lower minor
        assert_eq!(
            CompatibilityLevel::classify(
                Some(&Version::new(3, 8, 0)),
                Some(&Version::new(3, 11, 0)),
                true
            ),
            CompatibilityLevel::Outdated
        );
        // Off by one major
        assert_eq!(
            CompatibilityLevel::classify(
                Some(&Version::new(2, 9, 0)),
                Some(&Version::new(3, 0, 0)),
                true
            ),
            CompatibilityLevel::Outdated
        );
    }

    #[test]
    fn test_classify_incompatible() {
        assert_eq!(
            CompatibilityLevel::classify(
                Some(&Version::new(1, 0, 0)),
                Some(&Version::new(3, 0, 0)),
                true
            ),
            CompatibilityLevel::Incompatible
        );
        // No version info, weaker than Installed confidence
        assert_eq!(
            CompatibilityLevel::classify(None, Some(&Version::new(1, 0, 0)), false),
            CompatibilityLevel::Incompatible
        );
    }

    #[test]
    fn test_classify_no_version_info_authoritative() {
        assert_eq!(
            CompatibilityLevel::classify(None, Some(&Version::new(1, 0, 0)), true),
            CompatibilityLevel::Compatible
        );
    }
}
