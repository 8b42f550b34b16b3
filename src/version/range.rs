//! npm range expressions used by advisories (`vulnerable_versions`)
//!
//! Supports:
//! - `1.2.3`, `=1.2.3`, `v1.2.3` - exact match
//! - `^1.2.3` - compatible with version (>=1.2.3 <2.0.0)
//! - `~1.2.3` - approximately equivalent (>=1.2.3 <1.3.0)
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3` - comparison operators
//! - `1.2.x`, `1.x`, `1.2`, `1`, `*`, empty - wildcards
//! - `1.0.0 - 2.0.0` - hyphen ranges
//! - space separated comparators (AND) and `||` alternatives (OR)
//!
//! Every form is expanded into primitive comparators the way npm desugars
//! them. Missing components widen the range: `<=1.2` is `<1.3.0`, `~1` is
//! `>=1.0.0 <2.0.0` and the upper end of `1.0.0 - 2.3` is `<2.4.0`.
//!
//! Pre-release versions only satisfy a comparator set that mentions a
//! pre-release on the same `major.minor.patch`, as npm does.

use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

/// Whitespace between an operator and its version: `>= 1.2.3`
static OPERATOR_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(<=|>=|~>|<|>|=|\^|~)\s+").expect("valid operator regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid range expression: {0}")]
pub struct RangeError(pub String);

/// Parsed range: a version satisfies it when any comparator set matches
#[derive(Debug, Clone)]
pub struct VersionRange {
    sets: Vec<ComparatorSet>,
}

/// Comparators joined by AND; an empty set matches every release
#[derive(Debug, Clone)]
struct ComparatorSet {
    comparators: Vec<Comparator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone)]
enum Comparator {
    Bound(Op, Version),
    /// `<*` and `>*` match no version at all
    Nothing,
}

/// Version as written in a range, with absent or wildcard components as `None`
#[derive(Debug, Clone)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    /// Set when all three components are present, pre-release included
    full: Option<Version>,
}

impl VersionRange {
    /// Parse an npm range expression
    pub fn parse(expr: &str) -> Result<Self, RangeError> {
        let invalid = || RangeError(expr.to_string());

        let sets = expr
            .split("||")
            .map(|part| ComparatorSet::parse(part).ok_or_else(invalid))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { sets })
    }

    /// Check if a version satisfies this range
    pub fn satisfies(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set.satisfies(version))
    }
}

impl ComparatorSet {
    fn parse(spec: &str) -> Option<Self> {
        let spec = OPERATOR_GAP.replace_all(spec.trim(), "$1");
        let spec = spec.trim();

        if let Some((from, to)) = spec.split_once(" - ") {
            return Some(Self {
                comparators: hyphen(Partial::parse(from)?, Partial::parse(to)?),
            });
        }

        let mut comparators = Vec::new();
        for token in spec.split_whitespace() {
            comparators.extend(expand(token)?);
        }

        Some(Self { comparators })
    }

    fn satisfies(&self, version: &Version) -> bool {
        if !self.comparators.iter().all(|c| c.satisfies(version)) {
            return false;
        }

        if version.pre.is_empty() {
            return true;
        }

        // Pre-releases are only reachable from a comparator on the same tuple
        self.comparators.iter().any(|c| match c {
            Comparator::Bound(_, allowed) => {
                !allowed.pre.is_empty()
                    && allowed.major == version.major
                    && allowed.minor == version.minor
                    && allowed.patch == version.patch
            }
            Comparator::Nothing => false,
        })
    }
}

impl Comparator {
    fn satisfies(&self, version: &Version) -> bool {
        let Comparator::Bound(op, bound) = self else {
            return false;
        };
        match op {
            Op::Eq => version == bound,
            Op::Gt => version > bound,
            Op::Gte => version >= bound,
            Op::Lt => version < bound,
            Op::Lte => version <= bound,
        }
    }
}

impl Partial {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim().trim_start_matches('=').trim_start_matches('v');
        let core_end = text.find(['-', '+']).unwrap_or(text.len());
        let core = &text[..core_end];

        let mut parts = core.split('.');
        let mut numbers = [None; 3];
        let mut wild = false;
        for slot in numbers.iter_mut() {
            let Some(part) = parts.next() else {
                break;
            };
            if wild || matches!(part, "x" | "X" | "*") {
                wild = true;
                continue;
            }
            *slot = Some(part.parse::<u64>().ok()?);
        }
        if parts.next().is_some() {
            return None;
        }

        let [major, minor, patch] = numbers;
        let full = match (major, minor, patch) {
            (Some(_), Some(_), Some(_)) => Some(Version::parse(text).ok()?),
            // `1.2-beta` has no npm meaning
            _ if core_end < text.len() => return None,
            _ => None,
        };

        Some(Self {
            major,
            minor,
            patch,
            full,
        })
    }

    /// Lowest version the partial covers
    fn floor(&self) -> Version {
        self.full.clone().unwrap_or_else(|| {
            Version::new(
                self.major.unwrap_or(0),
                self.minor.unwrap_or(0),
                self.patch.unwrap_or(0),
            )
        })
    }

    /// First version past everything the partial covers, `None` for a full version
    fn next_ceiling(&self) -> Option<Version> {
        match (self.major, self.minor, self.patch) {
            (Some(major), None, _) => Some(Version::new(major.saturating_add(1), 0, 0)),
            (Some(major), Some(minor), None) => {
                Some(Version::new(major, minor.saturating_add(1), 0))
            }
            _ => None,
        }
    }
}

fn bound(op: Op, version: Version) -> Comparator {
    Comparator::Bound(op, version)
}

/// Expand one comparator token into primitive comparators
fn expand(token: &str) -> Option<Vec<Comparator>> {
    let operators = [
        (">=", Op::Gte),
        ("<=", Op::Lte),
        (">", Op::Gt),
        ("<", Op::Lt),
    ];
    for (prefix, op) in operators {
        if let Some(rest) = token.strip_prefix(prefix) {
            return Partial::parse(rest).map(|partial| primitive(op, partial));
        }
    }

    if let Some(rest) = token.strip_prefix('^') {
        return Partial::parse(rest).map(caret);
    }
    if let Some(rest) = token.strip_prefix("~>").or_else(|| token.strip_prefix('~')) {
        return Partial::parse(rest).map(tilde);
    }

    Partial::parse(token).map(exact)
}

fn primitive(op: Op, partial: Partial) -> Vec<Comparator> {
    if partial.major.is_none() {
        return match op {
            Op::Gte | Op::Lte | Op::Eq => vec![],
            Op::Gt | Op::Lt => vec![Comparator::Nothing],
        };
    }

    match (op, partial.next_ceiling()) {
        (Op::Gt, Some(ceiling)) => vec![bound(Op::Gte, ceiling)],
        (Op::Lte, Some(ceiling)) => vec![bound(Op::Lt, ceiling)],
        (op, _) => vec![bound(op, partial.floor())],
    }
}

/// `1.2.3` is exact, `1.2` is `1.2.x`, `1` is `1.x`
fn exact(partial: Partial) -> Vec<Comparator> {
    if partial.major.is_none() {
        return vec![];
    }
    match partial.next_ceiling() {
        Some(ceiling) => vec![bound(Op::Gte, partial.floor()), bound(Op::Lt, ceiling)],
        None => vec![bound(Op::Eq, partial.floor())],
    }
}

/// `~1.2.3` is `>=1.2.3 <1.3.0`, `~1` is `>=1.0.0 <2.0.0`
fn tilde(partial: Partial) -> Vec<Comparator> {
    let (Some(major), minor) = (partial.major, partial.minor) else {
        return vec![];
    };
    let ceiling = match minor {
        Some(minor) => Version::new(major, minor.saturating_add(1), 0),
        None => Version::new(major.saturating_add(1), 0, 0),
    };
    vec![bound(Op::Gte, partial.floor()), bound(Op::Lt, ceiling)]
}

/// Bump the left-most non-zero component, treating a missing one as the limit
fn caret(partial: Partial) -> Vec<Comparator> {
    let Some(major) = partial.major else {
        return vec![];
    };
    let ceiling = match (major, partial.minor, partial.patch) {
        (0, Some(0), Some(patch)) => Version::new(0, 0, patch.saturating_add(1)),
        (0, Some(0), None) => Version::new(0, 1, 0),
        (0, Some(minor), _) => Version::new(0, minor.saturating_add(1), 0),
        (0, None, _) => Version::new(1, 0, 0),
        (major, _, _) => Version::new(major.saturating_add(1), 0, 0),
    };
    vec![bound(Op::Gte, partial.floor()), bound(Op::Lt, ceiling)]
}

/// `1.0.0 - 2.3` is `>=1.0.0 <2.4.0`
fn hyphen(from: Partial, to: Partial) -> Vec<Comparator> {
    let mut comparators = Vec::new();
    if from.major.is_some() {
        comparators.push(bound(Op::Gte, from.floor()));
    }
    if to.major.is_some() {
        comparators.push(match to.next_ceiling() {
            Some(ceiling) => bound(Op::Lt, ceiling),
            None => bound(Op::Lte, to.floor()),
        });
    }
    comparators
}
