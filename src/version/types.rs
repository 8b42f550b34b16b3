//! Common types shared by the classifier, the overlay and the collaborators

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

/// Package document returned by the npm registry
///
/// Only the fields needed for release-age classification are kept.
/// `versions` preserves registry order and drops the per-version manifests;
/// `time` maps each version (plus the `created`/`modified` bookkeeping keys)
/// to an ISO-8601 timestamp.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PackageMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub versions: IndexMap<String, IgnoredAny>,
    #[serde(default)]
    pub time: HashMap<String, String>,
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: HashMap<String, String>,
}

impl PackageMetadata {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add a version together with its publish timestamp
    pub fn with_version(mut self, version: &str, published_at: &str) -> Self {
        self.versions
            .insert(version.to_string(), IgnoredAny);
        self.time
            .insert(version.to_string(), published_at.to_string());
        self
    }

    /// Add a version that has no publish timestamp
    pub fn with_untimed_version(mut self, version: &str) -> Self {
        self.versions
            .insert(version.to_string(), IgnoredAny);
        self
    }
}

/// Minimum release age policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuarantinePolicy {
    /// Versions younger than this many minutes are quarantined. 0 disables quarantine.
    pub minimum_release_age_minutes: u64,
}

impl QuarantinePolicy {
    pub fn new(minimum_release_age_minutes: u64) -> Self {
        Self {
            minimum_release_age_minutes,
        }
    }

    /// Quarantine length in milliseconds
    pub fn minimum_age_ms(&self) -> i64 {
        i64::try_from(self.minimum_release_age_minutes)
            .unwrap_or(i64::MAX)
            .saturating_mul(60_000)
    }
}

/// Advisory severity, most severe first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Moderate,
    #[default]
    Low,
    Info,
}

impl Severity {
    /// All severities ordered from most to least severe
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Moderate,
        Severity::Low,
        Severity::Info,
    ];

    /// Position in the fixed severity order (0 = critical, 4 = info)
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Moderate => 2,
            Severity::Low => 3,
            Severity::Info => 4,
        }
    }

    /// True if `self` is strictly more severe than `threshold`
    pub fn exceeds(self, threshold: Severity) -> bool {
        self.rank() < threshold.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Moderate => "moderate",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Moderate => "Moderate",
            Severity::Low => "Low",
            Severity::Info => "Info",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Severity::Critical => "⛔",
            Severity::High => "🔴",
            Severity::Moderate => "🟠",
            Severity::Low => "🟡",
            Severity::Info => "ℹ️",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory entry from the npm bulk advisory endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: u64,
    pub title: String,
    pub severity: Severity,
    #[serde(default)]
    pub url: String,
    /// npm range expression, e.g. `>=16.0.0 <16.14.0`
    pub vulnerable_versions: String,
    #[serde(default)]
    pub module_name: String,
}

/// Bulk advisory response keyed by package name
pub type AuditResponse = HashMap<String, Vec<Vulnerability>>;

/// Release-age verdict for a single published version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeVersion {
    pub version: String,
    pub published_at: DateTime<Utc>,
    /// Outside the quarantine window
    pub is_safe: bool,
    /// Why the version is quarantined; `None` when safe
    pub reason: Option<String>,
    /// Advisories that apply to this version; empty until the overlay runs
    pub vulnerabilities: Vec<Vulnerability>,
}

impl SafeVersion {
    pub fn is_prerelease(&self) -> bool {
        crate::version::semver::is_prerelease(&self.version)
    }
}
