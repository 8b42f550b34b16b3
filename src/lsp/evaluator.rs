//! Per-dependency evaluation: fetch, classify, audit, annotate, recommend

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::config::LspConfig;
use crate::parser::types::PackageInfo;
use crate::version::audit::AuditSource;
use crate::version::overlay::annotate;
use crate::version::quarantine::classify;
use crate::version::registry::Registry;
use crate::version::selection::{Recommendation, recommend};
use crate::version::semver::clean_version;
use crate::version::types::{QuarantinePolicy, SafeVersion, Severity, Vulnerability};

/// Inputs shared by every dependency of one manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationSettings {
    pub policy: QuarantinePolicy,
    pub exclude_prerelease: bool,
    /// Blocking threshold; `None` disables the audit step
    pub audit: Option<Severity>,
    pub now: DateTime<Utc>,
}

impl EvaluationSettings {
    pub fn new(config: &LspConfig, policy: QuarantinePolicy, now: DateTime<Utc>) -> Self {
        Self {
            policy,
            exclude_prerelease: config.exclude_prerelease(),
            audit: config.audit_threshold(),
            now,
        }
    }
}

/// Result for one dependency entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEvaluation {
    pub package: PackageInfo,
    /// Pinned version with range operators removed
    pub current_version: String,
    /// Classified and annotated versions, newest first
    pub versions: Vec<SafeVersion>,
    /// Advisories affecting the pinned version
    pub current_vulnerabilities: Vec<Vulnerability>,
    pub recommendation: Recommendation,
}

/// Evaluate every dependency concurrently
///
/// Dependencies whose metadata cannot be fetched are left out.
pub async fn evaluate_all(
    registry: &dyn Registry,
    audit: &dyn AuditSource,
    packages: Vec<PackageInfo>,
    settings: EvaluationSettings,
) -> Vec<DependencyEvaluation> {
    let evaluations = packages
        .into_iter()
        .map(|package| evaluate_dependency(registry, audit, package, settings));

    join_all(evaluations).await.into_iter().flatten().collect()
}

/// Evaluate one dependency
///
/// Returns `None` when the pinned spec has no version number (dist-tags, URLs)
/// or when the registry fetch fails.
pub async fn evaluate_dependency(
    registry: &dyn Registry,
    audit: &dyn AuditSource,
    package: PackageInfo,
    settings: EvaluationSettings,
) -> Option<DependencyEvaluation> {
    let current_version = clean_version(&package.version).to_string();
    if current_version.is_empty() {
        debug!(
            "Skipping {}: no version number in {:?}",
            package.name, package.version
        );
        return None;
    }

    let metadata = registry
        .fetch_metadata(&package.name)
        .await
        .inspect_err(|e| warn!("Failed to fetch metadata for {}: {}", package.name, e))
        .ok()?;

    let mut versions = classify(
        &metadata,
        settings.policy,
        settings.exclude_prerelease,
        settings.now,
    );

    let mut current_vulnerabilities = Vec::new();
    if settings.audit.is_some() {
        let mut audited: Vec<String> = versions.iter().map(|v| v.version.clone()).collect();
        if !audited.contains(&current_version) {
            audited.push(current_version.clone());
        }

        let mut results = audit.audit(&package.name, &audited).await;
        current_vulnerabilities = results.remove(&current_version).unwrap_or_default();

        let mut advisories = distinct_advisories(results.into_values().flatten());
        for vuln in &current_vulnerabilities {
            if !advisories.iter().any(|known| known.id == vuln.id) {
                advisories.push(vuln.clone());
            }
        }
        versions = annotate(versions, &advisories);
    }

    let recommendation = recommend(&versions, &current_version, settings.audit);

    Some(DependencyEvaluation {
        package,
        current_version,
        versions,
        current_vulnerabilities,
        recommendation,
    })
}

/// Deduplicate advisories by id, keeping the first occurrence
fn distinct_advisories(vulns: impl Iterator<Item = Vulnerability>) -> Vec<Vulnerability> {
    let mut by_id: HashMap<u64, Vulnerability> = HashMap::new();
    let mut order = Vec::new();
    for vuln in vulns {
        if !by_id.contains_key(&vuln.id) {
            order.push(vuln.id);
            by_id.insert(vuln.id, vuln);
        }
    }
    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}
