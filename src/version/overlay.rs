//! Attach advisories to classified versions and rank their severity

use std::fmt;

use tracing::debug;

use crate::version::range::VersionRange;
use crate::version::semver::parse_version;
use crate::version::types::{SafeVersion, Severity, Vulnerability};

/// Attach every applicable advisory to every version
///
/// Each output record carries exactly the advisories whose range matches it.
pub fn annotate(versions: Vec<SafeVersion>, vulnerabilities: &[Vulnerability]) -> Vec<SafeVersion> {
    versions
        .into_iter()
        .map(|mut version| {
            version.vulnerabilities = vulnerabilities_for_version(vulnerabilities, &version.version);
            version
        })
        .collect()
}

/// Advisories whose `vulnerable_versions` range contains `version`
///
/// A malformed range or an unparseable version counts as a match.
pub fn vulnerabilities_for_version(
    vulnerabilities: &[Vulnerability],
    version: &str,
) -> Vec<Vulnerability> {
    vulnerabilities
        .iter()
        .filter(|vuln| applies_to(vuln, version))
        .cloned()
        .collect()
}

fn applies_to(vulnerability: &Vulnerability, version: &str) -> bool {
    let Some(parsed) = parse_version(version) else {
        debug!(
            "Unparseable version {} treated as affected by advisory {}",
            version, vulnerability.id
        );
        return true;
    };

    match VersionRange::parse(&vulnerability.vulnerable_versions) {
        Ok(range) => range.satisfies(&parsed),
        Err(e) => {
            debug!("{} (advisory {}); treating as affected", e, vulnerability.id);
            true
        }
    }
}

/// True when the version carries an advisory strictly more severe than `max_severity`
pub fn is_blocked(version: &SafeVersion, max_severity: Severity) -> bool {
    version
        .vulnerabilities
        .iter()
        .any(|vuln| vuln.severity.exceeds(max_severity))
}

/// Most severe advisory in the list
pub fn highest_severity(vulnerabilities: &[Vulnerability]) -> Option<Severity> {
    vulnerabilities
        .iter()
        .map(|vuln| vuln.severity)
        .min_by_key(|severity| severity.rank())
}

/// Combined verdict shown next to each version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyStatus {
    Ok,
    InQuarantine,
    Vulnerable,
    QuarantinedAndVulnerable,
}

impl SafetyStatus {
    /// `audit` is the blocking threshold, or `None` when auditing is disabled
    pub fn of(version: &SafeVersion, audit: Option<Severity>) -> Self {
        let blocked = audit.is_some_and(|max| is_blocked(version, max));

        match (version.is_safe, blocked) {
            (true, false) => SafetyStatus::Ok,
            (false, false) => SafetyStatus::InQuarantine,
            (true, true) => SafetyStatus::Vulnerable,
            (false, true) => SafetyStatus::QuarantinedAndVulnerable,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            SafetyStatus::Ok => "✓",
            SafetyStatus::InQuarantine => "⚠",
            SafetyStatus::Vulnerable => "🔒",
            SafetyStatus::QuarantinedAndVulnerable => "⚠🔒",
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            SafetyStatus::Ok => "Ok",
            SafetyStatus::InQuarantine => "In quarantine",
            SafetyStatus::Vulnerable => "Has vulnerabilities",
            SafetyStatus::QuarantinedAndVulnerable => "Quarantine + Vulnerable",
        }
    }
}

impl fmt::Display for SafetyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.icon(), self.text())
    }
}

/// Advisory counts per severity, most severe first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VulnerabilitySummary {
    counts: Vec<(Severity, usize)>,
}

impl VulnerabilitySummary {
    pub fn new(vulnerabilities: &[Vulnerability]) -> Self {
        let counts = Severity::ALL
            .iter()
            .map(|&severity| {
                let count = vulnerabilities
                    .iter()
                    .filter(|vuln| vuln.severity == severity)
                    .count();
                (severity, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect();

        Self { counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.counts
            .iter()
            .find(|(s, _)| *s == severity)
            .map_or(0, |(_, count)| *count)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl fmt::Display for VulnerabilitySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .counts
            .iter()
            .map(|(severity, count)| format!("{} {} {}", severity.icon(), count, severity.label()))
            .collect();
        f.write_str(&parts.join(", "))
    }
}
