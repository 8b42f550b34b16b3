//! Release-age quarantine classification
//!
//! A version is safe once it has been published for at least the configured
//! minimum release age. The classifier is a pure function of the registry
//! document, the policy and the injected `now`.

use chrono::{DateTime, Utc};

use crate::version::semver::{compare_numeric, is_prerelease};
use crate::version::types::{PackageMetadata, QuarantinePolicy, SafeVersion};

const MINUTE_MS: i64 = 60 * 1000;

/// Classify every timed version of a package against the quarantine policy
///
/// Versions without a parseable publish timestamp produce no record.
/// Pre-releases (versions containing `-`) are dropped when `exclude_prerelease` is set.
/// The result is sorted by version, newest first, using numeric-aware ordering.
pub fn classify(
    metadata: &PackageMetadata,
    policy: QuarantinePolicy,
    exclude_prerelease: bool,
    now: DateTime<Utc>,
) -> Vec<SafeVersion> {
    let minimum_age_ms = policy.minimum_age_ms();

    let mut versions: Vec<SafeVersion> = metadata
        .versions
        .keys()
        .filter(|version| !(exclude_prerelease && is_prerelease(version)))
        .filter_map(|version| {
            let published_at = parse_timestamp(metadata.time.get(version)?)?;
            let age_ms = (now - published_at).num_milliseconds();
            let is_safe = age_ms >= minimum_age_ms;

            Some(SafeVersion {
                version: version.clone(),
                published_at,
                is_safe,
                reason: (!is_safe).then(|| {
                    format!(
                        "Released {} ago (quarantine: {})",
                        format_age(age_ms),
                        format_age(minimum_age_ms)
                    )
                }),
                vulnerabilities: Vec::new(),
            })
        })
        .collect();

    versions.sort_by(|a, b| compare_numeric(&b.version, &a.version));
    versions
}

/// Format a duration using the largest whole unit: days, hours or minutes
///
/// `format_age(300_000)` -> `"5 minutes"`, `format_age(7 * 24 * 3_600_000)` -> `"7 days"`
pub fn format_age(ms: i64) -> String {
    let minutes = ms.max(0) / MINUTE_MS;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        pluralize(days, "day")
    } else if hours > 0 {
        pluralize(hours, "hour")
    } else {
        pluralize(minutes, "minute")
    }
}

fn pluralize(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Parse an RFC 3339 registry timestamp; a bare date is taken as midnight UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
