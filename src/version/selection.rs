//! Pick upgrade targets from an annotated, descending version list

use crate::version::overlay::is_blocked;
use crate::version::semver::{clean_version, major_of};
use crate::version::types::{SafeVersion, Severity};

/// Upgrade targets for one dependency
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recommendation {
    /// Best candidate in the current major line, unless it is the pinned version
    pub same_major: Option<SafeVersion>,
    /// Best candidate in the newest major line, when that line is above the current one
    pub latest_major: Option<SafeVersion>,
}

impl Recommendation {
    pub fn is_empty(&self) -> bool {
        self.same_major.is_none() && self.latest_major.is_none()
    }
}

fn is_candidate(version: &SafeVersion, audit: Option<Severity>) -> bool {
    version.is_safe && !audit.is_some_and(|max| is_blocked(version, max))
}

/// Highest major version among quarantine-safe versions, 0 when there are none
pub fn latest_major(versions: &[SafeVersion]) -> u64 {
    versions
        .iter()
        .filter(|v| v.is_safe)
        .map(|v| major_of(&v.version))
        .max()
        .unwrap_or(0)
}

/// Best candidate within one major line
///
/// `versions` must be sorted newest first. A stable release wins over any
/// pre-release; without one, the highest pre-release is returned. With
/// `audit` set, versions blocked at that threshold are skipped as well.
pub fn best_in_major(
    versions: &[SafeVersion],
    major: u64,
    audit: Option<Severity>,
) -> Option<&SafeVersion> {
    let mut in_major = versions
        .iter()
        .filter(|v| is_candidate(v, audit) && major_of(&v.version) == major)
        .peekable();

    let first = *in_major.peek()?;
    Some(in_major.find(|v| !v.is_prerelease()).unwrap_or(first))
}

/// Recommend upgrades for a dependency pinned at `current_version`
///
/// Range operators on the pinned version are ignored, so `^1.2.3` is treated as `1.2.3`.
pub fn recommend(
    versions: &[SafeVersion],
    current_version: &str,
    audit: Option<Severity>,
) -> Recommendation {
    let current = clean_version(current_version);
    let current_major = major_of(current);

    let same_major = best_in_major(versions, current_major, audit)
        .filter(|best| best.version != current)
        .cloned();

    let newest_major = latest_major(versions);
    let latest_major = if newest_major > current_major {
        best_in_major(versions, newest_major, audit).cloned()
    } else {
        None
    };

    Recommendation {
        same_major,
        latest_major,
    }
}
