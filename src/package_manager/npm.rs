//! npm: `before=<date>` in `.npmrc`, expressed as the minutes elapsed since that date

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::package_manager::{PackageManagerConfig, PackageManagerInfo, PackageManagerService};

pub const NPMRC_FILE: &str = ".npmrc";

pub struct NpmService {
    info: PackageManagerInfo,
}

impl NpmService {
    pub fn new(info: PackageManagerInfo) -> Self {
        Self { info }
    }

    /// Minutes between the `before` date in .npmrc content and `now`
    ///
    /// Lines starting with `#` or `;` are comments; `before=null` is unset.
    /// A date in the future yields 0.
    pub fn parse_before(content: &str, now: DateTime<Utc>) -> Option<u64> {
        let value = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#') && !line.starts_with(';'))
            .find_map(|line| {
                let (key, value) = line.split_once('=')?;
                (key.trim() == "before").then(|| value.trim())
            })?;

        if value.is_empty() || value == "null" {
            return None;
        }

        let before = parse_date(value)?;
        let minutes = (now - before).num_minutes();
        Some(u64::try_from(minutes).unwrap_or(0))
    }
}

/// RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC)
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[async_trait::async_trait]
impl PackageManagerService for NpmService {
    fn info(&self) -> &PackageManagerInfo {
        &self.info
    }

    async fn config(&self, root: &Path) -> PackageManagerConfig {
        let path = root.join(NPMRC_FILE);

        let minutes = match tokio::fs::read_to_string(&path).await {
            Ok(content) => Self::parse_before(&content, Utc::now()),
            Err(e) => {
                debug!("{} not found or unreadable: {}", path.display(), e);
                None
            }
        };

        PackageManagerConfig {
            minimum_release_age_minutes: minutes.unwrap_or(0),
        }
    }
}
