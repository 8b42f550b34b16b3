//! Yarn: `npmMinimalAgeGate` duration in `.yarnrc.yml`

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::package_manager::error::ConfigError;
use crate::package_manager::yaml::top_level_scalar;
use crate::package_manager::{
    PackageManagerConfig, PackageManagerInfo, PackageManagerService, parse_leading_number,
};

pub const YARNRC_FILE: &str = ".yarnrc.yml";

/// `3d`, `24h`, `10080m`, `600s`
static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([smhd])$").expect("valid duration regex"));

pub struct YarnService {
    info: PackageManagerInfo,
}

impl YarnService {
    pub fn new(info: PackageManagerInfo) -> Self {
        Self { info }
    }

    /// Parse `npmMinimalAgeGate` from .yarnrc.yml content, in minutes
    pub fn parse_npm_minimal_age_gate(content: &str) -> Result<Option<u64>, ConfigError> {
        Ok(top_level_scalar(content, "npmMinimalAgeGate", YARNRC_FILE)?
            .as_deref()
            .and_then(parse_duration_minutes))
    }
}

/// Duration with an `s`/`m`/`h`/`d` unit, or a bare number of minutes
///
/// Seconds round down to whole minutes.
pub fn parse_duration_minutes(duration: &str) -> Option<u64> {
    let duration = duration.trim();
    let Some(captures) = DURATION.captures(duration) else {
        return parse_leading_number(duration);
    };

    let value: u64 = captures[1].parse().ok()?;
    match &captures[2] {
        "s" => Some(value / 60),
        "m" => Some(value),
        "h" => value.checked_mul(60),
        "d" => value.checked_mul(60 * 24),
        _ => None,
    }
}

#[async_trait::async_trait]
impl PackageManagerService for YarnService {
    fn info(&self) -> &PackageManagerInfo {
        &self.info
    }

    async fn config(&self, root: &Path) -> PackageManagerConfig {
        let path = root.join(YARNRC_FILE);

        let minutes = match tokio::fs::read_to_string(&path).await {
            Ok(content) => Self::parse_npm_minimal_age_gate(&content)
                .inspect_err(|e| debug!("{}", e))
                .ok()
                .flatten(),
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
