//! pnpm: `minimumReleaseAge` (minutes) in `pnpm-workspace.yaml`

use std::path::Path;

use tracing::debug;

use crate::package_manager::error::ConfigError;
use crate::package_manager::yaml::top_level_scalar;
use crate::package_manager::{
    PackageManagerConfig, PackageManagerInfo, PackageManagerService, parse_leading_number,
};

pub const PNPM_WORKSPACE_FILE: &str = "pnpm-workspace.yaml";

pub struct PnpmService {
    info: PackageManagerInfo,
}

impl PnpmService {
    pub fn new(info: PackageManagerInfo) -> Self {
        Self { info }
    }

    /// Parse `minimumReleaseAge: 10080` from pnpm-workspace.yaml content
    pub fn parse_minimum_release_age(content: &str) -> Result<Option<u64>, ConfigError> {
        Ok(top_level_scalar(content, "minimumReleaseAge", PNPM_WORKSPACE_FILE)?
            .as_deref()
            .and_then(parse_leading_number))
    }
}

#[async_trait::async_trait]
impl PackageManagerService for PnpmService {
    fn info(&self) -> &PackageManagerInfo {
        &self.info
    }

    async fn config(&self, root: &Path) -> PackageManagerConfig {
        let path = root.join(PNPM_WORKSPACE_FILE);

        let minutes = match tokio::fs::read_to_string(&path).await {
            Ok(content) => Self::parse_minimum_release_age(&content)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package_manager::PackageManagerKind;
    use rstest::rstest;
    use tempfile::TempDir;

    fn service() -> PnpmService {
        PnpmService::new(PackageManagerInfo::from_lock_file(PackageManagerKind::Pnpm))
    }

    #[rstest]
    #[case("minimumReleaseAge: 10080\n", Some(10080))]
    #[case("packages:\n  - apps/*\nminimumReleaseAge: 1440 # one day\n", Some(1440))]
    #[case("minimumReleaseAge: soon\n", None)]
    #[case("packages:\n  - apps/*\n", None)]
    fn parse_minimum_release_age_reads_minutes(
        #[case] content: &str,
        #[case] expected: Option<u64>,
    ) {
        assert_eq!(
            PnpmService::parse_minimum_release_age(content).unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn config_reads_workspace_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(PNPM_WORKSPACE_FILE),
            "packages:\n  - packages/*\nminimumReleaseAge: 10080\n",
        )
        .unwrap();

        let config = service().config(dir.path()).await;

        assert_eq!(config.minimum_release_age_minutes, 10080);
    }

    #[tokio::test]
    async fn config_defaults_to_zero_without_workspace_file() {
        let dir = TempDir::new().unwrap();

        let config = service().config(dir.path()).await;

        assert_eq!(config, PackageManagerConfig::default());
    }
}
