//! Package manager detection and release-age config sources
//!
//! Each supported package manager stores its minimum release age in a
//! different file and format. A [`PackageManagerService`] reads it and
//! normalizes the value to minutes, which is all the evaluation needs.
//!
//! - [`detector`]: package manager and workspace root detection
//! - [`pnpm`]: `minimumReleaseAge` in `pnpm-workspace.yaml`
//! - [`yarn`]: `npmMinimalAgeGate` in `.yarnrc.yml`
//! - [`npm`]: `before` in `.npmrc`

pub mod detector;
pub mod error;
pub mod npm;
pub mod pnpm;
pub mod yarn;
mod yaml;

use std::fmt;
use std::path::Path;

pub use detector::{detect, find_workspace_root};
pub use error::ConfigError;
pub use npm::NpmService;
pub use pnpm::PnpmService;
pub use yarn::YarnService;

/// Supported package managers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManagerKind {
    Pnpm,
    Yarn,
    Npm,
    Unknown,
}

impl PackageManagerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManagerKind::Pnpm => "pnpm",
            PackageManagerKind::Yarn => "yarn",
            PackageManagerKind::Npm => "npm",
            PackageManagerKind::Unknown => "unknown",
        }
    }

    /// Case-insensitive lookup by package manager name
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "pnpm" => PackageManagerKind::Pnpm,
            "yarn" => PackageManagerKind::Yarn,
            "npm" => PackageManagerKind::Npm,
            _ => PackageManagerKind::Unknown,
        }
    }
}

impl fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detected package manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManagerInfo {
    pub kind: PackageManagerKind,
    /// Version from the `packageManager` field, `unknown` when detected from a lock file
    pub version: String,
    /// Raw `packageManager` value (e.g. `pnpm@10.25.0`)
    pub full_spec: String,
}

impl PackageManagerInfo {
    pub fn unknown() -> Self {
        Self::from_lock_file(PackageManagerKind::Unknown)
    }

    pub(crate) fn from_lock_file(kind: PackageManagerKind) -> Self {
        Self {
            kind,
            version: "unknown".to_string(),
            full_spec: format!("{}@unknown", kind),
        }
    }
}

/// Release-age settings read from a package manager's config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackageManagerConfig {
    /// 0 when not configured
    pub minimum_release_age_minutes: u64,
}

/// Reads the minimum release age configured for one package manager
#[async_trait::async_trait]
pub trait PackageManagerService: Send + Sync {
    fn info(&self) -> &PackageManagerInfo;

    /// Release-age config found under `root`
    ///
    /// A missing or unreadable config file yields the default (no quarantine).
    async fn config(&self, root: &Path) -> PackageManagerConfig;
}

/// Service for the detected package manager, `None` when it is unknown
pub fn create_service(info: PackageManagerInfo) -> Option<Box<dyn PackageManagerService>> {
    match info.kind {
        PackageManagerKind::Pnpm => Some(Box::new(PnpmService::new(info))),
        PackageManagerKind::Yarn => Some(Box::new(YarnService::new(info))),
        PackageManagerKind::Npm => Some(Box::new(NpmService::new(info))),
        PackageManagerKind::Unknown => None,
    }
}

/// Leading run of digits as a number, like JavaScript's `parseInt`
pub(crate) fn parse_leading_number(value: &str) -> Option<u64> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
