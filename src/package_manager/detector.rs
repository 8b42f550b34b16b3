//! Package manager and workspace root detection

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::package_manager::{PackageManagerInfo, PackageManagerKind};

/// Lock files in detection priority order
const LOCK_FILES: [(&str, PackageManagerKind); 3] = [
    ("pnpm-lock.yaml", PackageManagerKind::Pnpm),
    ("yarn.lock", PackageManagerKind::Yarn),
    ("package-lock.json", PackageManagerKind::Npm),
];

/// Files that mark the root of a workspace
const WORKSPACE_MARKERS: [&str; 4] = [
    "pnpm-lock.yaml",
    "yarn.lock",
    "package-lock.json",
    "pnpm-workspace.yaml",
];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestFields {
    package_manager: Option<String>,
}

/// Detect the package manager for a manifest
///
/// The `packageManager` field of `manifest` wins; otherwise the first lock
/// file found in `root` decides.
pub fn detect(root: &Path, manifest: &str) -> PackageManagerInfo {
    from_manifest(manifest)
        .or_else(|| from_lock_files(root))
        .unwrap_or_else(PackageManagerInfo::unknown)
}

/// Read the `packageManager` field (`pnpm@10.25.0`) of a package.json document
pub fn from_manifest(manifest: &str) -> Option<PackageManagerInfo> {
    let fields: ManifestFields = serde_json::from_str(manifest)
        .inspect_err(|e| debug!("Failed to read packageManager field: {}", e))
        .ok()?;
    let full_spec = fields.package_manager?;

    Some(from_spec(&full_spec))
}

/// Split a `name@version` spec; the version is the digits-and-dots run after `@`
pub fn from_spec(full_spec: &str) -> PackageManagerInfo {
    let (name, rest) = full_spec.split_once('@').unwrap_or((full_spec, ""));
    let version: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    PackageManagerInfo {
        kind: PackageManagerKind::from_name(name),
        version,
        full_spec: full_spec.to_string(),
    }
}

/// Kind of the first lock file present in `dir`
pub fn from_lock_files(dir: &Path) -> Option<PackageManagerInfo> {
    LOCK_FILES
        .iter()
        .find(|(file, _)| dir.join(file).is_file())
        .map(|(_, kind)| PackageManagerInfo::from_lock_file(*kind))
}

/// Walk upward from `start` looking for a lock file or `pnpm-workspace.yaml`
///
/// The search never leaves `workspace_folder`; when nothing is found the
/// workspace folder itself is the root.
pub fn find_workspace_root(start: &Path, workspace_folder: &Path) -> PathBuf {
    let mut current = Some(start);

    while let Some(dir) = current.filter(|dir| dir.starts_with(workspace_folder)) {
        if let Some(marker) = WORKSPACE_MARKERS
            .iter()
            .find(|marker| dir.join(marker).is_file())
        {
            debug!("Found {} at {}", marker, dir.display());
            return dir.to_path_buf();
        }
        current = dir.parent();
    }

    workspace_folder.to_path_buf()
}
