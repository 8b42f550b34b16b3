//! Common types for parsers

use std::fmt;

/// Where in package.json a dependency was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencySection {
    Dependencies,
    DevDependencies,
    PeerDependencies,
    /// The `packageManager` field (`pnpm@10.25.0`)
    PackageManager,
}

impl DependencySection {
    /// Returns the package.json key of the section
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencySection::Dependencies => "dependencies",
            DependencySection::DevDependencies => "devDependencies",
            DependencySection::PeerDependencies => "peerDependencies",
            DependencySection::PackageManager => "packageManager",
        }
    }
}

impl fmt::Display for DependencySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DependencySection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dependencies" => Ok(DependencySection::Dependencies),
            "devDependencies" => Ok(DependencySection::DevDependencies),
            "peerDependencies" => Ok(DependencySection::PeerDependencies),
            "packageManager" => Ok(DependencySection::PackageManager),
            _ => Err(()),
        }
    }
}

/// True for URIs of npm manifests
pub fn is_package_json(uri: &str) -> bool {
    uri.ends_with("/package.json") || uri == "package.json"
}

/// Information about a package dependency found in a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    /// Package name as published (npm aliases resolve to the real package)
    pub name: String,
    /// Version specification as written (e.g. `^4.17.21`)
    pub version: String,
    pub section: DependencySection,
    /// Byte offset of the version string in the source (start)
    pub start_offset: usize,
    /// Byte offset of the version string in the source (end)
    pub end_offset: usize,
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed)
    pub column: usize,
}
