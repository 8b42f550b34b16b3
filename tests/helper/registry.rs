//! Registry and audit test utilities

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::TempDir;

use safer_version_lsp::version::audit::AuditSource;
use safer_version_lsp::version::error::RegistryError;
use safer_version_lsp::version::overlay::vulnerabilities_for_version;
use safer_version_lsp::version::registry::Registry;
use safer_version_lsp::version::types::{PackageMetadata, Severity, Vulnerability};

/// Package document whose versions were published `days_ago` days before now
pub fn metadata_published_days_ago(name: &str, versions: &[(&str, i64)]) -> PackageMetadata {
    versions
        .iter()
        .fold(PackageMetadata::new(name), |metadata, (version, days_ago)| {
            let published_at = (Utc::now() - Duration::days(*days_ago)).to_rfc3339();
            metadata.with_version(version, &published_at)
        })
}

/// Advisory entry affecting `range`
pub fn advisory(id: u64, severity: Severity, range: &str, title: &str) -> Vulnerability {
    Vulnerability {
        id,
        title: title.to_string(),
        severity,
        url: format!("https://github.com/advisories/{id}"),
        vulnerable_versions: range.to_string(),
        module_name: String::new(),
    }
}

/// In-memory registry
#[derive(Default)]
pub struct StubRegistry {
    documents: HashMap<String, PackageMetadata>,
    pub clear_count: AtomicUsize,
}

impl StubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, metadata: PackageMetadata) -> Self {
        self.documents.insert(metadata.name.clone(), metadata);
        self
    }

    pub fn clear_count(&self) -> usize {
        self.clear_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registry for StubRegistry {
    async fn fetch_metadata(&self, package_name: &str) -> Result<PackageMetadata, RegistryError> {
        self.documents
            .get(package_name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(package_name.to_string()))
    }

    fn clear_cache(&self) {
        self.clear_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory advisory database
#[derive(Default)]
pub struct StubAuditSource {
    advisories: HashMap<String, Vec<Vulnerability>>,
    pub clear_count: AtomicUsize,
}

impl StubAuditSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_advisory(mut self, package: &str, vulnerability: Vulnerability) -> Self {
        self.advisories
            .entry(package.to_string())
            .or_default()
            .push(vulnerability);
        self
    }

    pub fn clear_count(&self) -> usize {
        self.clear_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditSource for StubAuditSource {
    async fn audit(
        &self,
        package_name: &str,
        versions: &[String],
    ) -> HashMap<String, Vec<Vulnerability>> {
        let advisories = self
            .advisories
            .get(package_name)
            .map(Vec::as_slice)
            .unwrap_or_default();

        versions
            .iter()
            .map(|version| {
                (
                    version.clone(),
                    vulnerabilities_for_version(advisories, version),
                )
            })
            .collect()
    }

    fn clear_cache(&self) {
        self.clear_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Temporary project directory containing `files`
pub fn create_workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        write_file(dir.path(), name, content);
    }
    dir
}

fn write_file(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}
