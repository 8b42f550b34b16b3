//! Registry trait for fetching package documents

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::types::PackageMetadata;

/// Source of package metadata (versions and their publish times)
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches the package document for `package_name`
    ///
    /// # Returns
    /// * `Ok(PackageMetadata)` - versions in registry order with their publish timestamps
    /// * `Err(RegistryError)` - If the fetch fails
    async fn fetch_metadata(&self, package_name: &str) -> Result<PackageMetadata, RegistryError>;

    /// Drops every cached document so the next fetch goes to the network
    fn clear_cache(&self);
}
