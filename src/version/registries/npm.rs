//! npm registry API implementation

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{DEFAULT_METADATA_TTL_MS, DEFAULT_REGISTRY_URL, FETCH_TIMEOUT_MS, USER_AGENT};
use crate::version::cache::TtlCache;
use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::types::PackageMetadata;

/// Registry implementation for npm registry API
pub struct NpmRegistry {
    client: reqwest::Client,
    base_url: String,
    cache: TtlCache<PackageMetadata>,
}

impl NpmRegistry {
    /// Creates a new NpmRegistry with a custom base URL
    pub fn new(base_url: &str) -> Self {
        Self::with_cache(base_url, TtlCache::new(DEFAULT_METADATA_TTL_MS))
    }

    /// Creates a new NpmRegistry backed by the given document cache
    pub fn with_cache(base_url: &str, cache: TtlCache<PackageMetadata>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_millis(FETCH_TIMEOUT_MS))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }
}

impl Default for NpmRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL)
    }
}

#[async_trait::async_trait]
impl Registry for NpmRegistry {
    async fn fetch_metadata(&self, package_name: &str) -> Result<PackageMetadata, RegistryError> {
        if let Some(cached) = self.cache.get(package_name) {
            debug!("Using cached metadata for {}", package_name);
            return Ok(cached);
        }

        let encoded_name = Self::encode_package_name(package_name);
        let url = format!("{}/{}", self.base_url, encoded_name);

        let response = self.client.get(&url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(package_name.to_string()));
        }

        if !status.is_success() {
            warn!("npm registry returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let metadata: PackageMetadata = response.json().await.map_err(|e| {
            warn!("Failed to parse npm registry response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        self.cache.set(package_name, metadata.clone());

        Ok(metadata)
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    const LODASH_BODY: &str = r#"{
        "name": "lodash",
        "dist-tags": { "latest": "4.17.21" },
        "versions": {
            "4.17.19": {},
            "4.17.20": {},
            "4.17.21": {}
        },
        "time": {
            "created": "2012-04-23T16:37:11.912Z",
            "modified": "2024-01-01T00:00:00.000Z",
            "4.17.19": "2020-07-08T17:14:40.866Z",
            "4.17.20": "2020-08-13T16:53:54.152Z",
            "4.17.21": "2021-02-20T15:42:16.891Z"
        }
    }"#;

    #[tokio::test]
    async fn fetch_metadata_parses_versions_and_times() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/lodash")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(LODASH_BODY)
            .create_async()
            .await;

        let registry = NpmRegistry::new(&server.url());
        let result = registry.fetch_metadata("lodash").await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.name, "lodash");
        assert_eq!(
            result.versions.keys().collect::<Vec<_>>(),
            vec!["4.17.19", "4.17.20", "4.17.21"]
        );
        assert_eq!(
            result.time.get("4.17.21").map(String::as_str),
            Some("2021-02-20T15:42:16.891Z")
        );
        assert_eq!(
            result.dist_tags.get("latest").map(String::as_str),
            Some("4.17.21")
        );
    }

    #[tokio::test]
    async fn fetch_metadata_drops_version_manifests() {
        let mut server = Server::new_async().await;

        let _mock = server
            .mock("GET", "/left-pad")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "name": "left-pad",
                    "versions": {
                        "1.0.0": {
                            "name": "left-pad",
                            "dependencies": { "a": "^1.0.0" },
                            "dist": { "tarball": "https://example.com/left-pad-1.0.0.tgz" },
                            "scripts": { "test": "node test.js" }
                        },
                        "1.1.0": { "readme": "left pad", "files": ["index.js"] }
                    },
                    "time": {
                        "1.0.0": "2016-03-23T00:00:00.000Z",
                        "1.1.0": "2016-04-01T00:00:00.000Z"
                    }
                }"#,
            )
            .create_async()
            .await;

        let registry = NpmRegistry::new(&server.url());
        let result = registry.fetch_metadata("left-pad").await.unwrap();

        let expected = PackageMetadata::new("left-pad")
            .with_version("1.0.0", "2016-03-23T00:00:00.000Z")
            .with_version("1.1.0", "2016-04-01T00:00:00.000Z");
        assert_eq!(result, expected);
    }

    #[tokio::test]
    async fn fetch_metadata_returns_not_found_for_nonexistent_package() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/nonexistent-package")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Not found"}"#)
            .create_async()
            .await;

        let registry = NpmRegistry::new(&server.url());
        let result = registry.fetch_metadata("nonexistent-package").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
    }

    #[tokio::test]
    async fn fetch_metadata_returns_invalid_response_on_server_error() {
        let mut server = Server::new_async().await;

        let _mock = server
            .mock("GET", "/lodash")
            .with_status(500)
            .create_async()
            .await;

        let registry = NpmRegistry::new(&server.url());
        let result = registry.fetch_metadata("lodash").await;

        assert!(matches!(result, Err(RegistryError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn fetch_metadata_returns_invalid_response_on_malformed_body() {
        let mut server = Server::new_async().await;

        let _mock = server
            .mock("GET", "/lodash")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let registry = NpmRegistry::new(&server.url());
        let result = registry.fetch_metadata("lodash").await;

        assert!(matches!(result, Err(RegistryError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn fetch_metadata_handles_scoped_package() {
        let mut server = Server::new_async().await;

        // Scoped packages use URL encoding: @types/node -> @types%2Fnode
        let mock = server
            .mock("GET", "/@types%2Fnode")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "name": "@types/node",
                    "versions": { "20.0.0": {}, "18.0.0": {} },
                    "time": {
                        "20.0.0": "2023-04-20T00:00:00.000Z",
                        "18.0.0": "2022-04-20T00:00:00.000Z"
                    }
                }"#,
            )
            .create_async()
            .await;

        let registry = NpmRegistry::new(&server.url());
        let result = registry.fetch_metadata("@types/node").await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.versions.len(), 2);
    }

    #[tokio::test]
    async fn fetch_metadata_uses_cache_for_repeated_requests() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/lodash")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(LODASH_BODY)
            .expect(1)
            .create_async()
            .await;

        let registry = NpmRegistry::new(&server.url());
        let first = registry.fetch_metadata("lodash").await.unwrap();
        let second = registry.fetch_metadata("lodash").await.unwrap();

        mock.assert_async().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn clear_cache_forces_refetch() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/lodash")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(LODASH_BODY)
            .expect(2)
            .create_async()
            .await;

        let registry = NpmRegistry::new(&server.url());
        registry.fetch_metadata("lodash").await.unwrap();
        registry.clear_cache();
        registry.fetch_metadata("lodash").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_metadata_does_not_cache_failures() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let registry = NpmRegistry::new(&server.url());
        assert!(registry.fetch_metadata("flaky").await.is_err());
        assert!(registry.fetch_metadata("flaky").await.is_err());

        mock.assert_async().await;
    }
}
