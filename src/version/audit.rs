//! Vulnerability audit against the npm bulk advisory endpoint

use std::collections::HashMap;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tracing::{debug, error, warn};

use crate::config::{
    AUDIT_ENDPOINT_PATH, DEFAULT_AUDIT_TTL_MS, DEFAULT_REGISTRY_URL, FETCH_TIMEOUT_MS, USER_AGENT,
};
use crate::version::cache::TtlCache;
use crate::version::error::AuditError;
use crate::version::overlay::vulnerabilities_for_version;
use crate::version::types::{AuditResponse, Vulnerability};

/// Source of per-version advisory data
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait AuditSource: Send + Sync {
    /// Advisories applying to each of `versions` of `package_name`, keyed by version
    ///
    /// Never fails: versions that could not be audited map to an empty list.
    async fn audit(
        &self,
        package_name: &str,
        versions: &[String],
    ) -> HashMap<String, Vec<Vulnerability>>;

    /// Drops every cached result
    fn clear_cache(&self);
}

/// Audit client for the npm bulk advisory API
pub struct NpmAuditClient {
    client: reqwest::Client,
    endpoint: String,
    cache: TtlCache<Vec<Vulnerability>>,
}

impl NpmAuditClient {
    /// Creates a client auditing against the registry at `base_url`
    pub fn new(base_url: &str) -> Self {
        Self::with_cache(base_url, TtlCache::new(DEFAULT_AUDIT_TTL_MS))
    }

    pub fn with_cache(base_url: &str, cache: TtlCache<Vec<Vulnerability>>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_millis(FETCH_TIMEOUT_MS))
                .build()
                .expect("Failed to create HTTP client"),
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), AUDIT_ENDPOINT_PATH),
            cache,
        }
    }

    fn cache_key(package_name: &str, version: &str) -> String {
        format!("{}@{}", package_name, version)
    }

    async fn fetch_advisories(
        &self,
        package_name: &str,
        versions: &[String],
    ) -> Result<AuditResponse, AuditError> {
        let body = HashMap::from([(package_name, versions)]);

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Audit endpoint returned status {}: {}", status, self.endpoint);
            return Err(AuditError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        response
            .json::<AuditResponse>()
            .await
            .map_err(|e| AuditError::InvalidResponse(e.to_string()))
    }
}

impl Default for NpmAuditClient {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL)
    }
}

#[async_trait::async_trait]
impl AuditSource for NpmAuditClient {
    async fn audit(
        &self,
        package_name: &str,
        versions: &[String],
    ) -> HashMap<String, Vec<Vulnerability>> {
        let mut result = HashMap::new();
        let mut uncached = Vec::new();

        for version in versions {
            match self.cache.get(&Self::cache_key(package_name, version)) {
                Some(vulns) => {
                    result.insert(version.clone(), vulns);
                }
                None => uncached.push(version.clone()),
            }
        }

        if uncached.is_empty() {
            debug!("All {} audit results for {} cached", versions.len(), package_name);
            return result;
        }

        let advisories = match self.fetch_advisories(package_name, &uncached).await {
            Ok(mut response) => response.remove(package_name).unwrap_or_default(),
            Err(e) => {
                error!("Failed to audit {}: {}", package_name, e);
                for version in uncached {
                    result.insert(version, Vec::new());
                }
                return result;
            }
        };

        for version in uncached {
            let vulns = vulnerabilities_for_version(&advisories, &version);
            self.cache
                .set(&Self::cache_key(package_name, &version), vulns.clone());
            result.insert(version, vulns);
        }

        result
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}
