use serde::Deserialize;
use std::path::PathBuf;

use crate::version::types::Severity;

// =============================================================================
// Time-related constants
// =============================================================================

/// How long a fetched package document stays fresh (5 minutes)
pub const DEFAULT_METADATA_TTL_MS: i64 = 5 * 60 * 1000;

/// How long audit results for one `package@version` stay fresh (30 minutes)
pub const DEFAULT_AUDIT_TTL_MS: i64 = 30 * 60 * 1000;

/// Timeout for fetch operations in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// Endpoints and identifiers
// =============================================================================

/// Default npm registry
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Path of the npm bulk advisory endpoint, relative to the registry
pub const AUDIT_ENDPOINT_PATH: &str = "/-/npm/v1/security/advisories/bulk";

/// User agent sent to the registry
pub const USER_AGENT: &str = "safer-version-lsp";

/// Environment variable holding the log filter directive
pub const LOG_ENV_VAR: &str = "SAFER_VERSION_LSP_LOG";

/// LSP configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LspConfig {
    /// Master switch; when off the server publishes nothing
    pub enabled: bool,
    /// Offer pre-release versions as candidates
    pub show_prerelease: bool,
    /// Base URL of the npm registry used for metadata and audit requests
    pub registry: String,
    pub audit: AuditConfig,
    pub cache: CacheConfig,
}

impl Default for LspConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            show_prerelease: false,
            registry: DEFAULT_REGISTRY_URL.to_string(),
            audit: AuditConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl LspConfig {
    pub fn exclude_prerelease(&self) -> bool {
        !self.show_prerelease
    }

    /// Blocking threshold, or `None` when auditing is disabled
    pub fn audit_threshold(&self) -> Option<Severity> {
        self.audit.enabled.then_some(self.audit.max_severity)
    }
}

/// Vulnerability audit configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AuditConfig {
    pub enabled: bool,
    /// Advisories strictly more severe than this block a version
    pub max_severity: Severity,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_severity: Severity::Low,
        }
    }
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Package document TTL in milliseconds
    pub metadata_ttl: i64,
    /// Audit result TTL in milliseconds
    pub audit_ttl: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            metadata_ttl: DEFAULT_METADATA_TTL_MS,
            audit_ttl: DEFAULT_AUDIT_TTL_MS,
        }
    }
}

/// Returns the path to the data directory for safer-version-lsp.
/// Uses $XDG_DATA_HOME/safer-version-lsp if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/safer-version-lsp,
/// or ./safer-version-lsp if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("safer-version-lsp.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("safer-version-lsp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[test]
    fn lsp_config_from_empty_object_uses_defaults() {
        let result = serde_json::from_value::<LspConfig>(json!({})).unwrap();

        assert_eq!(result, LspConfig::default());
        assert!(result.enabled);
        assert!(result.exclude_prerelease());
        assert_eq!(result.registry, "https://registry.npmjs.org");
        assert_eq!(result.audit_threshold(), Some(Severity::Low));
        assert_eq!(result.cache.metadata_ttl, 300_000);
        assert_eq!(result.cache.audit_ttl, 1_800_000);
    }

    #[test]
    fn lsp_config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<LspConfig>(json!({
            "audit": {
                "maxSeverity": "high"
            }
        }))
        .unwrap();

        assert!(result.audit.enabled);
        assert_eq!(result.audit.max_severity, Severity::High);
        assert_eq!(result.cache, CacheConfig::default());
    }

    #[test]
    fn lsp_config_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<LspConfig>(json!({
            "enabled": false,
            "showPrerelease": true,
            "registry": "http://localhost:4873",
            "audit": {
                "enabled": false,
                "maxSeverity": "critical"
            },
            "cache": {
                "metadataTtl": 1000,
                "auditTtl": 2000
            }
        }))
        .unwrap();

        assert_eq!(
            result,
            LspConfig {
                enabled: false,
                show_prerelease: true,
                registry: "http://localhost:4873".to_string(),
                audit: AuditConfig {
                    enabled: false,
                    max_severity: Severity::Critical,
                },
                cache: CacheConfig {
                    metadata_ttl: 1000,
                    audit_ttl: 2000,
                },
            }
        );
        assert!(!result.exclude_prerelease());
        assert_eq!(result.audit_threshold(), None);
    }

    #[test]
    fn lsp_config_rejects_unknown_severity() {
        let result = serde_json::from_value::<LspConfig>(json!({
            "audit": { "maxSeverity": "catastrophic" }
        }));

        assert!(result.is_err());
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/safer-version-lsp"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(
            path,
            PathBuf::from("/home/user/.local/share/safer-version-lsp")
        );
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./safer-version-lsp"));
    }

    #[test]
    #[serial]
    fn data_dir_and_log_path_follow_xdg_data_home() {
        let previous = std::env::var("XDG_DATA_HOME").ok();
        // SAFETY: tests touching the environment run serially
        unsafe { std::env::set_var("XDG_DATA_HOME", "/tmp/xdg-data") };

        let dir = data_dir();
        let log = log_path();

        match previous {
            Some(value) => unsafe { std::env::set_var("XDG_DATA_HOME", value) },
            None => unsafe { std::env::remove_var("XDG_DATA_HOME") },
        }
        assert_eq!(dir, PathBuf::from("/tmp/xdg-data/safer-version-lsp"));
        assert_eq!(
            log,
            PathBuf::from("/tmp/xdg-data/safer-version-lsp/safer-version-lsp.log")
        );
    }
}
