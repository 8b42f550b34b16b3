use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info, warn};

use crate::config::LspConfig;
use crate::lsp::code_action::{EvaluationIndex, generate_version_actions, version_edit};
use crate::lsp::code_lens::{
    APPLY_VERSION_COMMAND, ApplyVersionArgs, REFRESH_COMMAND, SHOW_CONFIG_COMMAND,
    SHOW_VULNERABILITIES_COMMAND, ShowConfigArgs, ShowVulnerabilitiesArgs, generate_code_lenses,
};
use crate::lsp::diagnostics::generate_diagnostics;
use crate::lsp::evaluator::{DependencyEvaluation, EvaluationSettings, evaluate_all};
use crate::package_manager::{create_service, detect, find_workspace_root};
use crate::parser::package_json::PackageJsonParser;
use crate::parser::traits::Parser;
use crate::parser::types::is_package_json;
use crate::version::audit::{AuditSource, NpmAuditClient};
use crate::version::cache::TtlCache;
use crate::version::overlay::VulnerabilitySummary;
use crate::version::registries::npm::NpmRegistry;
use crate::version::registry::Registry;
use crate::version::types::QuarantinePolicy;

/// Metadata and advisory sources used for evaluation
#[derive(Clone)]
struct Sources {
    registry: Arc<dyn Registry>,
    audit: Arc<dyn AuditSource>,
}

impl Sources {
    fn from_config(config: &LspConfig) -> Self {
        Self {
            registry: Arc::new(NpmRegistry::with_cache(
                &config.registry,
                TtlCache::new(config.cache.metadata_ttl),
            )),
            audit: Arc::new(NpmAuditClient::with_cache(
                &config.registry,
                TtlCache::new(config.cache.audit_ttl),
            )),
        }
    }
}

pub struct Backend {
    client: Client,
    parser: PackageJsonParser,
    sources: RwLock<Sources>,
    /// Sources are rebuilt from config on change; false when injected via [`Backend::build`]
    owns_sources: bool,
    config: RwLock<LspConfig>,
    documents: RwLock<HashMap<Url, String>>,
    evaluations: RwLock<HashMap<Url, Vec<DependencyEvaluation>>>,
    workspace_folders: RwLock<Vec<PathBuf>>,
    code_lens_refresh_supported: AtomicBool,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        let config = LspConfig::default();
        let sources = Sources::from_config(&config);
        Self::with_sources(client, sources, true, config)
    }

    /// Build a Backend with custom registry and audit source
    pub fn build(client: Client, registry: Arc<dyn Registry>, audit: Arc<dyn AuditSource>) -> Self {
        Self::with_sources(
            client,
            Sources { registry, audit },
            false,
            LspConfig::default(),
        )
    }

    fn with_sources(client: Client, sources: Sources, owns_sources: bool, config: LspConfig) -> Self {
        Self {
            client,
            parser: PackageJsonParser::new(),
            sources: RwLock::new(sources),
            owns_sources,
            config: RwLock::new(config),
            documents: RwLock::new(HashMap::new()),
            evaluations: RwLock::new(HashMap::new()),
            workspace_folders: RwLock::new(Vec::new()),
            code_lens_refresh_supported: AtomicBool::new(false),
        }
    }

    pub fn server_capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(
                TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    ..Default::default()
                },
            )),
            code_lens_provider: Some(CodeLensOptions {
                resolve_provider: Some(false),
            }),
            code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
            execute_command_provider: Some(ExecuteCommandOptions {
                commands: vec![
                    APPLY_VERSION_COMMAND.to_string(),
                    REFRESH_COMMAND.to_string(),
                    SHOW_VULNERABILITIES_COMMAND.to_string(),
                    SHOW_CONFIG_COMMAND.to_string(),
                ],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Replace the config, rebuilding owned sources when their settings changed
    async fn apply_config(&self, config: LspConfig) {
        let mut current = self.config.write().await;
        let sources_changed =
            current.registry != config.registry || current.cache != config.cache;
        if self.owns_sources && sources_changed {
            info!("Registry settings changed, rebuilding sources");
            *self.sources.write().await = Sources::from_config(&config);
        }
        *current = config;
    }

    /// Directory holding the release-age config for a manifest
    async fn workspace_root(&self, uri: &Url) -> PathBuf {
        let folders = self.workspace_folders.read().await;

        let Some(manifest_dir) = uri
            .to_file_path()
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf))
        else {
            return folders.first().cloned().unwrap_or_else(|| PathBuf::from("."));
        };

        let folder = folders
            .iter()
            .filter(|folder| manifest_dir.starts_with(folder))
            .max_by_key(|folder| folder.components().count())
            .cloned()
            .unwrap_or_else(|| manifest_dir.clone());

        find_workspace_root(&manifest_dir, &folder)
    }

    /// Evaluate every dependency of a manifest and publish the resulting diagnostics
    async fn evaluate_document(&self, uri: Url, content: String) {
        let evaluations = self.evaluate_content(&uri, &content).await;

        // A newer revision may have arrived while this one was evaluated
        if self.documents.read().await.get(&uri) != Some(&content) {
            debug!("Discarding stale evaluation for {}", uri);
            return;
        }

        let audit = self.config.read().await.audit_threshold();
        let diagnostics = generate_diagnostics(&evaluations, audit);

        self.client
            .log_message(
                MessageType::LOG,
                format!(
                    "Evaluated {} dependencies, publishing {} diagnostics for {}",
                    evaluations.len(),
                    diagnostics.len(),
                    uri
                ),
            )
            .await;

        self.evaluations
            .write()
            .await
            .insert(uri.clone(), evaluations);
        self.client.publish_diagnostics(uri, diagnostics, None).await;
        self.request_code_lens_refresh().await;
    }

    async fn evaluate_content(&self, uri: &Url, content: &str) -> Vec<DependencyEvaluation> {
        let config = self.config.read().await.clone();
        if !config.enabled {
            return vec![];
        }

        let root = self.workspace_root(uri).await;
        let Some(service) = create_service(detect(&root, content)) else {
            debug!("No package manager detected for {}", uri);
            return vec![];
        };
        let pm_config = service.config(&root).await;
        info!(
            "Using {} at {} with minimum release age {} minutes",
            service.info().full_spec,
            root.display(),
            pm_config.minimum_release_age_minutes
        );

        let Some(packages) = self
            .parser
            .parse(content)
            .inspect_err(|e| warn!("Failed to parse {}: {}", uri, e))
            .ok()
        else {
            return vec![];
        };

        let settings = EvaluationSettings::new(
            &config,
            QuarantinePolicy::new(pm_config.minimum_release_age_minutes),
            Utc::now(),
        );
        let sources = self.sources.read().await.clone();

        evaluate_all(&*sources.registry, &*sources.audit, packages, settings).await
    }

    async fn reevaluate_open_documents(&self) {
        let documents: Vec<(Url, String)> = self
            .documents
            .read()
            .await
            .iter()
            .map(|(uri, content)| (uri.clone(), content.clone()))
            .collect();

        for (uri, content) in documents {
            self.evaluate_document(uri, content).await;
        }
    }

    async fn request_code_lens_refresh(&self) {
        if !self.code_lens_refresh_supported.load(Ordering::Relaxed) {
            return;
        }
        if let Err(e) = self.client.code_lens_refresh().await {
            warn!("Code lens refresh failed: {}", e);
        }
    }

    async fn apply_version(&self, args: ApplyVersionArgs) -> Result<()> {
        let evaluations = self.evaluations.read().await;
        let Some(package) = evaluations
            .get(&args.uri)
            .into_iter()
            .flatten()
            .map(|evaluation| &evaluation.package)
            .find(|package| package.name == args.name && package.section.as_str() == args.section)
        else {
            warn!("No {} in {} of {}", args.name, args.section, args.uri);
            return Ok(());
        };
        let edit = version_edit(&args.version, package, &args.uri);
        drop(evaluations);

        let response = self.client.apply_edit(edit).await?;
        if !response.applied {
            warn!(
                "Client rejected edit for {}: {}",
                args.name,
                response.failure_reason.unwrap_or_default()
            );
        }
        Ok(())
    }

    async fn refresh(&self) {
        info!("Clearing caches and re-evaluating open documents");
        let sources = self.sources.read().await.clone();
        sources.registry.clear_cache();
        sources.audit.clear_cache();
        self.reevaluate_open_documents().await;
    }

    async fn show_config(&self, args: ShowConfigArgs) {
        let config = self.config.read().await.clone();

        let (root, manifest_path) = match &args.uri {
            Some(uri) => (self.workspace_root(uri).await, uri.to_file_path().ok()),
            None => {
                let Some(folder) = self.workspace_folders.read().await.first().cloned() else {
                    self.client
                        .show_message(MessageType::INFO, "No workspace folder open")
                        .await;
                    return;
                };
                let manifest_path = folder.join("package.json");
                (folder, Some(manifest_path))
            }
        };

        let open_document = match &args.uri {
            Some(uri) => self.documents.read().await.get(uri).cloned(),
            None => None,
        };
        let manifest = match (open_document, manifest_path) {
            (Some(content), _) => content,
            (None, Some(path)) => tokio::fs::read_to_string(&path)
                .await
                .inspect_err(|e| debug!("No manifest at {}: {}", path.display(), e))
                .unwrap_or_default(),
            (None, None) => String::new(),
        };

        let package_manager = match create_service(detect(&root, &manifest)) {
            Some(service) => {
                let pm_config = service.config(&root).await;
                Some((
                    service.info().full_spec.clone(),
                    pm_config.minimum_release_age_minutes,
                ))
            }
            None => None,
        };

        let message = describe_config(
            &config,
            package_manager
                .as_ref()
                .map(|(spec, minutes)| (spec.as_str(), *minutes)),
        );
        self.client.show_message(MessageType::INFO, message).await;
    }

    async fn show_vulnerabilities(&self, args: ShowVulnerabilitiesArgs) {
        let mut message = format!(
            "{}@{}: {}",
            args.name,
            args.version,
            VulnerabilitySummary::new(&args.vulnerabilities)
        );
        for vuln in &args.vulnerabilities {
            message.push_str(&format!(
                "\n{} [{}] {} {}",
                vuln.severity.icon(),
                vuln.severity.label(),
                vuln.title,
                vuln.url
            ));
        }

        self.client
            .show_message(MessageType::WARNING, message.trim_end())
            .await;
    }
}

/// One-line summary of the settings and the detected package manager
fn describe_config(config: &LspConfig, package_manager: Option<(&str, u64)>) -> String {
    let lens = if config.enabled { "Enabled" } else { "Disabled" };
    let prerelease = if config.show_prerelease {
        "Shown"
    } else {
        "Hidden"
    };
    let head = format!("Lens: {lens} | Pre-releases: {prerelease}");

    match package_manager {
        None => format!("{head} | No package manager detected"),
        Some((spec, 0)) => {
            format!("{head} | Package Manager: {spec} | No time quarantine configured")
        }
        Some((spec, minutes)) => format!(
            "{head} | Package Manager: {spec} | Quarantine: {minutes} min ({}d {}h)",
            minutes / (60 * 24),
            minutes % (60 * 24) / 60
        ),
    }
}

/// Workspace folders as paths, falling back to the root URI
#[allow(deprecated)]
fn workspace_folders(params: &InitializeParams) -> Vec<PathBuf> {
    let folders: Vec<PathBuf> = params
        .workspace_folders
        .iter()
        .flatten()
        .filter_map(|folder| folder.uri.to_file_path().ok())
        .collect();
    if !folders.is_empty() {
        return folders;
    }

    params
        .root_uri
        .iter()
        .filter_map(|uri| uri.to_file_path().ok())
        .collect()
}

fn command_argument<T: serde::de::DeserializeOwned>(arguments: Vec<Value>) -> Result<T> {
    let value = arguments
        .into_iter()
        .next()
        .ok_or_else(|| Error::invalid_params("missing command argument"))?;
    serde_json::from_value(value).map_err(|e| Error::invalid_params(e.to_string()))
}

fn optional_command_argument<T: serde::de::DeserializeOwned + Default>(
    arguments: Vec<Value>,
) -> Result<T> {
    if arguments.is_empty() {
        return Ok(T::default());
    }
    command_argument(arguments)
}

/// Read config from either `{ "saferVersion": {...} }` or the bare object
fn parse_settings(settings: Value) -> Option<LspConfig> {
    let value = match settings {
        Value::Object(mut map) if map.contains_key("saferVersion") => map.remove("saferVersion")?,
        other => other,
    };
    if value.is_null() {
        return None;
    }
    serde_json::from_value(value)
        .inspect_err(|e| warn!("Ignoring invalid settings: {}", e))
        .ok()
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        self.client
            .log_message(MessageType::INFO, "LSP server initializing")
            .await;

        if let Some(config) = params
            .initialization_options
            .clone()
            .and_then(parse_settings)
        {
            self.apply_config(config).await;
        }

        *self.workspace_folders.write().await = workspace_folders(&params);

        let refresh_supported = params
            .capabilities
            .workspace
            .and_then(|workspace| workspace.code_lens)
            .and_then(|code_lens| code_lens.refresh_support)
            .unwrap_or(false);
        self.code_lens_refresh_supported
            .store(refresh_supported, Ordering::Relaxed);

        Ok(InitializeResult {
            capabilities: Self::server_capabilities(),
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "LSP server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.client
            .log_message(MessageType::INFO, "LSP server shutting down")
            .await;
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        if !is_package_json(uri.as_str()) {
            return;
        }

        self.client
            .log_message(MessageType::LOG, format!("Document opened: {}", uri))
            .await;

        let content = params.text_document.text;
        self.documents
            .write()
            .await
            .insert(uri.clone(), content.clone());
        self.evaluate_document(uri, content).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if !is_package_json(uri.as_str()) {
            return;
        }

        // With FULL sync mode, the last content change contains the full document text
        let Some(content) = params.content_changes.into_iter().last().map(|c| c.text) else {
            return;
        };

        self.client
            .log_message(MessageType::LOG, format!("Document changed: {}", uri))
            .await;

        self.documents
            .write()
            .await
            .insert(uri.clone(), content.clone());
        self.evaluate_document(uri, content).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.write().await.remove(&uri);
        if self.evaluations.write().await.remove(&uri).is_some() {
            self.client.publish_diagnostics(uri, vec![], None).await;
        }
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let Some(config) = parse_settings(params.settings) else {
            return;
        };
        info!("Configuration changed");
        self.apply_config(config).await;
        self.reevaluate_open_documents().await;
    }

    async fn code_lens(&self, params: CodeLensParams) -> Result<Option<Vec<CodeLens>>> {
        if !self.config.read().await.enabled {
            return Ok(None);
        }

        let uri = params.text_document.uri;
        let evaluations = self.evaluations.read().await;
        let Some(evaluations) = evaluations.get(&uri) else {
            return Ok(None);
        };

        let lenses: Vec<CodeLens> = evaluations
            .iter()
            .flat_map(|evaluation| generate_code_lenses(evaluation, &uri))
            .collect();
        Ok(Some(lenses))
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let config = self.config.read().await.clone();
        if !config.enabled {
            return Ok(None);
        }

        let uri = params.text_document.uri;
        let evaluations = self.evaluations.read().await;
        let Some(evaluations) = evaluations.get(&uri) else {
            return Ok(None);
        };

        let index = EvaluationIndex::new(evaluations);
        let actions: CodeActionResponse = index
            .in_range(params.range)
            .into_iter()
            .flat_map(|evaluation| {
                generate_version_actions(evaluation, config.audit_threshold(), &uri)
            })
            .map(CodeActionOrCommand::CodeAction)
            .collect();

        if actions.is_empty() {
            Ok(None)
        } else {
            Ok(Some(actions))
        }
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        debug!("Executing {}", params.command);

        match params.command.as_str() {
            APPLY_VERSION_COMMAND => {
                self.apply_version(command_argument(params.arguments)?)
                    .await?;
            }
            REFRESH_COMMAND => {
                self.refresh().await;
            }
            SHOW_VULNERABILITIES_COMMAND => {
                self.show_vulnerabilities(command_argument(params.arguments)?)
                    .await;
            }
            SHOW_CONFIG_COMMAND => {
                self.show_config(optional_command_argument(params.arguments)?)
                    .await;
            }
            other => {
                return Err(Error::invalid_params(format!("Unknown command: {other}")));
            }
        }

        Ok(None)
    }
}
