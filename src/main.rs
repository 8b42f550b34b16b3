use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};

use safer_version_lsp::config::LspConfig;
use safer_version_lsp::lsp::evaluator::{EvaluationSettings, evaluate_all};
use safer_version_lsp::package_manager::{create_service, detect, find_workspace_root};
use safer_version_lsp::parser::{PackageJsonParser, Parser as _};
use safer_version_lsp::version::audit::NpmAuditClient;
use safer_version_lsp::version::overlay::SafetyStatus;
use safer_version_lsp::version::registries::NpmRegistry;
use safer_version_lsp::version::types::QuarantinePolicy;

#[derive(Parser)]
#[command(name = "safer-version-lsp")]
#[command(
    version,
    about = "Language Server that recommends dependency versions outside the release-age quarantine"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a package.json once and print the recommendations
    Check {
        /// Path to package.json
        #[arg(default_value = "package.json")]
        manifest: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        None => runtime.block_on(safer_version_lsp::lsp::server::run_server()),
        Some(Command::Check { manifest }) => runtime.block_on(check(&manifest)),
    }
}

async fn check(manifest: &Path) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(manifest)
        .await
        .with_context(|| format!("failed to read {}", manifest.display()))?;
    let dir = manifest
        .canonicalize()?
        .parent()
        .map(Path::to_path_buf)
        .context("manifest has no parent directory")?;

    let root = find_workspace_root(&dir, &dir);
    let service = create_service(detect(&root, &content))
        .context("no package manager detected (packageManager field or lock file)")?;
    let pm_config = service.config(&root).await;
    println!(
        "{} (minimum release age: {} minutes)",
        service.info().full_spec,
        pm_config.minimum_release_age_minutes
    );

    let config = LspConfig::default();
    let packages = PackageJsonParser::new().parse(&content)?;
    let settings = EvaluationSettings::new(
        &config,
        QuarantinePolicy::new(pm_config.minimum_release_age_minutes),
        Utc::now(),
    );
    let registry = NpmRegistry::new(&config.registry);
    let audit = NpmAuditClient::new(&config.registry);

    for evaluation in evaluate_all(&registry, &audit, packages, settings).await {
        let status = evaluation
            .versions
            .iter()
            .find(|v| v.version == evaluation.current_version)
            .map(|v| SafetyStatus::of(v, settings.audit).to_string())
            .unwrap_or_else(|| "? Not published".to_string());
        let recommendation = &evaluation.recommendation;
        let targets: Vec<String> = [
            recommendation.same_major.as_ref().map(|v| format!("↑ {}", v.version)),
            recommendation.latest_major.as_ref().map(|v| format!("🚀 {}", v.version)),
        ]
        .into_iter()
        .flatten()
        .collect();

        println!(
            "{}@{}: {} {}",
            evaluation.package.name,
            evaluation.current_version,
            status,
            targets.join(" ")
        );
    }

    Ok(())
}
