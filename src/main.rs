/*============================================================
  Synavera Project: Loop Support
  Module: loop_support_core::main
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Entry point for the Loop Support CLI. Registers configured
    support plugins, then runs a version check, lists or loads
    testing scenarios, resets a plugin, or describes the
    registry.

  Security / Safety Notes:
    Operates within user privileges. Reads local manifests and
    scenario directories and performs HTTPS GET requests only.

  Dependencies:
    clap for CLI parsing, chrono for session stamps.

  Operational Scope:
    Invoked by operators and scripts; JSON output is stable for
    downstream tooling.

  Revision History:
    2026-10-19 COD  Authored Loop Support CLI runtime.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Synavera cadence
    - Configurable execution via CLI and config file
============================================================*/

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};

use loop_support_core::builtin::{ReleaseManifestSupport, ScenarioDirectorySupport};
use loop_support_core::{
    AlertIssuer, Locator, Logger, LoggingAlertIssuer, Result, ScenarioCatalog, SupportConfig,
    SupportError, SupportManager,
};

/// Command-line arguments for Loop Support.
#[derive(Debug, Parser)]
#[command(
    name = "loop-support",
    version,
    author = "Synavera Systems",
    about = "Aggregates version checks and testing scenarios across support plugins"
)]
struct Cli {
    /// Override configuration file path.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, value_name = "PATH", global = true)]
    log: Option<PathBuf>,
    /// Enable verbose logging to stderr.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ask every version-check plugin whether an update is needed.
    CheckVersion {
        /// Emit the full report as JSON.
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// List testing scenarios recognized by scenario plugins.
    Scenarios {
        /// Scan this directory instead of the configured one.
        #[arg(long, value_name = "PATH")]
        dir: Option<PathBuf>,
        /// Emit scenarios as JSON.
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Make one candidate scenario the active one.
    Load {
        /// Scenario file name, path, or `file://` locator.
        scenario: String,
        /// Scan this directory instead of the configured one.
        #[arg(long, value_name = "PATH")]
        dir: Option<PathBuf>,
    },
    /// Reset loop state held by one plugin.
    Reset {
        /// Identifier of the plugin to reset.
        identifier: String,
    },
    /// Describe registered plugins and their capabilities.
    Supports,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[Loop-Support] {}", err);
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = SupportConfig::load_from_optional_path(cli.config.as_deref())?;

    let session_stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = cli
        .log
        .clone()
        .unwrap_or_else(|| config.log_dir().join(format!("support_{session_stamp}.log")));
    let logger = Arc::new(Logger::new(Some(log_path), cli.verbose)?);
    logger.info("INIT", "Loop Support awakening.");

    let issuer = Arc::new(LoggingAlertIssuer::new(logger.clone()));
    let alert_issuer: Arc<dyn AlertIssuer> = issuer.clone();
    let manager =
        SupportManager::from_config(&config, Arc::downgrade(&alert_issuer), logger.clone());
    register_builtin_supports(&manager, &config)?;

    match cli.command {
        Command::CheckVersion { json } => {
            let report = manager.check_version_report().await;
            if json {
                print_json(&report)?;
            } else {
                println!(
                    "→ {} {}: {}",
                    manager.build().bundle_identifier,
                    manager.build().current_version,
                    report.result
                );
                for entry in &report.outcomes {
                    println!("  {:<32} {:?}", entry.identifier, entry.outcome);
                }
            }
        }
        Command::Scenarios { dir, json } => {
            let catalog = open_catalog(dir, &config, &logger)?;
            let mut updates = catalog.subscribe();
            catalog.rescan().await?;
            let candidates = updates.borrow_and_update().clone();
            let scenarios = manager.enumerate_scenarios(&candidates).await;
            if json {
                print_json(&scenarios)?;
            } else if scenarios.is_empty() {
                println!("→ No scenarios found in {}", catalog.directory().display());
            } else {
                for scenario in &scenarios {
                    println!("  {:<32} {}", scenario.name, scenario.url);
                }
            }
        }
        Command::Load { scenario, dir } => {
            let catalog = open_catalog(dir, &config, &logger)?;
            let candidates = catalog.rescan().await?;
            let locator = find_candidate(&candidates, &scenario).ok_or_else(|| {
                SupportError::Config(format!(
                    "{scenario} is not a scenario file in {}",
                    catalog.directory().display()
                ))
            })?;
            let loaded = manager
                .activate_scenario(&catalog, &locator)
                .await
                .ok_or_else(|| {
                    SupportError::Config(format!("No scenario plugin recognizes {locator}"))
                })?;
            println!("→ Loaded {} ({})", loaded.name, locator);
        }
        Command::Reset { identifier } => {
            if !manager.reset_loop(&identifier) {
                return Err(SupportError::Config(format!(
                    "No resettable support registered as `{identifier}`"
                )));
            }
            println!("→ {identifier} reset");
        }
        Command::Supports => {
            for support in manager.available_supports() {
                println!("  {:<32} {}", support.identifier, support.capabilities);
            }
            if manager.loop_needs_reset() {
                println!("→ Loop reset required");
            }
        }
    }

    for alert in issuer.active_alerts() {
        println!("! {}: {}", alert.title, alert.body);
    }

    logger.info("COMPLETE", "Support session closed.");
    logger.finalize()?;
    Ok(ExitCode::SUCCESS)
}

fn register_builtin_supports(manager: &SupportManager, config: &SupportConfig) -> Result<()> {
    let request_timeout = Duration::from_secs(config.version_check.timeout);
    for manifest in &config.release_manifests {
        manager.add_support(Arc::new(ReleaseManifestSupport::new(manifest, request_timeout)?));
    }
    for source in &config.scenario_sources {
        manager.add_support(Arc::new(ScenarioDirectorySupport::new(source)));
    }
    Ok(())
}

fn open_catalog(
    dir: Option<PathBuf>,
    config: &SupportConfig,
    logger: &Arc<Logger>,
) -> Result<ScenarioCatalog> {
    match dir {
        Some(dir) => Ok(ScenarioCatalog::new(dir, logger.clone())),
        None => ScenarioCatalog::from_config(config, logger.clone()).ok_or_else(|| {
            SupportError::Config(
                "Scenarios are disabled; set scenarios_enabled = true or pass --dir".into(),
            )
        }),
    }
}

/// Match a locator, a path, or a bare file name against the candidates.
fn find_candidate(candidates: &[Locator], raw: &str) -> Option<Locator> {
    candidates
        .iter()
        .find(|candidate| {
            candidate.as_str() == raw
                || candidate.to_path().is_some_and(|path| {
                    path == Path::new(raw) || path.file_name() == Some(OsStr::new(raw))
                })
        })
        .cloned()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| SupportError::Serialization(format!("Failed to render JSON: {err}")))?;
    println!("{rendered}");
    Ok(())
}
