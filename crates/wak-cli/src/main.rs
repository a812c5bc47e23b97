use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use wak_config::{report_unused_keys, UnusedKeyPolicy, WakConfig};
use wak_reconcile::{FooterAction, ScanStatus, SectionVisibility};
use wak_repo::{AccountRepository, InMemoryAccountRepository, JsonFileAccountRepository};
use wak_runtime::{ImportReport, ReconcilerSettings, ScanReconciler};
use wak_scan::{ScanScript, ScriptedScanner};
use wak_schemas::{account_ids, CurrencyId, DeviceId, ScanError};

#[derive(Parser)]
#[command(name = "wak")]
#[command(about = "Wallet account kit CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Run a scripted account scan and print the reconciled result
    Scan {
        /// Currency id to scan (e.g. bitcoin)
        #[arg(long)]
        currency: String,

        /// Device id the scan runs against
        #[arg(long)]
        device: String,

        /// Path to a scan script JSON file
        #[arg(long)]
        script: PathBuf,

        /// JSON account store. Overrides repository.path from config.
        #[arg(long)]
        repo: Option<PathBuf>,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Toggle selection of an account id after the scan (repeatable)
        #[arg(long = "toggle")]
        toggles: Vec<String>,

        /// Select every scanned account
        #[arg(long, default_value_t = false)]
        select_all: bool,

        /// Unselect every scanned account
        #[arg(long, default_value_t = false, conflicts_with = "select_all")]
        unselect_all: bool,

        /// Stop the scan once this many accounts were discovered
        #[arg(long)]
        stop_after: Option<usize>,

        /// Persist the selection to the repository
        #[arg(long, default_value_t = false)]
        import: bool,
    },
}

#[derive(Serialize)]
struct ScanSummary {
    scan_id: Option<String>,
    status: ScanStatus,
    error: Option<ScanError>,
    scanned: Vec<String>,
    selected: Vec<String>,
    existing: Vec<String>,
    new_empty: Vec<String>,
    regular: Vec<String>,
    cant_create_account: bool,
    no_importable_accounts: bool,
    footer: FooterAction,
    sections: SectionVisibility,
}

#[derive(Serialize)]
struct ImportSummary {
    currency: Option<String>,
    imported: Vec<String>,
    failed: Vec<FailedImport>,
    while_scanning: bool,
    finished_at_utc: String,
}

#[derive(Serialize)]
struct FailedImport {
    account_id: String,
    error: String,
}

impl From<&ImportReport> for ImportSummary {
    fn from(r: &ImportReport) -> Self {
        Self {
            currency: r.currency.as_ref().map(|c| c.to_string()),
            imported: r.imported.clone(),
            failed: r
                .failed
                .iter()
                .map(|f| FailedImport {
                    account_id: f.account_id.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
            while_scanning: r.while_scanning,
            finished_at_utc: r.finished_at.to_rfc3339(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = wak_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Scan {
            currency,
            device,
            script,
            repo,
            config_paths,
            toggles,
            select_all,
            unselect_all,
            stop_after,
            import,
        } => {
            let cfg = load_settings(&config_paths)?;
            init_tracing(&cfg.log.filter);

            let script = ScanScript::from_json_file(&script)?;
            let repo = open_repository(repo.or_else(|| cfg.repository.path.clone()))?;
            let settings = ReconcilerSettings {
                channel_capacity: cfg.scan.channel_capacity,
            };

            let mut reconciler = ScanReconciler::mount(
                Arc::new(ScriptedScanner::new(script)),
                repo,
                settings,
                CurrencyId::new(currency),
                DeviceId::new(device),
            );

            match stop_after {
                Some(n) => {
                    while reconciler.session().scanned_accounts.len() < n
                        && reconciler.advance().await
                    {}
                    reconciler.stop(true);
                }
                None => {
                    reconciler.run_to_end().await;
                }
            }

            let scanned = reconciler.session().scanned_accounts.clone();
            if select_all {
                reconciler.select_all(&scanned);
            }
            if unselect_all {
                reconciler.unselect_all(&scanned);
            }
            for id in toggles {
                reconciler.toggle_select(id);
            }

            let summary = summarize(&reconciler);
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("serialize scan summary")?
            );

            if import {
                let report = reconciler.commit_import().await;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ImportSummary::from(&report))
                        .context("serialize import report")?
                );
                if !report.is_complete() {
                    anyhow::bail!(
                        "IMPORT_INCOMPLETE: {} of {} account(s) failed",
                        report.failed.len(),
                        report.attempted()
                    );
                }
            }
        }
    }

    Ok(())
}

fn load_settings(config_paths: &[String]) -> Result<WakConfig> {
    if config_paths.is_empty() {
        return Ok(WakConfig::default());
    }
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = wak_config::load_layered_yaml(&path_refs)?;
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        eprintln!(
            "CONFIG_UNUSED_KEYS (warn): {}",
            report.unused_leaf_pointers.join(", ")
        );
    }
    loaded.settings()
}

fn open_repository(path: Option<PathBuf>) -> Result<Arc<dyn AccountRepository>> {
    match path {
        Some(p) => Ok(Arc::new(JsonFileAccountRepository::open(p)?)),
        None => Ok(Arc::new(InMemoryAccountRepository::new())),
    }
}

fn summarize(r: &ScanReconciler) -> ScanSummary {
    let session = r.session();
    let cls = r.classify();
    ScanSummary {
        scan_id: r.scan_id().map(|id| id.to_string()),
        status: session.status,
        error: session.error.clone(),
        scanned: session.scanned_ids(),
        selected: session.selected_accounts().map(|a| a.id.clone()).collect(),
        existing: account_ids(&cls.existing),
        new_empty: account_ids(&cls.new_empty),
        regular: account_ids(&cls.regular),
        cant_create_account: cls.cant_create_account,
        no_importable_accounts: cls.no_importable_accounts,
        footer: FooterAction::derive(session, &cls),
        sections: SectionVisibility::derive(session, &cls),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(fallback_filter: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback_filter.into()),
        )
        .init();
    info!(filter = fallback_filter, "tracing initialised");
}
