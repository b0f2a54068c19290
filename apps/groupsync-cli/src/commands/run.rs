//! Reconcile (default) and export (`--print`) runs.

use clap::Args;
use groupsync_directory::{DirectoryPort, RetryingDirectory, StaticToken, WorkspaceClient};
use groupsync_reconcile::{
    export_directory, DesiredStateStore, ReconcileError, ReconciliationContext,
    ReconciliationEngine, RunReport,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::load_config;
use crate::discovery::load_desired_groups;
use crate::error::CliResult;

/// Environment variable holding the OAuth access token.
pub const TOKEN_ENV: &str = "GROUPSYNC_ACCESS_TOKEN";

/// Arguments for a run
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the run configuration
    #[arg(long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Apply changes (without this flag the run only reports them)
    #[arg(long)]
    pub confirm: bool,

    /// Print the current directory state as groups.yaml and exit
    #[arg(long, conflicts_with = "confirm")]
    pub print: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute a run
pub async fn execute(args: RunArgs) -> CliResult<()> {
    let config = load_config(&args.config)?;
    info!(
        bot_id = %config.bot_id,
        secret_version = config.secret_version.as_deref().unwrap_or("-"),
        "Loaded configuration"
    );

    // Desired state is validated before any credentials are touched.
    let desired = if args.print {
        None
    } else {
        let groups_dir = config.groups_dir(&args.config);
        Some(load_store(&groups_dir)?)
    };

    let tokens = Arc::new(StaticToken::from_env(TOKEN_ENV)?);
    let client = WorkspaceClient::new(config.workspace_config(), tokens)?;
    let directory = Arc::new(RetryingDirectory::new(
        client,
        config.retry.to_retry_config(),
    ));

    match desired {
        None => {
            let document = export_directory(directory.as_ref()).await?;
            print!("{}", serde_yaml::to_string(&document)?);
        }
        Some(desired) => {
            let report = reconcile(directory, desired, args.confirm).await?;
            print!("{}", render_report(&report, args.json)?);
            if !report.confirm && !report.is_converged() {
                eprintln!("\nRe-run with --confirm to apply these changes.");
            }
        }
    }

    Ok(())
}

/// Discovers and validates every `groups.yaml` below `groups_dir`.
pub fn load_store(groups_dir: &Path) -> CliResult<DesiredStateStore> {
    let groups = load_desired_groups(groups_dir)?;
    let store = DesiredStateStore::load(groups).map_err(ReconcileError::from)?;
    info!(
        groups_path = %groups_dir.display(),
        groups = store.len(),
        "Loaded desired state"
    );
    Ok(store)
}

/// Runs the engine once against `directory`.
pub async fn reconcile<D>(
    directory: Arc<D>,
    desired: DesiredStateStore,
    confirm: bool,
) -> CliResult<RunReport>
where
    D: DirectoryPort + ?Sized,
{
    let engine = ReconciliationEngine::new(directory, ReconciliationContext::new(desired, confirm));
    Ok(engine.run().await?)
}

/// Formats a report as text or pretty JSON.
pub fn render_report(report: &RunReport, json: bool) -> CliResult<String> {
    if json {
        let mut out = serde_json::to_string_pretty(report)?;
        out.push('\n');
        Ok(out)
    } else {
        Ok(report.to_string())
    }
}
