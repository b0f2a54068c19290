//! groupsync - declarative Google Groups reconciliation

use clap::Parser;

use groupsync_cli::commands::run::{self, RunArgs};
use groupsync_cli::logging::{init_logging, LogFormat};
use groupsync_cli::CliResult;

/// Reconcile Google Groups against groups.yaml files
#[derive(Parser)]
#[command(name = "groupsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level or filter directive (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(flatten)]
    run: RunArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match start(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn start(cli: Cli) -> CliResult<()> {
    init_logging(&cli.log_level, cli.log_format)?;
    run::execute(cli.run).await
}
