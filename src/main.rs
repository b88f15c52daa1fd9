use anyhow::Result;
use clap::Parser;

use delivery_metrics::cli::commands::{Command, ReportCommand};
use delivery_metrics::cli::Cli;
use delivery_metrics::{init_telemetry, MetricsConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing or unreadable .env is not fatal.
    let _ = MetricsConfig::load_env_file();

    let config = cli.resolve_config()?;
    init_telemetry(&config.observability)?;

    ReportCommand::new(cli.command, cli.stdout, config)
        .execute()
        .await
}
