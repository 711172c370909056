//! driftwatch
//!
//! Single-pass reconciliation of the metadata catalog against the raw
//! object storage it describes. Appends one report line per compared time
//! bucket and exits non-zero when the catalog cannot be read.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::Parser;
use common::Catalog;
use common::cli::{CommonArgs, CommonCommands, utils};
use common::config::Configuration;
use reconciler::{InFlightPolicy, ObjectStoreLister, Reconciler, ReportWriter, StorageEnumerator};

#[derive(Parser)]
#[command(name = "driftwatch")]
#[command(about = "driftwatch - catalog versus object storage drift detector")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<CommonCommands>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on CLI arguments
    utils::init_logging(&cli.common);

    let config = utils::load_config(cli.common.config.as_ref())?;

    let command = cli.command.unwrap_or_default();
    if utils::handle_common_command(&command, &config, &version_line())? {
        return Ok(());
    }

    config.validate().context("Invalid configuration")?;

    let today = match command {
        CommonCommands::Run { date: Some(date) } => date,
        _ => Local::now().date_naive(),
    };

    run(&config, today).await
}

fn version_line() -> String {
    utils::version_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

async fn run(config: &Configuration, today: NaiveDate) -> Result<()> {
    tracing::info!(
        catalog = %utils::redact_dsn(&config.database.dsn),
        storage = %utils::redact_dsn(&config.storage.dsn),
        report = %config.report.path.display(),
        today = %today,
        "Starting driftwatch"
    );

    let catalog = Catalog::connect(&config.database)
        .await
        .context("Failed to connect to catalog")?;

    let lister = ObjectStoreLister::from_dsn(config.storage.dsn.clone(), config.storage.page_size);
    let enumerator =
        StorageEnumerator::new(Arc::new(lister), config.reconcile.object_extension.clone());
    let policy = InFlightPolicy::new(config.reconcile.in_flight_buckets);

    let report_path = &config.report.path;
    let mut report = ReportWriter::open_append(report_path, Utc::now())
        .with_context(|| format!("Failed to open report file {}", report_path.display()))?;

    let catalog = Arc::new(catalog);
    let reconciler = Reconciler::new(catalog.clone(), enumerator, policy);
    let outcome = reconciler.run(today, &mut report).await;

    catalog.close().await;

    match outcome {
        Ok(summary) => {
            summary.log();
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                lines_written = report.lines_written(),
                "Reconciliation run aborted"
            );
            Err(e).context("Reconciliation run aborted")
        }
    }
}
