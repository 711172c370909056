use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments shared by every driftwatch entry point
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CommonCommands {
    /// Reconcile the catalog against object storage (default behavior)
    Run {
        #[arg(
            long,
            help = "Treat this calendar day (YYYY-MM-DD) as today instead of the local date"
        )]
        date: Option<NaiveDate>,
    },
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

impl Default for CommonCommands {
    fn default() -> Self {
        CommonCommands::Run { date: None }
    }
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Initialize logging based on CLI arguments. `RUST_LOG` takes precedence.
    pub fn init_logging(args: &CommonArgs) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_log_level(args)));

        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    pub(crate) fn default_log_level(args: &CommonArgs) -> &'static str {
        if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            println!("{}", config_json(config)?);
        } else {
            println!("driftwatch configuration:");
            println!("=========================");
            println!("Catalog DSN: {}", redact_dsn(&config.database.dsn));
            println!(
                "Catalog max connections: {}",
                config.database.max_connections
            );
            println!("Storage DSN: {}", redact_dsn(&config.storage.dsn));
            println!("Listing page size: {}", config.storage.page_size);
            println!("Object extension: {}", config.reconcile.object_extension);
            println!(
                "In-flight buckets excluded today: {}",
                config.reconcile.in_flight_buckets
            );
            println!("Report file: {}", config.report.path.display());
        }
        Ok(())
    }

    /// Pretty-printed JSON of `config` with DSN passwords redacted
    pub fn config_json(config: &Configuration) -> Result<String> {
        let mut redacted = config.clone();
        redacted.database.dsn = redact_dsn(&config.database.dsn);
        redacted.storage.dsn = redact_dsn(&config.storage.dsn);
        serde_json::to_string_pretty(&redacted).context("Failed to serialize configuration to JSON")
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<()> {
        log::info!("Validating configuration...");
        config.validate()?;
        log::info!("Configuration validation passed");
        Ok(())
    }

    /// Handle commands that don't start a reconciliation run.
    ///
    /// `version` is the line printed by the `version` command. Returns `true`
    /// when the command was fully handled.
    pub fn handle_common_command(
        command: &CommonCommands,
        config: &Configuration,
        version: &str,
    ) -> Result<bool> {
        match command {
            CommonCommands::Config { json } => {
                display_config(config, *json)?;
                Ok(true)
            }
            CommonCommands::Validate => {
                validate_config(config)?;
                Ok(true)
            }
            CommonCommands::Version => {
                println!("{version}");
                Ok(true)
            }
            CommonCommands::Run { .. } => Ok(false),
        }
    }

    /// Version line of the calling binary, e.g. `driftwatch 0.1.0`.
    ///
    /// Callers pass their own `CARGO_PKG_NAME` and `CARGO_PKG_VERSION`.
    pub fn version_info(name: &str, version: &str) -> String {
        format!("{name} {version}")
    }

    /// Hide the password part of a DSN before printing it.
    pub fn redact_dsn(dsn: &str) -> String {
        match url::Url::parse(dsn) {
            Ok(mut url) if url.password().is_some() => {
                let _ = url.set_password(Some("****"));
                url.to_string()
            }
            _ => dsn.to_string(),
        }
    }
}
