use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use playlake::config::{EtlConfig, TimeBasis, config_path};
use playlake::pipeline::run_etl;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "playlake",
    version,
    about = "Turn song catalog and listening logs into partitioned parquet tables"
)]
pub struct Cli {
    /// Configuration file. Defaults to dl.json in the working directory.
    #[arg(short, long, global = true, env = "PLAYLAKE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for log files. Defaults to the platform data directory.
    #[arg(long, global = true, env = "PLAYLAKE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: RunArgs,

    /// Runs the full ETL when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run both stages: songs and artists, then users, time and songplays
    Run,

    /// Print the effective configuration with secrets redacted
    ShowConfig,
}

/// Overrides applied on top of the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Source location (directory, file:// or s3:// / s3a:// prefix)
    #[arg(short, long, global = true)]
    pub input: Option<String>,

    /// Output location (directory, file:// or s3:// / s3a:// prefix)
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Time zone for `start_time` and its calendar parts
    #[arg(long, value_enum, global = true)]
    pub time_basis: Option<TimeBasis>,

    /// Maximum number of source objects fetched at once
    #[arg(long, global = true)]
    pub fetch_concurrency: Option<usize>,
}

impl RunArgs {
    fn apply(self, config: &mut EtlConfig) {
        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(basis) = self.time_basis {
            config.time_basis = basis;
        }
        if let Some(concurrency) = self.fetch_concurrency {
            config.fetch_concurrency = concurrency;
        }
    }
}

fn effective_config(config_file: Option<PathBuf>, args: RunArgs) -> Result<EtlConfig> {
    let path = config_path(config_file);
    let mut config = EtlConfig::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

pub async fn run_command(cli: Cli) -> Result<()> {
    let config = effective_config(cli.config, cli.overrides)?;
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let report = run_etl(&config).await.context("ETL run failed")?;
            for table in &report.tables {
                println!("{}", table.summary());
            }
            println!("{}", report.summary());
            Ok(())
        }
        Commands::ShowConfig => {
            println!("{}", config.to_json()?);
            Ok(())
        }
    }
}
