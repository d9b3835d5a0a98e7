use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fg_cli::commands::{policy, sessions, snapshot_engine, today, usage};
use fg_cli::snapshot::SnapshotSource;
use fg_cli::{Cli, Commands, Config};

/// Load and validate config, applying the `--snapshot` override.
fn load_config(config_path: Option<&Path>, snapshot: Option<&Path>) -> Result<Config> {
    let mut config = Config::load_from(config_path).context("failed to load configuration")?;
    if let Some(dir) = snapshot {
        config.snapshot_dir = dir.to_path_buf();
    }
    config.validate().context("invalid policy")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn open_snapshot(config: &Config) -> Result<SnapshotSource> {
    SnapshotSource::open(&config.snapshot_dir).with_context(|| {
        format!(
            "failed to open snapshot {}",
            config.snapshot_dir.display()
        )
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = load_config(cli.config.as_deref(), cli.snapshot.as_deref())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Usage { start, end, json } => {
            let source = open_snapshot(&config)?;
            let engine = snapshot_engine(&source, config.policy.clone());
            usage::run(&mut out, &engine, start, end.as_deref(), *json)?;
        }
        Commands::Today { json } => {
            let source = open_snapshot(&config)?;
            let engine = snapshot_engine(&source, config.policy.clone());
            today::run(&mut out, &engine, *json)?;
        }
        Commands::Sessions { start, end } => {
            let source = open_snapshot(&config)?;
            let engine = snapshot_engine(&source, config.policy.clone());
            sessions::run(&mut out, &engine, start, end.as_deref())?;
        }
        Commands::Policy => {
            policy::run(&mut out, &config.policy)?;
        }
    }

    out.flush()?;
    Ok(())
}
