use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use tally_config::Config;

/// Configuration file picked up from the working directory when `--config` is not given.
const DEFAULT_CONFIG: &str = "config.yml";

/// Command line arguments of the daemon.
#[derive(Debug, Parser)]
#[command(name = "tally", version, about = "A statsd-compatible metrics aggregation daemon")]
struct Cli {
    /// Path to the configuration file.
    ///
    /// Defaults to `config.yml` in the working directory, if present. All settings have
    /// defaults; without a file, the daemon listens on 0.0.0.0:8125 and flushes every 10
    /// seconds.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Render every flush to the console.
    #[arg(long)]
    console: bool,

    /// Override the configured listener port.
    #[arg(short, long)]
    port: Option<u16>,
}

pub fn execute() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => load_config(DEFAULT_CONFIG)?,
        None => Config::default(),
    };

    if cli.console {
        config.console.enabled = true;
    }
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    tally_log::init(&config.logging);
    tally_server::run(config).context("server failed")?;

    Ok(())
}

fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    Config::from_path(path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}
