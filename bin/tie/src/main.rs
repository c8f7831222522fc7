//! ---
//! tie_section: "06-command-line"
//! tie_subsection: "binary"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "Binary entrypoint for the HL7 feed simulator."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tie_common::config::{AppConfig, TransportMode};
use tie_common::logging::init_tracing;
use tie_feed::Feed;
use tie_transport::ConsoleSink;
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Stream simulated HL7 v2 admissions built from a patient CSV",
    long_about = None
)]
struct Cli {
    /// Where to send the messages
    #[arg(short = 'm', long, value_enum)]
    mode: Option<CliMode>,

    /// Destination host; include the scheme for http (e.g. http://localhost)
    #[arg(short = 'd', long)]
    host: Option<String>,

    /// Destination port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Request path for http mode
    #[arg(short = 'P', long)]
    path: Option<String>,

    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    /// Patient CSV to read
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Pause between messages in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Seed for control identifiers and ward selection
    #[arg(long)]
    seed: Option<u64>,

    /// Stop one record before the end of the input
    #[arg(long)]
    skip_final_record: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    Stdout,
    Http,
    Mllp,
}

impl From<CliMode> for TransportMode {
    fn from(value: CliMode) -> Self {
        match value {
            CliMode::Stdout => TransportMode::Stdout,
            CliMode::Http => TransportMode::Http,
            CliMode::Mllp => TransportMode::Mllp,
        }
    }
}

impl Cli {
    fn config_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(path) = &self.config {
            candidates.push(path.clone());
        }
        candidates.push(PathBuf::from("configs/tie.toml"));
        candidates
    }

    /// Layer command-line flags over the loaded configuration.
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(mode) = self.mode {
            config.transport.mode = mode.into();
        }
        if let Some(host) = &self.host {
            config.transport.host = Some(host.clone());
        }
        if let Some(port) = self.port {
            config.transport.port = Some(port);
        }
        if let Some(path) = &self.path {
            config.transport.path = Some(path.clone());
        }
        if let Some(input) = &self.input {
            config.feed.input = input.clone();
        }
        if let Some(interval_ms) = self.interval_ms {
            config.feed.interval = Duration::from_millis(interval_ms);
        }
        if let Some(seed) = self.seed {
            config.feed.seed = Some(seed);
        }
        if self.skip_final_record {
            config.feed.skip_final_record = true;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = AppConfig::load_with_source(&cli.config_candidates())?;
    let mut config = loaded.config;
    cli.apply_overrides(&mut config);
    config
        .validate()
        .context("invalid feed configuration after applying command-line flags")?;

    init_tracing("tie", &config.logging)?;
    match &loaded.source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => info!("no configuration file found; running on defaults"),
    }
    info!(mode = %config.transport.mode, "starting feed");

    let mut feed = Feed::load(&config, ConsoleSink::stdout())
        .with_context(|| format!("unable to start feed from {}", config.feed.input.display()))?;
    let summary = feed.run(shutdown_signal()).await?;

    info!(
        attempted = summary.attempted,
        delivered = summary.delivered,
        failed = summary.failed,
        interrupted = summary.interrupted,
        "feed finished"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(error = %err, "unable to listen for ctrl-c; feed will run to completion");
        std::future::pending::<()>().await;
    }
}
