//! Shopwatch CLI - Main Entry Point
//!
//! Offline tooling around journey evidence: replay recorded driver events
//! into artifacts, validate web vitals, lint action plans, and print the
//! probe configuration.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use shopwatch_core::ProbeConfig;

mod commands;
mod output;

use commands::{config, evidence, lint, vitals};

/// Shopwatch - storefront journey evidence tooling
#[derive(Parser)]
#[command(name = "shopwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Probe configuration file (defaults apply when it does not exist)
    #[arg(long, env = "SHOPWATCH_CONFIG", default_value = "shopwatch.toml", global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded event log into network evidence artifacts
    Evidence(evidence::EvidenceArgs),

    /// Validate a web vitals snapshot or performance trace
    Vitals(vitals::VitalsArgs),

    /// Check action plans for invalid patterns and empty signal lists
    Lint(lint::LintArgs),

    /// Show or write the probe configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let probe_config = ProbeConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    match cli.command {
        Commands::Evidence(args) => evidence::execute(args, &probe_config, cli.format).await?,
        Commands::Vitals(args) => vitals::execute(args, &probe_config, cli.format)?,
        Commands::Lint(args) => lint::execute(args, cli.format)?,
        Commands::Config(args) => config::execute(args, &probe_config)?,
    }

    Ok(())
}
