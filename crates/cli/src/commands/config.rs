//! Probe configuration display

use std::path::PathBuf;

use clap::Args;
use shopwatch_core::ProbeConfig;

use crate::output;

#[derive(Args)]
pub struct ConfigArgs {
    /// Print built-in defaults instead of the loaded configuration
    #[arg(long)]
    pub defaults: bool,

    /// Write the configuration to this path instead of printing it
    #[arg(long)]
    pub write: Option<PathBuf>,
}

pub fn execute(args: ConfigArgs, loaded: &ProbeConfig) -> anyhow::Result<()> {
    let config = if args.defaults { ProbeConfig::default() } else { loaded.clone() };

    match args.write {
        Some(path) => {
            config.save(&path)?;
            output::print_success(&format!("Configuration written to {}", path.display()));
        }
        None => print!("{}", config.to_toml()?),
    }

    Ok(())
}
