//! fxsmile CLI - Command-line interface for FX local-volatility pricing.
//!
//! # Usage
//!
//! ```bash
//! # Calibrate the coefficient curves and write them back
//! fxsmile calibrate --market market.json --output calibrated.json
//!
//! # Price trades against a calibrated market
//! fxsmile price --market calibrated.json --trades trades.json
//!
//! # Bump-and-reprice risk
//! fxsmile greeks --market calibrated.json --trades trades.json --format json
//!
//! # Market strikes and smile vols per tenor
//! fxsmile smile --market market.json --strike 0.78
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod error;
mod input;
mod output;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = input::load_config(cli.config.as_deref())?;
    let format = cli.format;

    match cli.command {
        Commands::Calibrate(args) => commands::calibrate::execute(args, &config, format)?,
        Commands::Price(args) => commands::price::execute(args, &config, format)?,
        Commands::Greeks(args) => commands::greeks::execute(args, &config, format)?,
        Commands::Smile(args) => commands::smile::execute(args, &config, format)?,
    }

    Ok(())
}
