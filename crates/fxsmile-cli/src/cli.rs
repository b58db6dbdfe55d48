//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::commands::{CalibrateArgs, GreeksArgs, PriceArgs, SmileArgs};

/// fxsmile - FX local-volatility pricing and smile calibration
#[derive(Parser)]
#[command(name = "fxsmile")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Engine configuration file (TOML)
    #[arg(short, long, global = true, env = "FXSMILE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log progress at info level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Calibrate the local-volatility coefficients to a market smile
    Calibrate(CalibrateArgs),

    /// Price trades on the Crank-Nicolson grid
    Price(PriceArgs),

    /// Compute bump-and-reprice Greeks
    Greeks(GreeksArgs),

    /// Show market strikes and smile volatilities per tenor
    Smile(SmileArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}
