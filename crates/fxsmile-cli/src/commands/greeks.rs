//! Greeks command implementation.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use fxsmile_config::EngineConfig;
use fxsmile_engine::{Greeks, GreeksCalculator, TradeEconomics};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::commands::{describe, warn_uncalibrated};
use crate::input::{load_trades, MarketFile};
use crate::output::{format_value, print_header, print_json, print_output};

/// Arguments for the greeks command.
#[derive(Args, Debug)]
pub struct GreeksArgs {
    /// Market file (JSON), ideally with calibrated coefficients
    #[arg(short, long)]
    pub market: PathBuf,

    /// Trade file (JSON): one trade or a list
    #[arg(short, long)]
    pub trades: PathBuf,

    /// Relative spot bump for delta and gamma
    #[arg(long)]
    pub spot_shift: Option<f64>,
}

/// Risk of one trade.
#[derive(Debug, Serialize)]
pub struct TradeRisk {
    /// Trade as booked.
    pub trade: TradeEconomics,
    /// Sensitivities.
    pub greeks: Greeks,
}

#[derive(Debug, Serialize, Tabled)]
struct GreeksRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Trade")]
    description: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Delta")]
    delta: String,
    #[tabled(rename = "Gamma (1%)")]
    gamma: String,
    #[tabled(rename = "Vega")]
    vega: String,
    #[tabled(rename = "Rho")]
    rho: String,
    #[tabled(rename = "Phi")]
    phi: String,
    #[tabled(rename = "Theta")]
    theta: String,
}

/// Execute the greeks command.
pub fn execute(args: GreeksArgs, config: &EngineConfig, format: OutputFormat) -> Result<()> {
    let file = MarketFile::load(&args.market)?;
    let market = file.market()?;
    let (curves, calibrated) = file.pricing_curves(&market)?;
    warn_uncalibrated(calibrated);

    let mut bumps = config.greeks.clone();
    if let Some(shift) = args.spot_shift {
        bumps.spot_shift = shift;
    }

    let calculator = GreeksCalculator::new(&market, &curves, &config.pricing, &bumps);
    let risk = load_trades(&args.trades)?
        .into_iter()
        .map(|trade| {
            let greeks = calculator.compute(&trade)?;
            Ok(TradeRisk { trade, greeks })
        })
        .collect::<Result<Vec<_>>>()?;

    match format {
        OutputFormat::Json => print_json(&risk),
        OutputFormat::Table => {
            let rows = risk
                .iter()
                .enumerate()
                .map(|(index, r)| {
                    let g = r.greeks;
                    Ok(GreeksRow {
                        index: index + 1,
                        description: describe(&r.trade)?,
                        value: format_value(g.value, 6),
                        delta: format_value(g.delta, 5),
                        gamma: format_value(g.gamma, 5),
                        vega: format_value(g.vega, 6),
                        rho: format_value(g.rho, 6),
                        phi: format_value(g.phi, 6),
                        theta: format_value(g.theta, 7),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            print_header("Greeks");
            print_output(&rows, format)
        }
    }
}
