//! Price command implementation.
//!
//! Values each trade of a trade file on the Crank-Nicolson grid.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use fxsmile_config::EngineConfig;
use fxsmile_engine::pricer::ValuationStatus;
use fxsmile_engine::{OptionDescriptor, Pricer, TradeEconomics, Valuation};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::commands::{describe, warn_uncalibrated};
use crate::input::{load_trades, MarketFile};
use crate::output::{format_value, print_header, print_json, print_output};

/// Arguments for the price command.
#[derive(Args, Debug)]
pub struct PriceArgs {
    /// Market file (JSON), ideally with calibrated coefficients
    #[arg(short, long)]
    pub market: PathBuf,

    /// Trade file (JSON): one trade or a list
    #[arg(short, long)]
    pub trades: PathBuf,

    /// Override the number of grid intervals
    #[arg(long)]
    pub grid_nodes: Option<usize>,
}

/// One priced trade.
#[derive(Debug, Serialize)]
pub struct PricedTrade {
    /// Trade as booked.
    pub trade: TradeEconomics,
    /// Value and how it was obtained.
    pub valuation: Valuation,
}

#[derive(Debug, Serialize, Tabled)]
struct PriceRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Trade")]
    description: String,
    #[tabled(rename = "Expiry")]
    expiry: String,
    #[tabled(rename = "Strike")]
    strike: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Short label of a valuation path.
pub fn status_label(status: ValuationStatus) -> String {
    match status {
        ValuationStatus::Solved => "solved".to_string(),
        ValuationStatus::ClampedNoise { raw } => format!("clamped (raw {raw:.3e})"),
        ValuationStatus::Intrinsic => "intrinsic".to_string(),
        ValuationStatus::BarrierBreached => "barrier breached".to_string(),
    }
}

/// Execute the price command.
pub fn execute(args: PriceArgs, config: &EngineConfig, format: OutputFormat) -> Result<()> {
    let file = MarketFile::load(&args.market)?;
    let market = file.market()?;
    let (curves, calibrated) = file.pricing_curves(&market)?;
    warn_uncalibrated(calibrated);

    let mut pricing = config.pricing.clone();
    if let Some(nodes) = args.grid_nodes {
        pricing = pricing.with_grid_nodes(nodes);
    }

    let pricer = Pricer::new(&market, &curves);
    let priced = load_trades(&args.trades)?
        .into_iter()
        .map(|trade| {
            let descriptor = OptionDescriptor::from_trade(&trade, &market, &pricing)?;
            let valuation = pricer.price(&descriptor)?;
            Ok(PricedTrade { trade, valuation })
        })
        .collect::<Result<Vec<_>>>()?;

    match format {
        OutputFormat::Json => print_json(&priced),
        OutputFormat::Table => {
            let rows = priced
                .iter()
                .enumerate()
                .map(|(index, p)| {
                    Ok(PriceRow {
                        index: index + 1,
                        description: describe(&p.trade)?,
                        expiry: format_value(p.trade.expiry, 4),
                        strike: format_value(p.trade.strike, 5),
                        value: format_value(p.valuation.value, 6),
                        status: status_label(p.valuation.status),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            print_header("Valuation");
            print_output(&rows, format)
        }
    }
}
