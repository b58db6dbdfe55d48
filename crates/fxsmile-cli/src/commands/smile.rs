//! Smile command implementation.
//!
//! Shows the five market strikes of each tenor and, optionally, the smile
//! volatility at a given strike.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use fxsmile_config::EngineConfig;
use fxsmile_engine::smile::{market_strikes, DeltaConvention, MarketStrikes, SmileExtrapolation};
use fxsmile_engine::SmileCalculation;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::input::MarketFile;
use crate::output::{
    format_value, format_vol, print_header, print_json, print_output, print_warning,
};

/// Arguments for the smile command.
#[derive(Args, Debug)]
pub struct SmileArgs {
    /// Market file (JSON)
    #[arg(short, long)]
    pub market: PathBuf,

    /// Read the smile volatility at this strike
    #[arg(short, long)]
    pub strike: Option<f64>,

    /// Wing behaviour beyond the 10-delta pillars
    #[arg(long, value_enum, default_value = "extrapolate")]
    pub wings: Wings,
}

/// Smile wings beyond the 10-delta pillars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Wings {
    /// Continue the end quadratics on both wings
    #[default]
    Extrapolate,
    /// Hold the 10-delta vols on both wings
    Flat,
    /// Hold the 10-delta call vol, extrapolate the put wing
    FlatCall,
    /// Hold the 10-delta put vol, extrapolate the call wing
    FlatPut,
}

impl From<Wings> for SmileExtrapolation {
    fn from(wings: Wings) -> Self {
        // Smiles run in call delta, so the call wing is the start.
        match wings {
            Wings::Extrapolate => Self::Extrapolate,
            Wings::Flat => Self::Flat,
            Wings::FlatCall => Self::FlatStartExtrapolateEnd,
            Wings::FlatPut => Self::ExtrapolateStartFlatEnd,
        }
    }
}

/// Smile of one tenor.
#[derive(Debug, Serialize)]
pub struct TenorSmile {
    /// Tenor in years.
    pub tenor: f64,
    /// Delta convention the tenor is quoted in.
    pub convention: DeltaConvention,
    /// Strikes and vols at 10P, 25P, ATM, 25C, 10C.
    pub pillars: MarketStrikes,
    /// Smile vol at the requested strike.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strike_vol: Option<f64>,
}

#[derive(Debug, Serialize, Tabled)]
struct SmileRow {
    #[tabled(rename = "Tenor")]
    tenor: String,
    #[tabled(rename = "Convention")]
    convention: String,
    #[tabled(rename = "10P")]
    put10: String,
    #[tabled(rename = "25P")]
    put25: String,
    #[tabled(rename = "ATM")]
    atm: String,
    #[tabled(rename = "25C")]
    call25: String,
    #[tabled(rename = "10C")]
    call10: String,
    #[tabled(rename = "Vol @ strike")]
    strike_vol: String,
}

/// Execute the smile command.
pub fn execute(args: SmileArgs, config: &EngineConfig, format: OutputFormat) -> Result<()> {
    let file = MarketFile::load(&args.market)?;
    let market = file.market()?;
    let pricing = &config.pricing;

    let smiles = market
        .quotes()
        .iter()
        .map(|quote| {
            let pillars = market_strikes(
                quote,
                market.spot(),
                pricing.delta_cut_time,
                pricing.left_hand_delta,
            )?;
            let strike_vol = match args.strike {
                Some(strike) => {
                    let smile = SmileCalculation::from_quote(
                        quote,
                        market.spot(),
                        pricing.delta_cut_time,
                        pricing.left_hand_delta,
                    )?
                    .with_extrapolation(args.wings.into());
                    let solve = smile.vol_for_strike(strike)?;
                    if solve.exhausted {
                        print_warning(&format!(
                            "smile vol at {strike} for tenor {} stopped after {} iterations",
                            quote.tenor, solve.iterations
                        ));
                    }
                    Some(solve.vol)
                }
                None => None,
            };
            Ok(TenorSmile {
                tenor: quote.tenor,
                convention: DeltaConvention::for_expiry(
                    quote.tenor,
                    pricing.delta_cut_time,
                    pricing.left_hand_delta,
                ),
                pillars,
                strike_vol,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    match format {
        OutputFormat::Json => print_json(&smiles),
        OutputFormat::Table => {
            let cell = |p: &MarketStrikes, i: usize| {
                format!("{} ({})", format_value(p.strikes[i], 5), format_vol(p.vols[i]))
            };
            let rows: Vec<SmileRow> = smiles
                .iter()
                .map(|s| SmileRow {
                    tenor: format_value(s.tenor, 4),
                    convention: format!("{:?}", s.convention),
                    put10: cell(&s.pillars, 0),
                    put25: cell(&s.pillars, 1),
                    atm: cell(&s.pillars, 2),
                    call25: cell(&s.pillars, 3),
                    call10: cell(&s.pillars, 4),
                    strike_vol: s.strike_vol.map(format_vol).unwrap_or_default(),
                })
                .collect();
            print_header("Market Smile");
            print_output(&rows, format)
        }
    }
}
