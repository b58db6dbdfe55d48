//! Input files: market, trades and engine configuration.

use std::fs;
use std::path::{Path, PathBuf};

use fxsmile_config::EngineConfig;
use fxsmile_curves::{CoefficientCurves, LocalVolCoefficients, MarketSmile, SmileQuote};
use fxsmile_engine::TradeEconomics;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Market file: spot, per-tenor smile quotes and optionally one
/// coefficient set per tenor from an earlier calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketFile {
    /// Spot rate.
    pub spot: f64,
    /// Quotes sorted by tenor.
    pub quotes: Vec<SmileQuote>,
    /// Coefficients, one per quote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coefficients: Option<Vec<LocalVolCoefficients>>,
}

impl MarketFile {
    /// Reads a market file.
    pub fn load(path: &Path) -> CliResult<Self> {
        read_json(path)
    }

    /// The market smile.
    pub fn market(&self) -> CliResult<MarketSmile> {
        MarketSmile::new(self.spot, self.quotes.clone())
            .map_err(|e| CliError::InvalidMarket(e.to_string()))
    }

    /// Coefficient curves on the market's tenors, if the file has them.
    pub fn curves(&self, market: &MarketSmile) -> CliResult<Option<CoefficientCurves>> {
        self.coefficients
            .as_deref()
            .map(|slots| {
                CoefficientCurves::from_tenors(market.tenors(), slots)
                    .map_err(|e| CliError::InvalidMarket(e.to_string()))
            })
            .transpose()
    }

    /// Curves to price with: the file's, or flat coefficients when the
    /// market has not been calibrated.
    pub fn pricing_curves(&self, market: &MarketSmile) -> CliResult<(CoefficientCurves, bool)> {
        match self.curves(market)? {
            Some(curves) => Ok((curves, true)),
            None => CoefficientCurves::new(market.tenors(), LocalVolCoefficients::FLAT)
                .map(|c| (c, false))
                .map_err(|e| CliError::InvalidMarket(e.to_string())),
        }
    }

    /// Same market with the coefficients of `curves`.
    pub fn with_curves(mut self, curves: &CoefficientCurves) -> CliResult<Self> {
        let slots = (0..curves.len())
            .map(|i| curves.tenor(i))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CliError::InvalidMarket(e.to_string()))?;
        self.coefficients = Some(slots);
        Ok(self)
    }

    /// Writes the file as pretty JSON.
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let text = serde_json::to_string_pretty(self).map_err(|source| CliError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A trade file holds one trade or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TradeFile {
    One(TradeEconomics),
    Many(Vec<TradeEconomics>),
}

/// Reads the trades of a trade file.
pub fn load_trades(path: &Path) -> CliResult<Vec<TradeEconomics>> {
    Ok(match read_json::<TradeFile>(path)? {
        TradeFile::One(trade) => vec![trade],
        TradeFile::Many(trades) => trades,
    })
}

/// Engine configuration from a TOML file, or the defaults.
pub fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = read_text(path)?;
    EngineConfig::from_toml_str(&text).map_err(|e| CliError::Config(format!("{}: {e}", path.display())))
}

fn read_text(path: &Path) -> CliResult<String> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        path: PathBuf::from(path),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxsmile_engine::payoff::OptionKind;

    const MARKET: &str = r#"{
        "spot": 0.75,
        "quotes": [
            {"tenor": 0.5, "domestic_rate": 0.04, "foreign_rate": 0.02, "atm_vol": 0.1,
             "rr25": -0.005, "fly25": 0.002, "rr10": -0.01, "fly10": 0.006, "speed": 0.0},
            {"tenor": 1.0, "domestic_rate": 0.04, "foreign_rate": 0.02, "atm_vol": 0.11,
             "rr25": -0.006, "fly25": 0.002, "rr10": -0.012, "fly10": 0.007, "speed": 0.0}
        ]
    }"#;

    #[test]
    fn test_market_without_coefficients_prices_flat() {
        let file: MarketFile = serde_json::from_str(MARKET).unwrap();
        let market = file.market().unwrap();
        assert!(file.curves(&market).unwrap().is_none());

        let (curves, calibrated) = file.pricing_curves(&market).unwrap();
        assert!(!calibrated);
        assert_eq!(curves.tenor(1).unwrap(), LocalVolCoefficients::FLAT);
    }

    #[test]
    fn test_coefficient_count_must_match_quotes() {
        let mut file: MarketFile = serde_json::from_str(MARKET).unwrap();
        file.coefficients = Some(vec![LocalVolCoefficients::FLAT]);
        let market = file.market().unwrap();
        assert!(matches!(file.curves(&market), Err(CliError::InvalidMarket(_))));
    }

    #[test]
    fn test_with_curves_round_trips() {
        let file: MarketFile = serde_json::from_str(MARKET).unwrap();
        let market = file.market().unwrap();
        let curves = CoefficientCurves::new(market.tenors(), LocalVolCoefficients::INITIAL_GUESS).unwrap();

        let saved = file.with_curves(&curves).unwrap();
        let text = serde_json::to_string(&saved).unwrap();
        let loaded: MarketFile = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded.curves(&market).unwrap(), Some(curves));
    }

    #[test]
    fn test_trade_file_accepts_one_or_many() {
        let one: TradeFile = serde_json::from_str(
            r#"{"option": "call", "settlement": "physical", "strike": 0.76, "expiry": 0.5}"#,
        )
        .unwrap();
        match one {
            TradeFile::One(t) => assert_eq!(t, TradeEconomics::vanilla(OptionKind::Call, 0.76, 0.5)),
            TradeFile::Many(_) => panic!("expected one trade"),
        }

        let many: TradeFile = serde_json::from_str(
            r#"[{"settlement": "physical", "strike": 0.76, "expiry": 1.0},
                {"option": "put", "settlement": "physical", "strike": 0.7, "expiry": 1.0}]"#,
        )
        .unwrap();
        assert!(matches!(many, TradeFile::Many(v) if v.len() == 2));
    }
}
