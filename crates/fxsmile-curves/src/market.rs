//! FX smile market quotes.

use serde::{Deserialize, Serialize};

use crate::curve::Curve;
use crate::error::{CurveError, CurveResult};

/// Market quotes for one smile tenor.
///
/// Rates are continuously compounded zero rates to the tenor; volatilities
/// are annualised decimals. Risk reversals are call minus put, butterflies
/// are the wing average over ATM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmileQuote {
    /// Time to expiry in years.
    pub tenor: f64,
    /// Domestic (numeraire) zero rate.
    pub domestic_rate: f64,
    /// Foreign (asset) zero rate.
    pub foreign_rate: f64,
    /// At-the-money volatility.
    pub atm_vol: f64,
    /// 25-delta risk reversal.
    pub rr25: f64,
    /// 25-delta butterfly.
    pub fly25: f64,
    /// 10-delta risk reversal.
    pub rr10: f64,
    /// 10-delta butterfly.
    pub fly10: f64,
    /// Speed quote used by the skew condition of the calibration.
    #[serde(default)]
    pub speed: f64,
}

impl SmileQuote {
    /// Pillar volatilities in strike order: 10P, 25P, ATM, 25C, 10C.
    pub fn pillar_vols(&self) -> [f64; 5] {
        [
            self.atm_vol + self.fly10 - 0.5 * self.rr10,
            self.atm_vol + self.fly25 - 0.5 * self.rr25,
            self.atm_vol,
            self.atm_vol + self.fly25 + 0.5 * self.rr25,
            self.atm_vol + self.fly10 + 0.5 * self.rr10,
        ]
    }

    /// Checks that the quote describes a usable smile.
    pub fn validate(&self) -> CurveResult<()> {
        let fields = [
            self.tenor,
            self.domestic_rate,
            self.foreign_rate,
            self.atm_vol,
            self.rr25,
            self.fly25,
            self.rr10,
            self.fly10,
            self.speed,
        ];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(CurveError::invalid_quote(self.tenor, "non-finite field"));
        }
        if self.tenor <= 0.0 {
            return Err(CurveError::invalid_quote(self.tenor, "tenor must be positive"));
        }
        if let Some(v) = self.pillar_vols().iter().find(|v| **v <= 0.0) {
            return Err(CurveError::invalid_quote(
                self.tenor,
                format!("non-positive pillar volatility {v}"),
            ));
        }
        Ok(())
    }
}

/// Spot plus per-tenor smile quotes, with the rate and ATM curves built
/// from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMarket", into = "RawMarket")]
pub struct MarketSmile {
    spot: f64,
    quotes: Vec<SmileQuote>,
    domestic: Curve,
    foreign: Curve,
    atm_vol: Curve,
}

#[derive(Clone, Serialize, Deserialize)]
struct RawMarket {
    spot: f64,
    quotes: Vec<SmileQuote>,
}

impl TryFrom<RawMarket> for MarketSmile {
    type Error = CurveError;

    fn try_from(raw: RawMarket) -> CurveResult<Self> {
        Self::new(raw.spot, raw.quotes)
    }
}

impl From<MarketSmile> for RawMarket {
    fn from(market: MarketSmile) -> Self {
        Self {
            spot: market.spot,
            quotes: market.quotes,
        }
    }
}

impl MarketSmile {
    /// Creates a market from spot and quotes sorted by tenor.
    ///
    /// # Errors
    ///
    /// - [`CurveError::InvalidMarket`] for a non-positive spot
    /// - [`CurveError::InsufficientPoints`] without quotes
    /// - [`CurveError::InvalidQuote`] for an unusable quote
    /// - [`CurveError::NonMonotonicTenors`] if tenors are not increasing
    pub fn new(spot: f64, quotes: Vec<SmileQuote>) -> CurveResult<Self> {
        if !(spot > 0.0 && spot.is_finite()) {
            return Err(CurveError::invalid_market(format!(
                "spot must be positive, got {spot}"
            )));
        }
        if quotes.is_empty() {
            return Err(CurveError::InsufficientPoints {
                required: 1,
                got: 0,
            });
        }
        for q in &quotes {
            q.validate()?;
        }

        let tenors: Vec<f64> = quotes.iter().map(|q| q.tenor).collect();
        let domestic = Curve::new(tenors.clone(), quotes.iter().map(|q| q.domestic_rate).collect())?;
        let foreign = Curve::new(tenors.clone(), quotes.iter().map(|q| q.foreign_rate).collect())?;
        let atm_vol = Curve::new(tenors, quotes.iter().map(|q| q.atm_vol).collect())?;

        Ok(Self {
            spot,
            quotes,
            domestic,
            foreign,
            atm_vol,
        })
    }

    /// Spot rate (numeraire per unit of asset).
    pub fn spot(&self) -> f64 {
        self.spot
    }

    /// Quotes in tenor order.
    pub fn quotes(&self) -> &[SmileQuote] {
        &self.quotes
    }

    /// Quote of tenor `index`.
    pub fn quote(&self, index: usize) -> CurveResult<&SmileQuote> {
        self.quotes.get(index).ok_or(CurveError::PillarOutOfRange {
            index,
            len: self.quotes.len(),
        })
    }

    /// Tenor grid.
    pub fn tenors(&self) -> &[f64] {
        self.atm_vol.times()
    }

    /// Domestic zero-rate curve.
    pub fn domestic_curve(&self) -> &Curve {
        &self.domestic
    }

    /// Foreign zero-rate curve.
    pub fn foreign_curve(&self) -> &Curve {
        &self.foreign
    }

    /// ATM volatility curve.
    pub fn atm_vol_curve(&self) -> &Curve {
        &self.atm_vol
    }

    /// Index of the tenor bucket containing horizon `t`.
    ///
    /// At or before the first tenor this is 0, beyond the last tenor it is
    /// the last index, otherwise the first tenor at or after `t`.
    pub fn bucket_index(&self, t: f64) -> usize {
        let tenors = self.tenors();
        tenors
            .iter()
            .position(|&tenor| tenor >= t)
            .unwrap_or(tenors.len() - 1)
    }

    /// Same quotes with a different spot.
    pub fn with_spot(&self, spot: f64) -> CurveResult<Self> {
        Self::new(spot, self.quotes.clone())
    }

    /// Same market with every ATM volatility moved by `shift`.
    pub fn with_atm_vol_shift(&self, shift: f64) -> CurveResult<Self> {
        self.map_quotes(|q| q.atm_vol += shift)
    }

    /// Same market with every domestic rate moved by `shift`.
    pub fn with_domestic_shift(&self, shift: f64) -> CurveResult<Self> {
        self.map_quotes(|q| q.domestic_rate += shift)
    }

    /// Same market with every foreign rate moved by `shift`.
    pub fn with_foreign_shift(&self, shift: f64) -> CurveResult<Self> {
        self.map_quotes(|q| q.foreign_rate += shift)
    }

    fn map_quotes<F>(&self, f: F) -> CurveResult<Self>
    where
        F: Fn(&mut SmileQuote),
    {
        let mut quotes = self.quotes.clone();
        quotes.iter_mut().for_each(f);
        Self::new(self.spot, quotes)
    }
}
