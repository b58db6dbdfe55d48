//! Per-tenor calibration targets.

use fxsmile_config::{CalibrationConfig, SkewCondition};
use fxsmile_curves::SmileQuote;
use serde::{Deserialize, Serialize};

use crate::black::BlackInputs;
use crate::descriptor::GridBounds;
use crate::error::EngineResult;
use crate::payoff::OptionKind;
use crate::smile::{market_strikes, strike_from_delta};

/// Time step of the double-no-touch used by the rebate speed condition.
pub const REBATE_TIME_STEP: f64 = 0.0025;

/// The sixth residual's target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum SkewTarget {
    /// 25-delta risk reversal after a spot move, quoted vols widened by
    /// the speed.
    RiskReversalSlope {
        /// Spot after the move.
        shifted_spot: f64,
        /// Call strike at the shifted spot.
        call_strike: f64,
        /// Put strike at the shifted spot.
        put_strike: f64,
        /// Target call vol.
        call_vol: f64,
        /// Target put vol.
        put_vol: f64,
    },
    /// Skew premium of a double-no-touch between the 10-delta strikes.
    RebateSpeed {
        /// Lower barrier.
        lower: f64,
        /// Upper barrier.
        upper: f64,
        /// Target premium over the flat-smile price, in basis points.
        speed: f64,
    },
}

/// Everything a tenor's residuals compare against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTargets {
    /// Tenor in years.
    pub tenor: f64,
    /// Spot.
    pub spot: f64,
    /// Domestic zero rate to the tenor.
    pub domestic_rate: f64,
    /// Foreign zero rate to the tenor.
    pub foreign_rate: f64,
    /// Strikes 10P, 25P, ATM, 25C, 10C.
    pub strikes: [f64; 5],
    /// Market vols at those strikes.
    pub vols: [f64; 5],
    /// Black prices at those strikes.
    pub prices: [f64; 5],
    /// Sixth residual.
    pub skew: SkewTarget,
}

impl CalibrationTargets {
    /// Builds the targets of `quote`.
    pub fn for_quote(
        quote: &SmileQuote,
        spot: f64,
        config: &CalibrationConfig,
    ) -> EngineResult<Self> {
        let ms = market_strikes(quote, spot, config.delta_cut_time, config.left_hand_delta)?;
        let black = BlackInputs::from_rates(spot, quote.tenor, quote.domestic_rate, quote.foreign_rate);

        let mut prices = [0.0; 5];
        for (i, price) in prices.iter_mut().enumerate() {
            *price = black.price(pillar_kind(&ms.strikes, i), ms.strikes[i], ms.vols[i]);
        }

        let skew = match config.skew_condition {
            SkewCondition::RiskReversalSlope => {
                let shifted_spot = spot * config.speed_spot_shift;
                let call_vol = ms.vols[3] + 0.5 * quote.speed;
                let put_vol = ms.vols[1] - 0.5 * quote.speed;
                let strike = |kind, vol| {
                    strike_from_delta(
                        kind,
                        0.25,
                        shifted_spot,
                        quote.tenor,
                        quote.domestic_rate,
                        quote.foreign_rate,
                        vol,
                        config.delta_cut_time,
                        config.left_hand_delta,
                    )
                };
                SkewTarget::RiskReversalSlope {
                    shifted_spot,
                    call_strike: strike(OptionKind::Call, call_vol)?,
                    put_strike: strike(OptionKind::Put, put_vol)?,
                    call_vol,
                    put_vol,
                }
            }
            SkewCondition::RebateSpeed => SkewTarget::RebateSpeed {
                lower: ms.put10(),
                upper: ms.call10(),
                speed: quote.speed,
            },
        };

        Ok(Self {
            tenor: quote.tenor,
            spot,
            domestic_rate: quote.domestic_rate,
            foreign_rate: quote.foreign_rate,
            strikes: ms.strikes,
            vols: ms.vols,
            prices,
            skew,
        })
    }

    /// Black inputs at spot `s` with the tenor's rates.
    pub fn black_at(&self, s: f64) -> BlackInputs {
        BlackInputs::from_rates(s, self.tenor, self.domestic_rate, self.foreign_rate)
    }

    /// Option kind priced at pillar `i`: calls at and above the ATM strike.
    pub fn kind(&self, i: usize) -> OptionKind {
        pillar_kind(&self.strikes, i)
    }

    /// Grid bounds `[ln(K10P / 2), ln(2 K10C)]`.
    pub fn grid_bounds(&self) -> GridBounds {
        GridBounds::from_levels(0.5 * self.strikes[0], 2.0 * self.strikes[4])
    }

    /// Time steps of the rebate speed instrument.
    pub fn rebate_time_steps(&self) -> usize {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = (self.tenor / REBATE_TIME_STEP) as usize;
        steps.max(1)
    }
}

fn pillar_kind(strikes: &[f64; 5], i: usize) -> OptionKind {
    if strikes[i] >= strikes[2] {
        OptionKind::Call
    } else {
        OptionKind::Put
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote() -> SmileQuote {
        SmileQuote {
            tenor: 0.5,
            domestic_rate: 0.05,
            foreign_rate: 0.02,
            atm_vol: 0.11,
            rr25: -0.01,
            fly25: 0.003,
            rr10: -0.02,
            fly10: 0.01,
            speed: 0.002,
        }
    }

    #[test]
    fn test_pillar_kinds_and_prices() {
        let t = CalibrationTargets::for_quote(&quote(), 0.72, &CalibrationConfig::default()).unwrap();
        assert_eq!(t.kind(0), OptionKind::Put);
        assert_eq!(t.kind(1), OptionKind::Put);
        assert_eq!(t.kind(2), OptionKind::Call);
        assert_eq!(t.kind(4), OptionKind::Call);
        assert!(t.prices.iter().all(|p| *p > 0.0));
        assert!(t.grid_bounds().contains(0.72_f64.ln()));
        assert_eq!(t.rebate_time_steps(), 200);
    }

    #[test]
    fn test_risk_reversal_target_widens_vols() {
        let t = CalibrationTargets::for_quote(&quote(), 0.72, &CalibrationConfig::default()).unwrap();
        match t.skew {
            SkewTarget::RiskReversalSlope {
                shifted_spot,
                call_vol,
                put_vol,
                call_strike,
                put_strike,
            } => {
                assert!((shifted_spot - 0.7272).abs() < 1e-12);
                assert!((call_vol - (t.vols[3] + 0.001)).abs() < 1e-12);
                assert!((put_vol - (t.vols[1] - 0.001)).abs() < 1e-12);
                assert!(put_strike < shifted_spot && call_strike > shifted_spot);
            }
            SkewTarget::RebateSpeed { .. } => panic!("wrong condition"),
        }
    }

    #[test]
    fn test_rebate_target_uses_ten_delta_strikes() {
        let config = CalibrationConfig::default().with_skew_condition(SkewCondition::RebateSpeed);
        let t = CalibrationTargets::for_quote(&quote(), 0.72, &config).unwrap();
        assert_eq!(
            t.skew,
            SkewTarget::RebateSpeed {
                lower: t.strikes[0],
                upper: t.strikes[4],
                speed: 0.002
            }
        );
    }
}
