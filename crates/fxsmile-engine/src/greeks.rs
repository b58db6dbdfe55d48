//! Bump-and-reprice sensitivities.
//!
//! Every bumped value is a full reprice of the trade rebuilt from its
//! economics against a bumped market, so grid bounds and strikes move with
//! the bump exactly as they would for a fresh valuation.

use fxsmile_config::{GreeksConfig, PricingConfig};
use fxsmile_curves::{CoefficientCurves, MarketSmile};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::OptionDescriptor;
use crate::error::EngineResult;
use crate::payoff::{classify, BarrierWindow, Knock, Payout, PayoffStyle, Settlement, TradeEconomics};
use crate::pricer::Pricer;

/// Risk vector of one trade.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Greeks {
    /// Present value.
    pub value: f64,
    /// First derivative in spot.
    pub delta: f64,
    /// Second derivative in spot, scaled to a 1% spot move.
    pub gamma: f64,
    /// Change for a flat ATM vol bump.
    pub vega: f64,
    /// Domestic rate sensitivity per 1% move.
    pub rho: f64,
    /// Foreign rate sensitivity per 1% move.
    pub phi: f64,
    /// Change over one day.
    pub theta: f64,
}

/// Computes [`Greeks`] for trades against one market and coefficient set.
#[derive(Debug, Clone, Copy)]
pub struct GreeksCalculator<'a> {
    market: &'a MarketSmile,
    coefficients: &'a CoefficientCurves,
    pricing: &'a PricingConfig,
    config: &'a GreeksConfig,
}

/// Value of a rolled trade: either reprice or a known amount.
enum Rolled {
    Trade(TradeEconomics),
    Known(f64),
}

impl<'a> GreeksCalculator<'a> {
    /// Creates a calculator.
    pub fn new(
        market: &'a MarketSmile,
        coefficients: &'a CoefficientCurves,
        pricing: &'a PricingConfig,
        config: &'a GreeksConfig,
    ) -> Self {
        Self {
            market,
            coefficients,
            pricing,
            config,
        }
    }

    fn value_in(&self, market: &MarketSmile, trade: &TradeEconomics) -> EngineResult<f64> {
        let d = OptionDescriptor::from_trade(trade, market, self.pricing)?;
        Pricer::new(market, self.coefficients).value(&d)
    }

    /// Present value of `trade`.
    pub fn value(&self, trade: &TradeEconomics) -> EngineResult<f64> {
        self.value_in(self.market, trade)
    }

    /// Spot bump: a fraction of spot, capped short of any live barrier.
    pub fn spot_bump(&self, trade: &TradeEconomics) -> EngineResult<f64> {
        let spot = self.market.spot();
        let mut h = self.config.spot_shift * spot;
        let (style, window) = classify(trade)?;
        if style.is_barrier_family() && window.live_at_valuation() {
            if let Some(distance) = trade.barrier_levels().distance(spot) {
                h = h.min(self.config.barrier_buffer * distance);
            }
        }
        Ok(h)
    }

    /// Full risk vector.
    pub fn compute(&self, trade: &TradeEconomics) -> EngineResult<Greeks> {
        let spot = self.market.spot();
        let p0 = self.value(trade)?;

        let h = self.spot_bump(trade)?;
        let (delta, gamma) = if h > 0.0 {
            let up = self.value_in(&self.market.with_spot(spot + h)?, trade)?;
            let down = self.value_in(&self.market.with_spot(spot - h)?, trade)?;
            (
                (up - down) / (2.0 * h),
                (up - 2.0 * p0 + down) / (h * h) * 0.01 * spot,
            )
        } else {
            (0.0, 0.0)
        };

        let vega = self.value_in(&self.market.with_atm_vol_shift(self.config.vol_shift)?, trade)? - p0;

        let bp = self.config.rate_shift;
        let per_percent = 0.01 / (2.0 * bp);
        let rho = (self.value_in(&self.market.with_domestic_shift(bp)?, trade)?
            - self.value_in(&self.market.with_domestic_shift(-bp)?, trade)?)
            * per_percent;
        let phi = (self.value_in(&self.market.with_foreign_shift(bp)?, trade)?
            - self.value_in(&self.market.with_foreign_shift(-bp)?, trade)?)
            * per_percent;

        let theta = self.theta(trade, p0)?;
        debug!(value = p0, delta, gamma, vega, rho, phi, theta, "greeks computed");

        Ok(Greeks {
            value: p0,
            delta,
            gamma,
            vega,
            rho,
            phi,
            theta,
        })
    }

    /// One-day roll minus today's value.
    pub fn theta(&self, trade: &TradeEconomics, p0: f64) -> EngineResult<f64> {
        let day = self.config.day_fraction;
        let spot = self.market.spot();
        let (style, _) = classify(trade)?;

        if trade.expiry <= day {
            let hit = style.is_barrier_family() && trade.barrier_levels().breached_by(spot);
            return Ok(style.settle(spot, trade.strike, hit) - p0);
        }

        let rolled = match self.roll(trade, style, day) {
            Rolled::Trade(t) => self.value(&t)?,
            Rolled::Known(v) => v,
        };
        Ok(rolled - p0)
    }

    /// The trade one day later, remapping windows that change within the
    /// day to the structure that survives them.
    fn roll(&self, trade: &TradeEconomics, style: PayoffStyle, day: f64) -> Rolled {
        let expiry = trade.expiry - day;
        let mut rolled = TradeEconomics { expiry, ..*trade };

        let Some(mut barrier) = trade.barrier else {
            return Rolled::Trade(rolled);
        };
        if !style.is_barrier_family() {
            return Rolled::Trade(rolled);
        }

        barrier.window = match barrier.window {
            BarrierWindow::Continuous => BarrierWindow::Continuous,
            BarrierWindow::LateStart { change } if change <= day => BarrierWindow::Continuous,
            BarrierWindow::LateStart { change } => BarrierWindow::LateStart { change: change - day },
            BarrierWindow::EarlyFinish { change } if change <= day => {
                return self.barrier_removed(trade, style, expiry);
            }
            BarrierWindow::EarlyFinish { change } => BarrierWindow::EarlyFinish { change: change - day },
        };
        rolled.barrier = Some(barrier);
        Rolled::Trade(rolled)
    }

    /// Structure left when monitoring ends before it was ever triggered.
    fn barrier_removed(&self, trade: &TradeEconomics, style: PayoffStyle, expiry: f64) -> Rolled {
        match (style.vanilla_kind(), trade.barrier.map(|b| b.knock)) {
            (Some(_), Some(Knock::Out)) => Rolled::Trade(TradeEconomics {
                expiry,
                barrier: None,
                settlement: Settlement::Physical,
                ..*trade
            }),
            (Some(_), _) => Rolled::Known(0.0),
            (None, Some(Knock::Out)) => {
                let pricer = Pricer::new(self.market, self.coefficients);
                Rolled::Known(match style.touch_payout() {
                    Some(Payout::Asset) => self.market.spot() * pricer.foreign_discount(expiry),
                    _ => pricer.domestic_discount(expiry),
                })
            }
            (None, _) => Rolled::Known(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payoff::{BarrierTerms, OptionKind};
    use approx::assert_relative_eq;
    use fxsmile_curves::{LocalVolCoefficients, SmileQuote};

    fn market() -> MarketSmile {
        let quote = |tenor| SmileQuote {
            tenor,
            domestic_rate: 0.04,
            foreign_rate: 0.02,
            atm_vol: 0.12,
            rr25: 0.0,
            fly25: 0.0,
            rr10: 0.0,
            fly10: 0.0,
            speed: 0.0,
        };
        MarketSmile::new(0.75, vec![quote(0.5), quote(1.0)]).unwrap()
    }

    fn pricing() -> PricingConfig {
        PricingConfig::default().with_grid_nodes(300)
    }

    #[test]
    fn test_call_greeks_have_textbook_signs() {
        let m = market();
        let curves = CoefficientCurves::new(m.tenors(), LocalVolCoefficients::FLAT).unwrap();
        let pricing = pricing();
        let config = GreeksConfig {
            day_fraction: 0.05,
            ..GreeksConfig::default()
        };
        let calc = GreeksCalculator::new(&m, &curves, &pricing, &config);

        let g = calc
            .compute(&TradeEconomics::vanilla(OptionKind::Call, 0.76, 0.5))
            .unwrap();
        assert!(g.value > 0.0);
        assert!(g.delta > 0.2 && g.delta < 0.8);
        assert!(g.gamma > 0.0);
        assert!(g.vega > 0.0);
        assert!(g.rho > 0.0);
        assert!(g.phi < 0.0);
        assert!(g.theta < 0.0);
    }

    #[test]
    fn test_spot_bump_capped_by_barrier() {
        let m = market();
        let curves = CoefficientCurves::new(m.tenors(), LocalVolCoefficients::FLAT).unwrap();
        let pricing = pricing();
        let config = GreeksConfig::default();
        let calc = GreeksCalculator::new(&m, &curves, &pricing, &config);

        let trade = TradeEconomics::vanilla(OptionKind::Call, 0.74, 0.5).with_barrier(BarrierTerms {
            knock: Knock::Out,
            lower: Some(0.748),
            upper: None,
            window: BarrierWindow::Continuous,
        });
        assert_relative_eq!(calc.spot_bump(&trade).unwrap(), 0.9 * 0.002, epsilon = 1e-12);

        let late = TradeEconomics::vanilla(OptionKind::Call, 0.74, 0.5).with_barrier(BarrierTerms {
            window: BarrierWindow::LateStart { change: 0.25 },
            ..trade.barrier.unwrap()
        });
        assert_relative_eq!(calc.spot_bump(&late).unwrap(), 0.0075, epsilon = 1e-12);
    }

    #[test]
    fn test_theta_rolls_early_finish_knock_out_to_vanilla() {
        let m = market();
        let curves = CoefficientCurves::new(m.tenors(), LocalVolCoefficients::FLAT).unwrap();
        let pricing = pricing();
        let config = GreeksConfig::default();
        let calc = GreeksCalculator::new(&m, &curves, &pricing, &config);

        let day = config.day_fraction;
        let trade = TradeEconomics::vanilla(OptionKind::Put, 0.75, 0.5).with_barrier(BarrierTerms {
            knock: Knock::Out,
            lower: None,
            upper: Some(0.80),
            window: BarrierWindow::EarlyFinish { change: 0.5 * day },
        });
        let vanilla = TradeEconomics::vanilla(OptionKind::Put, 0.75, 0.5 - day);
        let p0 = calc.value(&trade).unwrap();
        let theta = calc.theta(&trade, p0).unwrap();
        assert_relative_eq!(theta, calc.value(&vanilla).unwrap() - p0, epsilon = 1e-12);
    }

    #[test]
    fn test_theta_against_intrinsic_on_last_day() {
        let m = market();
        let curves = CoefficientCurves::new(m.tenors(), LocalVolCoefficients::FLAT).unwrap();
        let pricing = pricing();
        let config = GreeksConfig::default();
        let calc = GreeksCalculator::new(&m, &curves, &pricing, &config);

        let trade = TradeEconomics::vanilla(OptionKind::Call, 0.70, 0.5 / 365.0);
        let theta = calc.theta(&trade, 0.06).unwrap();
        assert_relative_eq!(theta, 0.05 - 0.06, epsilon = 1e-12);
    }
}
