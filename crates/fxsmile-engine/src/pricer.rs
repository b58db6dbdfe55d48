//! Backward induction over one or two grid legs.
//!
//! [`Pricer::price`] values an [`OptionDescriptor`] against a market and a
//! set of local-volatility coefficient curves. Knock-ins and one-touches
//! are never solved directly: the grid solves the knock-out or no-touch
//! and the result is taken from the vanilla or the discounted payout.
//!
//! A windowed barrier is solved in two legs. The leg from expiry back to
//! the barrier change runs on the `after` grid; its solution is remapped
//! onto the `before` grid, which carries the induction back to today.

use fxsmile_curves::{CoefficientCurves, Curve, MarketSmile};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::descriptor::{LegGrid, OptionDescriptor};
use crate::error::{EngineError, EngineResult};
use crate::grid::{FiniteDifferenceGrid, KnockedEdges, StepCoefficients};
use crate::local_vol::LocalVolShape;
use crate::payoff::{GridPayoff, Payout, PayoffStyle};

/// Barrier-family prices below this are treated as numerical noise.
pub const NOISE_FLOOR: f64 = -1e-4;

/// Barrier-family prices above this are treated as numerical noise.
pub const NOISE_CAP: f64 = 1e10;

/// How a value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValuationStatus {
    /// Grid solve.
    Solved,
    /// A barrier-family grid result outside the plausible range, replaced
    /// by 0.
    ClampedNoise {
        /// The rejected result.
        raw: f64,
    },
    /// Time to expiry under the cut-off; valued at intrinsic.
    Intrinsic,
    /// A live barrier was already crossed; valued in the knocked state.
    BarrierBreached,
}

/// Present value with the path that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    /// Present value in numeraire units per unit of asset notional.
    pub value: f64,
    /// How the value was obtained.
    pub status: ValuationStatus,
}

impl Valuation {
    fn new(value: f64, status: ValuationStatus) -> Self {
        Self { value, status }
    }
}

/// Finite-difference pricer over a market and coefficient curves.
#[derive(Debug, Clone, Copy)]
pub struct Pricer<'a> {
    market: &'a MarketSmile,
    coefficients: &'a CoefficientCurves,
}

/// Where the induction of one leg starts and ends, and how its edges behave.
struct Leg<'g> {
    grid: &'g mut FiniteDifferenceGrid,
    later: f64,
    earlier: f64,
    steps: usize,
    knocked: KnockedEdges,
}

impl<'a> Pricer<'a> {
    /// Creates a pricer.
    pub fn new(market: &'a MarketSmile, coefficients: &'a CoefficientCurves) -> Self {
        Self {
            market,
            coefficients,
        }
    }

    /// Market the pricer reads.
    pub fn market(&self) -> &MarketSmile {
        self.market
    }

    /// Coefficient curves the pricer reads.
    pub fn coefficients(&self) -> &CoefficientCurves {
        self.coefficients
    }

    /// Present value of `d`.
    pub fn value(&self, d: &OptionDescriptor) -> EngineResult<f64> {
        self.price(d).map(|v| v.value)
    }

    /// Values `d`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NumericDomain`] if the result is NaN
    /// - [`EngineError::GridConfiguration`] for unusable grid bounds
    /// - [`EngineError::Math`] if a tridiagonal solve breaks down
    pub fn price(&self, d: &OptionDescriptor) -> EngineResult<Valuation> {
        let spot = d.spot();

        if d.style == PayoffStyle::Spot {
            return Ok(Valuation::new(spot - d.strike, ValuationStatus::Intrinsic));
        }
        if d.expiry <= d.intrinsic_cutoff {
            let value = d.style.settle(spot, d.strike, d.hit_at(spot));
            return Ok(Valuation::new(value, ValuationStatus::Intrinsic));
        }
        if d.is_breached() {
            return self.price_breached(d);
        }

        let solved = self.solve(&d.solved())?;
        let value = if d.style.is_complement() {
            match d.vanilla_equivalent() {
                Some(vanilla) => self.solve(&vanilla)? - solved,
                None => self.discounted_payout(d) - solved,
            }
        } else {
            solved
        };

        if value.is_nan() {
            return Err(EngineError::numeric_domain(format!(
                "NaN price for {:?} at strike {}",
                d.style, d.strike
            )));
        }
        if d.style.is_barrier_family() && !(NOISE_FLOOR..=NOISE_CAP).contains(&value) {
            warn!(raw = value, style = ?d.style, "barrier price outside plausible range, clamped to 0");
            return Ok(Valuation::new(0.0, ValuationStatus::ClampedNoise { raw: value }));
        }
        Ok(Valuation::new(value, ValuationStatus::Solved))
    }

    fn price_breached(&self, d: &OptionDescriptor) -> EngineResult<Valuation> {
        debug!(style = ?d.style, spot = d.spot(), "barrier already breached");
        let value = match d.style {
            PayoffStyle::Touch { .. } | PayoffStyle::Rebate { .. } => {
                if d.style.is_complement() {
                    self.discounted_payout(d)
                } else {
                    0.0
                }
            }
            _ if d.style.is_complement() => match d.vanilla_equivalent() {
                Some(vanilla) => self.solve(&vanilla)?,
                None => 0.0,
            },
            _ => 0.0,
        };
        Ok(Valuation::new(value, ValuationStatus::BarrierBreached))
    }

    /// Discount factor to `t` from the domestic curve.
    pub fn domestic_discount(&self, t: f64) -> f64 {
        (-self.market.domestic_curve().interpolate_linear(t) * t).exp()
    }

    /// Foreign discount factor to `t`.
    pub fn foreign_discount(&self, t: f64) -> f64 {
        (-self.market.foreign_curve().interpolate_linear(t) * t).exp()
    }

    /// Today's value of the fixed payout of a touch or rebate.
    fn discounted_payout(&self, d: &OptionDescriptor) -> f64 {
        match d.style.touch_payout() {
            Some(Payout::Asset) => d.spot() * self.foreign_discount(d.expiry),
            Some(Payout::Cash) | None => self.domestic_discount(d.expiry),
        }
    }

    /// Grid value of a style the grid can solve directly, discounted to
    /// today.
    fn solve(&self, d: &OptionDescriptor) -> EngineResult<f64> {
        let payoff = d.style.grid_payoff().ok_or_else(|| {
            EngineError::invalid_descriptor(format!("{:?} has no grid payoff", d.style))
        })?;
        let atm_vol = self.market.atm_vol_curve().interpolate_variance(d.expiry);
        if !(atm_vol > 0.0) {
            return Err(EngineError::InvalidMarket(format!(
                "ATM volatility {atm_vol} at {} is not positive",
                d.expiry
            )));
        }

        let knocked_after = d.knocked_after();
        let mut after = grid_for(&d.after)?;
        after.set_initial_condition(payoff, d.strike, knocked_after);

        let grid = match (d.window.change_time(), d.before.as_ref()) {
            (Some(change), Some(before_leg)) => {
                debug!(
                    style = ?d.style,
                    change,
                    after_steps = d.after.time_steps,
                    before_steps = before_leg.time_steps,
                    "two-leg induction"
                );
                self.induct(
                    d,
                    payoff,
                    atm_vol,
                    Leg {
                        grid: &mut after,
                        later: d.expiry,
                        earlier: change,
                        steps: d.after.time_steps,
                        knocked: knocked_after,
                    },
                )?;

                let knocked_before = d.knocked_before();
                let mut before = grid_for(before_leg)?;
                before.remap_from(&after, knocked_after, knocked_before);
                self.induct(
                    d,
                    payoff,
                    atm_vol,
                    Leg {
                        grid: &mut before,
                        later: change,
                        earlier: 0.0,
                        steps: before_leg.time_steps,
                        knocked: knocked_before,
                    },
                )?;
                before
            }
            _ => {
                debug!(
                    style = ?d.style,
                    steps = d.after.time_steps,
                    nodes = d.after.asset_steps,
                    "single-leg induction"
                );
                self.induct(
                    d,
                    payoff,
                    atm_vol,
                    Leg {
                        grid: &mut after,
                        later: d.expiry,
                        earlier: 0.0,
                        steps: d.after.time_steps,
                        knocked: knocked_after,
                    },
                )?;
                after
            }
        };

        Ok(self.domestic_discount(d.expiry) * grid.value_at(d.log_spot))
    }

    /// Steps `leg.grid` from `leg.later` back to `leg.earlier`.
    #[allow(clippy::cast_precision_loss)]
    fn induct(
        &self,
        d: &OptionDescriptor,
        payoff: GridPayoff,
        atm_vol: f64,
        leg: Leg<'_>,
    ) -> EngineResult<()> {
        let domestic = self.market.domestic_curve();
        let foreign = self.market.foreign_curve();
        let growth = |c: &Curve, t: f64| c.interpolate_linear(t) * t;

        let expiry_growth = growth(domestic, d.expiry) - growth(foreign, d.expiry);
        let dt = (leg.later - leg.earlier) / leg.steps as f64;
        let grid = leg.grid;
        let (lower, upper) = (grid.lower(), grid.upper());

        for j in 1..=leg.steps {
            let tau = (leg.later - j as f64 * dt).max(0.0);
            let mid = tau + 0.5 * dt;

            let drift = (growth(domestic, tau + dt) - growth(domestic, tau)
                - (growth(foreign, tau + dt) - growth(foreign, tau)))
                / dt;
            let carry = expiry_growth - (growth(domestic, tau) - growth(foreign, tau));
            let mid_carry =
                (domestic.interpolate_linear(mid) - foreign.interpolate_linear(mid)) * mid;

            let coeffs = self.coefficients.at(mid);
            let step = StepCoefficients {
                dt,
                drift,
                atm_vol,
                centre: d.anchor + mid_carry,
                mid_time: mid,
                shape: LocalVolShape::new(&coeffs),
                vol_of_vol: coeffs.vol_of_vol,
                mix: (coeffs.mean_reversion * dt / (tau + dt)).clamp(0.0, 1.0),
            };

            let edge = |x: f64, knocked: bool| {
                if knocked {
                    0.0
                } else {
                    payoff.terminal((x + carry).exp(), d.strike)
                }
            };
            grid.step(
                &step,
                edge(lower, leg.knocked.lower),
                edge(upper, leg.knocked.upper),
            )?;
        }
        Ok(())
    }
}

fn grid_for(leg: &LegGrid) -> EngineResult<FiniteDifferenceGrid> {
    FiniteDifferenceGrid::new(leg.bounds.lower, leg.bounds.upper, leg.asset_steps)
}
