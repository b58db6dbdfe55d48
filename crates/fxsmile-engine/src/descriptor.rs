//! Per-valuation grid configuration.
//!
//! An [`OptionDescriptor`] is built once per pricing request and never
//! mutated afterwards. Derived descriptors (the vanilla leg of a knock-in,
//! a spot-shifted copy for the calibration speed condition) are new values.

use fxsmile_config::PricingConfig;
use fxsmile_curves::MarketSmile;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::grid::KnockedEdges;
use crate::payoff::{classify, BarrierLevels, BarrierWindow, PayoffStyle, TradeEconomics};
use crate::smile::market_strikes;

/// Default time to expiry below which options are valued at intrinsic.
pub const DEFAULT_INTRINSIC_CUTOFF: f64 = 1e-4;

/// Log-asset interval of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    /// Lower log-asset bound.
    pub lower: f64,
    /// Upper log-asset bound.
    pub upper: f64,
}

impl GridBounds {
    /// Bounds `[ln(low), ln(high)]` from asset levels.
    pub fn from_levels(low: f64, high: f64) -> Self {
        Self {
            lower: low.ln(),
            upper: high.ln(),
        }
    }

    /// Returns true if `x` lies inside the bounds.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.lower && x <= self.upper
    }
}

/// Resolution and bounds of one induction leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegGrid {
    /// Bounds the leg is solved on.
    pub bounds: GridBounds,
    /// Bounds a vanilla with the same horizon would use.
    pub vanilla: GridBounds,
    /// Asset steps.
    pub asset_steps: usize,
    /// Time steps.
    pub time_steps: usize,
}

/// Everything the pricer needs to value one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDescriptor {
    /// Instrument variant.
    pub style: PayoffStyle,
    /// Barrier monitoring window.
    pub window: BarrierWindow,
    /// Years to expiry.
    pub expiry: f64,
    /// Strike (unused by touches).
    pub strike: f64,
    /// Log-spot at which the solution is read.
    pub log_spot: f64,
    /// Log-spot from which local-volatility moneyness is measured.
    pub anchor: f64,
    /// Barrier levels in spot units.
    pub barriers: BarrierLevels,
    /// Grid of the leg ending at expiry (the only leg without a window).
    pub after: LegGrid,
    /// Grid of the leg from the barrier change back to today.
    pub before: Option<LegGrid>,
    /// Below this expiry the intrinsic-value path is used.
    pub intrinsic_cutoff: f64,
}

impl OptionDescriptor {
    /// Builds the descriptor of a booked trade.
    ///
    /// Grid bounds come from the 25-delta strikes of the tenor bucket that
    /// contains each leg's horizon, widened by the configured multiplier,
    /// with barrier levels replacing the bound on their side.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidDescriptor`] if the trade cannot be classified
    /// - [`EngineError::InvalidMarket`] if market strikes cannot be derived
    pub fn from_trade(
        trade: &TradeEconomics,
        market: &MarketSmile,
        config: &PricingConfig,
    ) -> EngineResult<Self> {
        let (style, window) = classify(trade)?;
        let barriers = if style.is_barrier_family() {
            trade.barrier_levels()
        } else {
            BarrierLevels::NONE
        };
        let expiry = trade.expiry;

        let vanilla_at = |horizon: f64| -> EngineResult<GridBounds> {
            let quote = market.quote(market.bucket_index(horizon))?;
            let strikes = market_strikes(
                quote,
                market.spot(),
                config.delta_cut_time,
                config.left_hand_delta,
            )?;
            let m = config.grid_width_multiplier;
            Ok(GridBounds::from_levels(strikes.put25() / m, strikes.call25() * m))
        };
        let barrier_bounds = |vanilla: GridBounds| GridBounds {
            lower: barriers.lower.map_or(vanilla.lower, f64::ln),
            upper: barriers.upper.map_or(vanilla.upper, f64::ln),
        };

        let asset_steps = config.grid_nodes;
        let vanilla_expiry = vanilla_at(expiry)?;

        let (after, before) = match window {
            BarrierWindow::Continuous => {
                let bounds = if style.is_barrier_family() {
                    barrier_bounds(vanilla_expiry)
                } else {
                    vanilla_expiry
                };
                let after = LegGrid {
                    bounds,
                    vanilla: vanilla_expiry,
                    asset_steps,
                    time_steps: config.time_steps(expiry),
                };
                (after, None)
            }
            BarrierWindow::EarlyFinish { change } | BarrierWindow::LateStart { change } => {
                let vanilla_change = vanilla_at(change)?;
                let early = matches!(window, BarrierWindow::EarlyFinish { .. });
                let after = LegGrid {
                    bounds: if early {
                        vanilla_expiry
                    } else {
                        barrier_bounds(vanilla_expiry)
                    },
                    vanilla: vanilla_expiry,
                    asset_steps,
                    time_steps: config.time_steps(expiry),
                };
                let before = LegGrid {
                    bounds: if early {
                        barrier_bounds(vanilla_change)
                    } else {
                        vanilla_change
                    },
                    vanilla: vanilla_change,
                    asset_steps,
                    time_steps: config.time_steps(expiry - change),
                };
                (after, Some(before))
            }
        };

        let log_spot = market.spot().ln();
        let descriptor = Self {
            style,
            window,
            expiry,
            strike: trade.strike,
            log_spot,
            anchor: log_spot,
            barriers,
            after,
            before,
            intrinsic_cutoff: config.intrinsic_cutoff,
        };
        descriptor.check_bounds()?;
        Ok(descriptor)
    }

    /// Continuously monitored instrument on explicit bounds.
    ///
    /// Used by calibration, which prices its instruments on a fixed grid.
    #[allow(clippy::too_many_arguments)]
    pub fn on_grid(
        style: PayoffStyle,
        strike: f64,
        expiry: f64,
        log_spot: f64,
        barriers: BarrierLevels,
        bounds: GridBounds,
        asset_steps: usize,
        time_steps: usize,
    ) -> EngineResult<Self> {
        let descriptor = Self {
            style,
            window: BarrierWindow::Continuous,
            expiry,
            strike,
            log_spot,
            anchor: log_spot,
            barriers,
            after: LegGrid {
                bounds,
                vanilla: bounds,
                asset_steps,
                time_steps,
            },
            before: None,
            intrinsic_cutoff: DEFAULT_INTRINSIC_CUTOFF,
        };
        descriptor.check_bounds()?;
        Ok(descriptor)
    }

    fn check_bounds(&self) -> EngineResult<()> {
        let legs = std::iter::once(&self.after).chain(self.before.as_ref());
        for leg in legs {
            let b = leg.bounds;
            if !(b.lower.is_finite() && b.upper.is_finite() && b.lower < b.upper)
                || leg.asset_steps < 2
            {
                return Err(EngineError::GridConfiguration {
                    lower: b.lower,
                    upper: b.upper,
                    nodes: leg.asset_steps,
                });
            }
            if leg.time_steps == 0 {
                return Err(EngineError::invalid_descriptor("leg without time steps"));
            }
        }
        Ok(())
    }

    /// Same descriptor read at a different log-spot.
    ///
    /// The moneyness anchor stays where it was, so the local-volatility
    /// surface does not move with the read-out point.
    #[must_use]
    pub fn with_log_spot(&self, log_spot: f64) -> Self {
        Self {
            log_spot,
            ..self.clone()
        }
    }

    /// Spot level.
    pub fn spot(&self) -> f64 {
        self.log_spot.exp()
    }

    /// Barrier change time, if the window has one.
    pub fn change_time(&self) -> Option<f64> {
        self.window.change_time()
    }

    /// Returns true if a barrier monitored today has already been crossed.
    pub fn is_breached(&self) -> bool {
        self.style.is_barrier_family()
            && self.window.live_at_valuation()
            && self.barriers.breached_by(self.spot())
    }

    /// Returns true if a live barrier was crossed when the trade settles at
    /// asset level `s`, judging only by `s` itself.
    pub fn hit_at(&self, s: f64) -> bool {
        self.style.is_barrier_family() && self.barriers.breached_by(s)
    }

    /// Grid edges that are knock-out barriers on the leg ending at expiry.
    pub fn knocked_after(&self) -> KnockedEdges {
        if self.window.live_at_expiry() {
            self.knocked_edges()
        } else {
            KnockedEdges::NONE
        }
    }

    /// Grid edges that are knock-out barriers on the leg ending today.
    pub fn knocked_before(&self) -> KnockedEdges {
        if self.window.live_at_valuation() {
            self.knocked_edges()
        } else {
            KnockedEdges::NONE
        }
    }

    fn knocked_edges(&self) -> KnockedEdges {
        let solved = self.style.solved_style();
        if !solved.is_barrier_family() {
            return KnockedEdges::NONE;
        }
        KnockedEdges {
            lower: solved.has_lower_barrier(),
            upper: solved.has_upper_barrier(),
        }
    }

    /// The vanilla a knock-in is decomposed against.
    ///
    /// Same strike, expiry and resolution, solved on the vanilla bounds of
    /// the expiry leg with no barrier. `None` for styles without a vanilla
    /// leg.
    pub fn vanilla_equivalent(&self) -> Option<Self> {
        let kind = self.style.vanilla_kind()?;
        Some(Self {
            style: PayoffStyle::Vanilla { kind },
            window: BarrierWindow::Continuous,
            barriers: BarrierLevels::NONE,
            after: LegGrid {
                bounds: self.after.vanilla,
                ..self.after
            },
            before: None,
            ..self.clone()
        })
    }

    /// The same instrument with its knock-in or one-touch replaced by the
    /// knock-out or no-touch that is solved on the grid.
    #[must_use]
    pub fn solved(&self) -> Self {
        Self {
            style: self.style.solved_style(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payoff::{BarrierTerms, Knock, OptionKind};
    use approx::assert_relative_eq;
    use fxsmile_curves::SmileQuote;

    fn market() -> MarketSmile {
        let quote = |tenor: f64| SmileQuote {
            tenor,
            domestic_rate: 0.045,
            foreign_rate: 0.03,
            atm_vol: 0.10,
            rr25: -0.005,
            fly25: 0.002,
            rr10: -0.01,
            fly10: 0.006,
            speed: 0.0,
        };
        MarketSmile::new(0.70, vec![quote(0.25), quote(1.0), quote(2.0)]).unwrap()
    }

    fn up_out(window: BarrierWindow) -> TradeEconomics {
        TradeEconomics::vanilla(OptionKind::Call, 0.70, 1.0).with_barrier(BarrierTerms {
            knock: Knock::Out,
            lower: None,
            upper: Some(0.80),
            window,
        })
    }

    #[test]
    fn test_vanilla_bounds_bracket_spot() {
        let trade = TradeEconomics::vanilla(OptionKind::Put, 0.68, 0.5);
        let d = OptionDescriptor::from_trade(&trade, &market(), &PricingConfig::default()).unwrap();
        assert!(d.after.bounds.contains(d.log_spot));
        assert!(d.after.bounds.lower < (0.70_f64 / 2.0).ln() + 0.2);
        assert!(d.before.is_none());
        assert_eq!(d.after.time_steps, 50);
        assert_eq!(d.knocked_after(), KnockedEdges::NONE);
    }

    #[test]
    fn test_barrier_replaces_bound() {
        let d = OptionDescriptor::from_trade(
            &up_out(BarrierWindow::Continuous),
            &market(),
            &PricingConfig::default(),
        )
        .unwrap();
        assert_relative_eq!(d.after.bounds.upper, 0.80_f64.ln());
        assert_relative_eq!(d.after.bounds.lower, d.after.vanilla.lower);
        assert!(d.knocked_after().upper && !d.knocked_after().lower);
        assert!(!d.is_breached());
    }

    #[test]
    fn test_window_legs() {
        let config = PricingConfig::default();
        let early = OptionDescriptor::from_trade(
            &up_out(BarrierWindow::EarlyFinish { change: 0.4 }),
            &market(),
            &config,
        )
        .unwrap();
        let before = early.before.unwrap();
        assert_relative_eq!(before.bounds.upper, 0.80_f64.ln());
        assert_eq!(early.after.bounds, early.after.vanilla);
        assert_eq!(early.knocked_after(), KnockedEdges::NONE);
        assert!(early.knocked_before().upper);
        assert_eq!(before.time_steps, 60);

        let late = OptionDescriptor::from_trade(
            &up_out(BarrierWindow::LateStart { change: 0.4 }),
            &market(),
            &config,
        )
        .unwrap();
        assert_relative_eq!(late.after.bounds.upper, 0.80_f64.ln());
        assert!(late.knocked_after().upper);
        assert_eq!(late.knocked_before(), KnockedEdges::NONE);
    }

    #[test]
    fn test_vanilla_equivalent_drops_barrier() {
        let ki = TradeEconomics::vanilla(OptionKind::Call, 0.70, 1.0).with_barrier(BarrierTerms {
            knock: Knock::In,
            lower: Some(0.62),
            upper: None,
            window: BarrierWindow::Continuous,
        });
        let d = OptionDescriptor::from_trade(&ki, &market(), &PricingConfig::default()).unwrap();
        let vanilla = d.vanilla_equivalent().unwrap();
        assert_eq!(
            vanilla.style,
            PayoffStyle::Vanilla {
                kind: OptionKind::Call
            }
        );
        assert_eq!(vanilla.after.bounds, d.after.vanilla);
        assert_eq!(vanilla.barriers, BarrierLevels::NONE);
        assert!(d.knocked_after().lower);
    }

    #[test]
    fn test_breach_detection() {
        let trade = up_out(BarrierWindow::Continuous);
        let m = market().with_spot(0.81).unwrap();
        let d = OptionDescriptor::from_trade(&trade, &m, &PricingConfig::default());
        // upper bound ln(0.80) sits below spot but the grid itself is valid
        let d = d.unwrap();
        assert!(d.is_breached());

        let late = up_out(BarrierWindow::LateStart { change: 0.5 });
        let d = OptionDescriptor::from_trade(&late, &m, &PricingConfig::default()).unwrap();
        assert!(!d.is_breached());
    }

    #[test]
    fn test_on_grid_rejects_inverted_bounds() {
        let err = OptionDescriptor::on_grid(
            PayoffStyle::Vanilla {
                kind: OptionKind::Call,
            },
            1.0,
            1.0,
            0.0,
            BarrierLevels::NONE,
            GridBounds {
                lower: 0.5,
                upper: -0.5,
            },
            100,
            50,
        );
        assert!(matches!(err, Err(EngineError::GridConfiguration { .. })));
    }
}
