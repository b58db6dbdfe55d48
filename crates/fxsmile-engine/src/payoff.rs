//! Payoff taxonomy and trade classification.
//!
//! A trade is described by its economics ([`TradeEconomics`]) and mapped
//! once, by [`classify`], to a [`PayoffStyle`] plus a [`BarrierWindow`].
//! Everything downstream (descriptor, grid, parity, Greeks) branches on
//! those two values only.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    /// Right to buy the asset at the strike.
    Call,
    /// Right to sell the asset at the strike.
    Put,
}

impl OptionKind {
    /// +1 for calls, -1 for puts.
    pub fn sign(self) -> f64 {
        match self {
            Self::Call => 1.0,
            Self::Put => -1.0,
        }
    }

    /// Exercise value at asset level `s`.
    pub fn intrinsic(self, s: f64, strike: f64) -> f64 {
        (self.sign() * (s - strike)).max(0.0)
    }

    /// Returns true if exercise pays at asset level `s`.
    pub fn in_the_money(self, s: f64, strike: f64) -> bool {
        self.sign() * (s - strike) > 0.0
    }
}

/// Side of a single barrier relative to spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierDirection {
    /// Barrier above spot.
    Up,
    /// Barrier below spot.
    Down,
}

/// Knock-in or knock-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Knock {
    /// The option comes alive when a barrier is hit.
    In,
    /// The option dies when a barrier is hit.
    Out,
}

/// One-touch or no-touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Touch {
    /// Pays if a barrier is hit.
    OneTouch,
    /// Pays if no barrier is hit.
    NoTouch,
}

/// Currency of a fixed payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payout {
    /// One unit of the numeraire (domestic) currency.
    Cash,
    /// One unit of the asset (foreign) currency.
    Asset,
}

/// Closed set of instrument variants the engine values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum PayoffStyle {
    /// European call or put.
    Vanilla {
        /// Call or put.
        kind: OptionKind,
    },
    /// Single barrier option.
    Barrier {
        /// Barrier side.
        direction: BarrierDirection,
        /// In or out.
        knock: Knock,
        /// Call or put.
        kind: OptionKind,
    },
    /// Option with a lower and an upper barrier.
    DoubleBarrier {
        /// In or out.
        knock: Knock,
        /// Call or put.
        kind: OptionKind,
    },
    /// Single-barrier one-touch or no-touch paying at expiry.
    Touch {
        /// Barrier side.
        direction: BarrierDirection,
        /// One-touch or no-touch.
        touch: Touch,
        /// Payout currency.
        payout: Payout,
    },
    /// Double-barrier one-touch or no-touch paying at expiry.
    Rebate {
        /// One-touch or no-touch.
        touch: Touch,
        /// Payout currency.
        payout: Payout,
    },
    /// European digital.
    DigitalAtExpiry {
        /// Payout currency.
        payout: Payout,
        /// Call (pays above strike) or put.
        kind: OptionKind,
    },
    /// Outright forward, asset minus strike at expiry.
    Forward,
    /// Spot exchange, asset minus strike now.
    Spot,
}

/// When the barrier of a barrier-family style is monitored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BarrierWindow {
    /// Monitored from today to expiry.
    #[default]
    Continuous,
    /// Monitored from today until `change`, then removed.
    EarlyFinish {
        /// Years from today to the end of monitoring.
        change: f64,
    },
    /// Monitored from `change` until expiry.
    LateStart {
        /// Years from today to the start of monitoring.
        change: f64,
    },
}

impl BarrierWindow {
    /// Barrier-change time, if the window has one.
    pub fn change_time(&self) -> Option<f64> {
        match *self {
            Self::Continuous => None,
            Self::EarlyFinish { change } | Self::LateStart { change } => Some(change),
        }
    }

    /// Returns true if the barrier is monitored at the valuation date.
    pub fn live_at_valuation(&self) -> bool {
        !matches!(self, Self::LateStart { .. })
    }

    /// Returns true if the barrier is monitored at expiry.
    pub fn live_at_expiry(&self) -> bool {
        !matches!(self, Self::EarlyFinish { .. })
    }
}

/// Barrier levels of a trade, in spot units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BarrierLevels {
    /// Lower barrier, if any.
    pub lower: Option<f64>,
    /// Upper barrier, if any.
    pub upper: Option<f64>,
}

impl BarrierLevels {
    /// No barrier.
    pub const NONE: Self = Self {
        lower: None,
        upper: None,
    };

    /// Returns true if `spot` lies on or beyond a barrier.
    pub fn breached_by(&self, spot: f64) -> bool {
        self.lower.is_some_and(|l| spot <= l) || self.upper.is_some_and(|u| spot >= u)
    }

    /// Distance from `spot` to the nearer barrier.
    pub fn distance(&self, spot: f64) -> Option<f64> {
        let lower = self.lower.map(|l| (spot - l).abs());
        let upper = self.upper.map(|u| (u - spot).abs());
        match (lower, upper) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// How the trade settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    /// Exchange of asset against strike (vanilla, barrier, forward, spot).
    Physical,
    /// Fixed payout in the given currency (digitals and touches).
    Cash(Payout),
}

/// Barrier terms of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarrierTerms {
    /// In/out (for touches: in = one-touch, out = no-touch).
    pub knock: Knock,
    /// Lower level.
    #[serde(default)]
    pub lower: Option<f64>,
    /// Upper level.
    #[serde(default)]
    pub upper: Option<f64>,
    /// Monitoring window.
    #[serde(default)]
    pub window: BarrierWindow,
}

/// Economics of an FX option trade as booked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeEconomics {
    /// Call or put; absent for forwards, spot deals and touches.
    #[serde(default)]
    pub option: Option<OptionKind>,
    /// Settlement.
    pub settlement: Settlement,
    /// Strike (ignored by touches).
    #[serde(default)]
    pub strike: f64,
    /// Years to expiry.
    pub expiry: f64,
    /// Barrier terms, if any.
    #[serde(default)]
    pub barrier: Option<BarrierTerms>,
}

impl TradeEconomics {
    /// Plain European option.
    pub fn vanilla(kind: OptionKind, strike: f64, expiry: f64) -> Self {
        Self {
            option: Some(kind),
            settlement: Settlement::Physical,
            strike,
            expiry,
            barrier: None,
        }
    }

    /// Adds barrier terms.
    #[must_use]
    pub fn with_barrier(mut self, barrier: BarrierTerms) -> Self {
        self.barrier = Some(barrier);
        self
    }

    /// Barrier levels, empty without barrier terms.
    pub fn barrier_levels(&self) -> BarrierLevels {
        self.barrier.map_or(BarrierLevels::NONE, |b| BarrierLevels {
            lower: b.lower,
            upper: b.upper,
        })
    }
}

impl PayoffStyle {
    /// Barrier, double barrier, touch and rebate styles.
    pub fn is_barrier_family(&self) -> bool {
        matches!(
            self,
            Self::Barrier { .. } | Self::DoubleBarrier { .. } | Self::Touch { .. } | Self::Rebate { .. }
        )
    }

    /// Returns true if the style monitors a lower barrier.
    pub fn has_lower_barrier(&self) -> bool {
        match self {
            Self::Barrier { direction, .. } | Self::Touch { direction, .. } => {
                *direction == BarrierDirection::Down
            }
            Self::DoubleBarrier { .. } | Self::Rebate { .. } => true,
            _ => false,
        }
    }

    /// Returns true if the style monitors an upper barrier.
    pub fn has_upper_barrier(&self) -> bool {
        match self {
            Self::Barrier { direction, .. } | Self::Touch { direction, .. } => {
                *direction == BarrierDirection::Up
            }
            Self::DoubleBarrier { .. } | Self::Rebate { .. } => true,
            _ => false,
        }
    }

    /// Returns true if the style is valued as a complement of another.
    ///
    /// Knock-ins are vanilla minus knock-out; one-touches are the discounted
    /// payout minus the no-touch.
    pub fn is_complement(&self) -> bool {
        matches!(
            self,
            Self::Barrier { knock: Knock::In, .. }
                | Self::DoubleBarrier { knock: Knock::In, .. }
                | Self::Touch { touch: Touch::OneTouch, .. }
                | Self::Rebate { touch: Touch::OneTouch, .. }
        )
    }

    /// The style actually solved on the grid.
    ///
    /// Knock-ins map to knock-outs and one-touches to no-touches; all other
    /// styles are returned unchanged.
    #[must_use]
    pub fn solved_style(&self) -> Self {
        match *self {
            Self::Barrier {
                direction, kind, ..
            } => Self::Barrier {
                direction,
                knock: Knock::Out,
                kind,
            },
            Self::DoubleBarrier { kind, .. } => Self::DoubleBarrier {
                knock: Knock::Out,
                kind,
            },
            Self::Touch {
                direction, payout, ..
            } => Self::Touch {
                direction,
                touch: Touch::NoTouch,
                payout,
            },
            Self::Rebate { payout, .. } => Self::Rebate {
                touch: Touch::NoTouch,
                payout,
            },
            other => other,
        }
    }

    /// Terminal payoff applied on the grid, or `None` for the spot style.
    pub fn grid_payoff(&self) -> Option<GridPayoff> {
        match *self {
            Self::Vanilla { kind }
            | Self::Barrier { kind, .. }
            | Self::DoubleBarrier { kind, .. } => Some(match kind {
                OptionKind::Call => GridPayoff::Call,
                OptionKind::Put => GridPayoff::Put,
            }),
            Self::Touch { payout, .. } | Self::Rebate { payout, .. } => Some(match payout {
                Payout::Cash => GridPayoff::CashUnit,
                Payout::Asset => GridPayoff::AssetUnit,
            }),
            Self::DigitalAtExpiry { payout, kind } => Some(match payout {
                Payout::Cash => GridPayoff::CashDigital { kind },
                Payout::Asset => GridPayoff::AssetDigital { kind },
            }),
            Self::Forward => Some(GridPayoff::Linear),
            Self::Spot => None,
        }
    }

    /// Vanilla leg of a barrier option.
    pub fn vanilla_kind(&self) -> Option<OptionKind> {
        match *self {
            Self::Vanilla { kind }
            | Self::Barrier { kind, .. }
            | Self::DoubleBarrier { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Fixed payout currency of touch and rebate styles.
    pub fn touch_payout(&self) -> Option<Payout> {
        match *self {
            Self::Touch { payout, .. } | Self::Rebate { payout, .. } => Some(payout),
            _ => None,
        }
    }

    /// Value at expiry given the terminal asset level and whether a live
    /// barrier was hit.
    pub fn settle(&self, s: f64, strike: f64, hit: bool) -> f64 {
        match *self {
            Self::Vanilla { kind } => kind.intrinsic(s, strike),
            Self::Barrier { knock, kind, .. } | Self::DoubleBarrier { knock, kind } => {
                let alive = match knock {
                    Knock::In => hit,
                    Knock::Out => !hit,
                };
                if alive {
                    kind.intrinsic(s, strike)
                } else {
                    0.0
                }
            }
            Self::Touch { touch, payout, .. } | Self::Rebate { touch, payout } => {
                let pays = match touch {
                    Touch::OneTouch => hit,
                    Touch::NoTouch => !hit,
                };
                match (pays, payout) {
                    (false, _) => 0.0,
                    (true, Payout::Cash) => 1.0,
                    (true, Payout::Asset) => s,
                }
            }
            Self::DigitalAtExpiry { payout, kind } => {
                GridPayoff::digital(payout, kind).terminal(s, strike)
            }
            Self::Forward | Self::Spot => s - strike,
        }
    }
}

/// Terminal and asymptotic payoff on the grid, as a function of the
/// forward to expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridPayoff {
    /// `max(F - K, 0)`.
    Call,
    /// `max(K - F, 0)`.
    Put,
    /// One numeraire unit if in the money.
    CashDigital {
        /// Call or put.
        kind: OptionKind,
    },
    /// One asset unit if in the money.
    AssetDigital {
        /// Call or put.
        kind: OptionKind,
    },
    /// One numeraire unit.
    CashUnit,
    /// One asset unit.
    AssetUnit,
    /// `F - K`.
    Linear,
}

impl GridPayoff {
    fn digital(payout: Payout, kind: OptionKind) -> Self {
        match payout {
            Payout::Cash => Self::CashDigital { kind },
            Payout::Asset => Self::AssetDigital { kind },
        }
    }

    /// Payoff at forward level `f`.
    pub fn terminal(self, f: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (f - strike).max(0.0),
            Self::Put => (strike - f).max(0.0),
            Self::CashDigital { kind } => digital_weight(kind, f, strike),
            Self::AssetDigital { kind } => f * digital_weight(kind, f, strike),
            Self::CashUnit => 1.0,
            Self::AssetUnit => f,
            Self::Linear => f - strike,
        }
    }
}

// Half weight at the strike itself.
fn digital_weight(kind: OptionKind, f: f64, strike: f64) -> f64 {
    if f == strike {
        0.5
    } else if kind.in_the_money(f, strike) {
        1.0
    } else {
        0.0
    }
}

/// Maps trade economics to a payoff style and barrier window.
///
/// Classification looks at which terms are present, never at spot: a
/// barrier already crossed is handled when the trade is priced.
///
/// # Errors
///
/// [`EngineError::InvalidDescriptor`] for combinations the engine does not
/// value (barriers on digitals, touches without levels, inverted double
/// barriers, windows outside `(0, expiry)`).
pub fn classify(trade: &TradeEconomics) -> EngineResult<(PayoffStyle, BarrierWindow)> {
    if !(trade.expiry.is_finite() && trade.expiry >= 0.0) {
        return Err(EngineError::invalid_descriptor(format!(
            "expiry must be non-negative, got {}",
            trade.expiry
        )));
    }
    if !trade.strike.is_finite() {
        return Err(EngineError::invalid_descriptor("strike is not finite"));
    }

    let style = match (trade.settlement, trade.option, trade.barrier) {
        (Settlement::Physical, None, None) => {
            if trade.expiry > 0.0 {
                PayoffStyle::Forward
            } else {
                PayoffStyle::Spot
            }
        }
        (Settlement::Physical, None, Some(_)) => {
            return Err(EngineError::invalid_descriptor(
                "a forward cannot carry barrier terms",
            ))
        }
        (Settlement::Physical, Some(kind), None) => PayoffStyle::Vanilla { kind },
        (Settlement::Physical, Some(kind), Some(b)) => match barrier_shape(&b)? {
            Some(direction) => PayoffStyle::Barrier {
                direction,
                knock: b.knock,
                kind,
            },
            None => PayoffStyle::DoubleBarrier {
                knock: b.knock,
                kind,
            },
        },
        (Settlement::Cash(payout), Some(kind), None) => {
            PayoffStyle::DigitalAtExpiry { payout, kind }
        }
        (Settlement::Cash(_), Some(_), Some(_)) => {
            return Err(EngineError::invalid_descriptor(
                "digital-at-expiry options cannot carry barrier terms",
            ))
        }
        (Settlement::Cash(_), None, None) => {
            return Err(EngineError::invalid_descriptor(
                "a cash-settled trade needs an option kind or barrier terms",
            ))
        }
        (Settlement::Cash(payout), None, Some(b)) => {
            let touch = match b.knock {
                Knock::In => Touch::OneTouch,
                Knock::Out => Touch::NoTouch,
            };
            match barrier_shape(&b)? {
                Some(direction) => PayoffStyle::Touch {
                    direction,
                    touch,
                    payout,
                },
                None => PayoffStyle::Rebate { touch, payout },
            }
        }
    };

    if style.vanilla_kind().is_some() && !(trade.strike > 0.0) {
        return Err(EngineError::invalid_descriptor(format!(
            "strike must be positive, got {}",
            trade.strike
        )));
    }

    let window = match trade.barrier {
        Some(b) if style.is_barrier_family() => b.window,
        _ => BarrierWindow::Continuous,
    };
    if let Some(change) = window.change_time() {
        if !(change > 0.0 && change < trade.expiry) {
            return Err(EngineError::invalid_descriptor(format!(
                "barrier change time {change} outside (0, {})",
                trade.expiry
            )));
        }
    }

    Ok((style, window))
}

/// `Some(direction)` for a single barrier, `None` for a double barrier.
fn barrier_shape(b: &BarrierTerms) -> EngineResult<Option<BarrierDirection>> {
    for level in [b.lower, b.upper].into_iter().flatten() {
        if !(level > 0.0 && level.is_finite()) {
            return Err(EngineError::invalid_descriptor(format!(
                "barrier level must be positive, got {level}"
            )));
        }
    }
    match (b.lower, b.upper) {
        (Some(_), None) => Ok(Some(BarrierDirection::Down)),
        (None, Some(_)) => Ok(Some(BarrierDirection::Up)),
        (Some(l), Some(u)) if l < u => Ok(None),
        (Some(l), Some(u)) => Err(EngineError::invalid_descriptor(format!(
            "lower barrier {l} must be below upper barrier {u}"
        ))),
        (None, None) => Err(EngineError::invalid_descriptor(
            "barrier terms without a level",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn barrier(knock: Knock, lower: Option<f64>, upper: Option<f64>) -> BarrierTerms {
        BarrierTerms {
            knock,
            lower,
            upper,
            window: BarrierWindow::Continuous,
        }
    }

    #[test]
    fn test_classify_exchange_styles() {
        let call = TradeEconomics::vanilla(OptionKind::Call, 0.75, 1.0);
        assert_eq!(
            classify(&call).unwrap().0,
            PayoffStyle::Vanilla {
                kind: OptionKind::Call
            }
        );

        let down_out = call.with_barrier(barrier(Knock::Out, Some(0.7), None));
        assert_eq!(
            classify(&down_out).unwrap().0,
            PayoffStyle::Barrier {
                direction: BarrierDirection::Down,
                knock: Knock::Out,
                kind: OptionKind::Call
            }
        );

        let double_in = call.with_barrier(barrier(Knock::In, Some(0.7), Some(0.8)));
        assert_eq!(
            classify(&double_in).unwrap().0,
            PayoffStyle::DoubleBarrier {
                knock: Knock::In,
                kind: OptionKind::Call
            }
        );

        let forward = TradeEconomics {
            option: None,
            ..call
        };
        assert_eq!(classify(&forward).unwrap().0, PayoffStyle::Forward);
        let spot = TradeEconomics {
            expiry: 0.0,
            ..forward
        };
        assert_eq!(classify(&spot).unwrap().0, PayoffStyle::Spot);
    }

    #[test]
    fn test_classify_cash_styles() {
        let digital = TradeEconomics {
            option: Some(OptionKind::Put),
            settlement: Settlement::Cash(Payout::Asset),
            strike: 0.75,
            expiry: 0.5,
            barrier: None,
        };
        assert_eq!(
            classify(&digital).unwrap().0,
            PayoffStyle::DigitalAtExpiry {
                payout: Payout::Asset,
                kind: OptionKind::Put
            }
        );

        let one_touch = TradeEconomics {
            option: None,
            settlement: Settlement::Cash(Payout::Cash),
            strike: 0.0,
            expiry: 0.5,
            barrier: Some(barrier(Knock::In, None, Some(0.8))),
        };
        assert_eq!(
            classify(&one_touch).unwrap().0,
            PayoffStyle::Touch {
                direction: BarrierDirection::Up,
                touch: Touch::OneTouch,
                payout: Payout::Cash
            }
        );

        let dnt = TradeEconomics {
            barrier: Some(barrier(Knock::Out, Some(0.7), Some(0.8))),
            ..one_touch
        };
        assert_eq!(
            classify(&dnt).unwrap().0,
            PayoffStyle::Rebate {
                touch: Touch::NoTouch,
                payout: Payout::Cash
            }
        );
    }

    #[test]
    fn test_classify_rejects_bad_terms() {
        let call = TradeEconomics::vanilla(OptionKind::Call, 0.75, 1.0);
        let inverted = call.with_barrier(barrier(Knock::Out, Some(0.8), Some(0.7)));
        assert!(classify(&inverted).is_err());

        let window_after_expiry = call.with_barrier(BarrierTerms {
            window: BarrierWindow::LateStart { change: 1.5 },
            ..barrier(Knock::Out, None, Some(0.9))
        });
        assert!(classify(&window_after_expiry).is_err());

        let digital_with_barrier = TradeEconomics {
            settlement: Settlement::Cash(Payout::Cash),
            ..call.with_barrier(barrier(Knock::Out, None, Some(0.9)))
        };
        assert!(matches!(
            classify(&digital_with_barrier),
            Err(EngineError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_window_ignored_without_barrier_family() {
        let call = TradeEconomics::vanilla(OptionKind::Call, 0.75, 1.0);
        let (_, window) = classify(&call).unwrap();
        assert_eq!(window, BarrierWindow::Continuous);

        let late = call.with_barrier(BarrierTerms {
            window: BarrierWindow::LateStart { change: 0.5 },
            ..barrier(Knock::Out, None, Some(0.9))
        });
        let (_, window) = classify(&late).unwrap();
        assert!(!window.live_at_valuation());
        assert!(window.live_at_expiry());
    }

    #[test]
    fn test_complement_and_solved_style() {
        let ki = PayoffStyle::Barrier {
            direction: BarrierDirection::Up,
            knock: Knock::In,
            kind: OptionKind::Put,
        };
        assert!(ki.is_complement());
        assert_eq!(
            ki.solved_style(),
            PayoffStyle::Barrier {
                direction: BarrierDirection::Up,
                knock: Knock::Out,
                kind: OptionKind::Put
            }
        );
        assert!(!ki.solved_style().is_complement());
        assert_eq!(ki.grid_payoff(), Some(GridPayoff::Put));
        assert!(ki.has_upper_barrier() && !ki.has_lower_barrier());
    }

    #[test]
    fn test_settle_and_levels() {
        let nt = PayoffStyle::Touch {
            direction: BarrierDirection::Down,
            touch: Touch::NoTouch,
            payout: Payout::Asset,
        };
        assert_eq!(nt.settle(0.8, 0.0, false), 0.8);
        assert_eq!(nt.settle(0.8, 0.0, true), 0.0);

        let levels = BarrierLevels {
            lower: Some(0.7),
            upper: Some(0.8),
        };
        assert!(levels.breached_by(0.7));
        assert!(!levels.breached_by(0.75));
        assert!((levels.distance(0.74).unwrap() - 0.04).abs() < 1e-12);
        assert_eq!(BarrierLevels::NONE.distance(0.75), None);

        assert_eq!(GridPayoff::CashDigital { kind: OptionKind::Call }.terminal(1.0, 1.0), 0.5);
        assert_eq!(GridPayoff::Linear.terminal(0.9, 1.0), 0.9 - 1.0);
    }
}
