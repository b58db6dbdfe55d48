//! Delta, strike and volatility conversions across FX quoting conventions.
//!
//! Market smiles are quoted at five delta pillars (10- and 25-delta calls
//! and puts plus the ATM straddle) under one of four delta conventions:
//! spot or forward delta, each either plain (right-hand side) or premium
//! adjusted (left-hand side). Every conversion goes through a canonical
//! coordinate, the right-hand-side forward call delta `N(d1)`, on which the
//! pillar volatilities are interpolated with [`SmileCubic`].
//!
//! Premium-adjusted deltas depend on the volatility being solved for, so
//! those queries (and all strike queries) iterate a damped fixed point.
//! The outcome reports its iteration count and whether the budget ran out.

use fxsmile_curves::SmileQuote;
use fxsmile_math::distributions::{normal_cdf, normal_inverse_cdf, normal_pdf};
use fxsmile_math::interpolation::{Interpolator, SmileCubic};
use fxsmile_math::solvers::{bisection, SolverConfig, SolverStatus};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::payoff::OptionKind;

pub use fxsmile_math::interpolation::SmileExtrapolation;

/// Relative tolerance of strike solves and absolute tolerance of the vol
/// fixed point.
const EPS: f64 = 1e-5;

/// Iteration budget of strike solves and of the vol fixed point.
const MAX_ITERATIONS: u32 = 100;

/// Half-width of the strike search bracket in standard deviations.
const BRACKET_STDEVS: f64 = 4.0;

/// Delta quoting convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaConvention {
    /// Spot delta, premium excluded.
    RhsSpot,
    /// Forward delta, premium excluded.
    RhsForward,
    /// Spot delta, premium included.
    LhsSpot,
    /// Forward delta, premium included.
    LhsForward,
}

impl DeltaConvention {
    /// Market convention for an expiry: spot delta up to `delta_cut_time`,
    /// forward delta beyond it.
    pub fn for_expiry(expiry: f64, delta_cut_time: f64, left_hand: bool) -> Self {
        match (expiry <= delta_cut_time, left_hand) {
            (true, false) => Self::RhsSpot,
            (false, false) => Self::RhsForward,
            (true, true) => Self::LhsSpot,
            (false, true) => Self::LhsForward,
        }
    }

    /// Returns true for premium-adjusted conventions.
    pub fn is_left_hand(self) -> bool {
        matches!(self, Self::LhsSpot | Self::LhsForward)
    }
}

/// Side of a smile pillar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PillarSide {
    /// Call delta.
    Call,
    /// Put delta (quoted as a positive magnitude).
    Put,
    /// Delta-neutral straddle.
    Straddle,
}

impl From<OptionKind> for PillarSide {
    fn from(kind: OptionKind) -> Self {
        match kind {
            OptionKind::Call => Self::Call,
            OptionKind::Put => Self::Put,
        }
    }
}

/// One quoted smile point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaPillar {
    /// Unsigned delta (ignored for the straddle).
    pub delta: f64,
    /// Call, put or straddle.
    pub side: PillarSide,
    /// Implied volatility.
    pub vol: f64,
}

/// Strike found from a delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikeSolve {
    /// Strike.
    pub strike: f64,
    /// Whether the solve met its tolerance.
    pub status: SolverStatus,
}

/// Volatility read off the smile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolSolve {
    /// Volatility.
    pub vol: f64,
    /// Fixed-point iterations used (1 for direct reads).
    pub iterations: u32,
    /// True if the fixed point stopped on its iteration budget.
    pub exhausted: bool,
}

/// Solves for the strike whose delta under `convention` equals `delta`.
///
/// `numeraire_rate` and `asset_rate` are continuously compounded zero
/// rates to `expiry`. Right-hand-side deltas invert in closed form.
/// Premium-adjusted deltas are solved by bisection: the call delta has an
/// interior maximum in strike, so the search bracket is first cut at that
/// maximum and the root found is the one on the out-of-the-money side.
///
/// # Errors
///
/// [`EngineError::Math`] if no strike in `spot * exp(±4 vol sqrt(T))`
/// produces the delta.
#[allow(clippy::too_many_arguments)]
pub fn find_strike_given_delta(
    kind: OptionKind,
    delta: f64,
    spot: f64,
    expiry: f64,
    numeraire_rate: f64,
    asset_rate: f64,
    vol: f64,
    convention: DeltaConvention,
) -> EngineResult<StrikeSolve> {
    if expiry <= 0.0 {
        return Ok(StrikeSolve {
            strike: spot,
            status: SolverStatus::Converged,
        });
    }

    let w = kind.sign();
    let sd = vol * expiry.sqrt();
    let carry = (numeraire_rate - asset_rate) * expiry;
    let mut lo = spot * (-BRACKET_STDEVS * sd).exp();
    let mut hi = spot * (BRACKET_STDEVS * sd).exp();

    let d = |x: f64, half: f64| ((spot / x).ln() + carry + half * sd * sd) / sd;

    let forward_delta = match convention {
        DeltaConvention::RhsSpot => Some(delta * (asset_rate * expiry).exp()),
        DeltaConvention::RhsForward => Some(delta),
        DeltaConvention::LhsSpot | DeltaConvention::LhsForward => None,
    };
    if let Some(target) = forward_delta.filter(|p| *p > 0.0 && *p < 1.0) {
        let d1 = w * normal_inverse_cdf(target);
        return Ok(StrikeSolve {
            strike: spot * (carry + 0.5 * sd * sd - sd * d1).exp(),
            status: SolverStatus::Converged,
        });
    }

    if convention.is_left_hand() {
        let forward = spot * carry.exp();
        let slope = |k: f64| {
            let d2 = ((forward / k).ln() - 0.5 * sd * sd) / sd;
            w * normal_cdf(w * d2) - normal_pdf(d2) / sd
        };
        let config = SolverConfig::new(EPS * (hi - lo), MAX_ITERATIONS);
        if let Ok(turn) = bisection(slope, lo, hi, &config) {
            match kind {
                OptionKind::Call => lo = turn.root,
                OptionKind::Put => hi = turn.root,
            }
        }
    }

    let equation = |x: f64| match convention {
        DeltaConvention::RhsSpot => (-asset_rate * expiry).exp() * normal_cdf(w * d(x, 0.5)) - delta,
        DeltaConvention::RhsForward => normal_cdf(w * d(x, 0.5)) - delta,
        DeltaConvention::LhsSpot => {
            (-numeraire_rate * expiry).exp() * (x / spot) * normal_cdf(w * d(x, -0.5)) - delta
        }
        DeltaConvention::LhsForward => {
            (-carry).exp() * (x / spot) * normal_cdf(w * d(x, -0.5)) - delta
        }
    };

    let config = SolverConfig::new(EPS * (hi - lo), MAX_ITERATIONS);
    let result = bisection(equation, lo, hi, &config)?;
    if !result.converged() {
        warn!(delta, expiry, "strike solve stopped on its iteration budget");
    }
    Ok(StrikeSolve {
        strike: result.root,
        status: result.status,
    })
}

/// Converts a pillar delta to the right-hand-side forward call delta.
///
/// `asset_df` is the asset-currency discount factor to `expiry`; spot
/// deltas are divided by it to become forward deltas.
pub fn convert_to_rhs_call_delta(
    convention: DeltaConvention,
    side: PillarSide,
    forward: f64,
    expiry: f64,
    vol: f64,
    delta: f64,
    asset_df: f64,
) -> EngineResult<f64> {
    let kind = match side {
        PillarSide::Straddle => {
            return Ok(if convention.is_left_hand() {
                // delta-neutral premium-adjusted straddle strike is F exp(-sd^2 / 2)
                normal_cdf(vol * expiry.sqrt())
            } else {
                0.5
            });
        }
        PillarSide::Call => OptionKind::Call,
        PillarSide::Put => OptionKind::Put,
    };

    let from_strike = |strike: f64| {
        let sd = vol * expiry.sqrt();
        normal_cdf(((forward / strike).ln() + 0.5 * sd * sd) / sd)
    };

    Ok(match convention {
        DeltaConvention::LhsSpot => {
            let solve = find_strike_given_delta(
                kind,
                delta / asset_df,
                forward,
                expiry,
                0.0,
                0.0,
                vol,
                convention,
            )?;
            from_strike(solve.strike)
        }
        DeltaConvention::LhsForward => {
            let solve =
                find_strike_given_delta(kind, delta, forward, expiry, 0.0, 0.0, vol, convention)?;
            from_strike(solve.strike)
        }
        DeltaConvention::RhsSpot => match kind {
            OptionKind::Call => delta / asset_df,
            OptionKind::Put => 1.0 - delta / asset_df,
        },
        DeltaConvention::RhsForward => match kind {
            OptionKind::Call => delta,
            OptionKind::Put => 1.0 - delta,
        },
    })
}

/// Strike of the delta-neutral straddle.
///
/// `F exp(sd^2 / 2)` for plain deltas, `F exp(-sd^2 / 2)` for premium
/// adjusted ones.
pub fn atm_strike(forward: f64, expiry: f64, vol: f64, left_hand: bool) -> f64 {
    let half_var = 0.5 * vol * vol * expiry;
    if left_hand {
        forward * (-half_var).exp()
    } else {
        forward * half_var.exp()
    }
}

/// The five market strikes of one tenor and their volatilities, in strike
/// order 10P, 25P, ATM, 25C, 10C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketStrikes {
    /// Strikes.
    pub strikes: [f64; 5],
    /// Pillar volatilities.
    pub vols: [f64; 5],
}

impl MarketStrikes {
    /// ATM straddle strike.
    pub fn atm(&self) -> f64 {
        self.strikes[2]
    }

    /// 25-delta put strike.
    pub fn put25(&self) -> f64 {
        self.strikes[1]
    }

    /// 25-delta call strike.
    pub fn call25(&self) -> f64 {
        self.strikes[3]
    }

    /// 10-delta put strike.
    pub fn put10(&self) -> f64 {
        self.strikes[0]
    }

    /// 10-delta call strike.
    pub fn call10(&self) -> f64 {
        self.strikes[4]
    }
}

/// Strike of `kind` at `delta` with the market convention of `expiry`.
#[allow(clippy::too_many_arguments)]
pub fn strike_from_delta(
    kind: OptionKind,
    delta: f64,
    spot: f64,
    expiry: f64,
    domestic_rate: f64,
    foreign_rate: f64,
    vol: f64,
    delta_cut_time: f64,
    left_hand: bool,
) -> EngineResult<f64> {
    let convention = DeltaConvention::for_expiry(expiry, delta_cut_time, left_hand);
    let solve = find_strike_given_delta(
        kind,
        delta,
        spot,
        expiry,
        domestic_rate,
        foreign_rate,
        vol,
        convention,
    )?;
    Ok(solve.strike)
}

/// Market strikes of `quote` at `spot`.
pub fn market_strikes(
    quote: &SmileQuote,
    spot: f64,
    delta_cut_time: f64,
    left_hand: bool,
) -> EngineResult<MarketStrikes> {
    let vols = quote.pillar_vols();
    let t = quote.tenor;
    let (rd, rf) = (quote.domestic_rate, quote.foreign_rate);
    let strike = |kind, delta, vol| {
        strike_from_delta(kind, delta, spot, t, rd, rf, vol, delta_cut_time, left_hand)
    };

    let forward = spot * ((rd - rf) * t).exp();
    let strikes = [
        strike(OptionKind::Put, 0.10, vols[0])?,
        strike(OptionKind::Put, 0.25, vols[1])?,
        atm_strike(forward, t, vols[2], left_hand),
        strike(OptionKind::Call, 0.25, vols[3])?,
        strike(OptionKind::Call, 0.10, vols[4])?,
    ];
    if strikes.windows(2).any(|w| w[1] <= w[0]) {
        return Err(EngineError::InvalidMarket(format!(
            "market strikes at tenor {t} are not increasing: {strikes:?}"
        )));
    }
    Ok(MarketStrikes { strikes, vols })
}

/// The smile of one expiry, ready for volatility queries.
#[derive(Debug, Clone)]
pub struct SmileCalculation {
    convention: DeltaConvention,
    forward: f64,
    expiry: f64,
    atm_vol: f64,
    asset_df: f64,
    call_deltas: Vec<f64>,
    interpolator: SmileCubic,
}

impl SmileCalculation {
    /// Builds the smile from pillars ordered by increasing call delta
    /// (10C, 25C, ATM, 25P, 10P for a standard quote).
    ///
    /// # Errors
    ///
    /// [`EngineError::Math`] if the converted pillar deltas are not
    /// strictly increasing.
    pub fn new(
        convention: DeltaConvention,
        forward: f64,
        expiry: f64,
        asset_df: f64,
        pillars: &[DeltaPillar],
    ) -> EngineResult<Self> {
        let call_deltas = pillars
            .iter()
            .map(|p| {
                convert_to_rhs_call_delta(
                    convention, p.side, forward, expiry, p.vol, p.delta, asset_df,
                )
            })
            .collect::<EngineResult<Vec<_>>>()?;
        let vols: Vec<f64> = pillars.iter().map(|p| p.vol).collect();
        let middle = vols.get(vols.len() / 2).copied().unwrap_or_default();
        let atm_vol = pillars
            .iter()
            .find(|p| p.side == PillarSide::Straddle)
            .map_or(middle, |p| p.vol);

        let interpolator = SmileCubic::new(call_deltas.clone(), vols)?
            .with_extrapolation(SmileExtrapolation::Extrapolate);

        Ok(Self {
            convention,
            forward,
            expiry,
            atm_vol,
            asset_df,
            call_deltas,
            interpolator,
        })
    }

    /// Smile of a market quote with the convention its tenor trades in.
    pub fn from_quote(
        quote: &SmileQuote,
        spot: f64,
        delta_cut_time: f64,
        left_hand: bool,
    ) -> EngineResult<Self> {
        let t = quote.tenor;
        let vols = quote.pillar_vols();
        let pillars = [
            DeltaPillar {
                delta: 0.10,
                side: PillarSide::Call,
                vol: vols[4],
            },
            DeltaPillar {
                delta: 0.25,
                side: PillarSide::Call,
                vol: vols[3],
            },
            DeltaPillar {
                delta: 0.0,
                side: PillarSide::Straddle,
                vol: vols[2],
            },
            DeltaPillar {
                delta: 0.25,
                side: PillarSide::Put,
                vol: vols[1],
            },
            DeltaPillar {
                delta: 0.10,
                side: PillarSide::Put,
                vol: vols[0],
            },
        ];
        let forward = spot * ((quote.domestic_rate - quote.foreign_rate) * t).exp();
        let asset_df = (-quote.foreign_rate * t).exp();
        Self::new(
            DeltaConvention::for_expiry(t, delta_cut_time, left_hand),
            forward,
            t,
            asset_df,
            &pillars,
        )
    }

    /// Sets how vols are read beyond the 10-delta pillars.
    #[must_use]
    pub fn with_extrapolation(mut self, extrapolation: SmileExtrapolation) -> Self {
        self.interpolator = self.interpolator.with_extrapolation(extrapolation);
        self
    }

    /// Quoting convention of the smile.
    pub fn convention(&self) -> DeltaConvention {
        self.convention
    }

    /// Pillar positions as right-hand-side forward call deltas.
    pub fn call_deltas(&self) -> &[f64] {
        &self.call_deltas
    }

    /// Volatility at a quoted delta.
    pub fn vol_for_delta(&self, side: PillarSide, delta: f64) -> EngineResult<VolSolve> {
        if !self.convention.is_left_hand() {
            let x = convert_to_rhs_call_delta(
                self.convention,
                side,
                self.forward,
                self.expiry,
                self.atm_vol,
                delta,
                self.asset_df,
            )?;
            return Ok(VolSolve {
                vol: self.interpolator.interpolate(x)?,
                iterations: 1,
                exhausted: false,
            });
        }

        self.fixed_point(|vol| {
            convert_to_rhs_call_delta(
                self.convention,
                side,
                self.forward,
                self.expiry,
                vol,
                delta,
                self.asset_df,
            )
        })
    }

    /// Volatility at a strike.
    pub fn vol_for_strike(&self, strike: f64) -> EngineResult<VolSolve> {
        if !(strike > 0.0) {
            return Err(EngineError::invalid_descriptor(format!(
                "strike must be positive, got {strike}"
            )));
        }
        let log_moneyness = (self.forward / strike).ln();
        let sqrt_t = self.expiry.sqrt();
        self.fixed_point(|vol| {
            let sd = vol * sqrt_t;
            Ok(normal_cdf((log_moneyness + 0.5 * sd * sd) / sd))
        })
    }

    /// Damped fixed point `vol <- smile(delta(vol))` from the ATM vol.
    ///
    /// The relaxation is 0.75 after a change of direction and 1.5 while
    /// moving in the same direction.
    fn fixed_point<F>(&self, call_delta: F) -> EngineResult<VolSolve>
    where
        F: Fn(f64) -> EngineResult<f64>,
    {
        let mut vol = self.atm_vol;
        let mut jump = 0.0_f64;
        let mut iterations = 0;

        loop {
            iterations += 1;
            let previous = vol;
            let target = self.interpolator.interpolate(call_delta(previous)?)?;
            if target.is_nan() {
                return Err(EngineError::numeric_domain("smile volatility is NaN"));
            }

            let new_jump = target - previous;
            let omega = if new_jump * jump < 0.0 {
                0.75
            } else if new_jump * jump > 0.0 {
                1.5
            } else {
                1.0
            };
            jump = new_jump;
            vol = (previous + omega * new_jump).max(EPS);

            if (vol - previous).abs() <= EPS {
                return Ok(VolSolve {
                    vol,
                    iterations,
                    exhausted: false,
                });
            }
            if iterations >= MAX_ITERATIONS {
                warn!(
                    iterations,
                    vol, "smile fixed point stopped on its iteration budget"
                );
                return Ok(VolSolve {
                    vol,
                    iterations,
                    exhausted: true,
                });
            }
        }
    }
}
