//! Newton-Raphson fit of one tenor's coefficients.
//!
//! The residual vector holds the implied-vol misfit at the five market
//! strikes plus the skew condition. The Jacobian is built by central
//! differences, one column per unknown, and the Newton step is solved by
//! Gauss-Jordan elimination with full pivoting.

use fxsmile_config::CalibrationConfig;
use fxsmile_curves::{CoefficientCurves, LocalVolCoefficients, MarketSmile};
use fxsmile_math::linear_algebra::gauss_jordan;
use fxsmile_math::{MathError, MathResult};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::{debug, trace};

use super::progress::{ProgressEvent, ProgressSink};
use super::targets::{CalibrationTargets, SkewTarget};
use crate::descriptor::{GridBounds, OptionDescriptor};
use crate::error::{EngineError, EngineResult, NonConvergenceReason};
use crate::payoff::{BarrierLevels, OptionKind, Payout, PayoffStyle, Touch};
use crate::pricer::Pricer;

/// Residuals and fitted values of one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Evaluation {
    pub residuals: [f64; 6],
    pub fit_prices: [f64; 6],
    pub fit_vols: [f64; 6],
}

/// Result of a converged solve.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NewtonOutcome {
    pub unknowns: [f64; 6],
    pub iterations: u32,
    pub evaluation: Evaluation,
}

/// The pricing problem of one tenor.
pub(crate) struct TenorProblem<'a> {
    market: &'a MarketSmile,
    targets: &'a CalibrationTargets,
    tenor_index: usize,
    curves: CoefficientCurves,
    base: LocalVolCoefficients,
    bounds: GridBounds,
    asset_steps: usize,
    time_steps: usize,
    unknowns: usize,
    flat_rebate: Option<f64>,
}

impl<'a> TenorProblem<'a> {
    pub fn new(
        market: &'a MarketSmile,
        targets: &'a CalibrationTargets,
        tenor_index: usize,
        curves: &CoefficientCurves,
        base: LocalVolCoefficients,
        config: &CalibrationConfig,
    ) -> EngineResult<Self> {
        let mut problem = Self {
            market,
            targets,
            tenor_index,
            curves: curves.clone(),
            base,
            bounds: targets.grid_bounds(),
            asset_steps: config.grid_nodes,
            time_steps: config.time_steps(targets.tenor),
            unknowns: config.unknowns(),
            flat_rebate: None,
        };

        if let SkewTarget::RebateSpeed { lower, upper, .. } = targets.skew {
            let flat = CoefficientCurves::new(curves.tenors(), LocalVolCoefficients::FLAT)?;
            let price = problem.rebate_price(&flat, lower, upper)?;
            problem.flat_rebate = Some(price);
        }
        Ok(problem)
    }

    fn degenerate(&self, strike: f64) -> EngineError {
        EngineError::NonConvergence {
            tenor_index: self.tenor_index,
            iterations: 0,
            reason: NonConvergenceReason::DegeneratePrice { strike },
        }
    }

    fn vanilla(&self, kind: OptionKind, strike: f64) -> EngineResult<OptionDescriptor> {
        OptionDescriptor::on_grid(
            PayoffStyle::Vanilla { kind },
            strike,
            self.targets.tenor,
            self.targets.spot.ln(),
            BarrierLevels::NONE,
            self.bounds,
            self.asset_steps,
            self.time_steps,
        )
    }

    fn rebate_price(&self, curves: &CoefficientCurves, lower: f64, upper: f64) -> EngineResult<f64> {
        let d = OptionDescriptor::on_grid(
            PayoffStyle::Rebate {
                touch: Touch::NoTouch,
                payout: Payout::Cash,
            },
            0.0,
            self.targets.tenor,
            self.targets.spot.ln(),
            BarrierLevels {
                lower: Some(lower),
                upper: Some(upper),
            },
            GridBounds::from_levels(lower, upper),
            self.asset_steps,
            self.targets.rebate_time_steps(),
        )?;
        let price = Pricer::new(self.market, curves).value(&d)?;
        if !(price > 0.0 && price.is_finite()) {
            return Err(self.degenerate(lower));
        }
        Ok(price)
    }

    /// Model price and implied vol of a vanilla read at `spot`.
    fn implied(
        &self,
        pricer: &Pricer<'_>,
        kind: OptionKind,
        strike: f64,
        spot: f64,
    ) -> EngineResult<(f64, f64)> {
        let d = self.vanilla(kind, strike)?.with_log_spot(spot.ln());
        let price = pricer.value(&d)?;
        if !(price > 0.0 && price.is_finite()) {
            return Err(self.degenerate(strike));
        }
        let vol = self
            .targets
            .black_at(spot)
            .implied_vol(kind, strike, price, self.targets.vols[2])?;
        Ok((price, vol))
    }

    /// Residuals at unknowns `p`.
    pub fn evaluate(&self, p: &[f64; 6]) -> EngineResult<Evaluation> {
        let mut curves = self.curves.clone();
        curves.set_tenor(self.tenor_index, self.base.with_unknowns(*p))?;
        let pricer = Pricer::new(self.market, &curves);
        let t = self.targets;

        let mut eval = Evaluation::default();
        for i in 0..5 {
            let (price, vol) = self.implied(&pricer, t.kind(i), t.strikes[i], t.spot)?;
            eval.fit_prices[i] = price;
            eval.fit_vols[i] = vol;
            eval.residuals[i] = vol - t.vols[i];
        }

        match t.skew {
            SkewTarget::RiskReversalSlope {
                shifted_spot,
                call_strike,
                put_strike,
                call_vol,
                put_vol,
            } => {
                let (_, sigma_c) = self.implied(&pricer, OptionKind::Call, call_strike, shifted_spot)?;
                let (_, sigma_p) = self.implied(&pricer, OptionKind::Put, put_strike, shifted_spot)?;
                eval.residuals[5] = (sigma_c - sigma_p) - (call_vol - put_vol);
                eval.fit_vols[5] = (sigma_c - sigma_p - (t.vols[3] - t.vols[1])) * 10_000.0;
            }
            SkewTarget::RebateSpeed { lower, upper, speed } => {
                let model = self.rebate_price(&curves, lower, upper)?;
                let premium = model - self.flat_rebate.unwrap_or(model);
                eval.residuals[5] = premium - speed / 10_000.0;
                eval.fit_prices[5] = premium * 10_000.0;
            }
        }
        Ok(eval)
    }

    fn converged(&self, residuals: &[f64; 6], tolerance: f64, active: usize) -> bool {
        let pillars = residuals[..5].iter().all(|r| r.abs() <= tolerance);
        pillars && (active < 6 || residuals[5].abs() <= tolerance / 3.0)
    }

    /// Jacobian of the first `active` residuals in the solve coordinates.
    ///
    /// Columns are central differences except the vol-of-vol variance near
    /// its zero bound, which is differenced forward from `base`.
    fn jacobian(
        &self,
        x: &[f64; 6],
        base: &[f64; 6],
        bump: f64,
        active: usize,
    ) -> EngineResult<DMatrix<f64>> {
        let columns = (0..active)
            .into_par_iter()
            .map(|j| {
                let mut up = *x;
                up[j] += bump;
                let r_up = self.evaluate(&from_solve(&up))?.residuals;
                let mut column = [0.0; 6];
                if j == 5 && x[5] < bump {
                    for (c, (u, b)) in column.iter_mut().zip(r_up.iter().zip(base.iter())) {
                        *c = (u - b) / bump;
                    }
                } else {
                    let mut down = *x;
                    down[j] -= bump;
                    let r_down = self.evaluate(&from_solve(&down))?.residuals;
                    for (c, (u, d)) in column.iter_mut().zip(r_up.iter().zip(r_down.iter())) {
                        *c = (u - d) / (2.0 * bump);
                    }
                }
                Ok(column)
            })
            .collect::<EngineResult<Vec<[f64; 6]>>>()?;
        Ok(DMatrix::from_fn(active, active, |i, j| columns[j][i]))
    }
}

/// Solve coordinates: vol-of-vol enters squared.
///
/// Prices depend on vol-of-vol only through its square (the low and high
/// regimes swap under a sign change), so the Jacobian column of the raw
/// vol-of-vol vanishes at zero while the variance column does not.
fn to_solve(p: &[f64; 6]) -> [f64; 6] {
    let mut x = *p;
    x[5] = p[5] * p[5];
    x
}

fn from_solve(x: &[f64; 6]) -> [f64; 6] {
    let mut p = *x;
    p[5] = x[5].max(0.0).sqrt();
    p
}

/// Response of the skew residual to the vol-of-vol variance once the five
/// shape coefficients re-fit the pillars (Schur complement of the 6x6
/// Jacobian).
fn skew_sensitivity(jacobian: &DMatrix<f64>) -> MathResult<f64> {
    let mut pillars = jacobian.view((0, 0), (5, 5)).clone_owned();
    let mut response = DVector::from_fn(5, |i, _| jacobian[(i, 5)]);
    gauss_jordan(&mut pillars, &mut response)?;
    let coupled: f64 = (0..5).map(|i| jacobian[(5, i)] * response[i]).sum();
    Ok(jacobian[(5, 5)] - coupled)
}

fn singular(tenor_index: usize) -> impl Fn(MathError) -> EngineError {
    move |e| match e {
        MathError::SingularMatrix { row } => EngineError::SingularSystem { tenor_index, row },
        other => other.into(),
    }
}

/// Runs Newton from `start` until convergence or failure.
///
/// With six unknowns the vol-of-vol is pinned at zero, and the tenor is then
/// judged on the five pillars alone, when either:
///
/// - its whole effect on the skew residual, net of the pillar re-fit, is
///   below the pillar tolerance, so the market does not identify it; or
/// - a Newton step would take its variance below zero.
///
/// A start with vol-of-vol already at zero stays pinned.
pub(crate) fn solve(
    problem: &TenorProblem<'_>,
    start: [f64; 6],
    config: &CalibrationConfig,
    sink: &mut dyn ProgressSink,
) -> EngineResult<NewtonOutcome> {
    let k = problem.tenor_index;
    let mut x = to_solve(&start);
    if problem.unknowns < 6 {
        x[5] = 0.0;
    }

    let mut iterations = 0_u32;
    loop {
        let active = if problem.unknowns == 6 && x[5] > 0.0 { 6 } else { 5 };
        let eval = problem.evaluate(&from_solve(&x))?;
        iterations += 1;
        let max_residual = eval.residuals[..active]
            .iter()
            .fold(0.0_f64, |m, r| m.max(r.abs()));
        trace!(tenor_index = k, iterations, max_residual, active, unknowns = ?x, "newton evaluation");
        sink.emit(ProgressEvent::Iteration {
            tenor_index: k,
            iteration: iterations,
            max_residual,
        });

        let converged = problem.converged(&eval.residuals, config.tolerance, active);
        if converged && active < 6 {
            return Ok(NewtonOutcome {
                unknowns: from_solve(&x),
                iterations,
                evaluation: eval,
            });
        }
        if !converged && iterations > config.max_iterations {
            return Err(EngineError::NonConvergence {
                tenor_index: k,
                iterations: config.max_iterations,
                reason: NonConvergenceReason::IterationLimit { max_residual },
            });
        }

        let mut jacobian =
            problem.jacobian(&x, &eval.residuals, config.jacobian_bump, active)?;
        if active == 6 {
            let sensitivity = skew_sensitivity(&jacobian).map_err(singular(k))?;
            if sensitivity.abs() * x[5] < config.tolerance {
                debug!(
                    tenor_index = k,
                    sensitivity,
                    vol_of_vol = x[5].sqrt(),
                    "vol-of-vol not identified, pinned at zero"
                );
                x[5] = 0.0;
                continue;
            }
            if converged {
                return Ok(NewtonOutcome {
                    unknowns: from_solve(&x),
                    iterations,
                    evaluation: eval,
                });
            }
        }

        let mut step = DVector::from_iterator(active, eval.residuals[..active].iter().map(|r| -r));
        gauss_jordan(&mut jacobian, &mut step).map_err(singular(k))?;

        if let Some((component, delta)) =
            step.iter().enumerate().find(|(_, d)| d.abs() >= config.max_step)
        {
            return Err(EngineError::NonConvergence {
                tenor_index: k,
                iterations,
                reason: NonConvergenceReason::StepTooLarge {
                    component,
                    step: *delta,
                },
            });
        }
        if active == 6 && x[5] + step[5] < 0.0 {
            debug!(tenor_index = k, "vol-of-vol variance stepped below zero, pinned");
            x[5] = 0.0;
            continue;
        }
        for (xi, delta) in x.iter_mut().zip(step.iter()) {
            *xi += delta;
        }
    }
}
