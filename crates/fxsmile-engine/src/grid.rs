//! Crank-Nicolson grid in log-asset space with three volatility regimes.
//!
//! The grid holds `N + 1` equally spaced nodes `x[0..=N]` and one solution
//! buffer per volatility regime. Values are undiscounted (in units of the
//! numeraire at expiry), so the backward equation has no discounting term:
//!
//! ```text
//! dV/dt + (r - q - s^2/2) dV/dx + s^2/2 d2V/dx2 = 0
//! ```
//!
//! Each step rebuilds the local volatility at the interior nodes once,
//! scales it by `exp(-vv sqrt 3)`, 1 and `exp(vv sqrt 3)` for the low, mid
//! and high regimes, solves the three tridiagonal systems with the edge
//! values supplied by the caller, and finally mixes the regimes towards
//! their stationary weights `(1/6, 2/3, 1/6)`.

use fxsmile_math::linear_algebra::TridiagonalLu;

use crate::error::{EngineError, EngineResult};
use crate::local_vol::LocalVolShape;
use crate::payoff::GridPayoff;

/// Number of volatility regimes.
pub const REGIMES: usize = 3;

/// Stationary weights of the low, mid and high regimes.
pub const REGIME_WEIGHTS: [f64; REGIMES] = [1.0 / 6.0, 2.0 / 3.0, 1.0 / 6.0];

const THETA: f64 = 0.5;

/// Which grid edges sit on a live knock-out barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KnockedEdges {
    /// Lower edge is a barrier.
    pub lower: bool,
    /// Upper edge is a barrier.
    pub upper: bool,
}

impl KnockedEdges {
    /// Neither edge is a barrier.
    pub const NONE: Self = Self {
        lower: false,
        upper: false,
    };
}

/// Market and model inputs of one backward step.
#[derive(Debug, Clone, Copy)]
pub struct StepCoefficients {
    /// Step length in years.
    pub dt: f64,
    /// Domestic minus foreign forward rate over the step.
    pub drift: f64,
    /// ATM volatility of the option expiry.
    pub atm_vol: f64,
    /// Log forward at the step midpoint; moneyness is measured from here.
    pub centre: f64,
    /// Years from today to the step midpoint.
    pub mid_time: f64,
    /// Smile shape in force over the step.
    pub shape: LocalVolShape,
    /// Vol-of-vol scaling the low and high regimes.
    pub vol_of_vol: f64,
    /// Fraction of each regime redistributed at the end of the step.
    pub mix: f64,
}

impl StepCoefficients {
    fn regime_multipliers(&self) -> [f64; REGIMES] {
        let spread = self.vol_of_vol * 3.0_f64.sqrt();
        [(-spread).exp(), 1.0, spread.exp()]
    }
}

/// Spatial mesh, regime buffers and per-step tridiagonal bands.
#[derive(Debug, Clone)]
pub struct FiniteDifferenceGrid {
    lower: f64,
    dx: f64,
    x: Vec<f64>,
    values: [Vec<f64>; REGIMES],
    local_vol: Vec<f64>,
    sub_l: Vec<f64>,
    diag_l: Vec<f64>,
    sup_l: Vec<f64>,
    sub_r: Vec<f64>,
    diag_r: Vec<f64>,
    sup_r: Vec<f64>,
    rhs: Vec<f64>,
    lu: TridiagonalLu,
}

impl FiniteDifferenceGrid {
    /// Creates a grid of `asset_steps` intervals over `[lower, upper]`
    /// (log-asset).
    ///
    /// # Errors
    ///
    /// [`EngineError::GridConfiguration`] if the bounds are not finite and
    /// increasing or there are fewer than two intervals.
    pub fn new(lower: f64, upper: f64, asset_steps: usize) -> EngineResult<Self> {
        if !(lower.is_finite() && upper.is_finite() && lower < upper && asset_steps >= 2) {
            return Err(EngineError::GridConfiguration {
                lower,
                upper,
                nodes: asset_steps,
            });
        }

        let dx = (upper - lower) / asset_steps as f64;
        let x: Vec<f64> = (0..=asset_steps).map(|i| lower + i as f64 * dx).collect();
        let interior = asset_steps - 1;
        let buffer = vec![0.0; asset_steps + 1];

        Ok(Self {
            lower,
            dx,
            x,
            values: [buffer.clone(), buffer.clone(), buffer],
            local_vol: vec![0.0; interior],
            sub_l: vec![0.0; interior],
            diag_l: vec![0.0; interior],
            sup_l: vec![0.0; interior],
            sub_r: vec![0.0; interior],
            diag_r: vec![0.0; interior],
            sup_r: vec![0.0; interior],
            rhs: vec![0.0; interior],
            lu: TridiagonalLu::with_capacity(interior),
        })
    }

    /// Number of intervals `N`.
    pub fn asset_steps(&self) -> usize {
        self.x.len() - 1
    }

    /// Lower log-asset bound.
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Upper log-asset bound.
    pub fn upper(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    /// Node spacing.
    pub fn spacing(&self) -> f64 {
        self.dx
    }

    /// Node coordinates.
    pub fn nodes(&self) -> &[f64] {
        &self.x
    }

    /// Solution buffer of `regime` (0 low, 1 mid, 2 high).
    pub fn values(&self, regime: usize) -> &[f64] {
        &self.values[regime]
    }

    /// Seeds every regime with the terminal payoff; knocked edges get 0.
    pub fn set_initial_condition(&mut self, payoff: GridPayoff, strike: f64, knocked: KnockedEdges) {
        let last = self.x.len() - 1;
        for buffer in &mut self.values {
            for (v, &x) in buffer.iter_mut().zip(self.x.iter()) {
                *v = payoff.terminal(x.exp(), strike);
            }
            if knocked.lower {
                buffer[0] = 0.0;
            }
            if knocked.upper {
                buffer[last] = 0.0;
            }
        }
    }

    /// Interpolates another grid's solution onto this one.
    ///
    /// Nodes beyond the source range take the source edge value, or 0 where
    /// that source edge was a knock-out barrier. This grid's own knocked
    /// edges are then zeroed.
    pub fn remap_from(
        &mut self,
        source: &FiniteDifferenceGrid,
        source_knocked: KnockedEdges,
        knocked: KnockedEdges,
    ) {
        let src_last = source.x.len() - 1;
        let last = self.x.len() - 1;

        for (regime, buffer) in self.values.iter_mut().enumerate() {
            let old = &source.values[regime];
            for (v, &x) in buffer.iter_mut().zip(self.x.iter()) {
                *v = if x < source.lower {
                    if source_knocked.lower {
                        0.0
                    } else {
                        old[0]
                    }
                } else if x > source.upper() {
                    if source_knocked.upper {
                        0.0
                    } else {
                        old[src_last]
                    }
                } else {
                    let pos = (x - source.lower) / source.dx;
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let i = (pos.floor() as usize).min(src_last - 1);
                    let w = pos - i as f64;
                    old[i] * (1.0 - w) + old[i + 1] * w
                };
            }
            if knocked.lower {
                buffer[0] = 0.0;
            }
            if knocked.upper {
                buffer[last] = 0.0;
            }
        }
    }

    /// Takes one Crank-Nicolson step back in time.
    ///
    /// `lower_value` and `upper_value` are the edge values at the earlier
    /// time, shared by all regimes.
    ///
    /// # Errors
    ///
    /// [`EngineError::Math`] if a tridiagonal pivot vanishes.
    pub fn step(
        &mut self,
        c: &StepCoefficients,
        lower_value: f64,
        upper_value: f64,
    ) -> EngineResult<()> {
        let n1 = c.dt / self.dx;
        let n2 = n1 / self.dx;
        let vol_scale = 1.0 / (c.atm_vol * c.mid_time.sqrt());

        for (lv, &x) in self.local_vol.iter_mut().zip(self.x[1..].iter()) {
            *lv = c.shape.local_vol(c.atm_vol, (x - c.centre) * vol_scale);
        }

        let last = self.x.len() - 1;
        for (regime, multiplier) in c.regime_multipliers().into_iter().enumerate() {
            for (j, &lv) in self.local_vol.iter().enumerate() {
                let vol = lv * multiplier;
                let diffusion = 0.5 * vol * vol;
                let convection = c.drift - diffusion;

                let a = diffusion * n2 * (1.0 - THETA);
                let b = convection * n1 * (1.0 - THETA) * 0.5;

                self.diag_r[j] = 1.0 - 2.0 * a;
                self.sub_r[j] = a - b;
                self.sup_r[j] = a + b;

                self.diag_l[j] = 1.0 + 2.0 * a;
                self.sub_l[j] = b - a;
                self.sup_l[j] = -a - b;
            }
            self.lu.factor(&self.sub_l, &self.diag_l, &self.sup_l)?;

            let v = &mut self.values[regime];
            for (j, q) in self.rhs.iter_mut().enumerate() {
                *q = self.sub_r[j] * v[j] + self.diag_r[j] * v[j + 1] + self.sup_r[j] * v[j + 2];
            }

            v[0] = lower_value;
            v[last] = upper_value;
            let m = self.rhs.len();
            self.rhs[0] -= self.sub_l[0] * lower_value;
            self.rhs[m - 1] -= self.sup_l[m - 1] * upper_value;

            self.lu.solve_in_place(&mut self.rhs)?;
            v[1..last].copy_from_slice(&self.rhs);
        }

        self.mix(c.mix);
        Ok(())
    }

    /// Moves a fraction `mix` of every regime onto the stationary mixture.
    fn mix(&mut self, mix: f64) {
        if mix <= 0.0 {
            return;
        }
        let [low, mid, high] = &mut self.values;
        for ((l, m), h) in low.iter_mut().zip(mid.iter_mut()).zip(high.iter_mut()) {
            let pooled = REGIME_WEIGHTS[0] * *l + REGIME_WEIGHTS[1] * *m + REGIME_WEIGHTS[2] * *h;
            *l = (1.0 - mix) * *l + mix * pooled;
            *m = (1.0 - mix) * *m + mix * pooled;
            *h = (1.0 - mix) * *h + mix * pooled;
        }
    }

    /// Regime-weighted value at log-asset `x`, linear between nodes.
    ///
    /// Returns 0 outside the grid.
    pub fn value_at(&self, x: f64) -> f64 {
        if !(x >= self.lower && x <= self.upper()) {
            return 0.0;
        }
        let last = self.x.len() - 1;
        let pos = (x - self.lower) / self.dx;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let i = (pos.floor() as usize).min(last - 1);
        let w = pos - i as f64;

        self.values
            .iter()
            .zip(REGIME_WEIGHTS.iter())
            .map(|(v, weight)| weight * (v[i] * (1.0 - w) + v[i + 1] * w))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fxsmile_curves::LocalVolCoefficients;

    fn flat_step(dt: f64, mid_time: f64, vol_of_vol: f64, mix: f64) -> StepCoefficients {
        StepCoefficients {
            dt,
            drift: 0.0,
            atm_vol: 0.15,
            centre: 0.0,
            mid_time,
            shape: LocalVolShape::new(&LocalVolCoefficients::FLAT),
            vol_of_vol,
            mix,
        }
    }

    #[test]
    fn test_rejects_bad_bounds() {
        assert!(matches!(
            FiniteDifferenceGrid::new(0.5, 0.5, 100),
            Err(EngineError::GridConfiguration { .. })
        ));
        assert!(FiniteDifferenceGrid::new(0.5, -0.5, 100).is_err());
        assert!(FiniteDifferenceGrid::new(-0.5, 0.5, 1).is_err());
        assert!(FiniteDifferenceGrid::new(f64::NAN, 0.5, 100).is_err());
    }

    #[test]
    fn test_nodes_span_bounds() {
        let grid = FiniteDifferenceGrid::new(-1.0, 1.0, 8).unwrap();
        assert_eq!(grid.nodes().len(), 9);
        assert_relative_eq!(grid.spacing(), 0.25);
        assert_relative_eq!(grid.upper(), 1.0);
    }

    #[test]
    fn test_initial_condition_and_read_out() {
        let mut grid = FiniteDifferenceGrid::new(-1.0, 1.0, 200).unwrap();
        grid.set_initial_condition(GridPayoff::Call, 1.0, KnockedEdges::NONE);
        let x = grid.nodes()[150];
        assert_relative_eq!(grid.value_at(x), x.exp() - 1.0, epsilon = 1e-12);
        assert_eq!(grid.value_at(1.5), 0.0);

        grid.set_initial_condition(
            GridPayoff::CashUnit,
            0.0,
            KnockedEdges {
                lower: true,
                upper: false,
            },
        );
        assert_eq!(grid.values(0)[0], 0.0);
        assert_eq!(grid.values(2)[200], 1.0);
    }

    #[test]
    fn test_forward_payoff_is_preserved() {
        // e^x - K solves the driftless equation exactly
        let mut grid = FiniteDifferenceGrid::new(-1.0, 1.0, 400).unwrap();
        grid.set_initial_condition(GridPayoff::Linear, 1.0, KnockedEdges::NONE);
        let lower = grid.lower().exp() - 1.0;
        let upper = grid.upper().exp() - 1.0;
        for j in 0..50 {
            let mid = 1.0 - (f64::from(j) + 0.5) * 0.01;
            grid.step(&flat_step(0.01, mid, 0.3, 0.2), lower, upper).unwrap();
        }
        assert_relative_eq!(grid.value_at(0.2), 0.2_f64.exp() - 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_mixing_keeps_regimes_equal_when_unscaled() {
        let mut grid = FiniteDifferenceGrid::new(-1.0, 1.0, 100).unwrap();
        grid.set_initial_condition(GridPayoff::Put, 1.0, KnockedEdges::NONE);
        grid.step(&flat_step(0.01, 0.5, 0.0, 0.5), 1.0 - (-1.0_f64).exp(), 0.0)
            .unwrap();
        for i in 0..=100 {
            assert_relative_eq!(grid.values(0)[i], grid.values(1)[i], epsilon = 1e-14);
            assert_relative_eq!(grid.values(2)[i], grid.values(1)[i], epsilon = 1e-14);
        }
    }

    #[test]
    fn test_remap_respects_knocked_source_edges() {
        let mut fine = FiniteDifferenceGrid::new(-0.5, 0.5, 50).unwrap();
        fine.set_initial_condition(GridPayoff::CashUnit, 0.0, KnockedEdges::NONE);

        let mut wide = FiniteDifferenceGrid::new(-1.0, 1.0, 100).unwrap();
        wide.remap_from(
            &fine,
            KnockedEdges {
                lower: true,
                upper: false,
            },
            KnockedEdges::NONE,
        );
        assert_eq!(wide.values(1)[0], 0.0);
        assert_eq!(wide.values(1)[100], 1.0);
        assert_relative_eq!(wide.value_at(0.1), 1.0, epsilon = 1e-12);
    }
}
