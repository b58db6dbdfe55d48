//! Local-volatility coefficient curves.
//!
//! Each calibrated tenor owns one value on each of seven curves: the five
//! smile-shape coefficients `a0..a4`, the vol-of-vol of the three-regime
//! mixture and its mean-reversion speed. The pricer reads them with
//! flat-step interpolation, so the values stored at tenor `k` govern the
//! whole interval `(t[k-1], t[k]]`.

use serde::{Deserialize, Serialize};

use crate::curve::Curve;
use crate::error::{CurveError, CurveResult};

/// Coefficients of one tenor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalVolCoefficients {
    /// Level of the smile shape (1 means the ATM volatility itself).
    pub a0: f64,
    /// Linear skew term.
    pub a1: f64,
    /// Quadratic term.
    pub a2: f64,
    /// Cubic term.
    pub a3: f64,
    /// Quartic term.
    pub a4: f64,
    /// Vol-of-vol scaling the low and high regimes.
    pub vol_of_vol: f64,
    /// Mean-reversion speed of regime mixing.
    pub mean_reversion: f64,
}

impl LocalVolCoefficients {
    /// Starting point of a calibration when no prior fit is available.
    pub const INITIAL_GUESS: Self = Self {
        a0: 0.9,
        a1: 0.2,
        a2: 0.0,
        a3: 0.0,
        a4: 0.0,
        vol_of_vol: 0.2,
        mean_reversion: 1.0,
    };

    /// Coefficients that make the local volatility equal the ATM volatility.
    pub const FLAT: Self = Self {
        a0: 1.0,
        a1: 0.0,
        a2: 0.0,
        a3: 0.0,
        a4: 0.0,
        vol_of_vol: 0.0,
        mean_reversion: 0.0,
    };

    /// The six calibrated unknowns in solver order.
    pub fn unknowns(&self) -> [f64; 6] {
        [self.a0, self.a1, self.a2, self.a3, self.a4, self.vol_of_vol]
    }

    /// Replaces the six calibrated unknowns, keeping the mean reversion.
    #[must_use]
    pub fn with_unknowns(mut self, p: [f64; 6]) -> Self {
        self.a0 = p[0];
        self.a1 = p[1];
        self.a2 = p[2];
        self.a3 = p[3];
        self.a4 = p[4];
        self.vol_of_vol = p[5];
        self
    }
}

impl Default for LocalVolCoefficients {
    fn default() -> Self {
        Self::INITIAL_GUESS
    }
}

/// The seven coefficient curves on a common tenor grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientCurves {
    a0: Curve,
    a1: Curve,
    a2: Curve,
    a3: Curve,
    a4: Curve,
    vol_of_vol: Curve,
    mean_reversion: Curve,
}

impl CoefficientCurves {
    /// Creates curves on `tenors` with every slot set to `init`.
    pub fn new(tenors: &[f64], init: LocalVolCoefficients) -> CurveResult<Self> {
        Ok(Self {
            a0: Curve::flat(tenors, init.a0)?,
            a1: Curve::flat(tenors, init.a1)?,
            a2: Curve::flat(tenors, init.a2)?,
            a3: Curve::flat(tenors, init.a3)?,
            a4: Curve::flat(tenors, init.a4)?,
            vol_of_vol: Curve::flat(tenors, init.vol_of_vol)?,
            mean_reversion: Curve::flat(tenors, init.mean_reversion)?,
        })
    }

    /// Creates curves with every slot zero, the "not yet calibrated" state.
    pub fn uncalibrated(tenors: &[f64]) -> CurveResult<Self> {
        Self::new(
            tenors,
            LocalVolCoefficients {
                a0: 0.0,
                a1: 0.0,
                a2: 0.0,
                a3: 0.0,
                a4: 0.0,
                vol_of_vol: 0.0,
                mean_reversion: 0.0,
            },
        )
    }

    /// Builds curves from per-tenor coefficient sets.
    pub fn from_tenors(tenors: &[f64], slots: &[LocalVolCoefficients]) -> CurveResult<Self> {
        if tenors.len() != slots.len() {
            return Err(CurveError::LengthMismatch {
                times: tenors.len(),
                values: slots.len(),
            });
        }
        let mut curves = Self::uncalibrated(tenors)?;
        for (i, slot) in slots.iter().enumerate() {
            curves.set_tenor(i, *slot)?;
        }
        Ok(curves)
    }

    /// Tenor grid shared by all seven curves.
    pub fn tenors(&self) -> &[f64] {
        self.a0.times()
    }

    /// Number of tenors.
    pub fn len(&self) -> usize {
        self.a0.len()
    }

    /// Returns true if there are no tenors.
    pub fn is_empty(&self) -> bool {
        self.a0.is_empty()
    }

    /// Returns true if tenor `index` holds a calibrated (non-zero level) fit.
    pub fn is_calibrated(&self, index: usize) -> bool {
        self.a0.value(index).is_ok_and(|a0| a0 != 0.0)
    }

    /// Coefficients in force at time `t` (flat-step read).
    pub fn at(&self, t: f64) -> LocalVolCoefficients {
        LocalVolCoefficients {
            a0: self.a0.interpolate_flat(t),
            a1: self.a1.interpolate_flat(t),
            a2: self.a2.interpolate_flat(t),
            a3: self.a3.interpolate_flat(t),
            a4: self.a4.interpolate_flat(t),
            vol_of_vol: self.vol_of_vol.interpolate_flat(t),
            mean_reversion: self.mean_reversion.interpolate_flat(t),
        }
    }

    /// Coefficients stored in slot `index`.
    pub fn tenor(&self, index: usize) -> CurveResult<LocalVolCoefficients> {
        Ok(LocalVolCoefficients {
            a0: self.a0.value(index)?,
            a1: self.a1.value(index)?,
            a2: self.a2.value(index)?,
            a3: self.a3.value(index)?,
            a4: self.a4.value(index)?,
            vol_of_vol: self.vol_of_vol.value(index)?,
            mean_reversion: self.mean_reversion.value(index)?,
        })
    }

    /// Overwrites slot `index`.
    pub fn set_tenor(&mut self, index: usize, c: LocalVolCoefficients) -> CurveResult<()> {
        self.a0.set_value(index, c.a0)?;
        self.a1.set_value(index, c.a1)?;
        self.a2.set_value(index, c.a2)?;
        self.a3.set_value(index, c.a3)?;
        self.a4.set_value(index, c.a4)?;
        self.vol_of_vol.set_value(index, c.vol_of_vol)?;
        self.mean_reversion.set_value(index, c.mean_reversion)
    }

    /// Sets the vol-of-vol of every tenor to zero (pure local volatility).
    pub fn disable_mixing(&mut self) {
        self.vol_of_vol.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_slot_governs_interval_before_it() {
        let tenors = [0.5, 1.0];
        let mut curves = CoefficientCurves::uncalibrated(&tenors).unwrap();
        curves.set_tenor(0, LocalVolCoefficients::FLAT).unwrap();
        curves
            .set_tenor(1, LocalVolCoefficients::INITIAL_GUESS)
            .unwrap();

        assert_relative_eq!(curves.at(0.3).a0, 1.0);
        assert_relative_eq!(curves.at(0.5).a0, 1.0);
        assert_relative_eq!(curves.at(0.51).a0, 0.9);
        assert_relative_eq!(curves.at(4.0).mean_reversion, 1.0);
    }

    #[test]
    fn test_calibrated_flag() {
        let mut curves = CoefficientCurves::uncalibrated(&[1.0, 2.0]).unwrap();
        assert!(!curves.is_calibrated(0));
        curves.set_tenor(0, LocalVolCoefficients::FLAT).unwrap();
        assert!(curves.is_calibrated(0));
        assert!(!curves.is_calibrated(5));
    }

    #[test]
    fn test_unknowns_round_trip_keeps_mean_reversion() {
        let c = LocalVolCoefficients::INITIAL_GUESS.with_unknowns([1.0, 0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(c.unknowns(), [1.0, 0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_relative_eq!(c.mean_reversion, 1.0);
    }

    #[test]
    fn test_disable_mixing() {
        let mut curves =
            CoefficientCurves::new(&[1.0, 2.0], LocalVolCoefficients::INITIAL_GUESS).unwrap();
        curves.disable_mixing();
        assert_eq!(curves.tenor(1).unwrap().vol_of_vol, 0.0);
    }
}
