//! Time-indexed pillar curves.
//!
//! A [`Curve`] is an ordered set of `(time, value)` pillars. All three
//! readers extrapolate flat beyond the first and last pillar and return 0
//! on an empty curve.

use serde::{Deserialize, Serialize};

use crate::error::{CurveError, CurveResult};

/// How a [`Curve`] is read between pillars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveInterpolation {
    /// Value of the next pillar at or after `t` (right-continuous step).
    FlatStep,
    /// Linear between neighbouring pillars.
    #[default]
    Linear,
    /// Linear in total variance `v^2 t`, returned as a volatility.
    LinearVariance,
}

/// An ordered set of `(time, value)` pillars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCurve")]
pub struct Curve {
    times: Vec<f64>,
    values: Vec<f64>,
}

#[derive(Deserialize)]
struct RawCurve {
    times: Vec<f64>,
    values: Vec<f64>,
}

impl TryFrom<RawCurve> for Curve {
    type Error = CurveError;

    fn try_from(raw: RawCurve) -> CurveResult<Self> {
        Self::new(raw.times, raw.values)
    }
}

impl Curve {
    /// Creates a curve from pillar times and values.
    ///
    /// # Errors
    ///
    /// - [`CurveError::LengthMismatch`] if the vectors differ in length
    /// - [`CurveError::NonMonotonicTenors`] if the times are not strictly increasing
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> CurveResult<Self> {
        if times.len() != values.len() {
            return Err(CurveError::LengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }
        for (index, w) in times.windows(2).enumerate() {
            if w[1] <= w[0] {
                return Err(CurveError::NonMonotonicTenors {
                    index: index + 1,
                    prev: w[0],
                    current: w[1],
                });
            }
        }
        Ok(Self { times, values })
    }

    /// Creates a curve with the same value at every pillar.
    pub fn flat(times: &[f64], value: f64) -> CurveResult<Self> {
        Self::new(times.to_vec(), vec![value; times.len()])
    }

    /// Number of pillars.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Returns true if the curve has no pillars.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Pillar times.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Pillar values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of pillar `index`.
    pub fn value(&self, index: usize) -> CurveResult<f64> {
        self.values
            .get(index)
            .copied()
            .ok_or(CurveError::PillarOutOfRange {
                index,
                len: self.len(),
            })
    }

    /// Overwrites the value of pillar `index`.
    pub fn set_value(&mut self, index: usize, value: f64) -> CurveResult<()> {
        let len = self.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or(CurveError::PillarOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Sets every pillar to `value`.
    pub fn fill(&mut self, value: f64) {
        self.values.iter_mut().for_each(|v| *v = value);
    }

    /// Returns a copy with every value moved by `shift`.
    #[must_use]
    pub fn shifted(&self, shift: f64) -> Self {
        Self {
            times: self.times.clone(),
            values: self.values.iter().map(|v| v + shift).collect(),
        }
    }

    /// Reads the curve at `t` with the given policy.
    pub fn interpolate(&self, t: f64, method: CurveInterpolation) -> f64 {
        match method {
            CurveInterpolation::FlatStep => self.interpolate_flat(t),
            CurveInterpolation::Linear => self.interpolate_linear(t),
            CurveInterpolation::LinearVariance => self.interpolate_variance(t),
        }
    }

    /// Right-continuous step read.
    ///
    /// Returns the first pillar at or before the first time, the last
    /// pillar beyond the last time, and otherwise the value of the first
    /// pillar whose time is at or after `t`.
    pub fn interpolate_flat(&self, t: f64) -> f64 {
        match self.bracket(t) {
            Bracket::Empty => 0.0,
            Bracket::Before => self.values[0],
            Bracket::After => self.values[self.len() - 1],
            Bracket::Exact(i) => self.values[i],
            Bracket::Between(_, hi) => self.values[hi],
        }
    }

    /// Linear read with flat extrapolation.
    pub fn interpolate_linear(&self, t: f64) -> f64 {
        match self.bracket(t) {
            Bracket::Empty => 0.0,
            Bracket::Before => self.values[0],
            Bracket::After => self.values[self.len() - 1],
            Bracket::Exact(i) => self.values[i],
            Bracket::Between(lo, hi) => {
                let w = (t - self.times[lo]) / (self.times[hi] - self.times[lo]);
                self.values[lo] + w * (self.values[hi] - self.values[lo])
            }
        }
    }

    /// Linear-in-variance read with flat extrapolation.
    ///
    /// Interpolates `v^2 t` linearly and returns `sqrt(w / t)`.
    pub fn interpolate_variance(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return self.values.first().copied().unwrap_or(0.0);
        }
        match self.bracket(t) {
            Bracket::Empty => 0.0,
            Bracket::Before => self.values[0],
            Bracket::After => self.values[self.len() - 1],
            Bracket::Exact(i) => self.values[i],
            Bracket::Between(lo, hi) => {
                let (t0, t1) = (self.times[lo], self.times[hi]);
                let w0 = self.values[lo] * self.values[lo] * t0;
                let w1 = self.values[hi] * self.values[hi] * t1;
                let w = w0 + (t - t0) / (t1 - t0) * (w1 - w0);
                (w.max(0.0) / t).sqrt()
            }
        }
    }

    fn bracket(&self, t: f64) -> Bracket {
        let n = self.len();
        if n == 0 {
            return Bracket::Empty;
        }
        if t <= self.times[0] {
            return if t == self.times[0] {
                Bracket::Exact(0)
            } else {
                Bracket::Before
            };
        }
        if t >= self.times[n - 1] {
            return if t == self.times[n - 1] {
                Bracket::Exact(n - 1)
            } else {
                Bracket::After
            };
        }
        // times[0] < t < times[n-1], so the partition point is in 1..n
        let hi = self.times.partition_point(|&x| x < t);
        if self.times[hi] == t {
            Bracket::Exact(hi)
        } else {
            Bracket::Between(hi - 1, hi)
        }
    }
}

enum Bracket {
    Empty,
    Before,
    After,
    Exact(usize),
    Between(usize, usize),
}
