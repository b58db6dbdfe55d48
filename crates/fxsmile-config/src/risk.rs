//! Risk configuration types.

use serde::{Deserialize, Serialize};

use crate::error::{require_positive, Validate, ValidationError};

/// Bump sizes for finite-difference Greeks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreeksConfig {
    /// Relative spot bump for delta and gamma.
    #[serde(default = "default_spot_shift")]
    pub spot_shift: f64,

    /// Fraction of the distance to a live barrier the spot bump may use.
    #[serde(default = "default_barrier_buffer")]
    pub barrier_buffer: f64,

    /// Absolute ATM volatility bump for vega.
    #[serde(default = "default_vol_shift")]
    pub vol_shift: f64,

    /// Absolute rate bump for rho and phi.
    #[serde(default = "default_rate_shift")]
    pub rate_shift: f64,

    /// Length of the theta roll in years.
    #[serde(default = "default_day_fraction")]
    pub day_fraction: f64,
}

fn default_spot_shift() -> f64 {
    0.01
}

fn default_barrier_buffer() -> f64 {
    0.9
}

fn default_vol_shift() -> f64 {
    0.01
}

fn default_rate_shift() -> f64 {
    0.0001
}

fn default_day_fraction() -> f64 {
    1.0 / 365.0
}

impl Default for GreeksConfig {
    fn default() -> Self {
        Self {
            spot_shift: default_spot_shift(),
            barrier_buffer: default_barrier_buffer(),
            vol_shift: default_vol_shift(),
            rate_shift: default_rate_shift(),
            day_fraction: default_day_fraction(),
        }
    }
}

impl Validate for GreeksConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        require_positive(&mut errors, "spot_shift", self.spot_shift);
        if !(self.barrier_buffer > 0.0 && self.barrier_buffer < 1.0) {
            errors.push(ValidationError::with_rule(
                "barrier_buffer",
                "Barrier buffer must lie strictly between 0 and 1",
                "unit_interval",
            ));
        }
        require_positive(&mut errors, "vol_shift", self.vol_shift);
        require_positive(&mut errors, "rate_shift", self.rate_shift);
        require_positive(&mut errors, "day_fraction", self.day_fraction);

        errors
    }
}
