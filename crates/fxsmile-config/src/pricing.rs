//! Pricing configuration types.

use serde::{Deserialize, Serialize};

use crate::error::{require_positive, Validate, ValidationError};

/// Settings for building option descriptors and running the PDE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Asset steps of the spatial grid.
    #[serde(default = "default_grid_nodes")]
    pub grid_nodes: usize,

    /// Target time step in years; the step count is `horizon / time_step`.
    #[serde(default = "default_time_step")]
    pub time_step: f64,

    /// Lower bound on the number of time steps of any leg.
    #[serde(default = "default_min_time_steps")]
    pub min_time_steps: usize,

    /// Below this time to expiry (years) options are valued at intrinsic.
    #[serde(default = "default_intrinsic_cutoff")]
    pub intrinsic_cutoff: f64,

    /// Grid spans `[K25P / m, K25C * m]` of the bucketing tenor.
    #[serde(default = "default_grid_width_multiplier")]
    pub grid_width_multiplier: f64,

    /// Tenors at or below this use spot delta, longer ones forward delta.
    #[serde(default = "default_delta_cut_time")]
    pub delta_cut_time: f64,

    /// Quote deltas premium-adjusted (left-hand side).
    #[serde(default)]
    pub left_hand_delta: bool,
}

fn default_grid_nodes() -> usize {
    200
}

fn default_time_step() -> f64 {
    0.01
}

fn default_min_time_steps() -> usize {
    25
}

fn default_intrinsic_cutoff() -> f64 {
    1e-4
}

fn default_grid_width_multiplier() -> f64 {
    2.0
}

pub(crate) fn default_delta_cut_time() -> f64 {
    1.05
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            grid_nodes: default_grid_nodes(),
            time_step: default_time_step(),
            min_time_steps: default_min_time_steps(),
            intrinsic_cutoff: default_intrinsic_cutoff(),
            grid_width_multiplier: default_grid_width_multiplier(),
            delta_cut_time: default_delta_cut_time(),
            left_hand_delta: false,
        }
    }
}

impl PricingConfig {
    /// Sets the number of asset steps.
    #[must_use]
    pub fn with_grid_nodes(mut self, nodes: usize) -> Self {
        self.grid_nodes = nodes;
        self
    }

    /// Sets the target time step.
    #[must_use]
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Number of time steps for a leg of length `horizon`.
    pub fn time_steps(&self, horizon: f64) -> usize {
        steps_for(horizon, self.time_step, self.min_time_steps)
    }
}

/// `max(min_steps, horizon / time_step)`, truncated.
pub(crate) fn steps_for(horizon: f64, time_step: f64, min_steps: usize) -> usize {
    let raw = (horizon / time_step).max(0.0);
    // truncation toward zero is the intended rounding
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = raw as usize;
    steps.max(min_steps)
}

impl Validate for PricingConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.grid_nodes < 4 {
            errors.push(ValidationError::with_rule(
                "grid_nodes",
                format!("Grid needs at least 4 asset steps, got {}", self.grid_nodes),
                "min_grid_nodes",
            ));
        }
        require_positive(&mut errors, "time_step", self.time_step);
        if self.min_time_steps == 0 {
            errors.push(ValidationError::with_rule(
                "min_time_steps",
                "At least one time step is required",
                "min_time_steps",
            ));
        }
        require_positive(&mut errors, "intrinsic_cutoff", self.intrinsic_cutoff);
        if !(self.grid_width_multiplier > 1.0) {
            errors.push(ValidationError::with_rule(
                "grid_width_multiplier",
                "Grid width multiplier must exceed 1",
                "grid_width",
            ));
        }
        require_positive(&mut errors, "delta_cut_time", self.delta_cut_time);

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PricingConfig::default();
        assert!(config.is_valid());
        assert_eq!(config.grid_nodes, 200);
        assert_eq!(config.min_time_steps, 25);
    }

    #[test]
    fn test_time_steps_floor() {
        let config = PricingConfig::default();
        assert_eq!(config.time_steps(0.1), 25);
        assert_eq!(config.time_steps(1.0), 100);
        assert_eq!(config.time_steps(0.0), 25);
    }

    #[test]
    fn test_invalid_fields_reported_together() {
        let config = PricingConfig {
            grid_nodes: 2,
            time_step: 0.0,
            grid_width_multiplier: 1.0,
            ..PricingConfig::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 3);
        assert!(config.validate_or_error().is_err());
    }
}
