//! Calibration configuration types.

use serde::{Deserialize, Serialize};

use crate::error::{require_positive, Validate, ValidationError};
use crate::pricing::{default_delta_cut_time, steps_for};

/// Which market condition pins the vol-of-vol (the sixth unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkewCondition {
    /// The 25-delta risk reversal, repriced after a spot move, must move by
    /// the quoted speed.
    #[default]
    RiskReversalSlope,
    /// The double-no-touch premium over a pure local-volatility price must
    /// equal the quoted speed in basis points.
    RebateSpeed,
}

/// Settings of the tenor-by-tenor Newton calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Convergence tolerance on each implied-vol residual.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Newton iterations per tenor.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Central-difference bump of each unknown.
    #[serde(default = "default_jacobian_bump")]
    pub jacobian_bump: f64,

    /// Largest accepted Newton step in any unknown.
    #[serde(default = "default_max_step")]
    pub max_step: f64,

    /// Asset steps of the calibration grid.
    #[serde(default = "default_grid_nodes")]
    pub grid_nodes: usize,

    /// Target time step of the calibration grid.
    #[serde(default = "default_time_step")]
    pub time_step: f64,

    /// Fewest time steps per tenor.
    #[serde(default = "default_min_time_steps")]
    pub min_time_steps: usize,

    /// Most time steps per tenor.
    #[serde(default = "default_max_time_steps")]
    pub max_time_steps: usize,

    /// Solve for vol-of-vol (three-regime mixing) as well.
    #[serde(default = "default_stochastic")]
    pub stochastic: bool,

    /// Condition used for the sixth residual.
    #[serde(default)]
    pub skew_condition: SkewCondition,

    /// Spot multiplier of the risk-reversal slope condition.
    #[serde(default = "default_speed_spot_shift")]
    pub speed_spot_shift: f64,

    /// Tenors at or below this use spot delta, longer ones forward delta.
    #[serde(default = "default_delta_cut_time")]
    pub delta_cut_time: f64,

    /// Quote deltas premium-adjusted (left-hand side).
    #[serde(default)]
    pub left_hand_delta: bool,

    /// Stop after the tenor at or beyond this time, if set.
    #[serde(default)]
    pub target_tenor: Option<f64>,
}

fn default_tolerance() -> f64 {
    0.0002
}

fn default_max_iterations() -> u32 {
    10
}

fn default_jacobian_bump() -> f64 {
    0.005
}

fn default_max_step() -> f64 {
    3.0
}

fn default_grid_nodes() -> usize {
    200
}

fn default_time_step() -> f64 {
    0.025
}

fn default_min_time_steps() -> usize {
    25
}

fn default_max_time_steps() -> usize {
    200
}

fn default_stochastic() -> bool {
    true
}

fn default_speed_spot_shift() -> f64 {
    1.01
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            jacobian_bump: default_jacobian_bump(),
            max_step: default_max_step(),
            grid_nodes: default_grid_nodes(),
            time_step: default_time_step(),
            min_time_steps: default_min_time_steps(),
            max_time_steps: default_max_time_steps(),
            stochastic: default_stochastic(),
            skew_condition: SkewCondition::default(),
            speed_spot_shift: default_speed_spot_shift(),
            delta_cut_time: default_delta_cut_time(),
            left_hand_delta: false,
            target_tenor: None,
        }
    }
}

impl CalibrationConfig {
    /// Enables or disables vol-of-vol calibration.
    #[must_use]
    pub fn with_stochastic(mut self, stochastic: bool) -> Self {
        self.stochastic = stochastic;
        self
    }

    /// Sets the skew condition.
    #[must_use]
    pub fn with_skew_condition(mut self, condition: SkewCondition) -> Self {
        self.skew_condition = condition;
        self
    }

    /// Sets the calibration grid size.
    #[must_use]
    pub fn with_grid_nodes(mut self, nodes: usize) -> Self {
        self.grid_nodes = nodes;
        self
    }

    /// Number of unknowns solved per tenor.
    pub fn unknowns(&self) -> usize {
        if self.stochastic {
            6
        } else {
            5
        }
    }

    /// Time steps for a tenor of length `tenor`, clamped to the configured range.
    pub fn time_steps(&self, tenor: f64) -> usize {
        steps_for(tenor, self.time_step, self.min_time_steps).min(self.max_time_steps)
    }
}

impl Validate for CalibrationConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        require_positive(&mut errors, "tolerance", self.tolerance);
        if self.max_iterations == 0 {
            errors.push(ValidationError::with_rule(
                "max_iterations",
                "At least one Newton iteration is required",
                "valid_iterations",
            ));
        }
        require_positive(&mut errors, "jacobian_bump", self.jacobian_bump);
        require_positive(&mut errors, "max_step", self.max_step);
        if self.grid_nodes < 4 {
            errors.push(ValidationError::with_rule(
                "grid_nodes",
                format!("Grid needs at least 4 asset steps, got {}", self.grid_nodes),
                "min_grid_nodes",
            ));
        }
        require_positive(&mut errors, "time_step", self.time_step);
        if self.min_time_steps == 0 || self.max_time_steps < self.min_time_steps {
            errors.push(ValidationError::with_rule(
                "max_time_steps",
                format!(
                    "Time step range [{}, {}] is empty",
                    self.min_time_steps, self.max_time_steps
                ),
                "time_step_range",
            ));
        }
        if !(self.speed_spot_shift > 0.0 && self.speed_spot_shift != 1.0) {
            errors.push(ValidationError::with_rule(
                "speed_spot_shift",
                "Spot shift multiplier must be positive and differ from 1",
                "spot_shift",
            ));
        }
        require_positive(&mut errors, "delta_cut_time", self.delta_cut_time);
        if let Some(t) = self.target_tenor {
            require_positive(&mut errors, "target_tenor", t);
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CalibrationConfig::default();
        assert!(config.is_valid());
        assert_eq!(config.unknowns(), 6);
        assert_eq!(config.with_stochastic(false).unknowns(), 5);
    }

    #[test]
    fn test_time_steps_clamped() {
        let config = CalibrationConfig::default();
        assert_eq!(config.time_steps(0.25), 25);
        assert_eq!(config.time_steps(1.0), 40);
        assert_eq!(config.time_steps(10.0), 200);
    }

    #[test]
    fn test_bad_step_range() {
        let config = CalibrationConfig {
            min_time_steps: 50,
            max_time_steps: 10,
            ..CalibrationConfig::default()
        };
        assert!(!config.is_valid());
    }
}
