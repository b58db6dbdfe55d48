//! Error types for pricing, calibration and risk.

use std::fmt;

use fxsmile_curves::CurveError;
use fxsmile_math::MathError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Why a tenor's Newton solve gave up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NonConvergenceReason {
    /// A Newton update component reached the step limit.
    StepTooLarge {
        /// Index of the offending unknown.
        component: usize,
        /// Size of the rejected step.
        step: f64,
    },
    /// The iteration budget ran out before every residual met tolerance.
    IterationLimit {
        /// Largest residual magnitude at the last evaluation.
        max_residual: f64,
    },
    /// The model price of a calibration instrument was zero or not finite,
    /// so no implied volatility exists.
    DegeneratePrice {
        /// Strike of the instrument.
        strike: f64,
    },
}

impl fmt::Display for NonConvergenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepTooLarge { component, step } => {
                write!(f, "step {step:.4} in unknown {component} exceeds the limit")
            }
            Self::IterationLimit { max_residual } => {
                write!(f, "iteration limit reached (max residual {max_residual:.2e})")
            }
            Self::DegeneratePrice { strike } => {
                write!(f, "degenerate model price at strike {strike}")
            }
        }
    }
}

/// Errors raised by the engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Grid bounds or node counts that cannot form a mesh.
    #[error("invalid grid: bounds [{lower}, {upper}] with {nodes} asset steps")]
    GridConfiguration {
        /// Lower log-asset bound.
        lower: f64,
        /// Upper log-asset bound.
        upper: f64,
        /// Requested asset steps.
        nodes: usize,
    },

    /// Zero pivot while solving the Newton system.
    #[error("singular Newton system at tenor {tenor_index} (pivot row {row})")]
    SingularSystem {
        /// Tenor being calibrated.
        tenor_index: usize,
        /// Elimination step that found no pivot.
        row: usize,
    },

    /// Newton calibration of a tenor failed.
    #[error("calibration of tenor {tenor_index} failed after {iterations} iterations: {reason}")]
    NonConvergence {
        /// Tenor being calibrated.
        tenor_index: usize,
        /// Iterations completed.
        iterations: u32,
        /// Failure cause.
        reason: NonConvergenceReason,
    },

    /// A computation produced NaN.
    #[error("numeric domain error: {context}")]
    NumericDomain {
        /// Where the NaN appeared.
        context: String,
    },

    /// Trade economics that do not describe a supported instrument.
    #[error("invalid option descriptor: {0}")]
    InvalidDescriptor(String),

    /// Market data unusable for the request.
    #[error("invalid market: {0}")]
    InvalidMarket(String),

    /// Error from the numerical layer.
    #[error(transparent)]
    Math(#[from] MathError),

    /// Error from the curve layer.
    #[error(transparent)]
    Curve(#[from] CurveError),
}

/// Stable failure classes, one per cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// See [`EngineError::GridConfiguration`].
    GridConfiguration,
    /// See [`EngineError::SingularSystem`].
    SingularSystem,
    /// Newton step over the limit.
    StepTooLarge,
    /// Newton iteration budget exhausted.
    IterationLimit,
    /// Zero or non-finite model price during calibration.
    DegeneratePrice,
    /// See [`EngineError::NumericDomain`].
    NumericDomain,
    /// Descriptor, market or curve input rejected.
    InvalidInput,
    /// Failure inside a numerical routine.
    Numerical,
}

impl ErrorCode {
    /// Numeric form for callers that persist failure codes.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::GridConfiguration => 10,
            Self::NumericDomain => 20,
            Self::InvalidInput => 30,
            Self::Numerical => 40,
            Self::SingularSystem => 90,
            Self::DegeneratePrice => 96,
            Self::IterationLimit => 97,
            Self::StepTooLarge => 98,
        }
    }

    /// Returns true for Newton failures a retry without stochastic mixing
    /// may cure.
    pub fn is_calibration_failure(self) -> bool {
        matches!(
            self,
            Self::SingularSystem | Self::StepTooLarge | Self::IterationLimit | Self::DegeneratePrice
        )
    }
}

impl EngineError {
    /// Creates a numeric domain error.
    pub fn numeric_domain(context: impl Into<String>) -> Self {
        Self::NumericDomain {
            context: context.into(),
        }
    }

    /// Creates an invalid descriptor error.
    pub fn invalid_descriptor(reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor(reason.into())
    }

    /// Failure class of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::GridConfiguration { .. } => ErrorCode::GridConfiguration,
            Self::SingularSystem { .. } => ErrorCode::SingularSystem,
            Self::NonConvergence { reason, .. } => match reason {
                NonConvergenceReason::StepTooLarge { .. } => ErrorCode::StepTooLarge,
                NonConvergenceReason::IterationLimit { .. } => ErrorCode::IterationLimit,
                NonConvergenceReason::DegeneratePrice { .. } => ErrorCode::DegeneratePrice,
            },
            Self::NumericDomain { .. } => ErrorCode::NumericDomain,
            Self::InvalidDescriptor(_) | Self::InvalidMarket(_) | Self::Curve(_) => {
                ErrorCode::InvalidInput
            }
            Self::Math(_) => ErrorCode::Numerical,
        }
    }

    /// Returns true if a calibration retry without stochastic mixing may help.
    pub fn is_calibration_failure(&self) -> bool {
        self.code().is_calibration_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_per_cause() {
        let step = EngineError::NonConvergence {
            tenor_index: 2,
            iterations: 3,
            reason: NonConvergenceReason::StepTooLarge {
                component: 5,
                step: 4.2,
            },
        };
        let singular = EngineError::SingularSystem {
            tenor_index: 2,
            row: 4,
        };
        assert_eq!(step.code(), ErrorCode::StepTooLarge);
        assert_eq!(singular.code(), ErrorCode::SingularSystem);
        assert_ne!(step.code().as_i32(), singular.code().as_i32());
        assert!(step.is_calibration_failure());
        assert!(!EngineError::numeric_domain("price").is_calibration_failure());
    }

    #[test]
    fn test_display() {
        let err = EngineError::NonConvergence {
            tenor_index: 1,
            iterations: 10,
            reason: NonConvergenceReason::IterationLimit { max_residual: 3e-3 },
        };
        let msg = err.to_string();
        assert!(msg.contains("tenor 1"));
        assert!(msg.contains("iteration limit"));

        let err: EngineError = MathError::SingularMatrix { row: 2 }.into();
        assert_eq!(err.code(), ErrorCode::Numerical);
    }
}
