//! Error types for curve operations.

use thiserror::Error;

/// A specialized Result type for curve operations.
pub type CurveResult<T> = Result<T, CurveError>;

/// Error types for curve operations.
#[derive(Error, Debug, Clone)]
pub enum CurveError {
    /// Pillar times and values have different lengths.
    #[error("Length mismatch: {times} times but {values} values")]
    LengthMismatch {
        /// Number of pillar times.
        times: usize,
        /// Number of pillar values.
        values: usize,
    },

    /// Tenors are not strictly increasing.
    #[error("Non-monotonic tenors at index {index}: {prev:.4} >= {current:.4}")]
    NonMonotonicTenors {
        /// Index where monotonicity violation occurred.
        index: usize,
        /// Previous tenor value.
        prev: f64,
        /// Current tenor value.
        current: f64,
    },

    /// Pillar index beyond the end of the curve.
    #[error("Pillar index {index} out of range for curve of {len} pillars")]
    PillarOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of pillars.
        len: usize,
    },

    /// Not enough data points.
    #[error("Insufficient points: need at least {required}, got {got}")]
    InsufficientPoints {
        /// Minimum required points.
        required: usize,
        /// Actual number of points provided.
        got: usize,
    },

    /// A market quote is unusable.
    #[error("Invalid quote at tenor {tenor:.4}: {reason}")]
    InvalidQuote {
        /// Tenor of the offending quote.
        tenor: f64,
        /// Description of the problem.
        reason: String,
    },

    /// A market-level input is unusable.
    #[error("Invalid market data: {reason}")]
    InvalidMarket {
        /// Description of the problem.
        reason: String,
    },
}

impl CurveError {
    /// Creates an invalid quote error.
    #[must_use]
    pub fn invalid_quote(tenor: f64, reason: impl Into<String>) -> Self {
        Self::InvalidQuote {
            tenor,
            reason: reason.into(),
        }
    }

    /// Creates an invalid market error.
    #[must_use]
    pub fn invalid_market(reason: impl Into<String>) -> Self {
        Self::InvalidMarket {
            reason: reason.into(),
        }
    }
}
