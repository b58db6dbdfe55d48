//! Tenor-by-tenor calibration of the local-volatility coefficients.
//!
//! Tenors are fitted strictly in increasing order: the pricer reads the
//! coefficient curves across the whole horizon of an option, so each fit
//! depends on the slots written before it. A slot is written only after
//! its Newton solve converges. A tenor whose Newton solve fails ends the
//! sweep; the report keeps the slots fitted before it and names the failure.
//!
//! # Example
//!
//! ```rust,no_run
//! use fxsmile_config::CalibrationConfig;
//! use fxsmile_curves::{MarketSmile, SmileQuote};
//! use fxsmile_engine::calibration::{Calibrator, NoopSink};
//!
//! let quote = SmileQuote {
//!     tenor: 1.0,
//!     domestic_rate: 0.04,
//!     foreign_rate: 0.02,
//!     atm_vol: 0.10,
//!     rr25: -0.006,
//!     fly25: 0.002,
//!     rr10: -0.012,
//!     fly10: 0.007,
//!     speed: 0.0,
//! };
//! let market = MarketSmile::new(0.75, vec![quote]).unwrap();
//! let config = CalibrationConfig::default().with_stochastic(false);
//!
//! let report = Calibrator::new(&market, &config)
//!     .calibrate(None, &mut NoopSink)
//!     .unwrap();
//! if let Some(failure) = &report.failure {
//!     eprintln!("stopped at tenor {}: {}", failure.tenor_index, failure.message);
//! }
//! println!("a0 = {}", report.fits[0].coefficients.a0);
//! ```

mod newton;
pub mod progress;
pub mod targets;

pub use progress::{CancelAfter, NoopSink, ProgressEvent, ProgressSink};
pub use targets::{CalibrationTargets, SkewTarget};

use fxsmile_config::CalibrationConfig;
use fxsmile_curves::{CoefficientCurves, LocalVolCoefficients, MarketSmile};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult, ErrorCode};
use newton::TenorProblem;

/// Outcome of one tenor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenorFit {
    /// Tenor index.
    pub tenor_index: usize,
    /// Tenor in years.
    pub tenor: f64,
    /// Fitted coefficients.
    pub coefficients: LocalVolCoefficients,
    /// Strikes 10P, 25P, ATM, 25C, 10C.
    pub strikes: [f64; 5],
    /// Black prices at the market vols.
    pub market_prices: [f64; 5],
    /// Model prices; the sixth entry is the rebate premium in basis points
    /// under the rebate speed condition.
    pub fit_prices: [f64; 6],
    /// Model implied vols; the sixth entry is the risk-reversal move in
    /// basis points under the slope condition.
    pub fit_vols: [f64; 6],
    /// Residual evaluations used, the converging one included.
    pub iterations: u32,
}

/// Tenor at which a sweep stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenorFailure {
    /// Tenor index.
    pub tenor_index: usize,
    /// Tenor in years.
    pub tenor: f64,
    /// Failure class.
    pub code: ErrorCode,
    /// Rendered error.
    pub message: String,
}

/// Result of a calibration sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Coefficient curves with every fitted slot written.
    pub curves: CoefficientCurves,
    /// Fits in tenor order.
    pub fits: Vec<TenorFit>,
    /// True if the sink cancelled the sweep before the last tenor.
    pub cancelled: bool,
    /// The tenor whose Newton solve failed, if any.
    #[serde(default)]
    pub failure: Option<TenorFailure>,
}

impl CalibrationReport {
    /// True if every requested tenor was fitted.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failure.is_none()
    }
}

/// Calibrates coefficient curves to a market smile.
#[derive(Debug, Clone, Copy)]
pub struct Calibrator<'a> {
    market: &'a MarketSmile,
    config: &'a CalibrationConfig,
}

impl<'a> Calibrator<'a> {
    /// Creates a calibrator.
    pub fn new(market: &'a MarketSmile, config: &'a CalibrationConfig) -> Self {
        Self { market, config }
    }

    /// Number of tenors the sweep covers, honouring `target_tenor`.
    pub fn tenor_count(&self) -> usize {
        let tenors = self.market.tenors();
        match self.config.target_tenor {
            Some(target) => tenors.iter().take_while(|t| **t <= target).count(),
            None => tenors.len(),
        }
    }

    /// Starting curves: the caller's where supplied, every uncalibrated
    /// slot seeded with [`LocalVolCoefficients::INITIAL_GUESS`].
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidMarket`] if the supplied curves sit on a
    /// different tenor grid from the market.
    pub fn initial_curves(
        &self,
        initial: Option<&CoefficientCurves>,
    ) -> EngineResult<CoefficientCurves> {
        let tenors = self.market.tenors();
        let mut curves = match initial {
            Some(c) if c.tenors() == tenors => c.clone(),
            Some(c) => {
                return Err(EngineError::InvalidMarket(format!(
                    "coefficient tenors {:?} do not match market tenors {tenors:?}",
                    c.tenors()
                )))
            }
            None => CoefficientCurves::uncalibrated(tenors)?,
        };
        for k in 0..curves.len() {
            if !curves.is_calibrated(k) {
                curves.set_tenor(k, LocalVolCoefficients::INITIAL_GUESS)?;
            }
        }
        if !self.config.stochastic {
            curves.disable_mixing();
        }
        Ok(curves)
    }

    /// Fits every tenor in increasing order.
    ///
    /// The sink is polled for cancellation before each tenor. A Newton
    /// failure (see [`ErrorCode::is_calibration_failure`]) stops the sweep:
    /// the sink receives [`ProgressEvent::TenorFailed`] and the report keeps
    /// the tenors fitted so far with the failure in
    /// [`CalibrationReport::failure`].
    ///
    /// # Errors
    ///
    /// Bad inputs and numeric domain errors are returned as they are.
    pub fn calibrate(
        &self,
        initial: Option<&CoefficientCurves>,
        sink: &mut dyn ProgressSink,
    ) -> EngineResult<CalibrationReport> {
        let mut curves = self.initial_curves(initial)?;
        let mut fits = Vec::new();
        let mut cancelled = false;
        let mut failure = None;

        for k in 0..self.tenor_count() {
            if sink.is_cancelled() {
                info!(completed = fits.len(), "calibration cancelled");
                cancelled = true;
                break;
            }
            match self.calibrate_tenor(k, &mut curves, sink) {
                Ok(fit) => fits.push(fit),
                Err(e) if e.is_calibration_failure() => {
                    warn!(tenor_index = k, error = %e, "tenor calibration failed");
                    sink.emit(ProgressEvent::TenorFailed {
                        tenor_index: k,
                        code: e.code(),
                        message: e.to_string(),
                    });
                    failure = Some(TenorFailure {
                        tenor_index: k,
                        tenor: self.market.tenors()[k],
                        code: e.code(),
                        message: e.to_string(),
                    });
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(CalibrationReport {
            curves,
            fits,
            cancelled,
            failure,
        })
    }

    /// Fits tenor `k` and writes it into `curves` on success only.
    pub fn calibrate_tenor(
        &self,
        k: usize,
        curves: &mut CoefficientCurves,
        sink: &mut dyn ProgressSink,
    ) -> EngineResult<TenorFit> {
        let quote = self.market.quote(k)?;
        sink.emit(ProgressEvent::TenorStarted {
            tenor_index: k,
            tenor: quote.tenor,
        });

        let targets = CalibrationTargets::for_quote(quote, self.market.spot(), self.config)?;
        let mut guess = curves.tenor(k)?;
        if !self.config.stochastic {
            guess.vol_of_vol = 0.0;
        }

        let problem = TenorProblem::new(self.market, &targets, k, curves, guess, self.config)?;
        let outcome = newton::solve(&problem, guess.unknowns(), self.config, sink)?;

        let coefficients = guess.with_unknowns(outcome.unknowns);
        curves.set_tenor(k, coefficients)?;
        info!(
            tenor_index = k,
            tenor = quote.tenor,
            iterations = outcome.iterations,
            a0 = coefficients.a0,
            vol_of_vol = coefficients.vol_of_vol,
            "tenor calibrated"
        );
        sink.emit(ProgressEvent::TenorConverged {
            tenor_index: k,
            iterations: outcome.iterations,
        });

        Ok(TenorFit {
            tenor_index: k,
            tenor: quote.tenor,
            coefficients,
            strikes: targets.strikes,
            market_prices: targets.prices,
            fit_prices: outcome.evaluation.fit_prices,
            fit_vols: outcome.evaluation.fit_vols,
            iterations: outcome.iterations,
        })
    }
}
