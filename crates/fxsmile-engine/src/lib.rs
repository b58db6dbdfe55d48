//! # fxsmile Engine
//!
//! Local-volatility pricing and smile calibration for FX options.
//!
//! This crate provides:
//!
//! - **Payoffs**: booked [`TradeEconomics`] classified into a
//!   [`PayoffStyle`] and a barrier monitoring [`BarrierWindow`]
//! - **Grid**: a three-regime Crank-Nicolson [`FiniteDifferenceGrid`] in
//!   log spot with regime mixing between steps
//! - **Pricer**: backward induction over one or two legs, with barrier
//!   windows that start late or finish early
//! - **Smile**: delta-quoted strikes, ATM conventions and the
//!   [`SmileCalculation`] from risk reversals and butterflies
//! - **Calibration**: tenor-by-tenor Newton fit of the coefficient curves
//!   with progress reporting and cancellation
//! - **Greeks**: bump-and-reprice sensitivities
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fxsmile_config::PricingConfig;
//! use fxsmile_curves::{CoefficientCurves, LocalVolCoefficients, MarketSmile, SmileQuote};
//! use fxsmile_engine::prelude::*;
//!
//! let quote = SmileQuote {
//!     tenor: 1.0,
//!     domestic_rate: 0.04,
//!     foreign_rate: 0.02,
//!     atm_vol: 0.10,
//!     rr25: 0.0,
//!     fly25: 0.0,
//!     rr10: 0.0,
//!     fly10: 0.0,
//!     speed: 0.0,
//! };
//! let market = MarketSmile::new(0.75, vec![quote]).unwrap();
//! let curves = CoefficientCurves::new(market.tenors(), LocalVolCoefficients::FLAT).unwrap();
//!
//! let trade = TradeEconomics::vanilla(OptionKind::Call, 0.76, 0.5);
//! let descriptor = OptionDescriptor::from_trade(&trade, &market, &PricingConfig::default()).unwrap();
//! let value = Pricer::new(&market, &curves).value(&descriptor).unwrap();
//! assert!(value > 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_arguments)]

pub mod black;
pub mod calibration;
pub mod descriptor;
pub mod error;
pub mod greeks;
pub mod grid;
pub mod local_vol;
pub mod payoff;
pub mod pricer;
pub mod smile;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::black::BlackInputs;
    pub use crate::calibration::{
        CalibrationReport, Calibrator, CancelAfter, NoopSink, ProgressEvent, ProgressSink,
        TenorFailure, TenorFit,
    };
    pub use crate::descriptor::{GridBounds, OptionDescriptor};
    pub use crate::error::{EngineError, EngineResult, ErrorCode};
    pub use crate::greeks::{Greeks, GreeksCalculator};
    pub use crate::payoff::{
        BarrierTerms, BarrierWindow, Knock, OptionKind, Payout, PayoffStyle, Settlement,
        TradeEconomics,
    };
    pub use crate::pricer::{Pricer, Valuation, ValuationStatus};
    pub use crate::smile::SmileCalculation;
}

pub use black::BlackInputs;
pub use calibration::{
    CalibrationReport, Calibrator, ProgressEvent, ProgressSink, TenorFailure, TenorFit,
};
pub use descriptor::OptionDescriptor;
pub use error::{EngineError, EngineResult, ErrorCode};
pub use greeks::{Greeks, GreeksCalculator};
pub use grid::FiniteDifferenceGrid;
pub use payoff::{BarrierWindow, PayoffStyle, TradeEconomics};
pub use pricer::{Pricer, Valuation};
pub use smile::SmileCalculation;
