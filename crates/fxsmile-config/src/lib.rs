//! fxsmile Configuration Layer
//!
//! Engine settings for the fxsmile local-volatility engine, grouped by the
//! operation that consumes them.
//!
//! # Features
//!
//! - **Pricing Configuration**: grid size, time step, intrinsic cut-off,
//!   grid-width rule and delta convention
//! - **Calibration Configuration**: Newton tolerance and step limits, the
//!   calibration grid, stochastic mixing and the skew condition
//! - **Risk Configuration**: bump sizes for Greeks
//! - **Loading**: every field has a default; files may be TOML or JSON
//!
//! # Example
//!
//! ```rust
//! use fxsmile_config::{EngineConfig, Validate};
//!
//! let config = EngineConfig::from_toml_str(
//!     r#"
//!     [calibration]
//!     stochastic = false
//!     "#,
//! )
//! .unwrap();
//!
//! assert!(!config.calibration.stochastic);
//! assert_eq!(config.pricing.grid_nodes, 200);
//! assert!(config.is_valid());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod calibration;
pub mod engine;
pub mod error;
pub mod pricing;
pub mod risk;

pub use calibration::{CalibrationConfig, SkewCondition};
pub use engine::EngineConfig;
pub use error::{ConfigError, ConfigResult, Validate, ValidationError};
pub use pricing::PricingConfig;
pub use risk::GreeksConfig;
