//! Top-level engine configuration and loading.

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationConfig;
use crate::error::{ConfigResult, Validate, ValidationError};
use crate::pricing::PricingConfig;
use crate::risk::GreeksConfig;

/// All engine settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pricing settings.
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Calibration settings.
    #[serde(default)]
    pub calibration: CalibrationConfig,

    /// Greeks settings.
    #[serde(default)]
    pub greeks: GreeksConfig,
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate_or_error()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(s: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate_or_error()?;
        Ok(config)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        errors.extend(
            self.pricing
                .validate()
                .into_iter()
                .map(|e| e.in_section("pricing")),
        );
        errors.extend(
            self.calibration
                .validate()
                .into_iter()
                .map(|e| e.in_section("calibration")),
        );
        errors.extend(
            self.greeks
                .validate()
                .into_iter()
                .map(|e| e.in_section("greeks")),
        );
        errors
    }
}
