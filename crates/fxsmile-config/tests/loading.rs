//! Loading engine configuration from files.

use approx::assert_relative_eq;
use fxsmile_config::{ConfigError, EngineConfig, SkewCondition, Validate};

#[test]
fn test_empty_document_gives_defaults() {
    let config = EngineConfig::from_toml_str("").unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn test_partial_toml_overrides() {
    let config = EngineConfig::from_toml_str(
        r#"
        [pricing]
        grid_nodes = 400
        left_hand_delta = true

        [calibration]
        skew_condition = "rebate_speed"
        target_tenor = 2.0

        [greeks]
        vol_shift = 0.005
        "#,
    )
    .unwrap();

    assert_eq!(config.pricing.grid_nodes, 400);
    assert!(config.pricing.left_hand_delta);
    assert_relative_eq!(config.pricing.time_step, 0.01);
    assert_eq!(config.calibration.skew_condition, SkewCondition::RebateSpeed);
    assert_eq!(config.calibration.target_tenor, Some(2.0));
    assert_relative_eq!(config.greeks.vol_shift, 0.005);
}

#[test]
fn test_json_loading() {
    let config =
        EngineConfig::from_json_str(r#"{ "calibration": { "stochastic": false } }"#).unwrap();
    assert!(!config.calibration.stochastic);
}

#[test]
fn test_invalid_values_rejected_with_section() {
    let err = EngineConfig::from_toml_str(
        r#"
        [greeks]
        barrier_buffer = 1.5
        "#,
    )
    .unwrap_err();

    match err {
        ConfigError::Validation { field, .. } => assert_eq!(field, "greeks.barrier_buffer"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_toml_round_trip() {
    let config = EngineConfig::default();
    let text = config.to_toml_string().unwrap();
    let back = EngineConfig::from_toml_str(&text).unwrap();
    assert_eq!(config, back);
    assert!(back.is_valid());
}

#[test]
fn test_syntax_error() {
    assert!(matches!(
        EngineConfig::from_toml_str("[pricing"),
        Err(ConfigError::Deserialization(_))
    ));
}
