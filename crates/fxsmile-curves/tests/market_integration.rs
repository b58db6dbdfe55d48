//! Integration tests for market smile construction.

use approx::assert_relative_eq;
use fxsmile_curves::prelude::*;

const MARKET_JSON: &str = r#"{
    "spot": 0.75,
    "quotes": [
        { "tenor": 0.25, "domestic_rate": 0.040, "foreign_rate": 0.020, "atm_vol": 0.100,
          "rr25": -0.010, "fly25": 0.0025, "rr10": -0.020, "fly10": 0.008, "speed": 0.001 },
        { "tenor": 1.0, "domestic_rate": 0.045, "foreign_rate": 0.025, "atm_vol": 0.110,
          "rr25": -0.012, "fly25": 0.0030, "rr10": -0.024, "fly10": 0.010 },
        { "tenor": 2.0, "domestic_rate": 0.050, "foreign_rate": 0.030, "atm_vol": 0.115,
          "rr25": -0.013, "fly25": 0.0032, "rr10": -0.026, "fly10": 0.011 }
    ]
}"#;

fn market() -> MarketSmile {
    serde_json::from_str(MARKET_JSON).expect("market parses")
}

#[test]
fn test_curves_built_from_quotes() {
    let m = market();

    assert_eq!(m.tenors(), &[0.25, 1.0, 2.0]);
    assert_relative_eq!(m.domestic_curve().interpolate_linear(1.0), 0.045);
    assert_relative_eq!(m.foreign_curve().interpolate_linear(1.5), 0.0275, epsilon = 1e-14);
    assert_relative_eq!(m.atm_vol_curve().interpolate_flat(0.5), 0.110);
    assert_eq!(m.quote(1).unwrap().speed, 0.0);
}

#[test]
fn test_pillar_vols_order() {
    let q = market().quotes()[0];
    let v = q.pillar_vols();

    assert_relative_eq!(v[0], 0.100 + 0.008 + 0.010, epsilon = 1e-14);
    assert_relative_eq!(v[1], 0.100 + 0.0025 + 0.005, epsilon = 1e-14);
    assert_relative_eq!(v[2], 0.100);
    assert_relative_eq!(v[3], 0.100 + 0.0025 - 0.005, epsilon = 1e-14);
    assert_relative_eq!(v[4], 0.100 + 0.008 - 0.010, epsilon = 1e-14);
}

#[test]
fn test_bucket_index() {
    let m = market();

    assert_eq!(m.bucket_index(0.1), 0);
    assert_eq!(m.bucket_index(0.25), 0);
    assert_eq!(m.bucket_index(0.3), 1);
    assert_eq!(m.bucket_index(1.0), 1);
    assert_eq!(m.bucket_index(1.5), 2);
    assert_eq!(m.bucket_index(7.0), 2);
}

#[test]
fn test_bumped_markets() {
    let m = market();

    let vol_up = m.with_atm_vol_shift(0.01).unwrap();
    assert_relative_eq!(vol_up.atm_vol_curve().value(1).unwrap(), 0.12, epsilon = 1e-14);

    let dom_up = m.with_domestic_shift(0.0001).unwrap();
    assert_relative_eq!(dom_up.domestic_curve().value(0).unwrap(), 0.0401, epsilon = 1e-14);
    assert_relative_eq!(dom_up.foreign_curve().value(0).unwrap(), 0.020);

    let moved = m.with_spot(0.76).unwrap();
    assert_relative_eq!(moved.spot(), 0.76);
    assert!(m.with_spot(-1.0).is_err());
}

#[test]
fn test_rejects_unsorted_and_negative_vols() {
    let mut quotes = market().quotes().to_vec();
    quotes.swap(0, 1);
    assert!(matches!(
        MarketSmile::new(0.75, quotes),
        Err(CurveError::NonMonotonicTenors { .. })
    ));

    let mut quotes = market().quotes().to_vec();
    quotes[0].rr10 = 0.5;
    assert!(matches!(
        MarketSmile::new(0.75, quotes),
        Err(CurveError::InvalidQuote { .. })
    ));
}

#[test]
fn test_serde_round_trip_preserves_market() {
    let m = market();
    let json = serde_json::to_string(&m).unwrap();
    let back: MarketSmile = serde_json::from_str(&json).unwrap();
    assert_eq!(m, back);
}
