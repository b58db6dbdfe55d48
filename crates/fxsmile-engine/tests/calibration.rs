//! End-to-end calibration sweeps.

use approx::assert_relative_eq;
use fxsmile_config::{CalibrationConfig, SkewCondition};
use fxsmile_curves::{LocalVolCoefficients, MarketSmile, SmileQuote};
use fxsmile_engine::calibration::{
    CalibrationReport, CancelAfter, Calibrator, NoopSink, ProgressEvent,
};
use fxsmile_engine::ErrorCode;

fn flat_market(tenors: &[f64]) -> MarketSmile {
    flat_market_at(tenors, 0.10)
}

fn flat_market_at(tenors: &[f64], atm_vol: f64) -> MarketSmile {
    let quotes = tenors
        .iter()
        .map(|&tenor| SmileQuote {
            tenor,
            domestic_rate: 0.03,
            foreign_rate: 0.01,
            atm_vol,
            rr25: 0.0,
            fly25: 0.0,
            rr10: 0.0,
            fly10: 0.0,
            speed: 0.0,
        })
        .collect();
    MarketSmile::new(0.75, quotes).unwrap()
}

fn local_vol_config() -> CalibrationConfig {
    CalibrationConfig::default().with_stochastic(false)
}

fn assert_flat_shape(c: &LocalVolCoefficients) {
    assert!((c.a0 - 1.0).abs() < 0.03, "a0 = {}", c.a0);
    assert!(c.a1.abs() < 0.03, "a1 = {}", c.a1);
    assert!(c.a2.abs() < 0.03, "a2 = {}", c.a2);
    assert!(c.a3.abs() < 0.05, "a3 = {}", c.a3);
    assert!(c.a4.abs() < 0.05, "a4 = {}", c.a4);
}

#[test]
fn test_flat_smile_calibrates_to_flat_shape() {
    let market = flat_market(&[0.5]);
    let config = local_vol_config();
    let mut events = Vec::new();

    let report = Calibrator::new(&market, &config)
        .calibrate(None, &mut events)
        .unwrap();

    assert!(!report.cancelled);
    assert_eq!(report.fits.len(), 1);
    let c = report.fits[0].coefficients;
    assert_flat_shape(&c);
    assert_eq!(c.vol_of_vol, 0.0);
    assert!(report.curves.is_calibrated(0));

    for (fit, target) in report.fits[0].fit_vols[..5].iter().zip([0.10; 5]) {
        assert!((fit - target).abs() <= config.tolerance);
    }

    assert!(matches!(
        events.first(),
        Some(ProgressEvent::TenorStarted { tenor_index: 0, .. })
    ));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::TenorConverged { tenor_index: 0, .. })
    ));
}

#[test]
fn test_recalibration_from_fit_converges_immediately() {
    let market = flat_market(&[0.5]);
    let config = local_vol_config();
    let calibrator = Calibrator::new(&market, &config);

    let first = calibrator.calibrate(None, &mut NoopSink).unwrap();
    let second = calibrator
        .calibrate(Some(&first.curves), &mut NoopSink)
        .unwrap();

    assert_eq!(second.fits[0].iterations, 1);
    assert_eq!(second.fits[0].coefficients, first.fits[0].coefficients);
}

#[test]
fn test_cancellation_stops_between_tenors() {
    let market = flat_market(&[0.25, 0.5]);
    let config = local_vol_config();
    let mut sink = CancelAfter::new(Vec::new(), 1);

    let report = Calibrator::new(&market, &config)
        .calibrate(None, &mut sink)
        .unwrap();
    let events = sink.into_inner();

    assert!(report.cancelled);
    assert_eq!(report.fits.len(), 1);
    assert!(events
        .iter()
        .all(|e| !matches!(e, ProgressEvent::TenorStarted { tenor_index: 1, .. })));
}

#[test]
fn test_target_tenor_limits_sweep() {
    let market = flat_market(&[0.25, 0.5, 1.0]);
    let mut config = local_vol_config();
    config.target_tenor = Some(0.5);

    assert_eq!(Calibrator::new(&market, &config).tenor_count(), 2);
}

#[test]
fn test_iteration_budget_exhaustion_reports_failure() {
    let market = flat_market(&[0.5]);
    let mut config = local_vol_config();
    config.max_iterations = 0;
    let mut events = Vec::new();

    let report = Calibrator::new(&market, &config)
        .calibrate(None, &mut events)
        .unwrap();

    assert!(!report.is_complete());
    assert!(report.fits.is_empty());
    let failure = report.failure.unwrap();
    assert_eq!(failure.tenor_index, 0);
    assert_eq!(failure.code, ErrorCode::IterationLimit);
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::TenorFailed { tenor_index: 0, .. })
    ));
}

#[test]
fn test_flat_ten_year_smile_stochastic_fit() {
    let market = flat_market_at(&[10.0], 0.2467);
    let config = CalibrationConfig::default();
    assert_eq!(config.unknowns(), 6);

    let report = Calibrator::new(&market, &config)
        .calibrate(None, &mut NoopSink)
        .unwrap();

    assert!(report.is_complete(), "{:?}", report.failure);
    let fit = &report.fits[0];
    assert_flat_shape(&fit.coefficients);
    assert!(
        fit.coefficients.vol_of_vol < 0.05,
        "vol_of_vol = {}",
        fit.coefficients.vol_of_vol
    );
    // Shape level is relative to ATM: the local vol sits on the flat 24.67%.
    assert!((fit.coefficients.a0 * 0.2467 - 0.2467).abs() < 0.0075);
    for vol in &fit.fit_vols[..5] {
        assert!((vol - 0.2467).abs() <= config.tolerance);
    }
}

#[test]
fn test_flat_short_tenors_stochastic_sweep_converges() {
    let market = flat_market(&[0.25, 0.5, 1.0]);
    let config = CalibrationConfig::default();
    let mut events = Vec::new();

    let report = Calibrator::new(&market, &config)
        .calibrate(None, &mut events)
        .unwrap();

    assert!(report.is_complete(), "{:?}", report.failure);
    assert_eq!(report.fits.len(), 3);
    for fit in &report.fits {
        assert_flat_shape(&fit.coefficients);
        assert!(
            fit.coefficients.vol_of_vol < 0.05,
            "tenor {}: vol_of_vol = {}",
            fit.tenor,
            fit.coefficients.vol_of_vol
        );
    }
    assert!(events
        .iter()
        .all(|e| !matches!(e, ProgressEvent::TenorFailed { .. })));
}

#[test]
fn test_rebate_speed_condition_on_flat_smile() {
    let market = flat_market(&[0.5]);
    let config = CalibrationConfig::default().with_skew_condition(SkewCondition::RebateSpeed);

    let report = Calibrator::new(&market, &config)
        .calibrate(None, &mut NoopSink)
        .unwrap();

    assert!(report.is_complete(), "{:?}", report.failure);
    let fit = &report.fits[0];
    assert_flat_shape(&fit.coefficients);
    assert!(fit.coefficients.vol_of_vol < 0.05);
    // Double-no-touch premium over the pure local-vol price, in basis points.
    assert!(fit.fit_prices[5].is_finite());
}

#[test]
fn test_step_limit_stops_sweep() {
    let market = flat_market(&[0.5, 1.0]);
    let mut config = local_vol_config();
    config.max_step = 1e-6;

    let report = Calibrator::new(&market, &config)
        .calibrate(None, &mut NoopSink)
        .unwrap();

    let failure = report.failure.unwrap();
    assert_eq!(failure.tenor_index, 0);
    assert_eq!(failure.code, ErrorCode::StepTooLarge);
    assert!(report.fits.is_empty());
    // The starting guess is left in place; nothing was written.
    let mut expected = LocalVolCoefficients::INITIAL_GUESS;
    expected.vol_of_vol = 0.0;
    assert_eq!(report.curves.tenor(0).unwrap(), expected);
}

#[test]
fn test_jacobian_without_response_is_singular() {
    let market = flat_market(&[0.5]);
    let mut config = local_vol_config();
    // Bumps below the resolution of every unknown leave all prices unchanged.
    config.jacobian_bump = 1e-300;

    let report = Calibrator::new(&market, &config)
        .calibrate(None, &mut NoopSink)
        .unwrap();

    let failure = report.failure.unwrap();
    assert_eq!(failure.code, ErrorCode::SingularSystem);
    assert!(failure.code.is_calibration_failure());
}

#[test]
fn test_failed_tenor_keeps_earlier_fits() {
    let market = flat_market(&[0.25, 0.5]);
    let mut first_only = local_vol_config();
    first_only.target_tenor = Some(0.25);
    let first = Calibrator::new(&market, &first_only)
        .calibrate(None, &mut NoopSink)
        .unwrap();
    assert!(first.is_complete());

    // Tenor 0 restarts on its own fit and converges on the first
    // evaluation; tenor 1 has no iterations to spend.
    let mut starved = local_vol_config();
    starved.max_iterations = 0;
    let mut events = Vec::new();
    let report = Calibrator::new(&market, &starved)
        .calibrate(Some(&first.curves), &mut events)
        .unwrap();

    assert_eq!(report.fits.len(), 1);
    assert_eq!(report.fits[0].coefficients, first.fits[0].coefficients);
    assert_eq!(
        report.curves.tenor(0).unwrap(),
        first.fits[0].coefficients
    );
    let failure = report.failure.as_ref().unwrap();
    assert_eq!(failure.tenor_index, 1);
    assert_eq!(failure.code, ErrorCode::IterationLimit);
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::TenorFailed { tenor_index: 1, .. })
    ));

    let json = serde_json::to_string(&report).unwrap();
    let restored: CalibrationReport = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.failure, report.failure);
    assert_eq!(restored.fits.len(), 1);
    assert_relative_eq!(
        restored.fits[0].coefficients.a0,
        report.fits[0].coefficients.a0,
        max_relative = 1e-12
    );
}
