//! Calibrate command implementation.
//!
//! Fits the coefficient curves tenor by tenor. A stochastic calibration
//! that stops on a tenor is retried once with mixing disabled; tenors fitted
//! before a final failure are still written out.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use fxsmile_config::EngineConfig;
use fxsmile_engine::calibration::{CalibrationReport, Calibrator, ProgressEvent, ProgressSink};
use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use crate::cli::OutputFormat;
use crate::input::MarketFile;
use crate::output::{
    format_value, print_error, print_header, print_info, print_json, print_output,
    print_success, print_warning,
};

/// Arguments for the calibrate command.
#[derive(Args, Debug)]
pub struct CalibrateArgs {
    /// Market file (JSON)
    #[arg(short, long)]
    pub market: PathBuf,

    /// Write the market file with calibrated coefficients here
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Calibrate only tenors up to this many years
    #[arg(long)]
    pub target_tenor: Option<f64>,

    /// Disable stochastic mixing (pure local volatility)
    #[arg(long)]
    pub local_vol: bool,

    /// Ignore coefficients in the market file and start from the default guess
    #[arg(long)]
    pub fresh: bool,
}

/// One calibrated tenor.
#[derive(Debug, Serialize, Tabled)]
pub struct FitRow {
    #[tabled(rename = "Tenor")]
    pub tenor: String,
    #[tabled(rename = "a0")]
    pub a0: String,
    #[tabled(rename = "a1")]
    pub a1: String,
    #[tabled(rename = "a2")]
    pub a2: String,
    #[tabled(rename = "a3")]
    pub a3: String,
    #[tabled(rename = "a4")]
    pub a4: String,
    #[tabled(rename = "Vol of vol")]
    pub vol_of_vol: String,
    #[tabled(rename = "Iterations")]
    pub iterations: u32,
    #[tabled(rename = "Max vol error (bp)")]
    pub max_error_bp: String,
}

/// Reports tenor outcomes on stderr as they happen.
struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn emit(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::TenorConverged {
                tenor_index,
                iterations,
            } => print_success(&format!(
                "tenor {tenor_index} converged after {iterations} evaluations"
            )),
            ProgressEvent::TenorFailed {
                tenor_index,
                message,
                ..
            } => print_error(&format!("tenor {tenor_index} failed: {message}")),
            ProgressEvent::TenorStarted { .. } | ProgressEvent::Iteration { .. } => {}
        }
    }
}

/// Execute the calibrate command.
pub fn execute(args: CalibrateArgs, config: &EngineConfig, format: OutputFormat) -> Result<()> {
    let file = MarketFile::load(&args.market)?;
    let market = file.market()?;
    let initial = if args.fresh {
        None
    } else {
        file.curves(&market)?
    };

    let mut calibration = config.calibration.clone();
    if args.target_tenor.is_some() {
        calibration.target_tenor = args.target_tenor;
    }
    if args.local_vol {
        calibration.stochastic = false;
    }

    let mut sink = ConsoleSink;
    let report = Calibrator::new(&market, &calibration).calibrate(initial.as_ref(), &mut sink)?;
    let report = match report.failure {
        Some(ref failure) if calibration.stochastic => {
            warn!(
                tenor_index = failure.tenor_index,
                code = ?failure.code,
                "stochastic calibration failed, retrying with mixing disabled"
            );
            print_warning("retrying without stochastic mixing");
            let local = calibration.clone().with_stochastic(false);
            Calibrator::new(&market, &local).calibrate(initial.as_ref(), &mut sink)?
        }
        _ => report,
    };

    report_fits(&report, &file, format)?;

    if let Some(path) = args.output {
        file.with_curves(&report.curves)?.save(&path)?;
        print_info(&format!("calibrated market written to {}", path.display()));
    }
    if let Some(failure) = report.failure {
        bail!(
            "calibration stopped at tenor {} ({}y): {}",
            failure.tenor_index,
            failure.tenor,
            failure.message
        );
    }
    Ok(())
}

fn report_fits(report: &CalibrationReport, file: &MarketFile, format: OutputFormat) -> Result<()> {
    if report.cancelled {
        print_warning(&format!(
            "calibration cancelled after {} tenors",
            report.fits.len()
        ));
    }

    match format {
        OutputFormat::Json => print_json(&report.fits),
        OutputFormat::Table => {
            let rows: Vec<FitRow> = report
                .fits
                .iter()
                .map(|fit| {
                    let targets = file.quotes[fit.tenor_index].pillar_vols();
                    let max_error = fit.fit_vols[..5]
                        .iter()
                        .zip(targets.iter())
                        .fold(0.0_f64, |m, (f, t)| m.max((f - t).abs()));
                    let c = fit.coefficients;
                    FitRow {
                        tenor: format_value(fit.tenor, 4),
                        a0: format_value(c.a0, 5),
                        a1: format_value(c.a1, 5),
                        a2: format_value(c.a2, 5),
                        a3: format_value(c.a3, 5),
                        a4: format_value(c.a4, 5),
                        vol_of_vol: format_value(c.vol_of_vol, 5),
                        iterations: fit.iterations,
                        max_error_bp: format_value(max_error * 10_000.0, 2),
                    }
                })
                .collect();
            print_header("Calibrated Coefficients");
            print_output(&rows, format)
        }
    }
}
