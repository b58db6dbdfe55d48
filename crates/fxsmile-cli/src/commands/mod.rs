//! CLI command implementations.

pub mod calibrate;
pub mod greeks;
pub mod price;
pub mod smile;

pub use calibrate::CalibrateArgs;
pub use greeks::GreeksArgs;
pub use price::PriceArgs;
pub use smile::SmileArgs;

use fxsmile_engine::payoff::{
    classify, BarrierDirection, BarrierWindow, Knock, OptionKind, Payout, PayoffStyle, Touch,
};
use fxsmile_engine::{EngineResult, TradeEconomics};

use crate::output::print_warning;

/// Short human-readable description of a trade.
pub fn describe(trade: &TradeEconomics) -> EngineResult<String> {
    let (style, window) = classify(trade)?;
    let kind = |k: OptionKind| match k {
        OptionKind::Call => "call",
        OptionKind::Put => "put",
    };
    let knock = |k: Knock| match k {
        Knock::In => "in",
        Knock::Out => "out",
    };
    let side = |d: BarrierDirection| match d {
        BarrierDirection::Up => "up",
        BarrierDirection::Down => "down",
    };
    let touch = |t: Touch| match t {
        Touch::OneTouch => "one-touch",
        Touch::NoTouch => "no-touch",
    };
    let payout = |p: Payout| match p {
        Payout::Cash => "cash",
        Payout::Asset => "asset",
    };

    let mut text = match style {
        PayoffStyle::Vanilla { kind: k } => kind(k).to_string(),
        PayoffStyle::Barrier {
            direction,
            knock: n,
            kind: k,
        } => format!("{}-and-{} {}", side(direction), knock(n), kind(k)),
        PayoffStyle::DoubleBarrier { knock: n, kind: k } => {
            format!("double knock-{} {}", knock(n), kind(k))
        }
        PayoffStyle::Touch {
            direction,
            touch: t,
            payout: p,
        } => format!("{} {} ({})", side(direction), touch(t), payout(p)),
        PayoffStyle::Rebate { touch: t, payout: p } => {
            format!("double {} ({})", touch(t), payout(p))
        }
        PayoffStyle::DigitalAtExpiry { payout: p, kind: k } => {
            format!("digital {} ({})", kind(k), payout(p))
        }
        PayoffStyle::Forward => "forward".to_string(),
        PayoffStyle::Spot => "spot".to_string(),
    };
    match window {
        BarrierWindow::Continuous => {}
        BarrierWindow::EarlyFinish { change } => text.push_str(&format!(", ends {change:.3}y")),
        BarrierWindow::LateStart { change } => text.push_str(&format!(", starts {change:.3}y")),
    }
    Ok(text)
}

/// Warns that prices use flat coefficients.
pub fn warn_uncalibrated(calibrated: bool) {
    if !calibrated {
        print_warning("market file has no coefficients; using a flat local volatility");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxsmile_engine::payoff::{BarrierTerms, Settlement};

    #[test]
    fn test_describe_barrier_with_window() {
        let trade = TradeEconomics::vanilla(OptionKind::Put, 0.75, 1.0).with_barrier(BarrierTerms {
            knock: Knock::Out,
            lower: Some(0.7),
            upper: None,
            window: BarrierWindow::EarlyFinish { change: 0.25 },
        });
        assert_eq!(describe(&trade).unwrap(), "down-and-out put, ends 0.250y");
    }

    #[test]
    fn test_describe_double_touch() {
        let trade = TradeEconomics {
            option: None,
            settlement: Settlement::Cash(Payout::Cash),
            strike: 0.0,
            expiry: 0.5,
            barrier: Some(BarrierTerms {
                knock: Knock::Out,
                lower: Some(0.7),
                upper: Some(0.8),
                window: BarrierWindow::Continuous,
            }),
        };
        assert_eq!(describe(&trade).unwrap(), "double no-touch (cash)");
    }
}
