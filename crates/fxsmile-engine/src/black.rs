//! Garman-Kohlhagen reference prices and implied volatility.
//!
//! Prices are in numeraire units per unit of asset notional, written in
//! terms of the forward `F` and the domestic discount factor `D`:
//! `call = D (F N(d1) - K N(d2))`.

use fxsmile_math::distributions::{normal_cdf, normal_pdf};
use fxsmile_math::solvers::{bisection, newton_raphson, SolverConfig};

use crate::error::{EngineError, EngineResult};
use crate::payoff::OptionKind;

const MIN_VOL: f64 = 1e-4;
const MAX_VOL: f64 = 5.0;

/// Inputs shared by Black prices at one expiry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackInputs {
    /// Forward to expiry.
    pub forward: f64,
    /// Years to expiry.
    pub expiry: f64,
    /// Domestic discount factor to expiry.
    pub discount: f64,
}

impl BlackInputs {
    /// Builds inputs from spot and continuously compounded zero rates.
    pub fn from_rates(spot: f64, expiry: f64, domestic_rate: f64, foreign_rate: f64) -> Self {
        Self {
            forward: spot * ((domestic_rate - foreign_rate) * expiry).exp(),
            expiry,
            discount: (-domestic_rate * expiry).exp(),
        }
    }

    /// `(d1, d2)` for `strike` and `vol`.
    pub fn d1_d2(&self, strike: f64, vol: f64) -> (f64, f64) {
        let s = vol * self.expiry.sqrt();
        let d1 = ((self.forward / strike).ln() + 0.5 * s * s) / s;
        (d1, d1 - s)
    }

    /// Option price.
    pub fn price(&self, kind: OptionKind, strike: f64, vol: f64) -> f64 {
        if self.expiry <= 0.0 || vol <= 0.0 {
            return self.discount * kind.intrinsic(self.forward, strike);
        }
        let w = kind.sign();
        let (d1, d2) = self.d1_d2(strike, vol);
        self.discount * w * (self.forward * normal_cdf(w * d1) - strike * normal_cdf(w * d2))
    }

    /// Sensitivity of the price to volatility.
    pub fn vega(&self, strike: f64, vol: f64) -> f64 {
        if self.expiry <= 0.0 || vol <= 0.0 {
            return 0.0;
        }
        let (d1, _) = self.d1_d2(strike, vol);
        self.discount * self.forward * normal_pdf(d1) * self.expiry.sqrt()
    }

    /// Volatility reproducing `price`.
    ///
    /// Newton on vega from `guess`, falling back to bisection on
    /// `[1e-4, 5]` when Newton stalls or leaves the bracket.
    ///
    /// # Errors
    ///
    /// [`EngineError::NumericDomain`] if the price lies outside the
    /// no-arbitrage range or no volatility in the bracket reproduces it.
    pub fn implied_vol(
        &self,
        kind: OptionKind,
        strike: f64,
        price: f64,
        guess: f64,
    ) -> EngineResult<f64> {
        let floor = self.discount * kind.intrinsic(self.forward, strike);
        let cap = match kind {
            OptionKind::Call => self.discount * self.forward,
            OptionKind::Put => self.discount * strike,
        };
        if !(price > floor && price < cap) || self.expiry <= 0.0 {
            return Err(EngineError::numeric_domain(format!(
                "price {price:.6e} outside ({floor:.6e}, {cap:.6e}) for strike {strike}"
            )));
        }

        let f = |v: f64| self.price(kind, strike, v) - price;
        let config = SolverConfig::new(1e-12, 50);
        let start = if guess > MIN_VOL && guess < MAX_VOL {
            guess
        } else {
            0.2
        };
        if let Ok(result) = newton_raphson(f, |v| self.vega(strike, v), start, &config) {
            if result.root > MIN_VOL && result.root < MAX_VOL {
                return Ok(result.root);
            }
        }

        let result = bisection(f, MIN_VOL, MAX_VOL, &SolverConfig::new(1e-10, 200))
            .map_err(|e| EngineError::numeric_domain(format!("implied vol: {e}")))?;
        Ok(result.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn inputs() -> BlackInputs {
        BlackInputs::from_rates(0.75, 1.0, 0.05, 0.03)
    }

    #[test]
    fn test_put_call_parity() {
        let b = inputs();
        let k = 0.78;
        let c = b.price(OptionKind::Call, k, 0.12);
        let p = b.price(OptionKind::Put, k, 0.12);
        assert_relative_eq!(c - p, b.discount * (b.forward - k), epsilon = 1e-12);
    }

    #[test]
    fn test_implied_vol_round_trip() {
        let b = inputs();
        for (kind, k, vol) in [
            (OptionKind::Call, 0.80, 0.11),
            (OptionKind::Put, 0.70, 0.145),
            (OptionKind::Call, 0.76, 0.30),
        ] {
            let price = b.price(kind, k, vol);
            let implied = b.implied_vol(kind, k, price, 0.2).unwrap();
            assert_relative_eq!(implied, vol, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_implied_vol_rejects_arbitrage() {
        let b = inputs();
        assert!(b.implied_vol(OptionKind::Call, 0.8, 0.0, 0.2).is_err());
        assert!(b.implied_vol(OptionKind::Call, 0.8, 1.0, 0.2).is_err());
    }

    #[test]
    fn test_zero_expiry_is_intrinsic() {
        let b = BlackInputs::from_rates(0.75, 0.0, 0.05, 0.03);
        assert_relative_eq!(b.price(OptionKind::Put, 0.8, 0.1), 0.05, epsilon = 1e-12);
    }
}
