// src/pricing/implied.rs
//
// Implied volatility inversion and the Greeks derived from it.
// A quote that admits no implied volatility yields `None`, never a zero.

use super::black_scholes::BlackScholes;
use crate::models::QuoteRow;

/// Flat volatility the root-finder starts from.
pub const VOLATILITY_SEED: f64 = 0.5;

const MAX_ITERATIONS: u32 = 100;
const PRICE_TOLERANCE: f64 = 1e-10;
const STEP_TOLERANCE: f64 = 1e-14;
const MIN_VOLATILITY: f64 = 1e-6;
const MAX_VOLATILITY: f64 = 10.0;

/// Solves for σ such that the BSM call price equals `observed`.
///
/// Newton-Raphson seeded at [`VOLATILITY_SEED`], falling back to bisection
/// whenever a Newton step would leave the bracket that still contains the root.
///
/// Returns `None` when inputs are degenerate, the price violates the
/// no-arbitrage bounds, or the iteration does not converge.
pub fn implied_volatility(observed: f64, spot: f64, strike: f64, time: f64, rate: f64) -> Option<f64> {
    if !observed.is_finite() || !(spot > 0.0 && strike > 0.0 && time > 0.0) {
        return None;
    }

    let model = |vol: f64| BlackScholes::new(spot, strike, time, rate, vol);

    let (lower, upper) = model(VOLATILITY_SEED).call_bounds();
    if observed <= lower || observed >= upper {
        return None;
    }

    let mut lo = MIN_VOLATILITY;
    let mut hi = MAX_VOLATILITY;
    // No root inside the searchable volatility range
    if model(lo).call_price() > observed || model(hi).call_price() < observed {
        return None;
    }

    let mut vol = VOLATILITY_SEED;

    for _ in 0..MAX_ITERATIONS {
        let bs = model(vol);
        let diff = bs.call_price() - observed;

        if diff.abs() < PRICE_TOLERANCE {
            return Some(vol);
        }

        // The call price is increasing in σ
        if diff > 0.0 {
            hi = vol;
        } else {
            lo = vol;
        }

        let vega = bs.vega();
        let newton = vol - diff / vega;
        let next = if vega > 1e-12 && newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };

        if (next - vol).abs() < STEP_TOLERANCE {
            return Some(next);
        }
        vol = next;
    }

    None
}

/// Implied volatility and the sensitivities derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Greeks {
    pub sigma: f64,
    pub d1: f64,
    pub d2: f64,
    pub delta: f64,
    pub vega: f64,
}

impl Greeks {
    pub fn from_model(model: &BlackScholes) -> Self {
        Self {
            sigma: model.volatility,
            d1: model.d1(),
            d2: model.d2(),
            delta: model.delta(),
            vega: model.vega(),
        }
    }
}

/// Prices an observed call: inverts for σ and derives d1, d2, delta and vega.
///
/// # Examples
/// ```
/// use hedge_eval::pricing::{implied_greeks, BlackScholes};
///
/// let observed = BlackScholes::new(100.0, 100.0, 0.25, 0.01, 0.3).call_price();
/// let greeks = implied_greeks(100.0, 100.0, 0.01, 0.25, observed).unwrap();
/// assert!((greeks.sigma - 0.3).abs() < 1e-8);
/// ```
pub fn implied_greeks(spot: f64, strike: f64, rate: f64, time: f64, observed: f64) -> Option<Greeks> {
    let sigma = implied_volatility(observed, spot, strike, time, rate)?;
    Some(Greeks::from_model(&BlackScholes::new(spot, strike, time, rate, sigma)))
}

/// A call of the portfolio priced against one day's quotes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedCall {
    pub strike: u32,
    /// Observed price, `None` when the strike was not quoted that day
    pub observed: Option<f64>,
    /// Greeks, `None` when no implied volatility exists
    pub greeks: Option<Greeks>,
}

impl PricedCall {
    pub fn from_row(row: &QuoteRow, strike: u32) -> Self {
        let observed = row.call_price(strike);
        let greeks = observed.and_then(|price| {
            implied_greeks(row.spot, strike as f64, row.rate, row.time_to_maturity, price)
        });
        Self {
            strike,
            observed,
            greeks,
        }
    }

    pub fn delta(&self) -> Option<f64> {
        self.greeks.map(|g| g.delta)
    }

    pub fn vega(&self) -> Option<f64> {
        self.greeks.map(|g| g.vega)
    }
}
