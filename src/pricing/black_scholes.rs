// src/pricing/black_scholes.rs
//
// Black-Scholes-Merton model for European calls:
// - Standard normal CDF/PDF
// - Call price, d1/d2
// - Delta and vega

use std::f64::consts::PI;

/// Guard added to the d1 denominator so a vanishing `σ√T` cannot divide by zero.
pub const D1_EPSILON: f64 = f64::EPSILON;

/// Standard normal CDF using Hart's algorithm.
/// Absolute error below 7.5e-8.
pub fn norm_cdf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }

    // Handle extreme values
    if x < -38.0 {
        return 0.0;
    }
    if x > 38.0 {
        return 1.0;
    }

    // Use symmetry: Φ(-x) = 1 - Φ(x)
    let (result, neg) = if x < 0.0 { (-x, true) } else { (x, false) };

    // Coefficients for the rational approximation
    const A: [f64; 5] = [
        0.319381530,
        -0.356563782,
        1.781477937,
        -1.821255978,
        1.330274429,
    ];
    const P: f64 = 0.2316419;

    let t = 1.0 / (1.0 + P * result);
    let poly = t * (A[0] + t * (A[1] + t * (A[2] + t * (A[3] + t * A[4]))));
    let cdf = 1.0 - norm_pdf(result) * poly;

    if neg {
        1.0 - cdf
    } else {
        cdf
    }
}

/// Standard normal PDF.
pub fn norm_pdf(x: f64) -> f64 {
    (-x * x / 2.0).exp() / (2.0 * PI).sqrt()
}

/// Black-Scholes-Merton model of a European call.
#[derive(Debug, Clone)]
pub struct BlackScholes {
    /// Spot price of the underlying
    pub spot: f64,
    /// Strike price
    pub strike: f64,
    /// Time to expiration in years
    pub time_to_expiry: f64,
    /// Risk-free interest rate (annualized, decimal)
    pub rate: f64,
    /// Volatility (annualized)
    pub volatility: f64,
}

impl BlackScholes {
    pub fn new(spot: f64, strike: f64, time_to_expiry: f64, rate: f64, volatility: f64) -> Self {
        Self {
            spot,
            strike,
            time_to_expiry,
            rate,
            volatility,
        }
    }

    /// d1 = (ln(S/K) + (r + σ²/2)T) / (σ√T + ε)
    pub fn d1(&self) -> f64 {
        let vol_sqrt_t = self.volatility * self.time_to_expiry.sqrt();
        ((self.spot / self.strike).ln()
            + (self.rate + 0.5 * self.volatility.powi(2)) * self.time_to_expiry)
            / (vol_sqrt_t + D1_EPSILON)
    }

    pub fn d2(&self) -> f64 {
        self.d1() - self.volatility * self.time_to_expiry.sqrt()
    }

    /// Call price C = S·Φ(d1) - K·e^(-rT)·Φ(d2).
    pub fn call_price(&self) -> f64 {
        if self.time_to_expiry <= 0.0 {
            return (self.spot - self.strike).max(0.0);
        }

        let discount = (-self.rate * self.time_to_expiry).exp();
        self.spot * norm_cdf(self.d1()) - self.strike * discount * norm_cdf(self.d2())
    }

    /// Delta: ∂C/∂S = Φ(d1)
    pub fn delta(&self) -> f64 {
        norm_cdf(self.d1())
    }

    /// Vega: ∂C/∂σ = S·√T·φ(d1), per unit of volatility
    pub fn vega(&self) -> f64 {
        self.spot * self.time_to_expiry.sqrt() * norm_pdf(self.d1())
    }

    /// No-arbitrage bounds of a call price: (max(S - K·e^(-rT), 0), S).
    pub fn call_bounds(&self) -> (f64, f64) {
        let discount = (-self.rate * self.time_to_expiry).exp();
        ((self.spot - self.strike * discount).max(0.0), self.spot)
    }
}
