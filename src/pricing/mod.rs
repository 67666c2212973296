// src/pricing/mod.rs
//
// Black-Scholes-Merton pricing of European calls and the implied-volatility
// inversion used to turn observed quotes into Greeks.

pub mod black_scholes;
pub mod implied;

pub use black_scholes::{norm_cdf, norm_pdf, BlackScholes};
pub use implied::{implied_greeks, implied_volatility, Greeks, PricedCall};
