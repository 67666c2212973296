// src/strategy/delta_vega.rs
//
// Delta-vega hedging: the call portfolio is hedged with the underlying and a
// single representative call taken from the next (later-expiring) series.

use super::carry_prices;
use super::selection::select_atm_strikes;
use crate::models::{HedgeError, HedgeParams, HedgeType, OptionSeries, QuoteRow};
use crate::pricing::PricedCall;
use crate::traits::HedgingStrategy;
use log::{debug, warn};
use std::collections::BTreeMap;

/// Guard added to the representative vega when rebalancing.
pub const VEGA_EPSILON: f64 = f64::EPSILON;

/// Units of underlying (`alpha`) and of the representative call (`eta`)
/// that make the portfolio delta- and vega-neutral.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HedgeRatios {
    pub alpha: f64,
    pub eta: f64,
}

impl HedgeRatios {
    /// Solves the vega-neutral system
    ///
    /// ```text
    /// eta   = -Σν / (ν_rep + guard)
    /// alpha = -Σδ + Σν / (ν_rep + guard) · δ_rep
    /// ```
    ///
    /// Returns `None` if any Greek is unavailable or `alpha + eta` is NaN.
    pub fn solve(portfolio: &[PricedCall], rep: &PricedCall, vega_guard: f64) -> Option<Self> {
        let mut delta = 0.0;
        let mut vega = 0.0;
        for call in portfolio {
            let greeks = call.greeks?;
            delta += greeks.delta;
            vega += greeks.vega;
        }
        let rep = rep.greeks?;

        let ratio = vega / (rep.vega + vega_guard);
        let ratios = Self {
            alpha: -delta + ratio * rep.delta,
            eta: -ratio,
        };
        if (ratios.alpha + ratios.eta).is_nan() {
            None
        } else {
            Some(ratios)
        }
    }
}

/// Position carried from one day to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaVegaState {
    /// Market value of the call portfolio
    pub portfolio: f64,
    /// Value of the underlying leg (alpha × S)
    pub underlying: f64,
    /// Value of the representative-call leg (eta × C_rep)
    pub rep_option: f64,
    pub alpha: f64,
    pub eta: f64,
    /// Ratios implied by today's Greeks, applied only on a rebalance day
    pub target: Option<HedgeRatios>,
    /// Latest observed price of each portfolio strike
    pub last_prices: BTreeMap<u32, f64>,
    /// Latest observed price of the representative call
    pub rep_price: f64,
}

impl DeltaVegaState {
    pub fn total(&self) -> f64 {
        self.portfolio + self.underlying + self.rep_option
    }
}

/// Delta-vega hedge of the at-the-money calls of a primary series, using the
/// at-the-money call of a hedge series as the vega instrument.
pub struct DeltaVegaHedge<'a> {
    /// Primary rows from the alignment date onwards
    primary: &'a [QuoteRow],
    hedge: &'a [QuoteRow],
    strikes: Vec<u32>,
    rep_strike: u32,
    cost_basis: f64,
    steps: usize,
}

impl<'a> DeltaVegaHedge<'a> {
    /// Aligns `primary` on the first date of `hedge` and selects both portfolios.
    ///
    /// Fails with [`HedgeError::NoAlignmentDate`] if `primary` has no row dated
    /// like the first row of `hedge`.
    pub fn new(
        primary: &'a OptionSeries,
        hedge: &'a OptionSeries,
        params: &HedgeParams,
    ) -> Result<Self, HedgeError> {
        let hedge_day0 = hedge.rows.first().ok_or_else(|| HedgeError::InsufficientData {
            sheet: hedge.name.clone(),
            rows: 0,
        })?;
        let start = primary
            .position_of(hedge_day0.date)
            .ok_or_else(|| HedgeError::NoAlignmentDate {
                primary: primary.name.clone(),
                hedge: hedge.name.clone(),
                date: hedge_day0.date,
            })?;

        let aligned = &primary.rows[start..];
        // Both series stop before their last row
        let steps = aligned.len().min(hedge.len()).saturating_sub(2);
        if steps == 0 {
            let (sheet, rows) = if aligned.len() <= hedge.len() {
                (primary.name.clone(), aligned.len())
            } else {
                (hedge.name.clone(), hedge.len())
            };
            return Err(HedgeError::InsufficientData { sheet, rows });
        }

        let day0 = &aligned[0];
        let strikes = select_atm_strikes(day0, params.portfolio_size);
        if strikes.is_empty() {
            return Err(HedgeError::NoQuotedStrikes {
                sheet: primary.name.clone(),
                date: day0.date,
            });
        }
        let rep_strike = select_atm_strikes(hedge_day0, 1)
            .first()
            .copied()
            .ok_or_else(|| HedgeError::NoQuotedStrikes {
                sheet: hedge.name.clone(),
                date: hedge_day0.date,
            })?;

        if aligned.len() != hedge.len() {
            debug!(
                "{} and {} differ in length after alignment ({} vs {} rows); simulating {} days",
                primary.name,
                hedge.name,
                aligned.len(),
                hedge.len(),
                steps
            );
        }

        Ok(Self {
            primary: aligned,
            hedge: &hedge.rows,
            strikes,
            rep_strike,
            cost_basis: params.cost_basis,
            steps,
        })
    }

    pub fn rep_strike(&self) -> u32 {
        self.rep_strike
    }

    fn price(&self, row: &QuoteRow, hedge_row: &QuoteRow) -> (Vec<PricedCall>, PricedCall) {
        let calls = self
            .strikes
            .iter()
            .map(|&strike| PricedCall::from_row(row, strike))
            .collect();
        (calls, PricedCall::from_row(hedge_row, self.rep_strike))
    }
}

impl HedgingStrategy for DeltaVegaHedge<'_> {
    type State = DeltaVegaState;

    fn hedge_type(&self) -> HedgeType {
        HedgeType::DeltaVega
    }

    fn strikes(&self) -> &[u32] {
        &self.strikes
    }

    fn open(&self) -> (DeltaVegaState, f64) {
        let day0 = &self.primary[0];
        let hedge_day0 = &self.hedge[0];
        let (calls, rep) = self.price(day0, hedge_day0);

        let ratios = HedgeRatios::solve(&calls, &rep, 0.0).unwrap_or_else(|| {
            warn!(
                "Greeks unavailable on {}; no hedge is established on day 0",
                day0.date
            );
            HedgeRatios::default()
        });

        let last_prices = carry_prices(&calls, &BTreeMap::new());
        // The representative strike was selected among quoted strikes
        let rep_price = rep.observed.unwrap_or_default();

        let state = DeltaVegaState {
            portfolio: last_prices.values().sum(),
            underlying: ratios.alpha * day0.spot,
            rep_option: ratios.eta * rep_price,
            alpha: ratios.alpha,
            eta: ratios.eta,
            target: Some(ratios),
            last_prices,
            rep_price,
        };
        let cost = (self.cost_basis * ratios.alpha * day0.spot).abs()
            + (self.cost_basis * ratios.eta * rep_price).abs();
        (state, cost)
    }

    fn steps(&self) -> usize {
        self.steps
    }

    /// Both series are re-indexed from 0 after day 0.
    fn day_index(&self, step: usize) -> usize {
        step
    }

    fn mark(&self, prev: &DeltaVegaState, step: usize) -> DeltaVegaState {
        let row = &self.primary[step + 1];
        let hedge_row = &self.hedge[step + 1];
        let (calls, rep) = self.price(row, hedge_row);

        let last_prices = carry_prices(&calls, &prev.last_prices);
        let rep_price = rep.observed.unwrap_or(prev.rep_price);

        DeltaVegaState {
            portfolio: last_prices.values().sum(),
            underlying: prev.alpha * row.spot,
            rep_option: prev.eta * rep_price,
            alpha: prev.alpha,
            eta: prev.eta,
            target: HedgeRatios::solve(&calls, &rep, VEGA_EPSILON),
            last_prices,
            rep_price,
        }
    }

    fn tracking_error(&self, prev: &DeltaVegaState, current: &DeltaVegaState) -> f64 {
        (current.total() - prev.total()).powi(2)
    }

    fn rehedge(&self, prev: &DeltaVegaState, current: &mut DeltaVegaState, step: usize) -> f64 {
        let row = &self.primary[step + 1];

        match current.target {
            Some(ratios) => {
                current.alpha = ratios.alpha;
                current.eta = ratios.eta;
            }
            None => warn!("Greeks unavailable on {}; keeping previous ratios", row.date),
        }
        current.underlying = current.alpha * row.spot;
        current.rep_option = current.eta * current.rep_price;

        (self.cost_basis * (prev.alpha - current.alpha) * row.spot
            + self.cost_basis * (prev.eta - current.eta) * current.rep_price)
            .abs()
    }
}
