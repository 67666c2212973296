// src/models.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Trading days per year used to annualize time to maturity.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

// =============================================================================
// Market Data
// =============================================================================

/// One trading day's snapshot of an option chain (one sheet row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRow {
    pub date: NaiveDate,
    /// Time to maturity in trading days (`T`)
    pub days_to_maturity: u32,
    /// Time to maturity as a year fraction (`T_norm = T / 252`)
    pub time_to_maturity: f64,
    /// Price of the underlying (`S`)
    pub spot: f64,
    /// Risk-free rate as a decimal (`r`)
    pub rate: f64,
    /// Observed call prices keyed by integer strike. Illiquid strikes are absent.
    pub calls: BTreeMap<u32, f64>,
}

impl QuoteRow {
    /// Creates a row without quotes. `rate` is a decimal (0.05 = 5%).
    pub fn new(date: NaiveDate, days_to_maturity: u32, spot: f64, rate: f64) -> Self {
        Self {
            date,
            days_to_maturity,
            time_to_maturity: days_to_maturity as f64 / TRADING_DAYS_PER_YEAR,
            spot,
            rate,
            calls: BTreeMap::new(),
        }
    }

    /// Adds an observed call price. NaN prices are treated as missing quotes.
    pub fn with_call(mut self, strike: u32, price: f64) -> Self {
        self.insert_call(strike, price);
        self
    }

    pub fn insert_call(&mut self, strike: u32, price: f64) {
        if price.is_nan() {
            self.calls.remove(&strike);
        } else {
            self.calls.insert(strike, price);
        }
    }

    /// Observed call price for a strike, if the strike was quoted that day.
    pub fn call_price(&self, strike: u32) -> Option<f64> {
        self.calls.get(&strike).copied()
    }

    /// Strikes quoted on this day, ascending.
    pub fn quoted_strikes(&self) -> impl Iterator<Item = u32> + '_ {
        self.calls.keys().copied()
    }
}

/// A date-ordered series of quote rows for one sheet (one expiry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSeries {
    pub name: String,
    pub rows: Vec<QuoteRow>,
}

impl OptionSeries {
    pub fn new(name: impl Into<String>, rows: Vec<QuoteRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    /// Index of the row quoted on `date`.
    pub fn position_of(&self, date: NaiveDate) -> Option<usize> {
        self.rows.iter().position(|r| r.date == date)
    }
}

// =============================================================================
// Hedging Parameters
// =============================================================================

/// Hedging strategy under evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HedgeType {
    Delta,
    DeltaVega,
}

impl HedgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HedgeType::Delta => "delta",
            HedgeType::DeltaVega => "delta-vega",
        }
    }
}

impl fmt::Display for HedgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HedgeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "delta" => Ok(HedgeType::Delta),
            "delta-vega" => Ok(HedgeType::DeltaVega),
            _ => Err(format!("Unknown hedge type: {} (expected delta or delta-vega)", s)),
        }
    }
}

/// Portfolio sizes a run accepts.
pub const PORTFOLIO_SIZES: RangeInclusive<usize> = 1..=5;
/// Rebalance schedules (in trading days) a run accepts.
pub const SCHEDULES: RangeInclusive<usize> = 1..=10;

/// Parameters of a single simulation run.
///
/// # Examples
/// ```
/// use hedge_eval::models::HedgeParams;
///
/// let params = HedgeParams::new()
///     .with_portfolio_size(3)
///     .with_schedule(5)
///     .with_cost_basis(0.005);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgeParams {
    /// Number of at-the-money calls held
    pub portfolio_size: usize,
    /// Rebalance every `schedule` trading days
    pub schedule: usize,
    /// Transaction cost as a fraction of traded notional
    pub cost_basis: f64,
}

impl Default for HedgeParams {
    fn default() -> Self {
        Self {
            portfolio_size: 2,
            schedule: 2,
            cost_basis: 0.01,
        }
    }
}

impl HedgeParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_portfolio_size(mut self, portfolio_size: usize) -> Self {
        self.portfolio_size = portfolio_size;
        self
    }

    pub fn with_schedule(mut self, schedule: usize) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_cost_basis(mut self, cost_basis: f64) -> Self {
        self.cost_basis = cost_basis;
        self
    }

    /// Checks the sizes against [`PORTFOLIO_SIZES`] and [`SCHEDULES`] and the
    /// cost basis for a finite, non-negative fraction.
    pub fn validate(&self) -> Result<(), HedgeError> {
        if !PORTFOLIO_SIZES.contains(&self.portfolio_size) {
            return Err(HedgeError::InvalidParams(format!(
                "portfolio size must be between {} and {}, got {}",
                PORTFOLIO_SIZES.start(),
                PORTFOLIO_SIZES.end(),
                self.portfolio_size
            )));
        }
        if !SCHEDULES.contains(&self.schedule) {
            return Err(HedgeError::InvalidParams(format!(
                "schedule must be between {} and {} days, got {}",
                SCHEDULES.start(),
                SCHEDULES.end(),
                self.schedule
            )));
        }
        if !self.cost_basis.is_finite() || self.cost_basis < 0.0 {
            return Err(HedgeError::InvalidParams(format!(
                "cost basis must be a non-negative fraction, got {}",
                self.cost_basis
            )));
        }
        Ok(())
    }

    /// True if day `t` of the simulation is a rebalance day.
    pub fn is_rehedge_day(&self, t: usize) -> bool {
        t % self.schedule == 0
    }
}

// =============================================================================
// Results
// =============================================================================

/// Summary of one hedging simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgingStats {
    pub sheet: String,
    pub hedge_type: HedgeType,
    pub portfolio_size: usize,
    pub schedule: usize,
    pub cost_basis: f64,
    /// Portfolio strikes, closest to the money first
    pub strikes: Vec<u32>,
    pub mse: f64,
    pub total_cost: f64,
    /// Rebalance days after the day-0 hedge, including days where
    /// unavailable Greeks left the ratios unchanged
    pub rehedges: usize,
}

impl HedgingStats {
    /// Flattens the stats into a CSV-friendly record.
    pub fn to_record(&self) -> StatsRecord {
        StatsRecord {
            sheet: self.sheet.clone(),
            hedge_type: self.hedge_type.as_str().to_string(),
            portfolio_size: self.portfolio_size,
            schedule: self.schedule,
            cost_basis: self.cost_basis,
            strikes: self
                .strikes
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(" "),
            mse: self.mse,
            total_cost: self.total_cost,
            rehedges: self.rehedges,
        }
    }
}

impl fmt::Display for HedgingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strikes = self
            .strikes
            .iter()
            .map(|s| format!("${}", s))
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "[HedgingStats]: Using data from sheet {:?}, performing {} hedging on a portfolio of {} option(s) \
             (strikes of {}) with a schedule of {} days, and assuming a cost basis of {:.2}%, yielded a \
             mean-squared error of {:.2}. The total hedging costs were ${:.2}.",
            self.sheet,
            self.hedge_type,
            self.portfolio_size,
            strikes,
            self.schedule,
            self.cost_basis * 100.0,
            self.mse,
            self.total_cost
        )
    }
}

/// One row of the results CSV export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsRecord {
    pub sheet: String,
    pub hedge_type: String,
    pub portfolio_size: usize,
    pub schedule: usize,
    pub cost_basis: f64,
    pub strikes: String,
    pub mse: f64,
    pub total_cost: f64,
    pub rehedges: usize,
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum HedgeError {
    #[error("Invalid hedging parameters: {0}")]
    InvalidParams(String),
    #[error("Unknown sheet: {0}")]
    UnknownSheet(String),
    #[error("Data source contains no sheets")]
    NoSheets,
    #[error("Sheet {sheet} has {rows} rows; at least 3 are needed to simulate a day")]
    InsufficientData { sheet: String, rows: usize },
    #[error("No quoted strikes on {date} in sheet {sheet}")]
    NoQuotedStrikes { sheet: String, date: NaiveDate },
    #[error("Sheet {primary} has no row dated {date}, the first day of hedge sheet {hedge}")]
    NoAlignmentDate {
        primary: String,
        hedge: String,
        date: NaiveDate,
    },
}
