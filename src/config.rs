// src/config.rs
//
// Configuration file parsing for batch hedging evaluations.
// Supports TOML config files that specify the dataset and the evaluation grid.

use crate::backtest::BatchConfig;
use crate::connectors::DEFAULT_DATA_DIR;
use crate::models::{HedgeParams, HedgeType};
use serde::Deserialize;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

pub use crate::models::{PORTFOLIO_SIZES, SCHEDULES};

// =============================================================================
// Configuration Types
// =============================================================================

/// Root configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,
    /// Evaluation grid
    #[serde(default)]
    pub run: RunConfig,
}

/// Global configuration settings.
#[derive(Debug, Default, Deserialize)]
pub struct GlobalConfig {
    /// Directory of per-sheet CSV files
    pub data_dir: Option<String>,
    /// Log level
    pub log_level: Option<String>,
    /// Worker threads (None = available parallelism)
    pub workers: Option<usize>,
}

/// Configuration for the evaluation grid.
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    /// Hedging strategies to evaluate ("delta", "delta-vega")
    #[serde(default = "default_hedge_types")]
    pub hedge_types: Vec<String>,
    #[serde(default = "default_portfolio_sizes")]
    pub portfolio_sizes: Vec<usize>,
    #[serde(default = "default_schedules")]
    pub schedules: Vec<usize>,
    /// Transaction cost as a fraction of traded notional
    #[serde(default = "default_cost_basis")]
    pub cost_basis: f64,
    /// Sheets to evaluate (empty = all sheets)
    #[serde(default)]
    pub sheets: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            hedge_types: default_hedge_types(),
            portfolio_sizes: default_portfolio_sizes(),
            schedules: default_schedules(),
            cost_basis: default_cost_basis(),
            sheets: Vec::new(),
        }
    }
}

fn default_hedge_types() -> Vec<String> {
    vec!["delta".to_string(), "delta-vega".to_string()]
}

fn default_portfolio_sizes() -> Vec<usize> {
    vec![HedgeParams::default().portfolio_size]
}

fn default_schedules() -> Vec<usize> {
    vec![HedgeParams::default().schedule]
}

fn default_cost_basis() -> f64 {
    HedgeParams::default().cost_basis
}

// =============================================================================
// Configuration Loading
// =============================================================================

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(s: &str) -> Result<Self, String> {
        toml::from_str(s).map_err(|e| format!("Failed to parse config: {}", e))
    }

    pub fn data_dir(&self) -> &str {
        self.global.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR)
    }

    pub fn log_level(&self) -> &str {
        self.global.log_level.as_deref().unwrap_or("info")
    }

    /// Builds the batch grid, checking every value against the accepted ranges.
    pub fn batch_config(&self) -> Result<BatchConfig, String> {
        let run = &self.run;

        let hedge_types = parse_hedge_types(&run.hedge_types);
        if hedge_types.is_empty() {
            return Err("No valid hedge type configured".to_string());
        }
        check_range("portfolio size", &run.portfolio_sizes, &PORTFOLIO_SIZES)?;
        check_range("schedule", &run.schedules, &SCHEDULES)?;
        if !run.cost_basis.is_finite() || run.cost_basis < 0.0 {
            return Err(format!("Invalid cost basis: {}", run.cost_basis));
        }

        Ok(BatchConfig {
            hedge_types,
            sheets: run.sheets.clone(),
            portfolio_sizes: run.portfolio_sizes.clone(),
            schedules: run.schedules.clone(),
            cost_basis: run.cost_basis,
            workers: self.global.workers,
        })
    }
}

fn parse_hedge_types(names: &[String]) -> Vec<HedgeType> {
    names
        .iter()
        .filter_map(|s| match s.parse::<HedgeType>() {
            Ok(hedge_type) => Some(hedge_type),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        })
        .collect()
}

fn check_range(what: &str, values: &[usize], range: &RangeInclusive<usize>) -> Result<(), String> {
    if values.is_empty() {
        return Err(format!("No {} configured", what));
    }
    match values.iter().find(|v| !range.contains(*v)) {
        Some(v) => Err(format!(
            "Invalid {} {}: expected {}..={}",
            what,
            v,
            range.start(),
            range.end()
        )),
        None => Ok(()),
    }
}

// =============================================================================
// Default Configuration
// =============================================================================

/// Returns a default configuration string for documentation.
pub fn default_config_template() -> &'static str {
    r#"# Hedge Evaluation Configuration
#
# Every combination of hedge type, sheet, portfolio size and schedule
# below is simulated once. Command line flags override these values.

[global]
# Directory holding one CSV file per sheet (option expiry)
data_dir = "data/isx2010C"

# Log level (overridden by RUST_LOG)
log_level = "info"

# Worker threads (defaults to the available parallelism)
# workers = 4

[run]
# "delta" and/or "delta-vega"
hedge_types = ["delta", "delta-vega"]

# Number of at-the-money calls held (1 to 5)
portfolio_sizes = [1, 2]

# Rebalance every N trading days (1 to 10)
schedules = [2, 10]

# Transaction cost as a fraction of traded notional
cost_basis = 0.01

# Sheets to evaluate (empty = all sheets)
sheets = []
"#
}

// =============================================================================
// Tests
// =============================================================================
