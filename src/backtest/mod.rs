// src/backtest/mod.rs

pub mod runner;

pub use runner::{
    delta_hedge, delta_vega_hedge, run_hedge, BatchConfig, BatchReport, BatchRunner, HedgeJob,
};
