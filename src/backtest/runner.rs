// src/backtest/runner.rs
//
// Entry points of a single hedging evaluation and the batch runner that
// sweeps a grid of them over a shared dataset.

use crate::models::{HedgeError, HedgeParams, HedgeType, HedgingStats};
use crate::simulation::simulate;
use crate::strategy::{DeltaHedge, DeltaVegaHedge};
use crate::traits::{HedgingStrategy, OptionsDataSource};
use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Delta hedges the at-the-money calls of `sheet` (first sheet if `None`).
pub fn delta_hedge<D>(
    data: &D,
    sheet: Option<&str>,
    params: &HedgeParams,
) -> Result<HedgingStats, HedgeError>
where
    D: OptionsDataSource + ?Sized,
{
    params.validate()?;
    let sheet = data.resolve_sheet(sheet)?;
    let series = data.series(&sheet)?;

    let strategy = DeltaHedge::new(series, params)?;
    info!(
        "Delta hedging {} with call(s) at strike(s) {}",
        sheet,
        format_strikes(strategy.strikes())
    );
    Ok(evaluate(&strategy, sheet, params))
}

/// Delta-vega hedges the at-the-money calls of `sheet`, using the
/// at-the-money call of the next sheet as the representative option.
pub fn delta_vega_hedge<D>(
    data: &D,
    sheet: Option<&str>,
    params: &HedgeParams,
) -> Result<HedgingStats, HedgeError>
where
    D: OptionsDataSource + ?Sized,
{
    params.validate()?;
    let sheet = data.resolve_sheet(sheet)?;
    let primary = data.series(&sheet)?;
    let hedge_sheet = data.next_sheet_name(&sheet)?;
    let hedge = data.series(&hedge_sheet)?;

    let strategy = DeltaVegaHedge::new(primary, hedge, params)?;
    info!(
        "Delta-vega hedging {} with call(s) at strike(s) {} and the ${} call of {}",
        sheet,
        format_strikes(strategy.strikes()),
        strategy.rep_strike(),
        hedge_sheet
    );
    Ok(evaluate(&strategy, sheet, params))
}

/// Dispatches on `hedge_type`.
pub fn run_hedge<D>(
    data: &D,
    hedge_type: HedgeType,
    sheet: Option<&str>,
    params: &HedgeParams,
) -> Result<HedgingStats, HedgeError>
where
    D: OptionsDataSource + ?Sized,
{
    match hedge_type {
        HedgeType::Delta => delta_hedge(data, sheet, params),
        HedgeType::DeltaVega => delta_vega_hedge(data, sheet, params),
    }
}

fn format_strikes(strikes: &[u32]) -> String {
    strikes
        .iter()
        .map(|s| format!("${}", s))
        .collect::<Vec<_>>()
        .join(", ")
}

fn evaluate<H: HedgingStrategy>(strategy: &H, sheet: String, params: &HedgeParams) -> HedgingStats {
    let ledger = simulate(strategy, params);
    HedgingStats {
        sheet,
        hedge_type: strategy.hedge_type(),
        portfolio_size: params.portfolio_size,
        schedule: params.schedule,
        cost_basis: params.cost_basis,
        strikes: strategy.strikes().to_vec(),
        mse: ledger.mse(),
        total_cost: ledger.total_cost(),
        rehedges: ledger.rehedge_days().len(),
    }
}

// =============================================================================
// Batch Evaluation
// =============================================================================

/// One point of the evaluation grid.
#[derive(Debug, Clone, PartialEq)]
pub struct HedgeJob {
    pub hedge_type: HedgeType,
    pub sheet: String,
    pub params: HedgeParams,
}

impl fmt::Display for HedgeJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hedge of {} (portfolio {}, schedule {})",
            self.hedge_type, self.sheet, self.params.portfolio_size, self.params.schedule
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub hedge_types: Vec<HedgeType>,
    /// Sheets to evaluate; empty means every sheet of the dataset
    pub sheets: Vec<String>,
    pub portfolio_sizes: Vec<usize>,
    pub schedules: Vec<usize>,
    pub cost_basis: f64,
    /// Worker threads; `None` uses the available parallelism
    pub workers: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        let params = HedgeParams::default();
        Self {
            hedge_types: vec![HedgeType::Delta, HedgeType::DeltaVega],
            sheets: Vec::new(),
            portfolio_sizes: vec![params.portfolio_size],
            schedules: vec![params.schedule],
            cost_basis: params.cost_basis,
            workers: None,
        }
    }
}

impl BatchConfig {
    /// Cartesian product of hedge type, sheet, portfolio size and schedule.
    /// Grid values are de-duplicated; sheets keep their dataset order.
    pub fn jobs<D: OptionsDataSource + ?Sized>(&self, data: &D) -> Vec<HedgeJob> {
        let mut hedge_types = self.hedge_types.clone();
        hedge_types.sort();
        hedge_types.dedup();
        let mut sizes = self.portfolio_sizes.clone();
        sizes.sort_unstable();
        sizes.dedup();
        let mut schedules = self.schedules.clone();
        schedules.sort_unstable();
        schedules.dedup();

        let mut sheets: Vec<String> = Vec::new();
        let requested = if self.sheets.is_empty() {
            data.sheet_names()
        } else {
            self.sheets.clone()
        };
        for sheet in requested {
            if !sheets.contains(&sheet) {
                sheets.push(sheet);
            }
        }

        let mut jobs = Vec::with_capacity(hedge_types.len() * sheets.len() * sizes.len() * schedules.len());
        for &hedge_type in &hedge_types {
            for sheet in &sheets {
                for &portfolio_size in &sizes {
                    for &schedule in &schedules {
                        jobs.push(HedgeJob {
                            hedge_type,
                            sheet: sheet.clone(),
                            params: HedgeParams {
                                portfolio_size,
                                schedule,
                                cost_basis: self.cost_basis,
                            },
                        });
                    }
                }
            }
        }
        jobs
    }
}

/// Results of a batch, in job order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<HedgingStats>,
    pub failures: Vec<(HedgeJob, HedgeError)>,
}

impl BatchReport {
    pub fn total_jobs(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    /// True when at least one job ran and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.results.is_empty() && !self.failures.is_empty()
    }

    /// Writes the successful results as CSV, one `StatsRecord` per row.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {:?}", path))?;
        for stats in &self.results {
            writer
                .serialize(stats.to_record())
                .context("Failed to write results row")?;
        }
        writer.flush().context("Failed to flush results CSV")?;
        info!("Wrote {} results to {:?}", self.results.len(), path);
        Ok(())
    }
}

pub struct BatchRunner {
    config: BatchConfig,
}

impl BatchRunner {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    /// Evaluates every job of the grid on a dedicated thread pool.
    pub fn run<D: OptionsDataSource + ?Sized>(&self, data: &D) -> Result<BatchReport> {
        let jobs = self.config.jobs(data);
        let workers = self
            .config
            .workers
            .filter(|&n| n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));

        info!("Running {} hedging jobs on {} workers", jobs.len(), workers);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .context("Failed to build rayon pool")?;

        let outcomes: Vec<(HedgeJob, Result<HedgingStats, HedgeError>)> = pool.install(|| {
            jobs.into_par_iter()
                .map(|job| {
                    let outcome = run_hedge(data, job.hedge_type, Some(&job.sheet), &job.params);
                    (job, outcome)
                })
                .collect()
        });

        let mut report = BatchReport::default();
        for (job, outcome) in outcomes {
            match outcome {
                Ok(stats) => report.results.push(stats),
                Err(e) => {
                    warn!("{} failed: {}", job, e);
                    report.failures.push((job, e));
                }
            }
        }

        info!(
            "Batch finished: {} succeeded, {} failed",
            report.results.len(),
            report.failures.len()
        );
        Ok(report)
    }
}
