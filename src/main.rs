// src/main.rs
//
// Batch evaluation of delta and delta-vega hedging over historical option chains.
// Every combination of hedge type, sheet, portfolio size and schedule is simulated.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use hedge_eval::backtest::BatchRunner;
use hedge_eval::config::{default_config_template, Config, PORTFOLIO_SIZES, SCHEDULES};
use hedge_eval::connectors::OptionsData;
use hedge_eval::models::HedgeType;
use log::{error, info};

#[derive(Parser)]
#[command(name = "hedge-eval")]
#[command(about = "Evaluates delta and delta-vega hedging on historical option-chain data")]
struct Args {
    /// Number of at-the-money calls in the portfolio (1-5, repeatable)
    #[arg(long, short = 'p', value_parser = parse_portfolio_size)]
    portfolio_size: Vec<usize>,

    /// Rebalance every N trading days (1-10, repeatable)
    #[arg(long, short = 's', value_parser = parse_schedule)]
    schedule: Vec<usize>,

    /// Hedging strategy: delta or delta-vega (repeatable)
    #[arg(long, short = 't', value_parser = clap::value_parser!(HedgeType))]
    hedge_type: Vec<HedgeType>,

    /// Sheet to evaluate (repeatable, default: all sheets)
    #[arg(long)]
    sheet: Vec<String>,

    /// Directory of per-sheet CSV files
    #[arg(long)]
    data: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(long, short)]
    config: Option<String>,

    /// Transaction cost as a fraction of traded notional
    #[arg(long)]
    cost_basis: Option<f64>,

    /// Worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Write results to a CSV file
    #[arg(long)]
    output: Option<String>,

    /// Print results as JSON lines
    #[arg(long)]
    json: bool,

    /// Generate a default configuration file
    #[arg(long)]
    generate_config: bool,
}

fn parse_portfolio_size(s: &str) -> Result<usize, String> {
    parse_in_range(s, "portfolio size", PORTFOLIO_SIZES.start(), PORTFOLIO_SIZES.end())
}

fn parse_schedule(s: &str) -> Result<usize, String> {
    parse_in_range(s, "schedule", SCHEDULES.start(), SCHEDULES.end())
}

fn parse_in_range(s: &str, what: &str, min: &usize, max: &usize) -> Result<usize, String> {
    let value: usize = s.parse().map_err(|_| format!("{} must be an integer", what))?;
    if value < *min || value > *max {
        return Err(format!("{} must be between {} and {}", what, min, max));
    }
    Ok(value)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Handle config generation
    if args.generate_config {
        println!("{}", default_config_template());
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("Use --generate-config to create a template ({})", path))?,
        None => Config::default(),
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level()))
        .init();

    let mut batch = config.batch_config().map_err(|e| anyhow!(e))?;
    if !args.hedge_type.is_empty() {
        batch.hedge_types = args.hedge_type.clone();
    }
    if !args.portfolio_size.is_empty() {
        batch.portfolio_sizes = args.portfolio_size.clone();
    }
    if !args.schedule.is_empty() {
        batch.schedules = args.schedule.clone();
    }
    if !args.sheet.is_empty() {
        batch.sheets = args.sheet.clone();
    }
    if let Some(cost_basis) = args.cost_basis {
        if !cost_basis.is_finite() || cost_basis < 0.0 {
            bail!("Invalid cost basis: {}", cost_basis);
        }
        batch.cost_basis = cost_basis;
    }
    if args.workers.is_some() {
        batch.workers = args.workers;
    }

    let data_dir = args.data.as_deref().unwrap_or(config.data_dir());
    let data = OptionsData::open(data_dir)
        .with_context(|| format!("Failed to load option data from {:?}", data_dir))?;
    info!("Loaded {} sheets", data.len());

    let report = BatchRunner::new(batch).run(&data)?;

    for stats in &report.results {
        if args.json {
            println!("{}", serde_json::to_string(stats).context("Failed to serialize results")?);
        } else {
            println!("{}", stats);
        }
    }

    for (job, e) in &report.failures {
        error!("{}: {}", job, e);
    }

    if let Some(path) = &args.output {
        report.write_csv(path)?;
    }

    info!(
        "{} of {} jobs succeeded",
        report.results.len(),
        report.total_jobs()
    );

    if report.all_failed() {
        bail!("All {} hedging jobs failed", report.failures.len());
    }
    Ok(())
}
