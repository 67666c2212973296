// src/traits.rs

use crate::models::{HedgeError, HedgeType, OptionSeries};
use log::warn;

/// Read-only access to a loaded option-chain dataset.
/// Implementations must be shareable across worker threads once loaded.
pub trait OptionsDataSource: Send + Sync {
    /// Sheet identifiers in a stable order.
    fn sheet_names(&self) -> Vec<String>;

    /// The quote series of one sheet.
    fn series(&self, sheet: &str) -> Result<&OptionSeries, HedgeError>;

    /// The sheet that follows `sheet` chronologically.
    /// Used to source the representative option of a delta-vega hedge.
    fn next_sheet_name(&self, sheet: &str) -> Result<String, HedgeError>;

    /// Resolves an optional sheet name, falling back to the first sheet.
    fn resolve_sheet(&self, sheet: Option<&str>) -> Result<String, HedgeError> {
        match sheet {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => {
                let first = self
                    .sheet_names()
                    .into_iter()
                    .next()
                    .ok_or(HedgeError::NoSheets)?;
                warn!("Sheet name not specified; proceeding with {:?}", first);
                Ok(first)
            }
        }
    }
}

/// A hedging strategy driven day by day by [`crate::simulation::simulate`].
///
/// The simulation loop owns the schedule and the bookkeeping; a strategy only
/// knows how to open its position, value it on a given day and rebalance it.
pub trait HedgingStrategy {
    /// Position carried from one day to the next.
    type State;

    fn hedge_type(&self) -> HedgeType;

    /// Portfolio strikes, fixed for the whole window.
    fn strikes(&self) -> &[u32];

    /// Establishes the day-0 hedge. Returns the position and its establishment cost.
    fn open(&self) -> (Self::State, f64);

    /// Number of simulated days after day 0.
    fn steps(&self) -> usize;

    /// Day index `t` of a step, as tested against the rebalance schedule.
    fn day_index(&self, step: usize) -> usize;

    /// Values the position on `step`, keeping yesterday's hedge ratios.
    fn mark(&self, prev: &Self::State, step: usize) -> Self::State;

    /// Squared P&L mismatch between two consecutive days.
    fn tracking_error(&self, prev: &Self::State, current: &Self::State) -> f64;

    /// Rebalances `current` to today's Greeks. Returns the transaction cost.
    fn rehedge(&self, prev: &Self::State, current: &mut Self::State, step: usize) -> f64;
}
