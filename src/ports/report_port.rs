//! Report generation port trait.

use crate::domain::backtest::{BacktestConfig, BacktestResult};
use crate::domain::error::SmacrossError;
use crate::domain::metrics::Metrics;
use std::path::PathBuf;

/// Everything a presentation layer needs to render or store one run.
#[derive(Debug, Clone, Copy)]
pub struct RunReport<'a> {
    pub run_name: &'a str,
    pub asset: &'a str,
    pub config: &'a BacktestConfig,
    pub result: &'a BacktestResult,
    pub metrics: &'a Metrics,
}

/// Port for persisting backtest runs.
pub trait ReportPort {
    /// Returns the location the run was written to.
    fn write_run(&self, report: &RunReport<'_>) -> Result<PathBuf, SmacrossError>;
}
