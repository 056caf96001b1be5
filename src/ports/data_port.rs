//! Data access port trait.

use crate::domain::error::SmacrossError;
use crate::domain::series::{PriceSeries, SeriesPoint};
use std::path::Path;

pub trait DataPort {
    /// Closing prices for `asset`, sorted by date.
    fn fetch_prices(&self, asset: &str) -> Result<PriceSeries, SmacrossError>;

    /// A raw equity series; empty cells come back as `None`.
    fn fetch_equity(
        &self,
        path: &Path,
        timestamp_column: &str,
        equity_column: &str,
    ) -> Result<Vec<SeriesPoint>, SmacrossError>;
}
