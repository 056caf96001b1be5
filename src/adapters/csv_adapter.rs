//! CSV file data adapter.

use crate::domain::error::SmacrossError;
use crate::domain::series::{PricePoint, PriceSeries, SeriesPoint};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_FILE_PATTERN: &str = "{asset}_usdt_1d.csv";
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "timestamp";
pub const DEFAULT_CLOSE_COLUMN: &str = "close";

pub struct CsvAdapter {
    base_path: PathBuf,
    file_pattern: String,
    timestamp_column: String,
    close_column: String,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
            close_column: DEFAULT_CLOSE_COLUMN.to_string(),
        }
    }

    /// `pattern` must contain `{asset}`.
    pub fn with_file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = pattern.into();
        self
    }

    pub fn with_columns(mut self, timestamp: impl Into<String>, close: impl Into<String>) -> Self {
        self.timestamp_column = timestamp.into();
        self.close_column = close.into();
        self
    }

    pub fn price_path(&self, asset: &str) -> PathBuf {
        self.base_path
            .join(self.file_pattern.replace("{asset}", asset))
    }
}

/// Accepts `%Y-%m-%d`, `%Y-%m-%d %H:%M:%S`, `%Y-%m-%dT%H:%M:%S` and RFC 3339;
/// only the date part is kept.
pub fn parse_timestamp(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

fn read_table(path: &Path) -> Result<csv::Reader<fs::File>, SmacrossError> {
    let file = fs::File::open(path).map_err(|e| SmacrossError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;
    Ok(csv::Reader::from_reader(file))
}

fn column_index(
    rdr: &mut csv::Reader<fs::File>,
    name: &str,
    path: &Path,
) -> Result<usize, SmacrossError> {
    let headers = rdr.headers().map_err(|e| SmacrossError::Data {
        reason: format!("CSV header error in {}: {}", path.display(), e),
    })?;
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| SmacrossError::Data {
            reason: format!("missing {} column in {}", name, path.display()),
        })
}

/// Reads `(date, raw cell)` pairs from two named columns, sorted by date.
fn read_columns(
    path: &Path,
    timestamp_column: &str,
    value_column: &str,
) -> Result<Vec<(NaiveDate, String)>, SmacrossError> {
    let mut rdr = read_table(path)?;
    let ts_idx = column_index(&mut rdr, timestamp_column, path)?;
    let value_idx = column_index(&mut rdr, value_column, path)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| SmacrossError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;

        let ts = record.get(ts_idx).unwrap_or_default();
        let date = parse_timestamp(ts).ok_or_else(|| SmacrossError::Data {
            reason: format!("invalid timestamp '{}'", ts),
        })?;
        let value = record.get(value_idx).unwrap_or_default().trim().to_string();
        rows.push((date, value));
    }

    rows.sort_by_key(|(date, _)| *date);
    Ok(rows)
}

impl DataPort for CsvAdapter {
    fn fetch_prices(&self, asset: &str) -> Result<PriceSeries, SmacrossError> {
        let path = self.price_path(asset);
        let rows = read_columns(&path, &self.timestamp_column, &self.close_column)?;

        let points = rows
            .into_iter()
            .map(|(date, cell)| -> Result<PricePoint, SmacrossError> {
                let close: f64 = cell.parse().map_err(|e| SmacrossError::Data {
                    reason: format!("invalid close value '{}' on {}: {}", cell, date, e),
                })?;
                Ok(PricePoint { date, close })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(asset, path = %path.display(), bars = points.len(), "loaded prices");
        PriceSeries::new(points)
    }

    fn fetch_equity(
        &self,
        path: &Path,
        timestamp_column: &str,
        equity_column: &str,
    ) -> Result<Vec<SeriesPoint>, SmacrossError> {
        let rows = read_columns(path, timestamp_column, equity_column)?;

        rows.into_iter()
            .map(|(date, cell)| -> Result<SeriesPoint, SmacrossError> {
                if cell.is_empty() {
                    return Ok(SeriesPoint::new(date, None));
                }
                let value: f64 = cell.parse().map_err(|e| SmacrossError::Data {
                    reason: format!("invalid equity value '{}' on {}: {}", cell, date, e),
                })?;
                Ok(SeriesPoint::new(date, Some(value)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let btc = "timestamp,open,high,low,close,volume\n\
            2024-01-02,101.0,111.0,91.0,106.0,50000\n\
            2024-01-01,100.0,110.0,90.0,105.0,40000\n\
            2024-01-03,105.0,115.0,100.0,110.0,60000\n";
        fs::write(path.join("btc_usdt_1d.csv"), btc).unwrap();

        let equity = "timestamp,portfolio_value\n\
            2024-01-01 00:00:00,1.0\n\
            2024-01-02 00:00:00,\n\
            2024-01-03 00:00:00,1.2\n";
        fs::write(path.join("equity.csv"), equity).unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_prices_sorts_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let prices = adapter.fetch_prices("btc").unwrap();
        assert_eq!(prices.len(), 3);
        assert_eq!(prices.points()[0].date, date(1));
        assert_eq!(prices.points()[0].close, 105.0);
        assert_eq!(prices.points()[2].close, 110.0);
    }

    #[test]
    fn fetch_prices_missing_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.fetch_prices("eth"),
            Err(SmacrossError::Data { .. })
        ));
    }

    #[test]
    fn fetch_prices_missing_column() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path).with_columns("timestamp", "adj_close");
        let err = adapter.fetch_prices("btc").unwrap_err();
        assert!(err.to_string().contains("missing adj_close column"));
    }

    #[test]
    fn fetch_prices_with_custom_pattern() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("ETH.csv"),
            "date,price\n2024-01-01,10.0\n2024-01-02,11.0\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path)
            .with_file_pattern("{asset}.csv")
            .with_columns("date", "price");

        let prices = adapter.fetch_prices("ETH").unwrap();
        assert_eq!(prices.closes().collect::<Vec<_>>(), vec![10.0, 11.0]);
    }

    #[test]
    fn fetch_prices_rejects_bad_close() {
        let (_dir, path) = setup_test_data();
        fs::write(path.join("bad_usdt_1d.csv"), "timestamp,close\n2024-01-01,abc\n").unwrap();
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.fetch_prices("bad"),
            Err(SmacrossError::Data { .. })
        ));
    }

    #[test]
    fn fetch_equity_keeps_missing_cells() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path.clone());

        let equity = adapter
            .fetch_equity(&path.join("equity.csv"), "timestamp", "portfolio_value")
            .unwrap();
        assert_eq!(
            equity,
            vec![
                SeriesPoint::new(date(1), Some(1.0)),
                SeriesPoint::new(date(2), None),
                SeriesPoint::new(date(3), Some(1.2)),
            ]
        );
    }

    #[test]
    fn parse_timestamp_formats() {
        assert_eq!(parse_timestamp("2024-01-05"), Some(date(5)));
        assert_eq!(parse_timestamp("2024-01-05 13:00:00"), Some(date(5)));
        assert_eq!(parse_timestamp("2024-01-05T13:00:00"), Some(date(5)));
        assert_eq!(parse_timestamp("2024-01-05T00:00:00+00:00"), Some(date(5)));
        assert_eq!(parse_timestamp("05/01/2024"), None);
    }
}
