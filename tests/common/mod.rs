#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use smacross::domain::error::SmacrossError;
use smacross::domain::series::{PricePoint, PriceSeries, SeriesPoint};
use smacross::ports::data_port::DataPort;
use smacross::ports::report_port::{ReportPort, RunReport};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct MockDataPort {
    pub prices: HashMap<String, Vec<PricePoint>>,
    pub equity: HashMap<PathBuf, Vec<SeriesPoint>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            equity: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, asset: &str, closes: &[f64]) -> Self {
        self.prices
            .insert(asset.to_string(), make_prices(closes).points().to_vec());
        self
    }

    pub fn with_equity(mut self, path: &str, points: Vec<SeriesPoint>) -> Self {
        self.equity.insert(PathBuf::from(path), points);
        self
    }

    pub fn with_error(mut self, asset: &str, reason: &str) -> Self {
        self.errors.insert(asset.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(&self, asset: &str) -> Result<PriceSeries, SmacrossError> {
        if let Some(reason) = self.errors.get(asset) {
            return Err(SmacrossError::Data {
                reason: reason.clone(),
            });
        }
        match self.prices.get(asset) {
            Some(points) => PriceSeries::new(points.clone()),
            None => Err(SmacrossError::Data {
                reason: format!("no prices for {}", asset),
            }),
        }
    }

    fn fetch_equity(
        &self,
        path: &Path,
        _timestamp_column: &str,
        _equity_column: &str,
    ) -> Result<Vec<SeriesPoint>, SmacrossError> {
        self.equity
            .get(path)
            .cloned()
            .ok_or_else(|| SmacrossError::Data {
                reason: format!("no equity at {}", path.display()),
            })
    }
}

/// Records run names instead of writing to disk.
pub struct MockReportPort {
    pub runs: RefCell<Vec<String>>,
}

impl MockReportPort {
    pub fn new() -> Self {
        Self {
            runs: RefCell::new(Vec::new()),
        }
    }
}

impl ReportPort for MockReportPort {
    fn write_run(&self, report: &RunReport<'_>) -> Result<PathBuf, SmacrossError> {
        self.runs.borrow_mut().push(report.run_name.to_string());
        Ok(PathBuf::from("runs").join(report.run_name))
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Daily closes starting 2024-01-01.
pub fn make_prices(closes: &[f64]) -> PriceSeries {
    let start = date(2024, 1, 1);
    PriceSeries::new(
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start + Duration::days(i as i64),
                close,
            })
            .collect(),
    )
    .unwrap()
}

pub fn daily_equity(values: &[Option<f64>]) -> Vec<SeriesPoint> {
    let start = date(2024, 1, 1);
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| SeriesPoint::new(start + Duration::days(i as i64), v))
        .collect()
}
