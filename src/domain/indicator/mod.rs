//! Moving-average indicators over a closing-price series.
//!
//! - `IndicatorPoint`: a single point, `None` during warmup
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: a time series aligned 1:1 with its price series

pub mod ema;
pub mod sma;

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::SmacrossError;
use crate::domain::series::PriceSeries;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
}

/// Which moving average a crossover strategy compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Sma,
    Ema,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dates(&self) -> impl ExactSizeIterator<Item = NaiveDate> + '_ {
        self.values.iter().map(|p| p.date)
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|p| p.value.is_some()).count()
    }
}

impl IndicatorKind {
    pub fn with_period(self, period: usize) -> IndicatorType {
        match self {
            IndicatorKind::Sma => IndicatorType::Sma(period),
            IndicatorKind::Ema => IndicatorType::Ema(period),
        }
    }
}

impl FromStr for IndicatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sma" => Ok(IndicatorKind::Sma),
            "ema" => Ok(IndicatorKind::Ema),
            other => Err(format!("unknown indicator '{}', expected sma or ema", other)),
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma => write!(f, "SMA"),
            IndicatorKind::Ema => write!(f, "EMA"),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
        }
    }
}

pub fn calculate(
    prices: &PriceSeries,
    indicator_type: IndicatorType,
) -> Result<IndicatorSeries, SmacrossError> {
    match indicator_type {
        IndicatorType::Sma(window) => sma::calculate_sma(prices, window),
        IndicatorType::Ema(span) => ema::calculate_ema(prices, span),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::PricePoint;

    fn make_prices(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PricePoint {
                    date: start + chrono::Duration::days(i as i64),
                    close,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
    }

    #[test]
    fn indicator_type_display_ema() {
        assert_eq!(IndicatorType::Ema(50).to_string(), "EMA(50)");
    }

    #[test]
    fn indicator_kind_parses_case_insensitively() {
        assert_eq!("SMA".parse::<IndicatorKind>(), Ok(IndicatorKind::Sma));
        assert_eq!(" ema ".parse::<IndicatorKind>(), Ok(IndicatorKind::Ema));
        assert!("wma".parse::<IndicatorKind>().is_err());
    }

    #[test]
    fn indicator_kind_with_period() {
        assert_eq!(IndicatorKind::Ema.with_period(12), IndicatorType::Ema(12));
    }

    #[test]
    fn calculate_dispatches_by_type() {
        let prices = make_prices(&[1.0, 2.0, 3.0]);
        let sma = calculate(&prices, IndicatorType::Sma(2)).unwrap();
        let ema = calculate(&prices, IndicatorType::Ema(2)).unwrap();

        assert_eq!(sma.indicator_type, IndicatorType::Sma(2));
        assert_eq!(sma.defined_count(), 2);
        assert_eq!(ema.indicator_type, IndicatorType::Ema(2));
        assert_eq!(ema.defined_count(), 3);
    }
}
