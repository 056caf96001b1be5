//! Date-indexed series shared by the engine and the evaluator.
//!
//! - `PriceSeries`: validated closing prices, strictly increasing dates
//! - `SeriesPoint`: one entry of a derived series, `None` where undefined
//! - `EquityCurve`: a fully defined growth-factor curve

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::error::SmacrossError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Closing prices for one asset, one observation per sampling period.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Dates must be strictly increasing and closes finite and positive.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, SmacrossError> {
        for (index, pair) in points.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(SmacrossError::UnsortedIndex {
                    index: index + 1,
                    previous: pair[0].date,
                    current: pair[1].date,
                });
            }
        }
        if let Some(bad) = points
            .iter()
            .find(|p| !p.close.is_finite() || p.close <= 0.0)
        {
            return Err(SmacrossError::InvalidPrice {
                date: bad.date,
                close: bad.close,
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> impl ExactSizeIterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.close)
    }
}

/// One entry of a derived series (returns, untrimmed equity).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Cumulative growth factor with every entry defined.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EquityCurve {
    pub points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn new(points: Vec<EquityPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&EquityPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&EquityPoint> {
        self.points.last()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.equity)
    }
}

/// Fails with `Alignment` unless both date sequences match position by position.
pub(crate) fn ensure_aligned<A, B>(
    left: A,
    right: B,
    left_name: &str,
    right_name: &str,
) -> Result<(), SmacrossError>
where
    A: ExactSizeIterator<Item = NaiveDate>,
    B: ExactSizeIterator<Item = NaiveDate>,
{
    if left.len() != right.len() {
        return Err(SmacrossError::Alignment {
            reason: format!(
                "{} has {} entries, {} has {}",
                left_name,
                left.len(),
                right_name,
                right.len()
            ),
        });
    }
    for (index, (l, r)) in left.zip(right).enumerate() {
        if l != r {
            return Err(SmacrossError::Alignment {
                reason: format!(
                    "{} is at {} but {} is at {} (index {})",
                    left_name, l, right_name, r, index
                ),
            });
        }
    }
    Ok(())
}
