//! Structural checks for equity curves loaded from outside the engine.
//!
//! Curves built by [`crate::domain::backtest`] are well-formed by construction;
//! anything read from disk goes through [`validate_equity_curve`] before metrics.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::SmacrossError;
use crate::domain::series::{EquityCurve, EquityPoint, SeriesPoint};

/// Frequency inference needs at least two gaps.
pub const MIN_POINTS_FOR_FREQUENCY: usize = 3;

/// Sampling frequency of a date index.
///
/// `Daily` is every calendar day (crypto markets). `BusinessDaily` is Monday
/// to Friday with weekend gaps (equity markets); holidays are not tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Frequency {
    #[serde(rename = "D")]
    Daily,
    #[serde(rename = "B")]
    BusinessDaily,
    #[serde(rename = "W")]
    Weekly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Frequency::Daily => "D",
            Frequency::BusinessDaily => "B",
            Frequency::Weekly => "W",
        };
        f.write_str(label)
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "d" | "daily" => Ok(Frequency::Daily),
            "b" | "business" | "business_daily" => Ok(Frequency::BusinessDaily),
            "w" | "weekly" => Ok(Frequency::Weekly),
            other => Err(format!("unknown frequency '{}', expected D, B or W", other)),
        }
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Returns `None` for irregular indexes or fewer than two dates.
pub fn infer_frequency(dates: &[NaiveDate]) -> Option<Frequency> {
    if dates.len() < 2 {
        return None;
    }

    let gaps: Vec<i64> = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .collect();

    if gaps.iter().all(|&g| g == 1) {
        return Some(Frequency::Daily);
    }
    if gaps.iter().all(|&g| g == 7) {
        return Some(Frequency::Weekly);
    }

    let business = !dates.iter().any(|&d| is_weekend(d))
        && dates.windows(2).all(|w| {
            let gap = (w[1] - w[0]).num_days();
            gap == 1 || (gap == 3 && w[0].weekday() == Weekday::Fri)
        });
    if business {
        return Some(Frequency::BusinessDaily);
    }

    None
}

/// Checks ordering, then sampling frequency, then missing or negative values.
pub fn validate_equity_curve(
    raw: &[SeriesPoint],
    expected: Frequency,
) -> Result<EquityCurve, SmacrossError> {
    for (index, pair) in raw.windows(2).enumerate() {
        if pair[1].date <= pair[0].date {
            return Err(SmacrossError::UnsortedIndex {
                index: index + 1,
                previous: pair[0].date,
                current: pair[1].date,
            });
        }
    }

    if raw.len() < MIN_POINTS_FOR_FREQUENCY {
        return Err(SmacrossError::InsufficientData {
            needed: MIN_POINTS_FOR_FREQUENCY,
            available: raw.len(),
        });
    }

    let dates: Vec<NaiveDate> = raw.iter().map(|p| p.date).collect();
    let inferred = infer_frequency(&dates);
    if inferred != Some(expected) {
        return Err(SmacrossError::FrequencyMismatch { expected, inferred });
    }

    raw.iter()
        .enumerate()
        .map(|(index, p)| match p.value {
            Some(equity) if equity.is_finite() && equity < 0.0 => Err(SmacrossError::InvalidEquity {
                index,
                date: p.date,
                equity,
            }),
            Some(equity) if equity.is_finite() => Ok(EquityPoint {
                date: p.date,
                equity,
            }),
            _ => Err(SmacrossError::MissingValue {
                index,
                date: p.date,
            }),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(EquityCurve::new)
}
