//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seeded with the first close, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! No warmup: every point is defined.

use crate::domain::error::SmacrossError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::series::PriceSeries;

pub fn calculate_ema(prices: &PriceSeries, span: usize) -> Result<IndicatorSeries, SmacrossError> {
    if span == 0 {
        return Err(SmacrossError::InvalidParameter {
            name: "span".into(),
            reason: "span must be at least 1".into(),
        });
    }
    if prices.is_empty() {
        return Err(SmacrossError::InsufficientData {
            needed: 1,
            available: 0,
        });
    }

    let k = 2.0 / (span as f64 + 1.0);
    let mut values = Vec::with_capacity(prices.len());
    let mut ema: Option<f64> = None;

    for point in prices.points() {
        let next = match ema {
            None => point.close,
            Some(prev) => point.close * k + prev * (1.0 - k),
        };
        ema = Some(next);
        values.push(IndicatorPoint {
            date: point.date,
            value: ema,
        });
    }

    Ok(IndicatorSeries {
        indicator_type: IndicatorType::Ema(span),
        values,
    })
}
