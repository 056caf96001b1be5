//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! Warmup: first (n-1) points are undefined. Computed with a running sum.

use crate::domain::error::SmacrossError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::series::PriceSeries;

pub fn calculate_sma(prices: &PriceSeries, window: usize) -> Result<IndicatorSeries, SmacrossError> {
    if window == 0 {
        return Err(SmacrossError::InvalidParameter {
            name: "window".into(),
            reason: "window must be at least 1".into(),
        });
    }
    if prices.len() < window {
        return Err(SmacrossError::InsufficientData {
            needed: window,
            available: prices.len(),
        });
    }

    let points = prices.points();
    let mut values = Vec::with_capacity(points.len());
    let mut sum = 0.0;
    for (i, point) in points.iter().enumerate() {
        sum += point.close;
        if i >= window {
            sum -= points[i - window].close;
        }
        let value = (i + 1 >= window).then(|| sum / window as f64);
        values.push(IndicatorPoint {
            date: point.date,
            value,
        });
    }

    Ok(IndicatorSeries {
        indicator_type: IndicatorType::Sma(window),
        values,
    })
}
