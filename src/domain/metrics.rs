//! Performance metrics over an equity curve.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::error::SmacrossError;
use crate::domain::series::EquityCurve;

pub const DEFAULT_PERIODS_PER_YEAR: usize = 252;

/// Sample standard deviations below this are treated as zero.
const ZERO_VARIANCE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsConfig {
    pub risk_free_rate: f64,
    pub periods_per_year: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }
}

impl MetricsConfig {
    /// Rejects parameters that would otherwise surface as undefined ratios.
    pub fn validate(&self) -> Result<(), SmacrossError> {
        if self.periods_per_year == 0 {
            return Err(SmacrossError::InvalidParameter {
                name: "periods_per_year".into(),
                reason: "must be at least 1".into(),
            });
        }
        if !self.risk_free_rate.is_finite() {
            return Err(SmacrossError::InvalidParameter {
                name: "risk_free_rate".into(),
                reason: format!("must be finite, got {}", self.risk_free_rate),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawdownPoint {
    pub date: NaiveDate,
    pub drawdown: f64,
}

/// `None` ratios are numerically undefined (zero variance or too few returns).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub periods: usize,
    pub final_equity: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    #[serde(skip)]
    pub drawdown: Vec<DrawdownPoint>,
}

impl Metrics {
    pub fn compute(curve: &EquityCurve, config: &MetricsConfig) -> Result<Self, SmacrossError> {
        config.validate()?;
        let (first, last) = match (curve.first(), curve.last()) {
            (Some(first), Some(last)) => (first.equity, last.equity),
            _ => {
                return Err(SmacrossError::InsufficientData {
                    needed: 1,
                    available: 0,
                })
            }
        };

        let total_return = if first > 0.0 { last / first - 1.0 } else { 0.0 };

        let returns: Vec<f64> = to_simple_returns(curve).iter().map(|r| r.value).collect();
        let periods = curve.len() - 1;
        let years = periods as f64 / config.periods_per_year as f64;
        let annualized_return = if years > 0.0 && total_return.is_finite() {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let drawdown = drawdown_series(curve);
        let max_drawdown = drawdown.iter().map(|p| p.drawdown).fold(0.0, f64::min);

        Ok(Metrics {
            periods,
            final_equity: last,
            total_return,
            annualized_return,
            sharpe_ratio: sharpe_ratio(&returns, config.risk_free_rate, config.periods_per_year),
            sortino_ratio: sortino_ratio(&returns, config.risk_free_rate, config.periods_per_year),
            max_drawdown,
            max_drawdown_duration: max_drawdown_duration(&drawdown),
            drawdown,
        })
    }
}

/// Period-over-period returns with the first (undefined) entry dropped.
/// A return after a total loss is undefined and dropped as well, so the
/// result is shorter than `curve.len() - 1` whenever equity touches zero.
pub fn to_simple_returns(curve: &EquityCurve) -> Vec<ReturnPoint> {
    curve
        .points
        .windows(2)
        .filter(|w| w[0].equity > 0.0)
        .map(|w| ReturnPoint {
            date: w[1].date,
            value: w[1].equity / w[0].equity - 1.0,
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Annualized Sharpe ratio over excess returns, sample (N-1) standard deviation.
pub fn sharpe_ratio(returns: &[f64], annual_risk_free_rate: f64, periods_per_year: usize) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }

    let rf_per_period = annual_risk_free_rate / periods_per_year as f64;
    let excess: Vec<f64> = returns.iter().map(|r| r - rf_per_period).collect();
    let mean_excess = mean(&excess);

    let variance = excess
        .iter()
        .map(|r| (r - mean_excess).powi(2))
        .sum::<f64>()
        / (excess.len() - 1) as f64;
    let stddev = variance.sqrt();

    if !stddev.is_finite() || stddev < ZERO_VARIANCE_TOLERANCE {
        return None;
    }
    Some(mean_excess / stddev * (periods_per_year as f64).sqrt())
}

/// Like Sharpe but divides by the downside deviation of returns below the
/// per-period risk-free rate (N denominator).
pub fn sortino_ratio(returns: &[f64], annual_risk_free_rate: f64, periods_per_year: usize) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }

    let rf_per_period = annual_risk_free_rate / periods_per_year as f64;
    let mean_excess = mean(returns) - rf_per_period;

    let downside: f64 = returns
        .iter()
        .filter(|&&r| r < rf_per_period)
        .map(|&r| (r - rf_per_period).powi(2))
        .sum();
    let downside_stddev = (downside / returns.len() as f64).sqrt();

    if downside_stddev < ZERO_VARIANCE_TOLERANCE {
        return None;
    }
    Some(mean_excess / downside_stddev * (periods_per_year as f64).sqrt())
}

/// drawdown[i] = equity[i] / max(equity[0..=i]) - 1
pub fn drawdown_series(curve: &EquityCurve) -> Vec<DrawdownPoint> {
    let mut peak = f64::NEG_INFINITY;
    curve
        .points
        .iter()
        .map(|p| {
            peak = peak.max(p.equity);
            let drawdown = if peak > 0.0 { p.equity / peak - 1.0 } else { 0.0 };
            DrawdownPoint {
                date: p.date,
                drawdown,
            }
        })
        .collect()
}

/// Worst peak-to-trough decline, e.g. -0.25 for a 25% drawdown.
pub fn max_drawdown(curve: &EquityCurve) -> Result<f64, SmacrossError> {
    if curve.is_empty() {
        return Err(SmacrossError::InsufficientData {
            needed: 1,
            available: 0,
        });
    }
    Ok(drawdown_series(curve)
        .iter()
        .map(|p| p.drawdown)
        .fold(0.0, f64::min))
}

/// Longest run of consecutive periods spent below a prior peak.
pub fn max_drawdown_duration(drawdown: &[DrawdownPoint]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for point in drawdown {
        if point.drawdown < 0.0 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}
