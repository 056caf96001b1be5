//! Crossover signal, lagged strategy returns, and equity curves.
//!
//! Every step is a pure function over aligned series. Undefined entries are
//! carried as `None` until the explicit [`trim_undefined`] step.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::domain::error::SmacrossError;
use crate::domain::indicator::{self, IndicatorKind, IndicatorSeries, IndicatorType};
use crate::domain::series::{ensure_aligned, EquityCurve, EquityPoint, PriceSeries, SeriesPoint};
use crate::domain::validation::Frequency;

pub const DEFAULT_STARTING_VALUE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub fast_window: usize,
    pub slow_window: usize,
    pub indicator: IndicatorKind,
    pub starting_value: f64,
    pub risk_free_rate: f64,
    pub periods_per_year: usize,
    pub frequency: Frequency,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            fast_window: 20,
            slow_window: 50,
            indicator: IndicatorKind::Sma,
            starting_value: DEFAULT_STARTING_VALUE,
            risk_free_rate: 0.05,
            periods_per_year: 252,
            frequency: Frequency::Daily,
        }
    }
}

impl BacktestConfig {
    pub fn fast_indicator(&self) -> IndicatorType {
        self.indicator.with_period(self.fast_window)
    }

    pub fn slow_indicator(&self) -> IndicatorType {
        self.indicator.with_period(self.slow_window)
    }
}

/// Long-only position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Flat,
    Long,
}

impl Signal {
    /// Fraction of capital exposed to the asset.
    pub fn exposure(self) -> f64 {
        match self {
            Signal::Flat => 0.0,
            Signal::Long => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalPoint {
    pub date: NaiveDate,
    pub signal: Option<Signal>,
}

/// One date of the untrimmed backtest table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestRow {
    pub date: NaiveDate,
    pub close: f64,
    pub fast: Option<f64>,
    pub slow: Option<f64>,
    pub signal: Option<Signal>,
    pub period_return: Option<f64>,
    pub strategy_return: Option<f64>,
    pub equity: Option<f64>,
    pub buy_and_hold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub fast: IndicatorType,
    pub slow: IndicatorType,
    /// Every date of the price series, with undefined markers.
    pub rows: Vec<BacktestRow>,
    /// Strategy equity with undefined rows trimmed.
    pub equity: EquityCurve,
    /// Buy-and-hold equity on the same dates as `equity`.
    pub buy_and_hold: EquityCurve,
    pub trimmed_rows: usize,
}

/// Long where fast > slow, flat otherwise (ties are flat).
pub fn derive_signal(
    fast: &IndicatorSeries,
    slow: &IndicatorSeries,
) -> Result<Vec<SignalPoint>, SmacrossError> {
    ensure_non_empty(fast.len())?;
    ensure_aligned(fast.dates(), slow.dates(), "fast indicator", "slow indicator")?;

    Ok(fast
        .values
        .iter()
        .zip(&slow.values)
        .map(|(f, s)| SignalPoint {
            date: f.date,
            signal: match (f.value, s.value) {
                (Some(f), Some(s)) if f > s => Some(Signal::Long),
                (Some(_), Some(_)) => Some(Signal::Flat),
                _ => None,
            },
        })
        .collect())
}

/// r[i] = p[i] / p[i-1] - 1, undefined at index 0.
pub fn period_return(prices: &PriceSeries) -> Result<Vec<SeriesPoint>, SmacrossError> {
    ensure_non_empty(prices.len())?;

    let points = prices.points();
    let mut returns = Vec::with_capacity(points.len());
    returns.push(SeriesPoint::new(points[0].date, None));
    returns.extend(
        points
            .windows(2)
            .map(|w| SeriesPoint::new(w[1].date, Some(w[1].close / w[0].close - 1.0))),
    );
    Ok(returns)
}

/// s[i] = exposure(signal[i-1]) * r[i]. The position is always taken from
/// the previous period, so s[i] never sees information after index i.
pub fn strategy_return(
    signal: &[SignalPoint],
    returns: &[SeriesPoint],
) -> Result<Vec<SeriesPoint>, SmacrossError> {
    ensure_non_empty(signal.len())?;
    ensure_aligned(
        signal.iter().map(|p| p.date),
        returns.iter().map(|p| p.date),
        "signal",
        "period returns",
    )?;

    let mut result = Vec::with_capacity(returns.len());
    result.push(SeriesPoint::new(returns[0].date, None));
    result.extend(signal.windows(2).zip(&returns[1..]).map(|(w, r)| {
        let value = match (w[0].signal, r.value) {
            (Some(prev), Some(ret)) => Some(prev.exposure() * ret),
            _ => None,
        };
        SeriesPoint::new(r.date, value)
    }));
    Ok(result)
}

/// Compounds `returns` from `starting_value`. Undefined returns stay
/// undefined in the output and leave the running product unchanged.
pub fn equity_curve(
    returns: &[SeriesPoint],
    starting_value: f64,
) -> Result<Vec<SeriesPoint>, SmacrossError> {
    ensure_non_empty(returns.len())?;
    if !starting_value.is_finite() || starting_value <= 0.0 {
        return Err(SmacrossError::InvalidParameter {
            name: "starting_value".into(),
            reason: format!("must be finite and positive, got {}", starting_value),
        });
    }

    let mut equity = starting_value;
    Ok(returns
        .iter()
        .map(|r| {
            let value = r.value.map(|ret| {
                equity *= 1.0 + ret;
                equity
            });
            SeriesPoint::new(r.date, value)
        })
        .collect())
}

/// Benchmark curve: the same recurrence over raw period returns.
pub fn buy_and_hold_curve(
    returns: &[SeriesPoint],
    starting_value: f64,
) -> Result<Vec<SeriesPoint>, SmacrossError> {
    equity_curve(returns, starting_value)
}

/// Drops undefined rows. This moves the apparent start of the curve to the
/// first defined entry.
pub fn trim_undefined(series: &[SeriesPoint]) -> EquityCurve {
    let points: Vec<EquityPoint> = series
        .iter()
        .filter_map(|p| p.value.map(|equity| EquityPoint { date: p.date, equity }))
        .collect();

    let dropped = series.len() - points.len();
    if dropped > 0 {
        debug!(
            dropped,
            start = ?points.first().map(|p| p.date),
            "trimmed undefined equity rows"
        );
    }
    EquityCurve::new(points)
}

pub fn run_backtest(
    prices: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, SmacrossError> {
    let fast_type = config.fast_indicator();
    let slow_type = config.slow_indicator();

    let fast = indicator::calculate(prices, fast_type)?;
    let slow = indicator::calculate(prices, slow_type)?;
    let signal = derive_signal(&fast, &slow)?;
    let returns = period_return(prices)?;
    let strategy = strategy_return(&signal, &returns)?;
    let equity = equity_curve(&strategy, config.starting_value)?;
    let hold = buy_and_hold_curve(&returns, config.starting_value)?;

    let rows: Vec<BacktestRow> = prices
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| BacktestRow {
            date: p.date,
            close: p.close,
            fast: fast.values[i].value,
            slow: slow.values[i].value,
            signal: signal[i].signal,
            period_return: returns[i].value,
            strategy_return: strategy[i].value,
            equity: equity[i].value,
            buy_and_hold: hold[i].value,
        })
        .collect();

    let equity_curve = trim_undefined(&equity);
    let hold_on_equity_dates: Vec<SeriesPoint> = rows
        .iter()
        .filter(|row| row.equity.is_some())
        .map(|row| SeriesPoint::new(row.date, row.buy_and_hold))
        .collect();
    let buy_and_hold = trim_undefined(&hold_on_equity_dates);
    let trimmed_rows = rows.len() - equity_curve.len();

    debug!(
        fast = %fast_type,
        slow = %slow_type,
        bars = rows.len(),
        trimmed_rows,
        "backtest computed"
    );

    Ok(BacktestResult {
        fast: fast_type,
        slow: slow_type,
        rows,
        equity: equity_curve,
        buy_and_hold,
        trimmed_rows,
    })
}

fn ensure_non_empty(len: usize) -> Result<(), SmacrossError> {
    if len == 0 {
        return Err(SmacrossError::InsufficientData {
            needed: 1,
            available: 0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorPoint;
    use crate::domain::series::PricePoint;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn make_prices(closes: &[f64]) -> PriceSeries {
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PricePoint {
                    date: date(i as u32 + 1),
                    close,
                })
                .collect(),
        )
        .unwrap()
    }

    fn make_indicator(values: &[Option<f64>]) -> IndicatorSeries {
        IndicatorSeries {
            indicator_type: IndicatorType::Sma(1),
            values: values
                .iter()
                .enumerate()
                .map(|(i, &value)| IndicatorPoint {
                    date: date(i as u32 + 1),
                    value,
                })
                .collect(),
        }
    }

    fn make_series(values: &[Option<f64>]) -> Vec<SeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| SeriesPoint::new(date(i as u32 + 1), v))
            .collect()
    }

    fn make_signal(values: &[Option<Signal>]) -> Vec<SignalPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &signal)| SignalPoint {
                date: date(i as u32 + 1),
                signal,
            })
            .collect()
    }

    fn crossover_config(fast: usize, slow: usize) -> BacktestConfig {
        BacktestConfig {
            fast_window: fast,
            slow_window: slow,
            ..BacktestConfig::default()
        }
    }

    #[test]
    fn signal_long_when_fast_above_slow() {
        let fast = make_indicator(&[Some(2.0), Some(1.0)]);
        let slow = make_indicator(&[Some(1.0), Some(2.0)]);
        let signal = derive_signal(&fast, &slow).unwrap();
        assert_eq!(signal[0].signal, Some(Signal::Long));
        assert_eq!(signal[1].signal, Some(Signal::Flat));
    }

    #[test]
    fn signal_tie_is_flat() {
        let fast = make_indicator(&[Some(5.0)]);
        let slow = make_indicator(&[Some(5.0)]);
        let signal = derive_signal(&fast, &slow).unwrap();
        assert_eq!(signal[0].signal, Some(Signal::Flat));
    }

    #[test]
    fn signal_undefined_when_either_input_undefined() {
        let fast = make_indicator(&[None, Some(3.0), Some(3.0)]);
        let slow = make_indicator(&[Some(1.0), None, Some(1.0)]);
        let signal = derive_signal(&fast, &slow).unwrap();
        assert_eq!(signal[0].signal, None);
        assert_eq!(signal[1].signal, None);
        assert_eq!(signal[2].signal, Some(Signal::Long));
    }

    #[test]
    fn signal_rejects_mismatched_lengths() {
        let fast = make_indicator(&[Some(1.0), Some(2.0)]);
        let slow = make_indicator(&[Some(1.0)]);
        let err = derive_signal(&fast, &slow).unwrap_err();
        assert!(matches!(err, SmacrossError::Alignment { .. }));
    }

    #[test]
    fn signal_rejects_empty_input() {
        let err = derive_signal(&make_indicator(&[]), &make_indicator(&[])).unwrap_err();
        assert!(matches!(err, SmacrossError::InsufficientData { .. }));
    }

    #[test]
    fn period_return_values() {
        let returns = period_return(&make_prices(&[100.0, 110.0, 99.0])).unwrap();
        assert_eq!(returns.len(), 3);
        assert_eq!(returns[0].value, None);
        assert!((returns[1].value.unwrap() - 0.1).abs() < 1e-12);
        assert!((returns[2].value.unwrap() + 0.1).abs() < 1e-12);
    }

    #[test]
    fn period_return_single_price() {
        let returns = period_return(&make_prices(&[100.0])).unwrap();
        assert_eq!(returns, vec![SeriesPoint::new(date(1), None)]);
    }

    #[test]
    fn period_return_empty_series() {
        let prices = PriceSeries::new(vec![]).unwrap();
        assert!(matches!(
            period_return(&prices),
            Err(SmacrossError::InsufficientData { .. })
        ));
    }

    #[test]
    fn strategy_return_uses_previous_signal() {
        let signal = make_signal(&[Some(Signal::Long), Some(Signal::Flat), Some(Signal::Long)]);
        let returns = make_series(&[None, Some(0.05), Some(0.10)]);
        let strat = strategy_return(&signal, &returns).unwrap();

        assert_eq!(strat[0].value, None);
        // Long on day 1 earns day 2's return; Flat on day 2 earns nothing on day 3.
        assert_eq!(strat[1].value, Some(0.05));
        assert_eq!(strat[2].value, Some(0.0));
    }

    #[test]
    fn strategy_return_undefined_after_undefined_signal() {
        let signal = make_signal(&[None, Some(Signal::Long), Some(Signal::Long)]);
        let returns = make_series(&[None, Some(0.05), Some(0.10)]);
        let strat = strategy_return(&signal, &returns).unwrap();
        assert_eq!(strat[1].value, None);
        assert_eq!(strat[2].value, Some(0.10));
    }

    #[test]
    fn strategy_return_rejects_misaligned_dates() {
        let signal = make_signal(&[Some(Signal::Long), Some(Signal::Long)]);
        let returns = vec![
            SeriesPoint::new(date(1), None),
            SeriesPoint::new(date(3), Some(0.1)),
        ];
        let err = strategy_return(&signal, &returns).unwrap_err();
        assert!(matches!(err, SmacrossError::Alignment { .. }));
    }

    #[test]
    fn strategy_return_ignores_later_returns() {
        let signal = make_signal(&[Some(Signal::Long); 4]);
        let returns = make_series(&[None, Some(0.01), Some(0.02), Some(0.03)]);
        let mut shocked = returns.clone();
        shocked[3].value = Some(-0.5);

        let base = strategy_return(&signal, &returns).unwrap();
        let after = strategy_return(&signal, &shocked).unwrap();
        assert_eq!(base[..3], after[..3]);
        assert_ne!(base[3], after[3]);
    }

    #[test]
    fn equity_curve_compounds_returns() {
        let returns = make_series(&[None, Some(0.1), Some(-0.1)]);
        let equity = equity_curve(&returns, 1.0).unwrap();
        assert_eq!(equity[0].value, None);
        assert!((equity[1].value.unwrap() - 1.1).abs() < 1e-12);
        assert!((equity[2].value.unwrap() - 0.99).abs() < 1e-12);
    }

    #[test]
    fn equity_curve_scales_with_starting_value() {
        let returns = make_series(&[Some(0.5)]);
        let equity = equity_curve(&returns, 100.0).unwrap();
        assert_eq!(equity[0].value, Some(150.0));
    }

    #[test]
    fn equity_curve_total_loss_is_terminal() {
        let returns = make_series(&[Some(-1.0), Some(0.5)]);
        let equity = equity_curve(&returns, 1.0).unwrap();
        assert_eq!(equity[0].value, Some(0.0));
        assert_eq!(equity[1].value, Some(0.0));
    }

    #[test]
    fn equity_curve_rejects_bad_starting_value() {
        let returns = make_series(&[Some(0.1)]);
        assert!(matches!(
            equity_curve(&returns, 0.0),
            Err(SmacrossError::InvalidParameter { .. })
        ));
        assert!(matches!(
            equity_curve(&returns, f64::NAN),
            Err(SmacrossError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn equity_curve_rejects_empty_returns() {
        assert!(matches!(
            equity_curve(&[], 1.0),
            Err(SmacrossError::InsufficientData { .. })
        ));
    }

    #[test]
    fn trim_undefined_drops_leading_rows() {
        let series = make_series(&[None, None, Some(1.0), Some(1.1)]);
        let curve = trim_undefined(&series);
        assert_eq!(curve.len(), 2);
        assert_eq!(curve.first().unwrap().date, date(3));
    }

    #[test]
    fn run_backtest_crossover_scenario() {
        let prices = make_prices(&[100.0, 110.0, 99.0, 99.0, 120.0]);
        let result = run_backtest(&prices, &crossover_config(2, 3)).unwrap();

        let fast: Vec<_> = result.rows.iter().map(|r| r.fast).collect();
        assert_eq!(fast, vec![None, Some(105.0), Some(104.5), Some(99.0), Some(109.5)]);

        let slow = &result.rows;
        assert_eq!(slow[1].slow, None);
        assert!((slow[2].slow.unwrap() - 103.0).abs() < 1e-12);
        assert!((slow[3].slow.unwrap() - 308.0 / 3.0).abs() < 1e-12);
        assert!((slow[4].slow.unwrap() - 106.0).abs() < 1e-12);

        let signal: Vec<_> = result.rows.iter().map(|r| r.signal).collect();
        assert_eq!(
            signal,
            vec![None, None, Some(Signal::Long), Some(Signal::Flat), Some(Signal::Long)]
        );

        assert_eq!(result.trimmed_rows, 3);
        assert_eq!(result.equity.len(), 2);
        assert!((result.equity.last().unwrap().equity - 1.0).abs() < 1e-12);
        assert_eq!(result.buy_and_hold.len(), 2);
        assert!((result.buy_and_hold.last().unwrap().equity - 1.2).abs() < 1e-12);
    }

    #[test]
    fn run_backtest_earns_return_after_long_signal() {
        let prices = make_prices(&[100.0, 110.0, 99.0, 99.0, 120.0, 130.0]);
        let result = run_backtest(&prices, &crossover_config(2, 3)).unwrap();
        let last = result.equity.last().unwrap().equity;
        assert!((last - 130.0 / 120.0).abs() < 1e-12);
    }

    #[test]
    fn run_backtest_buy_and_hold_shares_equity_dates() {
        let prices = make_prices(&[100.0, 101.0, 102.0, 101.0, 103.0, 104.0]);
        let result = run_backtest(&prices, &crossover_config(2, 3)).unwrap();
        let equity_dates: Vec<_> = result.equity.points.iter().map(|p| p.date).collect();
        let hold_dates: Vec<_> = result.buy_and_hold.points.iter().map(|p| p.date).collect();
        assert_eq!(equity_dates, hold_dates);
    }

    #[test]
    fn run_backtest_with_ema() {
        let prices = make_prices(&[100.0, 102.0, 104.0, 103.0]);
        let config = BacktestConfig {
            indicator: IndicatorKind::Ema,
            ..crossover_config(2, 3)
        };
        let result = run_backtest(&prices, &config).unwrap();
        assert_eq!(result.fast, IndicatorType::Ema(2));
        // EMA is defined from the first bar, so only the first row lacks a strategy return.
        assert_eq!(result.trimmed_rows, 1);
    }

    #[test]
    fn run_backtest_too_short_for_slow_window() {
        let prices = make_prices(&[100.0, 101.0]);
        let err = run_backtest(&prices, &crossover_config(2, 3)).unwrap_err();
        assert!(matches!(err, SmacrossError::InsufficientData { needed: 3, .. }));
    }
}
