//! Configuration validation.
//!
//! Validates all config fields before a backtest runs.

use std::str::FromStr;

use crate::domain::error::SmacrossError;
use crate::domain::indicator::IndicatorKind;
use crate::domain::validation::Frequency;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_FAST_WINDOW: i64 = 20;
pub const DEFAULT_SLOW_WINDOW: i64 = 50;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    validate_windows(config)?;
    validate_indicator(config)?;
    validate_starting_value(config)?;
    validate_risk_free_rate(config)?;
    validate_periods_per_year(config)?;
    validate_frequency(config)?;
    validate_assets(config)?;
    Ok(())
}

fn invalid(key: &str, reason: &str) -> SmacrossError {
    SmacrossError::ConfigInvalid {
        section: "backtest".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Reads a `[backtest]` number. A missing key yields `default`; a present
/// key that does not parse is an error rather than a silent fallback.
pub fn backtest_value<T: FromStr>(
    config: &dyn ConfigPort,
    key: &str,
    default: T,
) -> Result<T, SmacrossError> {
    match config.get_string("backtest", key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| invalid(key, &format!("expected a number, got '{}'", raw.trim()))),
    }
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    let fast: i64 = backtest_value(config, "fast_window", DEFAULT_FAST_WINDOW)?;
    let slow: i64 = backtest_value(config, "slow_window", DEFAULT_SLOW_WINDOW)?;
    if fast < 1 {
        return Err(invalid("fast_window", "fast_window must be at least 1"));
    }
    if slow < 1 {
        return Err(invalid("slow_window", "slow_window must be at least 1"));
    }
    if fast >= slow {
        return Err(invalid(
            "fast_window",
            "fast_window must be less than slow_window",
        ));
    }
    Ok(())
}

fn validate_indicator(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    match config.get_string("backtest", "indicator") {
        None => Ok(()),
        Some(s) => s
            .parse::<IndicatorKind>()
            .map(|_| ())
            .map_err(|reason| invalid("indicator", &reason)),
    }
}

fn validate_starting_value(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    let value: f64 = backtest_value(config, "starting_value", 1.0)?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid("starting_value", "starting_value must be positive"));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    let value: f64 = backtest_value(config, "risk_free_rate", 0.05)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    let value: i64 = backtest_value(config, "periods_per_year", 252)?;
    if value < 1 {
        return Err(invalid(
            "periods_per_year",
            "periods_per_year must be at least 1",
        ));
    }
    Ok(())
}

fn validate_frequency(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    match config.get_string("backtest", "frequency") {
        None => Ok(()),
        Some(s) => s
            .parse::<Frequency>()
            .map(|_| ())
            .map_err(|reason| invalid("frequency", &reason)),
    }
}

fn validate_assets(config: &dyn ConfigPort) -> Result<(), SmacrossError> {
    let listed = config
        .get_list("backtest", "assets")
        .is_some_and(|assets| !assets.is_empty());
    let single = config
        .get_string("backtest", "asset")
        .is_some_and(|a| !a.trim().is_empty());

    if listed || single {
        Ok(())
    } else {
        Err(SmacrossError::ConfigMissing {
            section: "backtest".to_string(),
            key: "assets".to_string(),
        })
    }
}
