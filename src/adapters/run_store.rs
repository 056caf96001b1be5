//! Run directory persistence: `<runs_dir>/<run_name>/{equity.csv, meta.json, equity.svg}`.

use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::adapters::chart_svg::format_equity_chart;
use crate::domain::error::SmacrossError;
use crate::domain::indicator::IndicatorKind;
use crate::domain::metrics::Metrics;
use crate::domain::validation::Frequency;
use crate::ports::report_port::{ReportPort, RunReport};

pub const EQUITY_FILE: &str = "equity.csv";
pub const META_FILE: &str = "meta.json";
pub const CHART_FILE: &str = "equity.svg";

pub struct RunStore {
    runs_dir: PathBuf,
    write_chart: bool,
}

#[derive(Debug, Serialize)]
struct EquityRow {
    date: NaiveDate,
    equity: f64,
    buy_and_hold: Option<f64>,
    drawdown: Option<f64>,
}

#[derive(Debug, Serialize)]
struct RunMetadata<'a> {
    run_name: &'a str,
    asset: &'a str,
    indicator: IndicatorKind,
    fast_window: usize,
    slow_window: usize,
    starting_value: f64,
    risk_free_rate: f64,
    periods_per_year: usize,
    frequency: Frequency,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    bars: usize,
    trimmed_rows: usize,
    metrics: &'a Metrics,
}

impl RunStore {
    pub fn new(runs_dir: PathBuf) -> Self {
        Self {
            runs_dir,
            write_chart: true,
        }
    }

    pub fn with_chart(mut self, write_chart: bool) -> Self {
        self.write_chart = write_chart;
        self
    }

    pub fn run_path(&self, run_name: &str) -> PathBuf {
        self.runs_dir.join(run_name)
    }
}

fn serialize_error(e: impl std::fmt::Display) -> SmacrossError {
    SmacrossError::Serialize {
        reason: e.to_string(),
    }
}

impl ReportPort for RunStore {
    fn write_run(&self, report: &RunReport<'_>) -> Result<PathBuf, SmacrossError> {
        let folder = self.run_path(report.run_name);
        fs::create_dir_all(&folder)?;

        let result = report.result;
        let mut writer = csv::Writer::from_path(folder.join(EQUITY_FILE)).map_err(serialize_error)?;
        for (i, point) in result.equity.points.iter().enumerate() {
            writer
                .serialize(EquityRow {
                    date: point.date,
                    equity: point.equity,
                    buy_and_hold: result.buy_and_hold.points.get(i).map(|p| p.equity),
                    drawdown: report.metrics.drawdown.get(i).map(|d| d.drawdown),
                })
                .map_err(serialize_error)?;
        }
        writer.flush()?;

        let config = report.config;
        let meta = RunMetadata {
            run_name: report.run_name,
            asset: report.asset,
            indicator: config.indicator,
            fast_window: config.fast_window,
            slow_window: config.slow_window,
            starting_value: config.starting_value,
            risk_free_rate: config.risk_free_rate,
            periods_per_year: config.periods_per_year,
            frequency: config.frequency,
            start_date: result.equity.first().map(|p| p.date),
            end_date: result.equity.last().map(|p| p.date),
            bars: result.rows.len(),
            trimmed_rows: result.trimmed_rows,
            metrics: report.metrics,
        };
        let json = serde_json::to_string_pretty(&meta).map_err(serialize_error)?;
        fs::write(folder.join(META_FILE), json)?;

        if self.write_chart {
            let title = format!(
                "{} {} {}/{}",
                report.asset.to_uppercase(),
                config.indicator,
                config.fast_window,
                config.slow_window
            );
            let label = format!("{} Crossover", config.indicator);
            if let Some(svg) = format_equity_chart(&title, &label, &result.equity, &result.buy_and_hold) {
                fs::write(folder.join(CHART_FILE), svg)?;
            }
        }

        info!(run = report.run_name, path = %folder.display(), "run written");
        Ok(folder)
    }
}
