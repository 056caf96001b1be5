//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::{
    CsvAdapter, DEFAULT_CLOSE_COLUMN, DEFAULT_FILE_PATTERN, DEFAULT_TIMESTAMP_COLUMN,
};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::run_store::RunStore;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    backtest_value, validate_backtest_config, DEFAULT_FAST_WINDOW, DEFAULT_SLOW_WINDOW,
};
use crate::domain::error::SmacrossError;
use crate::domain::indicator::IndicatorKind;
use crate::domain::metrics::{Metrics, MetricsConfig, DEFAULT_PERIODS_PER_YEAR};
use crate::domain::series::{EquityCurve, SeriesPoint};
use crate::domain::validation::{validate_equity_curve, Frequency};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::{ReportPort, RunReport};

#[derive(Parser, Debug)]
#[command(name = "smacross", about = "Moving-average crossover backtester")]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the crossover backtest for each configured asset
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Run a single asset instead of the configured list
        #[arg(long)]
        asset: Option<String>,
        /// Directory that receives one folder per run
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        no_chart: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate an equity curve CSV and report its metrics
    Metrics {
        #[arg(short, long)]
        equity: PathBuf,
        #[arg(long, default_value = "timestamp")]
        timestamp_column: String,
        #[arg(long, default_value = "portfolio_value")]
        equity_column: String,
        /// Expected sampling frequency: D, B or W
        #[arg(long, default_value = "D")]
        frequency: Frequency,
        #[arg(long, default_value_t = 0.05)]
        risk_free_rate: f64,
        #[arg(long, default_value_t = DEFAULT_PERIODS_PER_YEAR)]
        periods_per_year: usize,
    },
    /// Validate a backtest configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            asset,
            output,
            no_chart,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, asset.as_deref())
            } else {
                run_backtest(&config, asset.as_deref(), output.as_deref(), no_chart)
            }
        }
        Command::Metrics {
            equity,
            timestamp_column,
            equity_column,
            frequency,
            risk_free_rate,
            periods_per_year,
        } => run_metrics(
            &equity,
            &timestamp_column,
            &equity_column,
            frequency,
            MetricsConfig {
                risk_free_rate,
                periods_per_year,
            },
        ),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: &SmacrossError) -> ExitCode {
    error!("{err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// Reads `[backtest]`; call [`validate_backtest_config`] first.
pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SmacrossError> {
    let window = |key: &str, default: i64| -> Result<usize, SmacrossError> {
        let value: i64 = backtest_value(adapter, key, default)?;
        usize::try_from(value).map_err(|_| SmacrossError::ConfigInvalid {
            section: "backtest".into(),
            key: key.into(),
            reason: format!("{} must be non-negative", key),
        })
    };

    let indicator = match adapter.get_string("backtest", "indicator") {
        Some(s) => s.parse::<IndicatorKind>().map_err(|reason| SmacrossError::ConfigInvalid {
            section: "backtest".into(),
            key: "indicator".into(),
            reason,
        })?,
        None => IndicatorKind::Sma,
    };
    let frequency = match adapter.get_string("backtest", "frequency") {
        Some(s) => s.parse::<Frequency>().map_err(|reason| SmacrossError::ConfigInvalid {
            section: "backtest".into(),
            key: "frequency".into(),
            reason,
        })?,
        None => Frequency::Daily,
    };

    Ok(BacktestConfig {
        fast_window: window("fast_window", DEFAULT_FAST_WINDOW)?,
        slow_window: window("slow_window", DEFAULT_SLOW_WINDOW)?,
        indicator,
        starting_value: backtest_value(adapter, "starting_value", 1.0)?,
        risk_free_rate: backtest_value(adapter, "risk_free_rate", 0.05)?,
        periods_per_year: window("periods_per_year", DEFAULT_PERIODS_PER_YEAR as i64)?,
        frequency,
    })
}

pub fn resolve_assets(asset_override: Option<&str>, config: &dyn ConfigPort) -> Vec<String> {
    if let Some(a) = asset_override {
        return vec![a.trim().to_string()];
    }

    if let Some(assets) = config
        .get_list("backtest", "assets")
        .filter(|assets| !assets.is_empty())
    {
        return assets;
    }

    if let Some(asset) = config.get_string("backtest", "asset") {
        let asset = asset.trim().to_string();
        if !asset.is_empty() {
            return vec![asset];
        }
    }

    vec![]
}

pub fn build_data_adapter(config: &dyn ConfigPort) -> CsvAdapter {
    let dir = config
        .get_string("data", "dir")
        .unwrap_or_else(|| "data".to_string());
    let pattern = config
        .get_string("data", "file_pattern")
        .unwrap_or_else(|| DEFAULT_FILE_PATTERN.to_string());
    let timestamp = config
        .get_string("data", "timestamp_column")
        .unwrap_or_else(|| DEFAULT_TIMESTAMP_COLUMN.to_string());
    let close = config
        .get_string("data", "close_column")
        .unwrap_or_else(|| DEFAULT_CLOSE_COLUMN.to_string());

    CsvAdapter::new(PathBuf::from(dir))
        .with_file_pattern(pattern)
        .with_columns(timestamp, close)
}

pub fn build_run_store(
    config: &dyn ConfigPort,
    output_override: Option<&Path>,
    no_chart: bool,
) -> RunStore {
    let runs_dir = output_override
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("output", "runs_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("runs"));
    let chart = !no_chart && config.get_bool("output", "chart", true);
    RunStore::new(runs_dir).with_chart(chart)
}

pub fn run_name(asset: &str, config: &BacktestConfig) -> String {
    format!(
        "{}_{}_{}_{}",
        asset,
        config.indicator.to_string().to_lowercase(),
        config.fast_window,
        config.slow_window
    )
}

fn metrics_config(config: &BacktestConfig) -> MetricsConfig {
    MetricsConfig {
        risk_free_rate: config.risk_free_rate,
        periods_per_year: config.periods_per_year,
    }
}

fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "undefined".to_string(),
    }
}

pub fn format_metrics(metrics: &Metrics) -> String {
    [
        format!("Final Equity:     {:.2}x", metrics.final_equity),
        format!("Total Return:     {:.2}%", metrics.total_return * 100.0),
        format!("Annualized:       {:.2}%", metrics.annualized_return * 100.0),
        format!("Sharpe Ratio:     {}", format_ratio(metrics.sharpe_ratio)),
        format!("Sortino Ratio:    {}", format_ratio(metrics.sortino_ratio)),
        format!("Max Drawdown:     {:.2}%", metrics.max_drawdown * 100.0),
        format!("Max DD Duration:  {} periods", metrics.max_drawdown_duration),
    ]
    .join("\n")
}

pub fn format_summary(asset: &str, result: &BacktestResult, metrics: &Metrics) -> String {
    let mut lines = vec![format!(
        "=== {} {}/{} ===",
        asset.to_uppercase(),
        result.fast,
        result.slow
    )];
    if let (Some(first), Some(last)) = (result.equity.first(), result.equity.last()) {
        lines.push(format!(
            "Period:           {} to {} ({} leading rows trimmed)",
            first.date, last.date, result.trimmed_rows
        ));
    }
    lines.push(format_metrics(metrics));
    if let Some(hold) = result.buy_and_hold.last() {
        lines.push(format!("Buy & Hold:       {:.2}x", hold.equity));
    }
    lines.join("\n")
}

/// Outcome of one asset's run.
#[derive(Debug)]
pub struct AssetRun {
    pub asset: String,
    pub result: BacktestResult,
    pub metrics: Metrics,
    pub run_path: PathBuf,
}

fn as_raw(curve: &EquityCurve) -> Vec<SeriesPoint> {
    curve
        .points
        .iter()
        .map(|p| SeriesPoint::new(p.date, Some(p.equity)))
        .collect()
}

pub fn run_asset(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    asset: &str,
    config: &BacktestConfig,
) -> Result<AssetRun, SmacrossError> {
    let prices = data_port.fetch_prices(asset)?;
    info!(asset, bars = prices.len(), "Running backtest");

    let result = backtest_engine::run_backtest(&prices, config)?;
    let equity = validate_equity_curve(&as_raw(&result.equity), config.frequency)?;
    let metrics = Metrics::compute(&equity, &metrics_config(config))?;

    let name = run_name(asset, config);
    let run_path = report_port.write_run(&RunReport {
        run_name: &name,
        asset,
        config,
        result: &result,
        metrics: &metrics,
    })?;

    Ok(AssetRun {
        asset: asset.to_string(),
        result,
        metrics,
        run_path,
    })
}

/// Runs every asset; a failing asset is logged and skipped. The exit code
/// reflects the first failure, if any.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    assets: &[String],
    config: &BacktestConfig,
) -> ExitCode {
    let mut first_failure: Option<ExitCode> = None;

    for asset in assets {
        match run_asset(data_port, report_port, asset, config) {
            Ok(run) => {
                println!("{}\n", format_summary(&run.asset, &run.result, &run.metrics));
            }
            Err(e) => {
                warn!("skipping {} ({})", asset, e);
                first_failure.get_or_insert(ExitCode::from(&e));
            }
        }
    }

    first_failure.unwrap_or(ExitCode::SUCCESS)
}

fn load_validated(config_path: &Path) -> Result<(FileConfigAdapter, BacktestConfig), ExitCode> {
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter).map_err(|e| fail(&e))?;
    let bt_config = build_backtest_config(&adapter).map_err(|e| fail(&e))?;
    Ok((adapter, bt_config))
}

fn run_backtest(
    config_path: &Path,
    asset_override: Option<&str>,
    output_override: Option<&Path>,
    no_chart: bool,
) -> ExitCode {
    let (adapter, bt_config) = match load_validated(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };

    let assets = resolve_assets(asset_override, &adapter);
    if assets.is_empty() {
        error!("no assets configured");
        return ExitCode::from(2);
    }

    info!(
        "Backtesting {} assets with {}/{}",
        assets.len(),
        bt_config.fast_indicator(),
        bt_config.slow_indicator()
    );

    let data_port = build_data_adapter(&adapter);
    let run_store = build_run_store(&adapter, output_override, no_chart);
    run_backtest_pipeline(&data_port, &run_store, &assets, &bt_config)
}

pub fn run_dry_run(config_path: &Path, asset_override: Option<&str>) -> ExitCode {
    let (adapter, bt_config) = match load_validated(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    info!("Config validated successfully");

    println!("Strategy: {} / {}", bt_config.fast_indicator(), bt_config.slow_indicator());
    println!("Risk-free rate: {}", bt_config.risk_free_rate);
    println!("Periods per year: {}", bt_config.periods_per_year);
    println!("Frequency: {}", bt_config.frequency);

    let data_port = build_data_adapter(&adapter);
    let assets = resolve_assets(asset_override, &adapter);
    let mut missing = 0;
    println!("Assets:");
    for asset in &assets {
        let path = data_port.price_path(asset);
        let status = if path.exists() {
            "ok"
        } else {
            missing += 1;
            "missing"
        };
        println!("  {} -> {} ({})", asset, path.display(), status);
    }

    if missing > 0 {
        error!("{} price files missing", missing);
        return ExitCode::from(3);
    }
    info!("Dry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    match load_validated(config_path) {
        Ok((adapter, bt_config)) => {
            println!("fast:      {}", bt_config.fast_indicator());
            println!("slow:      {}", bt_config.slow_indicator());
            println!("assets:    {}", resolve_assets(None, &adapter).join(", "));
            println!("frequency: {}", bt_config.frequency);
            info!("Configuration is valid.");
            ExitCode::SUCCESS
        }
        Err(code) => code,
    }
}

pub fn evaluate_equity_file(
    data_port: &dyn DataPort,
    path: &Path,
    timestamp_column: &str,
    equity_column: &str,
    frequency: Frequency,
    config: &MetricsConfig,
) -> Result<Metrics, SmacrossError> {
    let raw = data_port.fetch_equity(path, timestamp_column, equity_column)?;
    let curve = validate_equity_curve(&raw, frequency)?;
    Metrics::compute(&curve, config)
}

fn run_metrics(
    path: &Path,
    timestamp_column: &str,
    equity_column: &str,
    frequency: Frequency,
    config: MetricsConfig,
) -> ExitCode {
    info!("Evaluating {}", path.display());
    let data_port = CsvAdapter::new(PathBuf::from("."));
    match evaluate_equity_file(
        &data_port,
        path,
        timestamp_column,
        equity_column,
        frequency,
        &config,
    ) {
        Ok(metrics) => {
            println!("{}", format_metrics(&metrics));
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}
