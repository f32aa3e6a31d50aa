//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvAdapter, load_price_frame, read_frame};
use crate::adapters::csv_report_adapter::{CsvReportAdapter, metrics_path};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::BacktestConfig;
use crate::domain::benchmark::run_against_buy_and_hold;
use crate::domain::config_validation::{
    parse_date, validate_backtest_config, validate_data_config, validate_strategy_config,
};
use crate::domain::error::AllocbtError;
use crate::domain::frame::Frame;
use crate::domain::metrics::{DEFAULT_PERIODS_PER_YEAR, Metrics};
use crate::domain::runner::{BacktestTable, run_multi_strategy, run_multi_strategy_parallel};
use crate::domain::strategy::{BuyAndHold, Strategy, build_strategy};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "allocbt", about = "Allocation strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Do not add the buy-and-hold baseline column
        #[arg(long)]
        no_benchmark: bool,
        /// Run strategies in parallel
        #[arg(long)]
        parallel: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Options for one backtest run, resolved from config and flags.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub benchmark: bool,
    pub parallel: bool,
    pub periods_per_year: f64,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            output,
            no_benchmark,
            parallel,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, output.as_deref(), no_benchmark, parallel)
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, AllocbtError> {
    tracing::info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

pub fn validate_all(adapter: &dyn ConfigPort) -> Result<(), AllocbtError> {
    validate_backtest_config(adapter)?;
    validate_data_config(adapter)?;
    validate_strategy_config(adapter)?;
    Ok(())
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, AllocbtError> {
    validate_backtest_config(adapter)?;
    let defaults = BacktestConfig::default();
    Ok(BacktestConfig {
        initial_capital: adapter.get_double("backtest", "initial_capital", defaults.initial_capital),
        use_fees: adapter.get_bool("backtest", "use_fees", defaults.use_fees),
        fee_rate: adapter.get_double("backtest", "fee_rate", defaults.fee_rate),
        allow_short_position: adapter.get_bool(
            "backtest",
            "allow_short_position",
            defaults.allow_short_position,
        ),
    })
}

pub fn build_run_options(
    adapter: &dyn ConfigPort,
    no_benchmark: bool,
    parallel: bool,
) -> RunOptions {
    RunOptions {
        benchmark: !no_benchmark && adapter.get_bool("backtest", "benchmark", true),
        parallel: parallel || adapter.get_bool("backtest", "parallel", false),
        periods_per_year: adapter.get_double(
            "backtest",
            "periods_per_year",
            DEFAULT_PERIODS_PER_YEAR,
        ),
    }
}

pub fn build_strategies(
    adapter: &dyn ConfigPort,
    fee_rate: f64,
) -> Result<Vec<Box<dyn Strategy>>, AllocbtError> {
    validate_strategy_config(adapter)?;
    adapter
        .get_list("strategy", "kinds")
        .iter()
        .map(|kind| build_strategy(kind, adapter, fee_rate))
        .collect()
}

/// Load the aligned feature and price tables described by `[data]`.
///
/// Feature rows are matched to the price timestamps, so row `i` of both
/// tables always describes the same moment. Without a `features` file the
/// price table doubles as the feature table.
pub fn load_data(
    adapter: &dyn ConfigPort,
    data_port: &dyn DataPort,
) -> Result<(Frame, Frame), AllocbtError> {
    validate_data_config(adapter)?;
    let symbols = adapter.get_list("data", "symbols");
    let start = parse_date(adapter, "start_date")?;
    let end = parse_date(adapter, "end_date")?;

    tracing::info!("Loading prices for {}", symbols.join(", "));
    let prices = load_price_frame(data_port, &symbols, start, end)?;

    let features = match adapter.get_string("data", "features") {
        Some(path) => {
            tracing::info!("Loading features from {}", path);
            read_frame(&path, start, end)?.reindex(prices.timestamps())?
        }
        None => prices.clone(),
    };

    Ok((features, prices))
}

/// Run the configured strategies, adding the buy-and-hold baseline when
/// requested and not already present.
pub fn run_strategies(
    mut strategies: Vec<Box<dyn Strategy>>,
    features: &Frame,
    prices: &Frame,
    config: &BacktestConfig,
    options: &RunOptions,
) -> Result<BacktestTable, AllocbtError> {
    let has_baseline = strategies.iter().any(|s| s.name() == BuyAndHold::NAME);
    if options.benchmark && has_baseline {
        tracing::info!("{} already configured, not adding a baseline", BuyAndHold::NAME);
    }

    if options.benchmark && !has_baseline {
        if strategies.len() == 1 {
            if let Some(strategy) = strategies.pop() {
                return run_against_buy_and_hold(strategy, features, prices, config);
            }
        }
        strategies.push(Box::new(BuyAndHold::new(config.fee_rate)));
    }

    if options.parallel {
        run_multi_strategy_parallel(&mut strategies, features, prices, config)
    } else {
        run_multi_strategy(&mut strategies, features, prices, config)
    }
}

pub fn summarize(table: &BacktestTable, periods_per_year: f64) -> Vec<(String, Metrics)> {
    table
        .columns()
        .iter()
        .filter_map(|name| {
            table
                .column(name)
                .ok()
                .map(|values| (name.clone(), Metrics::compute(values, periods_per_year, 0.0)))
        })
        .collect()
}

fn print_summary(table: &BacktestTable, metrics: &[(String, Metrics)]) {
    eprintln!("\n=== Results ({} steps) ===", table.len());
    for (name, m) in metrics {
        eprintln!("{}:", name);
        eprintln!("  Final Value:      {:.2}", m.final_value);
        eprintln!("  Total Return:     {:.2}%", m.total_return * 100.0);
        eprintln!("  Annualized:       {:.2}%", m.annualized_return * 100.0);
        eprintln!("  Sharpe Ratio:     {:.2}", m.sharpe_ratio);
        eprintln!("  Sortino Ratio:    {:.2}", m.sortino_ratio);
        eprintln!("  Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0);
    }
}

fn data_port_for(adapter: &dyn ConfigPort) -> Result<CsvAdapter, AllocbtError> {
    let dir = adapter
        .get_string("data", "dir")
        .ok_or_else(|| AllocbtError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })?;
    Ok(CsvAdapter::new(PathBuf::from(dir)))
}

fn run_backtest(
    config_path: &Path,
    output_path: Option<&Path>,
    no_benchmark: bool,
    parallel: bool,
) -> Result<(), AllocbtError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;

    let bt_config = build_backtest_config(&adapter)?;
    let options = build_run_options(&adapter, no_benchmark, parallel);
    let strategies = build_strategies(&adapter, bt_config.fee_rate)?;

    let data_port = data_port_for(&adapter)?;
    let (features, prices) = load_data(&adapter, &data_port)?;

    tracing::info!(
        "Running backtest: {} strategies, {} assets, {} steps",
        strategies.len(),
        prices.width(),
        prices.len()
    );
    let table = run_strategies(strategies, &features, &prices, &bt_config, &options)?;

    let metrics = summarize(&table, options.periods_per_year);
    print_summary(&table, &metrics);

    let output = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("backtest.csv"));
    CsvReportAdapter.write(&table, &metrics, &output.to_string_lossy())?;
    eprintln!("\nResults written to: {}", output.display());
    eprintln!("Metrics written to: {}", metrics_path(&output).display());
    Ok(())
}

pub fn run_dry_run(config_path: &Path) -> Result<(), AllocbtError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;

    let bt_config = build_backtest_config(&adapter)?;
    let options = build_run_options(&adapter, false, false);
    let strategies = build_strategies(&adapter, bt_config.fee_rate)?;

    eprintln!("Config validated successfully");
    eprintln!("\nBacktest:");
    eprintln!("  initial_capital:      {}", bt_config.initial_capital);
    eprintln!("  use_fees:             {}", bt_config.use_fees);
    eprintln!("  fee_rate:             {}", bt_config.fee_rate);
    eprintln!("  allow_short_position: {}", bt_config.allow_short_position);
    eprintln!("  benchmark:            {}", options.benchmark);

    eprintln!("\nStrategies:");
    for s in &strategies {
        eprintln!("  {}", s.name());
    }

    eprintln!("\nData:");
    eprintln!(
        "  dir:     {}",
        adapter.get_string("data", "dir").unwrap_or_default()
    );
    eprintln!(
        "  symbols: {}",
        adapter.get_list("data", "symbols").join(", ")
    );

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), AllocbtError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;
    eprintln!("Configuration is valid.");
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), AllocbtError> {
    let adapter = load_config(config_path)?;
    let port = data_port_for(&adapter)?;
    let symbols = port.list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No symbols found");
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}
