//! CLI definition and dispatch.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::run_backtest as run_strategy;
use crate::domain::cash_flow::CashFlow;
use crate::domain::config_validation::{load_backtest_config, load_strategy_config};
use crate::domain::error::TaError;
use crate::domain::indicator::Indicator;
use crate::domain::rule_builder::{IndicatorRegistry, build_strategy};
use crate::domain::series::BarSeries;

#[derive(Parser, Debug)]
#[command(name = "tacore", about = "Technical analysis strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a strategy over a CSV bar file
    Backtest {
        /// CSV file with date,open,high,low,close,volume[,amount] rows
        #[arg(short, long)]
        bars: PathBuf,
        /// Strategy INI file
        #[arg(short, long)]
        config: PathBuf,
        /// Value an open position up to this bar (default: last bar)
        #[arg(long)]
        final_index: Option<usize>,
    },
    /// Parse and validate a strategy file without data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let mut stdout = io::stdout().lock();
    let result = match &cli.command {
        Command::Backtest {
            bars,
            config,
            final_index,
        } => run_backtest(bars, config, *final_index, &mut stdout),
        Command::Validate { config } => run_validate(config, &mut stdout),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn load_bars(path: &Path) -> Result<BarSeries, TaError> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    CsvAdapter::read_file(path, &name)
}

/// Load bars and strategy, run the backtest, and print the closed positions
/// followed by the cash flow at every bar.
pub fn run_backtest(
    bars_path: &Path,
    config_path: &Path,
    final_index: Option<usize>,
    out: &mut dyn Write,
) -> Result<(), TaError> {
    info!(config = %config_path.display(), "loading strategy");
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let strategy_config = load_strategy_config(&adapter)?;
    let backtest_config = load_backtest_config(&adapter)?;

    info!(bars = %bars_path.display(), "loading bars");
    let series = Arc::new(load_bars(bars_path)?);
    let final_index = final_index.unwrap_or(series.end_index());
    series.check_index(final_index)?;

    let mut registry = IndicatorRegistry::new(series.clone());
    let strategy = build_strategy(
        &strategy_config.name,
        &strategy_config.entry,
        &strategy_config.exit,
        strategy_config.unstable_bars,
        &mut registry,
    )?;

    let record = run_strategy(&series, &strategy, &backtest_config)?;
    let cash_flow = CashFlow::from_record_until(series.clone(), &record, final_index)?;

    writeln!(
        out,
        "strategy: {} (unstable bars: {})",
        strategy.name(),
        strategy.unstable_bars()
    )?;
    for (i, position) in record.positions().iter().enumerate() {
        writeln!(
            out,
            "position {}: {} | profit {:.4}",
            i + 1,
            position,
            position.profit()
        )?;
    }
    let current = record.current_position();
    if current.is_opened() {
        writeln!(out, "{current}")?;
    }
    writeln!(out, "total profit: {:.4}", record.total_profit())?;
    writeln!(out, "cash flow:")?;
    for (index, value) in cash_flow.values().iter().enumerate() {
        writeln!(out, "{} {} {:.6}", index, series.bar(index).date, value)?;
    }
    Ok(())
}

/// Parse and check a strategy file; build its rules against an empty series
/// so indicator parameters are checked too.
pub fn run_validate(config_path: &Path, out: &mut dyn Write) -> Result<(), TaError> {
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let strategy_config = load_strategy_config(&adapter)?;
    let backtest_config = load_backtest_config(&adapter)?;
    backtest_config.cost_models()?;

    let mut registry = IndicatorRegistry::new(Arc::new(BarSeries::new("validate")));
    let strategy = build_strategy(
        &strategy_config.name,
        &strategy_config.entry,
        &strategy_config.exit,
        strategy_config.unstable_bars,
        &mut registry,
    )?;

    writeln!(out, "strategy: {}", strategy.name())?;
    writeln!(out, "entry: {}", strategy_config.entry)?;
    writeln!(out, "exit: {}", strategy_config.exit)?;
    writeln!(out, "unstable bars: {}", strategy.unstable_bars())?;
    writeln!(
        out,
        "trade type: {} x {}",
        backtest_config.trade_type, backtest_config.amount
    )?;
    writeln!(out, "ok")?;
    Ok(())
}
