//! Strategy file validation and loading.
//!
//! Every key is checked before anything is built. `[strategy]` is required;
//! `[backtest]` is optional and every key in it has a default.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::TaError;
use crate::domain::rule_parser;
use crate::domain::rule_spec::RuleSpec;
use crate::domain::trade::TradeType;
use crate::ports::config_port::ConfigPort;

const STRATEGY: &str = "strategy";
const BACKTEST: &str = "backtest";
const DEFAULT_NAME: &str = "unnamed";

/// The `[strategy]` section with its rules parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub name: String,
    pub entry: RuleSpec,
    pub exit: RuleSpec,
    /// `None` means "derive from the referenced indicators".
    pub unstable_bars: Option<usize>,
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TaError> {
    load_strategy_config(config).map(|_| ())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TaError> {
    load_backtest_config(config).map(|_| ())
}

pub fn load_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, TaError> {
    let name = config
        .get_string(STRATEGY, "name")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_NAME.to_string());
    let entry = rule_parser::parse(&required(config, STRATEGY, "entry")?)?;
    let exit = rule_parser::parse(&required(config, STRATEGY, "exit")?)?;
    let unstable_bars = unstable_bars(config)?;
    Ok(StrategyConfig {
        name,
        entry,
        exit,
        unstable_bars,
    })
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TaError> {
    let defaults = BacktestConfig::default();
    let trade_type = trade_type(config)?;

    let amount = double(config, BACKTEST, "amount", defaults.amount)?;
    if amount <= 0.0 {
        return Err(TaError::config_invalid(BACKTEST, "amount", "amount must be positive"));
    }

    let commission_per_trade = non_negative(config, "commission_per_trade")?;
    let commission_pct = non_negative(config, "commission_pct")?;
    if commission_per_trade > 0.0 && commission_pct > 0.0 {
        return Err(TaError::config_invalid(
            BACKTEST,
            "commission_pct",
            "set commission_per_trade or commission_pct, not both",
        ));
    }
    let borrowing_rate = non_negative(config, "borrowing_rate")?;

    Ok(BacktestConfig {
        trade_type,
        amount,
        commission_per_trade,
        commission_pct,
        borrowing_rate,
    })
}

/// Trimmed, non-empty value of a required key.
fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, TaError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(TaError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

/// A finite number, or `default` when the key is absent.
fn double(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, TaError> {
    let Some(text) = config.get_string(section, key) else {
        return Ok(default);
    };
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(TaError::config_invalid(
            section,
            key,
            format!("expected a number, got '{}'", text.trim()),
        )),
    }
}

fn non_negative(config: &dyn ConfigPort, key: &str) -> Result<f64, TaError> {
    let value = double(config, BACKTEST, key, 0.0)?;
    if value < 0.0 {
        return Err(TaError::config_invalid(
            BACKTEST,
            key,
            format!("{key} must be non-negative"),
        ));
    }
    Ok(value)
}

fn unstable_bars(config: &dyn ConfigPort) -> Result<Option<usize>, TaError> {
    let Some(text) = config.get_string(STRATEGY, "unstable_bars") else {
        return Ok(None);
    };
    match text.trim().parse::<i64>() {
        Ok(n) if n < 0 => Err(TaError::config_invalid(
            STRATEGY,
            "unstable_bars",
            "unstable_bars must be >= 0",
        )),
        Ok(n) => Ok(Some(n as usize)),
        Err(_) => Err(TaError::config_invalid(
            STRATEGY,
            "unstable_bars",
            format!("expected an integer, got '{}'", text.trim()),
        )),
    }
}

fn trade_type(config: &dyn ConfigPort) -> Result<TradeType, TaError> {
    let Some(text) = config.get_string(BACKTEST, "trade_type") else {
        return Ok(TradeType::Buy);
    };
    match text.trim().to_lowercase().as_str() {
        "buy" => Ok(TradeType::Buy),
        "sell" => Ok(TradeType::Sell),
        other => Err(TaError::config_invalid(
            BACKTEST,
            "trade_type",
            format!("expected buy or sell, got '{other}'"),
        )),
    }
}
