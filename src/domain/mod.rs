//! Core domain types and logic. No I/O happens below this module.

pub mod backtest;
pub mod cash_flow;
pub mod config_validation;
pub mod cost;
pub mod error;
pub mod indicator;
pub mod ohlcv;
pub mod position;
pub mod rule;
pub mod rule_builder;
pub mod rule_parser;
pub mod rule_spec;
pub mod series;
pub mod strategy;
pub mod trade;
pub mod trading_record;
