//! Core domain types and logic.

pub mod ohlcv;
pub mod signal;
pub mod position;
pub mod trade;
pub mod indicator;
pub mod indicator_helpers;
pub mod strategy;
pub mod strategies;
pub mod registry;
pub mod backtest;
pub mod metrics;
pub mod returns;
pub mod catalog;
pub mod batch;
pub mod config_validation;
pub mod error;
