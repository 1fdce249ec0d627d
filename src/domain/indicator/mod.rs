//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values
//!
//! Every calculator emits exactly one point per input bar, and the value at
//! bar `i` is computed from `bars[..=i]` only.

pub mod bollinger;
pub mod ema;
pub mod mfi;
pub mod rsi;
pub mod sma;
pub mod stochastic;

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Stochastic { k: f64, d: f64 },
    Bollinger { upper: f64, middle: f64, lower: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Mfi(usize),
    StochasticFast { k_period: usize, d_period: usize },
    Bollinger { period: usize, stddev_mult_x100: u32 },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Valid single-line value at `index`. For stochastic series this is %K.
    pub fn simple_at(&self, index: usize) -> Option<f64> {
        let point = self.values.get(index).filter(|p| p.valid)?;
        match point.value {
            IndicatorValue::Simple(v) => Some(v),
            IndicatorValue::Stochastic { k, .. } => Some(k),
            IndicatorValue::Bollinger { middle, .. } => Some(middle),
        }
    }

    /// Valid band triple `(upper, middle, lower)` at `index`.
    pub fn bands_at(&self, index: usize) -> Option<(f64, f64, f64)> {
        let point = self.values.get(index).filter(|p| p.valid)?;
        match point.value {
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } => Some((upper, middle, lower)),
            _ => None,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Mfi(period) => write!(f, "MFI({})", period),
            IndicatorType::StochasticFast { k_period, d_period } => {
                write!(f, "STOCHASTIC_FAST({},{})", k_period, d_period)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}

/// Invalid placeholder point, used during warmup.
pub(crate) fn warmup_point(timestamp: NaiveDateTime, value: IndicatorValue) -> IndicatorPoint {
    IndicatorPoint {
        timestamp,
        valid: false,
        value,
    }
}
