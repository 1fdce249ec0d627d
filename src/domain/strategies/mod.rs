//! Built-in signal generators and the indicator choices they share.
//!
//! Every built-in is long-only: it emits a latched LONG/FLAT signal from an
//! entry and an exit condition (see [`long_only_latch`](crate::domain::signal::long_only_latch)).

pub mod bb_trend_following;
pub mod bb_volatility_breakout;
pub mod ma_price_crossover;
pub mod oscillator_value;
pub mod two_ma_crossover;

pub use bb_trend_following::BbTrendFollowing;
pub use bb_volatility_breakout::BbVolatilityBreakout;
pub use ma_price_crossover::MaPriceCrossover;
pub use oscillator_value::OscillatorValue;
pub use two_ma_crossover::TwoMaCrossover;

use super::error::TastratError;
use super::indicator::ema::calculate_ema;
use super::indicator::mfi::calculate_mfi;
use super::indicator::rsi::calculate_rsi;
use super::indicator::sma::calculate_sma;
use super::indicator::stochastic::calculate_stochastic_fast;
use super::indicator::IndicatorSeries;
use super::ohlcv::Bar;
use super::strategy::StrategyParams;

/// %D smoothing used by the fast stochastic.
const STOCHASTIC_D_PERIOD: usize = 3;

/// Single-line oscillator bounded to 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oscillator {
    Rsi,
    StochasticFast,
    Mfi,
}

impl Oscillator {
    pub fn name(self) -> &'static str {
        match self {
            Oscillator::Rsi => "RSI",
            Oscillator::StochasticFast => "StochasticFast",
            Oscillator::Mfi => "MFI",
        }
    }

    pub(crate) fn from_param(
        params: &StrategyParams,
        strategy: &str,
        key: &str,
        default: Oscillator,
        allowed: &[Oscillator],
    ) -> Result<Self, TastratError> {
        let names: Vec<&'static str> = allowed.iter().map(|o| o.name()).collect();
        let chosen = params.choice(strategy, key, default.name(), &names)?;
        Ok(allowed
            .iter()
            .copied()
            .find(|o| o.name() == chosen)
            .unwrap_or(default))
    }

    /// Bars needed for the first valid value.
    pub fn min_history(self, period: usize) -> usize {
        match self {
            Oscillator::Rsi | Oscillator::Mfi => period + 1,
            Oscillator::StochasticFast => period + STOCHASTIC_D_PERIOD - 1,
        }
    }

    pub fn requires_volume(self) -> bool {
        self == Oscillator::Mfi
    }

    pub fn calculate(self, bars: &[Bar], period: usize) -> IndicatorSeries {
        match self {
            Oscillator::Rsi => calculate_rsi(bars, period),
            Oscillator::StochasticFast => calculate_stochastic_fast(bars, period, STOCHASTIC_D_PERIOD),
            Oscillator::Mfi => calculate_mfi(bars, period),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovingAverage {
    Sma,
    Ema,
}

impl MovingAverage {
    pub const NAMES: [&'static str; 2] = ["SMA", "EMA"];

    pub fn name(self) -> &'static str {
        match self {
            MovingAverage::Sma => "SMA",
            MovingAverage::Ema => "EMA",
        }
    }

    pub(crate) fn from_param(params: &StrategyParams, strategy: &str, key: &str) -> Result<Self, TastratError> {
        match params.choice(strategy, key, "SMA", &Self::NAMES)? {
            "EMA" => Ok(MovingAverage::Ema),
            _ => Ok(MovingAverage::Sma),
        }
    }

    pub fn calculate(self, bars: &[Bar], period: usize) -> IndicatorSeries {
        match self {
            MovingAverage::Sma => calculate_sma(bars, period),
            MovingAverage::Ema => calculate_ema(bars, period),
        }
    }
}

/// Bollinger deviation factor from `df`: positive and given in hundredths,
/// since bands are keyed by `df * 100`.
pub(crate) fn devfactor(params: &StrategyParams, strategy: &str) -> Result<f64, TastratError> {
    let value = params.number(strategy, "df", 2.0)?;
    let hundredths = value * 100.0;
    let reason = if value <= 0.0 {
        "must be positive"
    } else if (hundredths - hundredths.round()).abs() > 1e-9 {
        "must be a multiple of 0.01"
    } else if hundredths.round() > f64::from(u32::MAX) {
        "is too large"
    } else {
        return Ok(value);
    };
    Err(TastratError::InvalidParameter {
        strategy: strategy.to_string(),
        key: "df".to_string(),
        reason: reason.to_string(),
    })
}

/// Valid single-line values aligned to bars, `None` during warmup.
pub(crate) fn simple_values(series: &IndicatorSeries) -> Vec<Option<f64>> {
    (0..series.values.len()).map(|i| series.simple_at(i)).collect()
}
