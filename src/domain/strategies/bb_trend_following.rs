//! Bollinger trend following: buy strength near the upper band confirmed by
//! an oscillator, exit on a close below the lower band.

use super::{devfactor, simple_values, Oscillator};
use crate::domain::error::TastratError;
use crate::domain::indicator::bollinger::{calculate_bollinger, mult_to_x100, percent_b};
use crate::domain::ohlcv::Bar;
use crate::domain::signal::{long_only_latch, Signal, SignalGenerator};
use crate::domain::strategy::{StrategyDefinition, StrategyParams};

pub const NAME: &str = "BBTrendFollowing";

const PERCENT_B_ENTRY: f64 = 0.8;
const OSCILLATOR_ENTRY: f64 = 80.0;

#[derive(Debug, Clone)]
pub struct BbTrendFollowing {
    label: String,
    period: usize,
    devfactor: f64,
    oscillator: Oscillator,
}

impl BbTrendFollowing {
    /// `period` must be at least 2 so the oscillator period (`period / 2`) is positive.
    pub fn new(period: usize, devfactor: f64, oscillator: Oscillator) -> Self {
        let params = StrategyParams::new()
            .with("p", period as i64)
            .with("df", devfactor)
            .with("ind", oscillator.name());
        Self {
            label: StrategyDefinition::new(NAME, params).to_string(),
            period,
            devfactor,
            oscillator,
        }
    }

    fn oscillator_period(&self) -> usize {
        self.period / 2
    }

    /// Registry factory. Defaults: `p=20, df=2.0, ind=MFI`.
    pub fn from_params(params: &StrategyParams) -> Result<Box<dyn SignalGenerator>, TastratError> {
        params.reject_unknown(NAME, &["p", "df", "ind"])?;
        let period = params.period(NAME, "p", 20)?;
        if period < 2 {
            return Err(TastratError::InvalidParameter {
                strategy: NAME.to_string(),
                key: "p".to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        let devfactor = devfactor(params, NAME)?;
        let oscillator = Oscillator::from_param(params, NAME, "ind", Oscillator::Mfi, &[Oscillator::Rsi, Oscillator::Mfi])?;
        Ok(Box::new(Self::new(period, devfactor, oscillator)))
    }
}

impl SignalGenerator for BbTrendFollowing {
    fn name(&self) -> &str {
        &self.label
    }

    fn min_history(&self) -> usize {
        self.period
            .max(self.oscillator.min_history(self.oscillator_period()))
    }

    fn requires_volume(&self) -> bool {
        self.oscillator.requires_volume()
    }

    fn generate(&self, bars: &[Bar]) -> Vec<Signal> {
        self.generate_with_stop(bars, None)
    }

    fn generate_with_stop(&self, bars: &[Bar], stop_loss_pct: Option<f64>) -> Vec<Signal> {
        let bands = calculate_bollinger(bars, self.period, mult_to_x100(self.devfactor));
        let oscillator = simple_values(&self.oscillator.calculate(bars, self.oscillator_period()));

        let entry = |i: usize| {
            let Some((upper, _, lower)) = bands.bands_at(i) else {
                return false;
            };
            let strong = percent_b(bars[i].close, upper, lower).is_some_and(|b| b > PERCENT_B_ENTRY);
            strong && oscillator[i].is_some_and(|v| v > OSCILLATOR_ENTRY)
        };
        let exit = |i: usize| bands.bands_at(i).is_some_and(|(_, _, lower)| bars[i].close < lower);

        long_only_latch(bars, self.min_history() - 1, stop_loss_pct, entry, exit)
    }
}
