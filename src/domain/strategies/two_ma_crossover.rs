//! Fast/slow moving average crossover.

use super::{simple_values, MovingAverage};
use crate::domain::error::TastratError;
use crate::domain::ohlcv::Bar;
use crate::domain::signal::{long_only_latch, Signal, SignalGenerator};
use crate::domain::strategy::{StrategyDefinition, StrategyParams};

pub const NAME: &str = "TwoMACrossover";

#[derive(Debug, Clone)]
pub struct TwoMaCrossover {
    label: String,
    average: MovingAverage,
    fast_period: usize,
    slow_period: usize,
}

impl TwoMaCrossover {
    pub fn new(average: MovingAverage, fast_period: usize, slow_period: usize) -> Self {
        let params = StrategyParams::new()
            .with("ma_ind", average.name())
            .with("f_p", fast_period as i64)
            .with("s_p", slow_period as i64);
        Self {
            label: StrategyDefinition::new(NAME, params).to_string(),
            average,
            fast_period,
            slow_period,
        }
    }

    /// Registry factory. Defaults: `ma_ind=SMA, f_p=5, s_p=20`.
    pub fn from_params(params: &StrategyParams) -> Result<Box<dyn SignalGenerator>, TastratError> {
        params.reject_unknown(NAME, &["ma_ind", "f_p", "s_p"])?;
        let average = MovingAverage::from_param(params, NAME, "ma_ind")?;
        let fast_period = params.period(NAME, "f_p", 5)?;
        let slow_period = params.period(NAME, "s_p", 20)?;
        Ok(Box::new(Self::new(average, fast_period, slow_period)))
    }
}

impl SignalGenerator for TwoMaCrossover {
    fn name(&self) -> &str {
        &self.label
    }

    fn min_history(&self) -> usize {
        self.fast_period.max(self.slow_period)
    }

    fn generate(&self, bars: &[Bar]) -> Vec<Signal> {
        self.generate_with_stop(bars, None)
    }

    fn generate_with_stop(&self, bars: &[Bar], stop_loss_pct: Option<f64>) -> Vec<Signal> {
        let fast = simple_values(&self.average.calculate(bars, self.fast_period));
        let slow = simple_values(&self.average.calculate(bars, self.slow_period));
        let spread = |i: usize| Some(fast[i]? - slow[i]?);
        long_only_latch(
            bars,
            self.min_history() - 1,
            stop_loss_pct,
            |i| spread(i).is_some_and(|d| d > 0.0),
            |i| spread(i).is_some_and(|d| d < 0.0),
        )
    }
}
