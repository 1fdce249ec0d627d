//! Moving average vs price: enter when the average sits above the close,
//! exit when it drops below.

use super::{simple_values, MovingAverage};
use crate::domain::error::TastratError;
use crate::domain::ohlcv::Bar;
use crate::domain::signal::{long_only_latch, Signal, SignalGenerator};
use crate::domain::strategy::{StrategyDefinition, StrategyParams};

pub const NAME: &str = "MAPriceCrossover";

#[derive(Debug, Clone)]
pub struct MaPriceCrossover {
    label: String,
    average: MovingAverage,
    period: usize,
}

impl MaPriceCrossover {
    pub fn new(average: MovingAverage, period: usize) -> Self {
        let params = StrategyParams::new()
            .with("ma_ind", average.name())
            .with("p", period as i64);
        Self {
            label: StrategyDefinition::new(NAME, params).to_string(),
            average,
            period,
        }
    }

    /// Registry factory. Defaults: `ma_ind=SMA, p=5`.
    pub fn from_params(params: &StrategyParams) -> Result<Box<dyn SignalGenerator>, TastratError> {
        params.reject_unknown(NAME, &["ma_ind", "p"])?;
        let average = MovingAverage::from_param(params, NAME, "ma_ind")?;
        let period = params.period(NAME, "p", 5)?;
        Ok(Box::new(Self::new(average, period)))
    }
}

impl SignalGenerator for MaPriceCrossover {
    fn name(&self) -> &str {
        &self.label
    }

    fn min_history(&self) -> usize {
        self.period
    }

    fn generate(&self, bars: &[Bar]) -> Vec<Signal> {
        self.generate_with_stop(bars, None)
    }

    fn generate_with_stop(&self, bars: &[Bar], stop_loss_pct: Option<f64>) -> Vec<Signal> {
        let ma = simple_values(&self.average.calculate(bars, self.period));
        long_only_latch(
            bars,
            self.min_history() - 1,
            stop_loss_pct,
            |i| ma[i].is_some_and(|m| m > bars[i].close),
            |i| ma[i].is_some_and(|m| m < bars[i].close),
        )
    }
}
