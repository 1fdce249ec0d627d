//! Oscillator threshold strategy: buy oversold, sell overbought.

use super::{simple_values, Oscillator};
use crate::domain::error::TastratError;
use crate::domain::ohlcv::Bar;
use crate::domain::signal::{long_only_latch, Signal, SignalGenerator};
use crate::domain::strategy::{ParamValue, StrategyDefinition, StrategyParams};

pub const NAME: &str = "OscillatorValue";

#[derive(Debug, Clone)]
pub struct OscillatorValue {
    label: String,
    indicator: Oscillator,
    period: usize,
    oversold: f64,
    overbought: f64,
}

impl OscillatorValue {
    pub fn new(indicator: Oscillator, period: usize, oversold: f64, overbought: f64) -> Self {
        let params = StrategyParams::new()
            .with("ind", indicator.name())
            .with("p", period as i64)
            .with("os", ParamValue::number(oversold))
            .with("ob", ParamValue::number(overbought));
        Self {
            label: StrategyDefinition::new(NAME, params).to_string(),
            indicator,
            period,
            oversold,
            overbought,
        }
    }

    /// Registry factory. Defaults: `ind=RSI, p=14, os=30, ob=70`.
    pub fn from_params(params: &StrategyParams) -> Result<Box<dyn SignalGenerator>, TastratError> {
        params.reject_unknown(NAME, &["ind", "p", "os", "ob"])?;
        let indicator = Oscillator::from_param(
            params,
            NAME,
            "ind",
            Oscillator::Rsi,
            &[Oscillator::Rsi, Oscillator::StochasticFast, Oscillator::Mfi],
        )?;
        let period = params.period(NAME, "p", 14)?;
        let oversold = params.number(NAME, "os", 30.0)?;
        let overbought = params.number(NAME, "ob", 70.0)?;
        Ok(Box::new(Self::new(indicator, period, oversold, overbought)))
    }
}

impl SignalGenerator for OscillatorValue {
    fn name(&self) -> &str {
        &self.label
    }

    fn min_history(&self) -> usize {
        self.indicator.min_history(self.period)
    }

    fn requires_volume(&self) -> bool {
        self.indicator.requires_volume()
    }

    fn generate(&self, bars: &[Bar]) -> Vec<Signal> {
        self.generate_with_stop(bars, None)
    }

    fn generate_with_stop(&self, bars: &[Bar], stop_loss_pct: Option<f64>) -> Vec<Signal> {
        let values = simple_values(&self.indicator.calculate(bars, self.period));
        long_only_latch(
            bars,
            self.min_history() - 1,
            stop_loss_pct,
            |i| values[i].is_some_and(|v| v < self.oversold),
            |i| values[i].is_some_and(|v| v > self.overbought),
        )
    }
}
