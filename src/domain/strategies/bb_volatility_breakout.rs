//! Bollinger volatility breakout: buy a close above the upper band while the
//! band width sits at its lowest over the lookback, exit below the lower band.

use super::devfactor;
use crate::domain::error::TastratError;
use crate::domain::indicator::bollinger::{band_width, calculate_bollinger, mult_to_x100};
use crate::domain::indicator_helpers::rolling_lowest;
use crate::domain::ohlcv::Bar;
use crate::domain::signal::{long_only_latch, Signal, SignalGenerator};
use crate::domain::strategy::{StrategyDefinition, StrategyParams};

pub const NAME: &str = "BBVolatilityBreakout";

#[derive(Debug, Clone)]
pub struct BbVolatilityBreakout {
    label: String,
    period: usize,
    devfactor: f64,
    lookback: usize,
}

impl BbVolatilityBreakout {
    pub fn new(period: usize, devfactor: f64, lookback: usize) -> Self {
        let params = StrategyParams::new()
            .with("p", period as i64)
            .with("df", devfactor)
            .with("lb_p", lookback as i64);
        Self {
            label: StrategyDefinition::new(NAME, params).to_string(),
            period,
            devfactor,
            lookback,
        }
    }

    /// Registry factory. Defaults: `p=20, df=2.0, lb_p=180`.
    pub fn from_params(params: &StrategyParams) -> Result<Box<dyn SignalGenerator>, TastratError> {
        params.reject_unknown(NAME, &["p", "df", "lb_p"])?;
        let period = params.period(NAME, "p", 20)?;
        let devfactor = devfactor(params, NAME)?;
        let lookback = params.period(NAME, "lb_p", 180)?;
        Ok(Box::new(Self::new(period, devfactor, lookback)))
    }
}

impl SignalGenerator for BbVolatilityBreakout {
    fn name(&self) -> &str {
        &self.label
    }

    /// Bands need `period` bars; the lowest width then needs `lookback` band values.
    fn min_history(&self) -> usize {
        self.period + self.lookback - 1
    }

    fn generate(&self, bars: &[Bar]) -> Vec<Signal> {
        self.generate_with_stop(bars, None)
    }

    fn generate_with_stop(&self, bars: &[Bar], stop_loss_pct: Option<f64>) -> Vec<Signal> {
        let bands = calculate_bollinger(bars, self.period, mult_to_x100(self.devfactor));
        let widths: Vec<Option<f64>> = (0..bars.len())
            .map(|i| {
                let (upper, middle, lower) = bands.bands_at(i)?;
                band_width(upper, middle, lower)
            })
            .collect();
        let lowest = rolling_lowest(&widths, self.lookback);

        let entry = |i: usize| match (bands.bands_at(i), widths[i], lowest[i]) {
            (Some((upper, _, _)), Some(width), Some(min_width)) => bars[i].close > upper && width <= min_width,
            _ => false,
        };
        let exit = |i: usize| bands.bands_at(i).is_some_and(|(_, _, lower)| bars[i].close < lower);

        long_only_latch(bars, self.min_history() - 1, stop_loss_pct, entry, exit)
    }
}
