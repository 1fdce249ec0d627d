//! Simple Moving Average.
//!
//! Running-sum implementation. Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{warmup_point, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Bar;

pub fn calculate_sma(bars: &[Bar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += bar.close;
        if period > 0 && i >= period {
            sum -= bars[i - period].close;
        }

        if period == 0 || i + 1 < period {
            values.push(warmup_point(bar.timestamp, IndicatorValue::Simple(0.0)));
        } else {
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: true,
                value: IndicatorValue::Simple(sum / period as f64),
            });
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::make_bars;

    #[test]
    fn sma_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0]);
        let series = calculate_sma(&bars, 3);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
    }

    #[test]
    fn sma_rolling_window() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_sma(&bars, 3);
        assert!((series.simple_at(2).unwrap() - 20.0).abs() < 1e-12);
        assert!((series.simple_at(3).unwrap() - 30.0).abs() < 1e-12);
        assert!((series.simple_at(4).unwrap() - 40.0).abs() < 1e-12);
    }

    #[test]
    fn sma_period_0_is_never_valid() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_sma(&bars, 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn sma_indicator_type() {
        let series = calculate_sma(&make_bars(&[1.0]), 5);
        assert_eq!(series.indicator_type, IndicatorType::Sma(5));
    }
}
