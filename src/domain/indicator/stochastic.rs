//! Fast Stochastic oscillator.
//!
//! %K = 100 * (C - LL(n)) / (HH(n) - LL(n)), %D = SMA(d) of %K.
//! A zero-width range yields %K = 50.
//! The point is valid once %D is defined: the first (n-1)+(d-1) bars are invalid.

use crate::domain::indicator::{warmup_point, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::indicator_helpers::high_low_range;
use crate::domain::ohlcv::Bar;

pub fn calculate_stochastic_fast(bars: &[Bar], k_period: usize, d_period: usize) -> IndicatorSeries {
    let ranges = high_low_range(bars, k_period);
    let percent_k: Vec<Option<f64>> = bars
        .iter()
        .zip(&ranges)
        .map(|(bar, range)| {
            let (highest, lowest) = (*range)?;
            let width = highest - lowest;
            Some(if width > 0.0 {
                100.0 * (bar.close - lowest) / width
            } else {
                50.0
            })
        })
        .collect();

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let d = mean_of_window(&percent_k, i, d_period);
            match (percent_k[i], d) {
                (Some(k), Some(d)) => IndicatorPoint {
                    timestamp: bar.timestamp,
                    valid: true,
                    value: IndicatorValue::Stochastic { k, d },
                },
                _ => warmup_point(bar.timestamp, IndicatorValue::Stochastic { k: 0.0, d: 0.0 }),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::StochasticFast { k_period, d_period },
        values,
    }
}

fn mean_of_window(values: &[Option<f64>], end: usize, period: usize) -> Option<f64> {
    if period == 0 || end + 1 < period {
        return None;
    }
    let sum = values[end + 1 - period..=end]
        .iter()
        .copied()
        .sum::<Option<f64>>()?;
    Some(sum / period as f64)
}
