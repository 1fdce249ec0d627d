//! Shared rolling-window helpers for indicator and signal calculations.

use crate::domain::ohlcv::Bar;

/// Lowest value over the trailing `period` entries ending at each index.
///
/// `None` until `period` consecutive defined values are available; any
/// undefined value inside the window makes that window undefined.
pub fn rolling_lowest(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling_fold(values, period, f64::min)
}

/// Highest value over the trailing `period` entries ending at each index.
pub fn rolling_highest(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling_fold(values, period, f64::max)
}

fn rolling_fold(values: &[Option<f64>], period: usize, pick: fn(f64, f64) -> f64) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return None;
            }
            values[i + 1 - period..=i]
                .iter()
                .try_fold(None, |acc: Option<f64>, v| {
                    let v = (*v)?;
                    Some(Some(acc.map_or(v, |a| pick(a, v))))
                })
                .flatten()
        })
        .collect()
}

/// Highest high and lowest low over the trailing `period` bars.
pub fn high_low_range(bars: &[Bar], period: usize) -> Vec<Option<(f64, f64)>> {
    let highs: Vec<Option<f64>> = bars.iter().map(|b| Some(b.high)).collect();
    let lows: Vec<Option<f64>> = bars.iter().map(|b| Some(b.low)).collect();
    rolling_highest(&highs, period)
        .into_iter()
        .zip(rolling_lowest(&lows, period))
        .map(|(h, l)| Some((h?, l?)))
        .collect()
}
