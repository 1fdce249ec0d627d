//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Warmup: first (period-1) bars are invalid.

use crate::domain::indicator::{warmup_point, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Bar;

pub fn calculate_bollinger(bars: &[Bar], period: usize, stddev_mult_x100: u32) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mult = stddev_mult_x100 as f64 / 100.0;

    for (i, bar) in bars.iter().enumerate() {
        if period == 0 || i + 1 < period {
            values.push(warmup_point(
                bar.timestamp,
                IndicatorValue::Bollinger {
                    upper: 0.0,
                    middle: 0.0,
                    lower: 0.0,
                },
            ));
            continue;
        }

        let window = &bars[i + 1 - period..=i];
        let middle: f64 = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
        let variance: f64 = window
            .iter()
            .map(|b| {
                let diff = b.close - middle;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        let stddev = variance.sqrt();

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::Bollinger {
                upper: middle + mult * stddev,
                middle,
                lower: middle - mult * stddev,
            },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        },
        values,
    }
}

/// %B: position of `close` within the bands (0 at lower, 1 at upper).
/// `None` when the bands have zero width.
pub fn percent_b(close: f64, upper: f64, lower: f64) -> Option<f64> {
    let width = upper - lower;
    (width > 0.0).then(|| (close - lower) / width)
}

/// Band width relative to the middle band: (upper - lower) / middle.
pub fn band_width(upper: f64, middle: f64, lower: f64) -> Option<f64> {
    (middle != 0.0).then(|| (upper - lower) / middle)
}

/// Converts a deviation factor such as 1.9 to the hundredths used as the
/// indicator key.
pub fn mult_to_x100(devfactor: f64) -> u32 {
    (devfactor * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::make_bars;

    #[test]
    fn bollinger_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_bollinger(&bars, 3, 200);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn bollinger_constant_values() {
        let bars = make_bars(&[100.0, 100.0, 100.0, 100.0, 100.0]);
        let series = calculate_bollinger(&bars, 3, 200);

        let (upper, middle, lower) = series.bands_at(2).unwrap();
        assert!((middle - 100.0).abs() < f64::EPSILON);
        assert!((upper - 100.0).abs() < f64::EPSILON);
        assert!((lower - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bollinger_basic_calculation() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_bollinger(&bars, 3, 200);

        let (upper, middle, lower) = series.bands_at(2).unwrap();
        let expected_middle: f64 = 20.0;
        let variance: f64 = (100.0 + 0.0 + 100.0) / 3.0;
        let stddev = variance.sqrt();

        assert!((middle - expected_middle).abs() < 1e-10);
        assert!((upper - (expected_middle + 2.0 * stddev)).abs() < 1e-10);
        assert!((lower - (expected_middle - 2.0 * stddev)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_symmetry() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_bollinger(&bars, 3, 190);

        let (upper, middle, lower) = series.bands_at(2).unwrap();
        assert!(((upper - middle) - (middle - lower)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_indicator_type() {
        let series = calculate_bollinger(&make_bars(&[10.0]), 20, 210);
        assert_eq!(
            series.indicator_type,
            IndicatorType::Bollinger {
                period: 20,
                stddev_mult_x100: 210
            }
        );
    }

    #[test]
    fn percent_b_positions() {
        assert_eq!(percent_b(110.0, 110.0, 90.0), Some(1.0));
        assert_eq!(percent_b(90.0, 110.0, 90.0), Some(0.0));
        assert_eq!(percent_b(100.0, 110.0, 90.0), Some(0.5));
        assert_eq!(percent_b(100.0, 100.0, 100.0), None);
    }

    #[test]
    fn band_width_relative_to_middle() {
        assert_eq!(band_width(110.0, 100.0, 90.0), Some(0.2));
        assert_eq!(band_width(1.0, 0.0, -1.0), None);
    }

    #[test]
    fn devfactor_conversion() {
        assert_eq!(mult_to_x100(2.0), 200);
        assert_eq!(mult_to_x100(1.9), 190);
        assert_eq!(mult_to_x100(2.1), 210);
    }
}
