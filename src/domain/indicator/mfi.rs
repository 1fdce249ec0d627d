//! Money Flow Index.
//!
//! Raw money flow = typical price * volume. A bar's flow is positive when its
//! typical price rose against the previous bar, negative when it fell.
//! MFI = 100 * positive / (positive + negative) over the last n flows.
//! No flow in either direction yields 50. Missing volume counts as zero.
//!
//! Warmup: first n bars are invalid (the first bar has no prior typical price).

use crate::domain::indicator::{warmup_point, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::Bar;

pub fn calculate_mfi(bars: &[Bar], period: usize) -> IndicatorSeries {
    // (positive, negative) flow per bar; index 0 has none
    let flows: Vec<(f64, f64)> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                return (0.0, 0.0);
            }
            let tp = bar.typical_price();
            let prev_tp = bars[i - 1].typical_price();
            let raw = tp * bar.volume.unwrap_or(0.0);
            if tp > prev_tp {
                (raw, 0.0)
            } else if tp < prev_tp {
                (0.0, raw)
            } else {
                (0.0, 0.0)
            }
        })
        .collect();

    let mut values = Vec::with_capacity(bars.len());
    let mut positive = 0.0;
    let mut negative = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        positive += flows[i].0;
        negative += flows[i].1;
        if period > 0 && i > period {
            positive -= flows[i - period].0;
            negative -= flows[i - period].1;
        }

        if period == 0 || i < period {
            values.push(warmup_point(bar.timestamp, IndicatorValue::Simple(0.0)));
            continue;
        }

        let total = positive + negative;
        let mfi = if total > 0.0 {
            100.0 * positive / total
        } else {
            50.0
        };
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::Simple(mfi),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Mfi(period),
        values,
    }
}
