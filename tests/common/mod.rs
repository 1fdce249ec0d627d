#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::cell::RefCell;
use std::collections::HashMap;
use tastrat::domain::batch::JobOutcome;
use tastrat::domain::error::TastratError;
pub use tastrat::domain::ohlcv::{Bar, OhlcSeries};
use tastrat::domain::returns::ReturnPeriod;
pub use tastrat::domain::signal::{Signal, SignalGenerator};
use tastrat::ports::data_port::DataPort;
use tastrat::ports::report_port::ReportPort;

pub struct MockDataPort {
    pub data: HashMap<String, OhlcSeries>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series: OhlcSeries) -> Self {
        self.data.insert(series.instrument().to_string(), series);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors.insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn load_series(&self, instrument: &str) -> Result<OhlcSeries, TastratError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(TastratError::DataLoad {
                instrument: instrument.to_string(),
                reason: reason.clone(),
            });
        }
        self.data
            .get(instrument)
            .cloned()
            .ok_or_else(|| TastratError::NoData {
                instrument: instrument.to_string(),
            })
    }

    fn list_instruments(&self) -> Result<Vec<String>, TastratError> {
        let mut instruments: Vec<String> = self.data.keys().cloned().collect();
        instruments.sort();
        Ok(instruments)
    }
}

/// Records what would have been written, as (label, ok) pairs.
pub struct MemoryReportPort {
    pub written: RefCell<Vec<(String, bool)>>,
    pub period: RefCell<Option<ReturnPeriod>>,
}

impl MemoryReportPort {
    pub fn new() -> Self {
        Self {
            written: RefCell::new(Vec::new()),
            period: RefCell::new(None),
        }
    }
}

impl ReportPort for MemoryReportPort {
    fn write(&self, outcomes: &[JobOutcome], period: ReturnPeriod) -> Result<(), TastratError> {
        self.written
            .borrow_mut()
            .extend(outcomes.iter().map(|o| (o.job.label(), o.is_ok())));
        *self.period.borrow_mut() = Some(period);
        Ok(())
    }
}

/// Signals taken verbatim from a script.
pub struct Scripted {
    pub signals: Vec<Signal>,
    pub min_history: usize,
}

impl Scripted {
    pub fn new(signals: &[Signal]) -> Self {
        Self {
            signals: signals.to_vec(),
            min_history: 1,
        }
    }
}

impl SignalGenerator for Scripted {
    fn name(&self) -> &str {
        "Scripted()"
    }

    fn min_history(&self) -> usize {
        self.min_history
    }

    fn generate(&self, bars: &[Bar]) -> Vec<Signal> {
        (0..bars.len())
            .map(|i| self.signals.get(i).copied().unwrap_or_default())
            .collect()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day(i: usize) -> NaiveDateTime {
    (date(2024, 1, 1) + chrono::Days::new(i as u64))
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_bar(i: usize, close: f64) -> Bar {
    Bar {
        timestamp: day(i),
        open: close,
        high: close,
        low: close,
        close,
        volume: Some(1000.0),
    }
}

pub fn make_series(instrument: &str, closes: &[f64]) -> OhlcSeries {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c))
        .collect();
    OhlcSeries::new(instrument, bars).unwrap()
}

/// A daily series with intraday range and volume, driven by a few sine waves.
pub fn generate_series(instrument: &str, count: usize, start_price: f64) -> OhlcSeries {
    let bars = (0..count)
        .map(|i| {
            let t = i as f64;
            let close = start_price * (1.0 + 0.08 * (t / 9.0).sin() + 0.03 * (t / 2.3).cos() + 0.0005 * t);
            let open = start_price * (1.0 + 0.08 * ((t - 0.5) / 9.0).sin() + 0.03 * ((t - 0.5) / 2.3).cos() + 0.0005 * t);
            let spread = start_price * 0.01 * (1.0 + (t / 5.0).sin().abs());
            Bar {
                timestamp: day(i),
                open,
                high: open.max(close) + spread,
                low: open.min(close) - spread,
                close,
                volume: Some(1000.0 + 400.0 * (t / 3.0).sin()),
            }
        })
        .collect();
    OhlcSeries::new(instrument, bars).unwrap()
}

/// Yahoo-style CSV text for a series.
pub fn to_yahoo_csv(series: &OhlcSeries) -> String {
    let mut out = String::from("Date,Open,High,Low,Close,Adj Close,Volume\n");
    for bar in series.bars() {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            bar.timestamp.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.close,
            bar.volume.unwrap_or(0.0)
        ));
    }
    out
}
