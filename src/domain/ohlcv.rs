//! OHLC bar and series representation.

use chrono::NaiveDateTime;

use super::error::TastratError;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

impl Bar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    fn validate(&self, index: usize) -> Result<(), TastratError> {
        let invalid = |reason: &str| TastratError::InvalidBar {
            index,
            reason: reason.to_string(),
        };

        if ![self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite())
        {
            return Err(invalid("non-finite price"));
        }
        if self.high < self.open.max(self.close) {
            return Err(invalid("high below open/close"));
        }
        if self.low > self.open.min(self.close) {
            return Err(invalid("low above open/close"));
        }
        if let Some(v) = self.volume {
            if !v.is_finite() || v < 0.0 {
                return Err(invalid("negative or non-finite volume"));
            }
        }
        Ok(())
    }
}

/// Time-ordered bars for one instrument. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcSeries {
    instrument: String,
    bars: Vec<Bar>,
}

impl OhlcSeries {
    /// Build a series, rejecting bars that break the OHLC invariants or
    /// timestamps that are not strictly increasing.
    pub fn new(instrument: impl Into<String>, bars: Vec<Bar>) -> Result<Self, TastratError> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate(i)?;
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                return Err(TastratError::UnorderedSeries { index: i });
            }
        }
        Ok(Self {
            instrument: instrument.into(),
            bars,
        })
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// FX feeds usually report zero volume on every bar.
    pub fn has_volume(&self) -> bool {
        self.bars
            .iter()
            .any(|b| b.volume.is_some_and(|v| v > 0.0))
    }
}
