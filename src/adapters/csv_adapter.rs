//! CSV file data adapter for Yahoo-style daily price files.
//!
//! Reads `<dir>/<INSTRUMENT>.csv` with a header naming at least `Date`, `Open`,
//! `High`, `Low` and `Close`; `Volume` is optional and `Adj Close` is ignored.
//! Rows with `null` or empty price fields (non-trading days) are skipped.

use crate::domain::error::TastratError;
use crate::domain::ohlcv::{Bar, OhlcSeries};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvDataAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl CsvDataAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument))
    }

    /// Parses CSV content for `instrument`. Rows may appear in any order.
    pub fn parse(instrument: &str, content: &str) -> Result<OhlcSeries, TastratError> {
        let load_error = |reason: String| TastratError::DataLoad {
            instrument: instrument.to_string(),
            reason,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| load_error(format!("CSV header error: {}", e)))?
            .clone();
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let require = |name: &str| find(name).ok_or_else(|| load_error(format!("missing {} column", name)));
        let columns = Columns {
            date: require("Date")?,
            open: require("Open")?,
            high: require("High")?,
            low: require("Low")?,
            close: require("Close")?,
            volume: find("Volume"),
        };

        let mut bars = Vec::new();
        let mut skipped = 0usize;

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| load_error(format!("CSV parse error: {}", e)))?;
            let field = |index: usize| record.get(index).unwrap_or("");

            let prices = [columns.open, columns.high, columns.low, columns.close].map(field);
            if prices.iter().any(|p| p.is_empty() || p.eq_ignore_ascii_case("null")) {
                skipped += 1;
                continue;
            }

            let timestamp = parse_timestamp(field(columns.date))
                .ok_or_else(|| load_error(format!("invalid date '{}' on row {}", field(columns.date), line + 1)))?;
            let [open, high, low, close] = prices.map(|p| p.parse::<f64>());
            let parse_failed = |e: std::num::ParseFloatError| load_error(format!("invalid price on row {}: {}", line + 1, e));

            let volume = match columns.volume.map(field) {
                None | Some("") => None,
                Some(v) if v.eq_ignore_ascii_case("null") => None,
                Some(v) => Some(
                    v.parse::<f64>()
                        .map_err(|e| load_error(format!("invalid volume on row {}: {}", line + 1, e)))?,
                ),
            };

            bars.push(Bar {
                timestamp,
                open: open.map_err(parse_failed)?,
                high: high.map_err(parse_failed)?,
                low: low.map_err(parse_failed)?,
                close: close.map_err(parse_failed)?,
                volume,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        debug!(instrument, bars = bars.len(), skipped, "loaded CSV series");
        OhlcSeries::new(instrument, bars)
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts);
    }
    // plain dates, or dates followed by a time zone suffix
    let date = raw.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl DataPort for CsvDataAdapter {
    fn load_series(&self, instrument: &str) -> Result<OhlcSeries, TastratError> {
        let path = self.csv_path(instrument);
        let content = fs::read_to_string(&path).map_err(|e| TastratError::DataLoad {
            instrument: instrument.to_string(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::parse(instrument, &content)
    }

    fn list_instruments(&self) -> Result<Vec<String>, TastratError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut instruments = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    instruments.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        instruments.sort();
        Ok(instruments)
    }
}
