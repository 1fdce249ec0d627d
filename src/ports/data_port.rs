//! Data access port trait.

use crate::domain::error::TastratError;
use crate::domain::ohlcv::OhlcSeries;

/// Source of validated OHLC series, one per instrument.
pub trait DataPort {
    fn load_series(&self, instrument: &str) -> Result<OhlcSeries, TastratError>;

    fn list_instruments(&self) -> Result<Vec<String>, TastratError>;
}
