//! Closed trades and the per-run trade recorder.

use chrono::NaiveDateTime;

use super::error::TastratError;
use super::ohlcv::Bar;
use super::position::{CloseEvent, ExitReason};
use super::signal::Direction;

/// A completed round trip. Immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub direction: Direction,
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    /// Fractional return, e.g. 0.05 for +5%.
    pub return_rate: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn bars_held(&self) -> usize {
        self.exit_index - self.entry_index
    }

    pub fn is_win(&self) -> bool {
        self.return_rate > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.return_rate < 0.0
    }
}

/// Accumulates trades for one backtest run, in close order.
#[derive(Debug, Default)]
pub struct TradeRecorder {
    trades: Vec<Trade>,
}

impl TradeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a close event into a [`Trade`] and appends it.
    ///
    /// Fails if the event references bars outside `bars` or would overlap the
    /// previously recorded trade.
    pub fn record(&mut self, event: &CloseEvent, bars: &[Bar]) -> Result<&Trade, TastratError> {
        if event.exit_index < event.entry_index {
            return Err(TastratError::InvalidSignalSequence {
                reason: format!(
                    "trade exits at bar {} before entry at bar {}",
                    event.exit_index, event.entry_index
                ),
            });
        }
        if let Some(last) = self.trades.last() {
            if event.entry_index < last.exit_index {
                return Err(TastratError::InvalidSignalSequence {
                    reason: format!(
                        "trade entered at bar {} overlaps trade closed at bar {}",
                        event.entry_index, last.exit_index
                    ),
                });
            }
        }

        let entry_bar = bar_at(bars, event.entry_index)?;
        let exit_bar = bar_at(bars, event.exit_index)?;

        self.trades.push(Trade {
            direction: event.direction,
            entry_index: event.entry_index,
            entry_time: entry_bar.timestamp,
            entry_price: event.entry_price,
            exit_index: event.exit_index,
            exit_time: exit_bar.timestamp,
            exit_price: event.exit_price,
            return_rate: event.direction.trade_return(event.entry_price, event.exit_price),
            exit_reason: event.reason,
        });
        Ok(&self.trades[self.trades.len() - 1])
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }
}

fn bar_at(bars: &[Bar], index: usize) -> Result<&Bar, TastratError> {
    bars.get(index).ok_or_else(|| TastratError::InvalidSignalSequence {
        reason: format!("bar {} is outside a series of {} bars", index, bars.len()),
    })
}
