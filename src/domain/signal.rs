//! Directional signals and the signal generator capability.

use std::fmt;

use super::ohlcv::Bar;

/// Directional decision for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    Long,
    Short,
    #[default]
    Flat,
}

/// Direction of an open position or closed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Long,
    Short,
}

impl Signal {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Signal::Long => Some(Direction::Long),
            Signal::Short => Some(Direction::Short),
            Signal::Flat => None,
        }
    }
}

impl Direction {
    /// Fractional return of a round trip in this direction.
    pub fn trade_return(self, entry_price: f64, exit_price: f64) -> f64 {
        match self {
            Direction::Long => (exit_price - entry_price) / entry_price,
            Direction::Short => (entry_price - exit_price) / entry_price,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Long => write!(f, "LONG"),
            Signal::Short => write!(f, "SHORT"),
            Signal::Flat => write!(f, "FLAT"),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Produces one signal per bar from price history.
///
/// # Look-ahead invariant
/// The signal at index `i` must depend only on `bars[..=i]`. Generating on a
/// prefix of a series must reproduce the same prefix of signals.
pub trait SignalGenerator: Send + Sync {
    /// Label including parameters, e.g. `TwoMACrossover(f_p=5,ma_ind=SMA,s_p=20)`.
    fn name(&self) -> &str;

    /// Bars needed before the first decision. The first decision is made at
    /// index `min_history() - 1`; earlier indices are FLAT.
    fn min_history(&self) -> usize;

    fn requires_volume(&self) -> bool {
        false
    }

    /// One signal per bar, `bars.len()` in total.
    fn generate(&self, bars: &[Bar]) -> Vec<Signal>;

    /// Signals for a run that stops positions out at `stop_loss_pct` from the
    /// entry close. Generators that latch their own position drop to FLAT on the
    /// stop bar and look for a fresh entry from the next bar. The default
    /// ignores the stop.
    fn generate_with_stop(&self, bars: &[Bar], stop_loss_pct: Option<f64>) -> Vec<Signal> {
        let _ = stop_loss_pct;
        self.generate(bars)
    }
}

/// Latched long-only signal built from entry and exit conditions.
///
/// While FLAT only `entry` is consulted; while LONG only `exit` and the
/// optional stop are. The stop fires when a close falls to `stop_loss_pct`
/// below the close of the entry bar. Indices before `first_decision` are FLAT.
pub fn long_only_latch(
    bars: &[Bar],
    first_decision: usize,
    stop_loss_pct: Option<f64>,
    entry: impl Fn(usize) -> bool,
    exit: impl Fn(usize) -> bool,
) -> Vec<Signal> {
    let stop = stop_loss_pct.filter(|pct| *pct > 0.0);
    let stopped_out = |i: usize, entry_close: f64| stop.is_some_and(|pct| bars[i].close <= entry_close * (1.0 - pct));

    let mut signals = Vec::with_capacity(bars.len());
    let mut entry_close: Option<f64> = None;

    for (i, bar) in bars.iter().enumerate() {
        if i >= first_decision {
            entry_close = match entry_close {
                None if entry(i) => Some(bar.close),
                Some(price) if exit(i) || stopped_out(i, price) => None,
                held => held,
            };
        }
        signals.push(if entry_close.is_some() { Signal::Long } else { Signal::Flat });
    }

    signals
}
