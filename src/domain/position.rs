//! Position tracking: an explicit FLAT/LONG/SHORT state machine.
//!
//! [`transition`] is the pure (state, signal) step. [`PositionTracker`] drives it
//! over a signal stream, checking index continuity and applying the optional
//! stop-loss before each bar's signal.

use std::fmt;

use super::error::TastratError;
use super::signal::{Direction, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Long { entry_index: usize, entry_price: f64 },
    Short { entry_index: usize, entry_price: f64 },
}

impl PositionState {
    fn open(direction: Direction, fill: Fill) -> Self {
        match direction {
            Direction::Long => PositionState::Long {
                entry_index: fill.index,
                entry_price: fill.price,
            },
            Direction::Short => PositionState::Short {
                entry_index: fill.index,
                entry_price: fill.price,
            },
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            PositionState::Flat => None,
            PositionState::Long { .. } => Some(Direction::Long),
            PositionState::Short { .. } => Some(Direction::Short),
        }
    }

    /// Entry bar index and price of the open position.
    pub fn entry(&self) -> Option<(usize, f64)> {
        match *self {
            PositionState::Flat => None,
            PositionState::Long {
                entry_index,
                entry_price,
            }
            | PositionState::Short {
                entry_index,
                entry_price,
            } => Some((entry_index, entry_price)),
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    /// Whether `close` breaches a stop placed `pct` away from the entry price.
    pub fn stop_triggered(&self, close: f64, pct: f64) -> bool {
        match *self {
            PositionState::Flat => false,
            PositionState::Long { entry_price, .. } => close <= entry_price * (1.0 - pct),
            PositionState::Short { entry_price, .. } => close >= entry_price * (1.0 + pct),
        }
    }
}

/// Execution price for a bar's decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub index: usize,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    /// FLAT signal while in a position.
    Signal,
    /// Opposite signal: close and reopen in the same bar.
    Flip,
    StopLoss,
    /// Forced close at the last bar's close.
    EndOfSeries,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::Signal => "signal",
            ExitReason::Flip => "flip",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::EndOfSeries => "end_of_series",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenEvent {
    pub direction: Direction,
    pub index: usize,
    pub price: f64,
}

/// A closed position, before it becomes a trade record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloseEvent {
    pub direction: Direction,
    pub entry_index: usize,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_price: f64,
    pub reason: ExitReason,
}

/// Outcome of one step. On a flip both `closed` and `opened` are set, close first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: PositionState,
    pub closed: Option<CloseEvent>,
    pub opened: Option<OpenEvent>,
}

impl Transition {
    fn hold(state: PositionState) -> Self {
        Self {
            state,
            closed: None,
            opened: None,
        }
    }
}

fn close_event(state: PositionState, fill: Fill, reason: ExitReason) -> Option<CloseEvent> {
    let direction = state.direction()?;
    let (entry_index, entry_price) = state.entry()?;
    Some(CloseEvent {
        direction,
        entry_index,
        entry_price,
        exit_index: fill.index,
        exit_price: fill.price,
        reason,
    })
}

/// Pure transition for one signal, executed at `fill`.
pub fn transition(state: PositionState, signal: Signal, fill: Fill) -> Transition {
    match (state.direction(), signal.direction()) {
        (None, None) => Transition::hold(state),
        (Some(held), Some(wanted)) if held == wanted => Transition::hold(state),
        (None, Some(wanted)) => Transition {
            state: PositionState::open(wanted, fill),
            closed: None,
            opened: Some(OpenEvent {
                direction: wanted,
                index: fill.index,
                price: fill.price,
            }),
        },
        (Some(_), None) => Transition {
            state: PositionState::Flat,
            closed: close_event(state, fill, ExitReason::Signal),
            opened: None,
        },
        (Some(_), Some(wanted)) => Transition {
            state: PositionState::open(wanted, fill),
            closed: close_event(state, fill, ExitReason::Flip),
            opened: Some(OpenEvent {
                direction: wanted,
                index: fill.index,
                price: fill.price,
            }),
        },
    }
}

/// Pure stop-out: closes any open position at `fill`.
pub fn stop_out(state: PositionState, fill: Fill) -> Transition {
    Transition {
        state: PositionState::Flat,
        closed: close_event(state, fill, ExitReason::StopLoss),
        opened: None,
    }
}

/// Drives [`transition`] over a signal stream, one bar at a time.
///
/// After a stop-loss exit the stopped direction is not re-entered until the
/// signal first leaves that direction.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    state: PositionState,
    next_index: usize,
    stop_loss_pct: Option<f64>,
    stopped: Option<Direction>,
}

impl PositionTracker {
    pub fn new(stop_loss_pct: Option<f64>) -> Self {
        Self {
            stop_loss_pct: stop_loss_pct.filter(|pct| *pct > 0.0),
            ..Self::default()
        }
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    /// Processes the signal for bar `index`.
    ///
    /// `close` is the bar's close, used for the stop check. `fill` is where a
    /// decision executes; `None` means the decision cannot be filled and the
    /// position is left untouched.
    pub fn step(
        &mut self,
        index: usize,
        signal: Signal,
        close: f64,
        fill: Option<Fill>,
    ) -> Result<Transition, TastratError> {
        if index != self.next_index {
            return Err(TastratError::InvalidSignalSequence {
                reason: format!("expected bar {}, got bar {}", self.next_index, index),
            });
        }
        self.next_index += 1;

        let Some(fill) = fill else {
            return Ok(Transition::hold(self.state));
        };
        if fill.index < index {
            return Err(TastratError::InvalidSignalSequence {
                reason: format!("fill at bar {} precedes signal bar {}", fill.index, index),
            });
        }
        if let Some((entry_index, _)) = self.state.entry() {
            if fill.index < entry_index {
                return Err(TastratError::InvalidSignalSequence {
                    reason: format!("fill at bar {} precedes entry at bar {}", fill.index, entry_index),
                });
            }
        }

        if let Some(pct) = self.stop_loss_pct {
            if self.state.stop_triggered(close, pct) {
                // A signal that already left the stopped direction re-arms entry.
                self.stopped = self.state.direction().filter(|d| signal.direction() == Some(*d));
                let step = stop_out(self.state, fill);
                self.state = step.state;
                return Ok(step);
            }
        }

        let signal = match (self.stopped, signal.direction()) {
            (Some(stopped), Some(wanted)) if stopped == wanted => Signal::Flat,
            _ => {
                self.stopped = None;
                signal
            }
        };

        let step = transition(self.state, signal, fill);
        self.state = step.state;
        Ok(step)
    }

    /// Force-closes an open position at `fill` (end-of-series liquidation).
    pub fn liquidate(&mut self, fill: Fill) -> Option<CloseEvent> {
        let event = close_event(self.state, fill, ExitReason::EndOfSeries);
        self.state = PositionState::Flat;
        event
    }
}
