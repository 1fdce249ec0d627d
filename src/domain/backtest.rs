//! Backtest engine: signal generation, position tracking and trade recording
//! in one pass over a series, plus the derived equity curve.
//!
//! Policies:
//! - Fills happen at the signal bar's close by default, or at the next bar's
//!   open with [`FillPolicy::NextBarOpen`].
//! - A position still open after the last bar is force-closed at the last
//!   bar's close ([`ExitReason::EndOfSeries`](super::position::ExitReason)).
//! - Equity compounds `1 + position_fraction * return` at each trade's exit bar.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use tracing::debug;

use super::error::TastratError;
use super::ohlcv::{Bar, OhlcSeries};
use super::position::{Fill, PositionTracker};
use super::registry::StrategyRegistry;
use super::signal::{Signal, SignalGenerator};
use super::strategy::StrategyDefinition;
use super::trade::{Trade, TradeRecorder};

/// Where a bar's decision executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPolicy {
    #[default]
    SignalClose,
    /// The following bar's open. Decisions on the last bar are not filled.
    NextBarOpen,
}

impl FromStr for FillPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "close" | "signal_close" => Ok(FillPolicy::SignalClose),
            "next_open" | "next_bar_open" => Ok(FillPolicy::NextBarOpen),
            other => Err(format!("unknown fill policy '{other}', expected close or next_open")),
        }
    }
}

impl fmt::Display for FillPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillPolicy::SignalClose => write!(f, "close"),
            FillPolicy::NextBarOpen => write!(f, "next_open"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub fill: FillPolicy,
    /// Fraction of the entry price, e.g. 0.05. `None` disables the stop.
    pub stop_loss_pct: Option<f64>,
    /// Share of equity committed to each trade, in (0, 1].
    pub position_fraction: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            fill: FillPolicy::SignalClose,
            stop_loss_pct: None,
            position_fraction: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    /// Compounded return since the first bar, 0.0 at the start.
    pub cumulative_return: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub instrument: String,
    /// Generator label, e.g. `MAPriceCrossover(ma_ind=SMA,p=5)`.
    pub strategy: String,
    pub trades: Vec<Trade>,
    /// One point per bar.
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestResult {
    /// Run label, `strategy@instrument`.
    pub fn label(&self) -> String {
        format!("{}@{}", self.strategy, self.instrument)
    }

    pub fn final_return(&self) -> f64 {
        self.equity_curve
            .last()
            .map_or(0.0, |p| p.cumulative_return)
    }
}

/// Resolves strategy definitions through a registry and runs them.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    registry: StrategyRegistry,
    config: BacktestConfig,
}

impl Default for BacktestEngine {
    fn default() -> Self {
        Self::new(StrategyRegistry::with_builtin(), BacktestConfig::default())
    }
}

impl BacktestEngine {
    pub fn new(registry: StrategyRegistry, config: BacktestConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Runs one strategy over one series.
    pub fn run(&self, series: &OhlcSeries, definition: &StrategyDefinition) -> Result<BacktestResult, TastratError> {
        let generator = self.registry.resolve(definition)?;
        run_with_generator(series, generator.as_ref(), &self.config)
    }
}

/// Runs an already-built generator over `series`.
pub fn run_with_generator(
    series: &OhlcSeries,
    generator: &dyn SignalGenerator,
    config: &BacktestConfig,
) -> Result<BacktestResult, TastratError> {
    let bars = series.bars();
    if bars.is_empty() {
        return Err(TastratError::EmptySeries {
            instrument: series.instrument().to_string(),
        });
    }
    let min_history = generator.min_history().max(1);
    if bars.len() < min_history {
        return Err(TastratError::InsufficientData {
            strategy: generator.name().to_string(),
            bars: bars.len(),
            minimum: min_history,
        });
    }
    if generator.requires_volume() && !series.has_volume() {
        return Err(TastratError::MissingVolume {
            strategy: generator.name().to_string(),
            instrument: series.instrument().to_string(),
        });
    }

    let signals = generator.generate_with_stop(bars, config.stop_loss_pct);
    check_signals(&signals, bars.len(), min_history)?;

    let mut tracker = PositionTracker::new(config.stop_loss_pct);
    let mut recorder = TradeRecorder::new();

    for (i, signal) in signals.iter().enumerate() {
        let fill = fill_for(config.fill, bars, i);
        let step = tracker.step(i, *signal, bars[i].close, fill)?;
        if let Some(closed) = step.closed {
            recorder.record(&closed, bars)?;
        }
    }

    let last = bars.len() - 1;
    if let Some(closed) = tracker.liquidate(Fill {
        index: last,
        price: bars[last].close,
    }) {
        recorder.record(&closed, bars)?;
    }

    let trades = recorder.into_trades();
    let equity_curve = equity_curve(bars, &trades, config.position_fraction);

    let result = BacktestResult {
        instrument: series.instrument().to_string(),
        strategy: generator.name().to_string(),
        trades,
        equity_curve,
    };
    debug!(
        run = %result.label(),
        bars = bars.len(),
        trades = result.trades.len(),
        final_return = result.final_return(),
        "backtest complete"
    );
    Ok(result)
}

fn fill_for(policy: FillPolicy, bars: &[Bar], index: usize) -> Option<Fill> {
    match policy {
        FillPolicy::SignalClose => Some(Fill {
            index,
            price: bars[index].close,
        }),
        FillPolicy::NextBarOpen => bars.get(index + 1).map(|next| Fill {
            index: index + 1,
            price: next.open,
        }),
    }
}

fn check_signals(signals: &[Signal], len: usize, min_history: usize) -> Result<(), TastratError> {
    if signals.len() != len {
        return Err(TastratError::InvalidSignalSequence {
            reason: format!("{} signals for {} bars", signals.len(), len),
        });
    }
    if let Some(index) = signals[..min_history - 1]
        .iter()
        .position(|s| *s != Signal::Flat)
    {
        return Err(TastratError::InvalidSignalSequence {
            reason: format!(
                "{} at bar {} before the first decision bar {}",
                signals[index],
                index,
                min_history - 1
            ),
        });
    }
    Ok(())
}

/// Cumulative return per bar, stepped at each trade's exit index.
pub fn equity_curve(bars: &[Bar], trades: &[Trade], position_fraction: f64) -> Vec<EquityPoint> {
    let mut equity = 1.0;
    let mut closing = trades.iter().peekable();

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            while let Some(trade) = closing.next_if(|t| t.exit_index == i) {
                equity *= 1.0 + position_fraction * trade.return_rate;
            }
            EquityPoint {
                timestamp: bar.timestamp,
                cumulative_return: equity - 1.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::make_bars;
    use crate::domain::position::ExitReason;
    use crate::domain::signal::{long_only_latch, Direction};
    use approx::assert_relative_eq;

    struct Scripted {
        signals: Vec<Signal>,
        min_history: usize,
    }

    impl SignalGenerator for Scripted {
        fn name(&self) -> &str {
            "Scripted()"
        }

        fn min_history(&self) -> usize {
            self.min_history
        }

        fn generate(&self, bars: &[Bar]) -> Vec<Signal> {
            self.signals.iter().copied().take(bars.len()).collect()
        }
    }

    fn series(prices: &[f64]) -> OhlcSeries {
        OhlcSeries::new("TEST", make_bars(prices)).unwrap()
    }

    fn scripted(signals: &[Signal]) -> Scripted {
        Scripted {
            signals: signals.to_vec(),
            min_history: 1,
        }
    }

    use Signal::{Flat as F, Long as L, Short as S};

    #[test]
    fn flat_script_produces_no_trades() {
        let result = run_with_generator(&series(&[1.0, 2.0, 3.0]), &scripted(&[F, F, F]), &BacktestConfig::default()).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.equity_curve.len(), 3);
        assert!(result.equity_curve.iter().all(|p| p.cumulative_return == 0.0));
    }

    #[test]
    fn liquidates_open_position_at_last_close() {
        let result = run_with_generator(
            &series(&[10.0, 11.0, 12.0, 11.0, 10.0]),
            &scripted(&[F, L, L, L, L]),
            &BacktestConfig::default(),
        )
        .unwrap();
        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.entry_index, 1);
        assert_eq!(trade.exit_index, 4);
        assert_eq!(trade.exit_reason, ExitReason::EndOfSeries);
        assert_relative_eq!(trade.return_rate, (10.0 - 11.0) / 11.0);
    }

    #[test]
    fn flip_on_last_bar_yields_zero_length_trade() {
        let result = run_with_generator(&series(&[10.0, 11.0, 12.0]), &scripted(&[L, L, S]), &BacktestConfig::default()).unwrap();
        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.trades[0].exit_reason, ExitReason::Flip);
        assert_eq!(result.trades[1].direction, Direction::Short);
        assert_eq!(result.trades[1].bars_held(), 0);
        assert_eq!(result.trades[1].return_rate, 0.0);
    }

    #[test]
    fn next_bar_open_fills() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        for (bar, open) in bars.iter_mut().zip([9.5, 10.5, 11.5, 12.5]) {
            bar.open = open;
            bar.low = bar.low.min(open);
        }
        let series = OhlcSeries::new("TEST", bars).unwrap();
        let config = BacktestConfig {
            fill: FillPolicy::NextBarOpen,
            ..BacktestConfig::default()
        };
        let result = run_with_generator(&series, &scripted(&[L, F, L, L]), &config).unwrap();

        assert_eq!(result.trades.len(), 2);
        let first = &result.trades[0];
        assert_eq!((first.entry_index, first.entry_price), (1, 10.5));
        assert_eq!((first.exit_index, first.exit_price), (2, 11.5));
        let second = &result.trades[1];
        assert_eq!((second.entry_index, second.entry_price), (3, 12.5));
        assert_eq!(second.exit_price, 13.0);
        assert_eq!(second.exit_reason, ExitReason::EndOfSeries);
    }

    #[test]
    fn next_bar_open_ignores_last_bar_decision() {
        let config = BacktestConfig {
            fill: FillPolicy::NextBarOpen,
            ..BacktestConfig::default()
        };
        let result = run_with_generator(&series(&[10.0, 11.0]), &scripted(&[F, L]), &config).unwrap();
        assert!(result.trades.is_empty());
    }

    #[test]
    fn stop_loss_exit() {
        let config = BacktestConfig {
            stop_loss_pct: Some(0.05),
            ..BacktestConfig::default()
        };
        let result = run_with_generator(&series(&[100.0, 100.0, 94.0, 95.0]), &scripted(&[L, L, L, L]), &config).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::StopLoss);
        assert_eq!(result.trades[0].exit_index, 2);
    }

    /// Enters whenever flat, never exits on its own.
    struct AlwaysEnter;

    impl SignalGenerator for AlwaysEnter {
        fn name(&self) -> &str {
            "AlwaysEnter()"
        }

        fn min_history(&self) -> usize {
            1
        }

        fn generate(&self, bars: &[Bar]) -> Vec<Signal> {
            self.generate_with_stop(bars, None)
        }

        fn generate_with_stop(&self, bars: &[Bar], stop_loss_pct: Option<f64>) -> Vec<Signal> {
            long_only_latch(bars, 0, stop_loss_pct, |_| true, |_| false)
        }
    }

    #[test]
    fn latched_strategy_reenters_after_stop() {
        let config = BacktestConfig {
            stop_loss_pct: Some(0.05),
            ..BacktestConfig::default()
        };
        let result = run_with_generator(&series(&[100.0, 94.0, 93.0, 99.0]), &AlwaysEnter, &config).unwrap();

        assert_eq!(result.trades.len(), 2);
        let stopped = &result.trades[0];
        assert_eq!((stopped.entry_index, stopped.exit_index), (0, 1));
        assert_eq!(stopped.exit_reason, ExitReason::StopLoss);
        let reentry = &result.trades[1];
        assert_eq!((reentry.entry_index, reentry.entry_price), (2, 93.0));
        assert_eq!(reentry.exit_reason, ExitReason::EndOfSeries);
    }

    #[test]
    fn builtin_strategy_rebuys_after_stop() {
        // Falling closes keep RSI oversold, so every stop-out is followed by a new entry
        let prices: Vec<f64> = (0..40).map(|i| 200.0 * 0.97_f64.powi(i)).collect();
        let def = StrategyDefinition::parse("OscillatorValue", "ind=RSI,p=14,os=30,ob=70").unwrap();
        let config = BacktestConfig {
            stop_loss_pct: Some(0.05),
            ..BacktestConfig::default()
        };
        let result = BacktestEngine::new(StrategyRegistry::with_builtin(), config)
            .run(&series(&prices), &def)
            .unwrap();

        let stops = result
            .trades
            .iter()
            .filter(|t| t.exit_reason == ExitReason::StopLoss)
            .count();
        assert!(stops >= 2, "{:?}", result.trades);
        for pair in result.trades.windows(2) {
            assert_eq!(pair[1].entry_index, pair[0].exit_index + 1);
        }
    }

    #[test]
    fn equity_steps_at_exit_bars_only() {
        let result = run_with_generator(
            &series(&[100.0, 101.0, 102.0, 99.0, 98.0]),
            &scripted(&[F, L, L, S, F]),
            &BacktestConfig::default(),
        )
        .unwrap();
        let curve: Vec<f64> = result.equity_curve.iter().map(|p| p.cumulative_return).collect();
        let long = (99.0 - 101.0) / 101.0;
        let short = (99.0 - 98.0) / 99.0;
        assert_eq!(curve[0], 0.0);
        assert_eq!(curve[1], 0.0);
        assert_eq!(curve[2], 0.0);
        assert_relative_eq!(curve[3], long, epsilon = 1e-12);
        assert_relative_eq!(curve[4], (1.0 + long) * (1.0 + short) - 1.0, epsilon = 1e-12);
        assert_relative_eq!(result.final_return(), curve[4]);
    }

    #[test]
    fn position_fraction_scales_returns() {
        let config = BacktestConfig {
            position_fraction: 0.05,
            ..BacktestConfig::default()
        };
        let result = run_with_generator(&series(&[100.0, 110.0]), &scripted(&[L, L]), &config).unwrap();
        assert_relative_eq!(result.final_return(), 0.05 * 0.1, epsilon = 1e-12);
    }

    #[test]
    fn empty_series_rejected() {
        let empty = OhlcSeries::new("EMPTY", Vec::new()).unwrap();
        let err = run_with_generator(&empty, &scripted(&[]), &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, TastratError::EmptySeries { .. }));
    }

    #[test]
    fn short_series_rejected() {
        let generator = Scripted {
            signals: vec![F; 3],
            min_history: 5,
        };
        let err = run_with_generator(&series(&[1.0, 2.0, 3.0]), &generator, &BacktestConfig::default()).unwrap_err();
        match err {
            TastratError::InsufficientData { bars, minimum, .. } => {
                assert_eq!(bars, 3);
                assert_eq!(minimum, 5);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn early_signal_rejected() {
        let generator = Scripted {
            signals: vec![L, F, F],
            min_history: 2,
        };
        let err = run_with_generator(&series(&[1.0, 2.0, 3.0]), &generator, &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, TastratError::InvalidSignalSequence { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn short_signal_vector_rejected() {
        let err = run_with_generator(&series(&[1.0, 2.0, 3.0]), &scripted(&[F, F]), &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, TastratError::InvalidSignalSequence { .. }));
    }

    #[test]
    fn engine_resolves_through_registry() {
        let engine = BacktestEngine::default();
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let def = StrategyDefinition::parse("MAPriceCrossover", "p=5").unwrap();
        let result = engine.run(&series(&prices), &def).unwrap();
        assert_eq!(result.strategy, "MAPriceCrossover(ma_ind=SMA,p=5)");
        assert_eq!(result.label(), "MAPriceCrossover(ma_ind=SMA,p=5)@TEST");
        assert_eq!(result.equity_curve.len(), 30);
    }

    #[test]
    fn engine_reports_missing_volume() {
        let mut bars = make_bars(&(0..30).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        for bar in &mut bars {
            bar.volume = None;
        }
        let series = OhlcSeries::new("EURUSD=X", bars).unwrap();
        let def = StrategyDefinition::parse("OscillatorValue", "ind=MFI,p=14").unwrap();
        let err = BacktestEngine::default().run(&series, &def).unwrap_err();
        assert!(matches!(err, TastratError::MissingVolume { .. }));
    }

    #[test]
    fn fill_policy_parsing() {
        assert_eq!("close".parse::<FillPolicy>().unwrap(), FillPolicy::SignalClose);
        assert_eq!("Next_Open".parse::<FillPolicy>().unwrap(), FillPolicy::NextBarOpen);
        assert!("vwap".parse::<FillPolicy>().is_err());
        assert_eq!(FillPolicy::NextBarOpen.to_string(), "next_open");
    }
}
