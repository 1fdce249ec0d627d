//! Trade statistics for a backtest result.

use super::backtest::{BacktestResult, EquityPoint};

#[derive(Debug, Clone, PartialEq)]
pub struct TradeStats {
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    /// Sum of winning returns over the sum of losing returns. Infinite when
    /// there are wins and no losses.
    pub profit_factor: f64,
    pub avg_win: f64,
    /// Magnitude of the average losing return.
    pub avg_loss: f64,
    pub largest_win: f64,
    /// Magnitude of the worst losing return.
    pub largest_loss: f64,
    pub avg_bars_held: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    /// Longest run of bars spent below a previous equity peak.
    pub max_drawdown_duration: usize,
}

impl TradeStats {
    pub fn compute(result: &BacktestResult) -> Self {
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_bars = 0usize;

        for trade in &result.trades {
            let r = trade.return_rate;
            if r > 0.0 {
                trades_won += 1;
                total_wins += r;
                largest_win = largest_win.max(r);
            } else if r < 0.0 {
                trades_lost += 1;
                total_losses += r.abs();
                largest_loss = largest_loss.max(r.abs());
            } else {
                trades_breakeven += 1;
            }
            total_bars += trade.bars_held();
        }

        let total_trades = result.trades.len();
        let win_rate = ratio(trades_won as f64, total_trades);

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&result.equity_curve);

        TradeStats {
            total_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            profit_factor,
            avg_win: ratio(total_wins, trades_won),
            avg_loss: ratio(total_losses, trades_lost),
            largest_win,
            largest_loss,
            avg_bars_held: ratio(total_bars as f64, total_trades),
            total_return: result.final_return(),
            max_drawdown,
            max_drawdown_duration,
        }
    }
}

fn ratio(numerator: f64, count: usize) -> f64 {
    if count > 0 {
        numerator / count as f64
    } else {
        0.0
    }
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let mut peak = 1.0_f64;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for point in equity_curve {
        let equity = 1.0 + point.cumulative_return;
        if equity >= peak {
            peak = equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - equity) / peak);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}
