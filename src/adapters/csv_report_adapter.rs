//! CSV report adapter.
//!
//! Writes three files into the output directory:
//! - `returns.csv`: one row per run and calendar period (long format)
//! - `trades.csv`: one row per closed trade
//! - `summary.csv`: one row per job, including failed ones

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::domain::batch::JobOutcome;
use crate::domain::error::TastratError;
use crate::domain::metrics::TradeStats;
use crate::domain::returns::{period_returns, ReturnPeriod};
use crate::ports::report_port::ReportPort;

pub const RETURNS_FILE: &str = "returns.csv";
pub const TRADES_FILE: &str = "trades.csv";
pub const SUMMARY_FILE: &str = "summary.csv";

#[derive(Debug, Serialize)]
struct ReturnRow<'a> {
    run: String,
    strategy_class: &'a str,
    period_end: String,
    #[serde(rename = "return")]
    value: f64,
}

#[derive(Debug, Serialize)]
struct TradeRow {
    run: String,
    direction: String,
    entry_time: String,
    entry_price: f64,
    exit_time: String,
    exit_price: f64,
    #[serde(rename = "return")]
    return_rate: f64,
    bars_held: usize,
    exit_reason: &'static str,
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    run: String,
    instrument: &'a str,
    strategy_class: &'a str,
    status: &'static str,
    error: Option<String>,
    trades: Option<usize>,
    win_rate: Option<f64>,
    profit_factor: Option<f64>,
    avg_bars_held: Option<f64>,
    total_return: Option<f64>,
    max_drawdown: Option<f64>,
}

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn writer(&self, file: &str) -> Result<csv::Writer<fs::File>, TastratError> {
        let path = self.output_dir.join(file);
        csv::Writer::from_path(&path).map_err(|e| report_error(&path, e))
    }
}

fn report_error(path: &Path, e: impl std::fmt::Display) -> TastratError {
    TastratError::Report {
        reason: format!("{}: {}", path.display(), e),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, outcomes: &[JobOutcome], period: ReturnPeriod) -> Result<(), TastratError> {
        fs::create_dir_all(&self.output_dir)?;

        let mut returns = self.writer(RETURNS_FILE)?;
        let mut trades = self.writer(TRADES_FILE)?;
        let mut summary = self.writer(SUMMARY_FILE)?;
        let returns_path = self.output_dir.join(RETURNS_FILE);
        let trades_path = self.output_dir.join(TRADES_FILE);
        let summary_path = self.output_dir.join(SUMMARY_FILE);

        for outcome in outcomes {
            let class = outcome.job.class.as_str();
            let run = outcome.job.label();

            let row = match &outcome.result {
                Ok(result) => {
                    for r in period_returns(&result.equity_curve, period) {
                        returns
                            .serialize(ReturnRow {
                                run: run.clone(),
                                strategy_class: class,
                                period_end: r.period_end.format("%Y-%m-%d").to_string(),
                                value: r.value,
                            })
                            .map_err(|e| report_error(&returns_path, e))?;
                    }
                    for t in &result.trades {
                        trades
                            .serialize(TradeRow {
                                run: run.clone(),
                                direction: t.direction.to_string(),
                                entry_time: t.entry_time.format("%Y-%m-%d %H:%M:%S").to_string(),
                                entry_price: t.entry_price,
                                exit_time: t.exit_time.format("%Y-%m-%d %H:%M:%S").to_string(),
                                exit_price: t.exit_price,
                                return_rate: t.return_rate,
                                bars_held: t.bars_held(),
                                exit_reason: t.exit_reason.as_str(),
                            })
                            .map_err(|e| report_error(&trades_path, e))?;
                    }
                    let stats = TradeStats::compute(result);
                    SummaryRow {
                        run,
                        instrument: &outcome.job.instrument,
                        strategy_class: class,
                        status: "ok",
                        error: None,
                        trades: Some(stats.total_trades),
                        win_rate: Some(stats.win_rate),
                        profit_factor: Some(stats.profit_factor),
                        avg_bars_held: Some(stats.avg_bars_held),
                        total_return: Some(stats.total_return),
                        max_drawdown: Some(stats.max_drawdown),
                    }
                }
                Err(e) => SummaryRow {
                    run,
                    instrument: &outcome.job.instrument,
                    strategy_class: class,
                    status: "failed",
                    error: Some(e.to_string()),
                    trades: None,
                    win_rate: None,
                    profit_factor: None,
                    avg_bars_held: None,
                    total_return: None,
                    max_drawdown: None,
                },
            };
            summary
                .serialize(row)
                .map_err(|e| report_error(&summary_path, e))?;
        }

        returns.flush()?;
        trades.flush()?;
        summary.flush()?;
        info!(dir = %self.output_dir.display(), runs = outcomes.len(), "reports written");
        Ok(())
    }
}
