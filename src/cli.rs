//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;

use crate::adapters::csv_adapter::CsvDataAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestEngine, BacktestResult, FillPolicy};
use crate::domain::batch::{run_batch, JobOutcome};
use crate::domain::catalog::build_catalog;
use crate::domain::config_validation::{validate_run_config, RunSettings};
use crate::domain::error::TastratError;
use crate::domain::metrics::TradeStats;
use crate::domain::registry::StrategyRegistry;
use crate::domain::strategy::StrategyDefinition;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "tastrat", about = "Backtester for technical-analysis trading strategies")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full strategy catalog over the configured universe
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [output] dir
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Backtest one strategy on one CSV file
    Backtest {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        strategy: String,
        /// Strategy parameters as k=v,k=v
        #[arg(short, long, default_value = "")]
        params: String,
        #[arg(long, default_value_t = FillPolicy::SignalClose)]
        fill: FillPolicy,
        /// Stop-loss as a fraction of the entry price
        #[arg(long)]
        stop_loss: Option<f64>,
    },
    /// List the jobs a run would execute
    Catalog {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List registered strategy names
    Strategies,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run { config, output } => run_study(&config, output.as_ref()),
        Command::Backtest {
            data,
            strategy,
            params,
            fill,
            stop_loss,
        } => run_single(&data, &strategy, &params, fill, stop_loss),
        Command::Catalog { config } => run_catalog(&config),
        Command::Strategies => run_strategies(),
    }
}

fn fail(err: &TastratError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_settings(path: &Path) -> Result<RunSettings, TastratError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_run_config(&adapter)
}

fn run_study(config_path: &Path, output_override: Option<&PathBuf>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let mut settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    if let Some(dir) = output_override {
        settings.output_dir = dir.clone();
    }

    let data_port = CsvDataAdapter::new(settings.data_dir.clone());
    let report_port = CsvReportAdapter::new(settings.output_dir.clone());

    let outcomes = match run_pipeline(&settings, &data_port, &report_port) {
        Ok(o) => o,
        Err(e) => return fail(&e),
    };

    print_study_summary(&outcomes);
    eprintln!("\nReports written to: {}", settings.output_dir.display());
    ExitCode::SUCCESS
}

/// Loads every universe series, runs the catalog and writes the reports.
///
/// Instruments whose data fails to load are skipped; their jobs are reported
/// as failed with `NoData`.
pub fn run_pipeline(
    settings: &RunSettings,
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
) -> Result<Vec<JobOutcome>, TastratError> {
    let mut data = HashMap::new();
    for instrument in settings.universe.instruments() {
        match data_port.load_series(instrument) {
            Ok(series) => {
                data.insert(instrument.to_string(), series);
            }
            Err(e) => warn!(instrument, error = %e, "skipping instrument"),
        }
    }

    let jobs = build_catalog(&settings.universe);
    eprintln!(
        "Running {} backtests over {} instruments ({} loaded)",
        jobs.len(),
        settings.universe.instruments().len(),
        data.len()
    );

    let engine = BacktestEngine::new(StrategyRegistry::with_builtin(), settings.backtest.clone());
    let outcomes = run_batch(&engine, &jobs, &data, settings.threads)?;
    report_port.write(&outcomes, settings.period)?;
    Ok(outcomes)
}

fn print_study_summary(outcomes: &[JobOutcome]) {
    let succeeded: Vec<(&JobOutcome, &BacktestResult)> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok().map(|r| (o, r)))
        .collect();

    eprintln!("\n=== Study Results ===");
    eprintln!("Runs:             {}", outcomes.len());
    eprintln!("Succeeded:        {}", succeeded.len());
    eprintln!("Failed:           {}", outcomes.len() - succeeded.len());

    let best = succeeded
        .iter()
        .max_by(|a, b| a.1.final_return().total_cmp(&b.1.final_return()));
    if let Some((outcome, result)) = best {
        eprintln!(
            "Best run:         {} ({:.2}%)",
            outcome.job.label(),
            result.final_return() * 100.0
        );
    }

    let failed: Vec<&JobOutcome> = outcomes.iter().filter(|o| !o.is_ok()).collect();
    if !failed.is_empty() {
        eprintln!("\n=== Failed Runs ===");
        for outcome in failed {
            if let Err(e) = &outcome.result {
                eprintln!("  {}: {}", outcome.job.label(), e);
            }
        }
    }
}

fn run_single(
    data_path: &Path,
    strategy: &str,
    params: &str,
    fill: FillPolicy,
    stop_loss: Option<f64>,
) -> ExitCode {
    let definition = match StrategyDefinition::parse(strategy, params) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    let instrument = data_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = data_path.parent().map(Path::to_path_buf).unwrap_or_default();
    let series = match CsvDataAdapter::new(base).load_series(&instrument) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let config = BacktestConfig {
        fill,
        stop_loss_pct: stop_loss,
        ..BacktestConfig::default()
    };
    let engine = BacktestEngine::new(StrategyRegistry::with_builtin(), config);
    eprintln!("Running {} on {} bars", definition.label(&instrument), series.len());

    let result = match engine.run(&series, &definition) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    println!("direction,entry_time,entry_price,exit_time,exit_price,return,bars_held,exit_reason");
    for t in &result.trades {
        println!(
            "{},{},{},{},{},{:.6},{},{}",
            t.direction,
            t.entry_time,
            t.entry_price,
            t.exit_time,
            t.exit_price,
            t.return_rate,
            t.bars_held(),
            t.exit_reason
        );
    }

    print_trade_stats(&TradeStats::compute(&result));
    ExitCode::SUCCESS
}

fn print_trade_stats(stats: &TradeStats) {
    eprintln!("\n=== Trade Statistics ===");
    eprintln!("Total Return:     {:.2}%", stats.total_return * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", stats.max_drawdown * 100.0);
    eprintln!("DD Duration:      {} bars", stats.max_drawdown_duration);
    eprintln!(
        "Total Trades:     {} ({} won, {} lost, {} even)",
        stats.total_trades, stats.trades_won, stats.trades_lost, stats.trades_breakeven
    );
    eprintln!("Win Rate:         {:.1}%", stats.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", stats.profit_factor);
    eprintln!("Avg Win:          {:.2}%", stats.avg_win * 100.0);
    eprintln!("Avg Loss:         {:.2}%", stats.avg_loss * 100.0);
    eprintln!("Avg Bars Held:    {:.1}", stats.avg_bars_held);
}

fn run_catalog(config_path: &Path) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let jobs = build_catalog(&settings.universe);
    for job in &jobs {
        println!("{}\t{}", job.class, job.label());
    }
    eprintln!("{} jobs", jobs.len());
    ExitCode::SUCCESS
}

fn run_strategies() -> ExitCode {
    for name in StrategyRegistry::with_builtin().names() {
        println!("{}", name);
    }
    ExitCode::SUCCESS
}
