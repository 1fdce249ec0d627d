//! Configuration validation.
//!
//! Validates every config key before a study runs and turns the INI values
//! into typed settings.

use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::backtest::{BacktestConfig, FillPolicy};
use crate::domain::catalog::Universe;
use crate::domain::error::TastratError;
use crate::domain::returns::ReturnPeriod;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_OUTPUT_DIR: &str = "results";

/// Study stop-loss when `[backtest] stop_loss_pct` is absent.
pub const STUDY_STOP_LOSS_PCT: f64 = 0.05;

/// Study position size when `[backtest] position_fraction` is absent.
pub const STUDY_POSITION_FRACTION: f64 = 0.05;

/// Everything a `run` needs, read from one config file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub data_dir: PathBuf,
    pub universe: Universe,
    pub backtest: BacktestConfig,
    pub threads: usize,
    pub output_dir: PathBuf,
    pub period: ReturnPeriod,
}

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<RunSettings, TastratError> {
    Ok(RunSettings {
        data_dir: validate_data_dir(config)?,
        universe: validate_universe(config)?,
        backtest: validate_backtest_config(config)?,
        threads: validate_threads(config)?,
        output_dir: config
            .get_string("output", "dir")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        period: parse_key(config, "output", "period")?.unwrap_or_default(),
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TastratError {
    TastratError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Parses an optional key. Absent or blank keys are `None`; unparseable
/// values are errors rather than silently defaulted.
fn parse_key<T>(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<T>, TastratError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match config.get_string(section, key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| invalid(section, key, e.to_string())),
        _ => Ok(None),
    }
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<PathBuf, TastratError> {
    match config.get_string("data", "dir") {
        Some(s) if !s.trim().is_empty() => Ok(PathBuf::from(s.trim())),
        _ => Err(TastratError::ConfigMissing {
            section: "data".to_string(),
            key: "dir".to_string(),
        }),
    }
}

fn validate_universe(config: &dyn ConfigPort) -> Result<Universe, TastratError> {
    let defaults = Universe::default();
    let crypto = config.get_list("universe", "crypto");
    let fx = config.get_list("universe", "fx");

    let universe = match (crypto, fx) {
        (None, None) => defaults,
        (crypto, fx) => Universe {
            crypto: crypto.unwrap_or_default(),
            fx: fx.unwrap_or_default(),
        },
    };

    if universe.instruments().is_empty() {
        return Err(invalid("universe", "crypto", "universe must list at least one instrument"));
    }
    if let Some(dup) = universe.crypto.iter().find(|t| universe.is_fx(t)) {
        return Err(invalid("universe", "fx", format!("{dup} is listed as both crypto and fx")));
    }
    Ok(universe)
}

/// Study settings for the `[backtest]` section. Absent keys fall back to the
/// study grid (5% stop, 5% of equity per trade), not to [`BacktestConfig::default`].
pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TastratError> {
    let fill = parse_key::<FillPolicy>(config, "backtest", "fill")?.unwrap_or_default();

    let stop_loss_pct = match parse_key::<f64>(config, "backtest", "stop_loss_pct")? {
        None => Some(STUDY_STOP_LOSS_PCT),
        Some(v) if !v.is_finite() || v < 0.0 || v >= 1.0 => {
            return Err(invalid("backtest", "stop_loss_pct", "stop_loss_pct must be between 0 and 1"));
        }
        Some(v) if v == 0.0 => None,
        Some(v) => Some(v),
    };

    let position_fraction =
        parse_key::<f64>(config, "backtest", "position_fraction")?.unwrap_or(STUDY_POSITION_FRACTION);
    if !(position_fraction > 0.0 && position_fraction <= 1.0) {
        return Err(invalid(
            "backtest",
            "position_fraction",
            "position_fraction must be greater than 0 and at most 1",
        ));
    }

    Ok(BacktestConfig {
        fill,
        stop_loss_pct,
        position_fraction,
    })
}

fn validate_threads(config: &dyn ConfigPort) -> Result<usize, TastratError> {
    let threads = parse_key::<i64>(config, "runner", "threads")?.unwrap_or(0);
    usize::try_from(threads).map_err(|_| invalid("runner", "threads", "threads must be non-negative"))
}
