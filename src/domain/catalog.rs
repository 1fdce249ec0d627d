//! The study's strategy grid over a universe of instruments.

use super::strategies::{bb_trend_following, bb_volatility_breakout, ma_price_crossover, oscillator_value, two_ma_crossover};
use super::strategy::{ParamValue, StrategyClass, StrategyDefinition, StrategyParams};

/// Instruments to study, split by asset class. FX series carry no volume.
#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub crypto: Vec<String>,
    pub fx: Vec<String>,
}

impl Default for Universe {
    fn default() -> Self {
        Self {
            crypto: vec!["BTC-USD".into(), "ETH-USD".into()],
            fx: vec!["EURUSD=X".into(), "JPY=X".into()],
        }
    }
}

impl Universe {
    /// Crypto tickers first, then FX.
    pub fn instruments(&self) -> Vec<&str> {
        self.crypto
            .iter()
            .chain(&self.fx)
            .map(String::as_str)
            .collect()
    }

    pub fn is_fx(&self, instrument: &str) -> bool {
        self.fx.iter().any(|t| t == instrument)
    }
}

/// One (strategy, instrument) pair to run.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestJob {
    pub instrument: String,
    pub definition: StrategyDefinition,
    pub class: StrategyClass,
}

impl BacktestJob {
    pub fn label(&self) -> String {
        self.definition.label(&self.instrument)
    }
}

fn job(instrument: &str, name: &str, class: StrategyClass, params: StrategyParams) -> BacktestJob {
    BacktestJob {
        instrument: instrument.to_string(),
        definition: StrategyDefinition::new(name, params),
        class,
    }
}

/// Oscillator settings: (indicator, oversold, overbought).
const OSCILLATOR_SETTINGS: [(&str, i64, i64); 3] = [("RSI", 30, 70), ("StochasticFast", 80, 20), ("MFI", 80, 20)];
const OSCILLATOR_PERIODS: [i64; 2] = [14, 21];
const MOVING_AVERAGES: [&str; 2] = ["SMA", "EMA"];
const MA_PRICE_PERIODS: [i64; 3] = [5, 10, 15];
const TWO_MA_PERIODS: [(i64, i64); 2] = [(5, 20), (10, 30)];
/// Bollinger settings: (period, deviation factor).
const BAND_SETTINGS: [(i64, f64); 3] = [(20, 2.0), (10, 1.9), (50, 2.1)];
const BREAKOUT_LOOKBACKS: [i64; 2] = [180, 120];

/// Builds the full study grid for `universe`.
///
/// MFI variants run on crypto only. Bollinger trend following uses RSI on FX
/// and MFI on crypto. Volatility breakout runs on the first crypto ticker only.
pub fn build_catalog(universe: &Universe) -> Vec<BacktestJob> {
    let instruments = universe.instruments();
    let mut jobs = Vec::new();

    for &instrument in &instruments {
        for (indicator, oversold, overbought) in OSCILLATOR_SETTINGS {
            if indicator == "MFI" && universe.is_fx(instrument) {
                continue;
            }
            for period in OSCILLATOR_PERIODS {
                let params = StrategyParams::new()
                    .with("ind", indicator)
                    .with("p", period)
                    .with("os", oversold)
                    .with("ob", overbought);
                jobs.push(job(instrument, oscillator_value::NAME, StrategyClass::Oscillators, params));
            }
        }
    }

    for &instrument in &instruments {
        for average in MOVING_AVERAGES {
            for period in MA_PRICE_PERIODS {
                let params = StrategyParams::new().with("ma_ind", average).with("p", period);
                jobs.push(job(instrument, ma_price_crossover::NAME, StrategyClass::MovingAverages, params));
            }
        }
    }

    for &instrument in &instruments {
        for average in MOVING_AVERAGES {
            for (fast, slow) in TWO_MA_PERIODS {
                let params = StrategyParams::new()
                    .with("ma_ind", average)
                    .with("f_p", fast)
                    .with("s_p", slow);
                jobs.push(job(instrument, two_ma_crossover::NAME, StrategyClass::MovingAverages, params));
            }
        }
    }

    let trend_pairs = universe
        .fx
        .iter()
        .map(|t| (t.as_str(), "RSI"))
        .chain(universe.crypto.iter().map(|t| (t.as_str(), "MFI")));
    for (instrument, oscillator) in trend_pairs {
        for (period, devfactor) in BAND_SETTINGS {
            let params = StrategyParams::new()
                .with("p", period)
                .with("df", ParamValue::Float(devfactor))
                .with("ind", oscillator);
            jobs.push(job(instrument, bb_trend_following::NAME, StrategyClass::BollingerBands, params));
        }
    }

    if let Some(instrument) = universe.crypto.first() {
        for (period, devfactor) in BAND_SETTINGS {
            for lookback in BREAKOUT_LOOKBACKS {
                let params = StrategyParams::new()
                    .with("p", period)
                    .with("df", ParamValue::Float(devfactor))
                    .with("lb_p", lookback);
                jobs.push(job(instrument, bb_volatility_breakout::NAME, StrategyClass::BollingerBands, params));
            }
        }
    }

    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registry::StrategyRegistry;

    fn count(jobs: &[BacktestJob], name: &str) -> usize {
        jobs.iter().filter(|j| j.definition.name == name).count()
    }

    #[test]
    fn default_universe_grid_size() {
        let jobs = build_catalog(&Universe::default());
        assert_eq!(count(&jobs, oscillator_value::NAME), 20);
        assert_eq!(count(&jobs, ma_price_crossover::NAME), 24);
        assert_eq!(count(&jobs, two_ma_crossover::NAME), 16);
        assert_eq!(count(&jobs, bb_trend_following::NAME), 12);
        assert_eq!(count(&jobs, bb_volatility_breakout::NAME), 6);
        assert_eq!(jobs.len(), 78);
    }

    #[test]
    fn no_mfi_on_fx() {
        let universe = Universe::default();
        let jobs = build_catalog(&universe);
        for j in jobs.iter().filter(|j| universe.is_fx(&j.instrument)) {
            assert_ne!(j.definition.params.get("ind"), Some(&ParamValue::Ident("MFI".into())), "{}", j.label());
        }
    }

    #[test]
    fn breakout_only_on_first_crypto() {
        let jobs = build_catalog(&Universe::default());
        assert!(jobs
            .iter()
            .filter(|j| j.definition.name == bb_volatility_breakout::NAME)
            .all(|j| j.instrument == "BTC-USD"));
    }

    #[test]
    fn every_job_resolves() {
        let registry = StrategyRegistry::with_builtin();
        for j in build_catalog(&Universe::default()) {
            let generator = registry.resolve(&j.definition).unwrap_or_else(|e| panic!("{}: {e}", j.label()));
            assert_eq!(generator.name(), j.definition.to_string());
        }
    }

    #[test]
    fn job_label_format() {
        let jobs = build_catalog(&Universe::default());
        assert_eq!(jobs[0].label(), "OscillatorValue(ind=RSI,ob=70,os=30,p=14)@BTC-USD");
        assert_eq!(jobs[0].class, StrategyClass::Oscillators);
    }

    #[test]
    fn fx_only_universe_has_no_breakout() {
        let universe = Universe {
            crypto: vec![],
            fx: vec!["EURUSD=X".into()],
        };
        let jobs = build_catalog(&universe);
        assert_eq!(count(&jobs, bb_volatility_breakout::NAME), 0);
        assert_eq!(count(&jobs, oscillator_value::NAME), 4);
    }
}
