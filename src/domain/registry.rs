//! Name-keyed registry of signal generator factories.

use std::collections::HashMap;
use std::fmt;

use super::error::TastratError;
use super::signal::SignalGenerator;
use super::strategies::{
    bb_trend_following, bb_volatility_breakout, ma_price_crossover, oscillator_value, two_ma_crossover,
    BbTrendFollowing, BbVolatilityBreakout, MaPriceCrossover, OscillatorValue, TwoMaCrossover,
};
use super::strategy::{StrategyDefinition, StrategyParams};

/// Builds a generator from parameters, validating them.
pub type GeneratorFactory = fn(&StrategyParams) -> Result<Box<dyn SignalGenerator>, TastratError>;

/// Open catalog of strategies. The engine resolves definitions through it
/// and never branches on strategy names itself.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    factories: HashMap<String, GeneratorFactory>,
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the five built-in strategies.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(oscillator_value::NAME, OscillatorValue::from_params);
        registry.register(ma_price_crossover::NAME, MaPriceCrossover::from_params);
        registry.register(two_ma_crossover::NAME, TwoMaCrossover::from_params);
        registry.register(bb_trend_following::NAME, BbTrendFollowing::from_params);
        registry.register(bb_volatility_breakout::NAME, BbVolatilityBreakout::from_params);
        registry
    }

    /// Adds or replaces a factory.
    pub fn register(&mut self, name: &str, factory: GeneratorFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn resolve(&self, definition: &StrategyDefinition) -> Result<Box<dyn SignalGenerator>, TastratError> {
        let factory = self
            .factories
            .get(&definition.name)
            .ok_or_else(|| TastratError::UnknownStrategy {
                name: definition.name.clone(),
            })?;
        factory(&definition.params)
    }
}
