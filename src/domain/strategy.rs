//! Strategy definitions: a registered rule name plus its parameters.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::TastratError;

/// A single strategy parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Ident(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            // Debug keeps the trailing ".0" on whole floats
            ParamValue::Float(v) => write!(f, "{:?}", v),
            ParamValue::Ident(v) => write!(f, "{}", v),
        }
    }
}

impl ParamValue {
    /// Whole numbers become `Int` so thresholds print as `70` rather than `70.0`.
    pub fn number(v: f64) -> Self {
        if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
            ParamValue::Int(v as i64)
        } else {
            ParamValue::Float(v)
        }
    }
}

impl FromStr for ParamValue {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(v) = s.parse::<i64>() {
            return Ok(ParamValue::Int(v));
        }
        if let Ok(v) = s.parse::<f64>() {
            return Ok(ParamValue::Float(v));
        }
        Ok(ParamValue::Ident(s.to_string()))
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Ident(v.to_string())
    }
}

/// Named parameters, kept in key order so labels are stable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StrategyParams(BTreeMap<String, ParamValue>);

impl StrategyParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Positive integer parameter, `default` when absent.
    pub fn period(&self, strategy: &str, key: &str, default: usize) -> Result<usize, TastratError> {
        match self.get(key) {
            None => Ok(default),
            Some(ParamValue::Int(v)) if *v > 0 => Ok(*v as usize),
            Some(other) => Err(invalid(strategy, key, format!("expected a positive integer, got {other}"))),
        }
    }

    /// Finite numeric parameter, `default` when absent. Integers are widened.
    pub fn number(&self, strategy: &str, key: &str, default: f64) -> Result<f64, TastratError> {
        match self.get(key) {
            None => Ok(default),
            Some(ParamValue::Int(v)) => Ok(*v as f64),
            Some(ParamValue::Float(v)) if v.is_finite() => Ok(*v),
            Some(other) => Err(invalid(strategy, key, format!("expected a number, got {other}"))),
        }
    }

    /// Identifier parameter restricted to `allowed` (matched case-insensitively,
    /// returned in its canonical spelling).
    pub fn choice(
        &self,
        strategy: &str,
        key: &str,
        default: &'static str,
        allowed: &[&'static str],
    ) -> Result<&'static str, TastratError> {
        match self.get(key) {
            None => Ok(default),
            Some(ParamValue::Ident(v)) => allowed
                .iter()
                .find(|a| a.eq_ignore_ascii_case(v))
                .copied()
                .ok_or_else(|| invalid(strategy, key, format!("expected one of {}, got {v}", allowed.join("|")))),
            Some(other) => Err(invalid(strategy, key, format!("expected one of {}, got {other}", allowed.join("|")))),
        }
    }

    /// Rejects keys a strategy does not understand.
    pub fn reject_unknown(&self, strategy: &str, known: &[&str]) -> Result<(), TastratError> {
        match self.0.keys().find(|k| !known.contains(&k.as_str())) {
            Some(key) => Err(invalid(strategy, key, "unknown parameter".to_string())),
            None => Ok(()),
        }
    }
}

fn invalid(strategy: &str, key: &str, reason: String) -> TastratError {
    TastratError::InvalidParameter {
        strategy: strategy.to_string(),
        key: key.to_string(),
        reason,
    }
}

impl fmt::Display for StrategyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Identifies a signal rule in the registry together with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyDefinition {
    pub name: String,
    pub params: StrategyParams,
}

impl StrategyDefinition {
    pub fn new(name: impl Into<String>, params: StrategyParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Parses `k=v,k=v` parameter text.
    pub fn parse(name: &str, params: &str) -> Result<Self, TastratError> {
        let mut parsed = StrategyParams::new();
        for pair in params.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| invalid(name, pair, "expected key=value".to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(invalid(name, pair, "empty parameter name".to_string()));
            }
            let value: ParamValue = match value.parse() {
                Ok(v) => v,
                Err(never) => match never {},
            };
            parsed = parsed.with(key, value);
        }
        Ok(Self::new(name, parsed))
    }

    /// Run label for one instrument, e.g. `TwoMACrossover(f_p=5,s_p=20)@BTC-USD`.
    pub fn label(&self, instrument: &str) -> String {
        format!("{}@{}", self, instrument)
    }
}

impl fmt::Display for StrategyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params)
    }
}

/// Family a strategy belongs to in the study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyClass {
    Oscillators,
    MovingAverages,
    BollingerBands,
}

impl StrategyClass {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyClass::Oscillators => "oscillators",
            StrategyClass::MovingAverages => "moving_averages",
            StrategyClass::BollingerBands => "bollinger_bands",
        }
    }
}

impl fmt::Display for StrategyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_definition() -> StrategyDefinition {
        StrategyDefinition::new(
            "TwoMACrossover",
            StrategyParams::new()
                .with("f_p", 5)
                .with("s_p", 20)
                .with("ma_ind", "SMA"),
        )
    }

    #[test]
    fn definition_display_orders_keys() {
        assert_eq!(
            sample_definition().to_string(),
            "TwoMACrossover(f_p=5,ma_ind=SMA,s_p=20)"
        );
    }

    #[test]
    fn label_appends_instrument() {
        assert_eq!(
            sample_definition().label("ETH-USD"),
            "TwoMACrossover(f_p=5,ma_ind=SMA,s_p=20)@ETH-USD"
        );
    }

    #[test]
    fn float_params_keep_decimal_point() {
        let params = StrategyParams::new().with("df", 2.0).with("p", 20);
        assert_eq!(params.to_string(), "df=2.0,p=20");
    }

    #[test]
    fn whole_numbers_print_as_ints() {
        assert_eq!(ParamValue::number(70.0), ParamValue::Int(70));
        assert_eq!(ParamValue::number(0.8), ParamValue::Float(0.8));
    }

    #[test]
    fn parse_params_text() {
        let def = StrategyDefinition::parse("OscillatorValue", "ind=RSI, p=14,os=30,ob=70").unwrap();
        assert_eq!(def.params.get("p"), Some(&ParamValue::Int(14)));
        assert_eq!(def.params.get("ind"), Some(&ParamValue::Ident("RSI".into())));
        assert_eq!(def.to_string(), "OscillatorValue(ind=RSI,ob=70,os=30,p=14)");
    }

    #[test]
    fn parse_float_param() {
        let def = StrategyDefinition::parse("BBTrendFollowing", "df=1.9").unwrap();
        assert_eq!(def.params.get("df"), Some(&ParamValue::Float(1.9)));
    }

    #[test]
    fn parse_rejects_missing_equals() {
        let err = StrategyDefinition::parse("X", "p14").unwrap_err();
        assert!(matches!(err, TastratError::InvalidParameter { .. }));
    }

    #[test]
    fn parse_empty_text_gives_no_params() {
        let def = StrategyDefinition::parse("X", "").unwrap();
        assert!(def.params.is_empty());
        assert_eq!(def.to_string(), "X()");
    }

    #[test]
    fn period_accessor() {
        let params = StrategyParams::new().with("p", 14).with("bad", -1).with("f", 1.5);
        assert_eq!(params.period("S", "p", 5).unwrap(), 14);
        assert_eq!(params.period("S", "missing", 5).unwrap(), 5);
        assert!(params.period("S", "bad", 5).is_err());
        assert!(params.period("S", "f", 5).is_err());
    }

    #[test]
    fn number_accessor_widens_ints() {
        let params = StrategyParams::new().with("df", 2);
        assert_eq!(params.number("S", "df", 1.0).unwrap(), 2.0);
    }

    #[test]
    fn choice_accessor_is_case_insensitive() {
        let params = StrategyParams::new().with("ma_ind", "ema");
        assert_eq!(params.choice("S", "ma_ind", "SMA", &["SMA", "EMA"]).unwrap(), "EMA");

        let params = StrategyParams::new().with("ma_ind", "WMA");
        assert!(params.choice("S", "ma_ind", "SMA", &["SMA", "EMA"]).is_err());
    }

    #[test]
    fn reject_unknown_keys() {
        let params = StrategyParams::new().with("p", 5).with("zz", 1);
        let err = params.reject_unknown("S", &["p"]).unwrap_err();
        match err {
            TastratError::InvalidParameter { key, .. } => assert_eq!(key, "zz"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn strategy_class_names() {
        assert_eq!(StrategyClass::Oscillators.to_string(), "oscillators");
        assert_eq!(StrategyClass::BollingerBands.as_str(), "bollinger_bands");
    }
}
