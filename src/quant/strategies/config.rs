use std::env;
use std::str::FromStr;

use anyhow::bail;
use anyhow::Context;

/// Defaults for building an evaluation request around a position.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct EvaluationConfig {
  /// Number of price points on the payoff curve.
  pub samples: usize,
  /// Lower end of the range, in percent of the reference price.
  pub min_pct: f64,
  /// Upper end of the range, in percent of the reference price.
  pub max_pct: f64,
  /// Risk-free rate for legs still alive at the horizon.
  pub rate: f64,
  /// Volatility for legs still alive at the horizon.
  pub volatility: f64,
}

impl Default for EvaluationConfig {
  fn default() -> Self {
    Self {
      samples: 100,
      min_pct: 50.0,
      max_pct: 150.0,
      rate: 0.05,
      volatility: 0.2,
    }
  }
}

impl EvaluationConfig {
  pub const SAMPLES_VAR: &'static str = "STRATEGY_PAYOFF_SAMPLES";
  pub const MIN_PCT_VAR: &'static str = "STRATEGY_PAYOFF_MIN_PCT";
  pub const MAX_PCT_VAR: &'static str = "STRATEGY_PAYOFF_MAX_PCT";
  pub const RATE_VAR: &'static str = "STRATEGY_PAYOFF_RATE";
  pub const VOLATILITY_VAR: &'static str = "STRATEGY_PAYOFF_VOLATILITY";

  pub fn samples(mut self, samples: usize) -> Self {
    self.samples = samples;
    self
  }

  pub fn range_pct(mut self, min_pct: f64, max_pct: f64) -> Self {
    self.min_pct = min_pct;
    self.max_pct = max_pct;
    self
  }

  pub fn rate(mut self, rate: f64) -> Self {
    self.rate = rate;
    self
  }

  pub fn volatility(mut self, volatility: f64) -> Self {
    self.volatility = volatility;
    self
  }

  pub fn validate(&self) -> anyhow::Result<()> {
    if self.samples < 2 {
      bail!("samples must be at least 2, got {}", self.samples);
    }
    if !(0.0..=100.0).contains(&self.min_pct) {
      bail!("minimum percentage must lie in [0, 100], got {}", self.min_pct);
    }
    if !(100.0..=200.0).contains(&self.max_pct) {
      bail!("maximum percentage must lie in [100, 200], got {}", self.max_pct);
    }
    if self.min_pct >= self.max_pct {
      bail!(
        "minimum percentage {} must be below maximum {}",
        self.min_pct,
        self.max_pct
      );
    }
    if !self.rate.is_finite() {
      bail!("rate must be finite, got {}", self.rate);
    }
    if !self.volatility.is_finite() || self.volatility < 0.0 {
      bail!("volatility must be finite and non-negative, got {}", self.volatility);
    }
    Ok(())
  }

  /// Defaults overridden by any `STRATEGY_PAYOFF_*` variables that are set.
  pub fn from_env() -> anyhow::Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
    let mut config = Self::default();

    if let Some(samples) = parse_var(&lookup, Self::SAMPLES_VAR)? {
      config.samples = samples;
    }
    if let Some(min_pct) = parse_var(&lookup, Self::MIN_PCT_VAR)? {
      config.min_pct = min_pct;
    }
    if let Some(max_pct) = parse_var(&lookup, Self::MAX_PCT_VAR)? {
      config.max_pct = max_pct;
    }
    if let Some(rate) = parse_var(&lookup, Self::RATE_VAR)? {
      config.rate = rate;
    }
    if let Some(volatility) = parse_var(&lookup, Self::VOLATILITY_VAR)? {
      config.volatility = volatility;
    }

    config.validate()?;
    Ok(config)
  }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
  T: FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  lookup(key)
    .map(|raw| {
      raw
        .trim()
        .parse::<T>()
        .with_context(|| format!("invalid value {raw:?} for {key}"))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars = vars
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect::<HashMap<_, _>>();
    move |key| vars.get(key).cloned()
  }

  #[test]
  fn defaults_are_valid() {
    let config = EvaluationConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.samples, 100);
  }

  #[test]
  fn overrides_from_variables() {
    let config = EvaluationConfig::from_lookup(lookup(&[
      ("STRATEGY_PAYOFF_SAMPLES", "250"),
      ("STRATEGY_PAYOFF_MAX_PCT", "180"),
      ("STRATEGY_PAYOFF_VOLATILITY", "0.35"),
    ]))
    .unwrap();
    assert_eq!(config.samples, 250);
    assert_eq!(config.max_pct, 180.0);
    assert_eq!(config.volatility, 0.35);
    assert_eq!(config.min_pct, 50.0);
  }

  #[test]
  fn rejects_bad_values() {
    let err = EvaluationConfig::from_lookup(lookup(&[("STRATEGY_PAYOFF_SAMPLES", "many")]))
      .unwrap_err();
    assert!(err.to_string().contains("STRATEGY_PAYOFF_SAMPLES"));

    assert!(EvaluationConfig::default().range_pct(40.0, 220.0).validate().is_err());
    assert!(EvaluationConfig::default().samples(1).validate().is_err());
  }
}
