use std::collections::BTreeMap;

use chrono::NaiveDate;
use impl_new_derive::ImplNew;
use ordered_float::OrderedFloat;

use crate::quant::pricing::bsm::BSMPricer;
use crate::quant::OptionType;
use crate::traits::PricerExt;
use crate::traits::TimeExt;
use crate::traits::HORIZON_EPSILON;

pub type Strike = OrderedFloat<f64>;

/// One quoted contract: strike and last traded premium.
#[derive(ImplNew, Clone, Copy, PartialEq, Debug)]
pub struct Quote {
  pub strike: f64,
  pub premium: f64,
}

/// Calls and puts of one expiration, keyed by strike.
#[derive(Default, Clone, PartialEq, Debug)]
pub struct OptionChain {
  calls: BTreeMap<Strike, f64>,
  puts: BTreeMap<Strike, f64>,
}

impl OptionChain {
  pub fn from_quotes(calls: &[Quote], puts: &[Quote]) -> Self {
    let mut chain = Self::default();
    for quote in calls {
      chain.insert(OptionType::Call, *quote);
    }
    for quote in puts {
      chain.insert(OptionType::Put, *quote);
    }
    chain
  }

  pub fn insert(&mut self, option_type: OptionType, quote: Quote) {
    self.side_mut(option_type).insert(OrderedFloat(quote.strike), quote.premium);
  }

  pub fn premium(&self, option_type: OptionType, strike: f64) -> Option<f64> {
    self.side(option_type).get(&OrderedFloat(strike)).copied()
  }

  /// Quoted strikes, ascending.
  pub fn strikes(&self, option_type: OptionType) -> Vec<f64> {
    self.side(option_type).keys().map(|k| k.into_inner()).collect()
  }

  pub fn quotes(&self, option_type: OptionType) -> Vec<Quote> {
    self
      .side(option_type)
      .iter()
      .map(|(k, p)| Quote::new(k.into_inner(), *p))
      .collect()
  }

  fn side(&self, option_type: OptionType) -> &BTreeMap<Strike, f64> {
    match option_type {
      OptionType::Call => &self.calls,
      OptionType::Put => &self.puts,
    }
  }

  fn side_mut(&mut self, option_type: OptionType) -> &mut BTreeMap<Strike, f64> {
    match option_type {
      OptionType::Call => &mut self.calls,
      OptionType::Put => &mut self.puts,
    }
  }
}

struct Expiry {
  eval: NaiveDate,
  expiration: NaiveDate,
}

impl TimeExt for Expiry {
  fn tau(&self) -> Option<f64> {
    None
  }

  fn eval(&self) -> Option<NaiveDate> {
    Some(self.eval)
  }

  fn expiration(&self) -> Option<NaiveDate> {
    Some(self.expiration)
  }
}

/// Spot and option chains of one underlying as fetched on `eval`.
#[derive(Clone, PartialEq, Debug)]
pub struct ChainSnapshot {
  spot: f64,
  eval: NaiveDate,
  expirations: BTreeMap<NaiveDate, OptionChain>,
}

impl ChainSnapshot {
  pub fn new(spot: f64, eval: NaiveDate) -> Self {
    Self {
      spot,
      eval,
      expirations: BTreeMap::new(),
    }
  }

  /// Arbitrage-free snapshot with every strike priced by Black-Scholes.
  pub fn black_scholes(
    spot: f64,
    eval: NaiveDate,
    expirations: &[NaiveDate],
    strikes: &[f64],
    rate: f64,
    volatility: f64,
  ) -> Self {
    let mut snapshot = Self::new(spot, eval);
    for expiration in expirations {
      let tau = snapshot.horizon(*expiration);
      let mut chain = OptionChain::default();
      for &k in strikes {
        let (call, put) = BSMPricer::builder(spot, volatility, k, rate)
          .tau(tau)
          .build()
          .calculate_call_put();
        chain.insert(OptionType::Call, Quote::new(k, call));
        chain.insert(OptionType::Put, Quote::new(k, put));
      }
      snapshot.expirations.insert(*expiration, chain);
    }
    snapshot
  }

  pub fn with_expiration(mut self, expiration: NaiveDate, chain: OptionChain) -> Self {
    self.expirations.insert(expiration, chain);
    self
  }

  pub fn spot(&self) -> f64 {
    self.spot
  }

  pub fn eval(&self) -> NaiveDate {
    self.eval
  }

  /// Quoted expirations, earliest first.
  pub fn expirations(&self) -> Vec<NaiveDate> {
    self.expirations.keys().copied().collect()
  }

  pub fn contains(&self, expiration: NaiveDate) -> bool {
    self.expirations.contains_key(&expiration)
  }

  pub fn chain(&self, expiration: NaiveDate) -> Option<&OptionChain> {
    self.expirations.get(&expiration)
  }

  /// Years from the snapshot date to `expiration`.
  pub fn horizon(&self, expiration: NaiveDate) -> f64 {
    Expiry {
      eval: self.eval,
      expiration,
    }
    .calculate_tau_in_years()
  }

  /// The quoted expiration whose horizon is `horizon`.
  pub fn expiration_at(&self, horizon: f64) -> Option<NaiveDate> {
    self
      .expirations
      .keys()
      .copied()
      .find(|date| (self.horizon(*date) - horizon).abs() <= HORIZON_EPSILON)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strikes_are_sorted_and_premiums_found() {
    let chain = OptionChain::from_quotes(
      &[Quote::new(110.0, 2.0), Quote::new(100.0, 5.0)],
      &[Quote::new(95.0, 1.5)],
    );
    assert_eq!(chain.strikes(OptionType::Call), vec![100.0, 110.0]);
    assert_eq!(chain.premium(OptionType::Call, 110.0), Some(2.0));
    assert_eq!(chain.premium(OptionType::Put, 110.0), None);
  }

  #[test]
  fn horizon_and_lookup() {
    let eval = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let near = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
    let snapshot = ChainSnapshot::new(100.0, eval).with_expiration(near, OptionChain::default());

    let horizon = snapshot.horizon(near);
    assert_eq!(horizon, 60.0 / 365.0);
    assert_eq!(snapshot.expiration_at(horizon), Some(near));
    assert_eq!(snapshot.expiration_at(0.5), None);
  }

  #[test]
  fn black_scholes_chain_is_monotone() {
    let eval = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let expiry = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
    let snapshot =
      ChainSnapshot::black_scholes(100.0, eval, &[expiry], &[90.0, 100.0, 110.0], 0.05, 0.2);
    let chain = snapshot.chain(expiry).unwrap();

    let calls = chain.quotes(OptionType::Call);
    let puts = chain.quotes(OptionType::Put);
    assert!(calls.windows(2).all(|w| w[0].premium > w[1].premium));
    assert!(puts.windows(2).all(|w| w[0].premium < w[1].premium));
  }
}
