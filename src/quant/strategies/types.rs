use std::fmt::Display;

use crate::quant::pricing::bsm::BSMPricer;
use crate::quant::OptionType;
use crate::traits::PricerExt;
use crate::traits::TimeExt;
use crate::traits::HORIZON_EPSILON;

use super::chain::ChainSnapshot;
use super::config::EvaluationConfig;
use super::error::ConstraintViolation;
use super::error::InvalidLegError;
use super::error::StrategyError;

/// Instrument traded by a leg.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Instrument {
  Stock,
  Call,
  Put,
}

impl Instrument {
  pub fn option_type(&self) -> Option<OptionType> {
    match self {
      Instrument::Stock => None,
      Instrument::Call => Some(OptionType::Call),
      Instrument::Put => Some(OptionType::Put),
    }
  }
}

impl From<OptionType> for Instrument {
  fn from(option_type: OptionType) -> Self {
    match option_type {
      OptionType::Call => Instrument::Call,
      OptionType::Put => Instrument::Put,
    }
  }
}

impl Display for Instrument {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Instrument::Stock => write!(f, "Stock"),
      Instrument::Call => write!(f, "Call"),
      Instrument::Put => write!(f, "Put"),
    }
  }
}

/// Side of a leg.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
  Long,
  Short,
}

impl Direction {
  pub fn sign(&self) -> f64 {
    match self {
      Direction::Long => 1.0,
      Direction::Short => -1.0,
    }
  }
}

impl Display for Direction {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Direction::Long => write!(f, "Long"),
      Direction::Short => write!(f, "Short"),
    }
  }
}

/// One stock or option component of a position.
///
/// For stock the premium is the entry price and the horizon is zero.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Leg {
  instrument: Instrument,
  direction: Direction,
  quantity: u32,
  strike: Option<f64>,
  premium: f64,
  horizon: f64,
}

impl Leg {
  pub fn stock(direction: Direction, quantity: u32, entry: f64) -> Result<Self, InvalidLegError> {
    check_quantity(quantity)?;
    check_premium(entry)?;

    Ok(Self {
      instrument: Instrument::Stock,
      direction,
      quantity,
      strike: None,
      premium: entry,
      horizon: 0.0,
    })
  }

  pub fn option(
    option_type: OptionType,
    direction: Direction,
    quantity: u32,
    strike: f64,
    premium: f64,
    horizon: f64,
  ) -> Result<Self, InvalidLegError> {
    check_quantity(quantity)?;
    if !strike.is_finite() || strike <= 0.0 {
      return Err(InvalidLegError::Strike(strike));
    }
    check_premium(premium)?;
    if !horizon.is_finite() || horizon < 0.0 {
      return Err(InvalidLegError::Horizon(horizon));
    }

    Ok(Self {
      instrument: option_type.into(),
      direction,
      quantity,
      strike: Some(strike),
      premium,
      horizon,
    })
  }

  pub fn instrument(&self) -> Instrument {
    self.instrument
  }

  pub fn direction(&self) -> Direction {
    self.direction
  }

  pub fn quantity(&self) -> u32 {
    self.quantity
  }

  pub fn strike(&self) -> Option<f64> {
    self.strike
  }

  pub fn premium(&self) -> f64 {
    self.premium
  }

  pub fn horizon(&self) -> f64 {
    self.horizon
  }

  pub fn is_option(&self) -> bool {
    self.instrument != Instrument::Stock
  }

  /// Signed quantity: positive when long.
  pub fn exposure(&self) -> f64 {
    self.direction.sign() * self.quantity as f64
  }

  /// Unit value at underlying price `s` once `elapsed` years have passed.
  ///
  /// Expired options are worth their intrinsic value, live ones are priced with
  /// Black-Scholes over the time they have left.
  pub fn value_at(&self, s: f64, elapsed: f64, rate: f64, volatility: f64) -> f64 {
    let (Some(option_type), Some(strike)) = (self.instrument.option_type(), self.strike) else {
      return s;
    };

    let pricer = BSMPricer::builder(s, volatility, strike, rate)
      .tau(self.remaining_after(elapsed))
      .option_type(option_type)
      .build();

    if self.is_expired_at(elapsed) {
      pricer.intrinsic()
    } else {
      pricer.calculate_price()
    }
  }

  /// Profit or loss of this leg at underlying price `s`, net of its entry premium.
  pub fn contribution(&self, s: f64, elapsed: f64, rate: f64, volatility: f64) -> f64 {
    self.exposure() * (self.value_at(s, elapsed, rate, volatility) - self.premium)
  }
}

impl TimeExt for Leg {
  fn tau(&self) -> Option<f64> {
    Some(self.horizon)
  }
}

impl Display for Leg {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.strike {
      Some(strike) => write!(
        f,
        "{} {} {} K={} @ {} (T={:.4})",
        self.direction, self.quantity, self.instrument, strike, self.premium, self.horizon
      ),
      None => write!(
        f,
        "{} {} {} @ {}",
        self.direction, self.quantity, self.instrument, self.premium
      ),
    }
  }
}

fn check_quantity(quantity: u32) -> Result<(), InvalidLegError> {
  if quantity == 0 {
    return Err(InvalidLegError::Quantity(quantity));
  }
  Ok(())
}

fn check_premium(premium: f64) -> Result<(), InvalidLegError> {
  if !premium.is_finite() || premium < 0.0 {
    return Err(InvalidLegError::Premium(premium));
  }
  Ok(())
}

/// An ordered set of legs forming one strategy instance.
#[derive(Clone, PartialEq, Debug)]
pub struct Position {
  legs: Vec<Leg>,
}

impl Position {
  pub fn new(legs: Vec<Leg>) -> Result<Self, StrategyError> {
    if legs.is_empty() {
      return Err(StrategyError::EmptyPosition);
    }

    let stocks = legs.iter().filter(|leg| !leg.is_option()).count();
    if stocks > 1 {
      return Err(StrategyError::MultipleStockLegs(stocks));
    }

    Ok(Self { legs })
  }

  pub fn legs(&self) -> &[Leg] {
    &self.legs
  }

  pub fn option_legs(&self) -> impl Iterator<Item = &Leg> {
    self.legs.iter().filter(|leg| leg.is_option())
  }

  pub fn stock_leg(&self) -> Option<&Leg> {
    self.legs.iter().find(|leg| !leg.is_option())
  }

  /// Net premium of the option legs: positive for a debit, negative for a credit.
  ///
  /// The stock leg's entry price is a cost basis, not a premium, and is left out.
  pub fn net_premium(&self) -> f64 {
    self
      .option_legs()
      .map(|leg| leg.exposure() * leg.premium())
      .sum()
  }

  /// Earliest option expiration, the date at which the payoff is read.
  pub fn evaluation_horizon(&self) -> f64 {
    self
      .option_legs()
      .map(|leg| leg.horizon())
      .reduce(f64::min)
      .unwrap_or(0.0)
  }

  /// Whether some option leg outlives the evaluation horizon.
  pub fn is_multi_horizon(&self) -> bool {
    let horizon = self.evaluation_horizon();
    self
      .option_legs()
      .any(|leg| leg.horizon() - horizon > HORIZON_EPSILON)
  }

  /// Distinct strikes, ascending.
  pub fn strikes(&self) -> Vec<f64> {
    let mut strikes = self.legs.iter().filter_map(|leg| leg.strike()).collect::<Vec<_>>();
    strikes.sort_by(f64::total_cmp);
    strikes.dedup_by(|a, b| (*a - *b).abs() <= strike_tolerance(*b));
    strikes
  }

  /// Centre of the default price range.
  pub fn reference_price(&self) -> f64 {
    let strikes = self.strikes();
    if strikes.is_empty() {
      return self.stock_leg().map(|leg| leg.premium()).unwrap_or(0.0);
    }
    strikes.iter().sum::<f64>() / strikes.len() as f64
  }

  /// Slope of the expiration payoff above the highest strike.
  pub fn upside_exposure(&self) -> i64 {
    self
      .legs
      .iter()
      .filter(|leg| leg.instrument() != Instrument::Put)
      .map(|leg| leg.exposure() as i64)
      .sum()
  }

  /// Check every option leg against the quotes it claims to trade.
  pub fn verify_quotes(&self, chain: &ChainSnapshot) -> Result<(), ConstraintViolation> {
    for leg in self.option_legs() {
      let (Some(option_type), Some(strike)) = (leg.instrument().option_type(), leg.strike()) else {
        continue;
      };

      let quoted = chain
        .expiration_at(leg.horizon())
        .and_then(|date| chain.chain(date))
        .and_then(|options| options.premium(option_type, strike));

      if quoted.is_none() {
        return Err(ConstraintViolation::NotQuoted {
          instrument: leg.instrument(),
          strike,
          horizon: leg.horizon(),
        });
      }
    }
    Ok(())
  }
}

/// Strikes closer than this are the same strike.
pub(crate) fn strike_tolerance(k: f64) -> f64 {
  1e-9 * k.abs().max(1.0)
}

/// A profit or loss figure that may have no finite bound.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Bound {
  Finite(f64),
  Unbounded,
}

impl Bound {
  pub fn value(&self) -> Option<f64> {
    match self {
      Bound::Finite(v) => Some(*v),
      Bound::Unbounded => None,
    }
  }

  pub fn is_unbounded(&self) -> bool {
    matches!(self, Bound::Unbounded)
  }
}

impl Display for Bound {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Bound::Finite(v) => write!(f, "{:.2}", v),
      Bound::Unbounded => write!(f, "unbounded"),
    }
  }
}

/// How the risk figures were obtained.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MetricsMode {
  /// Exact, from the kinks of a piecewise-linear payoff.
  Analytic,
  /// Approximate, read off a payoff sampled at `samples` points.
  Numeric { samples: usize },
}

#[derive(Clone, PartialEq, Debug)]
pub struct RiskMetrics {
  pub net_premium: f64,
  pub max_profit: Bound,
  pub max_loss: Bound,
  /// Ascending.
  pub breakevens: Vec<f64>,
  pub mode: MetricsMode,
}

/// Price range, sample count and market inputs of one evaluation.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct EvaluationRequest {
  s_min: f64,
  s_max: f64,
  samples: usize,
  rate: f64,
  volatility: f64,
}

impl EvaluationRequest {
  pub fn new(s_min: f64, s_max: f64, samples: usize) -> Self {
    assert!(samples >= 2, "at least two samples are required");
    assert!(
      s_min.is_finite() && s_max.is_finite(),
      "price range must be finite"
    );
    assert!(s_min >= 0.0, "price range must start at or above zero");
    assert!(s_max > s_min, "price range must be increasing");

    let defaults = EvaluationConfig::default();
    Self {
      s_min,
      s_max,
      samples,
      rate: defaults.rate,
      volatility: defaults.volatility,
    }
  }

  /// Range of `config.min_pct`..`config.max_pct` percent around `reference`.
  pub fn from_config(config: &EvaluationConfig, reference: f64) -> Self {
    Self::new(
      reference * config.min_pct / 100.0,
      reference * config.max_pct / 100.0,
      config.samples,
    )
    .rate(config.rate)
    .volatility(config.volatility)
  }

  pub fn rate(mut self, rate: f64) -> Self {
    assert!(rate.is_finite(), "rate must be finite");
    self.rate = rate;
    self
  }

  pub fn volatility(mut self, volatility: f64) -> Self {
    assert!(
      volatility.is_finite() && volatility >= 0.0,
      "volatility must be finite and non-negative"
    );
    self.volatility = volatility;
    self
  }

  pub fn s_min(&self) -> f64 {
    self.s_min
  }

  pub fn s_max(&self) -> f64 {
    self.s_max
  }

  pub fn samples(&self) -> usize {
    self.samples
  }

  pub fn risk_free_rate(&self) -> f64 {
    self.rate
  }

  pub fn sigma(&self) -> f64 {
    self.volatility
  }
}
