use chrono::NaiveDate;
use thiserror::Error;

use super::types::Instrument;
pub use crate::quant::pricing::bsm::DegenerateValuationError;

/// A leg that cannot exist.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidLegError {
  #[error("quantity must be positive, got {0}")]
  Quantity(u32),
  #[error("strike must be positive and finite, got {0}")]
  Strike(f64),
  #[error("premium must be non-negative and finite, got {0}")]
  Premium(f64),
  #[error("horizon must be non-negative and finite, got {0}")]
  Horizon(f64),
}

/// Which side of the spot a strike has to sit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotSide {
  AtOrBelow,
  AtOrAbove,
}

impl std::fmt::Display for SpotSide {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SpotSide::AtOrBelow => write!(f, "at or below"),
      SpotSide::AtOrAbove => write!(f, "at or above"),
    }
  }
}

/// A structural rule of a strategy template broken by the chosen legs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintViolation {
  #[error("{strategy} needs {expected} legs, got {found}")]
  LegCount {
    strategy: &'static str,
    expected: usize,
    found: usize,
  },
  #[error("leg {leg} of {strategy} should be {expected}, got {found}")]
  RoleMismatch {
    strategy: &'static str,
    leg: usize,
    expected: String,
    found: String,
  },
  #[error("leg {leg} of {strategy} must trade {expected} contracts, got {found}")]
  Quantity {
    strategy: &'static str,
    leg: usize,
    expected: u32,
    found: u32,
  },
  #[error("legs sharing {slot} use different strikes {strikes:?}")]
  SharedStrike {
    slot: &'static str,
    strikes: Vec<f64>,
  },
  #[error("strikes {slots:?} must be strictly increasing, got {strikes:?}")]
  Ordering {
    slots: Vec<&'static str>,
    strikes: Vec<f64>,
  },
  #[error("strikes {slots:?} must be equally spaced, got {strikes:?}")]
  Equidistance {
    slots: Vec<&'static str>,
    strikes: Vec<f64>,
  },
  #[error("lower wing {lower} must be wider than upper wing {upper}")]
  WingSpacing { lower: f64, upper: f64 },
  #[error("{slot} = {strike} is outside the at-the-money band ({low}, {high})")]
  AtmBand {
    slot: &'static str,
    strike: f64,
    low: f64,
    high: f64,
  },
  #[error("{slot} = {strike} must be {side} spot {spot}")]
  SpotBound {
    slot: &'static str,
    strike: f64,
    spot: f64,
    side: SpotSide,
  },
  #[error("{rule}: got {long} long against {short} short")]
  QuantityRatio {
    rule: &'static str,
    long: u32,
    short: u32,
  },
  #[error("far horizon {far} must come after near horizon {near}")]
  MaturityOrder { near: f64, far: f64 },
  #[error("legs expected on one expiration use horizons {expected} and {found}")]
  HorizonMismatch { expected: f64, found: f64 },
  #[error("{instrument} {strike} with horizon {horizon} is not quoted")]
  NotQuoted {
    instrument: Instrument,
    strike: f64,
    horizon: f64,
  },
}

/// The chain offers nothing that satisfies a role given earlier choices.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("no admissible {choice} for {strategy}: {reason}")]
pub struct NoAdmissibleChoiceError {
  pub strategy: &'static str,
  pub choice: String,
  pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
  #[error(transparent)]
  InvalidLeg(#[from] InvalidLegError),
  #[error(transparent)]
  Constraint(#[from] ConstraintViolation),
  #[error(transparent)]
  NoAdmissibleChoice(#[from] NoAdmissibleChoiceError),
  #[error(transparent)]
  DegenerateValuation(#[from] DegenerateValuationError),
  #[error("unknown strategy {0:?}")]
  UnknownStrategy(String),
  #[error("a position needs at least one leg")]
  EmptyPosition,
  #[error("a position holds at most one stock leg, got {0}")]
  MultipleStockLegs(usize),
  #[error("expiration {0} is not in the chain")]
  UnknownExpiration(NaiveDate),
  #[error("selection is missing the {0}")]
  IncompleteSelection(String),
  #[error("sampled payoff has no ordered extremum")]
  UnorderedPayoff,
  #[error("reference price {0} leaves no price range to evaluate")]
  DegenerateRange(f64),
}
