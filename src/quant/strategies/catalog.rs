//! # Strategy Catalog
//!
//! $$
//! \mathcal T=\bigl(\text{roles}_{1..n},\ \mathcal C(K_1,\dots,K_m,S_0)\bigr)
//! $$
//!
//! Static registry of named strategy templates. A template lists its leg roles in
//! order, the strike slots the roles draw from and the structural constraints
//! between those strikes. Moneyness labels on roles are advisory.
use std::fmt::Display;
use std::sync::LazyLock;

use tracing::warn;

use crate::quant::Moneyness;
use crate::quant::Moneyness::AtTheMoney as Atm;
use crate::quant::Moneyness::InTheMoney as Itm;
use crate::quant::Moneyness::OutOfTheMoney as Otm;
use crate::traits::HORIZON_EPSILON;

use super::chain::ChainSnapshot;
use super::error::ConstraintViolation;
use super::error::SpotSide;
use super::error::StrategyError;
use super::selector::Selection;
use super::types::strike_tolerance;
use super::types::Direction;
use super::types::Direction::Long as L;
use super::types::Direction::Short as S;
use super::types::Instrument;
use super::types::Leg;
use super::types::Position;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Family {
  Covered,
  Protective,
  VerticalSpread,
  SyntheticForward,
  Combo,
  Ladder,
  Calendar,
  Diagonal,
  Straddle,
  Strangle,
  Guts,
  SyntheticStraddle,
  CoveredShort,
  StrapStrip,
  RatioBackspread,
  RatioSpread,
  Butterfly,
  IronButterfly,
  Condor,
  IronCondor,
  BoxSpread,
  Collar,
  Seagull,
}

/// Menu a strategy is offered under.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MarketView {
  Bullish,
  Bearish,
  HighVolatility,
  LowVolatility,
}

impl Display for MarketView {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      MarketView::Bullish => write!(f, "Bullish"),
      MarketView::Bearish => write!(f, "Bearish"),
      MarketView::HighVolatility => write!(f, "High Volatility"),
      MarketView::LowVolatility => write!(f, "Low Volatility"),
    }
  }
}

/// Expected sign of the net premium for any admissible strike choice.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PremiumFlow {
  Debit,
  Credit,
  Either,
}

/// Which selected expiration a role trades.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExpirySlot {
  Near,
  Far,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RoleQuantity {
  Fixed(u32),
  /// Picked by the caller, subject to the template's ratio rule.
  Chosen { default: u32 },
}

impl RoleQuantity {
  pub fn default_quantity(&self) -> u32 {
    match self {
      RoleQuantity::Fixed(n) => *n,
      RoleQuantity::Chosen { default } => *default,
    }
  }
}

/// One leg slot of a template.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct LegRole {
  pub instrument: Instrument,
  pub direction: Direction,
  pub quantity: RoleQuantity,
  /// Strike slot, `None` for stock.
  pub slot: Option<usize>,
  pub expiry: ExpirySlot,
  pub moneyness: Option<Moneyness>,
}

impl LegRole {
  pub fn stock(direction: Direction) -> Self {
    Self {
      instrument: Instrument::Stock,
      direction,
      quantity: RoleQuantity::Fixed(1),
      slot: None,
      expiry: ExpirySlot::Near,
      moneyness: None,
    }
  }

  pub fn call(direction: Direction, slot: usize) -> Self {
    Self::option(Instrument::Call, direction, slot)
  }

  pub fn put(direction: Direction, slot: usize) -> Self {
    Self::option(Instrument::Put, direction, slot)
  }

  fn option(instrument: Instrument, direction: Direction, slot: usize) -> Self {
    Self {
      instrument,
      direction,
      quantity: RoleQuantity::Fixed(1),
      slot: Some(slot),
      expiry: ExpirySlot::Near,
      moneyness: None,
    }
  }

  pub fn times(mut self, quantity: u32) -> Self {
    self.quantity = RoleQuantity::Fixed(quantity);
    self
  }

  pub fn chosen(mut self, default: u32) -> Self {
    self.quantity = RoleQuantity::Chosen { default };
    self
  }

  pub fn far(mut self) -> Self {
    self.expiry = ExpirySlot::Far;
    self
  }

  pub fn labelled(mut self, moneyness: Moneyness) -> Self {
    self.moneyness = Some(moneyness);
    self
  }

  fn describe(&self) -> String {
    format!("{} {}", self.direction, self.instrument)
  }
}

/// Structural rule on the strikes of a template, by slot index.
#[derive(Clone, PartialEq, Debug)]
pub enum Constraint {
  /// Strictly increasing in the listed order.
  Increasing(Vec<usize>),
  /// Equal spacing between consecutive listed slots.
  Equidistant(Vec<usize>),
  /// `body - lower > upper - body`.
  LowerWingWider {
    lower: usize,
    body: usize,
    upper: usize,
  },
  /// `round(0.9 S0) < K < round(1.1 S0)`, rounding half to even.
  AtmBand(usize),
  /// `K <= S0`.
  AtOrBelowSpot(usize),
  /// `K >= S0`.
  AtOrAboveSpot(usize),
}

impl Constraint {
  /// Check the assigned strikes; unassigned slots are skipped.
  pub fn check(
    &self,
    names: &[&'static str],
    strikes: &[Option<f64>],
    spot: f64,
  ) -> Result<(), ConstraintViolation> {
    let at = |slot: usize| strikes.get(slot).copied().flatten();

    match self {
      Constraint::Increasing(slots) => {
        let assigned = assigned(slots, strikes);
        let ordered = assigned
          .windows(2)
          .all(|w| w[1].1 - w[0].1 > strike_tolerance(w[1].1));
        if !ordered {
          return Err(ConstraintViolation::Ordering {
            slots: assigned.iter().map(|(s, _)| names[*s]).collect(),
            strikes: assigned.iter().map(|(_, k)| *k).collect(),
          });
        }
      }
      Constraint::Equidistant(slots) => {
        let prefix = slots
          .iter()
          .map_while(|s| at(*s).map(|k| (*s, k)))
          .collect::<Vec<_>>();
        if prefix.len() >= 3 {
          let kappa = prefix[1].1 - prefix[0].1;
          let equal = prefix
            .windows(2)
            .all(|w| ((w[1].1 - w[0].1) - kappa).abs() <= strike_tolerance(w[1].1));
          if !equal {
            return Err(ConstraintViolation::Equidistance {
              slots: prefix.iter().map(|(s, _)| names[*s]).collect(),
              strikes: prefix.iter().map(|(_, k)| *k).collect(),
            });
          }
        }
      }
      Constraint::LowerWingWider { lower, body, upper } => {
        if let (Some(k1), Some(k2), Some(k3)) = (at(*lower), at(*body), at(*upper)) {
          let (lower, upper) = (k2 - k1, k3 - k2);
          if lower - upper <= strike_tolerance(k2) {
            return Err(ConstraintViolation::WingSpacing { lower, upper });
          }
        }
      }
      Constraint::AtmBand(slot) => {
        if let Some(k) = at(*slot) {
          let (low, high) = ((0.9 * spot).round_ties_even(), (1.1 * spot).round_ties_even());
          if !(k > low && k < high) {
            return Err(ConstraintViolation::AtmBand {
              slot: names[*slot],
              strike: k,
              low,
              high,
            });
          }
        }
      }
      Constraint::AtOrBelowSpot(slot) => {
        if let Some(k) = at(*slot) {
          if k - spot > strike_tolerance(spot) {
            return Err(ConstraintViolation::SpotBound {
              slot: names[*slot],
              strike: k,
              spot,
              side: SpotSide::AtOrBelow,
            });
          }
        }
      }
      Constraint::AtOrAboveSpot(slot) => {
        if let Some(k) = at(*slot) {
          if spot - k > strike_tolerance(spot) {
            return Err(ConstraintViolation::SpotBound {
              slot: names[*slot],
              strike: k,
              spot,
              side: SpotSide::AtOrAbove,
            });
          }
        }
      }
    }
    Ok(())
  }
}

fn assigned(slots: &[usize], strikes: &[Option<f64>]) -> Vec<(usize, f64)> {
  slots
    .iter()
    .filter_map(|s| strikes.get(*s).copied().flatten().map(|k| (*s, k)))
    .collect()
}

/// Quantity relation between the long and short legs of a ratio strategy.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RatioRule {
  LongExceedsShort,
  ShortExceedsLong,
}

impl RatioRule {
  pub fn check(&self, long: u32, short: u32) -> Result<(), ConstraintViolation> {
    let (ok, rule) = match self {
      RatioRule::LongExceedsShort => (long > short, "long quantity must exceed short"),
      RatioRule::ShortExceedsLong => (long < short, "short quantity must exceed long"),
    };
    if ok {
      Ok(())
    } else {
      Err(ConstraintViolation::QuantityRatio { rule, long, short })
    }
  }
}

#[derive(Clone, PartialEq, Debug)]
pub struct StrategyTemplate {
  pub name: &'static str,
  pub family: Family,
  pub flow: PremiumFlow,
  /// Display names of the strike slots.
  pub slots: &'static [&'static str],
  pub roles: Vec<LegRole>,
  pub constraints: Vec<Constraint>,
  pub ratio: Option<RatioRule>,
  pub outlook: &'static str,
  pub notes: &'static str,
}

impl StrategyTemplate {
  fn new(
    name: &'static str,
    family: Family,
    flow: PremiumFlow,
    slots: &'static [&'static str],
    roles: Vec<LegRole>,
  ) -> Self {
    Self {
      name,
      family,
      flow,
      slots,
      roles,
      constraints: Vec::new(),
      ratio: None,
      outlook: "",
      notes: "",
    }
  }

  fn constraint(mut self, constraint: Constraint) -> Self {
    self.constraints.push(constraint);
    self
  }

  fn ratio(mut self, rule: RatioRule) -> Self {
    self.ratio = Some(rule);
    self
  }

  fn describe(mut self, outlook: &'static str, notes: &'static str) -> Self {
    self.outlook = outlook;
    self.notes = notes;
    self
  }

  /// Whether the template spans a near and a far expiration.
  pub fn is_multi_expiry(&self) -> bool {
    self.roles.iter().any(|role| role.expiry == ExpirySlot::Far)
  }

  pub fn has_stock(&self) -> bool {
    self.roles.iter().any(|role| role.instrument == Instrument::Stock)
  }

  /// Roles drawing their strike from `slot`.
  pub fn roles_using(&self, slot: usize) -> impl Iterator<Item = &LegRole> {
    self.roles.iter().filter(move |role| role.slot == Some(slot))
  }

  /// Menus listing this template.
  pub fn views(&self) -> Vec<MarketView> {
    MENUS
      .iter()
      .filter(|(_, names)| names.contains(&self.name))
      .map(|(view, _)| *view)
      .collect()
  }

  pub fn default_quantities(&self) -> Vec<u32> {
    self
      .roles
      .iter()
      .map(|role| role.quantity.default_quantity())
      .collect()
  }

  /// Check a possibly partial strike assignment against every constraint.
  pub fn check_strikes(
    &self,
    strikes: &[Option<f64>],
    spot: f64,
  ) -> Result<(), ConstraintViolation> {
    self
      .constraints
      .iter()
      .try_for_each(|constraint| constraint.check(self.slots, strikes, spot))
  }

  /// Check per-role quantities against the fixed counts and the ratio rule.
  pub fn check_quantities(&self, quantities: &[u32]) -> Result<(), ConstraintViolation> {
    for (leg, (role, quantity)) in self.roles.iter().zip(quantities).enumerate() {
      if let RoleQuantity::Fixed(expected) = role.quantity {
        if expected != *quantity {
          return Err(ConstraintViolation::Quantity {
            strategy: self.name,
            leg,
            expected,
            found: *quantity,
          });
        }
      }
    }

    if let Some(rule) = self.ratio {
      let total = |direction: Direction| -> u32 {
        self
          .roles
          .iter()
          .zip(quantities)
          .filter(|(role, _)| role.direction == direction && role.instrument != Instrument::Stock)
          .map(|(_, quantity)| *quantity)
          .sum()
      };
      rule.check(total(Direction::Long), total(Direction::Short))?;
    }
    Ok(())
  }

  /// Check that `position` is a structurally valid instance of this template.
  pub fn validate(&self, position: &Position, spot: f64) -> Result<(), ConstraintViolation> {
    let legs = position.legs();
    if legs.len() != self.roles.len() {
      return Err(ConstraintViolation::LegCount {
        strategy: self.name,
        expected: self.roles.len(),
        found: legs.len(),
      });
    }

    let mut strikes: Vec<Option<f64>> = vec![None; self.slots.len()];
    let mut near: Option<f64> = None;
    let mut far: Option<f64> = None;

    for (i, (role, leg)) in self.roles.iter().zip(legs).enumerate() {
      if role.instrument != leg.instrument() || role.direction != leg.direction() {
        return Err(ConstraintViolation::RoleMismatch {
          strategy: self.name,
          leg: i,
          expected: role.describe(),
          found: format!("{} {}", leg.direction(), leg.instrument()),
        });
      }

      let (Some(slot), Some(strike)) = (role.slot, leg.strike()) else {
        continue;
      };

      match strikes[slot] {
        Some(shared) if (shared - strike).abs() > strike_tolerance(strike) => {
          return Err(ConstraintViolation::SharedStrike {
            slot: self.slots[slot],
            strikes: vec![shared, strike],
          });
        }
        _ => strikes[slot] = Some(strike),
      }

      let horizon = match role.expiry {
        ExpirySlot::Near => &mut near,
        ExpirySlot::Far => &mut far,
      };
      match *horizon {
        Some(expected) if (expected - leg.horizon()).abs() > HORIZON_EPSILON => {
          return Err(ConstraintViolation::HorizonMismatch {
            expected,
            found: leg.horizon(),
          });
        }
        _ => *horizon = Some(leg.horizon()),
      }
    }

    if let (Some(near), Some(far)) = (near, far) {
      if far - near <= HORIZON_EPSILON {
        return Err(ConstraintViolation::MaturityOrder { near, far });
      }
    }

    let quantities = legs.iter().map(Leg::quantity).collect::<Vec<_>>();
    self.check_quantities(&quantities)?;
    self.check_strikes(&strikes, spot)
  }

  /// Build a position from the quotes picked in `selection`.
  pub fn assemble(
    &self,
    chain: &ChainSnapshot,
    selection: &Selection,
  ) -> Result<Position, StrategyError> {
    let near = selection
      .near
      .ok_or_else(|| StrategyError::IncompleteSelection("near expiration".into()))?;
    let far = if self.is_multi_expiry() {
      Some(
        selection
          .far
          .ok_or_else(|| StrategyError::IncompleteSelection("far expiration".into()))?,
      )
    } else {
      None
    };

    let mut legs = Vec::with_capacity(self.roles.len());
    for (i, role) in self.roles.iter().enumerate() {
      let quantity = selection
        .quantities
        .get(&i)
        .copied()
        .unwrap_or_else(|| role.quantity.default_quantity());

      let (Some(option_type), Some(slot)) = (role.instrument.option_type(), role.slot) else {
        legs.push(Leg::stock(role.direction, quantity, chain.spot())?);
        continue;
      };

      let strike = selection
        .strikes
        .get(slot)
        .copied()
        .flatten()
        .ok_or_else(|| StrategyError::IncompleteSelection(format!("strike {}", self.slots[slot])))?;
      let expiration = match role.expiry {
        ExpirySlot::Near => near,
        ExpirySlot::Far => far.unwrap_or(near),
      };
      let horizon = chain.horizon(expiration);
      let premium = chain
        .chain(expiration)
        .ok_or(StrategyError::UnknownExpiration(expiration))?
        .premium(option_type, strike)
        .ok_or(ConstraintViolation::NotQuoted {
          instrument: role.instrument,
          strike,
          horizon,
        })?;

      if let Some(label) = role.moneyness {
        let actual = Moneyness::classify(option_type, strike, chain.spot());
        if actual != label {
          warn!(
            strategy = self.name,
            leg = i,
            strike,
            expected = %label,
            actual = %actual,
            "strike does not match the role's moneyness label"
          );
        }
      }

      legs.push(Leg::option(
        option_type,
        role.direction,
        quantity,
        strike,
        premium,
        horizon,
      )?);
    }

    let position = Position::new(legs)?;
    self.validate(&position, chain.spot())?;
    Ok(position)
  }
}

static MENUS: [(MarketView, &[&str]); 4] = [
  (
    MarketView::Bullish,
    &[
      "Covered Call",
      "Protective Put",
      "Bull Call Spread",
      "Bull Put Spread",
      "Long Synthetic Forward",
      "Bull Call Ladder",
      "Bear Call Ladder",
      "Long Combo",
      "Diagonal Call Spread",
      "Covered Short Straddle",
      "Covered Short Strangle",
      "Strap",
      "Modified Call Butterfly",
      "Modified Put Butterfly",
      "Call Ratio Backspread",
      "Bullish Short Seagull Spread",
      "Bullish Long Seagull Spread",
    ],
  ),
  (
    MarketView::Bearish,
    &[
      "Covered Put",
      "Protective Call",
      "Bear Call Spread",
      "Bear Put Spread",
      "Short Synthetic Forward",
      "Short Combo",
      "Bull Put Ladder",
      "Bear Put Ladder",
      "Diagonal Put Spread",
      "Strip",
      "Put Ratio Backspread",
      "Ratio Put Spread",
      "Bearish Short Seagull Spread",
      "Bearish Long Seagull Spread",
    ],
  ),
  (
    MarketView::HighVolatility,
    &[
      "Long Straddle",
      "Long Strangle",
      "Long Guts",
      "Short Call Butterfly",
      "Short Put Butterfly",
      "Short Iron Butterfly",
      "Short Call Condor",
      "Short Put Condor",
      "Short Iron Condor",
      "Long Box",
      "Long Call Synthetic Straddle",
      "Long Put Synthetic Straddle",
    ],
  ),
  (
    MarketView::LowVolatility,
    &[
      "Calendar Call Spread",
      "Calendar Put Spread",
      "Short Straddle",
      "Short Strangle",
      "Short Guts",
      "Short Call Synthetic Straddle",
      "Short Put Synthetic Straddle",
      "Ratio Call Spread",
      "Ratio Put Spread",
      "Long Call Butterfly",
      "Long Put Butterfly",
      "Long Iron Butterfly",
      "Long Call Condor",
      "Long Put Condor",
      "Long Iron Condor",
      "Collar",
      "Long Box",
    ],
  ),
];

const K: &[&str] = &["K"];
const K12: &[&str] = &["K1", "K2"];
const K123: &[&str] = &["K1", "K2", "K3"];
const K1234: &[&str] = &["K1", "K2", "K3", "K4"];

static CATALOG: LazyLock<Vec<StrategyTemplate>> = LazyLock::new(build);

fn build() -> Vec<StrategyTemplate> {
  use Constraint::*;
  use Family::*;
  use PremiumFlow::*;

  let call = LegRole::call;
  let put = LegRole::put;
  let stock = LegRole::stock;

  vec![
    // stock overlays
    StrategyTemplate::new("Covered Call", Covered, Credit, K, vec![
      stock(L),
      call(S, 0).labelled(Otm),
    ])
    .describe(
      "Neutral to bullish",
      "Income from call premium on a held stock. Same payoff as a short put.",
    ),
    StrategyTemplate::new("Covered Put", Covered, Credit, K, vec![
      stock(S),
      put(S, 0).labelled(Otm),
    ])
    .describe(
      "Neutral to bearish",
      "Income from put premium on a short stock. Same payoff as a short call.",
    ),
    StrategyTemplate::new("Protective Put", Protective, Debit, K, vec![
      stock(L),
      put(L, 0),
    ])
    .constraint(AtOrBelowSpot(0))
    .describe("Bullish", "The put hedges the stock against a fall."),
    StrategyTemplate::new("Protective Call", Protective, Debit, K, vec![
      stock(S),
      call(L, 0),
    ])
    .constraint(AtOrAboveSpot(0))
    .describe("Bearish", "The call hedges the short stock against a rally."),
    // verticals
    StrategyTemplate::new("Bull Call Spread", VerticalSpread, Debit, K12, vec![
      call(L, 0).labelled(Atm),
      call(S, 1).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1]))
    .describe("Bullish", "Net debit. Capital gain if the stock rises."),
    StrategyTemplate::new("Bull Put Spread", VerticalSpread, Credit, K12, vec![
      put(L, 0).labelled(Otm),
      put(S, 1).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1]))
    .describe("Bullish", "Net credit. Income if the stock rises or holds."),
    StrategyTemplate::new("Bear Call Spread", VerticalSpread, Credit, K12, vec![
      call(L, 0).labelled(Otm),
      call(S, 1).labelled(Otm),
    ])
    .constraint(Increasing(vec![1, 0]))
    .describe("Bearish", "Net credit. Income if the stock falls or holds."),
    StrategyTemplate::new("Bear Put Spread", VerticalSpread, Debit, K12, vec![
      put(L, 0).labelled(Atm),
      put(S, 1).labelled(Otm),
    ])
    .constraint(Increasing(vec![1, 0]))
    .describe("Bearish", "Net debit. Capital gain if the stock falls."),
    // synthetics and combos
    StrategyTemplate::new("Long Synthetic Forward", SyntheticForward, Either, K, vec![
      call(L, 0).labelled(Atm),
      put(S, 0).labelled(Atm),
    ])
    .constraint(AtmBand(0))
    .describe("Bullish", "Replicates a long forward on the stock."),
    StrategyTemplate::new("Short Synthetic Forward", SyntheticForward, Either, K, vec![
      put(L, 0).labelled(Atm),
      call(S, 0).labelled(Atm),
    ])
    .constraint(AtmBand(0))
    .describe("Bearish", "Replicates a short forward on the stock."),
    StrategyTemplate::new("Long Combo", Combo, Either, K12, vec![
      call(L, 0).labelled(Otm),
      put(S, 1).labelled(Otm),
    ])
    .constraint(Increasing(vec![1, 0]))
    .describe("Bullish", "Capital gain strategy."),
    StrategyTemplate::new("Short Combo", Combo, Either, K12, vec![
      put(L, 0).labelled(Otm),
      call(S, 1).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1]))
    .describe("Bearish", "Capital gain strategy."),
    // ladders
    StrategyTemplate::new("Bull Call Ladder", Ladder, Either, K123, vec![
      call(L, 0).labelled(Atm),
      call(S, 1).labelled(Otm),
      call(S, 2).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1, 2]))
    .describe(
      "Conservatively bullish, low volatility",
      "A bull call spread financed by a further short call.",
    ),
    StrategyTemplate::new("Bear Call Ladder", Ladder, Either, K123, vec![
      call(S, 0).labelled(Atm),
      call(L, 1).labelled(Otm),
      call(L, 2).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1, 2]))
    .describe("Bullish", "A losing bear call spread turned bullish."),
    StrategyTemplate::new("Bull Put Ladder", Ladder, Either, K123, vec![
      put(S, 0).labelled(Atm),
      put(L, 1).labelled(Otm),
      put(L, 2).labelled(Otm),
    ])
    .constraint(Increasing(vec![2, 1, 0]))
    .describe("Bearish", "A losing bull put spread turned bearish."),
    StrategyTemplate::new("Bear Put Ladder", Ladder, Either, K123, vec![
      put(L, 0).labelled(Atm),
      put(S, 1).labelled(Otm),
      put(S, 2).labelled(Otm),
    ])
    .constraint(Increasing(vec![2, 1, 0]))
    .describe(
      "Conservatively bearish, low volatility",
      "A bear put spread financed by a further short put.",
    ),
    // time spreads
    StrategyTemplate::new("Calendar Call Spread", Calendar, Debit, K, vec![
      call(S, 0),
      call(L, 0).far().labelled(Atm),
    ])
    .describe(
      "Neutral to bullish",
      "Best case is the stock pinned at K when the near call expires.",
    ),
    StrategyTemplate::new("Calendar Put Spread", Calendar, Debit, K, vec![
      put(S, 0),
      put(L, 0).far().labelled(Atm),
    ])
    .describe(
      "Neutral to bearish",
      "Best case is the stock pinned at K when the near put expires.",
    ),
    StrategyTemplate::new("Diagonal Call Spread", Diagonal, Debit, K12, vec![
      call(L, 0).far().labelled(Itm),
      call(S, 1).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1]))
    .describe("Bullish", "A calendar call spread with a deep ITM long call."),
    StrategyTemplate::new("Diagonal Put Spread", Diagonal, Debit, K12, vec![
      put(L, 0).far().labelled(Itm),
      put(S, 1).labelled(Otm),
    ])
    .constraint(Increasing(vec![1, 0]))
    .describe("Bearish", "A calendar put spread with a deep ITM long put."),
    // volatility
    StrategyTemplate::new("Long Straddle", Straddle, Debit, K, vec![
      call(L, 0).labelled(Atm),
      put(L, 0).labelled(Atm),
    ])
    .describe("Neutral, high volatility", "Profits from a large move either way."),
    StrategyTemplate::new("Short Straddle", Straddle, Credit, K, vec![
      call(S, 0).labelled(Atm),
      put(S, 0).labelled(Atm),
    ])
    .describe(
      "Neutral, low volatility",
      "Profits if the stock stays near K. Unbounded upside risk.",
    ),
    StrategyTemplate::new("Long Strangle", Strangle, Debit, K12, vec![
      call(L, 0).labelled(Otm),
      put(L, 1).labelled(Otm),
    ])
    .constraint(Increasing(vec![1, 0]))
    .describe("Neutral, high volatility", "Cheaper than a straddle with wider breakevens."),
    StrategyTemplate::new("Short Strangle", Strangle, Credit, K12, vec![
      call(S, 0).labelled(Otm),
      put(S, 1).labelled(Otm),
    ])
    .constraint(Increasing(vec![1, 0]))
    .describe("Neutral, low volatility", "Less credit than a short straddle, less risk."),
    StrategyTemplate::new("Long Guts", Guts, Debit, K12, vec![
      call(L, 0).labelled(Itm),
      put(L, 1).labelled(Itm),
    ])
    .constraint(Increasing(vec![0, 1]))
    .describe("Neutral, high volatility", "Costlier than a straddle, mostly intrinsic value."),
    StrategyTemplate::new("Short Guts", Guts, Credit, K12, vec![
      call(S, 0).labelled(Itm),
      put(S, 1).labelled(Itm),
    ])
    .constraint(Increasing(vec![0, 1]))
    .describe("Neutral, low volatility", "More credit than a short straddle, more risk."),
    StrategyTemplate::new("Long Call Synthetic Straddle", SyntheticStraddle, Debit, K, vec![
      stock(S),
      call(L, 0).times(2).labelled(Atm),
    ])
    .describe("Neutral, high volatility", "Long straddle with a synthetic put."),
    StrategyTemplate::new("Long Put Synthetic Straddle", SyntheticStraddle, Debit, K, vec![
      stock(L),
      put(L, 0).times(2).labelled(Atm),
    ])
    .describe("Neutral, high volatility", "Long straddle with a synthetic call."),
    StrategyTemplate::new("Short Call Synthetic Straddle", SyntheticStraddle, Credit, K, vec![
      stock(L),
      call(S, 0).times(2).labelled(Atm),
    ])
    .describe("Neutral, low volatility", "Short straddle with a synthetic put."),
    StrategyTemplate::new("Short Put Synthetic Straddle", SyntheticStraddle, Credit, K, vec![
      stock(S),
      put(S, 0).times(2).labelled(Atm),
    ])
    .describe("Neutral, low volatility", "Short straddle with a synthetic call."),
    StrategyTemplate::new("Covered Short Straddle", CoveredShort, Credit, K, vec![
      stock(L),
      call(S, 0),
      put(S, 0),
    ])
    .describe("Bullish", "A covered call plus a short put."),
    StrategyTemplate::new("Covered Short Strangle", CoveredShort, Credit, K12, vec![
      stock(L),
      call(S, 0).labelled(Otm),
      put(S, 1).labelled(Otm),
    ])
    .constraint(Increasing(vec![1, 0]))
    .describe("Bullish", "Income while holding the stock."),
    StrategyTemplate::new("Strap", StrapStrip, Debit, K, vec![
      call(L, 0).times(2).labelled(Atm),
      put(L, 0).labelled(Atm),
    ])
    .describe("Bullish, high volatility", "Straddle weighted to the upside."),
    StrategyTemplate::new("Strip", StrapStrip, Debit, K, vec![
      call(L, 0).labelled(Atm),
      put(L, 0).times(2).labelled(Atm),
    ])
    .describe("Bearish, high volatility", "Straddle weighted to the downside."),
    // ratios
    StrategyTemplate::new("Call Ratio Backspread", RatioBackspread, Either, K12, vec![
      call(S, 0).chosen(1).labelled(Atm),
      call(L, 1).chosen(2).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1]))
    .ratio(RatioRule::LongExceedsShort)
    .describe("Strongly bullish", "Usually 2:1 or 3:2. Profits from a sharp rally."),
    StrategyTemplate::new("Put Ratio Backspread", RatioBackspread, Either, K12, vec![
      put(S, 0).chosen(1).labelled(Atm),
      put(L, 1).chosen(2).labelled(Otm),
    ])
    .constraint(Increasing(vec![1, 0]))
    .ratio(RatioRule::LongExceedsShort)
    .describe("Strongly bearish", "Usually 2:1 or 3:2. Profits from a sharp fall."),
    StrategyTemplate::new("Ratio Call Spread", RatioSpread, Either, K12, vec![
      call(S, 0).chosen(2).labelled(Atm),
      call(L, 1).chosen(1).labelled(Itm),
    ])
    .constraint(Increasing(vec![1, 0]))
    .ratio(RatioRule::ShortExceedsLong)
    .describe("Neutral to bearish", "Usually 1:2 or 2:3. A credit when run for income."),
    StrategyTemplate::new("Ratio Put Spread", RatioSpread, Either, K12, vec![
      put(S, 0).chosen(2).labelled(Atm),
      put(L, 1).chosen(1).labelled(Itm),
    ])
    .constraint(Increasing(vec![0, 1]))
    .ratio(RatioRule::ShortExceedsLong)
    .describe("Neutral to bullish", "Usually 1:2 or 2:3. A credit when run for income."),
    // butterflies
    StrategyTemplate::new("Long Call Butterfly", Butterfly, Debit, K123, vec![
      call(L, 0),
      call(S, 1).times(2).labelled(Atm),
      call(L, 2),
    ])
    .constraint(Increasing(vec![0, 1, 2]))
    .constraint(Equidistant(vec![0, 1, 2]))
    .describe("Neutral, low volatility", "Equidistant strikes. Net debit."),
    StrategyTemplate::new("Modified Call Butterfly", Butterfly, Debit, K123, vec![
      call(L, 0),
      call(S, 1).times(2).labelled(Atm),
      call(L, 2),
    ])
    .constraint(Increasing(vec![0, 1, 2]))
    .constraint(LowerWingWider {
      lower: 0,
      body: 1,
      upper: 2,
    })
    .describe("Neutral with a bullish bias", "Lower wing wider than the upper wing."),
    StrategyTemplate::new("Short Call Butterfly", Butterfly, Credit, K123, vec![
      call(S, 0),
      call(L, 1).times(2).labelled(Atm),
      call(S, 2),
    ])
    .constraint(Increasing(vec![0, 1, 2]))
    .constraint(Equidistant(vec![0, 1, 2]))
    .describe("High volatility", "Equidistant strikes. Small credit, limited risk."),
    StrategyTemplate::new("Long Put Butterfly", Butterfly, Debit, K123, vec![
      put(L, 0),
      put(S, 1).times(2).labelled(Atm),
      put(L, 2),
    ])
    .constraint(Increasing(vec![0, 1, 2]))
    .constraint(Equidistant(vec![0, 1, 2]))
    .describe("Neutral, low volatility", "Equidistant strikes. Net debit."),
    StrategyTemplate::new("Modified Put Butterfly", Butterfly, Either, K123, vec![
      put(L, 0),
      put(S, 1).times(2).labelled(Atm),
      put(L, 2),
    ])
    .constraint(Increasing(vec![0, 1, 2]))
    .constraint(LowerWingWider {
      lower: 0,
      body: 1,
      upper: 2,
    })
    .describe("Neutral with a bullish bias", "Lower wing wider than the upper wing."),
    StrategyTemplate::new("Short Put Butterfly", Butterfly, Credit, K123, vec![
      put(S, 0),
      put(L, 1).times(2).labelled(Atm),
      put(S, 2),
    ])
    .constraint(Increasing(vec![0, 1, 2]))
    .constraint(Equidistant(vec![0, 1, 2]))
    .describe("High volatility", "Equidistant strikes. Small credit, limited risk."),
    StrategyTemplate::new("Long Iron Butterfly", IronButterfly, Credit, K123, vec![
      put(L, 0).labelled(Otm),
      put(S, 1).labelled(Atm),
      call(S, 1).labelled(Atm),
      call(L, 2).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1, 2]))
    .constraint(Equidistant(vec![0, 1, 2]))
    .describe("Neutral, low volatility", "Equidistant strikes. Income strategy."),
    StrategyTemplate::new("Short Iron Butterfly", IronButterfly, Debit, K123, vec![
      put(S, 0).labelled(Otm),
      put(L, 1).labelled(Atm),
      call(L, 1).labelled(Atm),
      call(S, 2).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1, 2]))
    .constraint(Equidistant(vec![0, 1, 2]))
    .describe("Neutral, high volatility", "Equidistant strikes. Net debit."),
    // condors
    StrategyTemplate::new("Long Call Condor", Condor, Debit, K1234, vec![
      call(L, 0).labelled(Itm),
      call(S, 1).labelled(Itm),
      call(S, 2).labelled(Otm),
      call(L, 3).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1, 2, 3]))
    .constraint(Equidistant(vec![0, 1, 2, 3]))
    .describe("Neutral, low volatility", "Equidistant strikes. Low-cost debit."),
    StrategyTemplate::new("Short Call Condor", Condor, Credit, K1234, vec![
      call(S, 0).labelled(Itm),
      call(L, 1).labelled(Itm),
      call(L, 2).labelled(Otm),
      call(S, 3).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1, 2, 3]))
    .constraint(Equidistant(vec![0, 1, 2, 3]))
    .describe("High volatility", "Equidistant strikes. Small credit."),
    StrategyTemplate::new("Long Put Condor", Condor, Debit, K1234, vec![
      put(L, 0).labelled(Otm),
      put(S, 1).labelled(Otm),
      put(S, 2).labelled(Itm),
      put(L, 3).labelled(Itm),
    ])
    .constraint(Increasing(vec![0, 1, 2, 3]))
    .constraint(Equidistant(vec![0, 1, 2, 3]))
    .describe("Neutral, low volatility", "Equidistant strikes. Low-cost debit."),
    StrategyTemplate::new("Short Put Condor", Condor, Credit, K1234, vec![
      put(S, 0).labelled(Otm),
      put(L, 1).labelled(Otm),
      put(L, 2).labelled(Itm),
      put(S, 3).labelled(Itm),
    ])
    .constraint(Increasing(vec![0, 1, 2, 3]))
    .constraint(Equidistant(vec![0, 1, 2, 3]))
    .describe("High volatility", "Equidistant strikes. Small credit."),
    StrategyTemplate::new("Long Iron Condor", IronCondor, Credit, K1234, vec![
      put(L, 0).labelled(Otm),
      put(S, 1).labelled(Otm),
      call(S, 2).labelled(Otm),
      call(L, 3).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1, 2, 3]))
    .constraint(Equidistant(vec![0, 1, 2, 3]))
    .describe("Neutral, low volatility", "Equidistant strikes. Income strategy."),
    StrategyTemplate::new("Short Iron Condor", IronCondor, Debit, K1234, vec![
      put(S, 0).labelled(Otm),
      put(L, 1).labelled(Otm),
      call(L, 2).labelled(Otm),
      call(S, 3).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1, 2, 3]))
    .constraint(Equidistant(vec![0, 1, 2, 3]))
    .describe("Neutral, high volatility", "Equidistant strikes. Net debit."),
    // hedged structures
    StrategyTemplate::new("Long Box", BoxSpread, Debit, K12, vec![
      put(L, 0).labelled(Itm),
      call(S, 0).labelled(Otm),
      put(S, 1).labelled(Otm),
      call(L, 1).labelled(Itm),
    ])
    .constraint(Increasing(vec![1, 0]))
    .describe("Neutral", "A long and a short synthetic forward. Locks in K1 - K2."),
    StrategyTemplate::new("Collar", Collar, Either, K12, vec![
      stock(L),
      put(L, 0).labelled(Otm),
      call(S, 1).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1]))
    .describe("Moderately bullish", "Downside protection paid for with capped upside."),
    StrategyTemplate::new("Bullish Short Seagull Spread", Seagull, Either, K123, vec![
      put(S, 0).labelled(Otm),
      call(L, 1).labelled(Atm),
      call(S, 2).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1, 2]))
    .describe("Bullish", "A bull call spread financed by a short put. Ideally zero cost."),
    StrategyTemplate::new("Bullish Long Seagull Spread", Seagull, Either, K123, vec![
      put(L, 0).labelled(Otm),
      put(S, 1).labelled(Atm),
      call(L, 2).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1, 2]))
    .describe("Bullish", "A long combo hedged with a long put. Ideally zero cost."),
    StrategyTemplate::new("Bearish Short Seagull Spread", Seagull, Either, K123, vec![
      put(S, 0).labelled(Otm),
      put(L, 1).labelled(Atm),
      call(S, 2).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1, 2]))
    .describe("Bearish", "A bear put spread financed by a short call. Ideally zero cost."),
    StrategyTemplate::new("Bearish Long Seagull Spread", Seagull, Either, K123, vec![
      put(L, 0).labelled(Otm),
      call(S, 1).labelled(Atm),
      call(L, 2).labelled(Otm),
    ])
    .constraint(Increasing(vec![0, 1, 2]))
    .describe("Bearish", "A short combo hedged with a long call. Ideally zero cost."),
  ]
}

/// Every template, in registry order.
pub fn catalog() -> &'static [StrategyTemplate] {
  &CATALOG
}

/// Look a template up by name, ignoring case.
pub fn find(name: &str) -> Result<&'static StrategyTemplate, StrategyError> {
  CATALOG
    .iter()
    .find(|template| template.name.eq_ignore_ascii_case(name.trim()))
    .ok_or_else(|| StrategyError::UnknownStrategy(name.to_string()))
}

pub fn roles_for(name: &str) -> Result<&'static [LegRole], StrategyError> {
  Ok(&find(name)?.roles)
}

pub fn validate(position: &Position, name: &str, spot: f64) -> Result<(), StrategyError> {
  Ok(find(name)?.validate(position, spot)?)
}

/// Templates offered under `view`, in menu order.
pub fn by_view(view: MarketView) -> Vec<&'static StrategyTemplate> {
  MENUS
    .iter()
    .filter(|(v, _)| *v == view)
    .flat_map(|(_, names)| names.iter())
    .filter_map(|name| find(name).ok())
    .collect()
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;
  use crate::quant::OptionType;

  fn option(
    option_type: OptionType,
    direction: Direction,
    quantity: u32,
    strike: f64,
    premium: f64,
  ) -> Leg {
    Leg::option(option_type, direction, quantity, strike, premium, 0.25).unwrap()
  }

  fn butterfly(k1: f64, k2: f64, k3: f64) -> Position {
    Position::new(vec![
      option(OptionType::Call, L, 1, k1, 12.0),
      option(OptionType::Call, S, 2, k2, 6.0),
      option(OptionType::Call, L, 1, k3, 2.5),
    ])
    .unwrap()
  }

  #[test]
  fn catalog_is_complete() {
    assert_eq!(catalog().len(), 58);
    let names = catalog().iter().map(|t| t.name).collect::<HashSet<_>>();
    assert_eq!(names.len(), 58);
    for (_, menu) in MENUS.iter() {
      for name in menu.iter() {
        assert!(names.contains(name), "{name} is not catalogued");
      }
    }
    for template in catalog() {
      assert!(!template.views().is_empty(), "{} is in no menu", template.name);
      for role in &template.roles {
        if let Some(slot) = role.slot {
          assert!(slot < template.slots.len(), "{} has a dangling slot", template.name);
        }
      }
    }
  }

  #[test]
  fn lookup_and_views() {
    assert_eq!(find("long iron condor").unwrap().name, "Long Iron Condor");
    assert!(matches!(find("Iron Eagle"), Err(StrategyError::UnknownStrategy(_))));
    assert_eq!(roles_for("Bull Call Spread").unwrap().len(), 2);

    let bullish = by_view(MarketView::Bullish);
    assert_eq!(bullish.len(), 17);
    assert_eq!(bullish[0].name, "Covered Call");
    assert_eq!(
      find("Long Box").unwrap().views(),
      vec![MarketView::HighVolatility, MarketView::LowVolatility]
    );
  }

  #[test]
  fn butterfly_requires_equal_spacing() {
    assert!(validate(&butterfly(90.0, 100.0, 110.0), "Long Call Butterfly", 100.0).is_ok());
    assert!(matches!(
      validate(&butterfly(90.0, 100.0, 105.0), "Long Call Butterfly", 100.0),
      Err(StrategyError::Constraint(ConstraintViolation::Equidistance { .. }))
    ));
  }

  #[test]
  fn modified_butterfly_requires_wider_lower_wing() {
    assert!(validate(&butterfly(85.0, 100.0, 105.0), "Modified Call Butterfly", 100.0).is_ok());
    assert!(matches!(
      validate(&butterfly(90.0, 100.0, 110.0), "Modified Call Butterfly", 100.0),
      Err(StrategyError::Constraint(ConstraintViolation::WingSpacing { .. }))
    ));
  }

  #[test]
  fn vertical_spread_ordering() {
    let inverted = Position::new(vec![
      option(OptionType::Call, L, 1, 110.0, 2.0),
      option(OptionType::Call, S, 1, 100.0, 5.0),
    ])
    .unwrap();
    assert!(matches!(
      validate(&inverted, "Bull Call Spread", 100.0),
      Err(StrategyError::Constraint(ConstraintViolation::Ordering { .. }))
    ));
    assert!(validate(&inverted, "Bear Call Spread", 100.0).is_ok());
  }

  #[test]
  fn role_and_count_mismatch() {
    let single = Position::new(vec![option(OptionType::Put, L, 1, 100.0, 4.0)]).unwrap();
    assert!(matches!(
      validate(&single, "Bull Call Spread", 100.0),
      Err(StrategyError::Constraint(ConstraintViolation::LegCount { .. }))
    ));

    let wrong = Position::new(vec![
      option(OptionType::Put, L, 1, 100.0, 4.0),
      option(OptionType::Call, S, 1, 110.0, 2.0),
    ])
    .unwrap();
    assert!(matches!(
      validate(&wrong, "Bull Call Spread", 100.0),
      Err(StrategyError::Constraint(ConstraintViolation::RoleMismatch { leg: 0, .. }))
    ));
  }

  #[test]
  fn straddle_legs_share_a_strike() {
    let split = Position::new(vec![
      option(OptionType::Call, L, 1, 100.0, 4.0),
      option(OptionType::Put, L, 1, 95.0, 2.0),
    ])
    .unwrap();
    assert!(matches!(
      validate(&split, "Long Straddle", 100.0),
      Err(StrategyError::Constraint(ConstraintViolation::SharedStrike { .. }))
    ));
  }

  #[test]
  fn spot_relative_rules() {
    let protective = |k: f64| {
      Position::new(vec![
        Leg::stock(L, 1, 100.0).unwrap(),
        option(OptionType::Put, L, 1, k, 3.0),
      ])
      .unwrap()
    };
    assert!(validate(&protective(95.0), "Protective Put", 100.0).is_ok());
    assert!(matches!(
      validate(&protective(105.0), "Protective Put", 100.0),
      Err(StrategyError::Constraint(ConstraintViolation::SpotBound { .. }))
    ));

    let forward = |k: f64| {
      Position::new(vec![
        option(OptionType::Call, L, 1, k, 5.0),
        option(OptionType::Put, S, 1, k, 5.0),
      ])
      .unwrap()
    };
    assert!(validate(&forward(105.0), "Long Synthetic Forward", 100.0).is_ok());
    // 0.9 * 105 = 94.5 rounds down to 94
    assert!(validate(&forward(95.0), "Long Synthetic Forward", 105.0).is_ok());
    assert!(matches!(
      validate(&forward(94.0), "Long Synthetic Forward", 105.0),
      Err(StrategyError::Constraint(ConstraintViolation::AtmBand { low, .. })) if low == 94.0
    ));
    assert!(matches!(
      validate(&forward(110.0), "Long Synthetic Forward", 100.0),
      Err(StrategyError::Constraint(ConstraintViolation::AtmBand { .. }))
    ));
  }

  #[test]
  fn ratio_rules() {
    let backspread = |short: u32, long: u32| {
      Position::new(vec![
        option(OptionType::Call, S, short, 100.0, 5.0),
        option(OptionType::Call, L, long, 110.0, 2.0),
      ])
      .unwrap()
    };
    assert!(validate(&backspread(1, 2), "Call Ratio Backspread", 100.0).is_ok());
    assert!(validate(&backspread(2, 3), "Call Ratio Backspread", 100.0).is_ok());
    assert!(matches!(
      validate(&backspread(2, 2), "Call Ratio Backspread", 100.0),
      Err(StrategyError::Constraint(ConstraintViolation::QuantityRatio { .. }))
    ));
  }

  #[test]
  fn fixed_quantities_are_enforced() {
    let strap = Position::new(vec![
      option(OptionType::Call, L, 1, 100.0, 5.0),
      option(OptionType::Put, L, 1, 100.0, 4.0),
    ])
    .unwrap();
    assert!(matches!(
      validate(&strap, "Strap", 100.0),
      Err(StrategyError::Constraint(ConstraintViolation::Quantity {
        leg: 0,
        expected: 2,
        found: 1,
        ..
      }))
    ));
  }

  #[test]
  fn calendar_needs_later_far_leg() {
    let calendar = |near: f64, far: f64| {
      Position::new(vec![
        Leg::option(OptionType::Call, S, 1, 100.0, 2.0, near).unwrap(),
        Leg::option(OptionType::Call, L, 1, 100.0, 4.0, far).unwrap(),
      ])
      .unwrap()
    };
    assert!(validate(&calendar(0.1, 0.3), "Calendar Call Spread", 100.0).is_ok());
    assert!(matches!(
      validate(&calendar(0.3, 0.1), "Calendar Call Spread", 100.0),
      Err(StrategyError::Constraint(ConstraintViolation::MaturityOrder { .. }))
    ));
  }

  #[test]
  fn single_expiry_legs_share_horizon() {
    let mixed = Position::new(vec![
      Leg::option(OptionType::Call, L, 1, 100.0, 5.0, 0.1).unwrap(),
      Leg::option(OptionType::Call, S, 1, 110.0, 2.0, 0.3).unwrap(),
    ])
    .unwrap();
    assert!(matches!(
      validate(&mixed, "Bull Call Spread", 100.0),
      Err(StrategyError::Constraint(ConstraintViolation::HorizonMismatch { .. }))
    ));
  }
}
