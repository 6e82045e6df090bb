use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use super::catalog::ExpirySlot;
use super::catalog::StrategyTemplate;
use super::chain::ChainSnapshot;
use super::error::NoAdmissibleChoiceError;
use super::types::strike_tolerance;

/// Expirations, strikes and ratio quantities picked for one template.
#[derive(Default, Clone, PartialEq, Debug)]
pub struct Selection {
  pub near: Option<NaiveDate>,
  pub far: Option<NaiveDate>,
  /// Indexed by strike slot.
  pub strikes: Vec<Option<f64>>,
  /// Overrides of the role defaults, keyed by role index.
  pub quantities: BTreeMap<usize, u32>,
}

impl Selection {
  pub fn near(mut self, expiration: NaiveDate) -> Self {
    self.near = Some(expiration);
    self
  }

  pub fn far(mut self, expiration: NaiveDate) -> Self {
    self.far = Some(expiration);
    self
  }

  pub fn strike(mut self, slot: usize, strike: f64) -> Self {
    if self.strikes.len() <= slot {
      self.strikes.resize(slot + 1, None);
    }
    self.strikes[slot] = Some(strike);
    self
  }

  pub fn quantity(mut self, role: usize, quantity: u32) -> Self {
    self.quantities.insert(role, quantity);
    self
  }
}

/// Narrows a chain snapshot down to the choices a template admits.
pub struct Selector<'a> {
  template: &'a StrategyTemplate,
  chain: &'a ChainSnapshot,
}

impl<'a> Selector<'a> {
  pub fn new(template: &'a StrategyTemplate, chain: &'a ChainSnapshot) -> Self {
    Self { template, chain }
  }

  /// Admissible expirations for `slot`, earliest first.
  ///
  /// Only expirations after the snapshot date are offered. Time spreads need a
  /// near expiration with a later one quoted, and a far expiration strictly
  /// after the chosen near one.
  pub fn expirations(
    &self,
    slot: ExpirySlot,
    near: Option<NaiveDate>,
  ) -> Result<Vec<NaiveDate>, NoAdmissibleChoiceError> {
    let eval = self.chain.eval();
    let all = self
      .chain
      .expirations()
      .into_iter()
      .filter(|date| *date > eval)
      .collect::<Vec<_>>();

    let candidates = match slot {
      ExpirySlot::Near if self.template.is_multi_expiry() => {
        let last = all.last().copied();
        all
          .iter()
          .copied()
          .filter(|date| Some(*date) != last)
          .collect::<Vec<_>>()
      }
      ExpirySlot::Near => all,
      ExpirySlot::Far => {
        let near =
          near.ok_or_else(|| self.none("far expiration", "near expiration not chosen yet"))?;
        all.into_iter().filter(|date| *date > near).collect()
      }
    };

    if candidates.is_empty() {
      let reason = match slot {
        ExpirySlot::Near => "no options data available",
        ExpirySlot::Far => "no expiration after the near one",
      };
      return Err(self.none(expiry_label(slot), reason));
    }
    Ok(candidates)
  }

  /// Admissible strikes for `slot` given the strikes already chosen, ascending.
  ///
  /// A strike must be quoted for every role drawing from the slot, on that role's
  /// expiration, and must keep the partial assignment within the template's
  /// constraints.
  pub fn strikes(
    &self,
    slot: usize,
    chosen: &[Option<f64>],
    near: Option<NaiveDate>,
    far: Option<NaiveDate>,
  ) -> Result<Vec<f64>, NoAdmissibleChoiceError> {
    let label = format!("strike {}", self.template.slots.get(slot).copied().unwrap_or("?"));

    let mut quoted: Option<Vec<f64>> = None;
    for role in self.template.roles_using(slot) {
      let Some(option_type) = role.instrument.option_type() else {
        continue;
      };
      let expiration = match role.expiry {
        ExpirySlot::Near => near,
        ExpirySlot::Far => far,
      }
      .ok_or_else(|| self.none(&label, &format!("{} not chosen yet", expiry_label(role.expiry))))?;

      let strikes = self
        .chain
        .chain(expiration)
        .map(|chain| chain.strikes(option_type))
        .unwrap_or_default();

      quoted = Some(match quoted {
        None => strikes,
        Some(previous) => previous
          .into_iter()
          .filter(|k| strikes.iter().any(|s| (s - k).abs() <= strike_tolerance(*k)))
          .collect(),
      });
    }

    let mut assignment = chosen.to_vec();
    assignment.resize(self.template.slots.len().max(slot + 1), None);

    let admissible = quoted
      .unwrap_or_default()
      .into_iter()
      .filter(|k| {
        assignment[slot] = Some(*k);
        self.template.check_strikes(&assignment, self.chain.spot()).is_ok()
      })
      .collect::<Vec<_>>();

    if admissible.is_empty() {
      debug!(strategy = self.template.name, slot = %label, "no admissible strike");
      return Err(self.none(&label, "no quoted strike satisfies the strategy constraints"));
    }
    Ok(admissible)
  }

  /// First admissible selection, preferring early expirations and strikes near spot.
  pub fn suggest(&self) -> Result<Selection, NoAdmissibleChoiceError> {
    let mut last_err = None;

    for near in self.expirations(ExpirySlot::Near, None)? {
      let fars = if self.template.is_multi_expiry() {
        self
          .expirations(ExpirySlot::Far, Some(near))?
          .into_iter()
          .map(Some)
          .collect()
      } else {
        vec![None]
      };

      for far in fars {
        let mut strikes = vec![None; self.template.slots.len()];
        match self.search(0, &mut strikes, Some(near), far) {
          Ok(true) => {
            let selection = Selection {
              near: Some(near),
              far,
              strikes,
              quantities: BTreeMap::new(),
            };
            debug!(strategy = self.template.name, ?selection, "suggested selection");
            return Ok(selection);
          }
          Ok(false) => {}
          Err(err) => last_err = Some(err),
        }
      }
    }

    Err(last_err.unwrap_or_else(|| self.none("selection", "no combination of quoted strikes fits")))
  }

  fn search(
    &self,
    slot: usize,
    strikes: &mut Vec<Option<f64>>,
    near: Option<NaiveDate>,
    far: Option<NaiveDate>,
  ) -> Result<bool, NoAdmissibleChoiceError> {
    if slot == strikes.len() {
      return Ok(true);
    }

    let spot = self.chain.spot();
    let mut candidates = match self.strikes(slot, strikes, near, far) {
      Ok(candidates) => candidates,
      Err(err) if slot == 0 => return Err(err),
      Err(_) => return Ok(false),
    };
    candidates.sort_by(|a, b| (a - spot).abs().total_cmp(&(b - spot).abs()).then(a.total_cmp(b)));

    for k in candidates {
      strikes[slot] = Some(k);
      if self.search(slot + 1, strikes, near, far)? {
        return Ok(true);
      }
    }
    strikes[slot] = None;
    Ok(false)
  }

  fn none(&self, choice: &str, reason: &str) -> NoAdmissibleChoiceError {
    NoAdmissibleChoiceError {
      strategy: self.template.name,
      choice: choice.to_string(),
      reason: reason.to_string(),
    }
  }
}

fn expiry_label(slot: ExpirySlot) -> &'static str {
  match slot {
    ExpirySlot::Near => "near expiration",
    ExpirySlot::Far => "far expiration",
  }
}
