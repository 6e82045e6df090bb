use std::fmt::Display;

pub mod pricing;
pub mod strategies;

/// Option type.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum OptionType {
  #[default]
  Call,
  Put,
}

impl Display for OptionType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      OptionType::Call => write!(f, "Call"),
      OptionType::Put => write!(f, "Put"),
    }
  }
}

/// Moneyness.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Moneyness {
  InTheMoney,
  #[default]
  AtTheMoney,
  OutOfTheMoney,
}

impl Moneyness {
  /// Relative distance from spot within which a strike counts as at the money.
  pub const ATM_BAND: f64 = 0.02;

  /// Classify a strike against the current spot.
  pub fn classify(option_type: OptionType, strike: f64, spot: f64) -> Self {
    if spot <= 0.0 || ((strike - spot) / spot).abs() <= Self::ATM_BAND {
      return Moneyness::AtTheMoney;
    }

    let in_the_money = match option_type {
      OptionType::Call => strike < spot,
      OptionType::Put => strike > spot,
    };

    if in_the_money {
      Moneyness::InTheMoney
    } else {
      Moneyness::OutOfTheMoney
    }
  }
}

impl Display for Moneyness {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Moneyness::InTheMoney => write!(f, "In the money"),
      Moneyness::AtTheMoney => write!(f, "At the money"),
      Moneyness::OutOfTheMoney => write!(f, "Out of the money"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classify_call_and_put() {
    assert_eq!(
      Moneyness::classify(OptionType::Call, 90.0, 100.0),
      Moneyness::InTheMoney
    );
    assert_eq!(
      Moneyness::classify(OptionType::Put, 90.0, 100.0),
      Moneyness::OutOfTheMoney
    );
    assert_eq!(
      Moneyness::classify(OptionType::Put, 101.0, 100.0),
      Moneyness::AtTheMoney
    );
  }
}
