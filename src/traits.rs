//! # Traits
//!
//! $$
//! \text{Trait contracts: }\mathcal{A}:\text{(spot, strike, }\tau,\ r,\ \sigma)\to\text{prices}
//! $$
//!
use crate::quant::OptionType;

/// Pricer trait.
pub trait PricerExt: TimeExt {
  /// Calculate the call and put price.
  fn calculate_call_put(&self) -> (f64, f64);

  /// Calculate the price of the configured option type.
  fn calculate_price(&self) -> f64;

  /// Intrinsic value at the current spot, the price of an expired contract.
  fn intrinsic(&self) -> f64;

  /// Volatility implied by a quoted premium.
  fn implied_volatility(&self, _c_price: f64, _option_type: OptionType) -> f64 {
    0.0
  }
}

/// Time-to-maturity contract shared by pricers and quoted expirations.
pub trait TimeExt {
  fn tau(&self) -> Option<f64>;

  fn eval(&self) -> Option<chrono::NaiveDate> {
    None
  }

  fn expiration(&self) -> Option<chrono::NaiveDate> {
    None
  }

  /// Return tau directly, or compute it from eval/expiration dates.
  fn tau_or_from_dates(&self) -> f64 {
    if let Some(tau) = self.tau() {
      return tau;
    }
    match (self.eval(), self.expiration()) {
      (Some(e), Some(x)) => x.signed_duration_since(e).num_days() as f64 / 365.0,
      _ => panic!("either tau or both eval and expiration must be set"),
    }
  }

  /// Calculate tau in days.
  fn calculate_tau_in_days(&self) -> f64 {
    self.tau_or_from_dates() * 365.0
  }

  /// Calculate tau in years.
  fn calculate_tau_in_years(&self) -> f64 {
    self.tau_or_from_dates()
  }

  /// Time left once `elapsed` years have passed, floored at zero.
  fn remaining_after(&self, elapsed: f64) -> f64 {
    (self.tau_or_from_dates() - elapsed).max(0.0)
  }

  /// Whether the contract has expired by the time `elapsed` years have passed.
  fn is_expired_at(&self, elapsed: f64) -> bool {
    self.remaining_after(elapsed) <= HORIZON_EPSILON
  }
}

/// Horizons closer than this (in years) are treated as the same date.
pub const HORIZON_EPSILON: f64 = 1e-9;
