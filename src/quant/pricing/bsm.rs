//! # Black-Scholes
//!
//! $$
//! C=S\Phi(d_1)-Ke^{-rT}\Phi(d_2),\qquad P=Ke^{-rT}\Phi(-d_2)-S\Phi(-d_1)
//! $$
//!
//! $$
//! d_1=\frac{\ln(S/K)+(r+\tfrac12\sigma^2)T}{\sigma\sqrt T},\qquad d_2=d_1-\sigma\sqrt T
//! $$
//!
//! Used to value legs that are still alive at the evaluation horizon. Inputs the
//! closed form cannot handle are reported by [`try_price`] and resolved to
//! boundary values by [`price`].
use implied_vol::implied_black_volatility;
use statrs::distribution::ContinuousCDF;
use statrs::distribution::Normal;
use thiserror::Error;
use tracing::debug;

use crate::quant::OptionType;
use crate::traits::PricerExt;
use crate::traits::TimeExt;

/// Inputs for which the closed form is undefined.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum DegenerateValuationError {
  #[error("time to maturity {tau} is not positive")]
  Expired { tau: f64 },
  #[error("volatility {sigma} is not positive")]
  ZeroVolatility { sigma: f64 },
  #[error("spot {spot} is not positive")]
  NonPositiveSpot { spot: f64 },
  #[error("strike {strike} is not positive")]
  NonPositiveStrike { strike: f64 },
  #[error("non-finite input: spot {spot}, strike {strike}, tau {tau}, r {r}, sigma {sigma}")]
  NonFinite {
    spot: f64,
    strike: f64,
    tau: f64,
    r: f64,
    sigma: f64,
  },
}

pub struct BSMPricer {
  /// Underlying price
  pub s: f64,
  /// Volatility
  pub v: f64,
  /// Strike price
  pub k: f64,
  /// Risk-free rate
  pub r: f64,
  /// Time to maturity in years
  pub tau: Option<f64>,
  /// Evaluation date
  pub eval: Option<chrono::NaiveDate>,
  /// Expiration date
  pub expiration: Option<chrono::NaiveDate>,
  /// Option type
  pub option_type: OptionType,
}

impl BSMPricer {
  pub fn builder(s: f64, v: f64, k: f64, r: f64) -> BSMPricerBuilder {
    BSMPricerBuilder {
      s,
      v,
      k,
      r,
      tau: None,
      eval: None,
      expiration: None,
      option_type: OptionType::Call,
    }
  }

  /// Call and put prices, or the reason the closed form does not apply.
  pub fn try_call_put(&self) -> Result<(f64, f64), DegenerateValuationError> {
    let tau = self.calculate_tau_in_years();
    check_inputs(self.s, self.k, tau, self.r, self.v)?;

    let (d1, d2) = self.d1_d2(tau);
    let n = Normal::default();
    let discount = (-self.r * tau).exp();

    let call = self.s * n.cdf(d1) - self.k * discount * n.cdf(d2);
    let put = self.k * discount * n.cdf(-d2) - self.s * n.cdf(-d1);

    Ok((call.max(0.0), put.max(0.0)))
  }

  fn d1_d2(&self, tau: f64) -> (f64, f64) {
    let sqrt_tau = tau.sqrt();
    let d1 =
      ((self.s / self.k).ln() + (self.r + 0.5 * self.v.powi(2)) * tau) / (self.v * sqrt_tau);
    let d2 = d1 - self.v * sqrt_tau;

    (d1, d2)
  }

  /// Value used when the closed form is undefined.
  fn boundary_call_put(&self, err: &DegenerateValuationError) -> (f64, f64) {
    match err {
      DegenerateValuationError::NonPositiveSpot { .. } => {
        let tau = self.calculate_tau_in_years().max(0.0);
        (0.0, self.k.max(0.0) * (-self.r * tau).exp())
      }
      _ => intrinsic_call_put(self.s, self.k),
    }
  }
}

pub struct BSMPricerBuilder {
  s: f64,
  v: f64,
  k: f64,
  r: f64,
  tau: Option<f64>,
  eval: Option<chrono::NaiveDate>,
  expiration: Option<chrono::NaiveDate>,
  option_type: OptionType,
}

impl BSMPricerBuilder {
  pub fn tau(mut self, tau: f64) -> Self {
    self.tau = Some(tau);
    self
  }
  pub fn eval(mut self, eval: chrono::NaiveDate) -> Self {
    self.eval = Some(eval);
    self
  }
  pub fn expiration(mut self, expiration: chrono::NaiveDate) -> Self {
    self.expiration = Some(expiration);
    self
  }
  pub fn option_type(mut self, option_type: OptionType) -> Self {
    self.option_type = option_type;
    self
  }
  pub fn build(self) -> BSMPricer {
    BSMPricer {
      s: self.s,
      v: self.v,
      k: self.k,
      r: self.r,
      tau: self.tau,
      eval: self.eval,
      expiration: self.expiration,
      option_type: self.option_type,
    }
  }
}

impl PricerExt for BSMPricer {
  fn calculate_call_put(&self) -> (f64, f64) {
    match self.try_call_put() {
      Ok(prices) => prices,
      Err(err) => {
        debug!(
          %err,
          s = self.s,
          k = self.k,
          "degenerate Black-Scholes input, using boundary value"
        );
        self.boundary_call_put(&err)
      }
    }
  }

  fn calculate_price(&self) -> f64 {
    let (call, put) = self.calculate_call_put();
    match self.option_type {
      OptionType::Call => call,
      OptionType::Put => put,
    }
  }

  fn intrinsic(&self) -> f64 {
    let (call, put) = intrinsic_call_put(self.s, self.k);
    match self.option_type {
      OptionType::Call => call,
      OptionType::Put => put,
    }
  }

  /// Black volatility implied by a discounted premium; NaN-free inputs are expected.
  fn implied_volatility(&self, c_price: f64, option_type: OptionType) -> f64 {
    let tau = self.calculate_tau_in_years();
    let growth = (self.r * tau).exp();
    implied_black_volatility(
      c_price * growth,
      self.s * growth,
      self.k,
      tau,
      option_type == OptionType::Call,
    )
  }
}

impl TimeExt for BSMPricer {
  fn tau(&self) -> Option<f64> {
    self.tau
  }

  fn eval(&self) -> Option<chrono::NaiveDate> {
    self.eval
  }

  fn expiration(&self) -> Option<chrono::NaiveDate> {
    self.expiration
  }
}

fn check_inputs(
  spot: f64,
  strike: f64,
  tau: f64,
  r: f64,
  sigma: f64,
) -> Result<(), DegenerateValuationError> {
  if ![spot, strike, tau, r, sigma].iter().all(|x| x.is_finite()) {
    return Err(DegenerateValuationError::NonFinite {
      spot,
      strike,
      tau,
      r,
      sigma,
    });
  }
  if tau <= 0.0 {
    return Err(DegenerateValuationError::Expired { tau });
  }
  if sigma <= 0.0 {
    return Err(DegenerateValuationError::ZeroVolatility { sigma });
  }
  if strike <= 0.0 {
    return Err(DegenerateValuationError::NonPositiveStrike { strike });
  }
  if spot <= 0.0 {
    return Err(DegenerateValuationError::NonPositiveSpot { spot });
  }
  Ok(())
}

fn intrinsic_call_put(spot: f64, strike: f64) -> (f64, f64) {
  ((spot - strike).max(0.0), (strike - spot).max(0.0))
}

/// Closed-form price, or the degenerate case that prevented it.
pub fn try_price(
  option_type: OptionType,
  spot: f64,
  strike: f64,
  tau: f64,
  r: f64,
  sigma: f64,
) -> Result<f64, DegenerateValuationError> {
  let (call, put) = BSMPricer::builder(spot, sigma, strike, r)
    .tau(tau)
    .build()
    .try_call_put()?;
  Ok(match option_type {
    OptionType::Call => call,
    OptionType::Put => put,
  })
}

/// Price a European option.
///
/// Expired contracts and zero volatility resolve to intrinsic value. A spot of zero
/// prices the call at zero and the put at its discounted strike.
pub fn price(option_type: OptionType, spot: f64, strike: f64, tau: f64, r: f64, sigma: f64) -> f64 {
  BSMPricer::builder(spot, sigma, strike, r)
    .tau(tau)
    .option_type(option_type)
    .build()
    .calculate_price()
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;
  use chrono::NaiveDate;
  use tracing_test::traced_test;

  use super::*;

  #[test]
  fn bsm_price() {
    let bsm = BSMPricer::builder(100.0, 0.2, 100.0, 0.05).tau(1.0).build();
    let (call, put) = bsm.calculate_call_put();
    assert_abs_diff_eq!(call, 10.450583572185565, epsilon = 1e-6);
    assert_abs_diff_eq!(put, 5.573526022256971, epsilon = 1e-6);
  }

  #[test]
  fn put_call_parity() {
    let (s, k, tau, r, sigma) = (105.0, 100.0, 0.75, 0.03, 0.35);
    let call = price(OptionType::Call, s, k, tau, r, sigma);
    let put = price(OptionType::Put, s, k, tau, r, sigma);
    assert_abs_diff_eq!(call - put, s - k * (-r * tau).exp(), epsilon = 1e-9);
  }

  #[test]
  fn zero_volatility_is_intrinsic() {
    assert_eq!(price(OptionType::Call, 120.0, 100.0, 0.5, 0.05, 0.0), 20.0);
    assert_eq!(price(OptionType::Put, 120.0, 100.0, 0.5, 0.05, 0.0), 0.0);
    assert_eq!(price(OptionType::Put, 80.0, 100.0, 0.0, 0.05, 0.2), 20.0);
  }

  #[test]
  fn small_volatility_approaches_intrinsic() {
    let p = price(OptionType::Call, 120.0, 100.0, 0.5, 0.0, 1e-6);
    assert_abs_diff_eq!(p, 20.0, epsilon = 1e-9);
  }

  #[test]
  fn try_price_reports_degenerate_inputs() {
    assert_eq!(
      try_price(OptionType::Call, 100.0, 100.0, 0.0, 0.05, 0.2),
      Err(DegenerateValuationError::Expired { tau: 0.0 })
    );
    assert_eq!(
      try_price(OptionType::Call, 100.0, 100.0, 0.5, 0.05, 0.0),
      Err(DegenerateValuationError::ZeroVolatility { sigma: 0.0 })
    );
    assert!(matches!(
      try_price(OptionType::Put, 100.0, 100.0, f64::NAN, 0.05, 0.2),
      Err(DegenerateValuationError::NonFinite { .. })
    ));
  }

  #[test]
  fn zero_spot_boundary() {
    let put = price(OptionType::Put, 0.0, 100.0, 1.0, 0.05, 0.2);
    assert_abs_diff_eq!(put, 100.0 * (-0.05f64).exp(), epsilon = 1e-12);
    assert_eq!(price(OptionType::Call, 0.0, 100.0, 1.0, 0.05, 0.2), 0.0);
  }

  #[test]
  #[traced_test]
  fn degenerate_input_is_logged() {
    price(OptionType::Call, 100.0, 90.0, 0.0, 0.05, 0.2);
    assert!(logs_contain("degenerate Black-Scholes input"));
  }

  #[test]
  fn tau_from_dates() {
    let bsm = BSMPricer::builder(100.0, 0.2, 100.0, 0.05)
      .eval(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
      .expiration(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
      .build();
    assert_relative_eq!(bsm.calculate_tau_in_years(), 365.0 / 365.0);
  }

  #[test]
  fn bsm_implied_volatility() {
    let bsm = BSMPricer::builder(100.0, 0.2, 100.0, 0.05).tau(0.5).build();
    let (call, put) = bsm.calculate_call_put();
    assert_abs_diff_eq!(
      bsm.implied_volatility(call, OptionType::Call),
      0.2,
      epsilon = 1e-8
    );
    assert_abs_diff_eq!(
      bsm.implied_volatility(put, OptionType::Put),
      0.2,
      epsilon = 1e-8
    );
  }
}
