//! # Payoff
//!
//! $$
//! \Pi(S_T)=\sum_i s_i q_i\bigl(V_i(S_T,\,T_i-T)-p_i\bigr),\qquad
//! V_i=\begin{cases}(S_T-K_i)^+ \text{ or } (K_i-S_T)^+ & T_i=T\\ \mathrm{BS}(S_T,K_i,T_i-T,r,\sigma) & T_i>T\end{cases}
//! $$
//!
//! $T$ is the earliest option expiration of the position. Stock legs contribute
//! $s\,q\,(S_T-S_0)$.
use ndarray::Array1;

use super::types::EvaluationRequest;
use super::types::Position;

/// Sampled payoff curve.
#[derive(Clone, PartialEq, Debug)]
pub struct PayoffCurve {
  pub s_t: Array1<f64>,
  pub payoff: Array1<f64>,
}

impl PayoffCurve {
  pub fn len(&self) -> usize {
    self.s_t.len()
  }

  pub fn is_empty(&self) -> bool {
    self.s_t.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
    self.s_t.iter().copied().zip(self.payoff.iter().copied())
  }
}

pub struct PayoffEvaluator<'a> {
  position: &'a Position,
  request: &'a EvaluationRequest,
  horizon: f64,
}

impl<'a> PayoffEvaluator<'a> {
  pub fn new(position: &'a Position, request: &'a EvaluationRequest) -> Self {
    Self {
      position,
      request,
      horizon: position.evaluation_horizon(),
    }
  }

  /// Horizon in years at which the payoff is read.
  pub fn horizon(&self) -> f64 {
    self.horizon
  }

  /// Position payoff at terminal price `s_t`.
  pub fn payoff_at(&self, s_t: f64) -> f64 {
    self
      .position
      .legs()
      .iter()
      .map(|leg| {
        leg.contribution(
          s_t,
          self.horizon,
          self.request.risk_free_rate(),
          self.request.sigma(),
        )
      })
      .sum()
  }

  /// Evenly spaced terminal prices spanning the requested range.
  pub fn grid(&self) -> Array1<f64> {
    Array1::linspace(
      self.request.s_min(),
      self.request.s_max(),
      self.request.samples(),
    )
  }

  /// Lazy `(S_T, payoff)` pairs over the grid. Each call starts a fresh pass.
  pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
    let (s_min, s_max, n) = (
      self.request.s_min(),
      self.request.s_max(),
      self.request.samples(),
    );
    let step = (s_max - s_min) / (n - 1) as f64;

    (0..n).map(move |i| {
      let s_t = if i + 1 == n { s_max } else { s_min + step * i as f64 };
      (s_t, self.payoff_at(s_t))
    })
  }

  pub fn curve(&self) -> PayoffCurve {
    let s_t = self.grid();
    let payoff = s_t.mapv(|s| self.payoff_at(s));
    PayoffCurve { s_t, payoff }
  }
}
