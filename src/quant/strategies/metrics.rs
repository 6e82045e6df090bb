//! # Risk Metrics
//!
//! $$
//! \Pi'(S_T)=\sum_{\text{calls, stock}} s_i q_i\quad\text{for } S_T>\max_i K_i
//! $$
//!
//! When every option leg expires at the horizon the payoff is piecewise linear with
//! kinks at the strikes, so its extrema sit at $S_T=0$, at a strike, or at
//! infinity along the last ray. Positions with a leg outliving the horizon are
//! read off the sampled curve instead, which is only as exact as the grid.
use ndarray_stats::QuantileExt;
use roots::find_root_brent;
use roots::SimpleConvergency;
use tracing::debug;

use super::error::StrategyError;
use super::payoff::PayoffCurve;
use super::payoff::PayoffEvaluator;
use super::types::Bound;
use super::types::MetricsMode;
use super::types::Position;
use super::types::RiskMetrics;

/// Metrics of `position`, analytic when all option legs share the horizon.
pub fn risk_metrics(
  position: &Position,
  evaluator: &PayoffEvaluator,
  curve: &PayoffCurve,
) -> Result<RiskMetrics, StrategyError> {
  if position.is_multi_horizon() {
    debug!(samples = curve.len(), "numeric risk metrics");
    numeric(position, evaluator, curve)
  } else {
    debug!("analytic risk metrics");
    Ok(analytic(position, evaluator))
  }
}

/// Exact metrics of a payoff that is linear between strikes.
pub fn analytic(position: &Position, evaluator: &PayoffEvaluator) -> RiskMetrics {
  let nodes = std::iter::once(0.0)
    .chain(position.strikes())
    .collect::<Vec<_>>();
  let values = nodes
    .iter()
    .map(|s| evaluator.payoff_at(*s))
    .collect::<Vec<_>>();
  let slope = position.upside_exposure() as f64;
  let tol = zero_tolerance(&values);

  let highest = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
  let lowest = values.iter().copied().fold(f64::INFINITY, f64::min);

  let mut breakevens = Vec::new();
  for (w, v) in nodes.windows(2).zip(values.windows(2)) {
    let (a, b, fa, fb) = (w[0], w[1], v[0], v[1]);
    if fa.abs() <= tol {
      breakevens.push(a);
    } else if fb.abs() > tol && fa.signum() != fb.signum() {
      breakevens.push(a + (b - a) * fa / (fa - fb));
    }
  }

  let last = nodes.len() - 1;
  let (l, fl) = (nodes[last], values[last]);
  if fl.abs() <= tol {
    breakevens.push(l);
  } else if slope != 0.0 && fl.signum() != slope.signum() {
    breakevens.push(l - fl / slope);
  }

  RiskMetrics {
    net_premium: position.net_premium(),
    max_profit: bound_above(slope, highest),
    max_loss: bound_below(slope, lowest),
    breakevens: sorted_distinct(breakevens),
    mode: MetricsMode::Analytic,
  }
}

/// Metrics read off the sampled curve, with breakevens refined by Brent's method.
pub fn numeric(
  position: &Position,
  evaluator: &PayoffEvaluator,
  curve: &PayoffCurve,
) -> Result<RiskMetrics, StrategyError> {
  let highest = *curve
    .payoff
    .max()
    .map_err(|_| StrategyError::UnorderedPayoff)?;
  let lowest = *curve
    .payoff
    .min()
    .map_err(|_| StrategyError::UnorderedPayoff)?;
  let slope = position.upside_exposure() as f64;
  let tol = zero_tolerance(curve.payoff.as_slice().unwrap_or(&[]));

  let points = curve.iter().collect::<Vec<_>>();
  let mut breakevens = Vec::new();
  for pair in points.windows(2) {
    let ((a, fa), (b, fb)) = (pair[0], pair[1]);
    if fa.abs() <= tol {
      breakevens.push(a);
    } else if fb.abs() > tol && fa.signum() != fb.signum() {
      breakevens.push(refine(evaluator, a, b, fa, fb));
    }
  }
  if let Some((s, f)) = points.last() {
    if f.abs() <= tol {
      breakevens.push(*s);
    }
  }

  Ok(RiskMetrics {
    net_premium: position.net_premium(),
    max_profit: bound_above(slope, highest),
    max_loss: bound_below(slope, lowest),
    breakevens: sorted_distinct(breakevens),
    mode: MetricsMode::Numeric {
      samples: curve.len(),
    },
  })
}

fn refine(evaluator: &PayoffEvaluator, a: f64, b: f64, fa: f64, fb: f64) -> f64 {
  let mut convergency = SimpleConvergency {
    eps: 1e-10,
    max_iter: 100,
  };
  find_root_brent(a, b, |s| evaluator.payoff_at(s), &mut convergency)
    .unwrap_or_else(|_| a + (b - a) * fa / (fa - fb))
}

fn bound_above(slope: f64, highest: f64) -> Bound {
  if slope > 0.0 {
    Bound::Unbounded
  } else {
    Bound::Finite(highest)
  }
}

fn bound_below(slope: f64, lowest: f64) -> Bound {
  if slope < 0.0 {
    Bound::Unbounded
  } else {
    Bound::Finite(-lowest)
  }
}

fn zero_tolerance(values: &[f64]) -> f64 {
  1e-9 * values.iter().fold(1.0_f64, |m, v| m.max(v.abs()))
}

fn sorted_distinct(mut xs: Vec<f64>) -> Vec<f64> {
  xs.sort_by(f64::total_cmp);
  xs.dedup_by(|a, b| (*a - *b).abs() <= 1e-9 * b.abs().max(1.0));
  xs
}
