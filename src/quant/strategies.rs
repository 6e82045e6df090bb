//! # Strategies
//!
//! $$
//! \text{chain}\xrightarrow{\text{select}}\text{legs}\xrightarrow{\text{validate}}\Pi(S_T)\xrightarrow{}\bigl(\Pi_{\max},\,L_{\max},\,\{S^\ast:\Pi(S^\ast)=0\}\bigr)
//! $$
//!
//! Multi-leg option strategies: the leg model, the static catalog of named
//! templates, strike and expiration selection against a chain snapshot, payoff
//! evaluation and risk metrics.
use rayon::prelude::*;
use tracing::info;
use tracing::instrument;

pub mod catalog;
pub mod chain;
pub mod config;
pub mod error;
pub mod metrics;
pub mod payoff;
pub mod report;
pub mod selector;
pub mod types;

pub use catalog::by_view;
pub use catalog::find;
pub use catalog::roles_for;
pub use catalog::validate;
pub use catalog::MarketView;
pub use catalog::StrategyTemplate;
pub use chain::ChainSnapshot;
pub use chain::OptionChain;
pub use chain::Quote;
pub use config::EvaluationConfig;
pub use error::StrategyError;
pub use payoff::PayoffCurve;
pub use payoff::PayoffEvaluator;
pub use report::Evaluation;
pub use selector::Selection;
pub use selector::Selector;
pub use types::Bound;
pub use types::Direction;
pub use types::EvaluationRequest;
pub use types::Instrument;
pub use types::Leg;
pub use types::Position;
pub use types::RiskMetrics;

/// Evaluate one position over one request.
pub fn evaluate(
  position: &Position,
  request: &EvaluationRequest,
) -> Result<Evaluation, StrategyError> {
  let evaluator = PayoffEvaluator::new(position, request);
  let curve = evaluator.curve();
  let metrics = metrics::risk_metrics(position, &evaluator, &curve)?;
  Ok(Evaluation::new(None, position.clone(), curve, metrics))
}

/// Evaluate independent positions in parallel, preserving input order.
pub fn evaluate_many(
  jobs: &[(Position, EvaluationRequest)],
) -> Vec<Result<Evaluation, StrategyError>> {
  jobs
    .par_iter()
    .map(|(position, request)| evaluate(position, request))
    .collect()
}

/// Entry point tying catalog, selector and evaluation together.
#[derive(Default, Clone, Copy, Debug)]
pub struct StrategyEngine {
  config: EvaluationConfig,
}

impl StrategyEngine {
  pub fn new(config: EvaluationConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &EvaluationConfig {
    &self.config
  }

  /// Default request for `position`, centred on its reference price.
  ///
  /// A position whose strikes and entry price are all zero has no range to scale.
  pub fn request_for(&self, position: &Position) -> Result<EvaluationRequest, StrategyError> {
    let reference = position.reference_price();
    if !(reference.is_finite() && reference > 0.0) {
      return Err(StrategyError::DegenerateRange(reference));
    }
    Ok(EvaluationRequest::from_config(&self.config, reference))
  }

  /// Evaluate a position over its default request.
  pub fn evaluate(&self, position: &Position) -> Result<Evaluation, StrategyError> {
    evaluate(position, &self.request_for(position)?)
  }

  /// Validate a caller-built position as an instance of `name` and evaluate it.
  #[instrument(skip(self, position, chain))]
  pub fn evaluate_position(
    &self,
    name: &str,
    position: &Position,
    chain: &ChainSnapshot,
  ) -> Result<Evaluation, StrategyError> {
    let template = find(name)?;
    template.validate(position, chain.spot())?;
    position.verify_quotes(chain)?;

    let mut evaluation = self.evaluate(position)?;
    evaluation.strategy = Some(template.name);
    Ok(evaluation)
  }

  /// Assemble `name` from `selection` and evaluate it.
  #[instrument(skip(self, chain, selection))]
  pub fn evaluate_strategy(
    &self,
    name: &str,
    chain: &ChainSnapshot,
    selection: &Selection,
  ) -> Result<Evaluation, StrategyError> {
    let template = find(name)?;
    let position = template.assemble(chain, selection)?;
    let mut evaluation = self.evaluate(&position)?;
    evaluation.strategy = Some(template.name);

    info!(
      strategy = template.name,
      net_premium = evaluation.metrics.net_premium,
      max_profit = %evaluation.metrics.max_profit,
      max_loss = %evaluation.metrics.max_loss,
      "evaluated strategy"
    );
    Ok(evaluation)
  }

  /// Evaluate `name` with the selector's suggested expirations and strikes.
  #[instrument(skip(self, chain))]
  pub fn evaluate_suggested(
    &self,
    name: &str,
    chain: &ChainSnapshot,
  ) -> Result<Evaluation, StrategyError> {
    let template = find(name)?;
    let selection = Selector::new(template, chain).suggest()?;
    self.evaluate_strategy(template.name, chain, &selection)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use chrono::NaiveDate;

  use super::catalog::catalog;
  use super::catalog::ExpirySlot;
  use super::catalog::PremiumFlow;
  use super::error::ConstraintViolation;
  use super::*;
  use crate::quant::OptionType;

  fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, d).unwrap()
  }

  fn bsm_chain() -> ChainSnapshot {
    let strikes = (12..=28).map(|i| i as f64 * 5.0).collect::<Vec<_>>();
    ChainSnapshot::black_scholes(
      100.0,
      date(1, 1),
      &[date(2, 15), date(4, 1), date(7, 1)],
      &strikes,
      0.05,
      0.25,
    )
  }

  fn spread_chain() -> ChainSnapshot {
    ChainSnapshot::new(100.0, date(1, 1)).with_expiration(
      date(3, 1),
      OptionChain::from_quotes(
        &[Quote::new(100.0, 5.0), Quote::new(110.0, 2.0)],
        &[Quote::new(100.0, 4.0)],
      ),
    )
  }

  fn admissible_strikes(
    selector: &Selector,
    chosen: &mut Vec<Option<f64>>,
    near: NaiveDate,
    far: Option<NaiveDate>,
    out: &mut Vec<Vec<Option<f64>>>,
  ) {
    let Some(slot) = chosen.iter().position(Option::is_none) else {
      out.push(chosen.clone());
      return;
    };
    for k in selector.strikes(slot, chosen, Some(near), far).unwrap_or_default() {
      chosen[slot] = Some(k);
      admissible_strikes(selector, chosen, near, far, out);
    }
    chosen[slot] = None;
  }

  #[test]
  fn bull_call_spread_end_to_end() {
    let engine = StrategyEngine::default();
    let chain = spread_chain();
    let selection = Selection::default()
      .near(date(3, 1))
      .strike(0, 100.0)
      .strike(1, 110.0);
    let evaluation = engine
      .evaluate_strategy("Bull Call Spread", &chain, &selection)
      .unwrap();

    let m = &evaluation.metrics;
    assert_abs_diff_eq!(m.net_premium, 3.0);
    assert_eq!(m.max_profit, Bound::Finite(7.0));
    assert_eq!(m.max_loss, Bound::Finite(3.0));
    assert_eq!(evaluation.curve.len(), 100);
    assert_eq!(evaluation.curve.s_t[0], 52.5);
    assert_eq!(evaluation.strategy, Some("Bull Call Spread"));
  }

  #[test]
  fn rejected_selection_is_reported() {
    let engine = StrategyEngine::default();
    let chain = spread_chain();
    let inverted = Selection::default()
      .near(date(3, 1))
      .strike(0, 110.0)
      .strike(1, 100.0);
    assert!(matches!(
      engine.evaluate_strategy("Bull Call Spread", &chain, &inverted),
      Err(StrategyError::Constraint(ConstraintViolation::Ordering { .. }))
    ));

    let missing = Selection::default().near(date(3, 1)).strike(0, 100.0);
    assert!(matches!(
      engine.evaluate_strategy("Bull Call Spread", &chain, &missing),
      Err(StrategyError::IncompleteSelection(_))
    ));

    let unquoted = Selection::default()
      .near(date(3, 1))
      .strike(0, 100.0)
      .strike(1, 120.0);
    assert!(matches!(
      engine.evaluate_strategy("Bull Call Spread", &chain, &unquoted),
      Err(StrategyError::Constraint(ConstraintViolation::NotQuoted { .. }))
    ));
  }

  #[test]
  fn position_must_be_quoted() {
    let engine = StrategyEngine::default();
    let chain = spread_chain();
    let horizon = chain.horizon(date(3, 1));
    let straddle = |strike: f64| {
      Position::new(vec![
        Leg::option(OptionType::Call, Direction::Long, 1, strike, 5.0, horizon).unwrap(),
        Leg::option(OptionType::Put, Direction::Long, 1, strike, 4.0, horizon).unwrap(),
      ])
      .unwrap()
    };

    assert!(engine
      .evaluate_position("Long Straddle", &straddle(100.0), &chain)
      .is_ok());
    assert!(matches!(
      engine.evaluate_position("Long Straddle", &straddle(110.0), &chain),
      Err(StrategyError::Constraint(ConstraintViolation::NotQuoted { .. }))
    ));
  }

  #[test]
  fn every_template_evaluates_consistently() {
    let engine = StrategyEngine::default();
    let chain = bsm_chain();

    for template in catalog() {
      let evaluation = engine
        .evaluate_suggested(template.name, &chain)
        .unwrap_or_else(|err| panic!("{}: {err}", template.name));
      let m = &evaluation.metrics;

      let request = engine.request_for(&evaluation.position).unwrap();
      let evaluator = PayoffEvaluator::new(&evaluation.position, &request);
      for be in &m.breakevens {
        assert_abs_diff_eq!(evaluator.payoff_at(*be), 0.0, epsilon = 1e-6);
      }
      assert!(m.breakevens.windows(2).all(|w| w[0] < w[1]), "{}", template.name);

      match template.flow {
        PremiumFlow::Debit => assert!(m.net_premium > 0.0, "{} should be a debit", template.name),
        PremiumFlow::Credit => assert!(m.net_premium < 0.0, "{} should be a credit", template.name),
        PremiumFlow::Either => {}
      }

      if let (Bound::Finite(profit), Bound::Finite(loss)) = (m.max_profit, m.max_loss) {
        assert!(profit >= -loss, "{}", template.name);
      }
    }
  }

  #[test]
  fn premium_sign_holds_for_every_admissible_choice() {
    let engine = StrategyEngine::default();
    let strikes = (18..=22).map(|i| i as f64 * 5.0).collect::<Vec<_>>();
    let chain = ChainSnapshot::black_scholes(
      100.0,
      date(1, 1),
      &[date(2, 15), date(4, 1)],
      &strikes,
      0.05,
      0.25,
    );

    for template in catalog().iter().filter(|t| t.flow != PremiumFlow::Either) {
      let selector = Selector::new(template, &chain);
      let near = selector.expirations(ExpirySlot::Near, None).unwrap()[0];
      let far = template
        .is_multi_expiry()
        .then(|| selector.expirations(ExpirySlot::Far, Some(near)).unwrap()[0]);

      let mut choices = Vec::new();
      let mut chosen = vec![None; template.slots.len()];
      admissible_strikes(&selector, &mut chosen, near, far, &mut choices);
      assert!(!choices.is_empty(), "{} has no admissible strikes", template.name);

      for strikes in choices {
        let selection = Selection {
          near: Some(near),
          far,
          strikes: strikes.clone(),
          quantities: Default::default(),
        };
        let net = engine
          .evaluate_strategy(template.name, &chain, &selection)
          .unwrap_or_else(|err| panic!("{} {strikes:?}: {err}", template.name))
          .metrics
          .net_premium;
        match template.flow {
          PremiumFlow::Debit => assert!(net > 0.0, "{} {strikes:?} gave {net}", template.name),
          PremiumFlow::Credit => assert!(net < 0.0, "{} {strikes:?} gave {net}", template.name),
          PremiumFlow::Either => unreachable!(),
        }
      }
    }
  }

  #[test]
  fn zero_reference_price_is_an_error() {
    let engine = StrategyEngine::default();
    let position = Position::new(vec![Leg::stock(Direction::Long, 1, 0.0).unwrap()]).unwrap();
    assert_eq!(
      engine.request_for(&position),
      Err(StrategyError::DegenerateRange(0.0))
    );
    assert!(matches!(
      engine.evaluate(&position),
      Err(StrategyError::DegenerateRange(_))
    ));

    let stock = Position::new(vec![Leg::stock(Direction::Long, 1, 80.0).unwrap()]).unwrap();
    let request = engine.request_for(&stock).unwrap();
    assert_eq!((request.s_min(), request.s_max()), (40.0, 120.0));
  }

  #[test]
  fn batch_matches_single_evaluation() {
    let engine = StrategyEngine::default();
    let chain = bsm_chain();
    let jobs = ["Long Straddle", "Long Iron Condor", "Calendar Put Spread"]
      .iter()
      .map(|name| {
        let evaluation = engine.evaluate_suggested(name, &chain).unwrap();
        let request = engine.request_for(&evaluation.position).unwrap();
        (evaluation.position, request)
      })
      .collect::<Vec<_>>();

    let batch = evaluate_many(&jobs);
    assert_eq!(batch.len(), 3);
    for ((position, request), result) in jobs.iter().zip(batch) {
      let single = evaluate(position, request).unwrap();
      assert_eq!(result.unwrap().metrics, single.metrics);
    }
  }

  #[test]
  fn unknown_strategy() {
    let engine = StrategyEngine::default();
    assert!(matches!(
      engine.evaluate_suggested("Iron Eagle", &spread_chain()),
      Err(StrategyError::UnknownStrategy(_))
    ));
  }
}
