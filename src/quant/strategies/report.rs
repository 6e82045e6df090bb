use prettytable::format;
use prettytable::row;
use prettytable::Table;

use super::payoff::PayoffCurve;
use super::types::Bound;
use super::types::Direction;
use super::types::Position;
use super::types::RiskMetrics;

/// Premium of one leg as shown to the user.
#[derive(Clone, PartialEq, Debug)]
pub struct LegPremium {
  pub label: String,
  pub direction: Direction,
  pub quantity: u32,
  pub premium: f64,
}

impl LegPremium {
  /// "Paid" for long legs, "Received" for short ones.
  pub fn flow(&self) -> &'static str {
    match self.direction {
      Direction::Long => "Paid",
      Direction::Short => "Received",
    }
  }
}

/// Everything one evaluation hands to the presentation layer.
#[derive(Clone, PartialEq, Debug)]
pub struct Evaluation {
  pub strategy: Option<&'static str>,
  pub position: Position,
  pub curve: PayoffCurve,
  pub metrics: RiskMetrics,
  pub leg_premiums: Vec<LegPremium>,
}

impl Evaluation {
  pub fn new(
    strategy: Option<&'static str>,
    position: Position,
    curve: PayoffCurve,
    metrics: RiskMetrics,
  ) -> Self {
    let leg_premiums = position
      .option_legs()
      .map(|leg| LegPremium {
        label: format!("{} {}", leg.instrument(), leg.strike().unwrap_or_default()),
        direction: leg.direction(),
        quantity: leg.quantity(),
        premium: leg.premium(),
      })
      .collect();

    Self {
      strategy,
      position,
      curve,
      metrics,
      leg_premiums,
    }
  }

  /// Per-leg premiums and risk figures, rounded to cents.
  pub fn summary_table(&self) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(row![bF => self.strategy.unwrap_or("Position"), ""]);

    for leg in &self.leg_premiums {
      table.add_row(row![
        format!("Premium {} ({} x {})", leg.flow(), leg.quantity, leg.label),
        format!("{:.2}", leg.premium)
      ]);
    }

    let m = &self.metrics;
    let flow = if m.net_premium >= 0.0 { "Net Debit" } else { "Net Credit" };
    table.add_row(row![flow, format!("{:.2}", m.net_premium.abs())]);
    table.add_row(row!["Max Profit", m.max_profit]);
    table.add_row(row!["Max Loss", m.max_loss]);

    let breakevens = if m.breakevens.is_empty() {
      "none".to_string()
    } else {
      m.breakevens
        .iter()
        .map(|b| format!("{b:.2}"))
        .collect::<Vec<_>>()
        .join(", ")
    };
    table.add_row(row!["Breakevens", breakevens]);
    table
  }

  pub fn max_profit(&self) -> Bound {
    self.metrics.max_profit
  }

  pub fn max_loss(&self) -> Bound {
    self.metrics.max_loss
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::quant::strategies::payoff::PayoffEvaluator;
  use crate::quant::strategies::metrics::risk_metrics;
  use crate::quant::strategies::types::EvaluationRequest;
  use crate::quant::strategies::types::Leg;
  use crate::quant::OptionType;

  #[test]
  fn summary_lists_legs_and_metrics() {
    let position = Position::new(vec![
      Leg::option(OptionType::Call, Direction::Long, 1, 100.0, 5.0, 0.25).unwrap(),
      Leg::option(OptionType::Call, Direction::Short, 1, 110.0, 2.0, 0.25).unwrap(),
    ])
    .unwrap();
    let request = EvaluationRequest::new(50.0, 150.0, 100);
    let evaluator = PayoffEvaluator::new(&position, &request);
    let curve = evaluator.curve();
    let metrics = risk_metrics(&position, &evaluator, &curve).unwrap();
    let evaluation = Evaluation::new(Some("Bull Call Spread"), position, curve, metrics);

    assert_eq!(evaluation.leg_premiums[1].flow(), "Received");
    let rendered = evaluation.summary_table().to_string();
    assert!(rendered.contains("Bull Call Spread"));
    assert!(rendered.contains("Net Debit"));
    assert!(rendered.contains("7.00"));
    assert!(rendered.contains("103.00"));
  }
}
