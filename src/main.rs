use chrono::NaiveDate;
use strategy_payoff::quant::strategies::by_view;
use strategy_payoff::quant::strategies::ChainSnapshot;
use strategy_payoff::quant::strategies::EvaluationConfig;
use strategy_payoff::quant::strategies::MarketView;
use strategy_payoff::quant::strategies::StrategyEngine;
use tracing::warn;
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
    .init();

  let config = EvaluationConfig::from_env()?;
  let engine = StrategyEngine::new(config);

  let date = |m, d| NaiveDate::from_ymd_opt(2025, m, d).ok_or_else(|| anyhow::anyhow!("bad date"));
  let strikes = (12..=28).map(|i| i as f64 * 5.0).collect::<Vec<_>>();
  let chain = ChainSnapshot::black_scholes(
    100.0,
    date(1, 2)?,
    &[date(2, 21)?, date(3, 21)?, date(6, 20)?],
    &strikes,
    config.rate,
    config.volatility,
  );

  for view in [
    MarketView::Bullish,
    MarketView::Bearish,
    MarketView::HighVolatility,
    MarketView::LowVolatility,
  ] {
    println!("\n{view}");
    for template in by_view(view) {
      match engine.evaluate_suggested(template.name, &chain) {
        Ok(evaluation) => evaluation.summary_table().printstd(),
        Err(err) => warn!(strategy = template.name, %err, "skipped"),
      }
    }
  }

  Ok(())
}
