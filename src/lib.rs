//! # Strategy Payoff
//!
//! $$
//! \Pi(S_T)=\sum_{i} s_i\,q_i\left(V_i(S_T)-p_i\right)
//! $$
//!
//! `strategy_payoff` models multi-leg option strategies: it prices each leg at a common
//! evaluation horizon, sums the legs into a payoff curve and derives the net premium,
//! maximum profit and loss and breakeven prices of the position.
//!
//! ## Modules
//!
//! | Module                        | Description                                                                 |
//! |-------------------------------|-----------------------------------------------------------------------------|
//! | [`quant::pricing::bsm`]       | Black-Scholes valuation of legs that outlive the evaluation horizon.        |
//! | [`quant::strategies`]         | Legs, positions, the strategy catalog, selection, payoff and risk metrics.  |
//! | [`traits`]                    | Pricer and time-to-maturity contracts shared by the pricing code.           |
//!
//! ## Parallelism
//!
//! Every evaluation is a pure function of its inputs. [`quant::strategies::evaluate_many`]
//! uses `rayon` to evaluate independent positions in parallel.
//!
//! ## Example Usage
//!
//! ```rust
//! use strategy_payoff::quant::strategies::{EvaluationConfig, StrategyEngine};
//!
//! let engine = StrategyEngine::new(EvaluationConfig::default());
//! let evaluation = engine.evaluate_suggested("Bull Call Spread", &chain)?;
//! println!("{}", evaluation.summary_table());
//! ```
//!
pub mod quant;
pub mod traits;
