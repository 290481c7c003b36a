//! # Optimize
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}\in\Delta^{N-1}} f(\mathbf{w})
//! $$
//!
//! Bayesian and gradient-based search for simplex-constrained portfolio
//! weights.

pub mod acquisition;
pub mod autodiff;
pub mod bayes;
pub mod gradient;
pub mod objective;
pub mod simplex;
pub mod surrogate;
pub mod trace;

use impl_new_derive::ImplNew;
use thiserror::Error;

pub use acquisition::expected_improvement;
pub use acquisition::propose_location;
pub use acquisition::Acquisition;
pub use bayes::bayesian_optimize;
pub use bayes::BayesConfig;
pub use gradient::annualize_sharpe;
pub use gradient::gradient_optimize;
pub use gradient::GradientConfig;
pub use gradient::GradientResult;
pub use objective::omega_empirical;
pub use objective::omega_kde;
pub use objective::sharpe;
pub use objective::Objective;
pub use surrogate::GpSurrogate;
pub use surrogate::RbfKernel;
pub use surrogate::Surrogate;
pub use trace::ObjectiveSample;
pub use trace::OptimizationTrace;

/// Failure modes of the optimization engines.
#[derive(Debug, Error)]
pub enum OptimizeError {
  /// The objective produced a non-finite sentinel, typically because the
  /// portfolio return variance collapsed to zero.
  #[error("degenerate objective: {0}")]
  DegenerateObjective(String),
  /// Surrogate hyperparameter optimization failed on every restart.
  #[error("surrogate fit failed: {0}")]
  SurrogateFit(String),
  /// Returns matrix or configuration rejected before optimization.
  #[error("invalid input: {0}")]
  InvalidInput(String),
}

/// Fatal Bayesian-loop failure carrying the trace reached so far.
#[derive(ImplNew, Debug, Error)]
#[error("{kind}")]
pub struct BayesError {
  /// What aborted the run.
  pub kind: OptimizeError,
  /// Samples evaluated before the abort.
  pub partial: OptimizationTrace,
}
