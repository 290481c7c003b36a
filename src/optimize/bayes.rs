//! # Bayesian Optimization Loop
//!
//! $$
//! \mathbf{x}_{k+1}=\arg\max_{\mathbf{x}\in\Delta^{N-1}}\mathrm{EI}(\mathbf{x}\mid\mathcal{D}_k)
//! $$
//!
//! Sequential model-based search: propose from the surrogate posterior,
//! evaluate the true objective, refit, repeat.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::data::ReturnsMatrix;

use super::acquisition::propose_location;
use super::acquisition::Acquisition;
use super::objective::Objective;
use super::simplex;
use super::surrogate::GpSurrogate;
use super::surrogate::Surrogate;
use super::trace::ObjectiveSample;
use super::trace::OptimizationTrace;
use super::BayesError;
use super::OptimizeError;

/// L1 drift beyond which a projected proposal is logged as infeasible.
const DRIFT_TOLERANCE: f64 = 1e-6;

/// Configuration of the Bayesian loop.
///
/// The iteration budget is the only terminator besides cancellation; early
/// stopping is intentionally not applied by default.
#[derive(Clone, Debug)]
pub struct BayesConfig {
  /// Measure evaluated as the true objective.
  pub objective: Objective,
  /// Propose/evaluate/update iterations after the initial design.
  pub iterations: usize,
  /// Size of the Dirichlet initial design.
  pub init_points: usize,
  /// Local restarts of the acquisition maximizer.
  pub n_restarts: usize,
  /// Acquisition rule scoring proposals.
  pub acquisition: Acquisition,
  /// Concentration of the symmetric Dirichlet used for feasible sampling.
  pub dirichlet_alpha: f64,
  /// RNG seed; a fixed seed reproduces the run.
  pub seed: Option<u64>,
  /// Cooperative stop flag checked between iterations.
  pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for BayesConfig {
  fn default() -> Self {
    Self {
      objective: Objective::default(),
      iterations: 30,
      init_points: 5,
      n_restarts: 10,
      acquisition: Acquisition::default(),
      dirichlet_alpha: 1.0,
      seed: None,
      cancel: None,
    }
  }
}

/// Run the Bayesian optimization loop over the simplex.
///
/// Fatal failures abort the run and report the trace reached so far inside
/// the error.
pub fn bayesian_optimize(
  returns: &ReturnsMatrix,
  config: &BayesConfig,
) -> Result<OptimizationTrace, BayesError> {
  if config.init_points == 0 {
    return Err(BayesError::new(
      OptimizeError::InvalidInput("initial design needs at least one point".to_string()),
      OptimizationTrace::default(),
    ));
  }
  if config.dirichlet_alpha <= 0.0 {
    return Err(BayesError::new(
      OptimizeError::InvalidInput("dirichlet_alpha must be positive".to_string()),
      OptimizationTrace::default(),
    ));
  }

  let mut rng = match config.seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  };
  let mut trace = OptimizationTrace::default();

  // Initial design: feasible by construction, no projection needed.
  for _ in 0..config.init_points {
    let weights = simplex::sample_dirichlet(&mut rng, returns.n_assets(), config.dirichlet_alpha);
    let score = config.objective.evaluate(&weights, returns);
    if score.is_nan() {
      return Err(BayesError::new(degenerate(), trace));
    }
    trace.push(ObjectiveSample::new(weights, score));
  }

  let mut surrogate = GpSurrogate::with_seed(rng.gen());
  if let Err(kind) = surrogate.fit(trace.samples()) {
    // Without a first fit there is nothing to propose from.
    return Err(BayesError::new(kind, trace));
  }

  for iteration in 0..config.iterations {
    if cancelled(config) {
      info!(iteration, "cancelled, returning the trace reached so far");
      break;
    }

    let best_score = trace
      .best()
      .map(|s| s.score)
      .unwrap_or(f64::NEG_INFINITY);
    let proposal = propose_location(
      &surrogate,
      config.acquisition,
      best_score,
      returns.n_assets(),
      config.n_restarts,
      config.dirichlet_alpha,
      &mut rng,
    );

    let (weights, drift) = simplex::project(&proposal);
    if drift > DRIFT_TOLERANCE {
      warn!(drift, "proposal drifted off the simplex, projected back");
    }

    let score = config.objective.evaluate(&weights, returns);
    if score.is_nan() {
      return Err(BayesError::new(degenerate(), trace));
    }
    trace.push(ObjectiveSample::new(weights, score));

    // A failed refit keeps the previous surrogate; the next proposal just
    // works from stale information.
    if let Err(err) = surrogate.fit(trace.samples()) {
      warn!(%err, "surrogate refit failed, keeping previous fit");
    }

    debug!(
      iteration,
      score,
      best = trace.best().map(|s| s.score).unwrap_or(f64::NAN),
      "iteration complete"
    );
  }

  Ok(trace)
}

fn cancelled(config: &BayesConfig) -> bool {
  config
    .cancel
    .as_ref()
    .map(|flag| flag.load(Ordering::Relaxed))
    .unwrap_or(false)
}

fn degenerate() -> OptimizeError {
  OptimizeError::DegenerateObjective(
    "portfolio return standard deviation collapsed to zero".to_string(),
  )
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn test_returns() -> ReturnsMatrix {
    // Asset 0 dominates asset 1 in mean/variance trade-off.
    let a: Vec<f64> = (0..60)
      .map(|i| 0.01 + 0.005 * ((i % 5) as f64 - 2.0))
      .collect();
    let b: Vec<f64> = (0..60)
      .map(|i| 0.001 + 0.02 * ((i % 7) as f64 - 3.0))
      .collect();
    ReturnsMatrix::new(vec![a, b]).unwrap()
  }

  fn test_config() -> BayesConfig {
    BayesConfig {
      iterations: 5,
      init_points: 4,
      n_restarts: 4,
      seed: Some(17),
      ..BayesConfig::default()
    }
  }

  #[test]
  fn every_sample_stays_on_the_simplex() {
    let trace = bayesian_optimize(&test_returns(), &test_config()).unwrap();

    assert_eq!(trace.len(), 9);
    for sample in trace.samples() {
      assert_abs_diff_eq!(sample.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
      assert!(sample.weights.iter().all(|&w| w >= 0.0));
    }
  }

  #[test]
  fn fixed_seed_reproduces_the_best_score() {
    let returns = test_returns();
    let config = test_config();

    let a = bayesian_optimize(&returns, &config).unwrap();
    let b = bayesian_optimize(&returns, &config).unwrap();

    assert_abs_diff_eq!(
      a.best().unwrap().score,
      b.best().unwrap().score,
      epsilon = 1e-9
    );
  }

  #[test]
  #[tracing_test::traced_test]
  fn cancellation_skips_the_proposal_loop() {
    let flag = Arc::new(AtomicBool::new(true));
    let config = BayesConfig {
      cancel: Some(flag),
      ..test_config()
    };

    let trace = bayesian_optimize(&test_returns(), &config).unwrap();
    assert_eq!(trace.len(), config.init_points);
    assert!(logs_contain("cancelled"));
  }

  #[test]
  fn degenerate_objective_reports_partial_trace() {
    // Constant returns: zero variance everywhere.
    let returns = ReturnsMatrix::new(vec![vec![0.01; 30], vec![0.01; 30]]).unwrap();
    let err = bayesian_optimize(&returns, &test_config()).unwrap_err();

    assert!(matches!(err.kind, OptimizeError::DegenerateObjective(_)));
    assert!(err.partial.is_empty());
  }

  #[test]
  fn infinite_omega_in_the_design_fails_the_first_fit() {
    // Strictly positive returns: no downside, Omega is infinite by
    // definition and the surrogate cannot ingest it.
    let returns = ReturnsMatrix::new(vec![
      (0..30).map(|i| 0.01 + 0.001 * (i % 3) as f64).collect(),
      (0..30).map(|i| 0.02 + 0.002 * (i % 4) as f64).collect(),
    ])
    .unwrap();
    let config = BayesConfig {
      objective: Objective::OmegaEmpirical { threshold: 0.0 },
      ..test_config()
    };

    let err = bayesian_optimize(&returns, &config).unwrap_err();
    assert!(matches!(err.kind, OptimizeError::SurrogateFit(_)));
    assert_eq!(err.partial.len(), config.init_points);
  }

  #[test]
  fn rejects_empty_initial_design() {
    let config = BayesConfig {
      init_points: 0,
      ..test_config()
    };

    let err = bayesian_optimize(&test_returns(), &config).unwrap_err();
    assert!(matches!(err.kind, OptimizeError::InvalidInput(_)));
  }
}
