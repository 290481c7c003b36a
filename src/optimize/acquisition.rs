//! # Acquisition Functions
//!
//! $$
//! \mathrm{EI}(\mathbf{x})=(\mu-y^\*-\xi)\,\Phi(Z)+\sigma\,\phi(Z)
//! $$
//!
//! Proposal scoring from the surrogate posterior and its multi-restart
//! maximization over the simplex.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use rand::Rng;
use rayon::prelude::*;
use statrs::distribution::Continuous;
use statrs::distribution::ContinuousCDF;
use statrs::distribution::Normal;
use tracing::warn;

use super::simplex;
use super::surrogate::Surrogate;

/// Acquisition rules scoring candidate proposals; higher is more promising.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Acquisition {
  /// Expected improvement over the incumbent with exploration margin `xi`.
  ExpectedImprovement { xi: f64 },
  /// Optimistic upper confidence bound `μ + β·σ`.
  UpperConfidenceBound { beta: f64 },
}

impl Default for Acquisition {
  fn default() -> Self {
    Self::ExpectedImprovement { xi: 0.01 }
  }
}

impl Acquisition {
  /// Score a posterior `(mean, std)` against the incumbent best.
  pub fn score(&self, mean: f64, std: f64, best: f64) -> f64 {
    match *self {
      Self::ExpectedImprovement { xi } => expected_improvement(mean, std, best, xi),
      Self::UpperConfidenceBound { beta } => mean + beta * std,
    }
  }
}

/// Expected improvement over the incumbent.
///
/// Defined as zero wherever the posterior is certain (`σ = 0`); there is
/// nothing left to exploit or explore at such points.
pub fn expected_improvement(mean: f64, std: f64, best: f64, xi: f64) -> f64 {
  if std <= 0.0 {
    return 0.0;
  }

  let imp = mean - best - xi;
  let z = imp / std;
  let normal = Normal::default();

  imp * normal.cdf(z) + std * normal.pdf(z)
}

/// Maximize the acquisition over the simplex with `n_restarts` local
/// searches from Dirichlet-sampled feasible starts.
///
/// Restarts are a heuristic mitigation against local optima; no global
/// guarantee is claimed. Start points are drawn sequentially from `rng`,
/// the searches themselves run in parallel.
pub fn propose_location<S, R>(
  surrogate: &S,
  acquisition: Acquisition,
  best_score: f64,
  n_assets: usize,
  n_restarts: usize,
  dirichlet_alpha: f64,
  rng: &mut R,
) -> Vec<f64>
where
  S: Surrogate + Sync,
  R: Rng + ?Sized,
{
  let starts: Vec<Vec<f64>> = (0..n_restarts.max(1))
    .map(|_| {
      let w = simplex::sample_dirichlet(rng, n_assets, dirichlet_alpha);
      simplex::logits_from_weights(&w)
    })
    .collect();

  let outcomes: Vec<Option<(Vec<f64>, f64)>> = starts
    .par_iter()
    .map(|z0| optimize_restart(surrogate, acquisition, best_score, z0))
    .collect();

  let mut best: Option<(Vec<f64>, f64)> = None;
  for (weights, neg_score) in outcomes.into_iter().flatten() {
    let improved = best
      .as_ref()
      .map(|(_, incumbent)| neg_score < *incumbent)
      .unwrap_or(true);
    if improved {
      best = Some((weights, neg_score));
    }
  }

  match best {
    Some((weights, _)) => weights,
    None => {
      warn!("all acquisition restarts failed, proposing uniform weights");
      vec![1.0 / n_assets as f64; n_assets]
    }
  }
}

struct AcquisitionCost<'a, S> {
  surrogate: &'a S,
  acquisition: Acquisition,
  best_score: f64,
}

impl<S: Surrogate> CostFunction for AcquisitionCost<'_, S> {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, z: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let w = simplex::softmax(z);
    let (mean, std) = self.surrogate.predict(&w);
    Ok(-self.acquisition.score(mean, std, self.best_score))
  }
}

fn optimize_restart<S: Surrogate>(
  surrogate: &S,
  acquisition: Acquisition,
  best_score: f64,
  z0: &[f64],
) -> Option<(Vec<f64>, f64)> {
  let cost = AcquisitionCost {
    surrogate,
    acquisition,
    best_score,
  };

  let mut vertices = Vec::with_capacity(z0.len() + 1);
  vertices.push(z0.to_vec());
  for i in 0..z0.len() {
    let mut point = z0.to_vec();
    point[i] += 1.0;
    vertices.push(point);
  }

  let solver = NelderMead::new(vertices).with_sd_tolerance(1e-8).ok()?;
  let res = Executor::new(cost, solver)
    .configure(|state| state.max_iters(300))
    .run()
    .ok()?;

  let z = res.state.best_param?;
  Some((simplex::softmax(&z), res.state.best_cost))
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  use super::super::trace::ObjectiveSample;
  use super::super::OptimizeError;
  use super::*;

  /// Analytic posterior peaked at w₀ = 0.7, constant uncertainty.
  struct BumpSurrogate;

  impl Surrogate for BumpSurrogate {
    fn fit(&mut self, _samples: &[ObjectiveSample]) -> Result<(), OptimizeError> {
      Ok(())
    }

    fn predict(&self, point: &[f64]) -> (f64, f64) {
      let mean = 1.0 - (point[0] - 0.7) * (point[0] - 0.7);
      (mean, 0.1)
    }
  }

  #[test]
  fn ei_matches_closed_form() {
    // imp = 1, Z = 1: EI = Φ(1) + φ(1)
    let ei = expected_improvement(1.0, 1.0, 0.0, 0.0);
    assert_relative_eq!(ei, 1.083_315_5, epsilon = 1e-6);
  }

  #[test]
  fn ei_is_zero_without_uncertainty() {
    assert_eq!(expected_improvement(10.0, 0.0, 0.0, 0.01), 0.0);
  }

  #[test]
  fn ei_is_non_negative_everywhere() {
    for &mean in &[-2.0, -0.5, 0.0, 0.5, 2.0] {
      for &std in &[0.0, 0.01, 0.1, 1.0] {
        for &best in &[-1.0, 0.0, 1.0] {
          assert!(expected_improvement(mean, std, best, 0.01) >= 0.0);
        }
      }
    }
  }

  #[test]
  fn ucb_is_mean_plus_scaled_std() {
    let acq = Acquisition::UpperConfidenceBound { beta: 2.0 };
    assert_abs_diff_eq!(acq.score(0.5, 0.1, 0.0), 0.7, epsilon = 1e-12);
  }

  #[test]
  fn proposal_lands_near_posterior_peak() {
    let mut rng = StdRng::seed_from_u64(11);
    let acq = Acquisition::UpperConfidenceBound { beta: 0.0 };
    let w = propose_location(&BumpSurrogate, acq, 0.5, 2, 10, 1.0, &mut rng);

    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    assert!(w.iter().all(|&x| x >= 0.0));
    assert_abs_diff_eq!(w[0], 0.7, epsilon = 0.05);
  }
}
