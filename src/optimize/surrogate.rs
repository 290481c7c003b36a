//! # Gaussian Process Surrogate
//!
//! $$
//! k(\mathbf{x},\mathbf{x}')=\sigma^2\exp\!\left(-\frac{\lVert\mathbf{x}-\mathbf{x}'\rVert^2}{2\ell^2}\right)
//! $$
//!
//! Regression surrogate over the objective surface with marginal-likelihood
//! hyperparameter selection.

use std::f64::consts::PI;

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use impl_new_derive::ImplNew;
use nalgebra::Cholesky;
use nalgebra::DMatrix;
use nalgebra::DVector;
use nalgebra::Dyn;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rayon::prelude::*;

use super::trace::ObjectiveSample;
use super::OptimizeError;

/// Bounds on the kernel signal variance.
pub const SIGNAL_VARIANCE_BOUNDS: (f64, f64) = (1e-3, 10.0);
/// Bounds on the kernel length scale.
pub const LENGTH_SCALE_BOUNDS: (f64, f64) = (1e-2, 100.0);

const FIT_RESTARTS: usize = 10;
const JITTER: f64 = 1e-8;

/// Squared-exponential kernel with signal variance and length scale.
#[derive(ImplNew, Clone, Copy, Debug)]
pub struct RbfKernel {
  pub sigma2: f64,
  pub length_scale: f64,
}

impl RbfKernel {
  /// Kernel value between two points.
  pub fn apply(&self, x1: &[f64], x2: &[f64]) -> f64 {
    let sq_dist: f64 = x1
      .iter()
      .zip(x2.iter())
      .map(|(a, b)| (a - b) * (a - b))
      .sum();

    self.sigma2 * (-sq_dist / (2.0 * self.length_scale * self.length_scale)).exp()
  }
}

/// Regression surrogate exposing a posterior over the objective surface.
pub trait Surrogate {
  /// Refit to the full training set.
  fn fit(&mut self, samples: &[ObjectiveSample]) -> Result<(), OptimizeError>;

  /// Posterior mean and standard deviation at a query point.
  fn predict(&self, point: &[f64]) -> (f64, f64);

  /// Posterior mean and standard deviation at each query point.
  fn predict_batch(&self, points: &[Vec<f64>]) -> Vec<(f64, f64)> {
    points.iter().map(|p| self.predict(p)).collect()
  }
}

/// Gaussian process surrogate with a `σ²·RBF(ℓ)` kernel.
///
/// Hyperparameters are selected on every fit by maximizing the log marginal
/// likelihood from several random restarts; the likelihood surface is
/// multimodal and a single local search lands in poor optima on small
/// training sets.
pub struct GpSurrogate {
  kernel: RbfKernel,
  rng: StdRng,
  x_train: Vec<Vec<f64>>,
  alpha: Option<DVector<f64>>,
  chol: Option<Cholesky<f64, Dyn>>,
}

impl GpSurrogate {
  pub fn new() -> Self {
    Self::with_seed(rand::thread_rng().gen())
  }

  /// Surrogate with a deterministic restart sequence.
  pub fn with_seed(seed: u64) -> Self {
    Self {
      kernel: RbfKernel::new(1.0, 1.0),
      rng: StdRng::seed_from_u64(seed),
      x_train: Vec::new(),
      alpha: None,
      chol: None,
    }
  }

  /// Currently fitted kernel hyperparameters.
  pub fn kernel(&self) -> RbfKernel {
    self.kernel
  }
}

impl Default for GpSurrogate {
  fn default() -> Self {
    Self::new()
  }
}

impl Surrogate for GpSurrogate {
  fn fit(&mut self, samples: &[ObjectiveSample]) -> Result<(), OptimizeError> {
    if samples.is_empty() {
      return Err(OptimizeError::InvalidInput(
        "cannot fit surrogate without samples".to_string(),
      ));
    }

    let x: Vec<Vec<f64>> = samples.iter().map(|s| s.weights.clone()).collect();
    let y = DVector::from_iterator(samples.len(), samples.iter().map(|s| s.score));

    let guesses: Vec<Vec<f64>> = (0..FIT_RESTARTS)
      .map(|_| {
        vec![
          self
            .rng
            .gen_range(SIGNAL_VARIANCE_BOUNDS.0.ln()..SIGNAL_VARIANCE_BOUNDS.1.ln()),
          self
            .rng
            .gen_range(LENGTH_SCALE_BOUNDS.0.ln()..LENGTH_SCALE_BOUNDS.1.ln()),
        ]
      })
      .collect();

    // Restarts are independent; collect in guess order and pick the best
    // sequentially so ties resolve the same way on every run.
    let candidates: Vec<Option<(RbfKernel, f64)>> = guesses
      .par_iter()
      .map(|guess| fit_from_guess(&x, &y, guess))
      .collect();

    let mut best: Option<(RbfKernel, f64)> = None;
    for candidate in candidates.into_iter().flatten() {
      let improved = best.map(|(_, ll)| candidate.1 > ll).unwrap_or(true);
      if improved {
        best = Some(candidate);
      }
    }

    let Some((kernel, _)) = best else {
      return Err(OptimizeError::SurrogateFit(
        "marginal-likelihood optimization failed on every restart".to_string(),
      ));
    };

    let gram = gram_matrix(&x, &kernel);
    let Some(chol) = gram.cholesky() else {
      return Err(OptimizeError::SurrogateFit(
        "kernel matrix is not positive definite".to_string(),
      ));
    };
    let alpha = chol.solve(&y);

    self.kernel = kernel;
    self.x_train = x;
    self.alpha = Some(alpha);
    self.chol = Some(chol);

    Ok(())
  }

  fn predict(&self, point: &[f64]) -> (f64, f64) {
    let (Some(chol), Some(alpha)) = (&self.chol, &self.alpha) else {
      return (0.0, self.kernel.sigma2.sqrt());
    };

    let k_star = DVector::from_iterator(
      self.x_train.len(),
      self.x_train.iter().map(|xi| self.kernel.apply(xi, point)),
    );

    let mean = k_star.dot(alpha);
    let v = chol.solve(&k_star);
    let var = self.kernel.apply(point, point) - k_star.dot(&v);

    (mean, var.max(0.0).sqrt())
  }
}

fn kernel_from_log_params(t: &[f64]) -> RbfKernel {
  RbfKernel::new(
    t[0]
      .exp()
      .clamp(SIGNAL_VARIANCE_BOUNDS.0, SIGNAL_VARIANCE_BOUNDS.1),
    t[1].exp().clamp(LENGTH_SCALE_BOUNDS.0, LENGTH_SCALE_BOUNDS.1),
  )
}

fn gram_matrix(x: &[Vec<f64>], kernel: &RbfKernel) -> DMatrix<f64> {
  let n = x.len();
  let mut gram = DMatrix::from_fn(n, n, |i, j| kernel.apply(&x[i], &x[j]));
  for i in 0..n {
    gram[(i, i)] += JITTER;
  }
  gram
}

fn log_marginal_likelihood(x: &[Vec<f64>], y: &DVector<f64>, kernel: &RbfKernel) -> Option<f64> {
  let n = x.len();
  let chol = gram_matrix(x, kernel).cholesky()?;
  let alpha = chol.solve(y);
  let log_det: f64 = chol.l().diagonal().iter().map(|d| d.ln()).sum::<f64>() * 2.0;

  Some(-0.5 * y.dot(&alpha) - 0.5 * log_det - 0.5 * n as f64 * (2.0 * PI).ln())
}

struct MarginalLikelihoodCost<'a> {
  x: &'a [Vec<f64>],
  y: &'a DVector<f64>,
}

impl CostFunction for MarginalLikelihoodCost<'_> {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, t: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let kernel = kernel_from_log_params(t);
    match log_marginal_likelihood(self.x, self.y, &kernel) {
      Some(ll) if ll.is_finite() => Ok(-ll),
      _ => Ok(1e10),
    }
  }
}

fn fit_from_guess(x: &[Vec<f64>], y: &DVector<f64>, guess: &[f64]) -> Option<(RbfKernel, f64)> {
  let cost = MarginalLikelihoodCost { x, y };

  let mut simplex = Vec::with_capacity(guess.len() + 1);
  simplex.push(guess.to_vec());
  for i in 0..guess.len() {
    let mut point = guess.to_vec();
    point[i] += 1.0;
    simplex.push(point);
  }

  let solver = NelderMead::new(simplex).with_sd_tolerance(1e-8).ok()?;
  let res = Executor::new(cost, solver)
    .configure(|state| state.max_iters(500))
    .run()
    .ok()?;

  let params = res.state.best_param?;
  let ll = -res.state.best_cost;
  if !ll.is_finite() || ll <= -1e9 {
    return None;
  }

  Some((kernel_from_log_params(&params), ll))
}
