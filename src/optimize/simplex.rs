//! # Simplex Utilities
//!
//! $$
//! \Delta^{N-1}=\{\mathbf{w}\in\mathbb{R}^N:\ w_i\ge 0,\ \textstyle\sum_i w_i=1\}
//! $$
//!
//! Parameterization and projection helpers for simplex-constrained weights,
//! shared by the Bayesian and gradient optimizers.

use rand::Rng;
use rand_distr::Dirichlet;
use rand_distr::Distribution;

/// Map unconstrained logits onto the simplex.
pub fn softmax(z: &[f64]) -> Vec<f64> {
  if z.is_empty() {
    return Vec::new();
  }

  let max_z = z.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = z.iter().map(|&v| (v - max_z).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if sum < 1e-15 {
    vec![1.0 / z.len() as f64; z.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

/// Normalize a non-negative vector to unit sum.
pub fn normalize(w: &[f64]) -> Vec<f64> {
  if w.is_empty() {
    return Vec::new();
  }

  let sum: f64 = w.iter().sum();
  if sum.abs() < 1e-15 {
    vec![1.0 / w.len() as f64; w.len()]
  } else {
    w.iter().map(|&x| x / sum).collect()
  }
}

/// Clip to the unit box and renormalize to unit sum.
///
/// Returns the projected point together with the L1 distance moved, so
/// callers can flag proposals that drifted far from feasibility.
pub fn project(w: &[f64]) -> (Vec<f64>, f64) {
  let clipped: Vec<f64> = w.iter().map(|&x| x.clamp(0.0, 1.0)).collect();
  let projected = normalize(&clipped);
  let drift = w
    .iter()
    .zip(projected.iter())
    .map(|(a, b)| (a - b).abs())
    .sum();

  (projected, drift)
}

/// Draw a feasible point from a symmetric Dirichlet distribution.
pub fn sample_dirichlet<R: Rng + ?Sized>(rng: &mut R, n: usize, alpha: f64) -> Vec<f64> {
  if n == 0 {
    return Vec::new();
  }
  if n == 1 {
    return vec![1.0];
  }

  match Dirichlet::new_with_size(alpha, n) {
    Ok(dist) => dist.sample(rng),
    Err(_) => vec![1.0 / n as f64; n],
  }
}

/// Recover logits that softmax back onto the given simplex point.
///
/// Zero weights are floored so the logits stay finite; softmax of the
/// result reproduces the input up to that floor.
pub fn logits_from_weights(w: &[f64]) -> Vec<f64> {
  w.iter().map(|&x| x.max(1e-12).ln()).collect()
}
