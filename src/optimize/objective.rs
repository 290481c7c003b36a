//! # Objective Functions
//!
//! $$
//! \Omega_\theta=\frac{\int_\theta^\infty (x-\theta)f(x)\,dx}{\int_{-\infty}^\theta (\theta-x)f(x)\,dx}
//! $$
//!
//! Risk-adjusted performance measures mapping simplex weights and a returns
//! matrix to a scalar score.

use ndarray::Array1;
use quadrature::double_exponential;

use crate::data::ReturnsMatrix;
use crate::stats::gaussian_kde::GaussianKde;

/// Bandwidth multiples padding the KDE integration interval.
const KDE_SUPPORT_PAD: f64 = 8.0;
const QUAD_TARGET_ERROR: f64 = 1e-6;

/// Objective measure optimized by the engines.
///
/// Thresholds and risk-free rates are expressed in the same periodicity as
/// the input returns (daily returns take a daily threshold).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Objective {
  /// Mean excess return over the population standard deviation.
  Sharpe { risk_free: f64 },
  /// Empirical gains/losses ratio around a threshold.
  OmegaEmpirical { threshold: f64 },
  /// Density-smoothed Omega ratio around a threshold.
  OmegaKde { threshold: f64 },
}

impl Default for Objective {
  fn default() -> Self {
    Self::Sharpe { risk_free: 0.0 }
  }
}

impl Objective {
  /// Evaluate the measure; callers normalize weights onto the simplex first.
  pub fn evaluate(&self, weights: &[f64], returns: &ReturnsMatrix) -> f64 {
    match *self {
      Self::Sharpe { risk_free } => sharpe(weights, returns, risk_free),
      Self::OmegaEmpirical { threshold } => omega_empirical(weights, returns, threshold),
      Self::OmegaKde { threshold } => omega_kde(weights, returns, threshold),
    }
  }
}

/// Sharpe ratio of the weighted portfolio, `(mean - r_f) / σ` with the
/// population standard deviation.
///
/// A zero-variance portfolio yields a non-finite sentinel for the caller to
/// surface.
pub fn sharpe(weights: &[f64], returns: &ReturnsMatrix, risk_free: f64) -> f64 {
  let rp = returns.portfolio_returns(weights);
  let n = rp.len() as f64;
  let mean = rp.iter().sum::<f64>() / n;
  let var = rp.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
  let std = var.sqrt();

  if std <= 0.0 {
    return f64::NAN;
  }

  (mean - risk_free) / std
}

/// Omega ratio from the empirical gain/loss partition around `threshold`.
///
/// With no observed downside the ratio is positive infinity, a defined
/// value rather than an error.
pub fn omega_empirical(weights: &[f64], returns: &ReturnsMatrix, threshold: f64) -> f64 {
  let rp = returns.portfolio_returns(weights);

  let mut gains = 0.0;
  let mut losses = 0.0;
  for &r in &rp {
    if r > threshold {
      gains += r - threshold;
    } else if r < threshold {
      losses += threshold - r;
    }
  }

  if losses == 0.0 {
    return f64::INFINITY;
  }

  gains / losses
}

/// Omega ratio from a Gaussian KDE of the portfolio returns, integrating
/// `(x-θ)·f̂(x)` over each tail of the padded sample support.
///
/// Strictly more expensive than [`omega_empirical`]; useful when a smoother
/// objective surface helps the surrogate model.
pub fn omega_kde(weights: &[f64], returns: &ReturnsMatrix, threshold: f64) -> f64 {
  let rp = returns.portfolio_returns(weights);
  let kde = GaussianKde::with_silverman_bandwidth(Array1::from(rp));

  let (lo, hi) = kde.support(KDE_SUPPORT_PAD);
  let lo = lo.min(threshold);
  let hi = hi.max(threshold);

  let gains = double_exponential::integrate(
    |x| (x - threshold).max(0.0) * kde.evaluate(x),
    threshold,
    hi,
    QUAD_TARGET_ERROR,
  )
  .integral;
  let losses = double_exponential::integrate(
    |x| (threshold - x).max(0.0) * kde.evaluate(x),
    lo,
    threshold,
    QUAD_TARGET_ERROR,
  )
  .integral;

  if losses <= 0.0 {
    return f64::INFINITY;
  }

  gains / losses
}
