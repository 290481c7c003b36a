//! # Gaussian Kernel Density Estimation
//!
//! $$
//! \hat f_h(x)=\frac{1}{nh}\sum_{i=1}^n \phi\!\left(\frac{x-X_i}{h}\right)
//! $$
//!
//! Smooths a 1D return sample into a continuous density, used by the
//! density-based Omega ratio.

use std::f64::consts::PI;

use ndarray::Array1;

/// Gaussian kernel density estimate over a 1D sample.
#[derive(Clone, Debug)]
pub struct GaussianKde {
  data: Array1<f64>,
  bandwidth: f64,
}

impl GaussianKde {
  /// Build an estimator with an explicit bandwidth.
  pub fn new(data: Array1<f64>, bandwidth: f64) -> Self {
    Self { data, bandwidth }
  }

  /// Build an estimator with the bandwidth chosen by Silverman's rule of
  /// thumb, `h = 0.9 · min(σ, IQR/1.34) · n^{-1/5}`.
  pub fn with_silverman_bandwidth(data: Array1<f64>) -> Self {
    let bandwidth = silverman_bandwidth(&data);
    Self { data, bandwidth }
  }

  pub fn bandwidth(&self) -> f64 {
    self.bandwidth
  }

  /// Density estimate at a single point.
  pub fn evaluate(&self, x: f64) -> f64 {
    if self.data.is_empty() {
      return 0.0;
    }

    let norm = 1.0 / (self.data.len() as f64 * self.bandwidth * (2.0 * PI).sqrt());
    let sum: f64 = self
      .data
      .iter()
      .map(|&xi| {
        let u = (x - xi) / self.bandwidth;
        (-0.5 * u * u).exp()
      })
      .sum();

    sum * norm
  }

  /// Density estimates at each point of an array.
  pub fn evaluate_array(&self, xs: &Array1<f64>) -> Array1<f64> {
    xs.mapv(|x| self.evaluate(x))
  }

  /// Interval carrying all but a negligible tail of the estimated mass:
  /// the sample range padded by `pad` bandwidths on each side.
  pub fn support(&self, pad: f64) -> (f64, f64) {
    let lo = self.data.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = self.data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    (lo - pad * self.bandwidth, hi + pad * self.bandwidth)
  }
}

/// Bandwidth by Silverman's rule of thumb for 1D data.
pub fn silverman_bandwidth(data: &Array1<f64>) -> f64 {
  let n = data.len() as f64;
  if n < 2.0 {
    return 1e-6;
  }

  let mean = data.mean().unwrap_or(0.0);
  let std = (data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();

  let mut sorted = data.to_vec();
  sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
  let iqr = percentile(&sorted, 75.0) - percentile(&sorted, 25.0);

  let scale = std.min(iqr / 1.34);
  let h = 0.9 * scale * n.powf(-0.2);

  h.max(1e-8)
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
  if sorted.is_empty() {
    return 0.0;
  }

  let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() as f64 - 1.0);
  let lower = rank.floor() as usize;
  let upper = rank.ceil() as usize;

  if lower == upper {
    sorted[lower]
  } else {
    let weight = rank - lower as f64;
    sorted[lower] + weight * (sorted[upper] - sorted[lower])
  }
}
