//! # Return Series
//!
//! $$
//! r_t=\frac{P_t-P_{t-1}}{P_{t-1}}
//! $$
//!
//! Aligned per-asset return series and price-to-return conversion helpers.

use impl_new_derive::ImplNew;

use crate::optimize::OptimizeError;

/// Aligned per-asset periodic returns, immutable once constructed.
///
/// Every series shares the same length and contains only finite values;
/// both invariants are checked at construction.
#[derive(Clone, Debug)]
pub struct ReturnsMatrix {
  series: Vec<Vec<f64>>,
}

impl ReturnsMatrix {
  /// Validate and take ownership of aligned return series.
  pub fn new(series: Vec<Vec<f64>>) -> Result<Self, OptimizeError> {
    if series.is_empty() {
      return Err(OptimizeError::InvalidInput(
        "returns matrix needs at least one asset".to_string(),
      ));
    }

    let t = series[0].len();
    if t == 0 {
      return Err(OptimizeError::InvalidInput(
        "return series are empty".to_string(),
      ));
    }

    for (i, s) in series.iter().enumerate() {
      if s.len() != t {
        return Err(OptimizeError::InvalidInput(format!(
          "asset {} has {} periods, expected {}",
          i,
          s.len(),
          t
        )));
      }
      if s.iter().any(|r| !r.is_finite()) {
        return Err(OptimizeError::InvalidInput(format!(
          "asset {} contains non-finite returns",
          i
        )));
      }
    }

    Ok(Self { series })
  }

  /// Build from per-asset close-price series, converting to percentage
  /// returns and aligning every series to the common tail length.
  pub fn from_close_prices(closes: &[Vec<f64>]) -> Result<Self, OptimizeError> {
    let returns: Vec<Vec<f64>> = closes.iter().map(|c| pct_returns_series(c)).collect();
    Self::new(align_return_series(&returns))
  }

  pub fn n_assets(&self) -> usize {
    self.series.len()
  }

  pub fn n_periods(&self) -> usize {
    self.series[0].len()
  }

  pub fn series(&self) -> &[Vec<f64>] {
    &self.series
  }

  /// Return series of one asset.
  pub fn asset(&self, i: usize) -> &[f64] {
    &self.series[i]
  }

  /// Weighted per-period portfolio returns, `r_p(t) = Σ_i w_i · r_i(t)`.
  pub fn portfolio_returns(&self, weights: &[f64]) -> Vec<f64> {
    (0..self.n_periods())
      .map(|t| {
        weights
          .iter()
          .zip(self.series.iter())
          .map(|(&w, s)| w * s[t])
          .sum()
      })
      .collect()
  }
}

/// Convert close prices to simple percentage returns.
pub fn pct_returns_series(closes: &[f64]) -> Vec<f64> {
  let mut out = Vec::with_capacity(closes.len().saturating_sub(1));
  for i in 1..closes.len() {
    if closes[i - 1] > 0.0 {
      out.push((closes[i] - closes[i - 1]) / closes[i - 1]);
    }
  }
  out
}

/// Convert close prices to log returns.
pub fn log_returns_series(closes: &[f64]) -> Vec<f64> {
  let mut out = Vec::with_capacity(closes.len().saturating_sub(1));
  for i in 1..closes.len() {
    if closes[i - 1] > 0.0 && closes[i] > 0.0 {
      out.push((closes[i] / closes[i - 1]).ln());
    }
  }
  out
}

/// Align multiple return series to their common tail length.
pub fn align_return_series(all_returns: &[Vec<f64>]) -> Vec<Vec<f64>> {
  let min_len = all_returns.iter().map(|r| r.len()).min().unwrap_or(0);
  all_returns
    .iter()
    .map(|r| r[r.len().saturating_sub(min_len)..].to_vec())
    .collect()
}

/// Location and dispersion summary of one return series.
#[derive(ImplNew, Clone, Copy, Debug)]
pub struct ReturnsSummary {
  /// Arithmetic mean periodic return.
  pub mean: f64,
  /// Population standard deviation of periodic returns.
  pub std_dev: f64,
  /// Geometric mean return compounded to one year.
  pub annualized_geometric: f64,
}

/// Summarize a return series under an explicit period convention.
pub fn summarize(returns: &[f64], periods_per_year: f64) -> ReturnsSummary {
  if returns.is_empty() {
    return ReturnsSummary::new(0.0, 0.0, 0.0);
  }

  let n = returns.len() as f64;
  let mean = returns.iter().sum::<f64>() / n;
  let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;

  let cumulative: f64 = returns.iter().map(|r| 1.0 + r).product();
  let annualized_geometric = if cumulative > 0.0 {
    cumulative.powf(periods_per_year / n) - 1.0
  } else {
    -1.0
  };

  ReturnsSummary::new(mean, var.sqrt(), annualized_geometric)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn rejects_ragged_series() {
    let result = ReturnsMatrix::new(vec![vec![0.01, 0.02], vec![0.03]]);
    assert!(result.is_err());
  }

  #[test]
  fn rejects_non_finite_returns() {
    let result = ReturnsMatrix::new(vec![vec![0.01, f64::NAN]]);
    assert!(result.is_err());
  }

  #[test]
  fn portfolio_returns_are_weighted_sums() {
    let returns = ReturnsMatrix::new(vec![vec![0.02, -0.01], vec![0.04, 0.03]]).unwrap();
    let rp = returns.portfolio_returns(&[0.5, 0.5]);

    assert_abs_diff_eq!(rp[0], 0.03, epsilon = 1e-12);
    assert_abs_diff_eq!(rp[1], 0.01, epsilon = 1e-12);
  }

  #[test]
  fn pct_returns_from_prices() {
    let rets = pct_returns_series(&[100.0, 110.0, 99.0]);

    assert_eq!(rets.len(), 2);
    assert_relative_eq!(rets[0], 0.1, epsilon = 1e-12);
    assert_relative_eq!(rets[1], -0.1, epsilon = 1e-12);
  }

  #[test]
  fn from_close_prices_aligns_to_common_tail() {
    let returns =
      ReturnsMatrix::from_close_prices(&[vec![1.0, 1.1, 1.2, 1.3], vec![2.0, 2.1, 2.2]]).unwrap();

    assert_eq!(returns.n_assets(), 2);
    assert_eq!(returns.n_periods(), 2);
  }

  #[test]
  fn summary_matches_hand_computation() {
    let summary = summarize(&[0.1, -0.1], 2.0);

    assert_abs_diff_eq!(summary.mean, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(summary.std_dev, 0.1, epsilon = 1e-12);
    // (1.1 * 0.9)^(2/2) - 1 = -0.01
    assert_relative_eq!(summary.annualized_geometric, -0.01, epsilon = 1e-12);
  }
}
