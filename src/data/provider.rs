//! # Returns Providers
//!
//! $$
//! \text{ticker}\times\text{lookback}\to(r_1,\dots,r_T)
//! $$
//!
//! Trait boundary to the market-data collaborator supplying historical
//! periodic returns.

use std::collections::HashMap;

use anyhow::Result;
use thiserror::Error;

use super::returns::ReturnsMatrix;

/// Errors surfaced by returns providers.
#[derive(Debug, Error)]
pub enum ProviderError {
  /// Upstream source unreachable or returned a non-success status.
  #[error("market data unavailable for {ticker}: {reason}")]
  DataUnavailable { ticker: String, reason: String },
  /// No access credential configured for a credentialed backend.
  #[error("missing credential: {0}")]
  MissingCredential(String),
}

/// Source of historical per-asset periodic returns.
pub trait ReturnsProvider {
  /// Fetch up to `lookback` periodic returns for a ticker, oldest first.
  fn fetch_returns(&self, ticker: &str, lookback: usize) -> Result<Vec<f64>, ProviderError>;
}

/// Provider backed by preloaded return series, keyed by ticker.
#[derive(Clone, Debug, Default)]
pub struct InMemoryProvider {
  series: HashMap<String, Vec<f64>>,
}

impl InMemoryProvider {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a return series under a ticker.
  pub fn insert(&mut self, ticker: &str, returns: Vec<f64>) {
    self.series.insert(ticker.to_string(), returns);
  }
}

impl ReturnsProvider for InMemoryProvider {
  fn fetch_returns(&self, ticker: &str, lookback: usize) -> Result<Vec<f64>, ProviderError> {
    let series = self
      .series
      .get(ticker)
      .ok_or_else(|| ProviderError::DataUnavailable {
        ticker: ticker.to_string(),
        reason: "ticker not loaded".to_string(),
      })?;

    let tail = series.len().saturating_sub(lookback);
    Ok(series[tail..].to_vec())
  }
}

/// Assemble an aligned returns matrix by fetching every ticker from one
/// provider. Any provider failure aborts the whole request.
pub fn fetch_returns_matrix<P: ReturnsProvider>(
  provider: &P,
  tickers: &[&str],
  lookback: usize,
) -> Result<ReturnsMatrix> {
  let mut all = Vec::with_capacity(tickers.len());
  for ticker in tickers {
    all.push(provider.fetch_returns(ticker, lookback)?);
  }

  let aligned = super::returns::align_return_series(&all);
  Ok(ReturnsMatrix::new(aligned)?)
}
