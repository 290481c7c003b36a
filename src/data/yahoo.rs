//! # Yahoo Finance Provider
//!
//! $$
//! P_{t}\to r_t
//! $$
//!
//! Daily-close returns fetched from Yahoo Finance. Enabled with the `yahoo`
//! feature; the connector needs no credential.

use time::Duration;
use time::OffsetDateTime;
use yahoo_finance_api::YahooConnector;

use super::provider::ProviderError;
use super::provider::ReturnsProvider;
use super::returns::pct_returns_series;

/// Returns provider backed by the Yahoo Finance chart API.
pub struct YahooProvider {
  connector: YahooConnector,
}

impl YahooProvider {
  pub fn new() -> Result<Self, ProviderError> {
    let connector = YahooConnector::new().map_err(|e| ProviderError::DataUnavailable {
      ticker: String::new(),
      reason: e.to_string(),
    })?;

    Ok(Self { connector })
  }
}

impl ReturnsProvider for YahooProvider {
  fn fetch_returns(&self, ticker: &str, lookback: usize) -> Result<Vec<f64>, ProviderError> {
    let unavailable = |reason: String| ProviderError::DataUnavailable {
      ticker: ticker.to_string(),
      reason,
    };

    let end = OffsetDateTime::now_utc();
    // Calendar padding over trading days so enough closes come back.
    let start = end - Duration::days(lookback as i64 * 2 + 7);

    let response = tokio_test::block_on(self.connector.get_quote_history(ticker, start, end))
      .map_err(|e| unavailable(e.to_string()))?;
    let quotes = response.quotes().map_err(|e| unavailable(e.to_string()))?;

    let closes: Vec<f64> = quotes.iter().map(|q| q.close).collect();
    let mut returns = pct_returns_series(&closes);
    if returns.is_empty() {
      return Err(unavailable("no closes returned".to_string()));
    }

    let tail = returns.len().saturating_sub(lookback);
    returns.drain(..tail);
    Ok(returns)
  }
}
