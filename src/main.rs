use anyhow::anyhow;
use anyhow::Result;
use ndarray::Array1;
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

use portopt_rs::data::summarize;
use portopt_rs::data::ReturnsMatrix;
use portopt_rs::optimize::annualize_sharpe;
use portopt_rs::optimize::bayesian_optimize;
use portopt_rs::optimize::gradient_optimize;
use portopt_rs::optimize::BayesConfig;
use portopt_rs::optimize::GradientConfig;
use portopt_rs::optimize::Objective;

/// Crypto-style period convention: markets trade every day.
const TRADING_DAYS: f64 = 365.0;

fn main() -> Result<()> {
  // Synthetic two-asset universe; asset 0 dominates in mean/variance.
  let mut rng = StdRng::seed_from_u64(42);
  let strong = Array1::random_using(1000, Normal::new(0.0008, 0.01)?, &mut rng);
  let weak = Array1::random_using(1000, Normal::new(0.0002, 0.02)?, &mut rng);
  let returns = ReturnsMatrix::new(vec![strong.to_vec(), weak.to_vec()])?;

  for (i, series) in returns.series().iter().enumerate() {
    let summary = summarize(series, TRADING_DAYS);
    println!(
      "asset {}: mean {:.5}, std {:.5}, cagr {:.2}%",
      i,
      summary.mean,
      summary.std_dev,
      summary.annualized_geometric * 100.0
    );
  }

  let config = BayesConfig {
    objective: Objective::OmegaEmpirical { threshold: 0.0 },
    iterations: 20,
    seed: Some(42),
    ..BayesConfig::default()
  };
  let trace = bayesian_optimize(&returns, &config)?;
  let best = trace.best().ok_or_else(|| anyhow!("empty trace"))?;
  println!(
    "\nbayesian ({} evaluations): weights {:?}, omega {:.4}",
    trace.len(),
    best.weights,
    best.score
  );

  let result = gradient_optimize(&returns, &GradientConfig::default())?;
  println!(
    "gradient ({} iterations): weights {:?}, sharpe {:.4} daily / {:.4} annualized",
    result.iterations,
    result.weights,
    result.sharpe,
    annualize_sharpe(result.sharpe, TRADING_DAYS)
  );

  Ok(())
}
