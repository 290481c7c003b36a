//! # portopt-rs
//!
//! Bayesian and gradient-based portfolio weight optimization over
//! historical asset return series.
//!
//! ## Modules
//!
//! | Module       | Description                                                                 |
//! |--------------|-----------------------------------------------------------------------------|
//! | [`data`]     | Returns-provider boundary and aligned per-asset return series.              |
//! | [`optimize`] | Objectives, GP surrogate, acquisition, Bayesian loop, and gradient ascent.  |
//! | [`stats`]    | Gaussian kernel density estimation for the smoothed Omega objective.        |
//!
//! ## Example Usage
//!
//! ```rust
//! use portopt_rs::data::ReturnsMatrix;
//! use portopt_rs::optimize::{bayesian_optimize, BayesConfig};
//!
//! let returns = ReturnsMatrix::new(vec![
//!   vec![0.012, -0.005, 0.008, 0.001],
//!   vec![0.004, 0.006, -0.002, 0.003],
//! ])
//! .unwrap();
//!
//! let trace = bayesian_optimize(&returns, &BayesConfig::default()).unwrap();
//! let best = trace.best().unwrap();
//! println!("weights {:?} score {}", best.weights, best.score);
//! ```
//!
//! ## Features
//!
//! - `yahoo`: enables a Yahoo Finance-backed returns provider.

pub mod data;
pub mod optimize;
pub mod stats;
