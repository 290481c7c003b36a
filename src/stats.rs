//! # Stats
//!
//! $$
//! \hat f_h(x)=\frac{1}{nh}\sum_{i=1}^n K\!\left(\frac{x-X_i}{h}\right)
//! $$
//!
//! Density estimation utilities backing the smoothed objective variants.

pub mod gaussian_kde;

pub use gaussian_kde::silverman_bandwidth;
pub use gaussian_kde::GaussianKde;
