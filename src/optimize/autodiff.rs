//! # Forward-Mode Automatic Differentiation
//!
//! $$
//! f(x+\varepsilon v)=f(x)+\varepsilon\,\nabla f(x)^\top v
//! $$
//!
//! Dual-number scalars carrying a full gradient vector, sized for the small
//! logit dimensions the gradient optimizer works in.

use std::ops::Add;
use std::ops::Div;
use std::ops::Mul;
use std::ops::Neg;
use std::ops::Sub;

/// Scalar value together with its partial derivatives.
#[derive(Clone, Debug)]
pub struct Dual {
  pub val: f64,
  pub grad: Vec<f64>,
}

impl Dual {
  /// Constant with a zero gradient of dimension `n`.
  pub fn constant(val: f64, n: usize) -> Self {
    Self {
      val,
      grad: vec![0.0; n],
    }
  }

  /// Independent variable seeded at coordinate `idx` of `n`.
  pub fn variable(val: f64, idx: usize, n: usize) -> Self {
    let mut grad = vec![0.0; n];
    grad[idx] = 1.0;
    Self { val, grad }
  }

  pub fn exp(&self) -> Self {
    let e = self.val.exp();
    Self {
      val: e,
      grad: self.grad.iter().map(|&g| e * g).collect(),
    }
  }

  pub fn sqrt(&self) -> Self {
    let s = self.val.sqrt();
    let scale = 0.5 / s;
    Self {
      val: s,
      grad: self.grad.iter().map(|&g| scale * g).collect(),
    }
  }

  pub fn powi(&self, exp: i32) -> Self {
    let scale = exp as f64 * self.val.powi(exp - 1);
    Self {
      val: self.val.powi(exp),
      grad: self.grad.iter().map(|&g| scale * g).collect(),
    }
  }

  /// True when the value and every partial are finite.
  pub fn is_finite(&self) -> bool {
    self.val.is_finite() && self.grad.iter().all(|g| g.is_finite())
  }
}

impl Add for &Dual {
  type Output = Dual;

  fn add(self, rhs: &Dual) -> Dual {
    Dual {
      val: self.val + rhs.val,
      grad: self
        .grad
        .iter()
        .zip(rhs.grad.iter())
        .map(|(a, b)| a + b)
        .collect(),
    }
  }
}

impl Sub for &Dual {
  type Output = Dual;

  fn sub(self, rhs: &Dual) -> Dual {
    Dual {
      val: self.val - rhs.val,
      grad: self
        .grad
        .iter()
        .zip(rhs.grad.iter())
        .map(|(a, b)| a - b)
        .collect(),
    }
  }
}

impl Mul for &Dual {
  type Output = Dual;

  fn mul(self, rhs: &Dual) -> Dual {
    Dual {
      val: self.val * rhs.val,
      grad: self
        .grad
        .iter()
        .zip(rhs.grad.iter())
        .map(|(a, b)| a * rhs.val + b * self.val)
        .collect(),
    }
  }
}

impl Div for &Dual {
  type Output = Dual;

  fn div(self, rhs: &Dual) -> Dual {
    let denom = rhs.val * rhs.val;
    Dual {
      val: self.val / rhs.val,
      grad: self
        .grad
        .iter()
        .zip(rhs.grad.iter())
        .map(|(a, b)| (a * rhs.val - b * self.val) / denom)
        .collect(),
    }
  }
}

impl Neg for &Dual {
  type Output = Dual;

  fn neg(self) -> Dual {
    Dual {
      val: -self.val,
      grad: self.grad.iter().map(|&g| -g).collect(),
    }
  }
}

impl Add<f64> for &Dual {
  type Output = Dual;

  fn add(self, rhs: f64) -> Dual {
    Dual {
      val: self.val + rhs,
      grad: self.grad.clone(),
    }
  }
}

impl Sub<f64> for &Dual {
  type Output = Dual;

  fn sub(self, rhs: f64) -> Dual {
    Dual {
      val: self.val - rhs,
      grad: self.grad.clone(),
    }
  }
}

impl Mul<f64> for &Dual {
  type Output = Dual;

  fn mul(self, rhs: f64) -> Dual {
    Dual {
      val: self.val * rhs,
      grad: self.grad.iter().map(|&g| g * rhs).collect(),
    }
  }
}

impl Div<f64> for &Dual {
  type Output = Dual;

  fn div(self, rhs: f64) -> Dual {
    Dual {
      val: self.val / rhs,
      grad: self.grad.iter().map(|&g| g / rhs).collect(),
    }
  }
}

/// Softmax over dual logits.
///
/// The value shift is a constant under softmax's shift invariance, so the
/// propagated partials match the unshifted gradient.
pub fn softmax(z: &[Dual]) -> Vec<Dual> {
  let max_z = z.iter().map(|d| d.val).fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<Dual> = z.iter().map(|d| (d - max_z).exp()).collect();
  let sum = sum(&exps);
  exps.iter().map(|e| e / &sum).collect()
}

/// Sum of dual samples.
pub fn sum(xs: &[Dual]) -> Dual {
  let n = xs.first().map(|d| d.grad.len()).unwrap_or(0);
  xs.iter().fold(Dual::constant(0.0, n), |acc, x| &acc + x)
}

/// Arithmetic mean of dual samples.
pub fn mean(xs: &[Dual]) -> Dual {
  &sum(xs) / xs.len() as f64
}

/// Population standard deviation of dual samples.
pub fn std_pop(xs: &[Dual]) -> Dual {
  let m = mean(xs);
  let sq: Vec<Dual> = xs.iter().map(|x| (x - &m).powi(2)).collect();
  mean(&sq).sqrt()
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn product_rule_matches_hand_derivative() {
    // f(x1, x2) = x1 * x2 + x1^2 at (3, 5): df/dx1 = x2 + 2*x1, df/dx2 = x1
    let x1 = Dual::variable(3.0, 0, 2);
    let x2 = Dual::variable(5.0, 1, 2);
    let f = &(&x1 * &x2) + &x1.powi(2);

    assert_relative_eq!(f.val, 24.0, epsilon = 1e-12);
    assert_relative_eq!(f.grad[0], 11.0, epsilon = 1e-12);
    assert_relative_eq!(f.grad[1], 3.0, epsilon = 1e-12);
  }

  #[test]
  fn reciprocal_sqrt_matches_hand_derivative() {
    // f(x1, x2) = x1 / sqrt(x2) at (1, 25): df/dx2 = -x1 / (2 * x2^(3/2))
    let x1 = Dual::variable(1.0, 0, 2);
    let x2 = Dual::variable(25.0, 1, 2);
    let f = &x1 / &x2.sqrt();

    assert_relative_eq!(f.val, 0.2, epsilon = 1e-12);
    assert_relative_eq!(f.grad[0], 0.2, epsilon = 1e-12);
    assert_relative_eq!(f.grad[1], -1.0 / 250.0, epsilon = 1e-12);
  }

  #[test]
  fn softmax_gradient_matches_jacobian() {
    // d softmax_0 / dz_0 = s0 * (1 - s0), d softmax_0 / dz_1 = -s0 * s1
    let z = vec![Dual::variable(0.2, 0, 2), Dual::variable(-0.4, 1, 2)];
    let s = softmax(&z);
    let s0 = s[0].val;
    let s1 = s[1].val;

    assert_relative_eq!(s0 + s1, 1.0, epsilon = 1e-12);
    assert_relative_eq!(s[0].grad[0], s0 * (1.0 - s0), epsilon = 1e-12);
    assert_relative_eq!(s[0].grad[1], -s0 * s1, epsilon = 1e-12);
  }

  #[test]
  fn std_pop_of_constant_series_is_zero() {
    let xs = vec![Dual::constant(0.01, 2); 4];
    assert_eq!(std_pop(&xs).val, 0.0);
  }

  #[test]
  fn mean_and_std_match_scalar_formulas() {
    let xs: Vec<Dual> = [1.0, 2.0, 3.0, 4.0]
      .iter()
      .map(|&v| Dual::constant(v, 1))
      .collect();

    assert_relative_eq!(mean(&xs).val, 2.5, epsilon = 1e-12);
    assert_relative_eq!(std_pop(&xs).val, (1.25_f64).sqrt(), epsilon = 1e-12);
  }
}
