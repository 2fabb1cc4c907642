//! Finite difference utilities for gradient verification.
//!
//! These work on plain `f64` functions and share nothing with the graph, so
//! they can serve as an independent check on backpropagation.

use crate::error::{AutodiffError, Result};

/// Step size used when callers have no better choice.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Approximate the derivative of `f` with respect to argument `arg` using the
/// central difference `(f(x + eps) - f(x - eps)) / (2 * eps)`.
///
/// # Example
/// ```
/// use ad_scalar::central_difference;
///
/// // f(x, y) = x * y, df/dy = x
/// let f = |v: &[f64]| v[0] * v[1];
/// let d = central_difference(f, &[3.0, 4.0], 1, 1e-6).unwrap();
/// assert!((d - 3.0).abs() < 1e-6);
/// ```
pub fn central_difference<F>(f: F, vals: &[f64], arg: usize, epsilon: f64) -> Result<f64>
where
    F: Fn(&[f64]) -> f64,
{
    if arg >= vals.len() {
        return Err(AutodiffError::ArgumentOutOfRange {
            arg,
            len: vals.len(),
        });
    }

    let mut perturbed = vals.to_vec();

    perturbed[arg] = vals[arg] + epsilon;
    let f_plus = f(&perturbed);

    perturbed[arg] = vals[arg] - epsilon;
    let f_minus = f(&perturbed);

    Ok((f_plus - f_minus) / (2.0 * epsilon))
}

/// Compute every partial derivative of `f` at `point` by central differences.
///
/// The result has exactly one entry per coordinate of `point`.
///
/// # Example
/// ```
/// use ad_scalar::finite_diff_grad;
///
/// // f(x, y) = x^2 + y^2
/// // df/dx = 2x, df/dy = 2y
/// let f = |v: &[f64]| v[0] * v[0] + v[1] * v[1];
/// let grads = finite_diff_grad(f, &[3.0, 4.0], 1e-7).unwrap();
///
/// assert!((grads[0] - 6.0).abs() < 1e-5); // df/dx at x=3
/// assert!((grads[1] - 8.0).abs() < 1e-5); // df/dy at y=4
/// ```
pub fn finite_diff_grad<F>(f: F, point: &[f64], eps: f64) -> Result<Vec<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    (0..point.len())
        .map(|i| central_difference(&f, point, i, eps))
        .collect()
}

/// Compute the maximum absolute difference between two gradient vectors.
pub fn max_grad_error(grad1: &[f64], grad2: &[f64]) -> f64 {
    assert_eq!(grad1.len(), grad2.len());
    grad1
        .iter()
        .zip(grad2.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}
