//! Gradient checking utilities
//!
//! Compares the derivatives produced by backpropagation with central
//! differences of the same expression evaluated on plain numbers.
//!
//! # Example
//!
//! ```
//! use ad_scalar::{derivative_check, GradCheckConfig, Graph, Scalar};
//!
//! // f(x, y) = x * exp(y)
//! let f = |_graph: &Graph, v: &[Scalar]| &v[0] * v[1].exp();
//!
//! let report = derivative_check(f, &[1.5, -0.5], &GradCheckConfig::default()).unwrap();
//! assert!(report.max_abs_error < 1e-4);
//! ```

use log::debug;

use crate::error::{AutodiffError, Result};
use crate::finite_diff::{central_difference, DEFAULT_EPSILON};
use crate::node::{Graph, Scalar};

/// Gradient checking configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GradCheckConfig {
    /// Step size for central differences (default: 1e-6)
    pub epsilon: f64,

    /// Absolute tolerance (default: 1e-2)
    pub atol: f64,

    /// Relative tolerance, scaled by the numerical derivative (default: 1e-2)
    pub rtol: f64,
}

impl Default for GradCheckConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            atol: 1e-2,
            rtol: 1e-2,
        }
    }
}

impl GradCheckConfig {
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    pub fn with_rtol(mut self, rtol: f64) -> Self {
        self.rtol = rtol;
        self
    }

    /// Whether `analytic` is close enough to `numeric`.
    pub fn accepts(&self, analytic: f64, numeric: f64) -> bool {
        (analytic - numeric).abs() <= self.atol + self.rtol * numeric.abs()
    }
}

/// Result of gradient checking
#[derive(Debug, Clone, PartialEq)]
pub struct GradCheckReport {
    /// f evaluated at the input point
    pub value: f64,

    /// Derivatives from backpropagation, one per input
    pub analytic: Vec<f64>,

    /// Derivatives from central differences, one per input
    pub numeric: Vec<f64>,

    /// Largest |analytic - numeric| over all inputs
    pub max_abs_error: f64,
}

/// Check backpropagated derivatives of `f` at `inputs` against central differences.
///
/// `f` receives the graph and one tracked leaf per input and returns the output
/// node. It is called once with seed 1.0 backpropagation and twice more per
/// input for the numerical estimate. An input whose leaf receives no
/// derivative (it does not influence the output) counts as 0.0.
pub fn derivative_check<F>(f: F, inputs: &[f64], config: &GradCheckConfig) -> Result<GradCheckReport>
where
    F: Fn(&Graph, &[Scalar]) -> Scalar,
{
    let graph = Graph::new();
    let leaves: Vec<Scalar> = inputs.iter().map(|&v| graph.var(v)).collect();
    let out = f(&graph, &leaves);
    out.backward()?;

    let analytic: Vec<f64> = leaves
        .iter()
        .map(|leaf| leaf.derivative().unwrap_or(0.0))
        .collect();

    let numeric_f = |vals: &[f64]| {
        let graph = Graph::new();
        let leaves: Vec<Scalar> = vals.iter().map(|&v| graph.var(v)).collect();
        f(&graph, &leaves).value()
    };

    let mut numeric = Vec::with_capacity(inputs.len());
    for (arg, &a) in analytic.iter().enumerate() {
        let n = central_difference(&numeric_f, inputs, arg, config.epsilon)?;
        if !config.accepts(a, n) {
            debug!("derivative check failed on argument {}: analytic={} numeric={}", arg, a, n);
            return Err(AutodiffError::GradientMismatch {
                arg,
                analytic: a,
                numeric: n,
            });
        }
        numeric.push(n);
    }

    let max_abs_error = analytic
        .iter()
        .zip(&numeric)
        .map(|(a, n)| (a - n).abs())
        .fold(0.0, f64::max);

    Ok(GradCheckReport {
        value: out.value(),
        analytic,
        numeric,
        max_abs_error,
    })
}
