//! Error type shared by graph construction, backpropagation and gradient checking.

use thiserror::Error;

use crate::node::NodeId;

/// Errors reported by the autodiff engine.
///
/// Numerical anomalies (division by zero, log of a non-positive number) are not
/// errors: they flow through the graph as IEEE values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AutodiffError {
    /// An operation was applied to the wrong number of inputs.
    #[error("{op} expects {expected} input(s), got {actual}")]
    ArityMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An operation's backward pass returned one derivative per input too few or too many.
    #[error("{op} backward returned {actual} derivative(s) for {expected} input(s)")]
    DerivativeCountMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Backward read a different number of saved values than forward stored.
    #[error("expected {expected} saved value(s), found {actual}")]
    MissingSavedValues { expected: usize, actual: usize },

    /// Derivatives are only stored on leaves.
    #[error("node {0} is not a leaf and cannot accumulate a derivative")]
    NotALeaf(NodeId),

    /// Finite differences were requested for an argument that does not exist.
    #[error("argument index {arg} out of range for {len} value(s)")]
    ArgumentOutOfRange { arg: usize, len: usize },

    /// Analytic and numerical derivatives disagree beyond tolerance.
    #[error("derivative mismatch on argument {arg}: analytic={analytic}, numeric={numeric}")]
    GradientMismatch {
        arg: usize,
        analytic: f64,
        numeric: f64,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AutodiffError>;
