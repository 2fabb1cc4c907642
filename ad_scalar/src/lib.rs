//! # ad_scalar - Reverse-mode Automatic Differentiation over Scalars
//!
//! This crate builds a computation graph of `f64` values as expressions are
//! evaluated, then computes exact derivatives of an output with respect to every
//! leaf that contributed to it with a single backward traversal.
//!
//! ## Quick Start
//!
//! ```
//! use ad_scalar::Graph;
//!
//! let graph = Graph::new();
//!
//! // Tracked inputs (the leaves we differentiate with respect to)
//! let x = graph.var(2.0);
//! let y = graph.var(3.0);
//!
//! // z = x * y + exp(x)
//! let z = &x * &y + x.exp();
//! assert!((z.value() - (6.0 + 2.0_f64.exp())).abs() < 1e-10);
//!
//! // Derivatives land on the leaves
//! z.backward().unwrap();
//! assert!((x.derivative().unwrap() - (3.0 + 2.0_f64.exp())).abs() < 1e-10);
//! assert_eq!(y.derivative(), Some(2.0));
//! ```
//!
//! ## Supported Operations
//!
//! | Category | Operations |
//! |----------|------------|
//! | Arithmetic | `+`, `-`, `*`, `/`, unary `-`, [`Scalar::inv`] |
//! | Transcendental | [`Scalar::exp`], [`Scalar::log`] |
//! | Activation | [`Scalar::sigmoid`], [`Scalar::relu`] |
//! | Comparison | [`Scalar::less_than`], [`Scalar::greater_than`], [`Scalar::equal_to`] |
//!
//! Subtraction and division are composed from `Add`/`Neg` and `Mul`/`Inv`. New
//! primitives implement [`ScalarFunction`] and are applied with [`Graph::apply`].
//!
//! ## Architecture
//!
//! - **[`Graph`]**: Id generator shared by the nodes built together.
//! - **[`Scalar`]**: Reference-counted node: value, [`History`], derivative slot. Cloning is O(1).
//! - **[`Context`]**: Values a forward pass saves for its backward pass.
//! - **[`topological_sort`] / [`backpropagate`]**: The graph algorithms.
//! - **[`central_difference`] / [`derivative_check`]**: Numerical oracle for validating gradients.
//!
//! ## Leaves and constants
//!
//! ```
//! use ad_scalar::{ops, Graph};
//!
//! let graph = Graph::new();
//! let x = graph.var(4.0);          // tracked leaf
//! let c = graph.constant(10.0);    // detached: never visited, never gets a derivative
//!
//! // Bare numbers passed to `apply` become tracked leaves
//! let y = graph.apply(&ops::Mul, [x.clone().into(), 0.5.into()]).unwrap();
//! let z = &y + &c;
//!
//! z.backward().unwrap();
//! assert_eq!(x.derivative(), Some(0.5));
//! assert_eq!(y.parents()[1].derivative(), Some(4.0));
//! assert_eq!(c.derivative(), None);
//! assert_eq!(y.derivative(), None); // intermediates keep nothing
//! ```

mod backward;
mod context;
mod error;
mod finite_diff;
mod function;
mod gradcheck;
mod node;
pub mod operators;
pub mod ops;

pub use backward::{backpropagate, topological_sort};
pub use context::Context;
pub use error::{AutodiffError, Result};
pub use finite_diff::{central_difference, finite_diff_grad, max_grad_error, DEFAULT_EPSILON};
pub use function::{Derivatives, ScalarFunction, ScalarLike};
pub use gradcheck::{derivative_check, GradCheckConfig, GradCheckReport};
pub use node::{Graph, History, NodeId, Scalar};
