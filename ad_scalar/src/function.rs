//! Operation dispatch: the [`ScalarFunction`] contract and [`Graph::apply`].
//!
//! An operation is a pair of pure functions. `forward` maps raw `f64` inputs to
//! an `f64` result and may stash values in the [`Context`]; `backward` maps the
//! upstream derivative to one local derivative per input using only that context.
//! `apply` is the only place nodes with history are created.

use std::fmt;

use log::trace;
use smallvec::SmallVec;

use crate::context::Context;
use crate::error::{AutodiffError, Result};
use crate::node::{Graph, History, Scalar};

/// A differentiable primitive over scalars.
///
/// Implementations are stateless unit structs; the engine keeps a
/// `&'static dyn ScalarFunction` in each node's history to dispatch backward.
///
/// ```
/// use ad_scalar::{AutodiffError, Context, Derivatives, Graph, ScalarFunction};
///
/// /// f(x) = x^2
/// #[derive(Debug)]
/// struct Square;
///
/// impl ScalarFunction for Square {
///     fn name(&self) -> &'static str { "Square" }
///     fn arity(&self) -> usize { 1 }
///     fn forward(&self, ctx: &mut Context, inputs: &[f64]) -> f64 {
///         ctx.save_for_backward(&[inputs[0]]);
///         inputs[0] * inputs[0]
///     }
///     fn backward(&self, ctx: &Context, d_output: f64) -> Result<Derivatives, AutodiffError> {
///         let [a] = ctx.saved()?;
///         Ok((2.0 * a * d_output).into())
///     }
/// }
///
/// let graph = Graph::new();
/// let x = graph.var(3.0);
/// let y = graph.apply(&Square, [x.clone().into()]).unwrap();
/// y.backward().unwrap();
/// assert_eq!(y.value(), 9.0);
/// assert_eq!(x.derivative(), Some(6.0));
/// ```
pub trait ScalarFunction: fmt::Debug + 'static {
    /// Name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Number of positional inputs.
    fn arity(&self) -> usize;

    /// Compute the result from raw input values.
    fn forward(&self, ctx: &mut Context, inputs: &[f64]) -> f64;

    /// Local derivatives with respect to each input, in input order, already
    /// multiplied by `d_output`.
    fn backward(&self, ctx: &Context, d_output: f64) -> Result<Derivatives>;
}

/// The derivatives returned by [`ScalarFunction::backward`].
///
/// A single `f64` converts to a one-element list and tuples or arrays keep
/// their order, so every backward result can be paired with inputs by position.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivatives(SmallVec<[f64; 2]>);

impl Derivatives {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl From<f64> for Derivatives {
    fn from(d: f64) -> Self {
        Derivatives(smallvec::smallvec![d])
    }
}

impl From<(f64, f64)> for Derivatives {
    fn from((a, b): (f64, f64)) -> Self {
        Derivatives(smallvec::smallvec![a, b])
    }
}

impl<const N: usize> From<[f64; N]> for Derivatives {
    fn from(ds: [f64; N]) -> Self {
        Derivatives(SmallVec::from_slice(&ds))
    }
}

impl FromIterator<f64> for Derivatives {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Derivatives(iter.into_iter().collect())
    }
}

impl IntoIterator for Derivatives {
    type Item = f64;
    type IntoIter = smallvec::IntoIter<[f64; 2]>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// An argument to [`Graph::apply`]: an existing node or a bare number.
#[derive(Debug, Clone)]
pub enum ScalarLike {
    Node(Scalar),
    Constant(f64),
}

impl ScalarLike {
    /// The raw value either variant carries.
    pub fn value(&self) -> f64 {
        match self {
            ScalarLike::Node(s) => s.value(),
            ScalarLike::Constant(v) => *v,
        }
    }
}

impl From<f64> for ScalarLike {
    fn from(v: f64) -> Self {
        ScalarLike::Constant(v)
    }
}

impl From<Scalar> for ScalarLike {
    fn from(s: Scalar) -> Self {
        ScalarLike::Node(s)
    }
}

impl From<&Scalar> for ScalarLike {
    fn from(s: &Scalar) -> Self {
        ScalarLike::Node(s.clone())
    }
}

impl Graph {
    /// Apply `op` to `args`, recording a new node with history.
    ///
    /// Bare numbers are wrapped into fresh leaves first (one id each, in
    /// argument order), then the result takes one more id. Fails without
    /// constructing anything if the argument count does not match the
    /// operation's arity.
    pub fn apply<I>(&self, op: &'static dyn ScalarFunction, args: I) -> Result<Scalar>
    where
        I: IntoIterator<Item = ScalarLike>,
    {
        let args: Vec<ScalarLike> = args.into_iter().collect();
        check_arity(op, args.len())?;

        let inputs = args.into_iter().map(|arg| self.resolve(arg)).collect();
        Ok(self.record(op, inputs))
    }

    /// Run `op` forward on raw values without building any node.
    ///
    /// The context is created with `no_grad`, so nothing is saved.
    pub fn evaluate(&self, op: &dyn ScalarFunction, args: &[f64]) -> Result<f64> {
        check_arity(op, args.len())?;
        let mut ctx = Context::new(true);
        Ok(op.forward(&mut ctx, args))
    }

    /// Turn an argument into a node, wrapping bare numbers as leaves.
    pub(crate) fn resolve(&self, arg: ScalarLike) -> Scalar {
        match arg {
            ScalarLike::Node(s) => s,
            ScalarLike::Constant(v) => self.var(v),
        }
    }

    /// Run forward and build the result node. Arity must already be correct.
    pub(crate) fn record(&self, op: &'static dyn ScalarFunction, inputs: Vec<Scalar>) -> Scalar {
        let raw: SmallVec<[f64; 2]> = inputs.iter().map(Scalar::value).collect();
        let mut ctx = Context::new(false);
        let value = op.forward(&mut ctx, &raw);
        let result = self.node(value, Some(History::new(op, ctx, inputs)));
        trace!("{} {} {:?} -> {}", result.id(), op.name(), raw.as_slice(), value);
        result
    }
}

fn check_arity(op: &dyn ScalarFunction, actual: usize) -> Result<()> {
    if actual != op.arity() {
        return Err(AutodiffError::ArityMismatch {
            op: op.name(),
            expected: op.arity(),
            actual,
        });
    }
    Ok(())
}
