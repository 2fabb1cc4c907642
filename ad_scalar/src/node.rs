//! Core data structures for the computation graph.
//!
//! A [`Scalar`] is a reference-counted handle to an immutable node holding a value,
//! the [`History`] of how it was produced, and a derivative slot that only leaves
//! ever fill. Node ids come from a [`Graph`], an explicit id generator shared by
//! every node built together.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::context::Context;
use crate::error::{AutodiffError, Result};
use crate::function::ScalarFunction;
use crate::ops;

/// Unique identifier for a node, scoped to the [`Graph`] that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a live node, used by the graph algorithms as a map key.
///
/// Unlike [`NodeId`], two distinct nodes never share a key while both are alive,
/// even when they come from different [`Graph`] handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeKey(*const Node);

/// Id generator for computation graph nodes.
///
/// `Graph` is a cheap handle: clones share one counter. Separate handles count
/// independently, so ids are labels, not global keys. Every node constructed
/// through it, including constants wrapped implicitly by
/// [`Graph::apply`], takes the next id. Handles are `!Send`, matching the
/// single-threaded graph.
#[derive(Debug, Clone)]
pub struct Graph {
    next_id: Rc<Cell<u64>>,
}

impl Default for Graph {
    fn default() -> Self {
        Graph::new()
    }
}

impl Graph {
    /// A fresh generator whose first id is 1.
    pub fn new() -> Self {
        Graph::starting_at(1)
    }

    /// A fresh generator whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Graph {
            next_id: Rc::new(Cell::new(first)),
        }
    }

    /// The id the next constructed node will receive.
    pub fn peek_next_id(&self) -> NodeId {
        NodeId(self.next_id.get())
    }

    /// Rewind the counter to 1.
    ///
    /// Nodes created before the reset keep their ids, so ids in an expression
    /// mixing old and new nodes may repeat. Backpropagation tracks nodes by
    /// identity and is unaffected; only the labels are ambiguous.
    pub fn reset(&self) {
        self.next_id.set(1);
    }

    fn next_id(&self) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        NodeId(id)
    }

    /// Create a tracked input: a leaf with an empty history.
    pub fn var(&self, value: f64) -> Scalar {
        self.node(value, Some(History::default()))
    }

    /// Create a constant detached from gradient tracking.
    ///
    /// Constants have no history; traversal skips them and they never receive a
    /// derivative.
    pub fn constant(&self, value: f64) -> Scalar {
        self.node(value, None)
    }

    pub(crate) fn node(&self, value: f64, history: Option<History>) -> Scalar {
        Scalar(Rc::new(Node {
            id: self.next_id(),
            value,
            history,
            derivative: Cell::new(None),
            graph: self.clone(),
        }))
    }
}

/// How a node was produced: the operation, its context, and its ordered inputs.
///
/// A default `History` has no operation and no inputs; it marks a tracked leaf.
#[derive(Default)]
pub struct History {
    op: Option<&'static dyn ScalarFunction>,
    ctx: Context,
    inputs: Vec<Scalar>,
}

impl History {
    pub(crate) fn new(op: &'static dyn ScalarFunction, ctx: Context, inputs: Vec<Scalar>) -> Self {
        History {
            op: Some(op),
            ctx,
            inputs,
        }
    }

    /// The operation that produced the node, if any.
    pub fn op(&self) -> Option<&'static dyn ScalarFunction> {
        self.op
    }

    /// The context saved by the forward pass.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Inputs in the positional order they were given to forward.
    pub fn inputs(&self) -> &[Scalar] {
        &self.inputs
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs: Vec<NodeId> = self.inputs.iter().map(Scalar::id).collect();
        f.debug_struct("History")
            .field("op", &self.op.map(|op| op.name()))
            .field("ctx", &self.ctx)
            .field("inputs", &inputs)
            .finish()
    }
}

struct Node {
    id: NodeId,
    value: f64,
    history: Option<History>,
    derivative: Cell<Option<f64>>,
    graph: Graph,
}

impl Drop for Node {
    // Unlink inputs iteratively so dropping a long chain does not recurse once per node.
    fn drop(&mut self) {
        let Some(history) = self.history.as_mut() else {
            return;
        };
        let mut pending = std::mem::take(&mut history.inputs);
        while let Some(Scalar(rc)) = pending.pop() {
            if let Ok(mut node) = Rc::try_unwrap(rc) {
                if let Some(history) = node.history.as_mut() {
                    pending.append(&mut history.inputs);
                }
            }
        }
    }
}

/// A scalar value in the computation graph.
///
/// Cloning is O(1) and shares the node, so the same subexpression can feed any
/// number of consumers. Nothing about a node changes after construction except
/// the derivative of a leaf.
#[derive(Clone)]
pub struct Scalar(Rc<Node>);

impl Scalar {
    /// The node id.
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// The forward value.
    pub fn value(&self) -> f64 {
        self.0.value
    }

    /// The accumulated derivative; `None` until a backward pass reaches this leaf.
    pub fn derivative(&self) -> Option<f64> {
        self.0.derivative.get()
    }

    /// How this node was produced; `None` for constants.
    pub fn history(&self) -> Option<&History> {
        self.0.history.as_ref()
    }

    pub(crate) fn key(&self) -> NodeKey {
        NodeKey(Rc::as_ptr(&self.0))
    }

    /// The generator this node was built with.
    pub fn graph(&self) -> &Graph {
        &self.0.graph
    }

    /// The inputs this node was computed from. Empty for leaves and constants.
    pub fn parents(&self) -> &[Scalar] {
        match &self.0.history {
            Some(history) => &history.inputs,
            None => &[],
        }
    }

    /// True when no operation with inputs produced this node.
    pub fn is_leaf(&self) -> bool {
        self.0.history.as_ref().map_or(true, |h| h.inputs.is_empty())
    }

    /// True when the node has no history at all.
    pub fn is_constant(&self) -> bool {
        self.0.history.is_none()
    }

    /// Add `d` to this leaf's derivative.
    pub fn accumulate_derivative(&self, d: f64) -> Result<()> {
        if !self.is_leaf() {
            return Err(AutodiffError::NotALeaf(self.id()));
        }
        let total = self.0.derivative.get().unwrap_or(0.0) + d;
        self.0.derivative.set(Some(total));
        Ok(())
    }

    /// Clear the stored derivative.
    pub fn zero_derivative(&self) {
        self.0.derivative.set(None);
    }

    /// Apply the chain rule one step: pair each parent with `d_output` times the
    /// local derivative of this node with respect to that parent.
    ///
    /// This is where backward results are checked against the number of inputs.
    pub fn chain_rule(&self, d_output: f64) -> Result<Vec<(Scalar, f64)>> {
        let Some(history) = self.0.history.as_ref() else {
            return Ok(Vec::new());
        };
        let Some(op) = history.op else {
            return Ok(Vec::new());
        };

        let derivatives = op.backward(&history.ctx, d_output)?;
        if derivatives.len() != history.inputs.len() {
            return Err(AutodiffError::DerivativeCountMismatch {
                op: op.name(),
                expected: history.inputs.len(),
                actual: derivatives.len(),
            });
        }

        Ok(history.inputs.iter().cloned().zip(derivatives).collect())
    }

    /// Backpropagate from this node with seed 1.0.
    pub fn backward(&self) -> Result<()> {
        crate::backward::backpropagate(self, 1.0)
    }

    /// Backpropagate from this node with an explicit seed derivative.
    pub fn backward_with(&self, seed: f64) -> Result<()> {
        crate::backward::backpropagate(self, seed)
    }

    // === Unary operations ===

    pub fn exp(&self) -> Scalar {
        self.unary(&ops::Exp)
    }

    pub fn log(&self) -> Scalar {
        self.unary(&ops::Log)
    }

    pub fn sigmoid(&self) -> Scalar {
        self.unary(&ops::Sigmoid)
    }

    pub fn relu(&self) -> Scalar {
        self.unary(&ops::ReLU)
    }

    /// 1 / self
    pub fn inv(&self) -> Scalar {
        self.unary(&ops::Inv)
    }

    // === Comparisons (zero derivative) ===

    /// 1.0 if self < rhs, else 0.0.
    pub fn less_than(&self, rhs: impl Into<crate::ScalarLike>) -> Scalar {
        let rhs = self.graph().resolve(rhs.into());
        self.graph().record(&ops::LT, vec![self.clone(), rhs])
    }

    /// 1.0 if self > rhs, else 0.0.
    pub fn greater_than(&self, rhs: impl Into<crate::ScalarLike>) -> Scalar {
        let rhs = self.graph().resolve(rhs.into());
        self.graph().record(&ops::LT, vec![rhs, self.clone()])
    }

    /// 1.0 if self == rhs, else 0.0.
    pub fn equal_to(&self, rhs: impl Into<crate::ScalarLike>) -> Scalar {
        let rhs = self.graph().resolve(rhs.into());
        self.graph().record(&ops::EQ, vec![self.clone(), rhs])
    }

    fn unary(&self, op: &'static dyn ScalarFunction) -> Scalar {
        self.graph().record(op, vec![self.clone()])
    }

    fn binary(&self, op: &'static dyn ScalarFunction, rhs: crate::ScalarLike) -> Scalar {
        let rhs = self.graph().resolve(rhs);
        self.graph().record(op, vec![self.clone(), rhs])
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scalar")
            .field("id", &self.id())
            .field("value", &self.value())
            .field("derivative", &self.derivative())
            .field("history", &self.history())
            .finish()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar({})", self.value())
    }
}

// === Operator overloads ===
//
// Sub and Div are composed from the primitives: a - b = a + (-b), a / b = a * inv(b).

fn sub(lhs: &Scalar, rhs: crate::ScalarLike) -> Scalar {
    let rhs = lhs.graph().resolve(rhs);
    let neg = lhs.graph().record(&ops::Neg, vec![rhs]);
    lhs.binary(&ops::Add, neg.into())
}

fn div(lhs: &Scalar, rhs: crate::ScalarLike) -> Scalar {
    let rhs = lhs.graph().resolve(rhs);
    let inv = lhs.graph().record(&ops::Inv, vec![rhs]);
    lhs.binary(&ops::Mul, inv.into())
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, |$lhs:ident, $rhs:ident| $body:expr) => {
        impl std::ops::$trait<&Scalar> for &Scalar {
            type Output = Scalar;

            fn $method(self, rhs: &Scalar) -> Scalar {
                let ($lhs, $rhs) = (self, crate::ScalarLike::from(rhs));
                $body
            }
        }

        impl std::ops::$trait<Scalar> for &Scalar {
            type Output = Scalar;

            fn $method(self, rhs: Scalar) -> Scalar {
                let ($lhs, $rhs) = (self, crate::ScalarLike::from(rhs));
                $body
            }
        }

        impl std::ops::$trait<&Scalar> for Scalar {
            type Output = Scalar;

            fn $method(self, rhs: &Scalar) -> Scalar {
                let ($lhs, $rhs) = (&self, crate::ScalarLike::from(rhs));
                $body
            }
        }

        impl std::ops::$trait<Scalar> for Scalar {
            type Output = Scalar;

            fn $method(self, rhs: Scalar) -> Scalar {
                let ($lhs, $rhs) = (&self, crate::ScalarLike::from(rhs));
                $body
            }
        }

        impl std::ops::$trait<f64> for &Scalar {
            type Output = Scalar;

            fn $method(self, rhs: f64) -> Scalar {
                let ($lhs, $rhs) = (self, crate::ScalarLike::from(rhs));
                $body
            }
        }

        impl std::ops::$trait<f64> for Scalar {
            type Output = Scalar;

            fn $method(self, rhs: f64) -> Scalar {
                let ($lhs, $rhs) = (&self, crate::ScalarLike::from(rhs));
                $body
            }
        }
    };
}

impl_binary_op!(Add, add, |lhs, rhs| lhs.binary(&ops::Add, rhs));
impl_binary_op!(Mul, mul, |lhs, rhs| lhs.binary(&ops::Mul, rhs));
impl_binary_op!(Sub, sub, |lhs, rhs| sub(lhs, rhs));
impl_binary_op!(Div, div, |lhs, rhs| div(lhs, rhs));

impl std::ops::Neg for &Scalar {
    type Output = Scalar;

    fn neg(self) -> Scalar {
        self.unary(&ops::Neg)
    }
}

impl std::ops::Neg for Scalar {
    type Output = Scalar;

    fn neg(self) -> Scalar {
        self.unary(&ops::Neg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let graph = Graph::new();
        let a = graph.var(1.0);
        let b = graph.constant(2.0);
        assert_eq!(a.id(), NodeId(1));
        assert_eq!(b.id(), NodeId(2));
        assert_eq!(graph.peek_next_id(), NodeId(3));
    }

    #[test]
    fn test_reset_and_injection() {
        let graph = Graph::starting_at(100);
        assert_eq!(graph.var(0.0).id(), NodeId(100));
        graph.reset();
        assert_eq!(graph.var(0.0).id(), NodeId(1));
    }

    #[test]
    fn test_clones_share_counter() {
        let graph = Graph::new();
        let other = graph.clone();
        graph.var(0.0);
        assert_eq!(other.var(0.0).id(), NodeId(2));
    }

    #[test]
    fn test_leaf_and_constant_flags() {
        let graph = Graph::new();
        let x = graph.var(1.0);
        let c = graph.constant(1.0);
        let y = &x * 2.0;

        assert!(x.is_leaf() && !x.is_constant());
        assert!(c.is_leaf() && c.is_constant());
        assert!(!y.is_leaf() && !y.is_constant());
        assert_eq!(y.parents().len(), 2);
        assert!(c.parents().is_empty());
    }

    #[test]
    fn test_accumulate_derivative_sums() {
        let graph = Graph::new();
        let x = graph.var(1.0);
        assert_eq!(x.derivative(), None);
        x.accumulate_derivative(1.0).unwrap();
        x.accumulate_derivative(2.0).unwrap();
        assert_eq!(x.derivative(), Some(3.0));
        x.zero_derivative();
        assert_eq!(x.derivative(), None);
    }

    #[test]
    fn test_accumulate_on_intermediate_rejected() {
        let graph = Graph::new();
        let x = graph.var(1.0);
        let y = -&x;
        assert_eq!(
            y.accumulate_derivative(1.0),
            Err(AutodiffError::NotALeaf(y.id()))
        );
    }

    #[test]
    fn test_chain_rule_pairs_inputs_in_order() {
        let graph = Graph::new();
        let a = graph.var(2.0);
        let b = graph.var(5.0);
        let c = &a * &b;

        let pairs = c.chain_rule(3.0).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0.id(), a.id());
        assert_eq!(pairs[0].1, 15.0);
        assert_eq!(pairs[1].0.id(), b.id());
        assert_eq!(pairs[1].1, 6.0);

        assert!(a.chain_rule(1.0).unwrap().is_empty());
    }

    #[test]
    fn test_operator_values() {
        let graph = Graph::new();
        let x = graph.var(6.0);
        let y = graph.var(2.0);

        assert_eq!((&x + &y).value(), 8.0);
        assert_eq!((&x - &y).value(), 4.0);
        assert_eq!((&x * &y).value(), 12.0);
        assert_eq!((&x / &y).value(), 3.0);
        assert_eq!((-&x).value(), -6.0);
        assert_eq!((&x + 1.0).value(), 7.0);
        assert_eq!(x.less_than(&y).value(), 0.0);
        assert_eq!(x.greater_than(&y).value(), 1.0);
        assert_eq!(x.equal_to(6.0).value(), 1.0);
    }

    #[test]
    fn test_debug_does_not_recurse_into_inputs() {
        let graph = Graph::new();
        let x = graph.var(1.0);
        let y = x.exp();
        let text = format!("{:?}", y);
        assert!(text.contains("Exp"));
        assert!(text.contains("NodeId(1)"));
    }
}
