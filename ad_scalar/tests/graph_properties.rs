//! Property tests for graph construction and backpropagation.
//!
//! Checks gradients against central differences over ranges of inputs, and the
//! structural guarantees of the traversal: parents before children, derivatives
//! only on leaves, constants untouched, contributions summed.

use std::collections::HashMap;

use ad_scalar::{
    backpropagate, central_difference, derivative_check, topological_sort, GradCheckConfig, Graph,
    NodeId, Scalar, DEFAULT_EPSILON,
};
use approx::assert_abs_diff_eq;
use proptest::prelude::*;

// ============================================================================
// Test Utilities
// ============================================================================

/// A small expression touching every primitive, with fan-out on both inputs.
fn mixed_expression(x: &Scalar, y: &Scalar) -> Scalar {
    let a = x * y;
    let b = (&a + x).sigmoid();
    let c = (y * y + 1.0).log();
    let d = (x - 0.5).relu();
    &b * &c + &a / (y * y + 2.0) + d - (x.sigmoid() - 1.0).exp() * 0.1
}

/// Every node reachable from `root`, including constants.
fn all_nodes(root: &Scalar) -> Vec<Scalar> {
    let mut seen = HashMap::new();
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if seen.insert(node.id(), node.clone()).is_none() {
            stack.extend(node.parents().iter().cloned());
        }
    }
    seen.into_values().collect()
}

fn input_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![-100.0..100.0f64, -3.0..3.0f64, Just(0.0), Just(-1.0), Just(2.5)]
}

// ============================================================================
// Gradient Correctness
// ============================================================================

proptest! {
    /// Property: backpropagated derivatives match central differences
    #[test]
    fn prop_gradients_match_central_difference(
        x in input_strategy(),
        y in input_strategy(),
    ) {
        // Skip the relu kink, where the two-sided estimate is not a derivative
        prop_assume!((x - 0.5).abs() > 1e-3);

        let f = |_: &Graph, v: &[Scalar]| mixed_expression(&v[0], &v[1]);
        let result = derivative_check(f, &[x, y], &GradCheckConfig::default());
        prop_assert!(result.is_ok(), "x={}, y={}: {:?}", x, y, result);
    }

    /// Property: every parent appears before its child in the sort
    #[test]
    fn prop_topological_order_is_valid(x in -3.0..3.0f64, y in 0.1..3.0f64) {
        let graph = Graph::new();
        let z = mixed_expression(&graph.var(x), &graph.var(y));

        let order = topological_sort(&z);
        let index: HashMap<NodeId, usize> =
            order.iter().enumerate().map(|(i, n)| (n.id(), i)).collect();

        prop_assert_eq!(order.last().map(Scalar::id), Some(z.id()));
        prop_assert_eq!(index.len(), order.len());
        for node in &order {
            for parent in node.parents() {
                if parent.is_constant() {
                    prop_assert!(!index.contains_key(&parent.id()));
                } else {
                    prop_assert!(index[&parent.id()] < index[&node.id()]);
                }
            }
        }
    }

    /// Property: a single backward pass stores derivatives on leaves only
    #[test]
    fn prop_only_leaves_accumulate(x in -3.0..3.0f64, y in 0.1..3.0f64) {
        let graph = Graph::new();
        let z = mixed_expression(&graph.var(x), &graph.var(y));
        z.backward().unwrap();

        for node in all_nodes(&z) {
            if node.is_leaf() && !node.is_constant() {
                prop_assert!(node.derivative().is_some());
            } else {
                prop_assert_eq!(node.derivative(), None);
            }
        }
    }

    /// Property: two passes with seeds s1 and s2 equal one pass with s1 + s2
    #[test]
    fn prop_seeds_add_up(x in -3.0..3.0f64, s1 in -2.0..2.0f64, s2 in -2.0..2.0f64) {
        let graph = Graph::new();
        let xs = graph.var(x);
        let z = xs.sigmoid() * &xs;
        backpropagate(&z, s1).unwrap();
        backpropagate(&z, s2).unwrap();

        let other = Graph::new();
        let xo = other.var(x);
        let zo = xo.sigmoid() * &xo;
        backpropagate(&zo, s1 + s2).unwrap();

        prop_assert!((xs.derivative().unwrap() - xo.derivative().unwrap()).abs() < 1e-9);
    }
}

// ============================================================================
// Fixed Scenarios
// ============================================================================

#[test]
fn test_fan_out_sums_contributions() {
    let graph = Graph::new();
    let x = graph.var(1.5);
    let y = &x + &x;
    backpropagate(&y, 1.0).unwrap();
    assert_eq!(x.derivative(), Some(2.0));
}

#[test]
fn test_shared_ancestor_feeds_two_ops() {
    // y = exp(x) * log(x), x reached through two different ops
    let graph = Graph::new();
    let x = graph.var(2.0);
    let y = x.exp() * x.log();
    y.backward().unwrap();

    let expected = 2.0_f64.exp() * 2.0_f64.ln() + 2.0_f64.exp() / 2.0;
    assert_abs_diff_eq!(x.derivative().unwrap(), expected, epsilon = 1e-10);
}

#[test]
fn test_constant_is_never_visited_or_touched() {
    let graph = Graph::new();
    let x = graph.var(3.0);
    let c = graph.constant(7.0);
    let z = (&x * &c).exp() + &c;

    assert!(topological_sort(&z).iter().all(|n| n.id() != c.id()));
    z.backward().unwrap();
    assert_eq!(c.derivative(), None);
    assert!(x.derivative().is_some());
}

#[test]
fn test_accumulate_twice_via_two_passes() {
    let graph = Graph::new();
    let x = graph.var(0.25);
    let z = &x * 1.0;
    backpropagate(&z, 1.0).unwrap();
    backpropagate(&z, 2.0).unwrap();
    assert_eq!(x.derivative(), Some(3.0));
}

#[test]
fn test_wrapped_constants_consume_ids() {
    let graph = Graph::new();
    let x = graph.var(1.0);
    let before = graph.peek_next_id().get();
    let _ = &x * 2.0;
    // one wrapped constant plus the product
    assert_eq!(graph.peek_next_id().get(), before + 2);
}

#[test]
fn test_nodes_from_separate_graphs_with_equal_ids() {
    let g1 = Graph::new();
    let g2 = Graph::new();
    let a = g1.var(2.0);
    let b = g2.var(3.0);
    assert_eq!(a.id(), b.id());

    let z = &a * &b;
    assert_eq!(topological_sort(&z).len(), 3);

    z.backward().unwrap();
    assert_eq!(a.derivative(), Some(3.0));
    assert_eq!(b.derivative(), Some(2.0));
}

#[test]
fn test_nodes_from_before_and_after_reset() {
    // y = (x1 + 1) * x2; x2 repeats x1's id and y repeats the wrapped 1.0's id
    let graph = Graph::new();
    let x1 = graph.var(4.0);
    let shifted = &x1 + 1.0;
    graph.reset();
    let x2 = graph.var(-2.0);
    assert_eq!(x1.id(), x2.id());

    let y = &shifted * &x2;
    y.backward().unwrap();
    assert_eq!(x1.derivative(), Some(-2.0));
    assert_eq!(x2.derivative(), Some(5.0));
    assert_eq!(shifted.parents()[1].derivative(), Some(-2.0));
}

#[test]
fn test_deep_chain_does_not_overflow_stack() {
    let graph = Graph::new();
    let x = graph.var(1.0);
    let mut z = x.clone();
    for _ in 0..100_000 {
        z = &z + 0.0;
    }

    assert_eq!(topological_sort(&z).len(), 200_001);
    z.backward().unwrap();
    assert_eq!(x.derivative(), Some(1.0));
}

#[test]
fn test_non_finite_values_propagate() {
    let graph = Graph::new();
    let x = graph.var(0.0);
    let z = x.inv();
    assert!(z.value().is_infinite());

    z.backward().unwrap();
    assert!(!x.derivative().unwrap().is_finite());

    let y = graph.var(-1.0);
    assert!(y.log().value().is_nan());
}

#[test]
fn test_central_difference_oracle_alone() {
    let f = |v: &[f64]| v[0].exp() * v[1];
    let d = central_difference(f, &[0.0, 3.0], 0, DEFAULT_EPSILON).unwrap();
    assert_abs_diff_eq!(d, 3.0, epsilon = 1e-6);
}
