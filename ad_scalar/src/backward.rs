//! Reverse-mode automatic differentiation.
//!
//! The backward pass:
//! 1. Builds a topological ordering of the non-constant nodes reachable from the output
//! 2. Walks it in reverse, summing each node's derivative into its parents
//! 3. Stores the final values on leaves, only once the whole walk succeeded
//!
//! Nodes are tracked by identity rather than by [`NodeId`](crate::NodeId), so
//! expressions mixing nodes from several [`Graph`](crate::Graph) handles (whose
//! ids may coincide) are still differentiated correctly.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use crate::error::Result;
use crate::node::{NodeKey, Scalar};

/// Order the nodes reachable from `root` so that every node comes after all of
/// its parents. `root` is last.
///
/// Constants are skipped entirely. The order follows the positional order of
/// each node's inputs, so it is deterministic for a given graph. Uses an
/// explicit stack, visiting nodes in the same order as a recursive post-order
/// DFS would.
pub fn topological_sort(root: &Scalar) -> Vec<Scalar> {
    let mut visited: HashSet<NodeKey> = HashSet::new();
    let mut order = Vec::new();

    if root.is_constant() {
        return order;
    }
    visited.insert(root.key());

    // (node, index of the next parent to visit)
    let mut stack: Vec<(Scalar, usize)> = vec![(root.clone(), 0)];

    while let Some((node, next)) = stack.last_mut() {
        let parent = node.parents().get(*next).cloned();
        *next += 1;

        match parent {
            Some(parent) => {
                if parent.is_constant() || !visited.insert(parent.key()) {
                    continue;
                }
                stack.push((parent, 0));
            }
            None => {
                // All parents done (postorder)
                if let Some((node, _)) = stack.pop() {
                    order.push(node);
                }
            }
        }
    }

    order
}

/// Propagate `seed` (the derivative of the final output with respect to
/// `root`) back through the graph.
///
/// Every leaf reachable from `root` has the sum over all paths added to its
/// stored derivative; intermediate nodes are left untouched. If an operation's
/// backward fails, the error is returned and no leaf is modified.
pub fn backpropagate(root: &Scalar, seed: f64) -> Result<()> {
    let order = topological_sort(root);
    debug!("backpropagate from {} over {} node(s), seed {}", root.id(), order.len(), seed);

    let mut derivatives: HashMap<NodeKey, f64> = HashMap::new();
    derivatives.insert(root.key(), seed);

    let mut updates: Vec<(&Scalar, f64)> = Vec::new();
    for node in order.iter().rev() {
        let d = derivatives.get(&node.key()).copied().unwrap_or(0.0);

        if node.is_leaf() {
            updates.push((node, d));
            continue;
        }

        for (parent, local) in node.chain_rule(d)? {
            trace!("{} -> {}: {}", node.id(), parent.id(), local);
            // Multiple consumers: contributions add up
            *derivatives.entry(parent.key()).or_insert(0.0) += local;
        }
    }

    for &(leaf, d) in &updates {
        leaf.accumulate_derivative(d)?;
    }

    debug!("backpropagate from {} updated {} leaves", root.id(), updates.len());
    Ok(())
}
