use std::collections::HashMap;
use std::hash::Hash;

/// Trait for providing node ranks during layer assignment
///
/// Nodes sharing a rank share a layer; lower ranks come first.
pub trait NodeRanks<N> {
    /// Get the rank of a node, `None` when it has none
    fn rank(&self, node: N) -> Option<f64>;
}

// Blanket implementation for closures
impl<N, F> NodeRanks<N> for F
where
    F: Fn(N) -> Option<f64>,
{
    fn rank(&self, node: N) -> Option<f64> {
        self(node)
    }
}

// Implementation for HashMap
impl<N: Eq + Hash> NodeRanks<N> for HashMap<N, f64> {
    fn rank(&self, node: N) -> Option<f64> {
        self.get(&node).copied()
    }
}
