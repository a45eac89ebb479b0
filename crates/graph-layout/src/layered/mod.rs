mod crossings;
mod layers;
mod positions;

use crate::{NodeRanks, Point, Vec2};
use petgraph::visit::{IntoEdgeReferences, IntoNodeIdentifiers};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;
use tracing::debug;

use layers::assign_layers;
use positions::assign_coordinates;

/// Errors that can occur during layered layout computation
#[derive(Debug, Error)]
pub enum LayeredLayoutError<N>
where
    N: fmt::Debug,
{
    /// A selected node is not part of the graph
    #[error("node {0:?} is not part of the graph")]
    UnknownNode(N),

    /// Ranks must be finite to be ordered into layers
    #[error("node {0:?} has a non-finite rank")]
    InvalidRank(N),
}

/// Configuration for the layered layout
#[derive(Debug, Clone)]
pub struct LayeredLayout {
    /// Horizontal and vertical spacing between nodes
    pub margin: Vec2,

    /// Maximum sweeps for crossing minimization
    pub max_crossing_iterations: usize,

    /// A sweep removing at most this many crossings counts as no
    /// improvement
    pub min_improvement: usize,
}

impl Default for LayeredLayout {
    fn default() -> Self {
        Self {
            margin: Vec2::new(20.0, 20.0),
            max_crossing_iterations: 9,
            min_improvement: 0,
        }
    }
}

impl LayeredLayout {
    /// Create a new layered layout with the given margin
    pub fn new(margin: Vec2) -> Self {
        Self {
            margin,
            ..Default::default()
        }
    }
}

/// Horizontal group of a layer when two selections are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Chunk {
    /// Only in the first selection
    A,
    /// In both selections
    Both,
    /// Only in the second selection
    B,
}

impl Chunk {
    /// Chunks in left to right order
    pub const ALL: [Chunk; 3] = [Chunk::A, Chunk::Both, Chunk::B];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// The nodes to lay out, split into the chunks they belong to
#[derive(Debug, Clone)]
pub struct Selection<N> {
    order: Vec<N>,
    membership: HashMap<N, Chunk>,
}

impl<N> Selection<N>
where
    N: Copy + Eq + Hash,
{
    /// A single selection; every node lands in [`Chunk::A`]
    pub fn new(a: impl IntoIterator<Item = N>) -> Self {
        Self::with_comparison(a, std::iter::empty())
    }

    /// Two selections compared side by side
    pub fn with_comparison(
        a: impl IntoIterator<Item = N>,
        b: impl IntoIterator<Item = N>,
    ) -> Self {
        let mut order = Vec::new();
        let mut membership = HashMap::new();
        for node in a {
            if membership.insert(node, Chunk::A).is_none() {
                order.push(node);
            }
        }
        for node in b {
            match membership.entry(node) {
                Entry::Occupied(mut entry) => {
                    if *entry.get() == Chunk::A {
                        entry.insert(Chunk::Both);
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(Chunk::B);
                    order.push(node);
                }
            }
        }
        Self { order, membership }
    }

    pub fn chunk(&self, node: N) -> Option<Chunk> {
        self.membership.get(&node).copied()
    }

    pub fn contains(&self, node: N) -> bool {
        self.membership.contains_key(&node)
    }

    /// Selected nodes, first selection first
    pub fn iter(&self) -> impl Iterator<Item = N> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Identifier of a routing node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualId(usize);

impl VirtualId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node placed in a layer, either a graph node or a routing waypoint for
/// an edge that skips layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayoutNode<N> {
    Real(N),
    Virtual(VirtualId),
}

impl<N: Copy> LayoutNode<N> {
    pub fn real(self) -> Option<N> {
        match self {
            LayoutNode::Real(node) => Some(node),
            LayoutNode::Virtual(_) => None,
        }
    }

    pub fn is_virtual(self) -> bool {
        matches!(self, LayoutNode::Virtual(_))
    }
}

/// All nodes sharing one rank, in three ordered chunks
#[derive(Debug, Clone, PartialEq)]
pub struct Layer<N> {
    rank: f64,
    chunks: [Vec<LayoutNode<N>>; 3],
}

impl<N: Copy> Layer<N> {
    fn new(rank: f64) -> Self {
        Self {
            rank,
            chunks: [Vec::new(), Vec::new(), Vec::new()],
        }
    }

    pub fn rank(&self) -> f64 {
        self.rank
    }

    pub fn chunk(&self, chunk: Chunk) -> &[LayoutNode<N>] {
        &self.chunks[chunk.index()]
    }

    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(Vec::is_empty)
    }

    /// Nodes across all chunks, left to right
    pub fn iter(&self) -> impl Iterator<Item = LayoutNode<N>> + '_ {
        self.chunks.iter().flatten().copied()
    }

    /// Number of nodes in the chunks left of `chunk`
    fn offset(&self, chunk: Chunk) -> usize {
        self.chunks[..chunk.index()].iter().map(Vec::len).sum()
    }
}

/// Where a node sits in the layer structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub layer: usize,
    pub chunk: Chunk,
    pub position: usize,
}

/// Connection between nodes of two adjacent layers
///
/// Only links touching a real node carry the edge weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link<N, E> {
    pub upper: LayoutNode<N>,
    pub lower: LayoutNode<N>,
    pub kind: Option<E>,
}

/// Virtual nodes routing one edge across intermediate layers, top down
#[derive(Debug, Clone, PartialEq)]
pub struct Chain<N, E> {
    pub upper: N,
    pub lower: N,
    /// Weight of the first edge seen between the two nodes
    pub kind: E,
    pub nodes: Vec<VirtualId>,
}

/// Outcome of crossing minimization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossingReport {
    /// Crossings before the first sweep
    pub initial: usize,
    /// Crossings after each sweep
    pub iterations: Vec<usize>,
    /// Crossings of the final order
    pub crossings: usize,
    /// Whether sweeping stopped because it no longer improved
    pub settled: bool,
}

/// Layer structure that can be cached and reused
///
/// The per-node slot index is rebuilt whenever a layer changes
/// structurally and patched in place when two neighbours swap.
#[derive(Debug, Clone)]
pub struct Layers<N, E> {
    pub(crate) layers: Vec<Layer<N>>,
    /// `links[k]` joins layer `k` to layer `k + 1`
    pub(crate) links: Vec<Vec<Link<N, E>>>,
    pub(crate) chains: Vec<Chain<N, E>>,
    pub(crate) index: HashMap<LayoutNode<N>, Slot>,
    pub(crate) up: HashMap<LayoutNode<N>, Vec<LayoutNode<N>>>,
    pub(crate) down: HashMap<LayoutNode<N>, Vec<LayoutNode<N>>>,
    pub(crate) virtual_count: usize,
    pub(crate) report: CrossingReport,
}

impl<N, E> Layers<N, E>
where
    N: Copy + Ord + Hash,
    E: Copy,
{
    /// Layers ordered by increasing rank
    pub fn layers(&self) -> &[Layer<N>] {
        &self.layers
    }

    pub fn chains(&self) -> &[Chain<N, E>] {
        &self.chains
    }

    /// Every link, top layer pair first
    pub fn links(&self) -> impl Iterator<Item = &Link<N, E>> + '_ {
        self.links.iter().flatten()
    }

    pub fn virtual_count(&self) -> usize {
        self.virtual_count
    }

    pub fn slot(&self, node: LayoutNode<N>) -> Option<Slot> {
        self.index.get(&node).copied()
    }

    /// Position of `node` counted across all chunks of its layer
    pub fn flat_position(&self, node: LayoutNode<N>) -> Option<usize> {
        let slot = self.slot(node)?;
        Some(self.layers[slot.layer].offset(slot.chunk) + slot.position)
    }

    /// Neighbours in the layer above
    pub fn neighbors_up(&self, node: LayoutNode<N>) -> &[LayoutNode<N>] {
        self.up.get(&node).map(Vec::as_slice).unwrap_or_default()
    }

    /// Neighbours in the layer below
    pub fn neighbors_down(&self, node: LayoutNode<N>) -> &[LayoutNode<N>] {
        self.down.get(&node).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn report(&self) -> &CrossingReport {
        &self.report
    }

    pub fn is_settled(&self) -> bool {
        self.report.settled
    }

    /// Rebuild the slot index of one layer
    pub(crate) fn reindex(&mut self, layer: usize) {
        for chunk in Chunk::ALL {
            for (position, &node) in self.layers[layer].chunks[chunk.index()].iter().enumerate() {
                self.index.insert(node, Slot { layer, chunk, position });
            }
        }
    }

    pub(crate) fn reindex_all(&mut self) {
        self.index.clear();
        for layer in 0..self.layers.len() {
            self.reindex(layer);
        }
    }
}

impl LayeredLayout {
    /// Compute the layer structure of the selected nodes and minimize its
    /// crossings
    ///
    /// Nodes are grouped by rank; nodes without one share the highest
    /// rank. Edges between selected nodes spanning more than one layer are
    /// routed through virtual nodes. When `previous` is given, nodes keep
    /// their previous relative order and nodes that changed chunk enter at
    /// the edge they came from.
    ///
    /// # Errors
    /// Returns an error if a selected node is not in the graph or has a
    /// non-finite rank
    pub fn compute_layers<G, R>(
        &self,
        graph: G,
        selection: &Selection<G::NodeId>,
        ranks: &R,
        previous: Option<&Layers<G::NodeId, G::EdgeWeight>>,
    ) -> Result<Layers<G::NodeId, G::EdgeWeight>, LayeredLayoutError<G::NodeId>>
    where
        G: IntoEdgeReferences + IntoNodeIdentifiers,
        G::NodeId: Copy + Ord + Hash + fmt::Debug,
        G::EdgeWeight: Copy,
        R: NodeRanks<G::NodeId>,
    {
        let mut layers = assign_layers(graph, selection, ranks, previous)?;
        debug!(
            layers = layers.layers.len(),
            nodes = selection.len(),
            virtual_nodes = layers.virtual_count,
            "assigned layers"
        );

        self.minimize_crossings(&mut layers);
        debug!(
            initial = layers.report.initial,
            crossings = layers.report.crossings,
            settled = layers.report.settled,
            "minimized crossings"
        );
        Ok(layers)
    }

    /// Reorder the layers in place to reduce crossings
    pub fn minimize_crossings<N, E>(&self, layers: &mut Layers<N, E>)
    where
        N: Copy + Ord + Hash,
        E: Copy,
    {
        layers.minimize(self.max_crossing_iterations, self.min_improvement);
    }

    /// Compute coordinates from cached layers
    pub fn compute_positions<N, E>(&self, layers: &Layers<N, E>) -> HashMap<LayoutNode<N>, Point>
    where
        N: Copy + Ord + Hash,
        E: Copy,
    {
        assign_coordinates(layers, self.margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::graphmap::DiGraphMap;
    use test_log::test;

    fn chain_with_shortcut() -> DiGraphMap<u32, &'static str> {
        let mut graph = DiGraphMap::new();
        for i in 0..4 {
            graph.add_edge(i, i + 1, "parent");
        }
        graph.add_edge(0, 4, "shortcut");
        graph
    }

    fn rank_by_id(node: u32) -> Option<f64> {
        Some(f64::from(node))
    }

    #[test]
    fn shortcut_across_five_generations_gets_three_virtual_nodes() {
        let graph = chain_with_shortcut();
        let layers = LayeredLayout::default()
            .compute_layers(&graph, &Selection::new(0..5), &rank_by_id, None)
            .unwrap();

        assert_eq!(layers.layers().len(), 5);
        assert_eq!(layers.virtual_count(), 3);
        assert_eq!(layers.chains().len(), 1);

        let chain = &layers.chains()[0];
        assert_eq!((chain.upper, chain.lower, chain.kind), (0, 4, "shortcut"));
        for (k, &id) in chain.nodes.iter().enumerate() {
            let slot = layers.slot(LayoutNode::Virtual(id)).unwrap();
            assert_eq!(slot.layer, k + 1);
        }

        let kinds: Vec<_> = layers
            .links()
            .filter(|link| link.upper.is_virtual() || link.lower.is_virtual())
            .map(|link| link.kind)
            .collect();
        assert_eq!(kinds, [Some("shortcut"), None, None, Some("shortcut")]);
    }

    #[test]
    fn chain_length_counts_only_occupied_layers() {
        let mut graph = DiGraphMap::new();
        graph.add_edge(1u32, 2, ());
        graph.add_edge(1, 4, ());
        let layers = LayeredLayout::default()
            .compute_layers(&graph, &Selection::new([1, 2, 4]), &rank_by_id, None)
            .unwrap();

        // rank 3 is empty, so 1 -> 4 only crosses the layer of 2
        assert_eq!(layers.layers().len(), 3);
        assert_eq!(layers.chains()[0].nodes.len(), 1);
    }

    #[test]
    fn both_edge_directions_make_one_chain() {
        let mut graph = chain_with_shortcut();
        graph.add_edge(4, 0, "shortcut back");
        let layers = LayeredLayout::default()
            .compute_layers(&graph, &Selection::new(0..5), &rank_by_id, None)
            .unwrap();
        assert_eq!(layers.chains().len(), 1);
        assert_eq!(layers.virtual_count(), 3);
    }

    #[test]
    fn unselected_nodes_are_ignored() {
        let graph = chain_with_shortcut();
        let layers = LayeredLayout::default()
            .compute_layers(&graph, &Selection::new([0, 1, 2]), &rank_by_id, None)
            .unwrap();
        assert_eq!(layers.virtual_count(), 0);
        assert_eq!(layers.links().count(), 2);
    }

    #[test]
    fn comparison_splits_layers_into_chunks() {
        let mut graph = DiGraphMap::<u32, ()>::new();
        for n in 1..=4 {
            graph.add_node(n);
        }
        let selection = Selection::with_comparison([1, 2, 3], [3, 4]);
        let layers = LayeredLayout::default()
            .compute_layers(&graph, &selection, &|_: u32| Some(0.0), None)
            .unwrap();

        let layer = &layers.layers()[0];
        let chunk = |c| layer.chunk(c).iter().filter_map(|n| n.real()).collect::<Vec<_>>();
        assert_eq!(chunk(Chunk::A), [1, 2]);
        assert_eq!(chunk(Chunk::Both), [3]);
        assert_eq!(chunk(Chunk::B), [4]);
        assert_eq!(layers.flat_position(LayoutNode::Real(4)), Some(3));
    }

    #[test]
    fn missing_rank_joins_the_highest_layer() {
        let graph = chain_with_shortcut();
        let ranks = HashMap::from([(0u32, 0.0), (1, 1.0)]);
        let layers = LayeredLayout::default()
            .compute_layers(&graph, &Selection::new([0, 1, 2]), &ranks, None)
            .unwrap();
        assert_eq!(layers.layers().len(), 2);
        assert_eq!(layers.slot(LayoutNode::Real(2)).map(|s| s.layer), Some(1));
    }

    #[test]
    fn unknown_node_is_rejected() {
        let graph = chain_with_shortcut();
        let err = LayeredLayout::default()
            .compute_layers(&graph, &Selection::new([0, 9]), &rank_by_id, None)
            .unwrap_err();
        assert!(matches!(err, LayeredLayoutError::UnknownNode(9)));
    }

    #[test]
    fn non_finite_rank_is_rejected() {
        let graph = chain_with_shortcut();
        let rank = |n: u32| (n == 1).then_some(f64::NAN);
        let err = LayeredLayout::default()
            .compute_layers(&graph, &Selection::new([0, 1]), &rank, None)
            .unwrap_err();
        assert!(matches!(err, LayeredLayoutError::InvalidRank(1)));
    }

    #[test]
    fn nodes_keep_their_place_across_relayouts() {
        let mut graph = DiGraphMap::<u32, ()>::new();
        for n in 1..=5 {
            graph.add_node(n);
        }
        let engine = LayeredLayout::default();
        let same_rank = |_: u32| Some(0.0);
        let order = |layers: &Layers<u32, ()>, chunk| {
            layers.layers()[0]
                .chunk(chunk)
                .iter()
                .filter_map(|n| n.real())
                .collect::<Vec<_>>()
        };

        let first = engine
            .compute_layers(&graph, &Selection::new([1, 2, 3]), &same_rank, None)
            .unwrap();

        // 2 and 3 move right into the shared chunk, 5 is new
        let selection = Selection::with_comparison([1, 2, 3, 5], [2, 3, 4]);
        let second = engine
            .compute_layers(&graph, &selection, &same_rank, Some(&first))
            .unwrap();
        assert_eq!(order(&second, Chunk::A), [5, 1]);
        assert_eq!(order(&second, Chunk::Both), [2, 3]);
        assert_eq!(order(&second, Chunk::B), [4]);

        // 2 and 3 come back from the right and follow the retained nodes
        let selection = Selection::with_comparison([1, 2, 3, 4, 5], [4]);
        let third = engine
            .compute_layers(&graph, &selection, &same_rank, Some(&second))
            .unwrap();
        assert_eq!(order(&third, Chunk::A), [5, 1, 2, 3]);
        assert_eq!(order(&third, Chunk::Both), [4]);
    }
}
