use super::{
    Chain, Chunk, CrossingReport, Layer, LayeredLayoutError, Layers, Link, LayoutNode, Selection,
    VirtualId,
};
use crate::NodeRanks;
use petgraph::visit::{EdgeRef, IntoEdgeReferences, IntoNodeIdentifiers};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

/// How a node entered its chunk compared with the previous layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Placement {
    New,
    FromLeft,
    Retained,
    FromRight,
}

/// Bucket the selected nodes into layers and chunks, then route edges
/// that skip layers through virtual nodes
pub(crate) fn assign_layers<G, R>(
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
    let known: HashSet<G::NodeId> = graph.node_identifiers().collect();
    if let Some(missing) = selection.iter().find(|node| !known.contains(node)) {
        return Err(LayeredLayoutError::UnknownNode(missing));
    }

    let observed: Vec<(G::NodeId, Option<f64>)> =
        selection.iter().map(|node| (node, ranks.rank(node))).collect();
    if let Some(&(node, _)) = observed
        .iter()
        .find(|(_, rank)| rank.is_some_and(|r| !r.is_finite()))
    {
        return Err(LayeredLayoutError::InvalidRank(node));
    }
    let fallback = observed
        .iter()
        .filter_map(|&(_, rank)| rank)
        .max_by(f64::total_cmp)
        .unwrap_or(0.0);
    let rank_of: HashMap<G::NodeId, f64> = observed
        .into_iter()
        .map(|(node, rank)| (node, rank.unwrap_or(fallback)))
        .collect();

    let mut distinct: Vec<f64> = rank_of.values().copied().collect();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();

    // (placement, previous layer, previous flat position or selection order, node)
    let mut buckets = vec![[Vec::new(), Vec::new(), Vec::new()]; distinct.len()];
    for (order, node) in selection.iter().enumerate() {
        let Some(chunk) = selection.chunk(node) else {
            continue;
        };
        let layer = distinct.partition_point(|&r| r < rank_of[&node]);
        let before = previous.and_then(|p| {
            let real = LayoutNode::Real(node);
            Some((p.slot(real)?, p.flat_position(real)?))
        });
        let entry = match before {
            None => (Placement::New, 0, order, node),
            Some((slot, flat)) => {
                let placement = match slot.chunk.cmp(&chunk) {
                    Ordering::Less => Placement::FromLeft,
                    Ordering::Equal => Placement::Retained,
                    Ordering::Greater => Placement::FromRight,
                };
                (placement, slot.layer, flat, node)
            }
        };
        buckets[layer][chunk.index()].push(entry);
    }

    let mut layers: Vec<Layer<G::NodeId>> = distinct.iter().map(|&rank| Layer::new(rank)).collect();
    for (layer, chunks) in layers.iter_mut().zip(buckets) {
        for (slot, mut entries) in layer.chunks.iter_mut().zip(chunks) {
            entries.sort_by_key(|&(placement, layer, position, _)| (placement, layer, position));
            *slot = entries
                .into_iter()
                .map(|(_, _, _, node)| LayoutNode::Real(node))
                .collect();
        }
    }

    let mut result = Layers {
        links: vec![Vec::new(); layers.len().saturating_sub(1)],
        layers,
        chains: Vec::new(),
        index: HashMap::new(),
        up: HashMap::new(),
        down: HashMap::new(),
        virtual_count: 0,
        report: CrossingReport::default(),
    };
    result.reindex_all();

    let mut routed = HashSet::new();
    for edge in graph.edge_references() {
        let (a, b) = (edge.source(), edge.target());
        if a == b || !selection.contains(a) || !selection.contains(b) {
            continue;
        }
        if !routed.insert((a.min(b), a.max(b))) {
            continue;
        }
        result.route(a, b, *edge.weight());
    }

    Ok(result)
}

impl<N, E> Layers<N, E>
where
    N: Copy + Ord + Hash,
    E: Copy,
{
    fn add_link(
        &mut self,
        layer: usize,
        upper: LayoutNode<N>,
        lower: LayoutNode<N>,
        kind: Option<E>,
    ) {
        self.links[layer].push(Link { upper, lower, kind });
        self.down.entry(upper).or_default().push(lower);
        self.up.entry(lower).or_default().push(upper);
    }

    /// Connect two real nodes, inserting one virtual node per layer between
    /// them
    fn route(&mut self, a: N, b: N, kind: E) {
        let (Some(slot_a), Some(slot_b)) = (
            self.slot(LayoutNode::Real(a)),
            self.slot(LayoutNode::Real(b)),
        ) else {
            return;
        };
        let ((upper, upper_slot), (lower, lower_slot)) = match slot_a.layer.cmp(&slot_b.layer) {
            Ordering::Equal => return,
            Ordering::Less => ((a, slot_a), (b, slot_b)),
            Ordering::Greater => ((b, slot_b), (a, slot_a)),
        };

        let mut last = LayoutNode::Real(upper);
        let mut nodes = Vec::new();
        if lower_slot.layer - upper_slot.layer > 1 {
            let upper_flat = self.flat_position(last).unwrap_or(0) as f64;
            let lower_flat = self.flat_position(LayoutNode::Real(lower)).unwrap_or(0) as f64;
            let upper_rank = self.layers[upper_slot.layer].rank;
            let lower_rank = self.layers[lower_slot.layer].rank;
            let same_chunk = (upper_slot.chunk == lower_slot.chunk).then_some(upper_slot.chunk);

            for layer in upper_slot.layer + 1..lower_slot.layer {
                let t = (self.layers[layer].rank - upper_rank) / (lower_rank - upper_rank);
                let flat = (upper_flat + t * (lower_flat - upper_flat)).round() as usize;
                let id = VirtualId(self.virtual_count);
                self.virtual_count += 1;

                let node = LayoutNode::Virtual(id);
                self.insert_at(layer, flat, same_chunk, node);
                let end_kind = (layer == upper_slot.layer + 1).then_some(kind);
                self.add_link(layer - 1, last, node, end_kind);
                last = node;
                nodes.push(id);
            }
        }
        self.add_link(lower_slot.layer - 1, last, LayoutNode::Real(lower), Some(kind));

        if !nodes.is_empty() {
            self.chains.push(Chain {
                upper,
                lower,
                kind,
                nodes,
            });
        }
    }

    /// Insert `node` at a flat position, clamped into `chunk` when given
    fn insert_at(&mut self, layer: usize, flat: usize, chunk: Option<Chunk>, node: LayoutNode<N>) {
        let target = &mut self.layers[layer];
        let (chunk, position) = match chunk {
            Some(chunk) => {
                let len = target.chunks[chunk.index()].len();
                (chunk, flat.saturating_sub(target.offset(chunk)).min(len))
            }
            None => {
                let mut remaining = flat.min(target.len());
                let mut found = Chunk::A;
                for candidate in Chunk::ALL {
                    found = candidate;
                    let len = target.chunks[candidate.index()].len();
                    if remaining <= len {
                        break;
                    }
                    remaining -= len;
                }
                (found, remaining)
            }
        };
        target.chunks[chunk.index()].insert(position, node);
        self.reindex(layer);
    }
}
