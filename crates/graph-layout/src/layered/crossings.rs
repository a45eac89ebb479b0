use super::{Chunk, CrossingReport, Layers, LayoutNode, Slot};
use std::hash::Hash;
use tracing::trace;

/// Count pairs of links whose lower ends are in the opposite order of
/// their upper ends
///
/// `ends` holds `(upper, lower)` flat positions, `width` the size of the
/// lower layer. Links sharing an endpoint never cross.
fn count_inversions(ends: &mut [(usize, usize)], width: usize) -> usize {
    ends.sort_unstable();

    // Fenwick tree over lower positions seen so far
    let mut tree = vec![0usize; width + 1];
    let mut crossings = 0;
    for (seen, &(_, lower)) in ends.iter().enumerate() {
        let mut i = lower + 1;
        let mut not_right = 0;
        while i > 0 {
            not_right += tree[i];
            i -= i & i.wrapping_neg();
        }
        crossings += seen - not_right;

        let mut i = lower + 1;
        while i <= width {
            tree[i] += 1;
            i += i & i.wrapping_neg();
        }
    }
    crossings
}

impl<N, E> Layers<N, E>
where
    N: Copy + Ord + Hash,
    E: Copy,
{
    fn link_ends(&self, upper_layer: usize) -> Vec<(usize, usize)> {
        self.links
            .get(upper_layer)
            .into_iter()
            .flatten()
            .filter_map(|link| {
                Some((
                    self.flat_position(link.upper)?,
                    self.flat_position(link.lower)?,
                ))
            })
            .collect()
    }

    /// Crossings between layer `upper_layer` and the one below it
    fn pair_crossings(&self, upper_layer: usize) -> usize {
        let Some(lower) = self.layers.get(upper_layer + 1) else {
            return 0;
        };
        count_inversions(&mut self.link_ends(upper_layer), lower.len())
    }

    /// Total number of link crossings of the current order
    pub fn crossings(&self) -> usize {
        (0..self.links.len()).map(|k| self.pair_crossings(k)).sum()
    }

    /// Crossings attributed to `node`
    ///
    /// A crossing between two links belongs to the leftmost of their lower
    /// ends, so these counts add up to [`Layers::crossings`].
    pub fn node_crossings(&self, node: LayoutNode<N>) -> usize {
        let (Some(slot), Some(position)) = (self.slot(node), self.flat_position(node)) else {
            return 0;
        };
        if slot.layer == 0 {
            return 0;
        }
        let own: Vec<usize> = self
            .neighbors_up(node)
            .iter()
            .filter_map(|&n| self.flat_position(n))
            .collect();
        self.link_ends(slot.layer - 1)
            .into_iter()
            .filter(|&(_, lower)| lower > position)
            .map(|(upper, _)| own.iter().filter(|&&mine| mine > upper).count())
            .sum()
    }

    /// Crossings on both sides of one layer
    fn local_crossings(&self, layer: usize) -> usize {
        let above = layer.checked_sub(1).map_or(0, |k| self.pair_crossings(k));
        above + self.pair_crossings(layer)
    }

    fn swap(&mut self, layer: usize, chunk: Chunk, i: usize) {
        let nodes = &mut self.layers[layer].chunks[chunk.index()];
        nodes.swap(i, i + 1);
        let (left, right) = (nodes[i], nodes[i + 1]);
        self.index.insert(left, Slot { layer, chunk, position: i });
        self.index.insert(right, Slot { layer, chunk, position: i + 1 });
    }

    /// Sort every chunk of `layer` by the mean position of its neighbours in
    /// the adjacent fixed layer; nodes without such neighbours keep theirs
    fn sort_by_barycenter(&mut self, layer: usize, downward: bool) {
        for chunk in Chunk::ALL {
            let mut keyed: Vec<(f64, LayoutNode<N>)> = self.layers[layer].chunks[chunk.index()]
                .iter()
                .map(|&node| {
                    let fixed = if downward {
                        self.neighbors_up(node)
                    } else {
                        self.neighbors_down(node)
                    };
                    let positions: Vec<usize> =
                        fixed.iter().filter_map(|&n| self.flat_position(n)).collect();
                    let key = if positions.is_empty() {
                        self.flat_position(node).unwrap_or(0) as f64
                    } else {
                        positions.iter().sum::<usize>() as f64 / positions.len() as f64
                    };
                    (key, node)
                })
                .collect();
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
            self.layers[layer].chunks[chunk.index()] =
                keyed.into_iter().map(|(_, node)| node).collect();
        }
        self.reindex(layer);
    }

    /// Swap neighbours within each chunk whenever that strictly reduces the
    /// crossings around the layer
    fn transpose(&mut self, layer: usize) {
        for chunk in Chunk::ALL {
            let len = self.layers[layer].chunks[chunk.index()].len();
            for i in 0..len.saturating_sub(1) {
                let before = self.local_crossings(layer);
                self.swap(layer, chunk, i);
                if self.local_crossings(layer) >= before {
                    self.swap(layer, chunk, i);
                }
            }
        }
    }

    /// Alternate downward and upward sweeps of barycenter ordering and
    /// transposition
    ///
    /// A sweep that ends with more crossings than it started with is
    /// undone, so the count never grows. Sweeping stops early once two
    /// sweeps in a row improve by at most `min_improvement`.
    pub(crate) fn minimize(&mut self, max_iterations: usize, min_improvement: usize) {
        let initial = self.crossings();
        let mut best = initial;
        let mut iterations = Vec::new();
        let mut stale = 0;
        let mut settled = best == 0;

        for iteration in 0..max_iterations {
            if settled {
                break;
            }
            let snapshot: Vec<_> = self.layers.iter().map(|layer| layer.chunks.clone()).collect();

            let downward = iteration % 2 == 0;
            let order: Vec<usize> = if downward {
                (1..self.layers.len()).collect()
            } else {
                (0..self.layers.len().saturating_sub(1)).rev().collect()
            };
            for layer in order {
                self.sort_by_barycenter(layer, downward);
                self.transpose(layer);
            }

            let mut current = self.crossings();
            if current > best {
                for (layer, chunks) in self.layers.iter_mut().zip(snapshot) {
                    layer.chunks = chunks;
                }
                self.reindex_all();
                current = best;
            }
            let improvement = best - current;
            best = current;
            iterations.push(best);
            trace!(iteration, crossings = best, "crossing minimization sweep");

            if best == 0 {
                settled = true;
            } else if improvement <= min_improvement {
                stale += 1;
                settled = stale >= 2;
            } else {
                stale = 0;
            }
        }

        self.report = CrossingReport {
            initial,
            iterations,
            crossings: best,
            settled,
        };
    }
}
