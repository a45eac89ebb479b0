use super::{Chunk, Layers, LayoutNode};
use crate::{Point, Vec2};
use std::collections::HashMap;
use std::hash::Hash;

/// Assign coordinates to nodes based on their layer structure
///
/// Layers are spread vertically in proportion to their rank, so uneven
/// rank gaps show up as uneven spacing. Within a layer nodes are placed
/// left to right with an extra gap after each non-empty chunk.
pub(crate) fn assign_coordinates<N, E>(
    layers: &Layers<N, E>,
    margin: Vec2,
) -> HashMap<LayoutNode<N>, Point>
where
    N: Copy + Ord + Hash,
    E: Copy,
{
    let mut positions = HashMap::new();
    let (Some(top), Some(bottom)) = (layers.layers.first(), layers.layers.last()) else {
        return positions;
    };
    let span = bottom.rank - top.rank;
    let height = margin.y * layers.layers.len().saturating_sub(1) as f32;

    for layer in &layers.layers {
        let t = if span > 0.0 {
            (layer.rank - top.rank) / span
        } else {
            0.0
        };
        let y = t as f32 * height;

        let mut x = 0.0;
        for chunk in Chunk::ALL {
            let nodes = layer.chunk(chunk);
            for &node in nodes {
                positions.insert(node, Point::new(x, y));
                x += margin.x;
            }
            if !nodes.is_empty() {
                x += margin.x;
            }
        }
    }

    positions
}
