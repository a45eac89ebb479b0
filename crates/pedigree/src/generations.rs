use crate::graph::{IndividualId, PedigreeGraph};
use std::collections::HashMap;
use tracing::debug;

/// Observed span of generation values, used to normalise layer heights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationRange {
    pub min: f64,
    pub max: f64,
}

impl Default for GenerationRange {
    fn default() -> Self {
        Self { min: 0.0, max: 0.0 }
    }
}

impl GenerationRange {
    fn widen(&mut self, generation: f64) {
        self.min = self.min.min(generation);
        self.max = self.max.max(generation);
    }

    /// Position of `generation` within the range, `0.0` at the oldest
    /// generation and `1.0` at the youngest
    pub fn normalize(&self, generation: f64) -> f64 {
        if self.max == self.min {
            1.0
        } else {
            (generation - self.min) / (self.max - self.min)
        }
    }
}

/// Assign every individual the mean of the depths observed from each leaf
/// that reaches it
///
/// Each leaf contributes `0` for itself and `-n` for an ancestor `n` parent
/// steps up. Individuals no leaf reaches have their generation cleared.
/// Running it twice on the same graph gives the same values.
pub fn assign_generations(graph: &mut PedigreeGraph) -> GenerationRange {
    let mut observations: HashMap<IndividualId, (i64, u32)> = HashMap::new();
    for &leaf in graph.row_order() {
        if !graph.is_leaf(leaf) {
            continue;
        }
        for (ancestor, depth) in graph.iter_generations(leaf) {
            let (sum, count) = observations.entry(ancestor).or_default();
            *sum += i64::from(depth);
            *count += 1;
        }
    }

    let column = graph.columns().generation.clone();
    let mut range = GenerationRange::default();
    let mut unassigned = 0;
    for id in graph.row_order().to_vec() {
        match observations.get(&id) {
            Some(&(sum, count)) => {
                let generation = sum as f64 / f64::from(count);
                range.widen(generation);
                graph.set_attribute(id, &column, generation);
            }
            None => {
                unassigned += 1;
                graph.clear_attribute(id, &column);
            }
        }
    }

    debug!(min = range.min, max = range.max, unassigned, "assigned generations");
    range
}
