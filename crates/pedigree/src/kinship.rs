use crate::error::{PedigreeError, Result};
use crate::graph::{IndividualId, PedigreeGraph};
use std::collections::HashMap;
use tracing::debug;

/// Affected individuals in the downward closure of each individual,
/// itself included, sorted by identifier
#[derive(Debug, Clone, Default)]
pub struct AffectedDescendants {
    lists: HashMap<IndividualId, Vec<IndividualId>>,
}

impl AffectedDescendants {
    pub fn of(&self, id: IndividualId) -> &[IndividualId] {
        self.lists.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    fn contains_both(&self, id: IndividualId, a: IndividualId, b: IndividualId) -> bool {
        let list = self.of(id);
        list.binary_search(&a).is_ok() && list.binary_search(&b).is_ok()
    }
}

/// Flag roots and leaves, count descendants and collect affected
/// descendants
///
/// Descendant counts include the individual itself, as does the affected
/// list of an affected individual. `n_local_aff` temporarily holds the list
/// length until [`score_kinship`] rewrites it.
pub fn count_descendants(graph: &mut PedigreeGraph) -> AffectedDescendants {
    let columns = graph.columns().clone();
    let mut affected = AffectedDescendants::default();
    for id in graph.row_order().to_vec() {
        let descendants: Vec<IndividualId> = graph.iter_down(id).collect();
        let mut list: Vec<IndividualId> = descendants
            .iter()
            .copied()
            .filter(|&d| graph.affected(d) == Some(true))
            .collect();
        list.sort_unstable();

        let (is_root, is_leaf) = (graph.is_root(id), graph.is_leaf(id));
        graph.set_attribute(id, &columns.is_root, is_root);
        graph.set_attribute(id, &columns.is_leaf, is_leaf);
        graph.set_attribute(id, &columns.n_local_descendants, descendants.len());
        graph.set_attribute(id, &columns.n_local_affected, list.len());
        affected.lists.insert(id, list);
    }
    debug!(individuals = affected.lists.len(), "counted descendants");
    affected
}

/// Contribution of one pair of affected descendants to the `d` statistic
pub fn pair_contribution(meioses: usize, common_ancestors: f64) -> f64 {
    let meioses = i32::try_from(meioses).unwrap_or(i32::MAX);
    -(common_ancestors * 0.5f64.powi(meioses.saturating_add(1))).log2()
}

/// Score every individual with at least two affected descendants
///
/// For each pair of affected descendants the meioses are the lineage
/// distance between them, and the common ancestor count is one plus the
/// number of co-parents of the individual whose own affected lists hold
/// both. The sum of pair contributions is divided by `k - 1`. Returns the
/// number of individuals that received a score.
///
/// Distances are searched afresh for each individual and only kept for
/// the pairs being scored.
///
/// # Errors
/// Returns [`PedigreeError::NoPath`] if two descendants of the same
/// individual are not connected, which only happens on a malformed graph.
pub fn score_kinship(graph: &mut PedigreeGraph, affected: &AffectedDescendants) -> Result<usize> {
    let mut scores = Vec::with_capacity(graph.len());

    for &p in graph.row_order() {
        let list = affected.of(p);
        if list.len() < 2 {
            scores.push((p, None));
            continue;
        }
        let co_parents = graph.co_parents(p);
        let mut total = 0.0;
        for (i, &a) in list.iter().enumerate() {
            let rest = &list[i + 1..];
            let from_a = graph.lineage_distances_to(a, rest);
            for &b in rest {
                let meioses = *from_a.get(&b).ok_or_else(|| PedigreeError::NoPath {
                    from: graph.name(a).to_string(),
                    to: graph.name(b).to_string(),
                })?;
                let shared = co_parents
                    .iter()
                    .filter(|&&s| affected.contains_both(s, a, b))
                    .count();
                total += pair_contribution(meioses, 1.0 + shared as f64);
            }
        }
        scores.push((p, Some(total / (list.len() - 1) as f64)));
    }

    let columns = graph.columns().clone();
    let mut scored = 0;
    for (id, score) in scores {
        match score {
            Some(d) => {
                scored += 1;
                graph.set_attribute(id, &columns.d, d);
            }
            None => graph.clear_attribute(id, &columns.d),
        }
        graph.set_attribute(id, &columns.n_local_affected, affected.of(id).len());
    }
    debug!(scored, "computed kinship statistic");
    Ok(scored)
}
