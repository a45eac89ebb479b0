use crate::attributes::{AttributeStore, Value};
use crate::config::ColumnNames;
use crate::error::{PedigreeError, Result};
use derive_more::{From, Into};
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Dense handle of an individual, allocated in first-seen order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct IndividualId(u32);

impl IndividualId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a directed family edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    ChildToParent,
    ParentToChild,
    HusbandToWife,
    WifeToHusband,
}

impl Relation {
    pub fn inverse(self) -> Self {
        match self {
            Relation::ChildToParent => Relation::ParentToChild,
            Relation::ParentToChild => Relation::ChildToParent,
            Relation::HusbandToWife => Relation::WifeToHusband,
            Relation::WifeToHusband => Relation::HusbandToWife,
        }
    }

    pub fn is_spouse(self) -> bool {
        matches!(self, Relation::HusbandToWife | Relation::WifeToHusband)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Sex {
    /// Normalise a raw sex cell: the first letter decides, `1`/`2` are
    /// aliases for male/female
    pub fn parse(raw: &str) -> Self {
        match raw.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('M') | Some('1') => Sex::Male,
            Some('F') | Some('2') => Sex::Female,
            _ => Sex::Unknown,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::Unknown => "?",
        }
    }
}

/// Number of nuclear-family links of one individual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelationCounts {
    pub parents: usize,
    pub spouses: usize,
    pub children: usize,
}

impl RelationCounts {
    pub fn add(&mut self, relation: Relation) {
        match relation {
            Relation::ChildToParent => self.parents += 1,
            Relation::ParentToChild => self.children += 1,
            Relation::HusbandToWife | Relation::WifeToHusband => self.spouses += 1,
        }
    }
}

/// Directed family graph with a typed edge per relationship
///
/// Every parent link is stored in both directions. Spouse links are only
/// added once the statistics have been computed, so the traversals used
/// for generation and kinship only ever see parent/child edges. Relation
/// iteration follows edge insertion order.
///
/// Traversals guard against revisits but do not reject cycles: a
/// pedigree in which someone is their own ancestor terminates silently.
#[derive(Debug, Clone)]
pub struct PedigreeGraph {
    graph: DiGraphMap<IndividualId, Relation>,
    names: Vec<String>,
    index: HashMap<String, IndividualId>,
    row_order: Vec<IndividualId>,
    attributes: AttributeStore,
    columns: ColumnNames,
}

impl PedigreeGraph {
    pub fn new(columns: ColumnNames, max_categories: usize) -> Self {
        Self {
            graph: DiGraphMap::new(),
            names: Vec::new(),
            index: HashMap::new(),
            row_order: Vec::new(),
            attributes: AttributeStore::new(max_categories),
            columns,
        }
    }

    pub fn columns(&self) -> &ColumnNames {
        &self.columns
    }

    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut AttributeStore {
        &mut self.attributes
    }

    /// The underlying edge set, for algorithms generic over petgraph traits
    pub fn relations(&self) -> &DiGraphMap<IndividualId, Relation> {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Individuals in table order, followed by parents that were only ever
    /// referenced
    pub fn row_order(&self) -> &[IndividualId] {
        &self.row_order
    }

    pub fn id(&self, name: &str) -> Option<IndividualId> {
        self.index.get(name).copied()
    }

    /// Like [`PedigreeGraph::id`] but failing on unknown names
    pub fn require(&self, name: &str) -> Result<IndividualId> {
        self.id(name)
            .ok_or_else(|| PedigreeError::UnknownIndividual(name.to_string()))
    }

    pub fn name(&self, id: IndividualId) -> &str {
        &self.names[id.index()]
    }

    /// Look up or allocate the individual called `name`
    pub(crate) fn ensure(&mut self, name: &str) -> IndividualId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = IndividualId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        self.graph.add_node(id);
        self.attributes.push_individual();
        id
    }

    pub(crate) fn push_row(&mut self, id: IndividualId) {
        self.row_order.push(id);
    }

    /// Append every individual not yet in the row order, in first-seen order
    pub(crate) fn complete_row_order(&mut self) {
        let listed: HashSet<IndividualId> = self.row_order.iter().copied().collect();
        let missing: Vec<IndividualId> = (0..self.names.len() as u32)
            .map(IndividualId)
            .filter(|id| !listed.contains(id))
            .collect();
        self.row_order.extend(missing);
    }

    /// Add `relation` from `a` to `b` together with its inverse
    pub(crate) fn link(&mut self, a: IndividualId, b: IndividualId, relation: Relation) {
        if a == b {
            return;
        }
        self.graph.add_edge(a, b, relation);
        self.graph.add_edge(b, a, relation.inverse());
    }

    /// Link the father and mother of every child that has both, once per
    /// child
    pub(crate) fn add_spouse_links(&mut self) -> usize {
        let couples: Vec<_> = self
            .row_order
            .iter()
            .filter_map(|&child| Some((self.father(child)?, self.mother(child)?)))
            .collect();
        for &(father, mother) in &couples {
            self.link(father, mother, Relation::HusbandToWife);
        }
        couples.len()
    }

    pub fn link_kind(&self, a: IndividualId, b: IndividualId) -> Option<Relation> {
        self.graph.edge_weight(a, b).copied()
    }

    /// Every nuclear-family link of `id` with its kind
    pub fn nuclear_relations(
        &self,
        id: IndividualId,
    ) -> impl Iterator<Item = (IndividualId, Relation)> + '_ {
        self.graph.edges(id).map(|(_, other, &relation)| (other, relation))
    }

    fn related(&self, id: IndividualId, kind: Relation) -> impl Iterator<Item = IndividualId> + '_ {
        self.nuclear_relations(id)
            .filter(move |&(_, relation)| relation == kind)
            .map(|(other, _)| other)
    }

    pub fn parents(&self, id: IndividualId) -> impl Iterator<Item = IndividualId> + '_ {
        self.related(id, Relation::ChildToParent)
    }

    pub fn children(&self, id: IndividualId) -> impl Iterator<Item = IndividualId> + '_ {
        self.related(id, Relation::ParentToChild)
    }

    pub fn spouses(&self, id: IndividualId) -> impl Iterator<Item = IndividualId> + '_ {
        self.nuclear_relations(id)
            .filter(|&(_, relation)| relation.is_spouse())
            .map(|(other, _)| other)
    }

    /// Every parent of every child of `id`, `id` included, without repeats
    pub fn co_parents(&self, id: IndividualId) -> Vec<IndividualId> {
        let mut seen = HashSet::new();
        self.children(id)
            .flat_map(|child| self.parents(child))
            .filter(|&parent| seen.insert(parent))
            .collect()
    }

    pub fn relation_counts(&self, id: IndividualId) -> RelationCounts {
        let mut counts = RelationCounts::default();
        for (_, relation) in self.nuclear_relations(id) {
            counts.add(relation);
        }
        counts
    }

    pub fn is_root(&self, id: IndividualId) -> bool {
        self.parents(id).next().is_none()
    }

    pub fn is_leaf(&self, id: IndividualId) -> bool {
        self.children(id).next().is_none()
    }

    pub fn father(&self, id: IndividualId) -> Option<IndividualId> {
        self.parents(id).find(|&p| self.sex(p) == Sex::Male)
    }

    pub fn mother(&self, id: IndividualId) -> Option<IndividualId> {
        self.parents(id).find(|&p| self.sex(p) == Sex::Female)
    }

    /// Breadth-first walk over `next`, starting at and including `start`
    fn bfs<F, I>(&self, start: IndividualId, next: F) -> Vec<IndividualId>
    where
        F: Fn(IndividualId) -> I,
        I: Iterator<Item = IndividualId>,
    {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current);
            queue.extend(next(current));
        }
        order
    }

    /// `id` and all of its ancestors
    pub fn iter_up(&self, id: IndividualId) -> impl Iterator<Item = IndividualId> {
        self.bfs(id, |p| self.parents(p)).into_iter()
    }

    /// `id` and all of its descendants
    pub fn iter_down(&self, id: IndividualId) -> impl Iterator<Item = IndividualId> {
        self.bfs(id, |p| self.children(p)).into_iter()
    }

    /// Descendants of `id` (itself included), then any of their spouses not
    /// already listed
    pub fn iter_down_with_spouses(&self, id: IndividualId) -> impl Iterator<Item = IndividualId> {
        let mut down = self.bfs(id, |p| self.children(p));
        let listed: HashSet<IndividualId> = down.iter().copied().collect();
        let mut extra = HashSet::new();
        let spouses: Vec<IndividualId> = down
            .iter()
            .flat_map(|&p| self.spouses(p))
            .filter(|s| !listed.contains(s) && extra.insert(*s))
            .collect();
        down.extend(spouses);
        down.into_iter()
    }

    /// Ancestors of `id` with their depth relative to it: `id` is 0 and
    /// every parent step subtracts one
    pub fn iter_generations(&self, id: IndividualId) -> impl Iterator<Item = (IndividualId, i32)> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([(id, 0)]);
        while let Some((current, depth)) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            order.push((current, depth));
            queue.extend(self.parents(current).map(|p| (p, depth - 1)));
        }
        order.into_iter()
    }

    /// Unit-weight distances from `from` to every individual reachable
    /// through parent/child links, spouse links ignored
    pub fn lineage_distances(&self, from: IndividualId) -> HashMap<IndividualId, usize> {
        let mut distances = HashMap::from([(from, 0)]);
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            let next = distances[&current] + 1;
            for (other, relation) in self.nuclear_relations(current) {
                if relation.is_spouse() || distances.contains_key(&other) {
                    continue;
                }
                distances.insert(other, next);
                queue.push_back(other);
            }
        }
        distances
    }

    /// Lineage distances from `from` to each of `targets` it is connected
    /// to
    ///
    /// The search stops as soon as every target is reached, and only the
    /// targets are kept in the result.
    pub fn lineage_distances_to(
        &self,
        from: IndividualId,
        targets: &[IndividualId],
    ) -> HashMap<IndividualId, usize> {
        let mut pending: HashSet<IndividualId> = targets.iter().copied().collect();
        let mut found = HashMap::with_capacity(pending.len());
        if pending.remove(&from) {
            found.insert(from, 0);
        }

        let mut visited = HashSet::from([from]);
        let mut frontier = vec![from];
        let mut depth = 0;
        while !pending.is_empty() && !frontier.is_empty() {
            depth += 1;
            let mut next = Vec::new();
            for current in frontier {
                for (other, relation) in self.nuclear_relations(current) {
                    if relation.is_spouse() || !visited.insert(other) {
                        continue;
                    }
                    if pending.remove(&other) {
                        found.insert(other, depth);
                    }
                    next.push(other);
                }
            }
            frontier = next;
        }
        found
    }

    /// Individuals whose generation lies within `epsilon` of `generation`
    pub fn individuals_in_generation(&self, generation: f64, epsilon: f64) -> Vec<IndividualId> {
        self.row_order
            .iter()
            .copied()
            .filter(|&id| {
                self.generation(id)
                    .is_some_and(|g| g >= generation - epsilon && g <= generation + epsilon)
            })
            .collect()
    }

    pub fn attribute(&self, id: IndividualId, name: &str) -> Option<&Value> {
        self.attributes.get(id.index(), name)
    }

    /// The attribute value, or `default` when it is null
    pub fn attribute_or(&self, id: IndividualId, name: &str, default: Value) -> Value {
        self.attribute(id, name).cloned().unwrap_or(default)
    }

    pub fn set_attribute(&mut self, id: IndividualId, name: &str, value: impl Into<Value>) {
        self.attributes.set(id.index(), name, Some(value.into()));
    }

    pub fn clear_attribute(&mut self, id: IndividualId, name: &str) {
        self.attributes.set(id.index(), name, None);
    }

    pub fn sex(&self, id: IndividualId) -> Sex {
        self.attribute(id, &self.columns.sex)
            .and_then(Value::as_str)
            .map(Sex::parse)
            .unwrap_or_default()
    }

    pub(crate) fn set_sex(&mut self, id: IndividualId, sex: Sex) {
        let column = self.columns.sex.clone();
        self.set_attribute(id, &column, sex.code());
    }

    pub fn affected(&self, id: IndividualId) -> Option<bool> {
        self.attribute(id, &self.columns.affected)
            .and_then(Value::as_bool)
    }

    /// Relative depth; `None` until generations are assigned, or for
    /// individuals no leaf reaches
    pub fn generation(&self, id: IndividualId) -> Option<f64> {
        self.attribute(id, &self.columns.generation)
            .and_then(Value::as_f64)
    }

    /// Kinship statistic; `None` with fewer than two affected descendants
    pub fn d(&self, id: IndividualId) -> Option<f64> {
        self.attribute(id, &self.columns.d).and_then(Value::as_f64)
    }

    pub fn n_local_descendants(&self, id: IndividualId) -> Option<usize> {
        self.count_attribute(id, &self.columns.n_local_descendants)
    }

    pub fn n_local_affected(&self, id: IndividualId) -> Option<usize> {
        self.count_attribute(id, &self.columns.n_local_affected)
    }

    fn count_attribute(&self, id: IndividualId, name: &str) -> Option<usize> {
        match *self.attribute(id, name)? {
            Value::Integer(i) => usize::try_from(i).ok(),
            _ => None,
        }
    }
}
