//! Renderer-facing state for a loaded pedigree
//!
//! [`PedigreeView`] tracks which individuals are visible, split between a
//! root and an optional second root whose descendants are compared side
//! by side, and keeps the layered layout of the visible individuals up to
//! date. Relatives can be expanded or collapsed one [`Direction`] at a
//! time. Every change of the visible set relayouts, reusing the previous
//! layout to keep individuals in place.

use anyhow::{Context, Result};
use graph_layout::{LayeredLayout, Layers, LayoutNode, Point, Selection};
use pedigree::{IndividualId, Pedigree, Relation, RelationCounts};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

pub use graph_layout::Chunk;

pub type PedigreeLayers = Layers<IndividualId, Relation>;

/// Which relatives an expand or collapse acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Parents
    Up,
    /// Spouses
    Horizontal,
    /// Children
    Down,
}

pub struct PedigreeView {
    pedigree: Pedigree,
    engine: LayeredLayout,
    root: Option<IndividualId>,
    second_root: Option<IndividualId>,
    a: Vec<IndividualId>,
    b: Vec<IndividualId>,
    visible: HashSet<IndividualId>,
    layers: Option<PedigreeLayers>,
}

impl PedigreeView {
    pub fn new(pedigree: Pedigree, engine: LayeredLayout) -> Self {
        Self {
            pedigree,
            engine,
            root: None,
            second_root: None,
            a: Vec::new(),
            b: Vec::new(),
            visible: HashSet::new(),
            layers: None,
        }
    }

    pub fn pedigree(&self) -> &Pedigree {
        &self.pedigree
    }

    pub fn root(&self) -> Option<IndividualId> {
        self.root
    }

    pub fn second_root(&self) -> Option<IndividualId> {
        self.second_root
    }

    fn require(&self, name: &str) -> Result<IndividualId> {
        self.pedigree
            .graph()
            .require(name)
            .with_context(|| format!("Cannot select individual {name}"))
    }

    /// Show `name` and its descendants, dropping any comparison
    pub fn set_root(&mut self, name: &str) -> Result<()> {
        let root = self.require(name)?;
        debug!("Root set to {name}");
        self.root = Some(root);
        self.second_root = None;
        self.a = self.pedigree.graph().iter_down(root).collect();
        self.b.clear();
        self.relayout()
    }

    /// Compare the descendants of `name` with those of the current root
    pub fn show_second_root(&mut self, name: &str) -> Result<()> {
        let second = self.require(name)?;
        debug!("Second root set to {name}");
        self.second_root = Some(second);
        self.b = self.pedigree.graph().iter_down(second).collect();
        self.relayout()
    }

    pub fn hide_second_root(&mut self) -> Result<()> {
        self.second_root = None;
        self.b.clear();
        self.relayout()
    }

    /// Replace both visible sets, e.g. after expanding or collapsing
    /// relatives
    pub fn set_visible(
        &mut self,
        a: impl IntoIterator<Item = IndividualId>,
        b: impl IntoIterator<Item = IndividualId>,
    ) -> Result<()> {
        self.a = a.into_iter().collect();
        self.b = b.into_iter().collect();
        self.relayout()
    }

    fn relatives(&self, id: IndividualId, direction: Direction) -> Vec<IndividualId> {
        let graph = self.pedigree.graph();
        match direction {
            Direction::Up => graph.parents(id).collect(),
            Direction::Horizontal => graph.spouses(id).collect(),
            Direction::Down => graph.children(id).collect(),
        }
    }

    /// Show the hidden relatives of a visible individual in `direction`,
    /// on the same side of the comparison as the individual
    pub fn expand(&mut self, id: IndividualId, direction: Direction) -> Result<()> {
        if !self.is_visible(id) {
            return Ok(());
        }
        let hidden: Vec<IndividualId> = self
            .relatives(id, direction)
            .into_iter()
            .filter(|&other| !self.is_visible(other))
            .collect();
        if hidden.is_empty() {
            return Ok(());
        }
        debug!("Expanding {} {direction:?}", self.pedigree.graph().name(id));
        if self.a.contains(&id) {
            self.a.extend(&hidden);
        }
        if self.b.contains(&id) {
            self.b.extend(&hidden);
        }
        self.relayout()
    }

    /// Hide the visible relatives of `id` in `direction` along with every
    /// individual no longer connected to `id`
    pub fn collapse(&mut self, id: IndividualId, direction: Direction) -> Result<()> {
        if !self.is_visible(id) {
            return Ok(());
        }
        let removed: HashSet<IndividualId> = self
            .relatives(id, direction)
            .into_iter()
            .filter(|&other| self.is_visible(other))
            .collect();
        if removed.is_empty() {
            return Ok(());
        }
        debug!("Collapsing {} {direction:?}", self.pedigree.graph().name(id));
        let remaining: HashSet<IndividualId> = self.visible.difference(&removed).copied().collect();
        let kept = self.connected_within(id, &remaining);
        self.a.retain(|other| kept.contains(other));
        self.b.retain(|other| kept.contains(other));
        self.relayout()
    }

    /// Expand when any relative in `direction` is hidden, collapse otherwise
    pub fn toggle(&mut self, id: IndividualId, direction: Direction) -> Result<()> {
        let relatives = self.relatives(id, direction);
        if relatives.iter().any(|&other| !self.is_visible(other)) {
            self.expand(id, direction)
        } else {
            self.collapse(id, direction)
        }
    }

    /// Members of `within` reachable from `id` through relations between
    /// members of `within`
    fn connected_within(
        &self,
        id: IndividualId,
        within: &HashSet<IndividualId>,
    ) -> HashSet<IndividualId> {
        let graph = self.pedigree.graph();
        let mut kept = HashSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if !kept.insert(current) {
                continue;
            }
            queue.extend(
                graph
                    .nuclear_relations(current)
                    .map(|(other, _)| other)
                    .filter(|other| within.contains(other) && !kept.contains(other)),
            );
        }
        kept
    }

    pub fn is_visible(&self, id: IndividualId) -> bool {
        self.visible.contains(&id)
    }

    /// Layers of the visible individuals, `None` before anything is shown
    pub fn layers(&self) -> Option<&PedigreeLayers> {
        self.layers.as_ref()
    }

    /// Chunk the individual was placed in
    pub fn chunk(&self, id: IndividualId) -> Option<Chunk> {
        self.layers.as_ref()?.slot(LayoutNode::Real(id)).map(|slot| slot.chunk)
    }

    /// Parents, spouses and children of `id` that are not shown
    pub fn hidden_relations(&self, id: IndividualId) -> RelationCounts {
        let mut counts = RelationCounts::default();
        for (other, relation) in self.pedigree.graph().nuclear_relations(id) {
            if !self.is_visible(other) {
                counts.add(relation);
            }
        }
        counts
    }

    /// Coordinates of every laid out node, routing nodes included
    pub fn positions(&self) -> HashMap<LayoutNode<IndividualId>, Point> {
        self.layers
            .as_ref()
            .map(|layers| self.engine.compute_positions(layers))
            .unwrap_or_default()
    }

    fn relayout(&mut self) -> Result<()> {
        let graph = self.pedigree.graph();
        let selection = Selection::with_comparison(self.a.iter().copied(), self.b.iter().copied());
        let ranks = |id: IndividualId| graph.generation(id);

        let layers = self
            .engine
            .compute_layers(graph.relations(), &selection, &ranks, self.layers.as_ref())
            .context("Failed to lay out the visible individuals")?;
        debug!(
            "Laid out {} individuals in {} layers with {} crossings",
            selection.len(),
            layers.layers().len(),
            layers.report().crossings
        );

        self.visible = selection.iter().collect();
        self.layers = Some(layers);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pedigree::{NoProgress, PedigreeConfig};
    use test_log::test;

    /// 1 + 2 -> 3, 3 + 4 -> 5
    const FAMILY: &str = "personID\tpaID\tmaID\tsex\taffected\n\
                          1\t0\t0\tM\t0\n\
                          2\t0\t0\tF\t0\n\
                          3\t1\t2\tM\t1\n\
                          4\t0\t0\tF\t0\n\
                          5\t3\t4\tF\t1\n";

    fn view() -> PedigreeView {
        let pedigree =
            Pedigree::from_reader(FAMILY.as_bytes(), &PedigreeConfig::default(), &mut NoProgress)
                .unwrap();
        PedigreeView::new(pedigree, LayeredLayout::default())
    }

    fn id(view: &PedigreeView, name: &str) -> IndividualId {
        view.pedigree().graph().require(name).unwrap()
    }

    #[test]
    fn root_shows_its_descendants() {
        let mut view = view();
        assert!(view.layers().is_none());
        view.set_root("1").unwrap();

        for name in ["1", "3", "5"] {
            assert!(view.is_visible(id(&view, name)));
        }
        assert!(!view.is_visible(id(&view, "2")));
        assert_eq!(view.layers().unwrap().layers().len(), 3);
        assert_eq!(view.positions().len(), 3);
    }

    #[test]
    fn hidden_relations_count_what_is_not_shown() {
        let mut view = view();
        view.set_root("1").unwrap();

        assert_eq!(
            view.hidden_relations(id(&view, "1")),
            RelationCounts { parents: 0, spouses: 1, children: 0 }
        );
        assert_eq!(
            view.hidden_relations(id(&view, "3")),
            RelationCounts { parents: 1, spouses: 1, children: 0 }
        );
    }

    #[test]
    fn second_root_splits_chunks() {
        let mut view = view();
        view.set_root("1").unwrap();
        view.show_second_root("4").unwrap();

        assert_eq!(view.chunk(id(&view, "1")), Some(Chunk::A));
        assert_eq!(view.chunk(id(&view, "3")), Some(Chunk::A));
        assert_eq!(view.chunk(id(&view, "4")), Some(Chunk::B));
        assert_eq!(view.chunk(id(&view, "5")), Some(Chunk::Both));

        view.hide_second_root().unwrap();
        assert_eq!(view.chunk(id(&view, "5")), Some(Chunk::A));
        assert!(!view.is_visible(id(&view, "4")));
    }

    #[test]
    fn visible_sets_can_be_replaced() {
        let mut view = view();
        let one = id(&view, "1");
        view.set_visible([one], []).unwrap();
        assert_eq!(
            view.hidden_relations(one),
            RelationCounts { parents: 0, spouses: 1, children: 1 }
        );
    }

    #[test]
    fn expand_and_collapse_parents() {
        let mut view = view();
        view.set_root("1").unwrap();
        let three = id(&view, "3");

        view.expand(three, Direction::Up).unwrap();
        assert!(view.is_visible(id(&view, "2")));
        assert_eq!(view.chunk(id(&view, "2")), Some(Chunk::A));
        assert_eq!(view.hidden_relations(three).parents, 0);

        view.collapse(three, Direction::Up).unwrap();
        for name in ["1", "2"] {
            assert!(!view.is_visible(id(&view, name)));
        }
        assert!(view.is_visible(three));
        assert!(view.is_visible(id(&view, "5")));
        assert_eq!(view.layers().unwrap().layers().len(), 2);
    }

    #[test]
    fn collapse_drops_disconnected_individuals() {
        let mut view = view();
        view.set_root("1").unwrap();
        view.collapse(id(&view, "1"), Direction::Down).unwrap();

        assert!(view.is_visible(id(&view, "1")));
        // 5 only hung on through 3
        assert!(!view.is_visible(id(&view, "3")));
        assert!(!view.is_visible(id(&view, "5")));
        assert_eq!(view.positions().len(), 1);
    }

    #[test]
    fn toggle_switches_between_expand_and_collapse() {
        let mut view = view();
        view.set_root("1").unwrap();
        let [three, four] = ["3", "4"].map(|name| id(&view, name));

        view.toggle(three, Direction::Horizontal).unwrap();
        assert!(view.is_visible(four));

        view.toggle(three, Direction::Horizontal).unwrap();
        assert!(!view.is_visible(four));
        for name in ["1", "3", "5"] {
            assert!(view.is_visible(id(&view, name)));
        }
    }

    #[test]
    fn hidden_individuals_are_not_expanded() {
        let mut view = view();
        view.set_root("3").unwrap();
        let one = id(&view, "1");
        view.expand(one, Direction::Horizontal).unwrap();
        view.collapse(one, Direction::Down).unwrap();
        assert!(!view.is_visible(one));
        assert!(!view.is_visible(id(&view, "2")));
    }

    #[test]
    fn individuals_without_generation_share_the_youngest_layer() {
        // 7, 8 and 9 are each other's fathers, so no leaf reaches them
        let text = "personID\tpaID\tmaID\tsex\taffected\n\
                    1\t0\t0\tM\t0\n\
                    2\t0\t0\tF\t0\n\
                    3\t1\t2\tM\t1\n\
                    7\t8\t0\tM\t0\n\
                    8\t9\t0\tM\t0\n\
                    9\t7\t0\tM\t0\n";
        let pedigree =
            Pedigree::from_reader(text.as_bytes(), &PedigreeConfig::default(), &mut NoProgress)
                .unwrap();
        let mut view = PedigreeView::new(pedigree, LayeredLayout::default());
        let [one, three, seven, eight, nine] =
            ["1", "3", "7", "8", "9"].map(|name| id(&view, name));
        assert_eq!(view.pedigree().graph().generation(seven), None);

        view.set_visible([one, three, seven, eight, nine], []).unwrap();
        let layers = view.layers().unwrap();
        assert_eq!(layers.layers().len(), 2);
        let youngest = layers.slot(LayoutNode::Real(three)).unwrap().layer;
        for node in [seven, eight, nine] {
            assert_eq!(layers.slot(LayoutNode::Real(node)).unwrap().layer, youngest);
        }
        assert_eq!(layers.layers()[youngest].rank(), 0.0);
    }

    #[test]
    fn unknown_root_is_an_error() {
        let mut view = view();
        assert!(view.set_root("42").is_err());
        assert!(view.root().is_none());
    }
}
