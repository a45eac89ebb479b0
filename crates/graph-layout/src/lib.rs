//! Generic layered graph layout
//!
//! This crate arranges the nodes of a graph into ranked layers, routes
//! edges that skip layers through virtual nodes and reorders each layer to
//! reduce edge crossings. It works with any graph implementing petgraph's
//! visitor traits.
//!
//! Nodes can be split between two selections that are compared side by
//! side: every layer then holds three chunks, the nodes only in the first
//! selection, the nodes in both and the nodes only in the second.
//!
//! # Example
//!
//! ```
//! use graph_layout::{LayeredLayout, LayoutNode, Selection, Vec2};
//! use petgraph::graphmap::DiGraphMap;
//!
//! // Create a graph
//! let mut graph = DiGraphMap::new();
//! graph.add_edge(1, 2, ());
//! graph.add_edge(2, 3, ());
//! graph.add_edge(1, 3, ());
//!
//! let engine = LayeredLayout::new(Vec2::new(20.0, 20.0));
//!
//! // Rank every node by its identifier
//! let ranks = |node: i32| Some(f64::from(node));
//!
//! // Layers are expensive to compute, cache them
//! let layers = engine
//!     .compute_layers(&graph, &Selection::new([1, 2, 3]), &ranks, None)
//!     .unwrap();
//! assert_eq!(layers.virtual_count(), 1);
//!
//! // Coordinates are cheap to recompute
//! let positions = engine.compute_positions(&layers);
//! assert!(positions.contains_key(&LayoutNode::Real(3)));
//! ```

mod geometry;
mod ranks;

pub mod layered;

// Re-export core types and traits
pub use geometry::{Point, Vec2};
pub use ranks::NodeRanks;

// Re-export petgraph visitor traits for graph abstraction
pub use petgraph::visit::{IntoEdgeReferences, IntoNodeIdentifiers};

// Re-export layered layout types
pub use layered::{
    Chain, Chunk, CrossingReport, Layer, LayeredLayout, LayeredLayoutError, Layers, Link,
    LayoutNode, Selection, Slot, VirtualId,
};
