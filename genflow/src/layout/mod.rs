//! Roadmap graph model and tree layout.
//!
//! [`layout`] turns whatever node/edge soup the model produced into a
//! leveled tree with deterministic positions, synthesizing edges when the
//! model gave none.

mod engine;
mod graph;

pub use engine::{layout, layout_with, LayoutConfig, DEFAULT_EDGE_TYPE, MAX_FALLBACK_ROOTS};
pub use graph::{NodeKind, Position, RoadmapEdge, RoadmapGraph, RoadmapNode};
