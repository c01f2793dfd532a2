//! Mesh module providing the static tetrahedral topology and common functionality.
//!
//! This module contains:
//! - Common data structures (vertex ids, edges, triangles, tetrahedra)
//! - The tetrahedral topology shared by soft body instances
//! - A few built-in topologies
//! - Shared traits for translation and bounding box operations

pub mod common;
pub mod primitives;
pub mod tetrahedral;

// Re-export common types for convenience
pub use common::{
    Edge, EdgeId, Result, Spatial, Tetrahedron, TetrahedronId, Triangle, VertexId,
    dedup_with_warning,
};

pub use tetrahedral::{TetConstraintValues, TetConstraints, TetTopology};
