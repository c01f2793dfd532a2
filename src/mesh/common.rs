//! Common data structures and utilities shared by the topology and the solver.

use glam::Vec3;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Unique identifier for a vertex (particle), zero based.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct VertexId(pub u32);

impl VertexId {
    /// Position of the vertex in the particle buffers.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// An edge connecting two vertices.
///
/// Edges are undirected: `Edge(a, b)` and `Edge(b, a)` compare and hash equal.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Edge(pub VertexId, pub VertexId);

impl Edge {
    fn normalized(&self) -> (VertexId, VertexId) {
        if self.0.0 <= self.1.0 {
            (self.0, self.1)
        } else {
            (self.1, self.0)
        }
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Edge {}

impl std::hash::Hash for Edge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

/// Unique identifier for an edge.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct EdgeId(pub u32);

/// A surface triangle, wound clockwise when viewed from outside the body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Triangle {
    /// Three vertex indices forming the triangle.
    pub verts: [VertexId; 3],
}

/// A tetrahedron defined by four vertex indices.
///
/// The order of `indices` fixes the sign of the volume, so it is preserved as given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Tetrahedron {
    /// Four vertex indices forming the tetrahedron.
    pub indices: [VertexId; 4],
}

/// Unique identifier for a tetrahedron.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TetrahedronId(pub u32);

/// Result type for mesh I/O operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Remove duplicates while keeping the first occurrence of each item in place.
///
/// Constraint order is part of the solver's behaviour, so the surviving items keep
/// their original relative order.
#[tracing::instrument(skip(items), fields(original_count = items.len()))]
pub fn dedup_with_warning<T>(items: Vec<T>, item_name: &str) -> Vec<T>
where
    T: std::hash::Hash + Eq + Clone,
{
    let original_count = items.len();

    let mut seen = HashSet::with_capacity(original_count);
    let deduped: Vec<T> = items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect();

    let duplicate_count = original_count - deduped.len();
    if duplicate_count > 0 {
        warn!(
            "Found {} duplicate {} constraints",
            duplicate_count, item_name
        );
    } else {
        debug!("No duplicate {} constraints found", item_name);
    }

    deduped
}

/// A convenience trait to aggregate "spatial" operations on collections of points.
/// This trait is not intended to be replete with all possible spatial operations, but is instead a conservative interface.
pub trait Spatial {
    /// Translate all points by a vector.
    fn translate(&mut self, by: Vec3);

    /// Get bounding box of the points as (min, max) corners.
    fn bounding_box(&self) -> (Vec3, Vec3);
}

impl Spatial for [Vec3] {
    fn translate(&mut self, by: Vec3) {
        for point in self {
            *point += by;
        }
    }

    fn bounding_box(&self) -> (Vec3, Vec3) {
        if self.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }

        self.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(min, max), &p| (min.min(p), max.max(p)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spatial_translate() {
        let mut points = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 3.0)];

        let translation = Vec3::new(10.0, 20.0, 30.0);
        let original = points.clone();

        points.translate(translation);

        for (moved, start) in points.iter().zip(&original) {
            let expected = *start + translation;
            assert!((*moved - expected).abs().max_element() < f32::EPSILON);
        }
    }

    #[test]
    fn test_spatial_bounding_box() {
        let points = vec![
            Vec3::new(-1.0, -2.0, -3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::new(2.0, 1.0, 0.0),
        ];

        let (min, max) = points.bounding_box();

        assert_eq!(min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(max, Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_spatial_bounding_box_empty() {
        let points: Vec<Vec3> = vec![];

        let (min, max) = points.bounding_box();

        assert_eq!(min, Vec3::ZERO);
        assert_eq!(max, Vec3::ZERO);
    }

    #[test]
    fn test_edge_is_undirected() {
        assert_eq!(
            Edge(VertexId(3), VertexId(7)),
            Edge(VertexId(7), VertexId(3))
        );
        assert_ne!(
            Edge(VertexId(3), VertexId(7)),
            Edge(VertexId(3), VertexId(6))
        );
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_order() {
        let edges = vec![
            Edge(VertexId(2), VertexId(0)),
            Edge(VertexId(0), VertexId(1)),
            Edge(VertexId(0), VertexId(2)),
            Edge(VertexId(1), VertexId(2)),
        ];

        let deduped = dedup_with_warning(edges, "edge");

        assert_eq!(deduped.len(), 3);
        assert_eq!(deduped[0].0, VertexId(2));
        assert_eq!(deduped[1], Edge(VertexId(0), VertexId(1)));
        assert_eq!(deduped[2], Edge(VertexId(1), VertexId(2)));
    }

    #[test]
    fn test_inverted_tetrahedron_is_distinct() {
        let a = Tetrahedron {
            indices: [VertexId(0), VertexId(1), VertexId(2), VertexId(3)],
        };
        let b = Tetrahedron {
            indices: [VertexId(0), VertexId(2), VertexId(1), VertexId(3)],
        };
        assert_ne!(a, b);
    }
}
