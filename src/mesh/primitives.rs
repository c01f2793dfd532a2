//! Built-in tetrahedral topologies.
//!
//! These are small hand-authored meshes, handy for demos and tests.

use std::f32::consts::SQRT_2;

use super::tetrahedral::TetTopology;

const HALF_SQRT_3: f32 = 0.866_025_4;

/// Which built-in topology to instantiate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Builtin {
    /// A single regular tetrahedron with edge length `sqrt(3)`.
    Tetrahedron,
    /// A unit cube split into five tetrahedra.
    Cube,
}

impl Builtin {
    /// Build the topology.
    #[must_use]
    pub fn topology(self) -> TetTopology {
        match self {
            Self::Tetrahedron => regular_tetrahedron(),
            Self::Cube => cube(),
        }
    }
}

/// A regular tetrahedron resting on the `z = 0` plane with its apex on the z axis.
///
/// # Panics
/// Never, the data is statically well formed.
#[must_use]
pub fn regular_tetrahedron() -> TetTopology {
    #[rustfmt::skip]
    let verts = [
        1.0, 0.0, 0.0,
        -0.5, HALF_SQRT_3, 0.0,
        -0.5, -HALF_SQRT_3, 0.0,
        0.0, 0.0, SQRT_2,
    ];
    TetTopology::from_flat(
        &verts,
        &[0, 1, 2, 3],
        &[0, 1, 1, 2, 2, 0, 0, 3, 2, 3, 1, 3],
        &[0, 1, 2, 0, 2, 3, 0, 3, 1, 1, 3, 2],
    )
    .expect("regular tetrahedron is well formed")
}

/// A unit cube made of one central tetrahedron and four corner tetrahedra.
///
/// The inner tetrahedron is not part of the render surface.
///
/// # Panics
/// Never, the data is statically well formed.
#[must_use]
pub fn cube() -> TetTopology {
    #[rustfmt::skip]
    let verts = [
        0.0, 0.0, 1.0,
        1.0, 1.0, 1.0,
        1.0, 0.0, 0.0,
        0.0, 1.0, 0.0,
        0.0, 0.0, 0.0,
        1.0, 1.0, 0.0,
        1.0, 0.0, 1.0,
        0.0, 1.0, 1.0,
    ];
    #[rustfmt::skip]
    let tet_ids = [
        0, 1, 2, 3,
        0, 3, 2, 4,
        1, 2, 3, 5,
        0, 2, 1, 6,
        0, 1, 3, 7,
    ];
    #[rustfmt::skip]
    let edge_ids = [
        0, 1, 1, 2, 2, 0, 0, 3, 1, 3, 2, 3,
        0, 4, 2, 4, 3, 4,
        1, 5, 2, 5, 3, 5,
        0, 6, 1, 6, 2, 6,
        0, 7, 1, 7, 3, 7,
    ];
    #[rustfmt::skip]
    let tri_ids = [
        0, 3, 4, 4, 3, 2, 0, 4, 2, 2, 3, 0,
        2, 3, 5, 2, 5, 1, 3, 1, 5, 1, 3, 2,
        0, 6, 1, 0, 2, 6, 1, 6, 2, 0, 1, 2,
        0, 7, 3, 0, 1, 7, 1, 3, 7, 0, 3, 1,
    ];
    TetTopology::from_flat(&verts, &tet_ids, &edge_ids, &tri_ids)
        .expect("cube voxel is well formed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;

    #[test]
    fn test_regular_tetrahedron_edges_are_equal() {
        let topology = regular_tetrahedron();
        let expected = 3.0_f32.sqrt();
        for edge in &topology.constraints.edges {
            assert!((edge.value(&topology.vertices) - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_cube_tetrahedra_are_positive_and_fill_the_cube() {
        let topology = cube();
        assert_eq!(topology.num_vertices(), 8);
        assert_eq!(topology.num_tetrahedra(), 5);
        assert_eq!(topology.num_edges(), 18);

        let mut total = 0.0;
        for tet in &topology.constraints.tetrahedra {
            let volume = tet.value(&topology.vertices);
            assert!(volume > 0.0);
            total += volume;
        }
        assert!((total - 1.0).abs() < 1e-5);
    }
}
