//! Tetrahedral topology shared by soft body instances.

use glam::Vec3;
use std::io::Write;
use tracing::{debug, info};

use super::common::{Result, Spatial, TetrahedronId, Triangle, VertexId, dedup_with_warning};
use crate::constraint::Constraint;
use crate::error::TopologyError;
use crate::mesh::{Edge, Tetrahedron};
use crate::particles::Particles;
use crate::xpbd::{ConstraintSet, XpbdParams, process_constraints};

/// Rest values computed from tetrahedral constraints.
#[derive(Clone, Debug, PartialEq)]
pub struct TetConstraintValues {
    /// Edge lengths for distance constraints.
    pub lengths: Vec<f32>,
    /// Signed tetrahedron volumes for volume constraints.
    pub volumes: Vec<f32>,
}

/// Struct to contain constraint data for tetrahedral meshes.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TetConstraints {
    /// Edge constraints for distance preservation.
    pub edges: Vec<Edge>,
    /// Tetrahedral constraints for volume preservation.
    pub tetrahedra: Vec<Tetrahedron>,
}

impl TetConstraints {
    /// Project every edge constraint once, in order.
    pub fn solve_edges(&self, particles: &mut Particles, lengths: &[f32], alpha: f32) {
        process_constraints::<_, _, 2>(
            self.edges.iter().zip(lengths.iter().copied()),
            particles,
            alpha,
        );
    }

    /// Project every volume constraint once, in order.
    pub fn solve_volumes(&self, particles: &mut Particles, volumes: &[f32], alpha: f32) {
        process_constraints::<_, _, 4>(
            self.tetrahedra.iter().zip(volumes.iter().copied()),
            particles,
            alpha,
        );
    }
}

impl ConstraintSet<TetConstraintValues> for TetConstraints {
    fn evaluate(&self, on: &[Vec3]) -> TetConstraintValues {
        let lengths = self.edges.iter().map(|e| e.value(on)).collect();
        let volumes = self.tetrahedra.iter().map(|t| t.value(on)).collect();
        TetConstraintValues { lengths, volumes }
    }

    fn solve(
        &self,
        particles: &mut Particles,
        params: &XpbdParams,
        reference: &TetConstraintValues,
        time_substep: f32,
    ) {
        let dt2 = time_substep * time_substep;
        self.solve_edges(particles, &reference.lengths, params.edge_compliance / dt2);
        self.solve_volumes(particles, &reference.volumes, params.volume_compliance / dt2);
    }
}

/// Static tetrahedral topology: rest coordinates, constraints and render surface.
///
/// Every index is guaranteed to be in `[0, vertices.len())` once constructed
/// through [`TetTopology::from_flat`] or checked with [`TetTopology::validate`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TetTopology {
    /// Rest-pose vertex coordinates.
    pub vertices: Vec<Vec3>,
    /// Constraints for physics simulation.
    pub constraints: TetConstraints,
    /// Outward-facing surface triangles for rendering.
    pub surface: Vec<Triangle>,
}

fn chunks<'a, const N: usize>(
    ids: &'a [u32],
    kind: &'static str,
) -> std::result::Result<impl Iterator<Item = [VertexId; N]> + 'a, TopologyError> {
    if ids.len() % N != 0 {
        return Err(TopologyError::MisalignedArray {
            kind,
            len: ids.len(),
            stride: N,
        });
    }
    Ok(ids
        .chunks_exact(N)
        .map(|c| std::array::from_fn(|k| VertexId(c[k]))))
}

impl TetTopology {
    /// Build a topology from the flat arrays produced by an authoring pipeline.
    ///
    /// `verts` holds 3 floats per vertex, `tet_ids` 4 indices per tetrahedron,
    /// `edge_ids` 2 indices per edge and `tri_ids` 3 indices per surface triangle.
    /// Duplicate edges are dropped with a warning.
    ///
    /// # Errors
    /// Returns an error if an array has the wrong length or an index is out of range.
    #[tracing::instrument(skip_all, fields(
        verts = verts.len(),
        tet_ids = tet_ids.len(),
        edge_ids = edge_ids.len(),
        tri_ids = tri_ids.len()
    ))]
    pub fn from_flat(
        verts: &[f32],
        tet_ids: &[u32],
        edge_ids: &[u32],
        tri_ids: &[u32],
    ) -> std::result::Result<Self, TopologyError> {
        if verts.len() % 3 != 0 {
            return Err(TopologyError::MisalignedArray {
                kind: "vertex",
                len: verts.len(),
                stride: 3,
            });
        }
        let vertices = verts.chunks_exact(3).map(Vec3::from_slice).collect();

        let tetrahedra = chunks::<4>(tet_ids, "tetrahedron")?
            .map(|indices| Tetrahedron { indices })
            .collect();
        let edges = chunks::<2>(edge_ids, "edge")?
            .map(|[a, b]| Edge(a, b))
            .collect();
        let surface = chunks::<3>(tri_ids, "triangle")?
            .map(|verts| Triangle { verts })
            .collect();

        let result = Self {
            vertices,
            constraints: TetConstraints {
                edges: dedup_with_warning(edges, "edge"),
                tetrahedra,
            },
            surface,
        };
        result.validate()?;

        info!(
            vertices = result.vertices.len(),
            edges = result.constraints.edges.len(),
            faces = result.surface.len(),
            tetrahedra = result.constraints.tetrahedra.len(),
            "Topology built"
        );

        Ok(result)
    }

    /// Check that every element references an existing vertex.
    ///
    /// # Errors
    /// Returns the first dangling reference found.
    pub fn validate(&self) -> std::result::Result<(), TopologyError> {
        let count = self.vertices.len();
        let check = |kind: &'static str, element: usize, ids: &[VertexId]| {
            ids.iter()
                .find(|id| id.index() >= count)
                .map_or(Ok(()), |id| {
                    Err(TopologyError::VertexOutOfRange {
                        kind,
                        element,
                        index: id.0,
                        count,
                    })
                })
        };

        for (i, tet) in self.constraints.tetrahedra.iter().enumerate() {
            check("tetrahedron", i, &tet.indices)?;
        }
        for (i, edge) in self.constraints.edges.iter().enumerate() {
            check("edge", i, &[edge.0, edge.1])?;
        }
        for (i, tri) in self.surface.iter().enumerate() {
            check("triangle", i, &tri.verts)?;
        }
        Ok(())
    }

    /// Number of vertices (particles).
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of tetrahedra.
    #[must_use]
    pub fn num_tetrahedra(&self) -> usize {
        self.constraints.tetrahedra.len()
    }

    /// Number of unique edges.
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.constraints.edges.len()
    }

    /// Surface triangle indices flattened into a render index buffer.
    #[must_use]
    pub fn surface_indices(&self) -> Vec<u32> {
        self.surface
            .iter()
            .flat_map(|t| t.verts.map(|v| v.0))
            .collect()
    }

    /// Get the rest-pose corner points of a tetrahedron by its ID.
    ///
    /// # Returns
    /// `None` if the tetrahedron ID is invalid.
    #[must_use]
    pub fn corners(&self, id: TetrahedronId) -> Option<[Vec3; 4]> {
        let tet = self.constraints.tetrahedra.get(id.0 as usize)?;
        Some(tet.indices.map(|v| self.vertices[v.index()]))
    }

    /// Rest-pose bounding box.
    #[must_use]
    pub fn bounding_box(&self) -> (Vec3, Vec3) {
        self.vertices.bounding_box()
    }

    /// Load a topology from bincode file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized, or holds dangling indices.
    #[tracing::instrument]
    pub fn from_bincode(filename: &str) -> Result<Self> {
        let data = std::fs::read(filename)?;
        debug!("Deserializing {} bytes", data.len());
        let topology: Self = bincode::deserialize(&data)?;
        topology.validate()?;
        Ok(topology)
    }

    /// Export topology to bincode format.
    ///
    /// # Errors
    /// Returns an error if serialization fails or file cannot be written.
    #[tracing::instrument(skip(self))]
    pub fn export_to_bincode(&self, output_path: &str) -> Result<()> {
        info!("Serializing to binary format");
        let encoded = bincode::serialize(self)?;

        let mut file = std::fs::File::create(output_path)?;
        file.write_all(&encoded)?;

        info!(
            output_path,
            size_bytes = encoded.len(),
            "Successfully exported topology"
        );

        Ok(())
    }
}
