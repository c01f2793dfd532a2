//! A deformable body simulated with XPBD edge and volume constraints.

use std::sync::Arc;

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::{
    constraint::Constraint,
    error::TopologyError,
    mesh::{EdgeId, Spatial, TetConstraintValues, TetTopology, TetrahedronId, Triangle, VertexId},
    particles::Particles,
    xpbd::{self, ConstraintSet, XpbdParams},
};

/// A particle currently held by the interaction layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Grab {
    id: VertexId,
    /// Pin state before the grab, restored on release.
    was_pinned: bool,
}

/// Soft body state and solver.
///
/// The topology is shared and read-only; every buffer the solver writes is owned here.
#[derive(Clone, Debug)]
pub struct SoftBody {
    topology: Arc<TetTopology>,
    particles: Particles,
    rest: TetConstraintValues,
    params: XpbdParams,
    grab: Option<Grab>,
    simulate: bool,
}

impl SoftBody {
    /// Instantiate a body from a topology, scaled by `scale` and placed at `start`.
    ///
    /// Each tetrahedron gives a quarter of its volume-proportional mass to each of its
    /// corners, so a particle's inverse mass is the sum of `4 / rest_volume` over its
    /// tetrahedra. Tetrahedra with non-positive rest volume contribute nothing.
    ///
    /// # Errors
    /// Returns an error if the topology references a vertex that does not exist.
    #[tracing::instrument(skip(topology, params), fields(vertices = topology.num_vertices()))]
    pub fn new(
        topology: Arc<TetTopology>,
        start: Vec3,
        scale: f32,
        params: XpbdParams,
    ) -> Result<Self, TopologyError> {
        topology.validate()?;

        let positions: Vec<Vec3> = topology.vertices.iter().map(|v| *v * scale).collect();
        let rest = topology.constraints.evaluate(&positions);

        let mut inv_masses = vec![0.0; positions.len()];
        let mut degenerate = 0_usize;
        for (tet, &volume) in topology.constraints.tetrahedra.iter().zip(&rest.volumes) {
            let p_inv_mass = if volume > 0.0 {
                1.0 / (volume / 4.0)
            } else {
                degenerate += 1;
                0.0
            };
            for id in tet.ids() {
                inv_masses[id.index()] += p_inv_mass;
            }
        }
        if degenerate > 0 {
            warn!(degenerate, "Tetrahedra with non-positive rest volume carry no mass");
        }

        let mut particles = Particles::at_rest(positions, inv_masses);
        particles.positions.translate(start);
        particles.prev_positions.translate(start);

        info!(
            particles = particles.len(),
            edges = rest.lengths.len(),
            tetrahedra = rest.volumes.len(),
            rest_volume = rest.volumes.iter().sum::<f32>(),
            "Soft body initialized"
        );

        Ok(Self {
            topology,
            particles,
            rest,
            params,
            grab: None,
            simulate: true,
        })
    }

    /// Advance the simulation by one fixed timestep.
    ///
    /// Does nothing while simulation is disabled.
    pub fn step(&mut self, dt: f32) {
        if !self.simulate {
            return;
        }
        xpbd::step_basic(
            &self.params,
            &mut self.particles,
            &self.topology.constraints,
            &self.rest,
            dt,
        );
    }

    /// Sub-step phase: gravity, prediction and environment collision.
    pub fn predict(&mut self, time_substep: f32) {
        let bounds = self.params.bounds;
        xpbd::predict(
            &mut self.particles,
            self.params.gravity,
            time_substep,
            |pos, prev| {
                if let Some(bounds) = &bounds {
                    bounds.clamp(pos, prev);
                }
            },
        );
    }

    /// Sub-step phase: every edge, then every tetrahedron, once each.
    pub fn solve_constraints(&mut self, time_substep: f32) {
        self.topology
            .constraints
            .solve(&mut self.particles, &self.params, &self.rest, time_substep);
    }

    /// Project all edge constraints once with the given compliance.
    pub fn solve_edges(&mut self, compliance: f32, time_substep: f32) {
        self.topology.constraints.solve_edges(
            &mut self.particles,
            &self.rest.lengths,
            compliance / (time_substep * time_substep),
        );
    }

    /// Project all volume constraints once with the given compliance.
    pub fn solve_volumes(&mut self, compliance: f32, time_substep: f32) {
        self.topology.constraints.solve_volumes(
            &mut self.particles,
            &self.rest.volumes,
            compliance / (time_substep * time_substep),
        );
    }

    /// Sub-step phase: `vel = (pos - prev) / dt` for movable particles.
    pub fn update_velocities(&mut self, time_substep: f32) {
        xpbd::update_velocities(&mut self.particles, time_substep);
    }

    /// Current particle positions, one per vertex.
    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.particles.positions
    }

    /// Current particle velocities.
    #[must_use]
    pub fn velocities(&self) -> &[Vec3] {
        &self.particles.velocities
    }

    /// Render surface, passed through from the topology.
    #[must_use]
    pub fn surface_triangles(&self) -> &[Triangle] {
        &self.topology.surface
    }

    /// Render surface as a flat index buffer.
    #[must_use]
    pub fn surface_indices(&self) -> Vec<u32> {
        self.topology.surface_indices()
    }

    /// The shared topology.
    #[must_use]
    pub fn topology(&self) -> &Arc<TetTopology> {
        &self.topology
    }

    /// Simulation parameters.
    #[must_use]
    pub fn params(&self) -> &XpbdParams {
        &self.params
    }

    /// Replace the simulation parameters.
    pub fn set_params(&mut self, params: XpbdParams) {
        self.params = params;
    }

    /// Rest lengths and volumes captured at initialization.
    #[must_use]
    pub fn rest_values(&self) -> &TetConstraintValues {
        &self.rest
    }

    /// Inverse mass as seen by the solver; zero while pinned or grabbed.
    #[must_use]
    pub fn inverse_mass(&self, id: VertexId) -> f32 {
        self.particles.inverse_mass(id)
    }

    /// Current length of an edge.
    #[must_use]
    pub fn edge_length(&self, id: EdgeId) -> Option<f32> {
        let edge = self.topology.constraints.edges.get(id.0 as usize)?;
        Some(edge.value(&self.particles.positions))
    }

    /// Current signed volume of a tetrahedron.
    #[must_use]
    pub fn tet_volume(&self, id: TetrahedronId) -> Option<f32> {
        let tet = self.topology.constraints.tetrahedra.get(id.0 as usize)?;
        Some(tet.value(&self.particles.positions))
    }

    /// Sum of the current signed volumes of all tetrahedra.
    #[must_use]
    pub fn total_volume(&self) -> f32 {
        self.topology
            .constraints
            .tetrahedra
            .iter()
            .map(|t| t.value(&self.particles.positions))
            .sum()
    }

    /// Hold a particle in place.
    ///
    /// For the grabbed particle the pin takes effect on release.
    pub fn pin(&mut self, id: VertexId) {
        self.set_pinned(id, true);
    }

    /// Release a pinned particle.
    ///
    /// The grabbed particle stays held until [`SoftBody::end_grab`].
    pub fn unpin(&mut self, id: VertexId) {
        self.set_pinned(id, false);
    }

    fn set_pinned(&mut self, id: VertexId, pinned: bool) {
        match &mut self.grab {
            Some(grab) if grab.id == id => grab.was_pinned = pinned,
            _ => self.particles.set_pinned(id, pinned),
        }
    }

    /// Whether a particle is pinned, explicitly or by a grab.
    #[must_use]
    pub fn is_pinned(&self, id: VertexId) -> bool {
        self.particles.is_pinned(id)
    }

    /// Enable or disable [`SoftBody::step`].
    pub fn set_simulating(&mut self, simulate: bool) {
        self.simulate = simulate;
    }

    /// Whether [`SoftBody::step`] advances the simulation.
    #[must_use]
    pub fn is_simulating(&self) -> bool {
        self.simulate
    }

    /// Move the whole body without changing its velocity.
    pub fn translate(&mut self, offset: Vec3) {
        self.particles.positions.translate(offset);
        self.particles.prev_positions.translate(offset);
    }

    /// Lift every particle by `dy`; the next velocity update turns it into an upward kick.
    pub fn launch(&mut self, dy: f32) {
        for p in &mut self.particles.positions {
            p.y += dy;
        }
    }

    /// Flatten the body just above `floor_height` and pause the simulation.
    pub fn squeeze(&mut self, floor_height: f32) {
        for p in &mut self.particles.positions {
            p.y = floor_height + 0.01;
        }
        self.simulate = false;
    }

    /// Grab the particle nearest to `point`, pin it and snap it there.
    ///
    /// A particle that is already grabbed is released first. Returns `None` when the
    /// body has no particles.
    pub fn start_grab(&mut self, point: Vec3) -> Option<VertexId> {
        if let Some(previous) = self.grab.take() {
            self.particles.set_pinned(previous.id, previous.was_pinned);
        }

        let id = self.particles.nearest(point)?;
        self.grab = Some(Grab {
            id,
            was_pinned: self.particles.is_pinned(id),
        });
        self.particles.set_pinned(id, true);
        self.particles.positions[id.index()] = point;

        debug!(id = id.0, x = point.x, y = point.y, z = point.z, "Grabbed particle");
        Some(id)
    }

    /// Move the grabbed particle, bypassing the solver.
    pub fn move_grabbed(&mut self, point: Vec3) {
        if let Some(grab) = self.grab {
            self.particles.positions[grab.id.index()] = point;
        }
    }

    /// Release the grabbed particle and throw it with `velocity`.
    ///
    /// The release point is not applied; the particle stays where the last move put it.
    pub fn end_grab(&mut self, _point: Vec3, velocity: Vec3) {
        if let Some(grab) = self.grab.take() {
            self.particles.set_pinned(grab.id, grab.was_pinned);
            self.particles.velocities[grab.id.index()] = velocity;
            debug!(id = grab.id.0, "Released particle");
        }
    }

    /// The grabbed particle, if any.
    #[must_use]
    pub fn grabbed(&self) -> Option<VertexId> {
        self.grab.map(|g| g.id)
    }

    /// Position of the grabbed particle, if any.
    #[must_use]
    pub fn grabbed_position(&self) -> Option<Vec3> {
        self.grab.map(|g| self.particles.positions[g.id.index()])
    }
}
