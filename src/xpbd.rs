//! Implement xpbd on a tetrahedral mesh.

use glam::Vec3;

use crate::{
    constraint::{Constraint, apply_constraint},
    particles::Particles,
};

/// Axis-aligned play volume the particles are kept inside.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bounds {
    /// Lower corner; `min.y` is the floor height.
    pub min: Vec3,
    /// Upper corner.
    pub max: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: Vec3::new(-5.0, 0.0, -5.0),
            max: Vec3::new(5.0, 8.0, 5.0),
        }
    }
}

impl Bounds {
    /// Inelastic collision response.
    ///
    /// Each axis of the predicted position is checked in the order y, x, z. On a
    /// violation the particle goes back to `prev` and only the offending coordinate is
    /// snapped to the bound, so the reconstructed velocity along that axis is
    /// (almost) zero.
    pub fn clamp(&self, pos: &mut Vec3, prev: Vec3) {
        let predicted = *pos;
        for axis in [1, 0, 2] {
            let bound = if predicted[axis] < self.min[axis] {
                self.min[axis]
            } else if predicted[axis] > self.max[axis] {
                self.max[axis]
            } else {
                continue;
            };
            *pos = prev;
            pos[axis] = bound;
        }
    }
}

/// Immutable parameters for the XPBD simulation.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct XpbdParams {
    /// Number of substeps per simulation step.
    pub n_substeps: usize,
    /// Compliance (inverse stiffness) of edge length constraints.
    pub edge_compliance: f32,
    /// Compliance of tetrahedral volume constraints. Anything but 0 flattens the mesh.
    pub volume_compliance: f32,
    /// A constant acceleration applied to all vertices (e.g., gravity).
    pub gravity: Vec3,
    /// Environment box, or `None` to disable collisions.
    pub bounds: Option<Bounds>,
}

impl Default for XpbdParams {
    fn default() -> Self {
        Self {
            n_substeps: 10,
            edge_compliance: 5.0,
            volume_compliance: 0.0,
            gravity: Vec3::new(0.0, -30.0, 0.0),
            bounds: Some(Bounds::default()),
        }
    }
}

impl XpbdParams {
    /// Set the number of substeps, at least one.
    #[must_use]
    pub fn with_substeps(mut self, n_substeps: usize) -> Self {
        self.n_substeps = n_substeps.max(1);
        self
    }

    /// Set the edge compliance.
    #[must_use]
    pub fn with_edge_compliance(mut self, compliance: f32) -> Self {
        self.edge_compliance = compliance;
        self
    }

    /// Set the volume compliance.
    #[must_use]
    pub fn with_volume_compliance(mut self, compliance: f32) -> Self {
        self.volume_compliance = compliance;
        self
    }

    /// Set the gravity vector.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set or remove the environment box.
    #[must_use]
    pub fn with_bounds(mut self, bounds: Option<Bounds>) -> Self {
        self.bounds = bounds;
        self
    }

    /// Time step for each simulation substep.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn time_substep(&self, time_step: f32) -> f32 {
        time_step / self.n_substeps.max(1) as f32
    }
}

/// A set of constraints that can be evaluated at rest and solved each substep.
pub trait ConstraintSet<R> {
    /// Evaluate all constraint functions, e.g. to capture rest values.
    fn evaluate(&self, on: &[Vec3]) -> R;

    /// Project every constraint once against its reference value.
    fn solve(&self, particles: &mut Particles, params: &XpbdParams, reference: &R, time_substep: f32);
}

/// Project each constraint once, in iteration order, against its reference value.
///
/// Degenerate constraints (undefined gradient or no movable particle) are skipped.
/// Returns the number of constraints that were applied.
pub fn process_constraints<'a, I, C, const N: usize>(
    iter: I,
    particles: &mut Particles,
    alpha: f32,
) -> usize
where
    I: Iterator<Item = (&'a C, f32)>,
    C: Constraint<N> + 'a,
{
    let mut applied = 0;
    for (constraint, ref_value) in iter {
        let Some(eval) = constraint.value_and_grad(&particles.positions) else {
            continue;
        };
        if apply_constraint(eval, ref_value, alpha, particles).is_some() {
            applied += 1;
        }
    }
    applied
}

/// Explicit prediction for every movable particle.
///
/// `vel += dt * gravity`, `prev = pos`, `pos += dt * vel`, then `vertex_correction`
/// receives the predicted position and the previous one to handle collisions.
pub fn predict<F>(particles: &mut Particles, gravity: Vec3, time_substep: f32, mut vertex_correction: F)
where
    F: FnMut(&mut Vec3, Vec3),
{
    for i in 0..particles.len() {
        if !particles.is_movable(i) {
            continue;
        }
        particles.velocities[i] += gravity * time_substep;
        particles.prev_positions[i] = particles.positions[i];
        particles.positions[i] += particles.velocities[i] * time_substep;
        vertex_correction(&mut particles.positions[i], particles.prev_positions[i]);
    }
}

/// Update velocities based on position changes.
pub fn update_velocities(particles: &mut Particles, time_substep: f32) {
    for i in 0..particles.len() {
        if !particles.is_movable(i) {
            continue;
        }
        particles.velocities[i] =
            (particles.positions[i] - particles.prev_positions[i]) / time_substep;
    }
}

/// Basic XPBD step: splits `time_step` into substeps of predict, solve and velocity update.
///
/// A non-positive `time_step` leaves the particles untouched.
pub fn step_basic<C, R>(
    params: &XpbdParams,
    particles: &mut Particles,
    constraints: &C,
    reference: &R,
    time_step: f32,
) where
    C: ConstraintSet<R>,
{
    if time_step <= 0.0 {
        return;
    }
    let time_substep = params.time_substep(time_step);
    for _ in 0..params.n_substeps {
        predict(particles, params.gravity, time_substep, |pos, prev| {
            if let Some(bounds) = &params.bounds {
                bounds.clamp(pos, prev);
            }
        });

        constraints.solve(particles, params, reference, time_substep);

        update_velocities(particles, time_substep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_floor_keeps_previous_xz() {
        let bounds = Bounds::default();
        let prev = Vec3::new(1.0, 0.1, 2.0);
        let mut pos = Vec3::new(1.2, -0.3, 2.1);

        bounds.clamp(&mut pos, prev);

        assert_eq!(pos, Vec3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn test_clamp_walls_and_ceiling() {
        let bounds = Bounds::default();

        let mut pos = Vec3::new(5.5, 1.0, 0.0);
        bounds.clamp(&mut pos, Vec3::new(4.9, 1.1, 0.0));
        assert_eq!(pos, Vec3::new(5.0, 1.1, 0.0));

        let mut pos = Vec3::new(0.0, 9.0, -6.0);
        bounds.clamp(&mut pos, Vec3::new(0.0, 7.9, -4.9));
        assert_eq!(pos, Vec3::new(0.0, 7.9, -5.0));
    }

    #[test]
    fn test_clamp_inside_is_noop() {
        let bounds = Bounds::default();
        let mut pos = Vec3::new(1.0, 2.0, 3.0);
        bounds.clamp(&mut pos, Vec3::ZERO);
        assert_eq!(pos, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_predict_skips_immovable() {
        let mut particles = Particles::at_rest(vec![Vec3::ZERO, Vec3::ONE], vec![1.0, 0.0]);

        predict(&mut particles, Vec3::new(0.0, -10.0, 0.0), 0.1, |_, _| {});

        assert_eq!(particles.velocities[0], Vec3::new(0.0, -1.0, 0.0));
        assert!((particles.positions[0].y + 0.1).abs() < 1e-6);
        assert_eq!(particles.positions[1], Vec3::ONE);
        assert_eq!(particles.velocities[1], Vec3::ZERO);
    }

    #[test]
    fn test_update_velocities() {
        let mut particles = Particles::at_rest(vec![Vec3::ZERO], vec![1.0]);
        particles.positions[0] = Vec3::new(0.5, 0.0, 0.0);

        update_velocities(&mut particles, 0.5);

        assert_eq!(particles.velocities[0], Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_substeps_never_zero() {
        let params = XpbdParams::default().with_substeps(0);
        assert_eq!(params.n_substeps, 1);
        assert!((params.time_substep(0.5) - 0.5).abs() < f32::EPSILON);
    }
}
