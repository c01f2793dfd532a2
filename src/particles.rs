//! Per-particle simulation buffers.

use bitvec::vec::BitVec;
use glam::Vec3;

use crate::mesh::VertexId;

/// Structure-of-arrays particle state, indexed by [`VertexId::index`].
#[derive(Clone, Debug, Default)]
pub struct Particles {
    /// Current positions.
    pub positions: Vec<Vec3>,
    /// Positions at the start of the current sub-step.
    pub prev_positions: Vec<Vec3>,
    /// Velocities.
    pub velocities: Vec<Vec3>,
    /// Intrinsic inverse masses, unaffected by pinning.
    pub(crate) inv_masses: Vec<f32>,
    /// Particles held in place regardless of their mass.
    pub(crate) pinned: BitVec,
}

impl Particles {
    /// Particles at rest at the given positions.
    #[must_use]
    pub fn at_rest(positions: Vec<Vec3>, inv_masses: Vec<f32>) -> Self {
        let n = positions.len();
        Self {
            prev_positions: positions.clone(),
            positions,
            velocities: vec![Vec3::ZERO; n],
            inv_masses,
            pinned: BitVec::repeat(false, n),
        }
    }

    /// Number of particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether there are no particles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Inverse mass as seen by the solver: zero while pinned.
    #[must_use]
    pub fn inverse_mass(&self, id: VertexId) -> f32 {
        if self.pinned[id.index()] {
            0.0
        } else {
            self.inv_masses[id.index()]
        }
    }

    /// Inverse mass derived from the rest volumes, ignoring pins.
    #[must_use]
    pub fn intrinsic_inverse_mass(&self, id: VertexId) -> f32 {
        self.inv_masses[id.index()]
    }

    /// Whether the solver may move this particle.
    #[must_use]
    pub fn is_movable(&self, index: usize) -> bool {
        !self.pinned[index] && self.inv_masses[index] != 0.0
    }

    /// Whether the particle is explicitly pinned.
    #[must_use]
    pub fn is_pinned(&self, id: VertexId) -> bool {
        self.pinned[id.index()]
    }

    /// Set or clear the pin flag.
    pub fn set_pinned(&mut self, id: VertexId, pinned: bool) {
        self.pinned.set(id.index(), pinned);
    }

    /// Index of the particle closest to `point`, by squared distance.
    #[must_use]
    pub fn nearest(&self, point: Vec3) -> Option<VertexId> {
        let mut best = None;
        let mut min_d2 = f32::MAX;
        for (i, p) in self.positions.iter().enumerate() {
            let d2 = p.distance_squared(point);
            if d2 < min_d2 {
                min_d2 = d2;
                best = Some(i);
            }
        }
        best.and_then(|i| u32::try_from(i).ok()).map(VertexId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_masks_inverse_mass() {
        let mut particles = Particles::at_rest(vec![Vec3::ZERO, Vec3::X], vec![2.0, 3.0]);

        particles.set_pinned(VertexId(1), true);

        assert_eq!(particles.inverse_mass(VertexId(0)), 2.0);
        assert_eq!(particles.inverse_mass(VertexId(1)), 0.0);
        assert_eq!(particles.intrinsic_inverse_mass(VertexId(1)), 3.0);
        assert!(!particles.is_movable(1));

        particles.set_pinned(VertexId(1), false);
        assert_eq!(particles.inverse_mass(VertexId(1)), 3.0);
    }

    #[test]
    fn test_massless_particle_is_immovable() {
        let particles = Particles::at_rest(vec![Vec3::ZERO], vec![0.0]);
        assert!(!particles.is_movable(0));
        assert!(!particles.is_pinned(VertexId(0)));
    }

    #[test]
    fn test_nearest() {
        let particles = Particles::at_rest(
            vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 5.0, 0.0)],
            vec![1.0; 3],
        );
        assert_eq!(particles.nearest(Vec3::new(0.9, 0.2, 0.0)), Some(VertexId(1)));
        assert_eq!(particles.nearest(Vec3::new(0.0, 4.0, 0.0)), Some(VertexId(2)));
        assert_eq!(Particles::default().nearest(Vec3::ZERO), None);
    }
}
