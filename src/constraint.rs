//! XPBD constraint functions and the shared projection step.
//!
//! A constraint over `N` particles exposes its current value `C(x)` and the
//! gradient of `C` with respect to each particle. [`apply_constraint`] then moves
//! the particles along the mass-weighted gradients:
//!
//! ```text
//! lambda = -(C - C_rest) / (sum_j w_j |grad_j|^2 + alpha)
//! x_j   += lambda * w_j * grad_j
//! ```

use glam::Vec3;

use crate::mesh::{Edge, Tetrahedron, VertexId};
use crate::particles::Particles;

/// Opposite-face table: for vertex `j` of a tetrahedron, the three other vertices
/// ordered so that `(p[o1] - p[o0]) x (p[o2] - p[o0])` points away from `j`'s face,
/// along the direction that grows the volume.
pub const VOL_ID_ORDER: [[usize; 3]; 4] = [[1, 3, 2], [0, 2, 3], [0, 3, 1], [0, 1, 2]];

/// Current value and gradients of a constraint, ready for projection.
#[derive(Clone, Copy, Debug)]
pub struct ConstraintEval<const N: usize> {
    /// Particles taking part in the constraint.
    pub ids: [VertexId; N],
    /// Constraint function value at the current positions.
    pub value: f32,
    /// Gradient of the constraint function per particle.
    pub grads: [Vec3; N],
}

/// A geometric constraint over `N` particles.
pub trait Constraint<const N: usize> {
    /// Particles taking part in the constraint.
    fn ids(&self) -> [VertexId; N];

    /// Constraint function value at the given positions.
    fn value(&self, positions: &[Vec3]) -> f32;

    /// Value and gradients at the given positions.
    ///
    /// Returns `None` when the gradient is undefined, e.g. for coincident edge endpoints.
    fn value_and_grad(&self, positions: &[Vec3]) -> Option<ConstraintEval<N>>;
}

impl Constraint<2> for Edge {
    fn ids(&self) -> [VertexId; 2] {
        [self.0, self.1]
    }

    fn value(&self, positions: &[Vec3]) -> f32 {
        positions[self.0.index()].distance(positions[self.1.index()])
    }

    fn value_and_grad(&self, positions: &[Vec3]) -> Option<ConstraintEval<2>> {
        let d = positions[self.0.index()] - positions[self.1.index()];
        let l = d.length();
        if l == 0.0 {
            return None;
        }
        let n = d / l;
        Some(ConstraintEval {
            ids: self.ids(),
            value: l,
            grads: [n, -n],
        })
    }
}

/// Signed volume of the tetrahedron `(p0, p1, p2, p3)`.
#[must_use]
pub fn tet_volume([p0, p1, p2, p3]: [Vec3; 4]) -> f32 {
    (p1 - p0).cross(p2 - p0).dot(p3 - p0) / 6.0
}

impl Tetrahedron {
    fn points(&self, positions: &[Vec3]) -> [Vec3; 4] {
        self.indices.map(|id| positions[id.index()])
    }
}

impl Constraint<4> for Tetrahedron {
    fn ids(&self) -> [VertexId; 4] {
        self.indices
    }

    fn value(&self, positions: &[Vec3]) -> f32 {
        tet_volume(self.points(positions))
    }

    fn value_and_grad(&self, positions: &[Vec3]) -> Option<ConstraintEval<4>> {
        let p = self.points(positions);
        let grads = VOL_ID_ORDER.map(|[o0, o1, o2]| (p[o1] - p[o0]).cross(p[o2] - p[o0]) / 6.0);
        Some(ConstraintEval {
            ids: self.indices,
            value: tet_volume(p),
            grads,
        })
    }
}

/// Project one constraint towards `reference` with compliance `alpha` (already divided by `dt^2`).
///
/// Returns the Lagrange multiplier, or `None` when every participating particle is immovable.
pub fn apply_constraint<const N: usize>(
    eval: ConstraintEval<N>,
    reference: f32,
    alpha: f32,
    particles: &mut Particles,
) -> Option<f32> {
    let ConstraintEval { ids, value, grads } = eval;
    let weights = ids.map(|id| particles.inverse_mass(id));

    let w_sum: f32 = weights
        .iter()
        .zip(&grads)
        .map(|(w, g)| w * g.length_squared())
        .sum();
    if w_sum == 0.0 {
        return None;
    }

    let lambda = -(value - reference) / (w_sum + alpha);
    for ((id, w), g) in ids.iter().zip(weights).zip(grads) {
        particles.positions[id.index()] += lambda * w * g;
    }
    Some(lambda)
}
