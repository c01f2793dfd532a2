//! XPBD (eXtended Position Based Dynamics) soft body simulation library.
//!
//! A body is a static tetrahedral topology plus per-particle state. Every fixed
//! timestep is split into substeps of prediction, edge and volume constraint
//! projection, and velocity reconstruction.

#![warn(clippy::pedantic)]
#![warn(missing_docs)]

pub mod constraint;
pub mod error;
pub mod mesh;
pub mod particles;
pub mod softbody;
pub mod xpbd;

pub use error::TopologyError;
pub use mesh::TetTopology;
pub use softbody::SoftBody;
pub use xpbd::{Bounds, XpbdParams};
