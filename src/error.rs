//! Errors raised while building a tetrahedral topology.

use thiserror::Error;

/// Precondition violations in externally supplied topology data.
///
/// These are authoring bugs. They are reported once, before any simulation runs,
/// and are never produced by the solver itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// A flat array does not hold a whole number of elements.
    #[error("{kind} array has {len} entries, which is not a multiple of {stride}")]
    MisalignedArray {
        /// Which array was malformed.
        kind: &'static str,
        /// Number of scalars in the array.
        len: usize,
        /// Number of scalars per element.
        stride: usize,
    },
    /// An element references a vertex that does not exist.
    #[error("{kind} {element} references vertex {index}, only {count} available")]
    VertexOutOfRange {
        /// Which element kind held the dangling index.
        kind: &'static str,
        /// Position of the element in its array.
        element: usize,
        /// The offending vertex index.
        index: u32,
        /// Number of vertices in the topology.
        count: usize,
    },
}
