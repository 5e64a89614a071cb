//! Error types for structural and numeric failures.

use thiserror::Error;

use crate::utils::allocator::{PartId, PhysicalId};

/// Errors raised by structural edits and mass aggregation.
///
/// Every variant is a caller or programming error. The offending operation is
/// rejected before any state changes, so the world stays coherent.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    /// The part handle is stale or was never issued by this world.
    #[error("unknown part {0}")]
    UnknownPart(PartId),

    /// The physical handle is stale or was never issued by this world.
    #[error("unknown physical {0}")]
    UnknownPhysical(PhysicalId),

    /// Welding a part into the physical that already owns it.
    #[error("part {part} is already attached to physical {physical}")]
    AlreadyAttached {
        /// Part being welded.
        part: PartId,
        /// Physical that already owns it.
        physical: PhysicalId,
    },

    /// A physical's member list does not contain the part.
    #[error("part {part} is not a member of physical {physical}")]
    PartNotInPhysical {
        /// Missing part.
        part: PartId,
        /// Physical it claims to belong to.
        physical: PhysicalId,
    },

    /// Linking two physicals that already share a constraint tree.
    #[error("physicals {a} and {b} are already in the same constraint tree")]
    WouldCreateCycle {
        /// Caller side.
        a: PhysicalId,
        /// Callee side.
        b: PhysicalId,
    },

    /// The requested node was not found while walking towards the root.
    #[error("physical {target} is not reachable from root {root}")]
    NotInTree {
        /// Node that was asked to become root.
        target: PhysicalId,
        /// Root the walk ended at.
        root: PhysicalId,
    },

    /// Reversing an edge whose constraint cannot be inverted.
    #[error("constraint between {parent} and {child} cannot be inverted")]
    ConstraintNotInvertible {
        /// Parent end of the edge.
        parent: PhysicalId,
        /// Child end of the edge.
        child: PhysicalId,
    },

    /// Total mass is zero, negative, or not finite.
    #[error("degenerate mass {mass}")]
    DegenerateMass {
        /// Offending mass.
        mass: f64,
    },

    /// Inertia tensor cannot be inverted.
    #[error("singular inertia tensor (determinant {determinant})")]
    SingularInertia {
        /// Determinant of the tensor.
        determinant: f64,
    },

    /// Density must be strictly positive.
    #[error("invalid density {0}")]
    InvalidDensity(f64),

    /// Shape has no volume or a non-finite dimension.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// A tree invariant was found broken during validation.
    #[error("broken invariant: {0}")]
    BrokenInvariant(String),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, PhysicsError>;
