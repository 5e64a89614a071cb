//! Core types: frames, shapes, parts, physicals and the constraints between them.

pub mod constraints;
pub mod part;
pub mod physical;
pub mod shape;
pub mod types;

pub use constraints::{ConstraintLink, FixedConstraint, HardConstraint, MotorConstraint};
pub use part::Part;
pub use physical::{AttachedPart, MotorizedPhysical, ParentLink, Physical};
pub use shape::{Bounds, Shape};
pub use types::{CFrame, InertiaTensorExt, MassProperties, Motion, PartProperties};
