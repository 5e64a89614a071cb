//! Rigid Composer – rigid-body composition core for Rust.
//!
//! Parts are welded into rigid physicals, physicals are linked into trees by
//! hard constraints, and each tree root integrates the whole tree once per
//! tick before poses are pushed back down to every part.

pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod utils;
pub mod world;

pub use glam::{DMat3, DQuat, DVec3};

pub use core::{
    constraints::{ConstraintLink, FixedConstraint, HardConstraint, MotorConstraint},
    part::Part,
    physical::{AttachedPart, MotorizedPhysical, ParentLink, Physical},
    shape::{Bounds, Shape},
    types::{CFrame, MassProperties, Motion, PartProperties},
};
pub use dynamics::{
    forces::{DragForce, ForceGenerator, ForceRegistry, GravityForce},
    integrator::Integrator,
};
pub use error::{PhysicsError, Result};
pub use utils::allocator::{PartId, PhysicalId};
pub use utils::debug::{NoopObserver, RecordingObserver, VectorKind, VectorObserver, VectorRecord};
pub use world::{PhysicsWorld, WorldConfig};
