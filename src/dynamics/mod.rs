//! Simulation dynamics: force generators and the rigid-body integrator.

pub mod forces;
pub mod integrator;

pub use forces::{DragForce, ForceGenerator, ForceRegistry, GravityForce};
pub use integrator::{Integrator, RigidBodyState};
