use std::f64::consts::TAU;
use std::fmt;

use glam::{DQuat, DVec3};

use super::types::{CFrame, Motion};

/// Capability interface for a rigid or jointed relationship between two physicals.
///
/// The tree walk only ever asks for the current relative transform and whether the
/// relationship can be traversed in the opposite direction.
pub trait HardConstraint: fmt::Debug + Send + Sync {
    /// Child joint frame expressed in the parent joint frame, at the current state.
    fn relative_transform(&self) -> CFrame;

    /// Velocity of the child joint frame relative to the parent joint frame,
    /// in parent joint axes.
    fn relative_motion(&self) -> Motion {
        Motion::default()
    }

    /// Advances internal state (motor angle, piston extension, ...) by one tick.
    fn update(&mut self, _dt: f64) {}

    fn is_invertible(&self) -> bool {
        true
    }

    /// Flips the constraint so that it describes the parent relative to the child.
    fn invert(&mut self);
}

/// Rigid connection with no relative motion.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedConstraint;

impl FixedConstraint {
    pub fn new() -> Self {
        Self
    }
}

impl HardConstraint for FixedConstraint {
    fn relative_transform(&self) -> CFrame {
        CFrame::IDENTITY
    }

    fn invert(&mut self) {}
}

/// Revolute joint driven at a constant angular speed about a joint-frame axis.
#[derive(Debug, Clone, Copy)]
pub struct MotorConstraint {
    axis: DVec3,
    pub speed: f64,
    angle: f64,
}

impl MotorConstraint {
    /// `axis` is normalized; a zero axis falls back to local Z.
    pub fn new(axis: DVec3, speed: f64) -> Self {
        Self {
            axis: axis.try_normalize().unwrap_or(DVec3::Z),
            speed,
            angle: 0.0,
        }
    }

    pub fn axis(&self) -> DVec3 {
        self.axis
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }
}

impl HardConstraint for MotorConstraint {
    fn relative_transform(&self) -> CFrame {
        CFrame::from_rotation(DQuat::from_axis_angle(self.axis, self.angle))
    }

    fn relative_motion(&self) -> Motion {
        Motion::new(DVec3::ZERO, self.axis * self.speed)
    }

    fn update(&mut self, dt: f64) {
        self.angle = (self.angle + self.speed * dt) % TAU;
    }

    fn invert(&mut self) {
        self.speed = -self.speed;
        self.angle = -self.angle;
    }
}

/// One tree edge: the constraint plus where it is mounted on either side.
#[derive(Debug)]
pub struct ConstraintLink {
    pub(crate) constraint: Box<dyn HardConstraint>,
    /// Joint frame in the parent physical's frame.
    pub(crate) attach_on_parent: CFrame,
    /// Joint frame in the child physical's frame.
    pub(crate) attach_on_child: CFrame,
}

impl ConstraintLink {
    pub fn new(constraint: Box<dyn HardConstraint>, attach_on_parent: CFrame, attach_on_child: CFrame) -> Self {
        Self {
            constraint,
            attach_on_parent,
            attach_on_child,
        }
    }

    pub fn constraint(&self) -> &dyn HardConstraint {
        self.constraint.as_ref()
    }

    pub fn attach_on_parent(&self) -> &CFrame {
        &self.attach_on_parent
    }

    pub fn attach_on_child(&self) -> &CFrame {
        &self.attach_on_child
    }

    /// Child physical frame relative to the parent physical frame.
    pub fn child_relative_to_parent(&self) -> CFrame {
        self.attach_on_parent
            .local_to_global(&self.constraint.relative_transform())
            .local_to_global(&self.attach_on_child.inverse())
    }

    /// Same physical relationship, traversed from the child to the parent.
    pub(crate) fn invert(&mut self) {
        std::mem::swap(&mut self.attach_on_parent, &mut self.attach_on_child);
        self.constraint.invert();
    }

    /// Re-expresses the parent-side mounting after the parent frame moved by `offset`
    /// (old parent frame expressed in the new one).
    pub(crate) fn remount_parent(&mut self, offset: &CFrame) {
        self.attach_on_parent = offset.local_to_global(&self.attach_on_parent);
    }
}
