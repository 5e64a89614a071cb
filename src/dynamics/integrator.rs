use glam::{DMat3, DVec3};

use crate::core::types::{CFrame, Motion};
use crate::utils::math::rotation_from_vector;

/// Mutable view of a body the integrator can advance.
pub struct RigidBodyState<'a> {
    /// Frame the body's mass properties are expressed in.
    pub frame: &'a mut CFrame,
    /// Motion of the center of mass.
    pub motion: &'a mut Motion,
    pub local_center_of_mass: DVec3,
    pub mass: f64,
    /// Inverse inertia about the center of mass, in `frame` axes.
    pub inverse_inertia: DMat3,
}

/// Advances rigid bodies with constant-acceleration kinematics per (sub)step.
///
/// Within a step the pending force and moment are held constant: the center of
/// mass moves by `v·h + ½·a·h²` and then `v += a·h`; the orientation is composed
/// with the exponential map of `ω·h + ½·α·h²` and then `ω += α·h`. Angular
/// acceleration is solved in the body's rotating local frame.
#[derive(Debug, Clone)]
pub struct Integrator {
    pub substeps: u32,
    pub linear_damping: f64,
    pub angular_damping: f64,
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Integrator {
    pub fn new(substeps: u32) -> Self {
        Self {
            substeps: substeps.max(1),
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }

    pub fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = linear.max(0.0);
        self.angular_damping = angular.max(0.0);
        self
    }

    /// Linear and angular acceleration produced by `force` and `moment` (world axes).
    pub fn accelerations(
        frame: &CFrame,
        mass: f64,
        inverse_inertia: &DMat3,
        force: DVec3,
        moment: DVec3,
    ) -> (DVec3, DVec3) {
        let acceleration = force / mass;
        let local_moment = frame.relative_to_local(moment);
        let local_angular = *inverse_inertia * local_moment;
        (acceleration, frame.local_to_relative(local_angular))
    }

    /// Integrates `body` over `dt` under a constant `force` and `moment` about its center of mass.
    pub fn integrate(&self, body: RigidBodyState<'_>, force: DVec3, moment: DVec3, dt: f64) {
        let h = dt / self.substeps as f64;

        for _ in 0..self.substeps {
            let (acceleration, angular_acceleration) =
                Self::accelerations(&*body.frame, body.mass, &body.inverse_inertia, force, moment);
            self.integrate_position(
                &mut *body.frame,
                &*body.motion,
                body.local_center_of_mass,
                acceleration,
                angular_acceleration,
                h,
            );
            self.integrate_velocity(&mut *body.motion, acceleration, angular_acceleration, h);
        }
    }

    fn integrate_position(
        &self,
        frame: &mut CFrame,
        motion: &Motion,
        local_center_of_mass: DVec3,
        acceleration: DVec3,
        angular_acceleration: DVec3,
        h: f64,
    ) {
        let center = frame.local_point_to_global(local_center_of_mass);
        let movement = motion.velocity * h + acceleration * (h * h / 2.0);
        let turn = motion.angular_velocity * h + angular_acceleration * (h * h / 2.0);

        frame.rotate(rotation_from_vector(turn));
        // rotate about the center of mass, not the frame origin
        frame.position = center + movement - frame.rotation * local_center_of_mass;
    }

    fn integrate_velocity(&self, motion: &mut Motion, acceleration: DVec3, angular_acceleration: DVec3, h: f64) {
        motion.velocity += acceleration * h;
        motion.angular_velocity += angular_acceleration * h;

        motion.velocity *= (1.0 - self.linear_damping * h).max(0.0);
        motion.angular_velocity *= (1.0 - self.angular_damping * h).max(0.0);
    }
}
