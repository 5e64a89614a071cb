use std::ops::Mul;

use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_DENSITY, DEFAULT_FRICTION, INERTIA_CONDITION_EPSILON, MIN_MASS};
use crate::error::{PhysicsError, Result};
use crate::utils::math::{is_finite_mat3, parallel_axis, transform_basis};

/// Rigid placement: position plus orientation, no scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CFrame {
    pub position: DVec3,
    pub rotation: DQuat,
}

impl Default for CFrame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl CFrame {
    pub const IDENTITY: CFrame = CFrame {
        position: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    pub fn new(position: DVec3, rotation: DQuat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: DVec3) -> Self {
        Self {
            position,
            rotation: DQuat::IDENTITY,
        }
    }

    pub fn from_rotation(rotation: DQuat) -> Self {
        Self {
            position: DVec3::ZERO,
            rotation,
        }
    }

    /// Composes `self ∘ local`: places a frame given relative to `self` into the outer space.
    pub fn local_to_global(&self, local: &CFrame) -> CFrame {
        CFrame {
            position: self.position + self.rotation * local.position,
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }

    /// Expresses an outer-space frame relative to `self`.
    pub fn global_to_local(&self, global: &CFrame) -> CFrame {
        let inv = self.rotation.inverse();
        CFrame {
            position: inv * (global.position - self.position),
            rotation: (inv * global.rotation).normalize(),
        }
    }

    pub fn inverse(&self) -> CFrame {
        let inv = self.rotation.inverse();
        CFrame {
            position: -(inv * self.position),
            rotation: inv,
        }
    }

    pub fn local_point_to_global(&self, point: DVec3) -> DVec3 {
        self.position + self.rotation * point
    }

    pub fn global_point_to_local(&self, point: DVec3) -> DVec3 {
        self.rotation.inverse() * (point - self.position)
    }

    /// Rotates a direction from local axes to outer axes.
    pub fn local_to_relative(&self, v: DVec3) -> DVec3 {
        self.rotation * v
    }

    /// Rotates a direction from outer axes to local axes.
    pub fn relative_to_local(&self, v: DVec3) -> DVec3 {
        self.rotation.inverse() * v
    }

    pub fn translate(&mut self, delta: DVec3) {
        self.position += delta;
    }

    /// Applies `rotation` on top of the current orientation, in outer axes.
    pub fn rotate(&mut self, rotation: DQuat) {
        self.rotation = (rotation * self.rotation).normalize();
    }

    /// Compares positions and orientations within `tolerance`.
    pub fn approx_eq(&self, other: &CFrame, tolerance: f64) -> bool {
        if self.position.distance(other.position) > tolerance {
            return false;
        }
        // q and -q encode the same orientation
        let dot = self.rotation.dot(other.rotation).abs().min(1.0);
        let angle = 2.0 * dot.acos();
        angle <= tolerance
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }
}

impl Mul for CFrame {
    type Output = CFrame;

    fn mul(self, rhs: CFrame) -> CFrame {
        self.local_to_global(&rhs)
    }
}

/// Linear and angular velocity of a body's center of mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub velocity: DVec3,
    pub angular_velocity: DVec3,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            velocity: DVec3::ZERO,
            angular_velocity: DVec3::ZERO,
        }
    }
}

impl Motion {
    pub fn new(velocity: DVec3, angular_velocity: DVec3) -> Self {
        Self {
            velocity,
            angular_velocity,
        }
    }

    /// Velocity of a point offset from the center of mass (offset in world axes).
    pub fn velocity_of_point(&self, offset: DVec3) -> DVec3 {
        self.velocity + self.angular_velocity.cross(offset)
    }
}

/// Per-part material coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartProperties {
    pub density: f64,
    pub friction: f64,
}

impl Default for PartProperties {
    fn default() -> Self {
        Self {
            density: DEFAULT_DENSITY,
            friction: DEFAULT_FRICTION,
        }
    }
}

impl PartProperties {
    pub fn new(density: f64, friction: f64) -> Self {
        Self { density, friction }
    }
}

/// Mass, center of mass and inertia tensor (about the center of mass) in some local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassProperties {
    pub mass: f64,
    pub center_of_mass: DVec3,
    pub inertia: DMat3,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self {
            mass: 1.0,
            center_of_mass: DVec3::ZERO,
            inertia: DMat3::IDENTITY,
        }
    }
}

impl MassProperties {
    /// Combines members placed at `attachment` frames into one aggregate.
    ///
    /// Member inertia is rotated into the aggregate frame and shifted to the
    /// aggregate center of mass with the parallel-axis term.
    pub fn aggregate<'a, I>(members: I) -> Result<MassProperties>
    where
        I: IntoIterator<Item = (CFrame, &'a MassProperties)>,
        I::IntoIter: Clone,
    {
        let members = members.into_iter();

        let mut total_mass = 0.0;
        let mut weighted_center = DVec3::ZERO;
        for (attachment, props) in members.clone() {
            total_mass += props.mass;
            weighted_center += attachment.local_point_to_global(props.center_of_mass) * props.mass;
        }
        check_mass(total_mass)?;
        let center_of_mass = weighted_center / total_mass;

        let mut inertia = DMat3::ZERO;
        for (attachment, props) in members {
            let member_center = attachment.local_point_to_global(props.center_of_mass);
            inertia += transform_basis(props.inertia, attachment.rotation)
                + parallel_axis(member_center - center_of_mass, props.mass);
        }
        check_inertia(&inertia)?;

        Ok(MassProperties {
            mass: total_mass,
            center_of_mass,
            inertia,
        })
    }

    /// Inverse of the inertia tensor, rejecting singular tensors.
    pub fn inverse_inertia(&self) -> Result<DMat3> {
        check_inertia(&self.inertia)?;
        Ok(self.inertia.inverse())
    }
}

pub(crate) fn check_mass(mass: f64) -> Result<()> {
    if !mass.is_finite() || mass < MIN_MASS {
        return Err(PhysicsError::DegenerateMass { mass });
    }
    Ok(())
}

pub(crate) fn check_inertia(inertia: &DMat3) -> Result<()> {
    let determinant = inertia.determinant();
    // scale-free: compare against the cube of the mean principal moment
    let mean_moment = (inertia.x_axis.x + inertia.y_axis.y + inertia.z_axis.z) / 3.0;
    let threshold = INERTIA_CONDITION_EPSILON * mean_moment.abs().powi(3);
    if !is_finite_mat3(inertia) || !determinant.is_finite() || determinant.abs() <= threshold {
        return Err(PhysicsError::SingularInertia { determinant });
    }
    Ok(())
}

/// Helper methods for inertia calculations.
pub trait InertiaTensorExt {
    fn for_solid_box(half_extents: DVec3, mass: f64) -> DMat3;
    fn for_solid_sphere(radius: f64, mass: f64) -> DMat3;
    fn for_solid_cylinder(radius: f64, height: f64, mass: f64) -> DMat3;
}

impl InertiaTensorExt for DMat3 {
    fn for_solid_box(half_extents: DVec3, mass: f64) -> DMat3 {
        let lx = half_extents.x * 2.0;
        let ly = half_extents.y * 2.0;
        let lz = half_extents.z * 2.0;
        let factor = mass / 12.0;
        DMat3::from_diagonal(DVec3::new(
            factor * (ly * ly + lz * lz),
            factor * (lx * lx + lz * lz),
            factor * (lx * lx + ly * ly),
        ))
    }

    fn for_solid_sphere(radius: f64, mass: f64) -> DMat3 {
        let value = 0.4 * mass * radius * radius;
        DMat3::from_diagonal(DVec3::splat(value))
    }

    /// Cylinder aligned along Y.
    fn for_solid_cylinder(radius: f64, height: f64, mass: f64) -> DMat3 {
        let side = mass * (3.0 * radius * radius + height * height) / 12.0;
        DMat3::from_diagonal(DVec3::new(side, 0.5 * mass * radius * radius, side))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cframe_inverse_composes_to_identity() {
        let cf = CFrame::new(
            DVec3::new(1.0, 2.0, -3.0),
            DQuat::from_euler(glam::EulerRot::XYZ, 0.3, -1.1, 2.0),
        );
        let id = cf * cf.inverse();
        assert!(id.approx_eq(&CFrame::IDENTITY, 1e-9));
        let local = cf.global_to_local(&cf.local_to_global(&CFrame::from_position(DVec3::X)));
        assert!(local.approx_eq(&CFrame::from_position(DVec3::X), 1e-9));
    }

    #[test]
    fn aggregate_of_two_unit_masses() {
        let unit = MassProperties {
            mass: 1.0,
            center_of_mass: DVec3::ZERO,
            inertia: DMat3::IDENTITY,
        };
        let members = [
            (CFrame::from_position(DVec3::new(-1.0, 0.0, 0.0)), &unit),
            (CFrame::from_position(DVec3::new(1.0, 0.0, 0.0)), &unit),
        ];
        let total = MassProperties::aggregate(members).expect("valid members");
        assert_relative_eq!(total.mass, 2.0);
        assert_relative_eq!(total.center_of_mass.length(), 0.0);
        // two point-mass corrections of 1 each about y and z
        assert_relative_eq!(total.inertia.x_axis.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(total.inertia.y_axis.y, 4.0, epsilon = 1e-12);
        assert_relative_eq!(total.inertia.z_axis.z, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn aggregate_rejects_zero_mass() {
        let empty: [(CFrame, &MassProperties); 0] = [];
        assert!(matches!(
            MassProperties::aggregate(empty),
            Err(PhysicsError::DegenerateMass { .. })
        ));
    }

    #[test]
    fn singular_inertia_is_rejected() {
        let props = MassProperties {
            mass: 1.0,
            center_of_mass: DVec3::ZERO,
            inertia: DMat3::from_diagonal(DVec3::new(1.0, 1.0, 0.0)),
        };
        assert!(matches!(
            props.inverse_inertia(),
            Err(PhysicsError::SingularInertia { .. })
        ));
    }
}
