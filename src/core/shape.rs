use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use super::types::{CFrame, InertiaTensorExt};
use crate::error::{PhysicsError, Result};

/// Geometry of a part, centered on the part's origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Box { half_extents: DVec3 },
    Sphere { radius: f64 },
    /// Aligned along the local Y axis.
    Cylinder { radius: f64, height: f64 },
}

/// Axis-aligned bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: DVec3,
    pub max: DVec3,
}

impl Bounds {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn extents(&self) -> DVec3 {
        self.max - self.min
    }
}

impl Shape {
    pub fn cube(side: f64) -> Self {
        Shape::Box {
            half_extents: DVec3::splat(side * 0.5),
        }
    }

    pub fn cuboid(width: f64, height: f64, depth: f64) -> Self {
        Shape::Box {
            half_extents: DVec3::new(width, height, depth) * 0.5,
        }
    }

    pub fn sphere(radius: f64) -> Self {
        Shape::Sphere { radius }
    }

    pub fn cylinder(radius: f64, height: f64) -> Self {
        Shape::Cylinder { radius, height }
    }

    pub fn volume(&self) -> f64 {
        match *self {
            Shape::Box { half_extents } => 8.0 * half_extents.x * half_extents.y * half_extents.z,
            Shape::Sphere { radius } => 4.0 / 3.0 * std::f64::consts::PI * radius.powi(3),
            Shape::Cylinder { radius, height } => std::f64::consts::PI * radius * radius * height,
        }
    }

    /// Inertia about the shape origin in its own axes, for the given mass.
    pub fn inertia(&self, mass: f64) -> DMat3 {
        match *self {
            Shape::Box { half_extents } => DMat3::for_solid_box(half_extents, mass),
            Shape::Sphere { radius } => DMat3::for_solid_sphere(radius, mass),
            Shape::Cylinder { radius, height } => DMat3::for_solid_cylinder(radius, height, mass),
        }
    }

    /// Center of mass in the shape frame.
    pub fn center_of_mass(&self) -> DVec3 {
        DVec3::ZERO
    }

    pub fn bounding_radius(&self) -> f64 {
        match *self {
            Shape::Box { half_extents } => half_extents.length(),
            Shape::Sphere { radius } => radius,
            Shape::Cylinder { radius, height } => (radius * radius + (height / 2.0).powi(2)).sqrt(),
        }
    }

    pub fn local_bounds(&self) -> Bounds {
        let half = match *self {
            Shape::Box { half_extents } => half_extents,
            Shape::Sphere { radius } => DVec3::splat(radius),
            Shape::Cylinder { radius, height } => DVec3::new(radius, height / 2.0, radius),
        };
        Bounds::new(-half, half)
    }

    /// Tight axis-aligned bounds after placing the shape at `cframe`.
    pub fn world_bounds(&self, cframe: &CFrame) -> Bounds {
        match *self {
            Shape::Sphere { radius } => {
                Bounds::new(cframe.position - DVec3::splat(radius), cframe.position + DVec3::splat(radius))
            }
            _ => {
                let local = self.local_bounds();
                let half = local.max;
                let rotation = DMat3::from_quat(cframe.rotation);
                // |R|·h gives the half extents of the rotated box
                let abs = DMat3::from_cols(rotation.x_axis.abs(), rotation.y_axis.abs(), rotation.z_axis.abs());
                let world_half = abs * half;
                Bounds::new(cframe.position - world_half, cframe.position + world_half)
            }
        }
    }

    /// Returns the shape stretched along its local axes.
    pub fn scaled(&self, scale: DVec3) -> Result<Shape> {
        let shape = match *self {
            Shape::Box { half_extents } => Shape::Box {
                half_extents: half_extents * scale,
            },
            Shape::Sphere { radius } => {
                if scale.x != scale.y || scale.y != scale.z {
                    return Err(PhysicsError::InvalidShape(format!(
                        "sphere cannot be scaled non-uniformly by {scale}"
                    )));
                }
                Shape::Sphere {
                    radius: radius * scale.x,
                }
            }
            Shape::Cylinder { radius, height } => {
                if scale.x != scale.z {
                    return Err(PhysicsError::InvalidShape(format!(
                        "cylinder cross-section cannot be scaled unevenly by {scale}"
                    )));
                }
                Shape::Cylinder {
                    radius: radius * scale.x,
                    height: height * scale.y,
                }
            }
        };
        shape.validate()?;
        Ok(shape)
    }

    /// Rejects shapes with non-positive or non-finite dimensions.
    pub fn validate(&self) -> Result<()> {
        let volume = self.volume();
        if !volume.is_finite() || volume <= 0.0 {
            return Err(PhysicsError::InvalidShape(format!("{self:?} has volume {volume}")));
        }
        let positive = match *self {
            Shape::Box { half_extents } => half_extents.cmpgt(DVec3::ZERO).all(),
            Shape::Sphere { radius } => radius > 0.0,
            Shape::Cylinder { radius, height } => radius > 0.0 && height > 0.0,
        };
        if !positive {
            return Err(PhysicsError::InvalidShape(format!("{self:?} has a non-positive dimension")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::DQuat;

    #[test]
    fn unit_cube_volume_and_inertia() {
        let cube = Shape::cube(1.0);
        assert_relative_eq!(cube.volume(), 1.0);
        let inertia = cube.inertia(1.0);
        assert_relative_eq!(inertia.x_axis.x, 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(inertia.z_axis.z, 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn negative_dimensions_are_rejected() {
        assert!(Shape::cuboid(1.0, -1.0, -1.0).validate().is_err());
        assert!(Shape::sphere(0.0).validate().is_err());
        assert!(Shape::cylinder(1.0, 2.0).validate().is_ok());
    }

    #[test]
    fn rotated_box_bounds_grow() {
        let shape = Shape::cuboid(2.0, 1.0, 1.0);
        let cframe = CFrame::from_rotation(DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2));
        let bounds = shape.world_bounds(&cframe);
        assert_relative_eq!(bounds.max.x, 0.5, epsilon = 1e-9);
        assert_relative_eq!(bounds.max.y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn sphere_rejects_uneven_scale() {
        assert!(Shape::sphere(1.0).scaled(DVec3::new(1.0, 2.0, 1.0)).is_err());
        let scaled = Shape::cube(1.0).scaled(DVec3::new(2.0, 1.0, 1.0)).expect("box scales freely");
        assert_relative_eq!(scaled.volume(), 2.0);
    }
}
