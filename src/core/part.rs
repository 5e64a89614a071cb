use glam::{DMat3, DVec3};

use super::shape::{Bounds, Shape};
use super::types::{CFrame, MassProperties, PartProperties};
use crate::error::{PhysicsError, Result};
use crate::utils::allocator::PhysicalId;

/// Indivisible rigid shape with its own mass properties and world placement.
///
/// A part is always owned by exactly one [`Physical`](super::physical::Physical);
/// parts are created and destroyed through [`PhysicsWorld`](crate::world::PhysicsWorld).
#[derive(Debug, Clone)]
pub struct Part {
    pub(crate) cframe: CFrame,
    pub(crate) parent: PhysicalId,
    hitbox: Shape,
    max_radius: f64,
    properties: PartProperties,
    mass_properties: MassProperties,
    /// Extra surface velocity handed to contact resolution.
    ///
    /// On an anchored part this is the velocity something resting on it should be
    /// carried along with, the relative velocity at which no friction acts.
    pub conveyor_effect: DVec3,
}

impl Part {
    pub(crate) fn new(
        hitbox: Shape,
        cframe: CFrame,
        properties: PartProperties,
        parent: PhysicalId,
    ) -> Result<Self> {
        let mass_properties = Self::compute_mass_properties(&hitbox, &properties)?;
        Ok(Self {
            cframe,
            parent,
            max_radius: hitbox.bounding_radius(),
            hitbox,
            properties,
            mass_properties,
            conveyor_effect: DVec3::ZERO,
        })
    }

    /// Mass and inertia of `shape` filled with `properties.density`.
    pub fn compute_mass_properties(shape: &Shape, properties: &PartProperties) -> Result<MassProperties> {
        if !properties.density.is_finite() || properties.density <= 0.0 {
            return Err(PhysicsError::InvalidDensity(properties.density));
        }
        shape.validate()?;

        let mass = shape.volume() * properties.density;
        Ok(MassProperties {
            mass,
            center_of_mass: shape.center_of_mass(),
            inertia: shape.inertia(mass),
        })
    }

    pub fn cframe(&self) -> &CFrame {
        &self.cframe
    }

    pub fn position(&self) -> DVec3 {
        self.cframe.position
    }

    /// Owning physical.
    pub fn parent(&self) -> PhysicalId {
        self.parent
    }

    pub fn shape(&self) -> &Shape {
        &self.hitbox
    }

    pub fn properties(&self) -> &PartProperties {
        &self.properties
    }

    pub fn mass(&self) -> f64 {
        self.mass_properties.mass
    }

    /// Inertia about the part's own center of mass, in part axes.
    pub fn inertia(&self) -> DMat3 {
        self.mass_properties.inertia
    }

    pub fn local_center_of_mass(&self) -> DVec3 {
        self.mass_properties.center_of_mass
    }

    pub fn mass_properties(&self) -> &MassProperties {
        &self.mass_properties
    }

    pub fn max_radius(&self) -> f64 {
        self.max_radius
    }

    pub fn local_bounds(&self) -> Bounds {
        self.hitbox.local_bounds()
    }

    /// Tight world-space bounds at the current placement.
    pub fn strict_bounds(&self) -> Bounds {
        self.hitbox.world_bounds(&self.cframe)
    }

    pub fn center_of_mass(&self) -> DVec3 {
        self.cframe.local_point_to_global(self.mass_properties.center_of_mass)
    }

    /// Computes what this part would look like after scaling, without changing it.
    pub(crate) fn rescaled(&self, scale: DVec3) -> Result<(Shape, MassProperties)> {
        let hitbox = self.hitbox.scaled(scale)?;
        let mass_properties = Self::compute_mass_properties(&hitbox, &self.properties)?;
        Ok((hitbox, mass_properties))
    }

    pub(crate) fn set_shape(&mut self, hitbox: Shape, mass_properties: MassProperties) {
        self.max_radius = hitbox.bounding_radius();
        self.hitbox = hitbox;
        self.mass_properties = mass_properties;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::allocator::{ArenaKey, GenerationalId};
    use approx::assert_relative_eq;

    fn any_parent() -> PhysicalId {
        PhysicalId::from_raw(GenerationalId::new(0, 0))
    }

    #[test]
    fn density_scales_mass_and_inertia() {
        let part = Part::new(
            Shape::cube(2.0),
            CFrame::IDENTITY,
            PartProperties::new(3.0, 0.5),
            any_parent(),
        )
        .expect("valid part");
        assert_relative_eq!(part.mass(), 24.0);
        // m (ly² + lz²) / 12 with l = 2
        assert_relative_eq!(part.inertia().x_axis.x, 24.0 * 8.0 / 12.0, epsilon = 1e-12);
        assert_relative_eq!(part.max_radius(), 3f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn non_positive_density_is_rejected() {
        let result = Part::new(
            Shape::cube(1.0),
            CFrame::IDENTITY,
            PartProperties::new(0.0, 0.5),
            any_parent(),
        );
        assert_eq!(result.unwrap_err(), PhysicsError::InvalidDensity(0.0));
    }

    #[test]
    fn rescale_reports_new_mass() {
        let part = Part::new(Shape::cube(1.0), CFrame::IDENTITY, PartProperties::default(), any_parent())
            .expect("valid part");
        let (shape, props) = part.rescaled(DVec3::new(2.0, 1.0, 1.0)).expect("box scales");
        assert_relative_eq!(shape.volume(), 2.0);
        assert_relative_eq!(props.mass, 2.0);
    }

    #[test]
    fn bounds_follow_placement() {
        let cframe = CFrame::from_position(DVec3::new(5.0, 0.0, 0.0));
        let part = Part::new(Shape::cuboid(2.0, 1.0, 4.0), cframe, PartProperties::default(), any_parent())
            .expect("valid part");
        assert_eq!(part.local_bounds().extents(), DVec3::new(2.0, 1.0, 4.0));

        let bounds = part.strict_bounds();
        assert!(bounds.contains(part.center_of_mass()));
        assert!(bounds.contains(DVec3::new(6.0, 0.5, -2.0)));
        assert!(!bounds.contains(DVec3::ZERO));
    }
}
