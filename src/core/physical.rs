use glam::{DMat3, DVec3};

use super::constraints::ConstraintLink;
use super::part::Part;
use super::types::{CFrame, MassProperties, Motion};
use crate::error::{PhysicsError, Result};
use crate::utils::allocator::{Arena, PartId, PhysicalId};
use crate::utils::math::skew;

/// A part welded into a physical at a fixed offset from the physical's frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachedPart {
    pub attachment: CFrame,
    pub part: PartId,
}

/// Edge from a child physical up to its parent.
#[derive(Debug)]
pub struct ParentLink {
    pub parent: PhysicalId,
    pub link: ConstraintLink,
}

/// Root-only state: the whole tree moving as one rigid composite.
#[derive(Debug, Clone, Copy)]
pub struct MotorizedPhysical {
    /// Mass properties of every physical in the tree, in the root's frame.
    pub(crate) mass_properties: MassProperties,
    pub(crate) inverse_inertia: DMat3,
    /// Motion of the tree's center of mass.
    pub(crate) motion: Motion,
}

impl MotorizedPhysical {
    pub(crate) fn new(mass_properties: MassProperties, inverse_inertia: DMat3, motion: Motion) -> Self {
        Self {
            mass_properties,
            inverse_inertia,
            motion,
        }
    }

    pub fn total_mass(&self) -> f64 {
        self.mass_properties.mass
    }

    /// Tree center of mass in the root physical's frame.
    pub fn total_center_of_mass(&self) -> DVec3 {
        self.mass_properties.center_of_mass
    }

    /// Tree inertia about the tree center of mass, in root axes.
    pub fn total_inertia(&self) -> DMat3 {
        self.mass_properties.inertia
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    /// Immediately changes the tree's motion by an impulse acting `offset` away from
    /// the tree center of mass (world axes). `root_frame` orients the local inertia.
    pub(crate) fn apply_impulse(&mut self, root_frame: &CFrame, offset: DVec3, impulse: DVec3) {
        self.motion.velocity += impulse / self.mass_properties.mass;
        self.apply_angular_impulse(root_frame, offset.cross(impulse));
    }

    pub(crate) fn apply_angular_impulse(&mut self, root_frame: &CFrame, angular_impulse: DVec3) {
        let local = root_frame.relative_to_local(angular_impulse);
        self.motion.angular_velocity += root_frame.local_to_relative(self.inverse_inertia * local);
    }

    /// Point acceleration matrix of the whole tree at `local_point`, an offset from
    /// the tree center of mass in root axes.
    pub fn point_acceleration_matrix(&self, local_point: DVec3) -> DMat3 {
        point_acceleration_matrix(self.mass_properties.mass, &self.inverse_inertia, local_point)
    }

    /// Effective mass of the whole tree at `local_point` along `direction` (root axes).
    pub fn inertia_of_point_in_direction(&self, local_point: DVec3, direction: DVec3) -> f64 {
        inertia_in_direction(&self.point_acceleration_matrix(local_point), direction)
    }
}

/// `(1/m)·𝟙 + [r]ᵀ I⁻¹ [r]`: acceleration of the point at `r` per unit force applied there.
fn point_acceleration_matrix(mass: f64, inverse_inertia: &DMat3, r: DVec3) -> DMat3 {
    let r = skew(r);
    let rotation_factor = r.transpose() * *inverse_inertia * r;
    let movement_factor = DMat3::from_diagonal(DVec3::splat(1.0 / mass));
    rotation_factor + movement_factor
}

fn inertia_in_direction(matrix: &DMat3, direction: DVec3) -> f64 {
    let acceleration = *matrix * direction;
    1.0 / (acceleration.dot(direction) / direction.length_squared())
}

/// Rigid aggregate of one or more parts with no internal relative motion.
#[derive(Debug)]
pub struct Physical {
    pub(crate) parts: Vec<AttachedPart>,
    pub(crate) cframe: CFrame,
    pub(crate) mass_properties: MassProperties,
    pub(crate) inverse_inertia: DMat3,
    pub(crate) motion: Motion,
    pub(crate) total_force: DVec3,
    pub(crate) total_moment: DVec3,
    pub(crate) parent: Option<ParentLink>,
    pub(crate) children: Vec<PhysicalId>,
    /// Root of the tree this physical belongs to; itself when it is the root.
    pub(crate) main: PhysicalId,
    pub(crate) motorized: Option<MotorizedPhysical>,
}

impl Physical {
    /// Root physical at `cframe` for a first part with `part_props`.
    ///
    /// The member list starts empty; the world pushes the part once it has an id.
    pub(crate) fn new(id: PhysicalId, cframe: CFrame, part_props: &MassProperties) -> Result<Self> {
        let mass_properties = MassProperties::aggregate([(CFrame::IDENTITY, part_props)])?;
        let inverse_inertia = mass_properties.inverse_inertia()?;
        Ok(Self {
            parts: Vec::new(),
            cframe,
            mass_properties,
            inverse_inertia,
            motion: Motion::default(),
            total_force: DVec3::ZERO,
            total_moment: DVec3::ZERO,
            parent: None,
            children: Vec::new(),
            main: id,
            motorized: Some(MotorizedPhysical::new(mass_properties, inverse_inertia, Motion::default())),
        })
    }

    /// Aggregates a prospective member list without touching any physical.
    pub(crate) fn aggregate_members(members: &[AttachedPart], parts: &Arena<PartId, Part>) -> Result<MassProperties> {
        let mut resolved = Vec::with_capacity(members.len());
        for member in members {
            let part = parts.get(member.part).ok_or(PhysicsError::UnknownPart(member.part))?;
            resolved.push((member.attachment, part.mass_properties()));
        }
        MassProperties::aggregate(resolved.iter().copied())
    }

    /// Recomputes mass, center of mass and inertia from the current member list.
    pub fn refresh_with_new_parts(&mut self, parts: &Arena<PartId, Part>) -> Result<()> {
        let mass_properties = Self::aggregate_members(&self.parts, parts)?;
        self.set_mass_properties(mass_properties)
    }

    pub(crate) fn set_mass_properties(&mut self, mass_properties: MassProperties) -> Result<()> {
        self.inverse_inertia = mass_properties.inverse_inertia()?;
        self.mass_properties = mass_properties;
        Ok(())
    }

    pub fn parts(&self) -> &[AttachedPart] {
        &self.parts
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub(crate) fn attachment_of(&self, part: PartId) -> Option<CFrame> {
        self.parts.iter().find(|p| p.part == part).map(|p| p.attachment)
    }

    /// The part that anchors this physical (its first member).
    pub fn main_part(&self) -> Option<PartId> {
        self.parts.first().map(|p| p.part)
    }

    pub fn cframe(&self) -> &CFrame {
        &self.cframe
    }

    pub fn mass(&self) -> f64 {
        self.mass_properties.mass
    }

    /// Center of mass in the physical's own frame.
    pub fn local_center_of_mass(&self) -> DVec3 {
        self.mass_properties.center_of_mass
    }

    /// Center of mass in world space.
    pub fn center_of_mass(&self) -> DVec3 {
        self.cframe.local_point_to_global(self.mass_properties.center_of_mass)
    }

    /// Inertia about the center of mass, in the physical's axes.
    pub fn inertia(&self) -> DMat3 {
        self.mass_properties.inertia
    }

    pub fn mass_properties(&self) -> &MassProperties {
        &self.mass_properties
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    pub fn velocity(&self) -> DVec3 {
        self.motion.velocity
    }

    pub fn angular_velocity(&self) -> DVec3 {
        self.motion.angular_velocity
    }

    pub fn total_force(&self) -> DVec3 {
        self.total_force
    }

    pub fn total_moment(&self) -> DVec3 {
        self.total_moment
    }

    pub fn is_main_physical(&self) -> bool {
        self.motorized.is_some()
    }

    pub fn main_physical(&self) -> PhysicalId {
        self.main
    }

    pub fn motorized(&self) -> Option<&MotorizedPhysical> {
        self.motorized.as_ref()
    }

    pub fn parent_physical(&self) -> Option<PhysicalId> {
        self.parent.as_ref().map(|p| p.parent)
    }

    pub fn parent_link(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    pub fn child_physicals(&self) -> &[PhysicalId] {
        &self.children
    }

    pub fn apply_force_at_center_of_mass(&mut self, force: DVec3) {
        self.total_force += force;
    }

    /// `origin` is the application point's offset from the center of mass, in world axes.
    pub fn apply_force(&mut self, origin: DVec3, force: DVec3) {
        self.total_force += force;
        self.apply_moment(origin.cross(force));
    }

    pub fn apply_moment(&mut self, moment: DVec3) {
        self.total_moment += moment;
    }

    pub(crate) fn clear_accumulators(&mut self) {
        self.total_force = DVec3::ZERO;
        self.total_moment = DVec3::ZERO;
    }

    /// Velocity of a point offset from the center of mass (world axes).
    pub fn velocity_of_point(&self, offset: DVec3) -> DVec3 {
        self.motion.velocity_of_point(offset)
    }

    /// Linear acceleration the pending force would cause on this physical alone.
    pub fn acceleration(&self) -> DVec3 {
        self.total_force / self.mass_properties.mass
    }

    /// Angular acceleration the pending moment would cause, solved in local axes.
    pub fn angular_acceleration(&self) -> DVec3 {
        let local_moment = self.cframe.relative_to_local(self.total_moment);
        self.cframe.local_to_relative(self.inverse_inertia * local_moment)
    }

    pub fn acceleration_of_point(&self, offset: DVec3) -> DVec3 {
        self.acceleration() + self.angular_acceleration().cross(offset)
    }

    pub fn velocity_kinetic_energy(&self) -> f64 {
        self.mass_properties.mass * self.motion.velocity.length_squared() / 2.0
    }

    pub fn angular_kinetic_energy(&self) -> f64 {
        let local_angular = self.cframe.relative_to_local(self.motion.angular_velocity);
        (self.mass_properties.inertia * local_angular).dot(local_angular) / 2.0
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.velocity_kinetic_energy() + self.angular_kinetic_energy()
    }

    /// Matrix `M` with `a = M · F` for a force `F` applied at `local_point`
    /// (offset from the center of mass, physical axes).
    pub fn point_acceleration_matrix(&self, local_point: DVec3) -> DMat3 {
        point_acceleration_matrix(self.mass_properties.mass, &self.inverse_inertia, local_point)
    }

    /// Effective mass felt when pushing `local_point` along `direction` (physical axes).
    pub fn inertia_of_point_in_direction(&self, local_point: DVec3, direction: DVec3) -> f64 {
        inertia_in_direction(&self.point_acceleration_matrix(local_point), direction)
    }

    /// Moves the physical and writes the new placement to every member part.
    pub fn set_cframe(&mut self, cframe: CFrame, parts: &mut Arena<PartId, Part>) {
        self.cframe = cframe;
        self.write_part_cframes(parts);
    }

    pub(crate) fn write_part_cframes(&self, parts: &mut Arena<PartId, Part>) {
        for member in &self.parts {
            if let Some(part) = parts.get_mut(member.part) {
                part.cframe = self.cframe.local_to_global(&member.attachment);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::allocator::{ArenaKey, GenerationalId};
    use approx::assert_relative_eq;

    fn lone_physical(mass: f64, inertia: DMat3) -> Physical {
        let props = MassProperties {
            mass,
            center_of_mass: DVec3::ZERO,
            inertia,
        };
        Physical::new(PhysicalId::from_raw(GenerationalId::new(0, 0)), CFrame::IDENTITY, &props)
            .expect("valid physical")
    }

    #[test]
    fn off_center_force_adds_moment() {
        let mut physical = lone_physical(2.0, DMat3::IDENTITY);
        physical.apply_force(DVec3::X, DVec3::Y);
        assert_eq!(physical.total_force(), DVec3::Y);
        assert_eq!(physical.total_moment(), DVec3::Z);
        assert_relative_eq!(physical.acceleration().y, 0.5);
        assert_relative_eq!(physical.angular_acceleration().z, 1.0);
    }

    #[test]
    fn point_matrix_at_center_is_inverse_mass() {
        let physical = lone_physical(4.0, DMat3::from_diagonal(DVec3::new(1.0, 2.0, 3.0)));
        let m = physical.point_acceleration_matrix(DVec3::ZERO);
        assert_relative_eq!(m.x_axis.x, 0.25);
        assert_relative_eq!(m.y_axis.x, 0.0);
        assert_relative_eq!(physical.inertia_of_point_in_direction(DVec3::ZERO, DVec3::Y * 5.0), 4.0);
    }

    #[test]
    fn point_matrix_matches_diagonal_closed_form() {
        let (ix, iy, iz) = (1.0, 2.0, 3.0);
        let physical = lone_physical(1.0, DMat3::from_diagonal(DVec3::new(ix, iy, iz)));
        let r = DVec3::new(0.5, -1.0, 2.0);
        let m = physical.point_acceleration_matrix(r);
        assert_relative_eq!(m.x_axis.x, 1.0 + r.z * r.z / iy + r.y * r.y / iz, epsilon = 1e-12);
        assert_relative_eq!(m.y_axis.y, 1.0 + r.x * r.x / iz + r.z * r.z / ix, epsilon = 1e-12);
        assert_relative_eq!(m.z_axis.z, 1.0 + r.y * r.y / ix + r.x * r.x / iy, epsilon = 1e-12);
        assert_relative_eq!(m.y_axis.x, -r.x * r.y / iz, epsilon = 1e-12);
        assert_relative_eq!(m.z_axis.x, -r.x * r.z / iy, epsilon = 1e-12);
        assert_relative_eq!(m.z_axis.y, -r.y * r.z / ix, epsilon = 1e-12);
    }

    #[test]
    fn kinetic_energy_sums_both_terms() {
        let mut physical = lone_physical(2.0, DMat3::from_diagonal(DVec3::new(1.0, 4.0, 1.0)));
        physical.motion = Motion::new(DVec3::new(3.0, 0.0, 0.0), DVec3::new(0.0, 0.5, 0.0));
        assert_relative_eq!(physical.velocity_kinetic_energy(), 9.0);
        assert_relative_eq!(physical.angular_kinetic_energy(), 0.5);
        assert_relative_eq!(physical.kinetic_energy(), 9.5);
    }
}
