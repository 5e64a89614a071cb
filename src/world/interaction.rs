//! Forces, impulses and motion queries routed through the world.

use glam::{DMat3, DVec3};

use super::PhysicsWorld;
use crate::{
    core::{physical::MotorizedPhysical, types::CFrame},
    dynamics::integrator::Integrator,
    error::{PhysicsError, Result},
    utils::{
        allocator::{PartId, PhysicalId},
        debug::VectorKind,
    },
};

impl PhysicsWorld {
    /// Queues a force through the center of mass of `physical`.
    pub fn apply_force_at_center_of_mass(&mut self, physical: PhysicalId, force: DVec3) -> Result<()> {
        let target = self.physical_mut(physical)?;
        target.apply_force_at_center_of_mass(force);
        let origin = target.center_of_mass();
        self.observer.log_vector(origin, force, VectorKind::Force);
        Ok(())
    }

    /// Queues a force applied `origin` away from the center of mass (world axes).
    pub fn apply_force(&mut self, physical: PhysicalId, origin: DVec3, force: DVec3) -> Result<()> {
        let target = self.physical_mut(physical)?;
        target.apply_force(origin, force);
        let at = target.center_of_mass() + origin;
        self.observer.log_vector(at, force, VectorKind::Force);
        Ok(())
    }

    pub fn apply_moment(&mut self, physical: PhysicalId, moment: DVec3) -> Result<()> {
        let target = self.physical_mut(physical)?;
        target.apply_moment(moment);
        let origin = target.center_of_mass();
        self.observer.log_vector(origin, moment, VectorKind::Moment);
        Ok(())
    }

    /// Instantly changes the motion of `physical`'s tree by an impulse through
    /// `physical`'s center of mass.
    pub fn apply_impulse_at_center_of_mass(&mut self, physical: PhysicalId, impulse: DVec3) -> Result<()> {
        let point = self.physical_ref(physical)?.center_of_mass();
        self.observer.log_vector(point, impulse, VectorKind::Impulse);
        self.apply_tree_impulse(physical, point, impulse)
    }

    /// Impulse applied `origin` away from `physical`'s center of mass (world axes).
    pub fn apply_impulse(&mut self, physical: PhysicalId, origin: DVec3, impulse: DVec3) -> Result<()> {
        let point = self.physical_ref(physical)?.center_of_mass() + origin;
        self.observer.log_vector(point, impulse, VectorKind::Impulse);
        self.apply_tree_impulse(physical, point, impulse)
    }

    pub fn apply_angular_impulse(&mut self, physical: PhysicalId, angular_impulse: DVec3) -> Result<()> {
        let root = self.physical_ref(physical)?.main;
        let origin = self.physical_ref(physical)?.center_of_mass();
        self.observer
            .log_vector(origin, angular_impulse, VectorKind::AngularImpulse);

        let root_physical = self.physical_mut(root)?;
        let frame = root_physical.cframe;
        root_physical
            .motorized
            .as_mut()
            .ok_or_else(|| PhysicsError::BrokenInvariant(format!("{root} has no tree state")))?
            .apply_angular_impulse(&frame, angular_impulse);

        let members = self.tree_members(root)?;
        self.update_derived_motion(root, &members)
    }

    /// Routes an impulse at world `point` to the root's tree motion.
    fn apply_tree_impulse(&mut self, physical: PhysicalId, point: DVec3, impulse: DVec3) -> Result<()> {
        let root = self.physical_ref(physical)?.main;
        let tree_center = self.tree_center_of_mass(root)?;

        let root_physical = self.physical_mut(root)?;
        let frame = root_physical.cframe;
        root_physical
            .motorized
            .as_mut()
            .ok_or_else(|| PhysicsError::BrokenInvariant(format!("{root} has no tree state")))?
            .apply_impulse(&frame, point - tree_center, impulse);

        let members = self.tree_members(root)?;
        self.update_derived_motion(root, &members)
    }

    /// Velocity of the point `offset` away from `physical`'s center of mass.
    pub fn velocity_of_point(&self, physical: PhysicalId, offset: DVec3) -> Result<DVec3> {
        Ok(self.physical_ref(physical)?.velocity_of_point(offset))
    }

    /// Acceleration the next tick gives the point `offset` away from `physical`'s
    /// center of mass, from the forces pending on its whole tree.
    ///
    /// Gravity and registered generators are only added inside `step`, so they
    /// are not part of the prediction.
    pub fn acceleration_of_point(&self, physical: PhysicalId, offset: DVec3) -> Result<DVec3> {
        let point = self.physical_ref(physical)?.center_of_mass() + offset;
        let tree = self.tree_body(physical)?;
        let (force, moment) = self.pending_tree_load(tree.root)?;
        let (acceleration, angular_acceleration) = Integrator::accelerations(
            &tree.frame,
            tree.state.total_mass(),
            &tree.state.inverse_inertia,
            force,
            moment,
        );
        Ok(acceleration + angular_acceleration.cross(point - tree.center))
    }

    pub fn kinetic_energy(&self, physical: PhysicalId) -> Result<f64> {
        Ok(self.physical_ref(physical)?.kinetic_energy())
    }

    /// Point acceleration matrix, in world axes, at a world-space point of `part`.
    ///
    /// Uses the mass properties of the whole tree, which is what an impulse at
    /// that point moves.
    pub fn point_acceleration_matrix_at(&self, part: PartId, point: DVec3) -> Result<DMat3> {
        let tree = self.tree_body(self.physical_of(part)?)?;
        let local = tree.frame.relative_to_local(point - tree.center);
        let rotation = DMat3::from_quat(tree.frame.rotation);
        Ok(rotation * tree.state.point_acceleration_matrix(local) * rotation.transpose())
    }

    /// Effective mass felt when pushing a world-space point of `part` along `direction`.
    pub fn effective_inertia_at(&self, part: PartId, point: DVec3, direction: DVec3) -> Result<f64> {
        let tree = self.tree_body(self.physical_of(part)?)?;
        let local = tree.frame.relative_to_local(point - tree.center);
        let local_direction = tree.frame.relative_to_local(direction);
        Ok(tree.state.inertia_of_point_in_direction(local, local_direction))
    }

    fn tree_body(&self, physical: PhysicalId) -> Result<TreeBody> {
        let root = self.physical_ref(physical)?.main;
        let root_physical = self.physical_ref(root)?;
        let state = *root_physical
            .motorized
            .as_ref()
            .ok_or_else(|| PhysicsError::BrokenInvariant(format!("{root} has no tree state")))?;
        Ok(TreeBody {
            root,
            frame: root_physical.cframe,
            center: root_physical.cframe.local_point_to_global(state.total_center_of_mass()),
            state,
        })
    }
}

/// Snapshot of a tree's composite body as seen from world space.
struct TreeBody {
    root: PhysicalId,
    frame: CFrame,
    center: DVec3,
    state: MotorizedPhysical,
}
