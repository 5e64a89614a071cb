//! Constraint-tree traversal, re-rooting and refresh.

use std::collections::HashSet;

use glam::DVec3;
use log::{debug, trace};

use super::PhysicsWorld;
use crate::{
    config::MASS_TOLERANCE,
    core::{
        physical::{MotorizedPhysical, ParentLink},
        types::{CFrame, MassProperties, Motion},
    },
    error::{PhysicsError, Result},
    utils::allocator::PhysicalId,
};

impl PhysicsWorld {
    /// Every physical in the tree containing `id`, root first, parents before children.
    pub fn tree_members(&self, id: PhysicalId) -> Result<Vec<PhysicalId>> {
        let root = self.physical_ref(id)?.main;
        let mut members = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![root];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                return Err(PhysicsError::BrokenInvariant(format!(
                    "{current} reached twice while walking tree of {root}"
                )));
            }
            members.push(current);
            // reversed so children come out in insertion order
            stack.extend(self.physical_ref(current)?.children.iter().rev().copied());
        }

        Ok(members)
    }

    /// Number of physicals in the tree containing `id`.
    pub fn connected_physical_count(&self, id: PhysicalId) -> Result<usize> {
        Ok(self.tree_members(id)?.len())
    }

    /// World-space center of mass of the whole tree rooted at `root`.
    pub fn tree_center_of_mass(&self, root: PhysicalId) -> Result<DVec3> {
        let physical = self.physical_ref(root)?;
        let motorized = physical.motorized.as_ref().ok_or_else(|| not_a_root(root))?;
        Ok(physical.cframe.local_point_to_global(motorized.mass_properties.center_of_mass))
    }

    /// Makes `target` the root of its tree, reversing every edge on the path.
    ///
    /// World poses and velocities are unchanged; only edge directions move.
    /// Returns the new root, `target` itself.
    pub fn make_main_physical(&mut self, target: PhysicalId) -> Result<PhysicalId> {
        let old_root = self.physical_ref(target)?.main;
        if old_root == target {
            return Ok(target);
        }

        // validate the whole path before touching any edge
        let mut current = target;
        let mut steps = 0usize;
        let limit = self.physicals.len();
        while let Some(link) = self.physical_ref(current)?.parent.as_ref() {
            if !link.link.constraint.is_invertible() {
                return Err(PhysicsError::ConstraintNotInvertible {
                    parent: link.parent,
                    child: current,
                });
            }
            current = link.parent;
            steps += 1;
            if steps > limit {
                return Err(PhysicsError::NotInTree { target, root: old_root });
            }
        }
        if current != old_root {
            return Err(PhysicsError::NotInTree { target, root: old_root });
        }

        let mut child = target;
        let mut carried = self.physical_mut(target)?.parent.take();
        while let Some(ParentLink { parent, mut link }) = carried {
            link.invert();
            let parent_physical = self.physical_mut(parent)?;
            parent_physical.children.retain(|&c| c != child);
            carried = parent_physical.parent.take();
            parent_physical.parent = Some(ParentLink { parent: child, link });
            self.physical_mut(child)?.children.push(parent);
            child = parent;
        }

        let state = self.physical_mut(old_root)?.motorized.take();
        self.physical_mut(target)?.motorized = state;
        self.reassign_main(target)?;
        self.full_refresh_of_connected_physicals(target)?;

        debug!("re-rooted tree {old_root} at {target} ({steps} edges reversed)");
        Ok(target)
    }

    /// Re-derives every pose, the tree mass properties and every member's motion
    /// from the root's frame and tree motion.
    pub fn full_refresh_of_connected_physicals(&mut self, id: PhysicalId) -> Result<()> {
        let root = self.physical_ref(id)?.main;
        let members = self.tree_members(root)?;
        self.propagate_poses(&members)?;
        self.refresh_tree_mass_properties(root, &members)?;
        self.update_derived_motion(root, &members)?;
        trace!("refreshed {} physicals under {root}", members.len());
        Ok(())
    }

    /// Recomputes tree mass properties after a structural edit.
    ///
    /// The root frame does not move, and the tree keeps the rigid velocity field
    /// it had before the edit: the new tree center of mass picks up whatever
    /// velocity that point already had.
    pub(crate) fn rebuild_motorized(&mut self, root: PhysicalId) -> Result<()> {
        let previous_center = self.tree_center_of_mass(root)?;
        let previous_motion = self
            .physical_ref(root)?
            .motorized
            .as_ref()
            .ok_or_else(|| not_a_root(root))?
            .motion;

        let members = self.tree_members(root)?;
        self.propagate_poses(&members)?;
        self.refresh_tree_mass_properties(root, &members)?;

        let center = self.tree_center_of_mass(root)?;
        if let Some(motorized) = self.physical_mut(root)?.motorized.as_mut() {
            motorized.motion = Motion::new(
                previous_motion.velocity_of_point(center - previous_center),
                previous_motion.angular_velocity,
            );
        }

        self.update_derived_motion(root, &members)
    }

    /// Turns a parentless physical into the root of its own tree.
    pub(crate) fn promote_to_root(&mut self, id: PhysicalId) -> Result<()> {
        let physical = self.physical_mut(id)?;
        physical.parent = None;
        if physical.motorized.is_none() {
            physical.motorized = Some(MotorizedPhysical::new(
                physical.mass_properties,
                physical.inverse_inertia,
                physical.motion,
            ));
        }
        self.reassign_main(id)?;
        self.rebuild_motorized(id)
    }

    /// Points every member of the tree under `root` at `root`.
    pub(crate) fn reassign_main(&mut self, root: PhysicalId) -> Result<()> {
        let mut stack = vec![root];
        let mut visited = HashSet::new();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                return Err(PhysicsError::BrokenInvariant(format!("cycle through {current}")));
            }
            let physical = self.physical_mut(current)?;
            physical.main = root;
            if current != root {
                physical.motorized = None;
            }
            stack.extend(physical.children.iter().copied());
        }
        Ok(())
    }

    fn propagate_poses(&mut self, members: &[PhysicalId]) -> Result<()> {
        for &id in members.iter().skip(1) {
            let physical = self.physical_ref(id)?;
            let link = physical.parent.as_ref().ok_or_else(|| orphan(id))?;
            let (parent, relative) = (link.parent, link.link.child_relative_to_parent());
            let parent_frame = self.physical_ref(parent)?.cframe;
            self.physical_mut(id)?.cframe = parent_frame * relative;
        }

        for &id in members {
            if let Some(physical) = self.physicals.get(id) {
                physical.write_part_cframes(&mut self.parts);
            }
        }
        Ok(())
    }

    fn refresh_tree_mass_properties(&mut self, root: PhysicalId, members: &[PhysicalId]) -> Result<()> {
        let root_frame = self.physical_ref(root)?.cframe;
        let mut resolved = Vec::with_capacity(members.len());
        for &id in members {
            let physical = self.physical_ref(id)?;
            resolved.push((root_frame.global_to_local(&physical.cframe), physical.mass_properties));
        }

        let mass_properties = MassProperties::aggregate(resolved.iter().map(|(frame, props)| (*frame, props)))?;
        let inverse_inertia = mass_properties.inverse_inertia()?;

        let motorized = self
            .physical_mut(root)?
            .motorized
            .as_mut()
            .ok_or_else(|| not_a_root(root))?;
        motorized.mass_properties = mass_properties;
        motorized.inverse_inertia = inverse_inertia;
        Ok(())
    }

    /// Writes each member's motion from the tree motion and the constraint motions.
    pub(super) fn update_derived_motion(&mut self, root: PhysicalId, members: &[PhysicalId]) -> Result<()> {
        let tree_motion = self
            .physical_ref(root)?
            .motorized
            .as_ref()
            .ok_or_else(|| not_a_root(root))?
            .motion;
        let tree_center = self.tree_center_of_mass(root)?;

        let root_physical = self.physical_mut(root)?;
        let root_center = root_physical.center_of_mass();
        root_physical.motion = Motion::new(
            tree_motion.velocity_of_point(root_center - tree_center),
            tree_motion.angular_velocity,
        );

        for &id in members.iter().skip(1) {
            let physical = self.physical_ref(id)?;
            let child_center = physical.center_of_mass();
            let link = physical.parent.as_ref().ok_or_else(|| orphan(id))?;
            let parent = self.physical_ref(link.parent)?;

            let joint: CFrame = parent.cframe * link.link.attach_on_parent;
            let joint_origin = (joint * link.link.constraint.relative_transform()).position;
            let relative = link.link.constraint.relative_motion();
            let relative_angular = joint.local_to_relative(relative.angular_velocity);
            let relative_velocity = joint.local_to_relative(relative.velocity);

            let velocity = parent.motion.velocity_of_point(child_center - parent.center_of_mass())
                + relative_velocity
                + relative_angular.cross(child_center - joint_origin);
            let angular_velocity = parent.motion.angular_velocity + relative_angular;

            self.physical_mut(id)?.motion = Motion::new(velocity, angular_velocity);
        }
        Ok(())
    }

    /// Total kinetic energy of the tree containing `id`.
    pub fn tree_kinetic_energy(&self, id: PhysicalId) -> Result<f64> {
        let mut energy = 0.0;
        for member in self.tree_members(id)? {
            energy += self.physical_ref(member)?.kinetic_energy();
        }
        Ok(energy)
    }

    /// Checks the structural invariants of the tree containing `id`.
    pub fn validate_tree(&self, id: PhysicalId) -> Result<()> {
        let root = self.physical_ref(id)?.main;
        let root_physical = self.physical_ref(root)?;
        if root_physical.main != root || root_physical.parent.is_some() || root_physical.motorized.is_none() {
            return Err(broken(format!("{root} is referenced as a root but is not one")));
        }

        for member in self.tree_members(root)? {
            let physical = self.physical_ref(member)?;
            if physical.main != root {
                return Err(broken(format!("{member} points at root {} instead of {root}", physical.main)));
            }
            if member != root && physical.motorized.is_some() {
                return Err(broken(format!("non-root {member} carries tree state")));
            }
            if physical.parts.is_empty() {
                return Err(broken(format!("{member} has no parts")));
            }

            let mut part_mass = 0.0;
            for attached in &physical.parts {
                let part = self.part_ref(attached.part)?;
                if part.parent != member {
                    return Err(broken(format!(
                        "{} is listed in {member} but points at {}",
                        attached.part, part.parent
                    )));
                }
                part_mass += part.mass();
            }
            if (part_mass - physical.mass()).abs() > MASS_TOLERANCE * part_mass.max(1.0) {
                return Err(broken(format!(
                    "{member} mass {} differs from its parts' {part_mass}",
                    physical.mass()
                )));
            }

            for &child in &physical.children {
                if self.physical_ref(child)?.parent_physical() != Some(member) {
                    return Err(broken(format!("{child} is a child of {member} without a matching parent link")));
                }
            }
        }
        Ok(())
    }

    /// Checks every tree and that every physical is reachable from some root.
    pub fn validate(&self) -> Result<()> {
        let mut reached = 0;
        for root in self.main_physicals() {
            self.validate_tree(root)?;
            reached += self.connected_physical_count(root)?;
        }
        if reached != self.physicals.len() {
            return Err(broken(format!(
                "{} physicals exist but only {reached} hang under a root",
                self.physicals.len()
            )));
        }

        for (id, part) in self.parts.iter() {
            let physical = self.physical_ref(part.parent)?;
            if !physical.parts.iter().any(|p| p.part == id) {
                return Err(PhysicsError::PartNotInPhysical {
                    part: id,
                    physical: part.parent,
                });
            }
        }
        Ok(())
    }
}

fn broken(message: String) -> PhysicsError {
    PhysicsError::BrokenInvariant(message)
}

fn not_a_root(id: PhysicalId) -> PhysicsError {
    broken(format!("{id} has no tree state"))
}

fn orphan(id: PhysicalId) -> PhysicsError {
    broken(format!("{id} is below the root but has no parent link"))
}
