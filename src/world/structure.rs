//! Structural edits: creating parts, welding, constraining, detaching.
//!
//! Every edit validates its preconditions and pre-aggregates the prospective
//! mass properties before mutating anything, so a rejected edit leaves the world
//! exactly as it was.

use glam::DVec3;
use log::{debug, warn};

use super::PhysicsWorld;
use crate::{
    core::{
        constraints::{ConstraintLink, HardConstraint},
        part::Part,
        physical::{AttachedPart, ParentLink, Physical},
        shape::Shape,
        types::{CFrame, MassProperties, Motion, PartProperties},
    },
    error::{PhysicsError, Result},
    utils::allocator::{PartId, PhysicalId},
};

impl PhysicsWorld {
    /// Creates a free-standing part at `cframe`, owned by a fresh one-part physical.
    pub fn create_part(&mut self, shape: Shape, cframe: CFrame, properties: PartProperties) -> Result<PartId> {
        let mass_properties = Part::compute_mass_properties(&shape, &properties)?;
        let physical_id = self
            .physicals
            .try_insert_with(|id| Physical::new(id, cframe, &mass_properties))?;

        let part = match Part::new(shape, cframe, properties, physical_id) {
            Ok(part) => part,
            Err(err) => {
                self.physicals.remove(physical_id);
                return Err(err);
            }
        };
        let part_id = self.parts.insert(part);
        self.physical_mut(physical_id)?.parts.push(AttachedPart {
            attachment: CFrame::IDENTITY,
            part: part_id,
        });

        debug!("created {part_id} in {physical_id}");
        Ok(part_id)
    }

    /// Welds `other` and everything rigidly attached to it into `part`'s physical,
    /// placing `other` at `relative` in `part`'s frame.
    ///
    /// Physicals constrained to `other`'s physical are re-hung from `part`'s
    /// physical with the same joint placement. The merged tree keeps the motion
    /// of `part`'s tree.
    pub fn attach(&mut self, part: PartId, other: PartId, relative: CFrame) -> Result<()> {
        let pa = self.physical_of(part)?;
        let pb = self.physical_of(other)?;
        if pa == pb {
            return Err(PhysicsError::AlreadyAttached {
                part: other,
                physical: pa,
            });
        }
        if self.physical_ref(pa)?.main == self.physical_ref(pb)?.main {
            return Err(PhysicsError::WouldCreateCycle { a: pa, b: pb });
        }

        let attach_a = self.member_attachment(pa, part)?;
        let attach_b = self.member_attachment(pb, other)?;
        // pb's frame expressed in pa's frame
        let offset = attach_a * relative * attach_b.inverse();

        let mut merged: Vec<AttachedPart> = self.physical_ref(pa)?.parts.clone();
        merged.extend(self.physical_ref(pb)?.parts.iter().map(|member| AttachedPart {
            attachment: offset * member.attachment,
            part: member.part,
        }));
        let mass_properties = Physical::aggregate_members(&merged, &self.parts)?;
        mass_properties.inverse_inertia()?;

        self.make_main_physical(pb)?;

        let absorbed = self
            .physicals
            .remove(pb)
            .ok_or(PhysicsError::UnknownPhysical(pb))?;
        for &child in &absorbed.children {
            let child_physical = self.physical_mut(child)?;
            if let Some(link) = child_physical.parent.as_mut() {
                link.parent = pa;
                link.link.remount_parent(&offset);
            }
        }
        for member in &absorbed.parts {
            self.part_mut_ref(member.part)?.parent = pa;
        }

        let physical = self.physical_mut(pa)?;
        physical.parts = merged;
        physical.children.extend(absorbed.children.iter().copied());
        physical.set_mass_properties(mass_properties)?;
        let root = physical.main;

        self.reassign_main(root)?;
        self.rebuild_motorized(root)?;
        debug!("welded {other} into {pa} (absorbed {pb})");
        Ok(())
    }

    /// Links `other`'s physical below `part`'s physical through `constraint`.
    ///
    /// `attach_on_part` and `attach_on_other` give the joint frame in each part's
    /// frame. `other`'s tree is re-rooted at its physical and demoted under
    /// `part`'s tree, whose motion the combined tree keeps.
    pub fn attach_with_constraint(
        &mut self,
        part: PartId,
        other: PartId,
        constraint: Box<dyn HardConstraint>,
        attach_on_part: CFrame,
        attach_on_other: CFrame,
    ) -> Result<PhysicalId> {
        let pa = self.physical_of(part)?;
        let pb = self.physical_of(other)?;
        if pa == pb || self.physical_ref(pa)?.main == self.physical_ref(pb)?.main {
            return Err(PhysicsError::WouldCreateCycle { a: pa, b: pb });
        }

        let link = ConstraintLink::new(
            constraint,
            self.member_attachment(pa, part)? * attach_on_part,
            self.member_attachment(pb, other)? * attach_on_other,
        );

        self.make_main_physical(pb)?;

        let child = self.physical_mut(pb)?;
        child.motorized = None;
        child.parent = Some(ParentLink { parent: pa, link });
        let parent = self.physical_mut(pa)?;
        parent.children.push(pb);
        let root = parent.main;

        self.reassign_main(root)?;
        self.rebuild_motorized(root)?;
        debug!("constrained {pb} below {pa}, tree root {root}");
        Ok(root)
    }

    /// Links two trees, demoting whichever tree has fewer physicals.
    ///
    /// Ties demote `other`'s tree. When `part`'s tree is demoted the constraint
    /// is inverted so that it still describes `other`'s joint relative to
    /// `part`'s; non-invertible constraints always demote `other`'s tree.
    pub fn connect(
        &mut self,
        part: PartId,
        other: PartId,
        mut constraint: Box<dyn HardConstraint>,
        attach_on_part: CFrame,
        attach_on_other: CFrame,
    ) -> Result<PhysicalId> {
        let own_size = self.connected_physical_count(self.physical_of(part)?)?;
        let other_size = self.connected_physical_count(self.physical_of(other)?)?;

        if own_size < other_size {
            if constraint.is_invertible() {
                constraint.invert();
                return self.attach_with_constraint(other, part, constraint, attach_on_other, attach_on_part);
            }
            warn!("constraint between {part} and {other} is not invertible; demoting the larger tree");
        }
        self.attach_with_constraint(part, other, constraint, attach_on_part, attach_on_other)
    }

    /// Removes `part` from its physical, leaving it free-standing at its current pose.
    ///
    /// The remaining members are trusted to stay rigidly connected. A part that
    /// is the only member of its physical takes that physical out of its tree;
    /// its constrained children become independent trees.
    pub fn detach(&mut self, part: PartId) -> Result<()> {
        let physical_id = self.physical_of(part)?;
        let physical = self.physical_ref(physical_id)?;
        if !physical.parts.iter().any(|member| member.part == part) {
            return Err(PhysicsError::PartNotInPhysical {
                part,
                physical: physical_id,
            });
        }

        if physical.parts.len() == 1 {
            return self.isolate_physical(physical_id);
        }

        let remaining: Vec<AttachedPart> = physical
            .parts
            .iter()
            .filter(|member| member.part != part)
            .copied()
            .collect();
        let mass_properties = Physical::aggregate_members(&remaining, &self.parts)?;
        mass_properties.inverse_inertia()?;

        let detached = self.part_ref(part)?;
        let (cframe, part_props) = (detached.cframe, *detached.mass_properties());
        let inherited = Motion::new(
            physical.velocity_of_point(detached.center_of_mass() - physical.center_of_mass()),
            physical.angular_velocity(),
        );
        let root = physical.main;

        let fresh = self
            .physicals
            .try_insert_with(|id| Physical::new(id, cframe, &part_props))?;

        let old = self.physical_mut(physical_id)?;
        old.parts = remaining;
        old.set_mass_properties(mass_properties)?;

        let new_physical = self.physical_mut(fresh)?;
        new_physical.parts.push(AttachedPart {
            attachment: CFrame::IDENTITY,
            part,
        });
        new_physical.motion = inherited;
        if let Some(motorized) = new_physical.motorized.as_mut() {
            motorized.motion = inherited;
        }
        self.part_mut_ref(part)?.parent = fresh;

        self.rebuild_motorized(fresh)?;
        self.rebuild_motorized(root)?;
        debug!("detached {part} from {physical_id} into {fresh}");
        Ok(())
    }

    /// Cuts a physical out of its tree: it loses its parent edge and every child
    /// edge, and each former child becomes the root of its own subtree.
    fn isolate_physical(&mut self, id: PhysicalId) -> Result<()> {
        let physical = self.physical_mut(id)?;
        let parent = physical.parent.take();
        let children = std::mem::take(&mut physical.children);
        let old_root = physical.main;

        for &child in &children {
            self.physical_mut(child)?.parent = None;
            self.promote_to_root(child)?;
        }

        match parent {
            Some(link) => {
                self.physical_mut(link.parent)?.children.retain(|&c| c != id);
                self.promote_to_root(id)?;
                self.rebuild_motorized(old_root)?;
            }
            None => {
                self.reassign_main(id)?;
                self.rebuild_motorized(id)?;
            }
        }
        Ok(())
    }

    /// Detaches and destroys `part`, together with the physical it leaves behind.
    pub fn remove_part(&mut self, part: PartId) -> Result<()> {
        self.detach(part)?;
        let physical = self.physical_of(part)?;
        self.parts.remove(part);
        self.physicals.remove(physical);
        debug!("removed {part} and {physical}");
        Ok(())
    }

    /// Scales `part`'s shape per axis and re-aggregates its physical.
    pub fn scale_part(&mut self, part: PartId, scale: DVec3) -> Result<()> {
        let physical_id = self.physical_of(part)?;
        let (hitbox, props) = self.part_ref(part)?.rescaled(scale)?;

        let physical = self.physical_ref(physical_id)?;
        let mut resolved = Vec::with_capacity(physical.parts.len());
        for member in &physical.parts {
            let member_props = if member.part == part {
                props
            } else {
                *self.part_ref(member.part)?.mass_properties()
            };
            resolved.push((member.attachment, member_props));
        }
        MassProperties::aggregate(resolved.iter().map(|(frame, props)| (*frame, props)))?.inverse_inertia()?;
        let root = physical.main;

        self.part_mut_ref(part)?.set_shape(hitbox, props);
        self.physicals
            .get_mut(physical_id)
            .ok_or(PhysicsError::UnknownPhysical(physical_id))?
            .refresh_with_new_parts(&self.parts)?;
        self.rebuild_motorized(root)
    }

    /// Moves `part` to `cframe`, carrying its whole tree along rigidly.
    pub fn set_part_cframe(&mut self, part: PartId, cframe: CFrame) -> Result<()> {
        let physical_id = self.physical_of(part)?;
        let attachment = self.member_attachment(physical_id, part)?;
        let physical = self.physical_ref(physical_id)?;
        let root = physical.main;

        let desired = cframe * attachment.inverse();
        let root_in_physical = physical.cframe.global_to_local(&self.physical_ref(root)?.cframe);
        let root_physical = self
            .physicals
            .get_mut(root)
            .ok_or(PhysicsError::UnknownPhysical(root))?;
        root_physical.set_cframe(desired * root_in_physical, &mut self.parts);

        self.full_refresh_of_connected_physicals(root)
    }

    /// Whether `part` anchors its physical.
    pub fn is_main_part(&self, part: PartId) -> Result<bool> {
        let physical = self.physical_ref(self.physical_of(part)?)?;
        Ok(physical.main_part() == Some(part))
    }

    fn member_attachment(&self, physical: PhysicalId, part: PartId) -> Result<CFrame> {
        self.physical_ref(physical)?
            .attachment_of(part)
            .ok_or(PhysicsError::PartNotInPhysical { part, physical })
    }
}
