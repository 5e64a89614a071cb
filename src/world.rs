mod interaction;
mod structure;
mod tree;

use glam::DVec3;

use crate::{
    config::{DEFAULT_GRAVITY, TICK_BUDGET_MS},
    core::{
        part::Part,
        physical::Physical,
    },
    dynamics::{
        forces::{ForceGenerator, ForceRegistry, GravityForce},
        integrator::{Integrator, RigidBodyState},
    },
    error::{PhysicsError, Result},
    utils::{
        allocator::{Arena, PartId, PhysicalId},
        debug::{NoopObserver, VectorObserver},
        logging::{warn_if_tick_budget_exceeded, ScopedTimer},
    },
};

/// Construction-time settings for a [`PhysicsWorld`].
#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub gravity: DVec3,
    pub integrator: Integrator,
    /// Integrate disconnected trees on the rayon pool (needs the `parallel` feature).
    pub parallel: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: DVec3::from_array(DEFAULT_GRAVITY),
            integrator: Integrator::default(),
            parallel: false,
        }
    }
}

impl WorldConfig {
    pub fn zero_gravity() -> Self {
        Self {
            gravity: DVec3::ZERO,
            ..Self::default()
        }
    }
}

/// Owns every part and physical and drives the per-tick update.
///
/// All structural edits go through the world so that part→physical and
/// physical→root links are updated together before control returns.
pub struct PhysicsWorld {
    parts: Arena<PartId, Part>,
    physicals: Arena<PhysicalId, Physical>,
    pub integrator: Integrator,
    pub gravity: DVec3,
    pub force_registry: ForceRegistry,
    observer: Box<dyn VectorObserver>,
    parallel_enabled: bool,
    elapsed: f64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl PhysicsWorld {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            parts: Arena::new(),
            physicals: Arena::new(),
            integrator: config.integrator,
            gravity: config.gravity,
            force_registry: ForceRegistry::new(),
            observer: Box::new(NoopObserver),
            parallel_enabled: config.parallel,
            elapsed: 0.0,
        }
    }

    /// Replaces the force/impulse observer.
    pub fn set_observer<O>(&mut self, observer: O)
    where
        O: VectorObserver + 'static,
    {
        self.observer = Box::new(observer);
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.parallel_enabled = enabled;
    }

    pub fn parallel_enabled(&self) -> bool {
        self.parallel_enabled
    }

    /// Simulated time accumulated by [`PhysicsWorld::step`].
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id)
    }

    pub fn part_mut(&mut self, id: PartId) -> Option<&mut Part> {
        self.parts.get_mut(id)
    }

    pub fn physical(&self, id: PhysicalId) -> Option<&Physical> {
        self.physicals.get(id)
    }

    pub fn parts(&self) -> impl Iterator<Item = (PartId, &Part)> + '_ {
        self.parts.iter()
    }

    pub fn physicals(&self) -> impl Iterator<Item = (PhysicalId, &Physical)> + '_ {
        self.physicals.iter()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn physical_count(&self) -> usize {
        self.physicals.len()
    }

    /// Roots of every constraint tree, free-standing physicals included.
    pub fn main_physicals(&self) -> Vec<PhysicalId> {
        self.physicals
            .iter()
            .filter(|(_, physical)| physical.is_main_physical())
            .map(|(id, _)| id)
            .collect()
    }

    /// Physical that currently owns `part`.
    pub fn physical_of(&self, part: PartId) -> Result<PhysicalId> {
        Ok(self.part_ref(part)?.parent)
    }

    /// Root of the tree that `part` belongs to.
    pub fn main_physical_of(&self, part: PartId) -> Result<PhysicalId> {
        let physical = self.physical_of(part)?;
        Ok(self.physical_ref(physical)?.main)
    }

    /// Advances every tree by `dt`.
    ///
    /// Forces are gathered per tree, each root integrates its tree as one rigid
    /// composite, constraints advance, then every tree is refreshed down to its parts.
    pub fn step(&mut self, dt: f64) -> Result<()> {
        let timer = ScopedTimer::new("world::step");

        self.apply_external_forces(dt);

        let roots = self.main_physicals();
        {
            let _timer = ScopedTimer::new("world::gather_forces");
            for &root in &roots {
                self.gather_tree_forces(root)?;
            }
        }

        {
            let _timer = ScopedTimer::new("world::integrate");
            self.integrate_roots(dt);
        }

        for (_, physical) in self.physicals.iter_mut() {
            if let Some(parent) = physical.parent.as_mut() {
                parent.link.constraint.update(dt);
            }
        }

        {
            let _timer = ScopedTimer::new("world::refresh");
            for &root in &roots {
                self.full_refresh_of_connected_physicals(root)?;
            }
        }

        self.elapsed += dt;
        warn_if_tick_budget_exceeded(timer.elapsed(), TICK_BUDGET_MS);
        Ok(())
    }

    fn apply_external_forces(&mut self, dt: f64) {
        if self.gravity != DVec3::ZERO {
            let gravity = GravityForce::new(self.gravity);
            for (_, physical) in self.physicals.iter_mut() {
                gravity.apply(physical, dt);
            }
        }
        self.force_registry.apply_all(&mut self.physicals, dt);
    }

    /// Moves every member's pending force into the root, as force plus moment
    /// about the tree center of mass.
    fn gather_tree_forces(&mut self, root: PhysicalId) -> Result<()> {
        let (force, moment) = self.pending_tree_load(root)?;
        for id in self.tree_members(root)? {
            self.physical_mut(id)?.clear_accumulators();
        }

        let root_physical = self.physical_mut(root)?;
        root_physical.total_force = force;
        root_physical.total_moment = moment;
        Ok(())
    }

    /// Sum of the pending forces on every member of `root`'s tree, with the
    /// moment taken about the tree center of mass.
    pub(crate) fn pending_tree_load(&self, root: PhysicalId) -> Result<(DVec3, DVec3)> {
        let tree_center = self.tree_center_of_mass(root)?;
        let mut force = DVec3::ZERO;
        let mut moment = DVec3::ZERO;
        for id in self.tree_members(root)? {
            let physical = self.physical_ref(id)?;
            force += physical.total_force;
            moment += physical.total_moment + (physical.center_of_mass() - tree_center).cross(physical.total_force);
        }
        Ok((force, moment))
    }

    fn integrate_roots(&mut self, dt: f64) {
        let integrator = &self.integrator;

        #[cfg(feature = "parallel")]
        if self.parallel_enabled {
            self.physicals
                .par_for_each_mut(|physical| integrate_root(integrator, physical, dt));
            return;
        }

        for (_, physical) in self.physicals.iter_mut() {
            integrate_root(integrator, physical, dt);
        }
    }

    pub(crate) fn part_ref(&self, id: PartId) -> Result<&Part> {
        self.parts.get(id).ok_or(PhysicsError::UnknownPart(id))
    }

    pub(crate) fn part_mut_ref(&mut self, id: PartId) -> Result<&mut Part> {
        self.parts.get_mut(id).ok_or(PhysicsError::UnknownPart(id))
    }

    pub(crate) fn physical_ref(&self, id: PhysicalId) -> Result<&Physical> {
        self.physicals.get(id).ok_or(PhysicsError::UnknownPhysical(id))
    }

    pub(crate) fn physical_mut(&mut self, id: PhysicalId) -> Result<&mut Physical> {
        self.physicals.get_mut(id).ok_or(PhysicsError::UnknownPhysical(id))
    }
}

/// Integrates one tree root; children are skipped since their poses are derived.
fn integrate_root(integrator: &Integrator, physical: &mut Physical, dt: f64) {
    let force = physical.total_force;
    let moment = physical.total_moment;
    if let Some(motorized) = physical.motorized.as_mut() {
        integrator.integrate(
            RigidBodyState {
                frame: &mut physical.cframe,
                motion: &mut motorized.motion,
                local_center_of_mass: motorized.mass_properties.center_of_mass,
                mass: motorized.mass_properties.mass,
                inverse_inertia: motorized.inverse_inertia,
            },
            force,
            moment,
            dt,
        );
    }
    physical.clear_accumulators();
}
