use glam::DVec3;

use crate::core::physical::Physical;
use crate::utils::allocator::{Arena, PhysicalId};

/// External force source applied to every physical each tick.
///
/// Generators only touch the force/moment accumulators; the integrator consumes them.
pub trait ForceGenerator: Send + Sync {
    fn apply(&self, physical: &mut Physical, dt: f64);
}

/// Uniform gravitational field acting at each center of mass.
pub struct GravityForce {
    pub gravity: DVec3,
}

impl GravityForce {
    pub fn new(gravity: DVec3) -> Self {
        Self { gravity }
    }
}

impl ForceGenerator for GravityForce {
    fn apply(&self, physical: &mut Physical, _dt: f64) {
        let force = self.gravity * physical.mass();
        physical.apply_force_at_center_of_mass(force);
    }
}

/// Quadratic drag resisting the motion of each center of mass.
pub struct DragForce {
    pub drag_coefficient: f64,
}

impl ForceGenerator for DragForce {
    fn apply(&self, physical: &mut Physical, _dt: f64) {
        let velocity = physical.velocity();
        let speed = velocity.length();
        if speed < 1e-9 {
            return;
        }

        let drag = -velocity / speed * speed * speed * self.drag_coefficient;
        physical.apply_force_at_center_of_mass(drag);
    }
}

/// Collection of forces applied at the start of every tick.
#[derive(Default)]
pub struct ForceRegistry {
    forces: Vec<Box<dyn ForceGenerator>>,
}

impl ForceRegistry {
    pub fn new() -> Self {
        Self { forces: Vec::new() }
    }

    pub fn add_force<F: ForceGenerator + 'static>(&mut self, force: F) {
        self.forces.push(Box::new(force));
    }

    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    pub fn clear(&mut self) {
        self.forces.clear();
    }

    pub fn apply_all(&self, physicals: &mut Arena<PhysicalId, Physical>, dt: f64) {
        for force in &self.forces {
            for (_, physical) in physicals.iter_mut() {
                force.apply(physical, dt);
            }
        }
    }
}
