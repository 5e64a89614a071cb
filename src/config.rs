//! Global configuration constants for the composition core.

/// Default gravity vector applied by [`WorldConfig`](crate::world::WorldConfig) (Y-up).
pub const DEFAULT_GRAVITY: [f64; 3] = [0.0, -9.81, 0.0];

/// Default integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f64 = 1.0 / 60.0;

/// Density assigned to parts built with default properties.
pub const DEFAULT_DENSITY: f64 = 1.0;

/// Friction coefficient assigned to parts built with default properties.
pub const DEFAULT_FRICTION: f64 = 0.5;

/// Smallest aggregate mass accepted before a physical is declared degenerate.
pub const MIN_MASS: f64 = 1e-12;

/// Relative determinant threshold below which an inertia tensor is treated as singular.
pub const INERTIA_CONDITION_EPSILON: f64 = 1e-12;

/// Wall-clock budget for one tick before a warning is logged (milliseconds).
pub const TICK_BUDGET_MS: f64 = 4.0;

/// Relative tolerance when checking a physical's mass against its parts.
pub const MASS_TOLERANCE: f64 = 1e-9;
