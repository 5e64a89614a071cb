//! Utility helpers: math extensions, the generational arena, logging and debug hooks.

pub mod allocator;
pub mod debug;
pub mod logging;
pub mod math;

pub use allocator::{Arena, ArenaKey, GenerationalId, PartId, PhysicalId};
pub use debug::{NoopObserver, RecordingObserver, VectorKind, VectorObserver, VectorRecord};
pub use math::*;
