//! Observation hooks for force and impulse application.
//!
//! The world calls its observer on every application; the default observer does
//! nothing. Observers never feed back into simulation state.

use glam::DVec3;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// What kind of vector was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorKind {
    Force,
    Moment,
    Impulse,
    AngularImpulse,
}

/// A single recorded application: world-space origin and vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub origin: DVec3,
    pub vector: DVec3,
    pub kind: VectorKind,
}

/// Receives every force, moment and impulse applied through a world.
pub trait VectorObserver: Send + Sync {
    fn log_vector(&self, origin: DVec3, vector: DVec3, kind: VectorKind);
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl VectorObserver for NoopObserver {
    fn log_vector(&self, _origin: DVec3, _vector: DVec3, _kind: VectorKind) {}
}

/// Observer that keeps every record until drained, for visualization layers.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    records: Mutex<Vec<VectorRecord>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Takes all records collected so far.
    pub fn drain(&self) -> Vec<VectorRecord> {
        std::mem::take(&mut *self.records.lock())
    }
}

impl VectorObserver for RecordingObserver {
    fn log_vector(&self, origin: DVec3, vector: DVec3, kind: VectorKind) {
        self.records.lock().push(VectorRecord {
            origin,
            vector,
            kind,
        });
    }
}

impl<T: VectorObserver + ?Sized> VectorObserver for std::sync::Arc<T> {
    fn log_vector(&self, origin: DVec3, vector: DVec3, kind: VectorKind) {
        (**self).log_vector(origin, vector, kind);
    }
}
