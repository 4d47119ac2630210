//! Module: runtime::recorder
//! Responsibility: order-independent accumulation of probe size measurements.
//! Does not own: recorder naming or lifecycle (see `ExecutionContext`).
//! Boundary: shared between concurrently executing probe chunks and one
//! planner continuation.

use derive_more::{Add, Sum};
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

///
/// SizeRecord
///
/// Estimated bytes of one map input and of the partial tuple it produced.
///

#[derive(Add, Clone, Copy, Debug, Default, Eq, PartialEq, Sum)]
pub struct SizeRecord {
    pub raw_bytes: u64,
    pub aggregated_bytes: u64,
}

impl SizeRecord {
    #[must_use]
    pub const fn new(raw_bytes: u64, aggregated_bytes: u64) -> Self {
        Self {
            raw_bytes,
            aggregated_bytes,
        }
    }
}

///
/// SizeRecorder
///

#[derive(Debug, Default)]
pub struct SizeRecorder {
    records: Mutex<Vec<SizeRecord>>,
}

impl SizeRecorder {
    pub fn record(&self, record: SizeRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<SizeRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

///
/// SizeRecorderHandle
///
/// Named, cloneable reference to one recorder. Every clone records into the
/// same accumulator.
///

#[derive(Clone)]
pub struct SizeRecorderHandle {
    name: String,
    recorder: Arc<SizeRecorder>,
}

impl SizeRecorderHandle {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            recorder: Arc::new(SizeRecorder::default()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record(&self, record: SizeRecord) {
        self.recorder.record(record);
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<SizeRecord> {
        self.recorder.snapshot()
    }
}

impl fmt::Debug for SizeRecorderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SizeRecorderHandle").field(&self.name).finish()
    }
}
