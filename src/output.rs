// output.rs
// Per-step records delivered to external collectors. Every registered
// collector receives every record; no deduplication is performed.

use parking_lot::Mutex;
use serde::Serialize;

use crate::action::registry::ActionId;
use crate::track::state::{EventId, ParticleKind, TrackId};

/// One track's state at the end of one step.
#[derive(Clone, Debug, Serialize)]
pub struct StepRecord {
    pub event_id: EventId,
    pub track_id: TrackId,
    pub particle: ParticleKind,
    pub position: [f64; 3],
    pub direction: [f64; 3],
    /// Global time [s]
    pub time: f64,
    /// Kinetic energy after the step [MeV]
    pub energy: f64,
    /// Energy deposited locally during the step [MeV]
    pub energy_deposit: f64,
    /// Containing volume, if still inside the world
    pub volume: Option<usize>,
    /// Action whose limit ended the step
    pub limiting_action: Option<ActionId>,
    pub num_steps: u64,
    pub alive: bool,
}

/// Consumer of step records.
pub trait StepCollector: Send + Sync {
    fn collect(&self, record: &StepRecord);
}

/// Collector that buffers every record, for tests and diagnostics.
#[derive(Default)]
pub struct RecordingCollector {
    records: Mutex<Vec<StepRecord>>,
}

impl RecordingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn records(&self) -> Vec<StepRecord> {
        self.records.lock().clone()
    }

    /// Total deposited energy across all records [MeV].
    pub fn total_deposit(&self) -> f64 {
        self.records.lock().iter().map(|r| r.energy_deposit).sum()
    }
}

impl StepCollector for RecordingCollector {
    fn collect(&self, record: &StepRecord) {
        self.records.lock().push(record.clone());
    }
}
