// error.rs
// Error taxonomy: fatal setup errors, fatal capacity errors, and per-track
// physics failures aggregated across one action invocation.

use thiserror::Error;

use crate::track::{EventId, TrackId};

/// Fatal error raised while constructing a run.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("no along-step actions have been registered")]
    NoAlongStep,
    #[error("more than one along-step action is registered ('{first}' and '{second}')")]
    DuplicateAlongStep { first: String, second: String },
    #[error("duplicate action label '{0}'")]
    DuplicateLabel(String),
    #[error("action id {given} does not match the next registry id {expected}")]
    NonContiguousActionId { given: u32, expected: u32 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A physics-level failure for one track slot inside an action.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("negative cross section {xs} at {energy} MeV")]
    NegativeCrossSection { xs: f64, energy: f64 },
    #[error("non-finite {quantity} ({value})")]
    NonFinite { quantity: &'static str, value: f64 },
    #[error("no physics tables for the track's particle/material")]
    MissingTables,
    #[error("track is outside the world volume")]
    OutsideWorld,
    #[error("{0}")]
    Physics(String),
}

/// One failed slot, with enough identity to diagnose the track.
#[derive(Debug)]
pub struct TrackFailure {
    pub slot: usize,
    pub event_id: EventId,
    pub track_id: TrackId,
    pub error: TrackError,
}

/// Failures collected over the full slot range of one action invocation.
///
/// Slot errors are never raised fail-fast: every slot is processed and all
/// failures are reported together so one bad track does not hide others.
#[derive(Debug, Error)]
#[error("action '{action}' failed for {} track(s): {}", .failures.len(), summarize(.failures))]
pub struct ActionError {
    pub action: String,
    pub failures: Vec<TrackFailure>,
}

fn summarize(failures: &[TrackFailure]) -> String {
    const MAX_SHOWN: usize = 4;
    let mut parts: Vec<String> = failures
        .iter()
        .take(MAX_SHOWN)
        .map(|f| {
            format!(
                "slot {} (event {}, track {}): {}",
                f.slot, f.event_id.0, f.track_id.0, f.error
            )
        })
        .collect();
    if failures.len() > MAX_SHOWN {
        parts.push(format!("... and {} more", failures.len() - MAX_SHOWN));
    }
    parts.join("; ")
}

/// Error surfaced from one step iteration.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("initializer queue overflow: {pending} pending initializers exceed capacity {capacity}")]
    QueueOverflow { pending: usize, capacity: usize },
    #[error("primary event id {event} exceeds the configured maximum of {max_events} events")]
    EventOutOfRange { event: u32, max_events: usize },
}
