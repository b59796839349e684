// stepper.rs
// The run driver: owns the state array, the validated action sequence, and
// the initializer queue; advances all tracks one iteration at a time and
// fans step records out to the registered collectors.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::action::registry::{ActionId, ActionRegistry};
use crate::action::sequence::ActionSequence;
use crate::error::{SetupError, StepError};
use crate::output::{StepCollector, StepRecord};
use crate::params::CoreParams;
use crate::track::init::{ProcessSecondariesAction, TrackInitAction, TrackInitQueue};
use crate::track::state::{Primary, TrackStateArray, TrackStatus};

use super::along_step::AlongStepAction;
use super::boundary::GeoBoundaryAction;
use super::discrete::DiscreteSelectAction;
use super::models::{
    AnnihilationAction, BremsstrahlungAction, ComptonAction, IonizationAction,
    PairProductionAction, PhotoabsorptionAction,
};
use super::pre_step::PreStepAction;

/// Track population counters after one step iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepCounts {
    /// Tracks that took a step this iteration (alive plus newly killed)
    pub active: usize,
    /// Tracks still alive at the end of the iteration
    pub alive: usize,
    /// Pending initializers waiting for a slot
    pub queued: usize,
}

/// Aggregate counters for a completed run.
#[derive(Clone, Debug, Default)]
pub struct RunResult {
    pub num_iterations: u64,
    /// Total track-steps summed over all iterations
    pub total_steps: u64,
    pub num_discarded_secondaries: u64,
    /// Whether the iteration budget stopped the run early
    pub hit_iteration_cap: bool,
}

/// Register the standard physics pipeline.
///
/// Ids are assigned in registration order; execution order is (order, id),
/// so the interaction models run before the boundary crossing, and the
/// stepper-appended secondary staging runs last of all.
pub fn build_default_actions(registry: &mut ActionRegistry) -> Result<(), SetupError> {
    let pre_id = registry.next_id();
    let along_id = ActionId(pre_id.0 + 1);
    let select_id = ActionId(pre_id.0 + 2);
    let boundary_id = ActionId(pre_id.0 + 9);

    registry.insert(Arc::new(PreStepAction::new(pre_id, along_id, select_id)))?;
    registry.insert(Arc::new(AlongStepAction::new(along_id, boundary_id)))?;
    registry.insert(Arc::new(DiscreteSelectAction::new(select_id)))?;
    registry.insert(Arc::new(IonizationAction::new(ActionId(pre_id.0 + 3))))?;
    registry.insert(Arc::new(BremsstrahlungAction::new(ActionId(pre_id.0 + 4))))?;
    registry.insert(Arc::new(ComptonAction::new(ActionId(pre_id.0 + 5))))?;
    registry.insert(Arc::new(PhotoabsorptionAction::new(ActionId(pre_id.0 + 6))))?;
    registry.insert(Arc::new(PairProductionAction::new(ActionId(pre_id.0 + 7))))?;
    registry.insert(Arc::new(AnnihilationAction::new(ActionId(pre_id.0 + 8))))?;
    registry.insert(Arc::new(GeoBoundaryAction::new(boundary_id)))?;
    Ok(())
}

/// Advances the whole track population, one action pipeline per call.
pub struct Stepper {
    params: CoreParams,
    state: TrackStateArray,
    registry: ActionRegistry,
    sequence: ActionSequence,
    queue: Arc<Mutex<TrackInitQueue>>,
    collectors: Vec<Arc<dyn StepCollector>>,
}

impl Stepper {
    /// Build with the standard physics pipeline.
    pub fn new(
        params: CoreParams,
        collectors: Vec<Arc<dyn StepCollector>>,
    ) -> Result<Self, SetupError> {
        Self::with_actions(params, collectors, |registry, _| build_default_actions(registry))
    }

    /// Build with caller-supplied actions between track-init and the
    /// secondary staging, both of which the stepper registers itself.
    pub fn with_actions<F>(
        params: CoreParams,
        collectors: Vec<Arc<dyn StepCollector>>,
        build: F,
    ) -> Result<Self, SetupError>
    where
        F: FnOnce(&mut ActionRegistry, &Arc<Mutex<TrackInitQueue>>) -> Result<(), SetupError>,
    {
        params.config.validate()?;
        let queue = Arc::new(Mutex::new(TrackInitQueue::new(
            params.config.initializer_capacity,
            params.config.secondary_capacity(),
        )));

        let mut registry = ActionRegistry::new();
        registry.insert(Arc::new(TrackInitAction::new(registry.next_id(), Arc::clone(&queue))))?;
        build(&mut registry, &queue)?;
        registry.insert(Arc::new(ProcessSecondariesAction::new(
            registry.next_id(),
            Arc::clone(&queue),
        )))?;

        let sequence = ActionSequence::new(&registry)?;
        let state = TrackStateArray::new(params.config.num_track_slots);
        Ok(Self { params, state, registry, sequence, queue, collectors })
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn state(&self) -> &TrackStateArray {
        &self.state
    }

    /// Accumulated wall-clock time per action, labeled.
    pub fn action_times(&self) -> Vec<(String, Duration)> {
        self.sequence
            .actions()
            .iter()
            .zip(self.sequence.accum_time())
            .map(|(action, time)| (action.label().to_string(), *time))
            .collect()
    }

    pub fn num_discarded_secondaries(&self) -> u64 {
        self.queue.lock().num_discarded()
    }

    /// Enqueue source particles for the next iteration.
    ///
    /// The whole batch is validated before anything is enqueued, so a
    /// rejected call leaves the queue untouched.
    pub fn push_primaries(&mut self, primaries: &[Primary]) -> Result<(), StepError> {
        let max_events = self.params.config.max_events;
        for primary in primaries {
            if primary.event_id.0 as usize >= max_events {
                return Err(StepError::EventOutOfRange {
                    event: primary.event_id.0,
                    max_events,
                });
            }
        }
        let mut queue = self.queue.lock();
        for primary in primaries {
            queue.push_primary(*primary)?;
        }
        Ok(())
    }

    /// Run one full step iteration over all slots.
    pub fn step(&mut self) -> Result<StepCounts, StepError> {
        self.sequence.execute(&self.params, &mut self.state)?;
        self.emit_records();

        let mut counts = StepCounts::default();
        for slot in self.state.slots() {
            match slot.status {
                TrackStatus::Alive => {
                    counts.active += 1;
                    counts.alive += 1;
                }
                TrackStatus::Killed => counts.active += 1,
                TrackStatus::Inactive => {}
            }
        }
        counts.queued = self.queue.lock().len();
        Ok(counts)
    }

    /// Enqueue primaries, then step.
    pub fn step_with_primaries(&mut self, primaries: &[Primary]) -> Result<StepCounts, StepError> {
        self.push_primaries(primaries)?;
        self.step()
    }

    /// Step until no tracks remain or the iteration budget runs out.
    pub fn run(&mut self) -> Result<RunResult, StepError> {
        let mut result = RunResult::default();
        loop {
            let counts = self.step()?;
            result.num_iterations += 1;
            result.total_steps += counts.active as u64;
            if counts.alive == 0 && counts.queued == 0 {
                break;
            }
            if result.num_iterations >= self.params.config.max_step_iterations {
                result.hit_iteration_cap = true;
                log::warn!(
                    "stopping after {} step iterations with {} tracks alive and {} queued",
                    result.num_iterations,
                    counts.alive,
                    counts.queued
                );
                break;
            }
        }
        result.num_discarded_secondaries = self.queue.lock().num_discarded();
        Ok(result)
    }

    /// One record per track per step, to every collector.
    fn emit_records(&self) {
        if self.collectors.is_empty() {
            return;
        }
        for slot in self.state.slots() {
            if slot.status == TrackStatus::Inactive {
                continue;
            }
            let record = StepRecord {
                event_id: slot.event_id,
                track_id: slot.track_id,
                particle: slot.kind,
                position: [slot.position.x, slot.position.y, slot.position.z],
                direction: [slot.direction.x, slot.direction.y, slot.direction.z],
                time: slot.time,
                energy: slot.energy,
                energy_deposit: slot.eloss,
                volume: slot.volume.map(|v| v.0),
                limiting_action: slot.step_limit.action,
                num_steps: slot.num_steps,
                alive: slot.is_alive(),
            };
            for collector in &self.collectors {
                collector.collect(&record);
            }
        }
    }
}
