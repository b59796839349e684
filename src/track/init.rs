// init.rs
// Track creation and slot reclamation: the pending-initializer queue shared
// between the stepper and the pipeline, the compaction scan, and the two
// actions bracketing each iteration (fill empty slots first, stage new
// secondaries last).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use ultraviolet::DVec3;

use crate::action::registry::{Action, ActionId, ActionOrder};
use crate::error::{ActionError, StepError, TrackFailure, TrackError};
use crate::params::CoreParams;
use crate::track::state::{
    EventId, Primary, Secondary, TrackId, TrackInitializer, TrackStateArray, TrackStatus,
};

/// Pending track initializers, FIFO.
///
/// Primaries overflowing the queue are a fatal run condition; secondaries
/// overflowing the per-step staging capacity are discarded with a counted
/// diagnostic and the run continues.
pub struct TrackInitQueue {
    pending: VecDeque<TrackInitializer>,
    capacity: usize,
    secondary_capacity: usize,
    num_discarded: u64,
    next_track_id: HashMap<EventId, u32>,
}

impl TrackInitQueue {
    pub fn new(capacity: usize, secondary_capacity: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            capacity,
            secondary_capacity,
            num_discarded: 0,
            next_track_id: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Total secondaries dropped over the run so far.
    pub fn num_discarded(&self) -> u64 {
        self.num_discarded
    }

    /// Per-step limit on staged secondaries.
    pub fn secondary_capacity(&self) -> usize {
        self.secondary_capacity
    }

    fn assign_track_id(&mut self, event: EventId) -> TrackId {
        let counter = self.next_track_id.entry(event).or_insert(0);
        let id = TrackId(*counter);
        *counter += 1;
        id
    }

    /// Enqueue an externally supplied source particle.
    pub fn push_primary(&mut self, primary: Primary) -> Result<TrackId, StepError> {
        if self.pending.len() >= self.capacity {
            return Err(StepError::QueueOverflow {
                pending: self.pending.len() + 1,
                capacity: self.capacity,
            });
        }
        let track_id = self.assign_track_id(primary.event_id);
        self.pending.push_back(TrackInitializer {
            kind: primary.kind,
            energy: primary.energy,
            position: primary.position,
            direction: primary.direction,
            time: primary.time,
            event_id: primary.event_id,
            track_id,
            parent_id: None,
        });
        Ok(track_id)
    }

    /// Enqueue an interaction product; returns false if it was discarded.
    pub fn push_secondary(
        &mut self,
        event_id: EventId,
        parent_id: TrackId,
        position: DVec3,
        time: f64,
        secondary: Secondary,
    ) -> bool {
        if self.pending.len() >= self.capacity {
            self.num_discarded += 1;
            return false;
        }
        let track_id = self.assign_track_id(event_id);
        self.pending.push_back(TrackInitializer {
            kind: secondary.kind,
            energy: secondary.energy,
            position,
            direction: secondary.direction,
            time,
            event_id,
            track_id,
            parent_id: Some(parent_id),
        });
        true
    }

    fn record_discard(&mut self, n: u64) {
        self.num_discarded += n;
    }

    pub fn pop(&mut self) -> Option<TrackInitializer> {
        self.pending.pop_front()
    }
}

/// Partition slot indices into vacancies, reclaiming killed slots.
///
/// Returns the vacant indices in ascending order so the fill order is
/// deterministic.
pub fn locate_alive(state: &mut TrackStateArray) -> Vec<usize> {
    let mut vacant = Vec::new();
    for (i, slot) in state.slots_mut().iter_mut().enumerate() {
        if slot.status == TrackStatus::Killed {
            slot.status = TrackStatus::Inactive;
        }
        if slot.status == TrackStatus::Inactive {
            vacant.push(i);
        }
    }
    vacant
}

/// First action of every iteration: pop pending initializers into empty
/// slots, assigning each its deterministic RNG substream and resolving its
/// starting volume.
pub struct TrackInitAction {
    id: ActionId,
    queue: Arc<Mutex<TrackInitQueue>>,
}

impl TrackInitAction {
    pub fn new(id: ActionId, queue: Arc<Mutex<TrackInitQueue>>) -> Self {
        Self { id, queue }
    }
}

impl Action for TrackInitAction {
    fn id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        "extend-from-primaries"
    }

    fn description(&self) -> &str {
        "initialize empty track slots from the pending queue"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::TrackInit
    }

    fn execute(&self, params: &CoreParams, state: &mut TrackStateArray) -> Result<(), ActionError> {
        let mut queue = self.queue.lock();
        let vacancies = locate_alive(state);
        let mut failures = Vec::new();

        for slot_idx in vacancies {
            let Some(init) = queue.pop() else {
                break;
            };
            let slot = &mut state.slots_mut()[slot_idx];
            slot.initialize(init, params.config.seed);
            match params.geometry.volume_at(slot.position) {
                Some(volume) => {
                    slot.volume = Some(volume);
                    slot.material = params.geometry.material_of(volume);
                }
                None => {
                    slot.status = TrackStatus::Killed;
                    failures.push(TrackFailure {
                        slot: slot_idx,
                        event_id: slot.event_id,
                        track_id: slot.track_id,
                        error: TrackError::OutsideWorld,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ActionError { action: self.label().to_string(), failures })
        }
    }
}

/// Last action of every iteration: drain the secondaries staged by the
/// interaction models into the pending queue.
///
/// Secondaries staged in iteration K become eligible for a slot at K+1,
/// because initialization runs first in the pipeline.
pub struct ProcessSecondariesAction {
    id: ActionId,
    queue: Arc<Mutex<TrackInitQueue>>,
}

impl ProcessSecondariesAction {
    pub fn new(id: ActionId, queue: Arc<Mutex<TrackInitQueue>>) -> Self {
        Self { id, queue }
    }
}

impl Action for ProcessSecondariesAction {
    fn id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        "process-secondaries"
    }

    fn description(&self) -> &str {
        "stage interaction products as pending initializers"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::PostStepInteract
    }

    fn execute(&self, _params: &CoreParams, state: &mut TrackStateArray) -> Result<(), ActionError> {
        let mut queue = self.queue.lock();
        let per_step_cap = queue.secondary_capacity();
        let mut staged = 0usize;
        let mut discarded = 0u64;

        for slot in state.slots_mut() {
            if slot.secondaries.is_empty() {
                continue;
            }
            let event_id = slot.event_id;
            let parent_id = slot.track_id;
            let position = slot.position;
            let time = slot.time;
            for secondary in slot.secondaries.drain(..) {
                if staged >= per_step_cap {
                    discarded += 1;
                    continue;
                }
                if queue.push_secondary(event_id, parent_id, position, time, secondary) {
                    staged += 1;
                } else {
                    discarded += 1;
                }
            }
        }

        if discarded > 0 {
            queue.record_discard(discarded);
            log::warn!(
                "discarded {} secondaries over the staging capacity ({} staged)",
                discarded,
                staged
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use crate::geometry::SlabStack;
    use crate::physics::material::{Material, MaterialId};
    use crate::physics::tables::PhysicsTables;
    use crate::track::state::ParticleKind;

    fn primary(event: u32) -> Primary {
        Primary {
            kind: ParticleKind::Electron,
            energy: 10.0,
            position: DVec3::new(0.5, 0.0, 0.0),
            direction: DVec3::new(1.0, 0.0, 0.0),
            time: 0.0,
            event_id: EventId(event),
        }
    }

    fn demo_params() -> CoreParams {
        CoreParams::new(
            TransportConfig::default(),
            vec![Material::new("si", 14.0)],
            PhysicsTables::new(),
            Arc::new(SlabStack::single(0.0, 1.0, MaterialId(0))),
        )
    }

    #[test]
    fn primary_overflow_is_fatal() {
        let mut queue = TrackInitQueue::new(2, 8);
        queue.push_primary(primary(0)).expect("fits");
        queue.push_primary(primary(0)).expect("fits");
        let err = queue.push_primary(primary(0));
        assert!(matches!(err, Err(StepError::QueueOverflow { capacity: 2, .. })));
    }

    #[test]
    fn track_ids_count_up_per_event() {
        let mut queue = TrackInitQueue::new(16, 8);
        assert_eq!(queue.push_primary(primary(0)).expect("ok"), TrackId(0));
        assert_eq!(queue.push_primary(primary(0)).expect("ok"), TrackId(1));
        assert_eq!(queue.push_primary(primary(1)).expect("ok"), TrackId(0), "ids are per event");
        let sec = Secondary {
            kind: ParticleKind::Gamma,
            energy: 1.0,
            direction: DVec3::new(0.0, 0.0, 1.0),
        };
        assert!(queue.push_secondary(EventId(0), TrackId(1), DVec3::zero(), 0.0, sec));
        assert_eq!(queue.pop().map(|i| i.track_id), Some(TrackId(0)));
        queue.pop();
        queue.pop();
        let staged = queue.pop().expect("secondary present");
        assert_eq!(staged.track_id, TrackId(2), "secondary continues the event counter");
        assert_eq!(staged.parent_id, Some(TrackId(1)));
    }

    #[test]
    fn full_queue_discards_secondaries_but_counts_them() {
        let mut queue = TrackInitQueue::new(1, 8);
        queue.push_primary(primary(0)).expect("fits");
        let sec = Secondary {
            kind: ParticleKind::Gamma,
            energy: 1.0,
            direction: DVec3::new(0.0, 0.0, 1.0),
        };
        assert!(!queue.push_secondary(EventId(0), TrackId(0), DVec3::zero(), 0.0, sec));
        assert_eq!(queue.num_discarded(), 1);
        assert_eq!(queue.len(), 1, "the queue must not grow past capacity");
    }

    #[test]
    fn locate_alive_reclaims_killed_slots() {
        let mut state = TrackStateArray::new(4);
        state.slots_mut()[1].status = TrackStatus::Alive;
        state.slots_mut()[2].status = TrackStatus::Killed;
        let vacant = locate_alive(&mut state);
        assert_eq!(vacant, vec![0, 2, 3]);
        assert_eq!(state.slots()[2].status, TrackStatus::Inactive, "killed slots are reclaimed");
    }

    #[test]
    fn init_action_fills_empty_slots_in_ascending_order() {
        let params = demo_params();
        let queue = Arc::new(Mutex::new(TrackInitQueue::new(16, 8)));
        {
            let mut q = queue.lock();
            q.push_primary(primary(0)).expect("ok");
            q.push_primary(primary(0)).expect("ok");
        }
        let action = TrackInitAction::new(ActionId(0), Arc::clone(&queue));
        let mut state = TrackStateArray::new(4);
        state.slots_mut()[0].status = TrackStatus::Alive;
        action.execute(&params, &mut state).expect("primaries are inside the world");

        assert!(state.slots()[1].is_alive(), "first vacancy fills first");
        assert!(state.slots()[2].is_alive());
        assert!(!state.slots()[3].is_alive(), "no initializer left for the last slot");
        assert_eq!(state.slots()[1].volume.map(|v| v.0), Some(0));
        assert!(queue.lock().is_empty());
    }

    #[test]
    fn init_action_reports_out_of_world_primaries() {
        let params = demo_params();
        let queue = Arc::new(Mutex::new(TrackInitQueue::new(16, 8)));
        {
            let mut q = queue.lock();
            let mut p = primary(0);
            p.position = DVec3::new(5.0, 0.0, 0.0);
            q.push_primary(p).expect("ok");
        }
        let action = TrackInitAction::new(ActionId(0), queue);
        let mut state = TrackStateArray::new(2);
        let err = action.execute(&params, &mut state).err().expect("outside the world");
        assert_eq!(err.failures.len(), 1);
        assert!(matches!(err.failures[0].error, TrackError::OutsideWorld));
        assert!(!state.slots()[0].is_alive(), "the bad track must not stay alive");
    }

    #[test]
    fn secondaries_are_staged_after_the_step() {
        let params = demo_params();
        let queue = Arc::new(Mutex::new(TrackInitQueue::new(16, 2)));
        let action = ProcessSecondariesAction::new(ActionId(1), Arc::clone(&queue));
        let mut state = TrackStateArray::new(2);
        let slot = &mut state.slots_mut()[0];
        slot.status = TrackStatus::Alive;
        slot.event_id = EventId(3);
        slot.track_id = TrackId(0);
        for _ in 0..3 {
            slot.secondaries.push(Secondary {
                kind: ParticleKind::Gamma,
                energy: 0.5,
                direction: DVec3::new(0.0, 0.0, 1.0),
            });
        }

        action.execute(&params, &mut state).expect("staging never fails the step");
        let q = queue.lock();
        assert_eq!(q.len(), 2, "only the per-step capacity is staged");
        assert_eq!(q.num_discarded(), 1, "the overflow must be counted");
        assert!(state.slots()[0].secondaries.is_empty(), "staged secondaries are drained");
    }
}
