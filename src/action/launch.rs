// launch.rs
// The one slot-parallel primitive shared by all per-track actions: apply a
// closure to every slot, collecting per-slot failures instead of failing
// fast, so one bad track does not hide diagnostics for the others.

use rayon::prelude::*;

use crate::error::{ActionError, TrackFailure, TrackError};
use crate::track::state::{TrackSlot, TrackStateArray};

/// Apply `f` to every slot in parallel and aggregate failures.
///
/// Slot order within the launch is unspecified; `f` must not depend on it.
pub fn launch_over_slots<F>(
    label: &str,
    state: &mut TrackStateArray,
    f: F,
) -> Result<(), ActionError>
where
    F: Fn(usize, &mut TrackSlot) -> Result<(), TrackError> + Send + Sync,
{
    let failures: Vec<TrackFailure> = state
        .slots_mut()
        .par_iter_mut()
        .enumerate()
        .filter_map(|(slot, track)| {
            f(slot, track).err().map(|error| TrackFailure {
                slot,
                event_id: track.event_id,
                track_id: track.track_id,
                error,
            })
        })
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ActionError { action: label.to_string(), failures })
    }
}

/// Same as `launch_over_slots`, restricted to live slots.
pub fn launch_over_alive<F>(
    label: &str,
    state: &mut TrackStateArray,
    f: F,
) -> Result<(), ActionError>
where
    F: Fn(usize, &mut TrackSlot) -> Result<(), TrackError> + Send + Sync,
{
    launch_over_slots(label, state, |slot, track| {
        if track.is_alive() {
            f(slot, track)
        } else {
            Ok(())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::state::TrackStatus;

    #[test]
    fn all_failures_are_collected_not_fail_fast() {
        let mut state = TrackStateArray::new(8);
        let err = launch_over_slots("check", &mut state, |slot, _| {
            if slot % 2 == 0 {
                Err(TrackError::Physics(format!("slot {} broke", slot)))
            } else {
                Ok(())
            }
        })
        .err()
        .expect("half the slots fail");
        assert_eq!(err.failures.len(), 4, "every failing slot must be reported");
        assert_eq!(err.action, "check");
        let slots: Vec<usize> = err.failures.iter().map(|f| f.slot).collect();
        assert_eq!(slots, vec![0, 2, 4, 6], "failures keep slot order");
    }

    #[test]
    fn alive_filter_skips_empty_slots() {
        let mut state = TrackStateArray::new(4);
        state.slots_mut()[2].status = TrackStatus::Alive;
        let err = launch_over_alive("check", &mut state, |_, _| {
            Err(TrackError::Physics("always".into()))
        })
        .err()
        .expect("the single live slot fails");
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].slot, 2);
    }
}
