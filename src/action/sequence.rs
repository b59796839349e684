// sequence.rs
// Drives one full step iteration: every registered action exactly once, in
// (order, id) order, with per-action wall-clock accumulation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::action::registry::{Action, ActionOrder, ActionRegistry};
use crate::error::{ActionError, SetupError};
use crate::params::CoreParams;
use crate::track::state::TrackStateArray;

/// Executable, validated ordering of all registered actions.
pub struct ActionSequence {
    actions: Vec<Arc<dyn Action>>,
    accum_time: Vec<Duration>,
}

impl ActionSequence {
    /// Build from a registry, validating the pipeline shape.
    ///
    /// Exactly one along-step action must be present: the run cannot
    /// progress without one, and a second would propagate tracks twice.
    pub fn new(registry: &ActionRegistry) -> Result<Self, SetupError> {
        let mut actions: Vec<Arc<dyn Action>> = registry.actions().to_vec();
        // Ties in order break by ascending id for deterministic replay
        actions.sort_by_key(|a| (a.order(), a.id()));

        let mut along_steps = actions.iter().filter(|a| a.order() == ActionOrder::AlongStep);
        match (along_steps.next(), along_steps.next()) {
            (None, _) => return Err(SetupError::NoAlongStep),
            (Some(first), Some(second)) => {
                return Err(SetupError::DuplicateAlongStep {
                    first: first.label().to_string(),
                    second: second.label().to_string(),
                });
            }
            (Some(_), None) => {}
        }

        let accum_time = vec![Duration::ZERO; actions.len()];
        Ok(Self { actions, accum_time })
    }

    /// Actions in execution order.
    pub fn actions(&self) -> &[Arc<dyn Action>] {
        &self.actions
    }

    /// Accumulated wall-clock time per action, indexed like `actions()`.
    pub fn accum_time(&self) -> &[Duration] {
        &self.accum_time
    }

    /// Run one full iteration over the state array.
    ///
    /// Time is accumulated even for a failing action, and the failure is
    /// surfaced only after that action has processed its full slot range
    /// (the aggregation happens inside the action itself).
    pub fn execute(
        &mut self,
        params: &CoreParams,
        state: &mut TrackStateArray,
    ) -> Result<(), ActionError> {
        for (i, action) in self.actions.iter().enumerate() {
            let start = Instant::now();
            let result = action.execute(params, state);
            self.accum_time[i] += start.elapsed();
            result?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::registry::ActionId;
    use crate::testutil;
    use parking_lot::Mutex;

    struct RecordingAction {
        id: ActionId,
        label: &'static str,
        order: ActionOrder,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Action for RecordingAction {
        fn id(&self) -> ActionId {
            self.id
        }
        fn label(&self) -> &str {
            self.label
        }
        fn description(&self) -> &str {
            "records its own execution"
        }
        fn order(&self) -> ActionOrder {
            self.order
        }
        fn execute(&self, _: &CoreParams, _: &mut TrackStateArray) -> Result<(), ActionError> {
            self.log.lock().push(self.label);
            Ok(())
        }
    }

    fn recording(
        id: u32,
        label: &'static str,
        order: ActionOrder,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<dyn Action> {
        Arc::new(RecordingAction { id: ActionId(id), label, order, log: Arc::clone(log) })
    }

    #[test]
    fn missing_along_step_fails_construction() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut reg = ActionRegistry::new();
        reg.insert(recording(0, "pre", ActionOrder::PreStep, &log)).expect("insert");
        reg.insert(recording(1, "post", ActionOrder::PostStepSelect, &log)).expect("insert");
        let err = ActionSequence::new(&reg).err().expect("construction must fail");
        assert!(
            err.to_string().contains("no along-step actions"),
            "the error must name the missing action class: {}",
            err
        );
    }

    #[test]
    fn duplicate_along_step_fails_construction() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut reg = ActionRegistry::new();
        reg.insert(recording(0, "along-a", ActionOrder::AlongStep, &log)).expect("insert");
        reg.insert(recording(1, "along-b", ActionOrder::AlongStep, &log)).expect("insert");
        let err = ActionSequence::new(&reg).err().expect("construction must fail");
        assert!(matches!(err, SetupError::DuplicateAlongStep { .. }));
    }

    #[test]
    fn execution_follows_order_then_id() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut reg = ActionRegistry::new();
        // Registered out of pipeline order on purpose
        reg.insert(recording(0, "interact", ActionOrder::PostStepInteract, &log)).expect("insert");
        reg.insert(recording(1, "along", ActionOrder::AlongStep, &log)).expect("insert");
        reg.insert(recording(2, "init", ActionOrder::TrackInit, &log)).expect("insert");
        reg.insert(recording(3, "pre-b", ActionOrder::PreStep, &log)).expect("insert");
        reg.insert(recording(4, "pre-a", ActionOrder::PreStep, &log)).expect("insert");

        let mut seq = ActionSequence::new(&reg).expect("one along-step present");
        let params = testutil::demo_params();
        let mut state = TrackStateArray::new(4);
        seq.execute(&params, &mut state).expect("all actions succeed");

        let got = log.lock().clone();
        assert_eq!(
            got,
            vec!["init", "pre-b", "pre-a", "along", "interact"],
            "ties in order must break by ascending id"
        );
    }

    #[test]
    fn timing_is_accumulated_per_action() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut reg = ActionRegistry::new();
        reg.insert(recording(0, "along", ActionOrder::AlongStep, &log)).expect("insert");
        let mut seq = ActionSequence::new(&reg).expect("valid");
        let params = testutil::demo_params();
        let mut state = TrackStateArray::new(4);
        seq.execute(&params, &mut state).expect("ok");
        seq.execute(&params, &mut state).expect("ok");
        assert_eq!(seq.accum_time().len(), 1);
        assert_eq!(log.lock().len(), 2, "each execute runs every action once");
    }
}
