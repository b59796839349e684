// discrete.rs
// Post-step process selection: when the step ran its full sampled
// interaction length, pick which discrete process fires with probability
// proportional to the macroscopic cross sections at the end-of-step energy.

use crate::action::launch::launch_over_alive;
use crate::action::registry::{Action, ActionId, ActionOrder};
use crate::error::ActionError;
use crate::params::CoreParams;
use crate::physics::process::select_process;
use crate::track::state::TrackStateArray;

pub struct DiscreteSelectAction {
    id: ActionId,
}

impl DiscreteSelectAction {
    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for DiscreteSelectAction {
    fn id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        "discrete-select"
    }

    fn description(&self) -> &str {
        "sample which discrete process fires at the step end"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::PostStepSelect
    }

    fn execute(&self, params: &CoreParams, state: &mut TrackStateArray) -> Result<(), ActionError> {
        let select_id = self.id;
        launch_over_alive(self.label(), state, |_, slot| {
            // Only a step that reached its sampled interaction point
            // interacts; boundary- and MSC-limited steps do not.
            if slot.step_limit.action != Some(select_id) {
                return Ok(());
            }
            let tables = params.tables.get(slot.kind, slot.material)?;
            let candidates: Vec<_> = tables
                .process_xs
                .iter()
                .map(|(process, xs)| (*process, xs.eval(slot.energy)))
                .collect();
            slot.selected_process = select_process(&candidates, &mut slot.rng);
            Ok(())
        })
    }
}
