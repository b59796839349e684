// pre_step.rs
// First per-track stage of each iteration: reset transient step state,
// kill below-cutoff tracks, and propose the discrete-interaction and
// slowing-down step limits.

use crate::action::launch::launch_over_alive;
use crate::action::registry::{Action, ActionId, ActionOrder};
use crate::error::{ActionError, TrackError};
use crate::params::CoreParams;
use crate::track::state::{StepLimit, TrackStateArray, TrackStatus};

pub struct PreStepAction {
    id: ActionId,
    /// Attribution for the range limit
    along_step_id: ActionId,
    /// Attribution for the sampled interaction length
    discrete_id: ActionId,
}

impl PreStepAction {
    pub fn new(id: ActionId, along_step_id: ActionId, discrete_id: ActionId) -> Self {
        Self { id, along_step_id, discrete_id }
    }
}

impl Action for PreStepAction {
    fn id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        "pre-step"
    }

    fn description(&self) -> &str {
        "reset step state and propose physics step limits"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::PreStep
    }

    fn execute(&self, params: &CoreParams, state: &mut TrackStateArray) -> Result<(), ActionError> {
        let along_step_id = self.along_step_id;
        let discrete_id = self.discrete_id;
        let cutoff = params.config.energy_cutoff;

        launch_over_alive(self.label(), state, |_, slot| {
            if !slot.energy.is_finite() {
                return Err(TrackError::NonFinite { quantity: "energy", value: slot.energy });
            }

            slot.eloss = 0.0;
            slot.secondaries.clear();
            slot.selected_process = None;
            slot.on_boundary = false;
            slot.true_step = 0.0;
            slot.geom_step = 0.0;
            slot.step_limit = StepLimit::unlimited();

            if slot.energy <= cutoff {
                // Deposit the remainder locally and free the slot
                slot.eloss = slot.energy;
                slot.energy = 0.0;
                slot.status = TrackStatus::Killed;
                return Ok(());
            }

            let tables = params.tables.get(slot.kind, slot.material)?;

            // Exponentially sampled distance to the next discrete interaction
            let mut total_xs = 0.0;
            for (_, xs) in &tables.process_xs {
                let value = xs.eval(slot.energy);
                if value < 0.0 {
                    return Err(TrackError::NegativeCrossSection {
                        xs: value,
                        energy: slot.energy,
                    });
                }
                total_xs += value;
            }
            if total_xs > 0.0 {
                let u = slot.rng.uniform();
                let interaction_length = -(1.0 - u).ln() / total_xs;
                slot.step_limit.propose(interaction_length, discrete_id);
            }

            // A charged track can go no further than its remaining range
            if let Some(eloss) = &tables.eloss {
                let range = eloss.range.eval(slot.energy);
                slot.step_limit.propose(range, along_step_id);
            }

            Ok(())
        })
    }
}
