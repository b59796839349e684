// boundary.rs
// Volume transition for tracks whose step ended on a boundary: relocate
// into the next volume, refresh the material, and invalidate the per-volume
// MSC range memory. Tracks crossing out of the world are killed without a
// local deposit.

use crate::action::launch::launch_over_alive;
use crate::action::registry::{Action, ActionId, ActionOrder};
use crate::error::ActionError;
use crate::params::CoreParams;
use crate::track::state::{TrackStateArray, TrackStatus};

/// Offset past the boundary plane when probing the next volume [cm].
const BOUNDARY_BUMP: f64 = 1.0e-8;

pub struct GeoBoundaryAction {
    id: ActionId,
}

impl GeoBoundaryAction {
    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for GeoBoundaryAction {
    fn id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        "geo-boundary"
    }

    fn description(&self) -> &str {
        "cross the volume boundary and reset per-volume state"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::PostStepInteract
    }

    fn execute(&self, params: &CoreParams, state: &mut TrackStateArray) -> Result<(), ActionError> {
        launch_over_alive(self.label(), state, |_, slot| {
            if !slot.on_boundary {
                return Ok(());
            }
            let probe = slot.position + slot.direction * BOUNDARY_BUMP;
            match params.geometry.volume_at(probe) {
                Some(volume) => {
                    slot.position = probe;
                    slot.volume = Some(volume);
                    slot.material = params.geometry.material_of(volume);
                    // Range memory is only valid within one volume
                    slot.msc_range = None;
                }
                None => {
                    // Left the world; the energy escapes
                    slot.volume = None;
                    slot.status = TrackStatus::Killed;
                }
            }
            Ok(())
        })
    }
}
