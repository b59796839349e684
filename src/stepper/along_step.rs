// along_step.rs
// The single along-step action: MSC step limiting, straight-line
// propagation over the geometric path, continuous slowing down, and the
// boundary competition. Field propagation is not modeled; all transport is
// field-free.

use crate::action::launch::launch_over_alive;
use crate::action::registry::{Action, ActionId, ActionOrder};
use crate::error::{ActionError, TrackError};
use crate::params::CoreParams;
use crate::physics::msc::{UrbanMscHelper, UrbanMscStepLimit};
use crate::track::state::{StepLimit, TrackStateArray, TrackStatus};
use crate::units;

pub struct AlongStepAction {
    id: ActionId,
    /// Attribution when the step ends on a volume boundary
    boundary_id: ActionId,
}

impl AlongStepAction {
    pub fn new(id: ActionId, boundary_id: ActionId) -> Self {
        Self { id, boundary_id }
    }
}

impl Action for AlongStepAction {
    fn id(&self) -> ActionId {
        self.id
    }

    fn label(&self) -> &str {
        "along-step-msc"
    }

    fn description(&self) -> &str {
        "limit with Urban MSC, propagate, and apply continuous energy loss"
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::AlongStep
    }

    fn execute(&self, params: &CoreParams, state: &mut TrackStateArray) -> Result<(), ActionError> {
        let action_id = self.id;
        let boundary_id = self.boundary_id;
        let cutoff = params.config.energy_cutoff;

        launch_over_alive(self.label(), state, |_, slot| {
            let volume = slot.volume.ok_or(TrackError::OutsideWorld)?;
            let tables = params.tables.get(slot.kind, slot.material)?;
            let phys_step = slot.step_limit.step;

            let boundary_dist =
                params.geometry.distance_to_boundary(slot.position, slot.direction, volume);
            let safety = params.geometry.safety(slot.position, volume);

            let mut true_path = phys_step;
            let mut geom_path = phys_step;
            let mut limited_by_msc = false;

            if let Some(view) = tables.msc_view() {
                let material = params.material(slot.material)?;
                let limiter = UrbanMscStepLimit::new(
                    &params.config.msc,
                    &material.msc,
                    &view,
                    slot.kind,
                    slot.energy,
                    slot.msc_range,
                    safety,
                    phys_step,
                );
                let (msc_step, fresh_range) = limiter.sample(&mut slot.rng);
                if let Some(range) = fresh_range {
                    slot.msc_range = Some(range);
                }
                true_path = msc_step.true_path;
                geom_path = msc_step.geom_path;
                limited_by_msc = true_path < phys_step;
            }

            // Boundary competition happens on the geometric path
            let on_boundary = boundary_dist <= geom_path;
            if on_boundary {
                geom_path = boundary_dist;
                true_path = true_path.min(boundary_dist.max(0.0));
                slot.step_limit = StepLimit { step: true_path, action: Some(boundary_id) };
            } else if limited_by_msc {
                slot.step_limit = StepLimit { step: true_path, action: Some(action_id) };
            }

            if !geom_path.is_finite() {
                return Err(TrackError::NonFinite { quantity: "geometric path", value: geom_path });
            }

            slot.position += slot.direction * geom_path;
            let speed = units::particle_speed(slot.energy, slot.kind.mass());
            slot.time += true_path / speed;
            slot.true_step = true_path;
            slot.geom_step = geom_path;
            slot.on_boundary = on_boundary;
            slot.num_steps += 1;

            // Continuous slowing down over the true path
            if let Some(view) = tables.msc_view() {
                let helper = UrbanMscHelper::new(&params.config.msc, &view, slot.energy);
                let end_energy = helper.end_energy(true_path).max(0.0);
                if !end_energy.is_finite() {
                    return Err(TrackError::NonFinite {
                        quantity: "end-of-step energy",
                        value: end_energy,
                    });
                }
                slot.eloss += slot.energy - end_energy;
                slot.energy = end_energy;
                if slot.energy <= cutoff {
                    slot.eloss += slot.energy;
                    slot.energy = 0.0;
                    slot.status = TrackStatus::Killed;
                }
            }

            Ok(())
        })
    }
}
