// models.rs
// Simplified interaction models for the minimal e-/e+/gamma physics set.
// Each model applies to tracks whose selected discrete process matches,
// updates the parent in place, and stages secondaries for the compaction
// stage. Sampling is deliberately coarse; radiative-physics correctness is
// out of scope.

use ultraviolet::DVec3;

use crate::action::launch::launch_over_alive;
use crate::action::registry::{Action, ActionId, ActionOrder};
use crate::error::ActionError;
use crate::params::CoreParams;
use crate::physics::process::Process;
use crate::track::state::{ParticleKind, Secondary, TrackSlot, TrackStateArray, TrackStatus};
use crate::units;

/// Stage a secondary, or deposit its energy if it is below the cutoff.
fn stage_or_deposit(
    slot: &mut TrackSlot,
    cutoff: f64,
    kind: ParticleKind,
    energy: f64,
    direction: DVec3,
) {
    if energy > cutoff {
        slot.secondaries.push(Secondary { kind, energy, direction });
    } else {
        slot.eloss += energy;
    }
}

/// Kill the parent, depositing any remaining kinetic energy.
fn kill(slot: &mut TrackSlot) {
    slot.eloss += slot.energy;
    slot.energy = 0.0;
    slot.status = TrackStatus::Killed;
}

/// Delta-ray production for e-/e+.
pub struct IonizationAction {
    id: ActionId,
}

impl IonizationAction {
    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for IonizationAction {
    fn id(&self) -> ActionId {
        self.id
    }
    fn label(&self) -> &str {
        "ioni-moller"
    }
    fn description(&self) -> &str {
        "knock-on electron production"
    }
    fn order(&self) -> ActionOrder {
        ActionOrder::PostStepInteract
    }

    fn execute(&self, params: &CoreParams, state: &mut TrackStateArray) -> Result<(), ActionError> {
        let cutoff = params.config.energy_cutoff;
        launch_over_alive(self.label(), state, |_, slot| {
            if slot.selected_process != Some(Process::Ionization) {
                return Ok(());
            }
            debug_assert!(slot.kind.is_charged());
            // Transfer up to half the kinetic energy to the delta ray
            let u = slot.rng.uniform();
            let esec = 0.5 * u * slot.energy;
            let dir = slot.rng.isotropic();
            stage_or_deposit(slot, cutoff, ParticleKind::Electron, esec, dir);
            slot.energy -= esec;
            if slot.energy <= cutoff {
                kill(slot);
            }
            Ok(())
        })
    }
}

/// Photon emission for e-/e+.
pub struct BremsstrahlungAction {
    id: ActionId,
}

impl BremsstrahlungAction {
    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for BremsstrahlungAction {
    fn id(&self) -> ActionId {
        self.id
    }
    fn label(&self) -> &str {
        "brems-sb"
    }
    fn description(&self) -> &str {
        "bremsstrahlung photon emission"
    }
    fn order(&self) -> ActionOrder {
        ActionOrder::PostStepInteract
    }

    fn execute(&self, params: &CoreParams, state: &mut TrackStateArray) -> Result<(), ActionError> {
        let cutoff = params.config.energy_cutoff;
        launch_over_alive(self.label(), state, |_, slot| {
            if slot.selected_process != Some(Process::Bremsstrahlung) {
                return Ok(());
            }
            debug_assert!(slot.kind.is_charged());
            // Soft-photon-biased fraction of the kinetic energy
            let u = slot.rng.uniform();
            let esec = u * u * slot.energy;
            let dir = slot.direction;
            stage_or_deposit(slot, cutoff, ParticleKind::Gamma, esec, dir);
            slot.energy -= esec;
            if slot.energy <= cutoff {
                kill(slot);
            }
            Ok(())
        })
    }
}

/// Compton scattering for gammas.
pub struct ComptonAction {
    id: ActionId,
}

impl ComptonAction {
    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for ComptonAction {
    fn id(&self) -> ActionId {
        self.id
    }
    fn label(&self) -> &str {
        "scat-klein-nishina"
    }
    fn description(&self) -> &str {
        "Compton scattering off atomic electrons"
    }
    fn order(&self) -> ActionOrder {
        ActionOrder::PostStepInteract
    }

    fn execute(&self, params: &CoreParams, state: &mut TrackStateArray) -> Result<(), ActionError> {
        let cutoff = params.config.energy_cutoff;
        launch_over_alive(self.label(), state, |_, slot| {
            if slot.selected_process != Some(Process::Compton) {
                return Ok(());
            }
            debug_assert_eq!(slot.kind, ParticleKind::Gamma);
            let u = slot.rng.uniform();
            let transfer = 0.5 * u * slot.energy;
            let dir = slot.rng.isotropic();
            stage_or_deposit(slot, cutoff, ParticleKind::Electron, transfer, dir);
            slot.energy -= transfer;
            if slot.energy <= cutoff {
                kill(slot);
            }
            Ok(())
        })
    }
}

/// Photoelectric absorption for gammas.
pub struct PhotoabsorptionAction {
    id: ActionId,
}

impl PhotoabsorptionAction {
    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for PhotoabsorptionAction {
    fn id(&self) -> ActionId {
        self.id
    }
    fn label(&self) -> &str {
        "photoel-livermore"
    }
    fn description(&self) -> &str {
        "photoelectric absorption"
    }
    fn order(&self) -> ActionOrder {
        ActionOrder::PostStepInteract
    }

    fn execute(&self, params: &CoreParams, state: &mut TrackStateArray) -> Result<(), ActionError> {
        let cutoff = params.config.energy_cutoff;
        launch_over_alive(self.label(), state, |_, slot| {
            if slot.selected_process != Some(Process::Photoabsorption) {
                return Ok(());
            }
            debug_assert_eq!(slot.kind, ParticleKind::Gamma);
            // All the photon energy goes to the photoelectron
            let energy = slot.energy;
            let dir = slot.direction;
            slot.energy = 0.0;
            slot.status = TrackStatus::Killed;
            stage_or_deposit(slot, cutoff, ParticleKind::Electron, energy, dir);
            Ok(())
        })
    }
}

/// Electron-positron pair production for gammas.
pub struct PairProductionAction {
    id: ActionId,
}

impl PairProductionAction {
    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for PairProductionAction {
    fn id(&self) -> ActionId {
        self.id
    }
    fn label(&self) -> &str {
        "conv-bethe-heitler"
    }
    fn description(&self) -> &str {
        "electron-positron pair production"
    }
    fn order(&self) -> ActionOrder {
        ActionOrder::PostStepInteract
    }

    fn execute(&self, params: &CoreParams, state: &mut TrackStateArray) -> Result<(), ActionError> {
        let cutoff = params.config.energy_cutoff;
        let threshold = 2.0 * units::ELECTRON_MASS_MEV;
        launch_over_alive(self.label(), state, |_, slot| {
            if slot.selected_process != Some(Process::PairProduction) {
                return Ok(());
            }
            debug_assert_eq!(slot.kind, ParticleKind::Gamma);
            if slot.energy <= threshold {
                // Below threshold the cross section should vanish; absorb
                kill(slot);
                return Ok(());
            }
            let kinetic = 0.5 * (slot.energy - threshold);
            let dir = slot.rng.isotropic();
            slot.energy = 0.0;
            slot.status = TrackStatus::Killed;
            stage_or_deposit(slot, cutoff, ParticleKind::Electron, kinetic, dir);
            stage_or_deposit(slot, cutoff, ParticleKind::Positron, kinetic, -dir);
            Ok(())
        })
    }
}

/// In-flight positron annihilation into two photons.
pub struct AnnihilationAction {
    id: ActionId,
}

impl AnnihilationAction {
    pub fn new(id: ActionId) -> Self {
        Self { id }
    }
}

impl Action for AnnihilationAction {
    fn id(&self) -> ActionId {
        self.id
    }
    fn label(&self) -> &str {
        "annihil-2-gamma"
    }
    fn description(&self) -> &str {
        "positron annihilation into two photons"
    }
    fn order(&self) -> ActionOrder {
        ActionOrder::PostStepInteract
    }

    fn execute(&self, params: &CoreParams, state: &mut TrackStateArray) -> Result<(), ActionError> {
        let cutoff = params.config.energy_cutoff;
        launch_over_alive(self.label(), state, |_, slot| {
            if slot.selected_process != Some(Process::Annihilation) {
                return Ok(());
            }
            debug_assert_eq!(slot.kind, ParticleKind::Positron);
            // Kinetic energy plus both rest masses split between two photons
            let egamma = 0.5 * (slot.energy + 2.0 * units::ELECTRON_MASS_MEV);
            let dir = slot.rng.isotropic();
            slot.energy = 0.0;
            slot.status = TrackStatus::Killed;
            stage_or_deposit(slot, cutoff, ParticleKind::Gamma, egamma, dir);
            stage_or_deposit(slot, cutoff, ParticleKind::Gamma, egamma, -dir);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn ionization_stages_a_delta_ray_and_conserves_energy() {
        let params = testutil::demo_params();
        let mut state = TrackStateArray::new(2);
        testutil::spawn(&mut state, 0, ParticleKind::Electron, 10.0);
        state.slots_mut()[0].selected_process = Some(Process::Ionization);

        IonizationAction::new(ActionId(4)).execute(&params, &mut state).expect("ok");
        let slot = &state.slots()[0];
        let staged: f64 = slot.secondaries.iter().map(|s| s.energy).sum();
        assert!(
            (slot.energy + staged + slot.eloss - 10.0).abs() < 1e-12,
            "kinetic energy must be conserved across the interaction"
        );
        assert!(slot.energy >= 5.0 - 1e-12, "at most half the energy transfers");
    }

    #[test]
    fn models_ignore_unselected_tracks() {
        let params = testutil::demo_params();
        let mut state = TrackStateArray::new(2);
        testutil::spawn(&mut state, 0, ParticleKind::Electron, 10.0);
        state.slots_mut()[0].selected_process = Some(Process::Bremsstrahlung);

        IonizationAction::new(ActionId(4)).execute(&params, &mut state).expect("ok");
        assert!(state.slots()[0].secondaries.is_empty(), "ionization must not fire");
        assert_eq!(state.slots()[0].energy, 10.0);
    }

    #[test]
    fn photoabsorption_kills_the_photon_and_emits_the_electron() {
        let params = testutil::demo_params();
        let mut state = TrackStateArray::new(2);
        testutil::spawn(&mut state, 0, ParticleKind::Gamma, 2.0);
        state.slots_mut()[0].selected_process = Some(Process::Photoabsorption);

        PhotoabsorptionAction::new(ActionId(7)).execute(&params, &mut state).expect("ok");
        let slot = &state.slots()[0];
        assert_eq!(slot.status, TrackStatus::Killed);
        assert_eq!(slot.secondaries.len(), 1);
        assert_eq!(slot.secondaries[0].kind, ParticleKind::Electron);
        assert_eq!(slot.secondaries[0].energy, 2.0);
    }

    #[test]
    fn pair_production_splits_above_threshold() {
        let params = testutil::demo_params();
        let mut state = TrackStateArray::new(2);
        testutil::spawn(&mut state, 0, ParticleKind::Gamma, 10.0);
        state.slots_mut()[0].selected_process = Some(Process::PairProduction);

        PairProductionAction::new(ActionId(8)).execute(&params, &mut state).expect("ok");
        let slot = &state.slots()[0];
        assert_eq!(slot.status, TrackStatus::Killed);
        assert_eq!(slot.secondaries.len(), 2);
        let kinds: Vec<_> = slot.secondaries.iter().map(|s| s.kind).collect();
        assert!(kinds.contains(&ParticleKind::Electron) && kinds.contains(&ParticleKind::Positron));
        let expected = 0.5 * (10.0 - 2.0 * units::ELECTRON_MASS_MEV);
        assert!((slot.secondaries[0].energy - expected).abs() < 1e-12);
    }

    #[test]
    fn annihilation_emits_back_to_back_photons() {
        let params = testutil::demo_params();
        let mut state = TrackStateArray::new(2);
        testutil::spawn(&mut state, 0, ParticleKind::Positron, 1.0);
        state.slots_mut()[0].selected_process = Some(Process::Annihilation);

        AnnihilationAction::new(ActionId(9)).execute(&params, &mut state).expect("ok");
        let slot = &state.slots()[0];
        assert_eq!(slot.status, TrackStatus::Killed);
        assert_eq!(slot.secondaries.len(), 2);
        let d0 = slot.secondaries[0].direction;
        let d1 = slot.secondaries[1].direction;
        assert!((d0 + d1).mag() < 1e-12, "the photons must be back to back");
        let expected = 0.5 * (1.0 + 2.0 * units::ELECTRON_MASS_MEV);
        assert_eq!(slot.secondaries[0].energy, expected);
    }
}
