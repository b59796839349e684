// config.rs
// Centralized configuration for the transport kernel: run-level limits and
// the Urban multiple-scattering algorithm constants.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::units;

// ====================
// Run/Capacity Parameters
// ====================
/// Default number of track slots in the state array
pub const DEFAULT_NUM_TRACK_SLOTS: usize = 4096;
/// Default maximum number of events per run
pub const DEFAULT_MAX_EVENTS: usize = 1024;
/// Default pending-initializer queue capacity, as a multiple of the slot count
pub const DEFAULT_INITIALIZER_CAPACITY_FACTOR: usize = 8;
/// Default secondary staging capacity, as a multiple of the slot count
pub const DEFAULT_SECONDARY_STACK_FACTOR: f64 = 3.0;
/// Default kinetic-energy cutoff below which tracks are killed [MeV]
pub const DEFAULT_ENERGY_CUTOFF: f64 = 1.0e-3;
/// Default cap on the number of step iterations per run
pub const DEFAULT_MAX_STEP_ITERATIONS: u64 = 1 << 16;

// ====================
// Urban MSC Parameters
// ====================
// Values follow the Urban model defaults of the Geant4 10.7 reference
// implementation (CERN-OPEN-2006-077).
/// Fraction of the remaining range used as the step limit on volume entry
pub const MSC_RANGE_FACT: f64 = 0.04;
/// Fraction of the safety distance used as the step limit
pub const MSC_SAFETY_FACT: f64 = 0.6;
/// Mean free path above which `range_fact` is scaled up [cm]
pub const MSC_LAMBDA_LIMIT: f64 = units::MILLIMETER;
/// Below this true-path/mfp ratio the step is treated as scattering-free
pub const MSC_TAU_SMALL: f64 = 1.0e-16;
/// Small-angle threshold on true-path/mfp for the linear correction
pub const MSC_TAU_LIMIT: f64 = 1.0e-6;
/// Fractional change in range distinguishing "small" energy-loss steps
pub const MSC_DTRL: f64 = 5.0e-2;
/// Hard lower bound on the true path length limit [cm] (1 nm)
pub const MSC_LIMIT_MIN_FIX: f64 = 1.0e-6 * units::MILLIMETER;
/// Below this true path the geometric path equals the true path [cm]
pub const MSC_MIN_STEP: f64 = 5.0e-8 * units::MILLIMETER;
/// Energy below which the minimum true path limit is scaled down [MeV]
pub const MSC_TLOW: f64 = 5.0e-3;

/// Urban MSC step-limitation constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UrbanMscParameters {
    pub range_fact: f64,
    pub safety_fact: f64,
    pub lambda_limit: f64,
    pub tau_small: f64,
    pub tau_limit: f64,
    pub dtrl: f64,
    pub limit_min_fix: f64,
    pub min_step: f64,
    pub tlow: f64,
}

impl UrbanMscParameters {
    /// Check the algorithm constants; every one must be positive and finite.
    pub fn validate(&self) -> Result<(), SetupError> {
        let fields = [
            ("range_fact", self.range_fact),
            ("safety_fact", self.safety_fact),
            ("lambda_limit", self.lambda_limit),
            ("tau_small", self.tau_small),
            ("tau_limit", self.tau_limit),
            ("dtrl", self.dtrl),
            ("limit_min_fix", self.limit_min_fix),
            ("min_step", self.min_step),
            ("tlow", self.tlow),
        ];
        for (name, value) in fields {
            if !(value > 0.0) || !value.is_finite() {
                return Err(SetupError::InvalidConfig(format!(
                    "msc.{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for UrbanMscParameters {
    fn default() -> Self {
        Self {
            range_fact: MSC_RANGE_FACT,
            safety_fact: MSC_SAFETY_FACT,
            lambda_limit: MSC_LAMBDA_LIMIT,
            tau_small: MSC_TAU_SMALL,
            tau_limit: MSC_TAU_LIMIT,
            dtrl: MSC_DTRL,
            limit_min_fix: MSC_LIMIT_MIN_FIX,
            min_step: MSC_MIN_STEP,
            tlow: MSC_TLOW,
        }
    }
}

/// Run-level transport configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Fixed capacity of the track state array
    pub num_track_slots: usize,
    /// Maximum number of events accepted per run
    pub max_events: usize,
    /// Pending-initializer queue capacity; exceeding it is fatal
    pub initializer_capacity: usize,
    /// Secondary staging capacity as a multiple of `num_track_slots`;
    /// secondaries beyond it are discarded with a counted diagnostic
    pub secondary_stack_factor: f64,
    /// Tracks below this kinetic energy are killed and deposit locally [MeV]
    pub energy_cutoff: f64,
    /// Iteration budget for `Stepper::run`
    pub max_step_iterations: u64,
    /// Base seed mixed into every per-track RNG substream
    pub seed: u64,
    /// Urban MSC algorithm constants
    #[serde(default)]
    pub msc: UrbanMscParameters,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            num_track_slots: DEFAULT_NUM_TRACK_SLOTS,
            max_events: DEFAULT_MAX_EVENTS,
            initializer_capacity: DEFAULT_NUM_TRACK_SLOTS
                * DEFAULT_INITIALIZER_CAPACITY_FACTOR,
            secondary_stack_factor: DEFAULT_SECONDARY_STACK_FACTOR,
            energy_cutoff: DEFAULT_ENERGY_CUTOFF,
            max_step_iterations: DEFAULT_MAX_STEP_ITERATIONS,
            seed: 0,
            msc: UrbanMscParameters::default(),
        }
    }
}

impl TransportConfig {
    /// Load a configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SetupError> {
        let content = fs::read_to_string(path)?;
        let config: TransportConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check numeric options; called at stepper construction.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.num_track_slots == 0 {
            return Err(SetupError::InvalidConfig(
                "num_track_slots must be positive".into(),
            ));
        }
        if self.initializer_capacity == 0 {
            return Err(SetupError::InvalidConfig(
                "initializer_capacity must be positive".into(),
            ));
        }
        if !(self.secondary_stack_factor > 0.0) {
            return Err(SetupError::InvalidConfig(
                "secondary_stack_factor must be positive".into(),
            ));
        }
        if !(self.energy_cutoff >= 0.0) {
            return Err(SetupError::InvalidConfig(
                "energy_cutoff must be non-negative".into(),
            ));
        }
        self.msc.validate()
    }

    /// Capacity of the per-step secondary staging area.
    pub fn secondary_capacity(&self) -> usize {
        (self.secondary_stack_factor * self.num_track_slots as f64) as usize
    }
}
