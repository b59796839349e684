// state.rs
// Track slot storage: one fixed-capacity array of in-flight particle states,
// mutated in place by the action pipeline. The slot index is the parallel
// partition key; no action reads another slot's in-progress state.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use ultraviolet::DVec3;

use crate::action::registry::ActionId;
use crate::geometry::VolumeId;
use crate::physics::material::MaterialId;
use crate::physics::msc::MscRange;
use crate::physics::process::Process;
use crate::rng::RngSubstream;
use crate::units;

/// Identifier of one source event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u32);

/// Identifier of one track within its event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u32);

/// Particle species of the minimal e-/e+/gamma set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleKind {
    Electron,
    Positron,
    Gamma,
}

impl ParticleKind {
    /// Rest mass [MeV].
    pub fn mass(&self) -> f64 {
        match self {
            ParticleKind::Electron | ParticleKind::Positron => units::ELECTRON_MASS_MEV,
            ParticleKind::Gamma => 0.0,
        }
    }

    pub fn is_charged(&self) -> bool {
        !matches!(self, ParticleKind::Gamma)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ParticleKind::Electron => "e-",
            ParticleKind::Positron => "e+",
            ParticleKind::Gamma => "gamma",
        }
    }
}

/// Life-cycle marker of one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackStatus {
    /// Slot is empty and eligible for a new track
    Inactive,
    /// Track is being transported
    Alive,
    /// Track ended this step; the slot frees up at the next compaction
    Killed,
}

/// Current step limit and the action that proposed it.
#[derive(Clone, Copy, Debug)]
pub struct StepLimit {
    pub step: f64,
    pub action: Option<ActionId>,
}

impl StepLimit {
    pub fn unlimited() -> Self {
        Self { step: f64::INFINITY, action: None }
    }

    /// Keep the smaller of the current and the proposed limit.
    pub fn propose(&mut self, step: f64, action: ActionId) {
        if step < self.step {
            self.step = step;
            self.action = Some(action);
        }
    }
}

/// An externally supplied source particle.
#[derive(Clone, Copy, Debug)]
pub struct Primary {
    pub kind: ParticleKind,
    pub energy: f64,
    pub position: DVec3,
    pub direction: DVec3,
    pub time: f64,
    pub event_id: EventId,
}

/// A particle produced by an interaction, staged for later initialization.
#[derive(Clone, Copy, Debug)]
pub struct Secondary {
    pub kind: ParticleKind,
    pub energy: f64,
    pub direction: DVec3,
}

/// Everything needed to start one track in an empty slot.
#[derive(Clone, Copy, Debug)]
pub struct TrackInitializer {
    pub kind: ParticleKind,
    pub energy: f64,
    pub position: DVec3,
    pub direction: DVec3,
    pub time: f64,
    pub event_id: EventId,
    pub track_id: TrackId,
    pub parent_id: Option<TrackId>,
}

/// One in-flight particle's full transport state.
#[derive(Clone, Debug)]
pub struct TrackSlot {
    pub status: TrackStatus,
    pub kind: ParticleKind,
    /// Kinetic energy [MeV]
    pub energy: f64,
    /// Position [cm]
    pub position: DVec3,
    /// Unit direction
    pub direction: DVec3,
    /// Global time [s]
    pub time: f64,
    pub event_id: EventId,
    pub track_id: TrackId,
    pub parent_id: Option<TrackId>,
    /// Containing volume; `None` once the track leaves the world
    pub volume: Option<VolumeId>,
    pub material: MaterialId,
    /// Step limit for the current iteration
    pub step_limit: StepLimit,
    /// Per-volume MSC range memory, cleared at boundary crossings
    pub msc_range: Option<MscRange>,
    /// Whether the current step ended on a volume boundary
    pub on_boundary: bool,
    /// True path length travelled this step [cm]
    pub true_step: f64,
    /// Geometric path length travelled this step [cm]
    pub geom_step: f64,
    /// Energy deposited locally this step [MeV]
    pub eloss: f64,
    /// Discrete process chosen for the end of this step
    pub selected_process: Option<Process>,
    /// Secondaries staged this step, drained by compaction
    pub secondaries: SmallVec<[Secondary; 2]>,
    /// Per-track RNG substream
    pub rng: RngSubstream,
    pub num_steps: u64,
}

impl TrackSlot {
    /// An empty slot awaiting a track.
    pub fn inactive() -> Self {
        Self {
            status: TrackStatus::Inactive,
            kind: ParticleKind::Gamma,
            energy: 0.0,
            position: DVec3::zero(),
            direction: DVec3::new(0.0, 0.0, 1.0),
            time: 0.0,
            event_id: EventId(0),
            track_id: TrackId(0),
            parent_id: None,
            volume: None,
            material: MaterialId(0),
            step_limit: StepLimit::unlimited(),
            msc_range: None,
            on_boundary: false,
            true_step: 0.0,
            geom_step: 0.0,
            eloss: 0.0,
            selected_process: None,
            secondaries: SmallVec::new(),
            rng: RngSubstream::for_track(0, 0, 0),
            num_steps: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.status == TrackStatus::Alive
    }

    /// Start a new track in this slot.
    pub fn initialize(&mut self, init: TrackInitializer, seed: u64) {
        *self = TrackSlot {
            status: TrackStatus::Alive,
            kind: init.kind,
            energy: init.energy,
            position: init.position,
            direction: init.direction,
            time: init.time,
            event_id: init.event_id,
            track_id: init.track_id,
            parent_id: init.parent_id,
            rng: RngSubstream::for_track(seed, init.event_id.0, init.track_id.0),
            ..TrackSlot::inactive()
        };
    }
}

/// Fixed-capacity container of all track slots.
///
/// Capacity is set once at construction; no action may resize it.
#[derive(Clone, Debug)]
pub struct TrackStateArray {
    slots: Vec<TrackSlot>,
}

impl TrackStateArray {
    pub fn new(capacity: usize) -> Self {
        Self { slots: vec![TrackSlot::inactive(); capacity] }
    }

    /// Number of track slots (fixed for the life of the run).
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[TrackSlot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [TrackSlot] {
        &mut self.slots
    }

    pub fn num_alive(&self) -> usize {
        self.slots.iter().filter(|s| s.is_alive()).count()
    }
}
