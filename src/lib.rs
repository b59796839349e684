// lib.rs
// mc_transport: a CPU-portable Monte Carlo particle-transport stepping
// kernel. A fixed-capacity array of track slots is advanced by an ordered
// pipeline of actions each iteration, with the Urban multiple-scattering
// step limiter as the central physics algorithm. Geometry intersection and
// physics-table construction are consumed through traits.

pub mod action;
pub mod config;
pub mod error;
pub mod geometry;
pub mod output;
pub mod params;
pub mod physics;
pub mod rng;
pub mod stepper;
pub mod track;
pub mod units;

pub use config::{TransportConfig, UrbanMscParameters};
pub use error::{ActionError, SetupError, StepError, TrackError};
pub use output::{RecordingCollector, StepCollector, StepRecord};
pub use params::CoreParams;
pub use stepper::{build_default_actions, RunResult, StepCounts, Stepper};
pub use track::state::{EventId, ParticleKind, Primary, TrackId};
