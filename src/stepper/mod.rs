// stepper/mod.rs
// The per-step physics actions and the run driver that sequences them.

pub mod along_step;
pub mod boundary;
pub mod discrete;
pub mod models;
pub mod pre_step;
pub mod stepper;

pub use stepper::{build_default_actions, RunResult, StepCounts, Stepper};
