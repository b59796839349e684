// track/mod.rs
// Track storage and life cycle: the fixed-capacity slot array and the
// initialization/compaction machinery.

pub mod init;
pub mod state;

pub use state::{EventId, TrackId};
