// action/mod.rs
// The step pipeline machinery: registry, validated execution sequence, and
// the slot-parallel launch primitive.

pub mod launch;
pub mod registry;
pub mod sequence;
