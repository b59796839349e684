// physics/mod.rs
// Physics data and algorithms: materials, tabulated lookups, discrete
// processes, and the Urban MSC step limiter.

pub mod material;
pub mod msc;
pub mod process;
pub mod tables;
