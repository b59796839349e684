// units.rs
// Native unit system: energies in MeV, lengths in cm, times in s.

/// Electron rest mass [MeV].
pub const ELECTRON_MASS_MEV: f64 = 0.510_998_95;
/// Speed of light [cm/s].
pub const C_LIGHT: f64 = 2.997_924_58e10;
/// One millimeter in native length units [cm].
pub const MILLIMETER: f64 = 0.1;
/// One nanometer in native length units [cm].
pub const NANOMETER: f64 = 1.0e-7;

/// Particle speed [cm/s] for a given kinetic energy and rest mass.
///
/// Massless particles travel at exactly `C_LIGHT`.
pub fn particle_speed(kinetic_mev: f64, mass_mev: f64) -> f64 {
    if mass_mev <= 0.0 {
        return C_LIGHT;
    }
    let gamma = 1.0 + kinetic_mev / mass_mev;
    let beta_sq = 1.0 - 1.0 / (gamma * gamma);
    C_LIGHT * beta_sq.max(0.0).sqrt()
}
