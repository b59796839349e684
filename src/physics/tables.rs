// tables.rs
// Precomputed physics lookups. Table construction is an external concern;
// the transport core consumes tables as monotonic calculators over uniform
// log-energy grids: energy -> cross section, energy -> dE/dx, energy ->
// range, and the inverse range -> energy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::TrackError;
use crate::physics::material::MaterialId;
use crate::physics::process::Process;
use crate::track::state::ParticleKind;

/// Uniform grid in log(energy).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct UniformLogGrid {
    log_emin: f64,
    log_emax: f64,
    size: usize,
}

impl UniformLogGrid {
    pub fn new(emin: f64, emax: f64, size: usize) -> Self {
        assert!(emin > 0.0 && emax > emin, "grid bounds must satisfy 0 < emin < emax");
        assert!(size >= 2, "a grid needs at least two points");
        Self { log_emin: emin.ln(), log_emax: emax.ln(), size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn emin(&self) -> f64 {
        self.log_emin.exp()
    }

    pub fn emax(&self) -> f64 {
        self.log_emax.exp()
    }

    /// Energy at grid point `i`.
    pub fn energy(&self, i: usize) -> f64 {
        let f = i as f64 / (self.size - 1) as f64;
        (self.log_emin + f * (self.log_emax - self.log_emin)).exp()
    }

    /// Fractional grid coordinate of an energy, clamped to the grid.
    fn coord(&self, energy: f64) -> f64 {
        let log_e = energy.max(f64::MIN_POSITIVE).ln();
        let f = (log_e - self.log_emin) / (self.log_emax - self.log_emin);
        f.clamp(0.0, 1.0) * (self.size - 1) as f64
    }
}

/// One tabulated quantity, linearly interpolated in log(energy).
///
/// Queries outside the grid clamp to the end values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TabulatedFn {
    grid: UniformLogGrid,
    values: Vec<f64>,
}

impl TabulatedFn {
    pub fn new(grid: UniformLogGrid, values: Vec<f64>) -> Self {
        assert_eq!(values.len(), grid.size(), "one value per grid point");
        Self { grid, values }
    }

    /// Tabulate a closure over the grid.
    pub fn from_fn(grid: UniformLogGrid, f: impl Fn(f64) -> f64) -> Self {
        let values = (0..grid.size()).map(|i| f(grid.energy(i))).collect();
        Self::new(grid, values)
    }

    pub fn grid(&self) -> &UniformLogGrid {
        &self.grid
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Interpolated value at the given energy.
    pub fn eval(&self, energy: f64) -> f64 {
        let x = self.grid.coord(energy);
        let i = (x as usize).min(self.grid.size() - 2);
        let f = x - i as f64;
        self.values[i] * (1.0 - f) + self.values[i + 1] * f
    }
}

/// Continuous energy-loss tables for one charged particle in one material.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnergyLossTables {
    /// Stopping power dE/dx [MeV/cm]
    pub dedx: TabulatedFn,
    /// CSDA range [cm]; strictly increasing with energy
    pub range: TabulatedFn,
}

impl EnergyLossTables {
    /// Invert the range table: energy whose range equals `r`.
    ///
    /// Below the grid's lowest range the energy scales linearly down to
    /// zero; above the grid it clamps to the highest tabulated energy.
    pub fn energy_from_range(&self, r: f64) -> f64 {
        let grid = self.range.grid();
        let values = self.range.values();
        debug_assert!(
            values.windows(2).all(|w| w[0] < w[1]),
            "range table must be strictly increasing"
        );
        if r <= values[0] {
            return grid.emin() * (r / values[0]).max(0.0);
        }
        let last = values.len() - 1;
        if r >= values[last] {
            return grid.emax();
        }
        // Bisect for the bracketing grid interval.
        let mut lo = 0;
        let mut hi = last;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if values[mid] <= r {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let e_lo = grid.energy(lo);
        let e_hi = grid.energy(hi);
        let f = (r - values[lo]) / (values[hi] - values[lo]);
        e_lo + f * (e_hi - e_lo)
    }
}

/// Per-particle-per-material physics tables.
///
/// Neutral particles carry neither energy-loss nor MSC tables.
#[derive(Clone, Debug)]
pub struct ParticleTables {
    /// Continuous slowing-down tables; `None` for neutral particles
    pub eloss: Option<EnergyLossTables>,
    /// MSC transport cross section scaled by E^2 [MeV^2/cm]; `None` for
    /// neutral particles
    pub msc_xs: Option<TabulatedFn>,
    /// Macroscopic cross section [1/cm] per discrete process
    pub process_xs: Vec<(Process, TabulatedFn)>,
}

impl ParticleTables {
    /// View implementing the step-limiter lookup contract, if this particle
    /// undergoes multiple scattering.
    pub fn msc_view(&self) -> Option<MscTableView<'_>> {
        match (&self.msc_xs, &self.eloss) {
            (Some(msc_xs), Some(eloss)) => Some(MscTableView { msc_xs, eloss }),
            _ => None,
        }
    }
}

/// Lookup contract consumed by the Urban MSC step limiter.
///
/// Any implementation with monotonic `energy -> mfp/dedx/range` and the
/// matching inverse range is acceptable.
pub trait MscTables {
    /// MSC transport mean free path at the given energy [cm].
    fn msc_mfp(&self, energy: f64) -> f64;
    /// Stopping power at the given energy [MeV/cm].
    fn dedx(&self, energy: f64) -> f64;
    /// CSDA range at the given energy [cm].
    fn range(&self, energy: f64) -> f64;
    /// Energy whose range equals `r` [MeV].
    fn energy_from_range(&self, r: f64) -> f64;
}

/// Borrowed table view for one (particle, material) pair.
pub struct MscTableView<'a> {
    msc_xs: &'a TabulatedFn,
    eloss: &'a EnergyLossTables,
}

impl MscTables for MscTableView<'_> {
    fn msc_mfp(&self, energy: f64) -> f64 {
        // The table stores sigma * E^2 to flatten the interpolant.
        energy * energy / self.msc_xs.eval(energy)
    }

    fn dedx(&self, energy: f64) -> f64 {
        self.eloss.dedx.eval(energy)
    }

    fn range(&self, energy: f64) -> f64 {
        self.eloss.range.eval(energy)
    }

    fn energy_from_range(&self, r: f64) -> f64 {
        self.eloss.energy_from_range(r)
    }
}

/// All physics tables for a run, keyed by particle and material.
#[derive(Clone, Debug, Default)]
pub struct PhysicsTables {
    tables: HashMap<(ParticleKind, MaterialId), ParticleTables>,
}

impl PhysicsTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, particle: ParticleKind, material: MaterialId, tables: ParticleTables) {
        self.tables.insert((particle, material), tables);
    }

    /// Tables for one track context; missing tables are a per-track error.
    pub fn get(
        &self,
        particle: ParticleKind,
        material: MaterialId,
    ) -> Result<&ParticleTables, TrackError> {
        self.tables.get(&(particle, material)).ok_or(TrackError::MissingTables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> UniformLogGrid {
        UniformLogGrid::new(1.0e-4, 1.0e2, 64)
    }

    #[test]
    fn interpolation_is_exact_on_grid_points() {
        let tab = TabulatedFn::from_fn(grid(), |e| 3.0 * e);
        for i in 0..tab.grid().size() {
            let e = tab.grid().energy(i);
            assert!(
                (tab.eval(e) - 3.0 * e).abs() < 1e-9 * e,
                "grid point {} must reproduce the tabulated value",
                i
            );
        }
    }

    #[test]
    fn queries_clamp_to_grid_ends() {
        let tab = TabulatedFn::from_fn(grid(), |e| e);
        assert_eq!(tab.eval(1.0e-9), tab.values()[0]);
        assert_eq!(tab.eval(1.0e9), *tab.values().last().unwrap());
    }

    #[test]
    fn inverse_range_round_trips() {
        // range(E) = 0.3 * E is exactly representable by log-linear
        // interpolation at the grid points.
        let eloss = EnergyLossTables {
            dedx: TabulatedFn::from_fn(grid(), |_| 1.0 / 0.3),
            range: TabulatedFn::from_fn(grid(), |e| 0.3 * e),
        };
        for &e in &[1.0e-3, 2.0e-2, 0.5, 7.0, 90.0] {
            let r = eloss.range.eval(e);
            let back = eloss.energy_from_range(r);
            assert!(
                (back - e).abs() < 1e-3 * e,
                "inverse range must recover the energy: {} vs {}",
                back,
                e
            );
        }
    }

    #[test]
    fn inverse_range_handles_underflow_and_overflow() {
        let eloss = EnergyLossTables {
            dedx: TabulatedFn::from_fn(grid(), |_| 1.0),
            range: TabulatedFn::from_fn(grid(), |e| e),
        };
        assert_eq!(eloss.energy_from_range(0.0), 0.0);
        let below = eloss.energy_from_range(0.5e-4);
        assert!(below > 0.0 && below < 1.0e-4, "sub-grid range scales toward zero");
        assert_eq!(eloss.energy_from_range(1.0e6), eloss.range.grid().emax());
    }

    #[test]
    fn msc_mfp_unscales_the_tabulated_xs() {
        let tables = ParticleTables {
            eloss: Some(EnergyLossTables {
                dedx: TabulatedFn::from_fn(grid(), |_| 2.0),
                range: TabulatedFn::from_fn(grid(), |e| 0.5 * e),
            }),
            // sigma = 1/e => table stores e^2 * sigma = e
            msc_xs: Some(TabulatedFn::from_fn(grid(), |e| e)),
            process_xs: Vec::new(),
        };
        let view = tables.msc_view().expect("charged tables have an msc view");
        let e = 2.0;
        assert!((view.msc_mfp(e) - e).abs() < 1e-9, "mfp = E^2 / (E^2 sigma)");
    }

    #[test]
    fn missing_tables_are_a_track_error() {
        let tables = PhysicsTables::new();
        let err = tables.get(ParticleKind::Electron, MaterialId(0));
        assert!(matches!(err, Err(TrackError::MissingTables)));
    }
}
