// msc.rs
// Urban model step limitation for e-/e+ multiple scattering, following the
// ComputeTruePathLengthLimit / ComputeGeomPathLength method documented in
// section 8.1.6 of the Geant4 10.7 Physics Reference Manual
// (CERN-OPEN-2006-077, L. Urban).

use serde::{Deserialize, Serialize};

use crate::config::UrbanMscParameters;
use crate::physics::material::UrbanMscMaterialData;
use crate::physics::tables::MscTables;
use crate::rng::RngSubstream;
use crate::track::state::ParticleKind;
use crate::units;

/// Persistent step-limit properties, valid within one tracking volume.
///
/// Computed on the first limited step after a volume entry and reused for
/// every later step in the same volume; cleared by the boundary crossing.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MscRange {
    pub range_fact: f64,
    pub range_init: f64,
    pub limit_min: f64,
}

/// Result of one step limitation, consumed within the same along-step call.
#[derive(Clone, Copy, Debug)]
pub struct MscStep {
    /// Step limit proposed by the discrete physics [cm]
    pub phys_step: f64,
    /// True path length after MSC limiting [cm]
    pub true_path: f64,
    /// Straight-line path corresponding to the true path [cm]
    pub geom_path: f64,
    /// Mean-free-path interpolation slope, or `SMALL_STEP_ALPHA`
    pub alpha: f64,
    /// Whether lateral displacement applies to this step
    pub is_displaced: bool,
}

impl MscStep {
    /// Sentinel slope for steps too small to scatter.
    pub const SMALL_STEP_ALPHA: f64 = -1.0;
}

/// Energy-dependent lookups shared by the step limiter.
pub struct UrbanMscHelper<'a, T: ?Sized> {
    tables: &'a T,
    inc_energy: f64,
    range: f64,
    dtrl: f64,
}

impl<'a, T: MscTables + ?Sized> UrbanMscHelper<'a, T> {
    pub fn new(params: &UrbanMscParameters, tables: &'a T, inc_energy: f64) -> Self {
        Self {
            tables,
            inc_energy,
            range: tables.range(inc_energy),
            dtrl: params.dtrl,
        }
    }

    /// MSC mean free path at the given energy [cm].
    pub fn msc_mfp(&self, energy: f64) -> f64 {
        self.tables.msc_mfp(energy)
    }

    /// Slowing-down range at the incident energy [cm].
    pub fn range(&self) -> f64 {
        self.range
    }

    /// Energy whose remaining range equals `r` [MeV].
    pub fn energy_at_range(&self, r: f64) -> f64 {
        self.tables.energy_from_range(r)
    }

    /// Kinetic energy after slowing down over a step [MeV].
    ///
    /// A short step extrapolates linearly with the incident dE/dx; a longer
    /// one is evaluated exactly through the inverse range.
    pub fn end_energy(&self, step: f64) -> f64 {
        if step <= self.range * self.dtrl {
            self.inc_energy - step * self.tables.dedx(self.inc_energy)
        } else {
            self.energy_at_range(self.range - step)
        }
    }
}

struct GeomPathAlpha {
    geom_path: f64,
    alpha: f64,
}

/// Step limitation algorithm of the Urban model for e-/e+ multiple
/// scattering.
///
/// The sampled true path length never exceeds the proposed physics step,
/// and the returned geometric path never exceeds the current MSC mean free
/// path. When the limiter initializes the per-volume range properties it
/// returns them alongside the step so the caller can cache them in the
/// track slot.
pub struct UrbanMscStepLimit<'a, T: ?Sized> {
    params: &'a UrbanMscParameters,
    material: &'a UrbanMscMaterialData,
    helper: UrbanMscHelper<'a, T>,
    inc_energy: f64,
    is_positron: bool,
    safety: f64,
    phys_step: f64,
    lambda: f64,
    range: f64,
    msc_range: Option<MscRange>,
}

impl<'a, T: MscTables + ?Sized> UrbanMscStepLimit<'a, T> {
    /// Construct for one track's along-step evaluation.
    ///
    /// `msc_range` is the slot's cached per-volume state; `None` (first step
    /// in a volume) triggers re-initialization.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        params: &'a UrbanMscParameters,
        material: &'a UrbanMscMaterialData,
        tables: &'a T,
        particle: ParticleKind,
        inc_energy: f64,
        msc_range: Option<MscRange>,
        safety: f64,
        phys_step: f64,
    ) -> Self {
        debug_assert!(particle.is_charged(), "MSC applies to charged particles only");
        debug_assert!(safety >= 0.0);
        debug_assert!(phys_step > 0.0);
        let helper = UrbanMscHelper::new(params, tables, inc_energy);
        let lambda = helper.msc_mfp(inc_energy);
        let range = helper.range();
        // The slowing-down range is already applied as a step limit upstream.
        debug_assert!(range >= phys_step);
        Self {
            params,
            material,
            helper,
            inc_energy,
            is_positron: particle == ParticleKind::Positron,
            safety,
            phys_step,
            lambda,
            range,
            msc_range,
        }
    }

    /// Apply the step limitation with the track's RNG substream.
    pub fn sample(&self, rng: &mut RngSubstream) -> (MscStep, Option<MscRange>) {
        let mut result = MscStep {
            phys_step: self.phys_step,
            true_path: self.phys_step,
            geom_path: 0.0,
            alpha: MscStep::SMALL_STEP_ALPHA,
            is_displaced: true,
        };

        // A very small step, or the lower bound on the linear distance the
        // particle can travel is far from the nearest boundary.
        if result.true_path < self.params.limit_min_fix
            || self.range * self.material.d_over_r < self.safety
        {
            result.is_displaced = false;
            result.geom_path = self.calc_geom_path(result.true_path).geom_path;
            return (result, None);
        }

        // Initialization at the first step in the volume
        let (msc_range, fresh) = match self.msc_range {
            Some(cached) => (cached, false),
            None => {
                let mut range_fact = self.params.range_fact;
                if self.lambda > self.params.lambda_limit {
                    range_fact *= 0.75 + 0.25 * self.lambda / self.params.lambda_limit;
                }
                let computed = MscRange {
                    range_fact,
                    range_init: self.range.max(self.lambda),
                    limit_min: self.calc_limit_min(),
                };
                (computed, true)
            }
        };

        // The step limit
        let mut limit = self.range;
        if limit > self.safety {
            limit = (msc_range.range_fact * msc_range.range_init)
                .max(self.params.safety_fact * self.safety);
        }
        limit = limit.max(msc_range.limit_min);

        if limit < result.true_path {
            // Randomize the limit if this step is determined by MSC
            let mut sampled_limit = msc_range.limit_min;
            if limit > sampled_limit {
                sampled_limit = rng.normal(limit, 0.1 * (limit - msc_range.limit_min));
                sampled_limit = sampled_limit.max(msc_range.limit_min);
            }
            result.true_path = result.true_path.min(sampled_limit);
        }

        let transformed = self.calc_geom_path(result.true_path);
        result.geom_path = transformed.geom_path;
        result.alpha = transformed.alpha;

        (result, fresh.then_some(msc_range))
    }

    /// Transform a true path length into the mean geometric path length.
    ///
    /// The mean straight-line displacement for a true path t is
    /// z = lambda * (1 - exp(-t/lambda)), with lambda decreasing along the
    /// step. The decrease is approximated linearly, lambda(t) =
    /// lambda0 * (1 - alpha*t), where alpha interpolates between the
    /// start- and end-of-step mean free paths, or alpha = 1/range near the
    /// end of the range.
    fn calc_geom_path(&self, true_path: f64) -> GeomPathAlpha {
        let mut result = GeomPathAlpha {
            geom_path: true_path,
            alpha: MscStep::SMALL_STEP_ALPHA,
        };

        if true_path < self.params.min_step {
            // Geometric path equals the true path for a very small step
            return result;
        }

        let lambda = self.lambda;
        let tau = true_path / lambda;
        if tau <= self.params.tau_small {
            result.geom_path = true_path.min(lambda);
        } else if true_path < self.range * self.params.dtrl {
            result.geom_path = if tau < self.params.tau_limit {
                true_path * (1.0 - 0.5 * tau)
            } else {
                lambda * (1.0 - (-tau).exp())
            };
        } else if self.inc_energy < units::ELECTRON_MASS_MEV || true_path == self.range {
            // Near the end of the range the exact equality (not a tolerance
            // check) routes here, matching the reference behavior.
            result.alpha = 1.0 / self.range;
            let w = 1.0 + 1.0 / (result.alpha * lambda);
            result.geom_path = 1.0 / (result.alpha * w);
            if true_path < self.range {
                result.geom_path *= 1.0 - (1.0 - true_path / self.range).powf(w);
            }
        } else {
            let rfinal = (self.range - true_path).max(0.01 * self.range);
            let end_energy = self.helper.energy_at_range(rfinal);
            let lambda1 = self.helper.msc_mfp(end_energy);
            debug_assert!(
                lambda1 < lambda,
                "end-of-step mfp must be below the start-of-step mfp"
            );
            result.alpha = (lambda - lambda1) / (lambda * true_path);
            let w = 1.0 + 1.0 / (result.alpha * lambda);
            result.geom_path = (1.0 - (lambda1 / lambda).powf(w)) / (result.alpha * w);
        }

        result.geom_path = result.geom_path.min(lambda);
        result
    }

    /// Minimum of the true path length limit.
    fn calc_limit_min(&self) -> f64 {
        let e = self.inc_energy;
        let mut xm =
            self.lambda / (2.0 + self.material.stepmin_a * e + self.material.stepmin_b * e * e);

        // 0.7 * z^(1/2) for positrons, otherwise 0.87 * z^(2/3)
        xm *= if self.is_positron {
            self.material.scaled_zeff
        } else {
            0.87 * self.material.z23
        };

        if e < self.params.tlow {
            // Energy is below the low-energy limit
            xm *= 0.5 + 0.5 * e / self.params.tlow;
        }

        xm.max(self.params.limit_min_fix)
    }
}
