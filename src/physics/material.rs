// material.rs
// Material properties consumed by the transport physics. Only the effective
// atomic number and the Urban MSC fit coefficients derived from it are
// carried; everything else lives in the precomputed physics tables.

use serde::{Deserialize, Serialize};

/// Index of a material in the run's material list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub usize);

/// Urban MSC coefficients for one material.
///
/// All five are polynomial/power-law fits in the effective atomic number,
/// taken from the Urban model's reference parameterization.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct UrbanMscMaterialData {
    /// Z^(2/3)
    pub z23: f64,
    /// 0.7 * sqrt(Z), applied to the minimum-step fit for positrons
    pub scaled_zeff: f64,
    /// Coefficient `a` of the minimum-step fit [1/cm]
    pub stepmin_a: f64,
    /// Coefficient `b` of the minimum-step fit [1/cm]
    pub stepmin_b: f64,
    /// Maximum step-over-range ratio for the safety comparison
    pub d_over_r: f64,
}

impl UrbanMscMaterialData {
    /// Evaluate the fits for a given effective atomic number.
    pub fn from_zeff(z_eff: f64) -> Self {
        let sqrt_z = z_eff.sqrt();
        Self {
            z23: z_eff.powf(2.0 / 3.0),
            scaled_zeff: 0.7 * sqrt_z,
            stepmin_a: 1.0e3 * 27.725 / (1.0 + 0.203 * z_eff),
            stepmin_b: 1.0e3 * 6.152 / (1.0 + 0.111 * z_eff),
            d_over_r: 0.9628 - 0.084_848 * sqrt_z + 0.004_376_9 * z_eff,
        }
    }
}

/// One material in the problem definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Material {
    pub label: String,
    pub z_eff: f64,
    pub msc: UrbanMscMaterialData,
}

impl Material {
    pub fn new(label: impl Into<String>, z_eff: f64) -> Self {
        Self {
            label: label.into(),
            z_eff,
            msc: UrbanMscMaterialData::from_zeff(z_eff),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_values_for_silicon() {
        // Z = 14
        let d = UrbanMscMaterialData::from_zeff(14.0);
        assert!((d.z23 - 14.0f64.powf(2.0 / 3.0)).abs() < 1e-12);
        assert!((d.scaled_zeff - 0.7 * 14.0f64.sqrt()).abs() < 1e-12);
        assert!((d.stepmin_a - 1.0e3 * 27.725 / (1.0 + 0.203 * 14.0)).abs() < 1e-9);
        assert!((d.stepmin_b - 1.0e3 * 6.152 / (1.0 + 0.111 * 14.0)).abs() < 1e-9);
        assert!((d.d_over_r - (0.9628 - 0.084_848 * 14.0f64.sqrt() + 0.004_376_9 * 14.0)).abs() < 1e-12);
    }

    #[test]
    fn d_over_r_stays_positive_through_heavy_elements() {
        for z in 1..=92 {
            let d = UrbanMscMaterialData::from_zeff(z as f64);
            assert!(d.d_over_r > 0.0, "d_over_r must be positive for Z={}", z);
            assert!(d.d_over_r < 1.0, "d_over_r must stay below 1 for Z={}", z);
        }
    }
}
