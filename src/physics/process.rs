// process.rs
// Discrete physics processes and the cross-section-weighted selection used
// at the post-step stage.

use serde::{Deserialize, Serialize};

use crate::rng::RngSubstream;

/// Discrete processes of the minimal e-/e+/gamma physics set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Process {
    Ionization,
    Bremsstrahlung,
    Compton,
    Photoabsorption,
    PairProduction,
    Annihilation,
}

impl Process {
    pub fn label(&self) -> &'static str {
        match self {
            Process::Ionization => "ioni",
            Process::Bremsstrahlung => "brems",
            Process::Compton => "compton",
            Process::Photoabsorption => "photoabs",
            Process::PairProduction => "conv",
            Process::Annihilation => "annihil",
        }
    }
}

/// Sum of macroscopic cross sections [1/cm].
pub fn total_xs(candidates: &[(Process, f64)]) -> f64 {
    candidates.iter().map(|(_, xs)| xs).sum()
}

/// Select one process with probability proportional to its cross section.
///
/// Walks the cumulative distribution; accumulated rounding falls through to
/// the final candidate. Returns `None` when nothing can fire.
pub fn select_process(candidates: &[(Process, f64)], rng: &mut RngSubstream) -> Option<Process> {
    let total = total_xs(candidates);
    if !(total > 0.0) {
        return None;
    }
    let mut accum = -total * rng.uniform();
    let (last, rest) = candidates.split_last()?;
    for (process, xs) in rest {
        accum += xs;
        if accum > 0.0 {
            return Some(*process);
        }
    }
    Some(last.0)
}
