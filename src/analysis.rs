//! Post-hoc summary statistics over a set of assemblies: score
//! distribution and restraint-satisfaction reporting, the kind of
//! numbers `<prefix>.log` and downstream review tooling want once a
//! search has produced its survivors.

use crate::restraints::RestraintSet;
use crate::subunit::{ChainSlotTable, SubunitType};
use crate::superbb::SuperBB;

/// Min/mean/max `score` across a set of assemblies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreStats {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

/// `None` for an empty slice; otherwise the min/mean/max of
/// [`SuperBB::score`] across `assemblies`.
pub fn score_stats(assemblies: &[SuperBB]) -> Option<ScoreStats> {
    if assemblies.is_empty() {
        return None;
    }
    let scores: Vec<f64> = assemblies.iter().map(|a| a.score).collect();
    let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    Some(ScoreStats { min, mean, max })
}

/// The spread (`max - min`) of `score` across `assemblies`; `0.0` for an
/// empty or single-element slice. A large spread among the survivors of
/// one size band suggests the beam (`bestK`) is wide enough to still be
/// discriminating; a spread near zero suggests either genuine
/// convergence or a beam too narrow to see the alternatives.
pub fn score_spread(assemblies: &[SuperBB]) -> f64 {
    match score_stats(assemblies) {
        Some(stats) => stats.max - stats.min,
        None => 0.0,
    }
}

/// For each assembly, its fraction of the full restraint set's weight
/// that ended up satisfied (spec.md §4.6's `constraint_bonus` numerator,
/// exposed standalone for reporting).
pub fn restraint_satisfaction_fractions(assemblies: &[SuperBB], restraints: &RestraintSet) -> Vec<f64> {
    let total_weight = restraints.total_weight();
    assemblies
        .iter()
        .map(|a| a.constraint_state.satisfaction_fraction(total_weight))
        .collect()
}

/// The mean restraint-satisfaction fraction across `assemblies`; `0.0`
/// when there are no restraints or no assemblies.
pub fn mean_restraint_satisfaction(assemblies: &[SuperBB], restraints: &RestraintSet) -> f64 {
    if assemblies.is_empty() || restraints.is_empty() {
        return 0.0;
    }
    let fractions = restraint_satisfaction_fractions(assemblies, restraints);
    fractions.iter().sum::<f64>() / fractions.len() as f64
}

/// Total backbone atom count placed by an assembly, summed over its
/// members — a size-normalization denominator for collision reporting.
pub fn total_placed_atoms(table: &ChainSlotTable, subunits: &[SubunitType], assembly: &SuperBB) -> usize {
    assembly
        .members
        .iter()
        .map(|&global_id| subunits[table.slot(global_id).subunit_type].residues.len())
        .sum()
}
