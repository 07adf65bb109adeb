//! Greedy RMSD clustering of final assemblies (spec.md §4.8).
//!
//! Assemblies from different branches of the search tree reach the same
//! final identity through different connector choices, so they don't
//! share a common world frame: clustering first finds the best-fit
//! superposition between two assemblies' backbone point clouds, then
//! measures RMSD under that alignment.

use crate::geometry::{rmsd, superpose, Vec3};
use crate::subunit::{ChainSlotTable, SubunitType};
use crate::superbb::SuperBB;

/// The backbone point cloud of a finished assembly, in ascending
/// chain-slot order so two assemblies of the same identity can be
/// compared atom-for-atom.
fn world_points(table: &ChainSlotTable, subunits: &[SubunitType], assembly: &SuperBB) -> Vec<Vec3> {
    let mut out = Vec::new();
    for global_id in 0..table.len() {
        let Some(pos) = assembly.members.iter().position(|&m| m == global_id) else {
            continue;
        };
        let slot = table.slot(global_id);
        let bb = &subunits[slot.subunit_type];
        for p in &bb.points {
            out.push(assembly.placements[pos].apply_to_point(p));
        }
    }
    out
}

/// `true` when two assemblies are within `cluster_rmsd` of each other
/// after best-fit superposition. Assemblies whose point clouds are too
/// degenerate to superpose (fewer than 3 backbone atoms total) are
/// never considered equivalent.
fn within_cluster_rmsd(a: &[Vec3], b: &[Vec3], cluster_rmsd: f64) -> bool {
    match superpose(a, b) {
        Ok(t) => rmsd(a, b, &t) <= cluster_rmsd,
        Err(_) => false,
    }
}

/// Greedily clusters `assemblies` (assumed already ranked best first by
/// [`SuperBB::ranking_key`]): each assembly either joins the nearest
/// already-kept cluster representative (and is dropped) or becomes a new
/// representative, until `max_results` representatives are kept or the
/// input is exhausted (spec.md §4.8).
pub fn cluster(
    table: &ChainSlotTable,
    subunits: &[SubunitType],
    assemblies: &[SuperBB],
    cluster_rmsd: f64,
    max_results: usize,
) -> Vec<SuperBB> {
    let mut representatives: Vec<SuperBB> = Vec::new();
    let mut representative_points: Vec<Vec<Vec3>> = Vec::new();

    for candidate in assemblies {
        if representatives.len() >= max_results {
            break;
        }
        let candidate_points = world_points(table, subunits, candidate);
        let already_clustered = representative_points
            .iter()
            .any(|rep_points| within_cluster_rmsd(rep_points, &candidate_points, cluster_rmsd));
        if already_clustered {
            continue;
        }
        representative_points.push(candidate_points);
        representatives.push(candidate.clone());
    }
    representatives
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlgorithmConfig;
    use crate::geometry::Transform;

    fn flat_subunit(name: &str, labels: &[char]) -> SubunitType {
        SubunitType::new(
            name.to_string(),
            labels.to_vec(),
            vec![1, 2, 3, 4],
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(3.0, 0.0, 0.0),
                Vec3::new(0.0, 4.0, 0.0),
                Vec3::new(1.0, 1.0, 1.0),
            ],
            vec![90.0, 90.0, 90.0, 90.0],
            &AlgorithmConfig::default(),
        )
    }

    fn assembly_with_score(table: &ChainSlotTable, global_id: usize, t: Transform, score: f64) -> SuperBB {
        let mut s = SuperBB::singleton(global_id);
        s.placements = vec![t];
        s.score = score;
        let _ = table;
        s
    }

    #[test]
    fn near_duplicate_assemblies_collapse_to_one_cluster() {
        let a = flat_subunit("A", &['0']);
        let table = ChainSlotTable::new(std::slice::from_ref(&a), &[]);
        let subunits = vec![a];

        let best = assembly_with_score(&table, 0, Transform::identity(), 90.0);
        let near_duplicate = assembly_with_score(
            &table,
            0,
            Transform::from_euler_translation(0.0, 0.0, 0.0, Vec3::new(0.01, 0.0, 0.0)),
            85.0,
        );
        let distinct = assembly_with_score(
            &table,
            0,
            Transform::from_euler_translation(0.0, 0.0, 0.0, Vec3::new(50.0, 0.0, 0.0)),
            80.0,
        );

        let clustered = cluster(&table, &subunits, &[best, near_duplicate, distinct], 5.0, 10);
        assert_eq!(clustered.len(), 2);
        assert!((clustered[0].score - 90.0).abs() < 1e-9);
        assert!((clustered[1].score - 80.0).abs() < 1e-9);
    }

    #[test]
    fn max_results_caps_output() {
        let a = flat_subunit("A", &['0']);
        let table = ChainSlotTable::new(std::slice::from_ref(&a), &[]);
        let subunits = vec![a];

        let assemblies: Vec<SuperBB> = (0..5)
            .map(|i| {
                assembly_with_score(
                    &table,
                    0,
                    Transform::from_euler_translation(0.0, 0.0, 0.0, Vec3::new(100.0 * i as f64, 0.0, 0.0)),
                    100.0 - i as f64,
                )
            })
            .collect();

        let clustered = cluster(&table, &subunits, &assemblies, 5.0, 2);
        assert_eq!(clustered.len(), 2);
    }
}
