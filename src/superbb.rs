//! The incremental assembly state (spec.md §3 "SuperBB", §4.3 "Assembly
//! composition").

use crate::bitset::ChainSet;
use crate::config::{AlgorithmConfig, PolicyConfig};
use crate::error::ComposeError;
use crate::geometry::{Transform, Vec3};
use crate::restraints::{ConstraintState, RestraintSet};
use crate::subunit::{ChainSlotTable, SubunitType};
use crate::transform_pool::PairTransform;

/// A bonus weight applied to the fraction of satisfied restraints when
/// folding it into the composite score (spec.md §4.6, `w_xlink`). Kept as
/// a named constant rather than a CLI flag: a fixed weighting, distinct
/// from the rejection threshold `restraintsRatio`.
pub const CONSTRAINT_BONUS_WEIGHT: f64 = 10.0;

/// An immutable partial (or complete) assembly: which chain slots it
/// places, their world-frame transforms, and the cached score/constraint
/// bookkeeping needed to extend or rank it.
#[derive(Debug, Clone)]
pub struct SuperBB {
    pub members: Vec<usize>,
    pub placements: Vec<Transform>,
    pub identity: ChainSet,
    pub score: f64,
    pub trans_used_count: u32,
    pub constraint_state: ConstraintState,
    trans_score_sum: f64,
}

impl SuperBB {
    /// A singleton `SuperBB` placing a single chain slot at the identity
    /// transform (spec.md §4.7 initialization).
    pub fn singleton(global_id: usize) -> Self {
        SuperBB {
            members: vec![global_id],
            placements: vec![Transform::identity()],
            identity: ChainSet::singleton(global_id),
            score: 0.0,
            trans_used_count: 0,
            constraint_state: ConstraintState::default(),
            trans_score_sum: 0.0,
        }
    }

    fn world_transform_at(&self, global_id: usize) -> Transform {
        let idx = self
            .members
            .iter()
            .position(|&m| m == global_id)
            .expect("world_transform_at: global_id must be a member");
        self.placements[idx]
    }

    /// Resolves the world-space coordinate of `subunits[...].points[point_index]`
    /// placed at chain slot `global_id`, used for restraint evaluation.
    pub fn world_point(
        &self,
        table: &ChainSlotTable,
        subunits: &[SubunitType],
        global_id: usize,
        point_index: usize,
    ) -> Vec3 {
        let slot = table.slot(global_id);
        let local = subunits[slot.subunit_type].points[point_index];
        self.world_transform_at(global_id).apply_to_point(&local)
    }

    /// Composes `self` (as `A`) with `other` (as `B`) through the
    /// connector pair transform `p`, relating `connector_a` (a member of
    /// `self`) to `connector_b` (a member of `other`) (spec.md §4.3).
    #[allow(clippy::too_many_arguments)]
    pub fn compose(
        &self,
        other: &SuperBB,
        p: &PairTransform,
        connector_a: usize,
        connector_b: usize,
        table: &ChainSlotTable,
        subunits: &[SubunitType],
        restraints: &RestraintSet,
        algo_config: &AlgorithmConfig,
        policy: &PolicyConfig,
    ) -> Result<SuperBB, ComposeError> {
        if !self.identity.is_disjoint(&other.identity) {
            return Err(ComposeError::IncompatibleOverlap);
        }

        let slot_a = table.slot(connector_a);
        let slot_b = table.slot(connector_b);
        let pair_transform = p
            .transform_from_to(&subunits[slot_a.subunit_type].name, &subunits[slot_b.subunit_type].name)
            .expect("caller must pass a PairTransform matching the connector's subunit types");

        let t_world_a = self.world_transform_at(connector_a);
        let t_local_b = other.world_transform_at(connector_b);
        let align = t_world_a.compose(&pair_transform).compose(&t_local_b.inverse());

        let mut members = self.members.clone();
        let mut placements = self.placements.clone();
        for (&m, t) in other.members.iter().zip(&other.placements) {
            members.push(m);
            placements.push(align.compose(t));
        }
        let identity = self.identity.union(&other.identity);

        check_no_duplicate_placements(table, &members, &placements, algo_config.grid_resolution)?;

        check_collisions(table, subunits, &members, &placements, policy, algo_config)?;

        let constraint_state = restraints.evaluate(table, subunits, identity, |slot, idx| {
            let pos = members.iter().position(|&m| m == slot).expect("member of identity must be placed");
            let local = subunits[table.slot(slot).subunit_type].points[idx];
            placements[pos].apply_to_point(&local)
        });
        if constraint_state.violation_ratio() > policy.restraints_ratio {
            return Err(ComposeError::ConstraintViolation);
        }

        let trans_score_sum = self.trans_score_sum + other.trans_score_sum + p.score;
        let trans_used_count = self.trans_used_count + other.trans_used_count + 1;
        let weighted_trans_score = trans_score_sum / trans_used_count as f64;

        let total_weight = restraints.total_weight();
        let constraint_bonus = if total_weight > 0.0 {
            constraint_state.satisfaction_fraction(total_weight) * CONSTRAINT_BONUS_WEIGHT
        } else {
            0.0
        };

        Ok(SuperBB {
            members,
            placements,
            identity,
            score: weighted_trans_score + constraint_bonus,
            trans_used_count,
            constraint_state,
            trans_score_sum,
        })
    }

    /// The transform-only term of `score` (spec.md §4.6): the weighted
    /// mean of every pair-transform score consumed along this assembly's
    /// composition history, without the constraint bonus.
    pub fn weighted_trans_score(&self) -> f64 {
        if self.trans_used_count == 0 {
            0.0
        } else {
            self.trans_score_sum / self.trans_used_count as f64
        }
    }

    /// Total order used to break ties when ranking SuperBBs (spec.md
    /// §4.6, §5): by score descending, then by `trans_used_count`
    /// descending, then by lexicographically smaller `identity`.
    pub fn ranking_key(&self) -> (OrderedF64, std::cmp::Reverse<u32>, ChainSet) {
        (OrderedF64(self.score), std::cmp::Reverse(self.trans_used_count), self.identity)
    }
}

/// A thin wrapper making `f64` usable as a heap/sort key. Scores are
/// always finite (sums of finite, bounded inputs), so `partial_cmp` never
/// returns `None` in practice; ties fall back to `Equal` rather than
/// panicking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderedF64(pub f64);

impl Eq for OrderedF64 {}

impl PartialOrd for OrderedF64 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedF64 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(std::cmp::Ordering::Equal)
    }
}

fn check_no_duplicate_placements(
    table: &ChainSlotTable,
    members: &[usize],
    placements: &[Transform],
    epsilon: f64,
) -> Result<(), ComposeError> {
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            let si = table.slot(members[i]);
            let sj = table.slot(members[j]);
            if si.subunit_type != sj.subunit_type {
                continue;
            }
            let d = (placements[i].translation - placements[j].translation).norm();
            if d < epsilon {
                return Err(ComposeError::DuplicatePlacement);
            }
        }
    }
    Ok(())
}

fn check_collisions(
    table: &ChainSlotTable,
    subunits: &[SubunitType],
    members: &[usize],
    placements: &[Transform],
    policy: &PolicyConfig,
    algo_config: &AlgorithmConfig,
) -> Result<(), ComposeError> {
    let n = members.len();
    let mut collided = vec![0usize; n];

    for i in 0..n {
        let slot_i = table.slot(members[i]);
        let bb_i = &subunits[slot_i.subunit_type];
        for j in 0..n {
            if i == j {
                continue;
            }
            let slot_j = table.slot(members[j]);
            let bb_j = &subunits[slot_j.subunit_type];

            let center_distance = (placements[i].translation - placements[j].translation).norm();
            if center_distance > bb_i.bounding_radius + bb_j.bounding_radius + algo_config.grid_margins {
                continue;
            }

            // j expressed in i's local frame: placements[i]^-1 . placements[j]
            let j_to_i = placements[i].inverse().compose(&placements[j]);

            let depth = bb_i.max_penetration_depth(
                bb_j,
                &j_to_i,
                policy.min_temperature_to_consider_collision,
                algo_config,
            );
            if depth > policy.penetration_thr {
                return Err(ComposeError::CollisionLimitExceeded);
            }

            collided[i] += bb_i.collision_count(
                bb_j,
                &j_to_i,
                policy.min_temperature_to_consider_collision,
                algo_config,
            );
        }
    }

    for (i, &count) in collided.iter().enumerate() {
        let slot_i = table.slot(members[i]);
        let bb_i = &subunits[slot_i.subunit_type];
        let total = bb_i.atoms_above_threshold(policy.min_temperature_to_consider_collision).max(1);
        if count as f64 / total as f64 > policy.max_backbone_collision_per_chain {
            return Err(ComposeError::CollisionLimitExceeded);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;
    use crate::transform_pool::PairTransform;

    fn flat_subunit(name: &str, labels: &[char]) -> SubunitType {
        SubunitType::new(
            name.to_string(),
            labels.to_vec(),
            vec![1, 2, 3],
            vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, 4.0, 0.0)],
            vec![90.0, 90.0, 90.0],
            &AlgorithmConfig::default(),
        )
    }

    fn setup() -> (ChainSlotTable, Vec<SubunitType>, AlgorithmConfig, PolicyConfig, RestraintSet) {
        let subunit = flat_subunit("A", &['0', '1']);
        let table = ChainSlotTable::new(std::slice::from_ref(&subunit), &[]);
        (table, vec![subunit], AlgorithmConfig::default(), PolicyConfig::default(), RestraintSet::default())
    }

    #[test]
    fn compose_two_singletons_far_apart_succeeds() {
        let (table, subunits, algo, policy, restraints) = setup();
        let a = SuperBB::singleton(0);
        let b = SuperBB::singleton(1);
        let p = PairTransform {
            from: "A".to_string(),
            to: "A".to_string(),
            transform: Transform::from_euler_translation(0.0, 0.0, 0.0, Vec3::new(0.0, 0.0, 20.0)),
            score: 90.0,
            provenance: "s1".to_string(),
        };
        let c = a.compose(&b, &p, 0, 1, &table, &subunits, &restraints, &algo, &policy).unwrap();
        assert_eq!(c.identity.popcount(), 2);
        assert!((c.score - 90.0).abs() < 1e-9);
        assert_eq!(c.trans_used_count, 1);
    }

    #[test]
    fn compose_rejects_overlapping_identity() {
        let (table, subunits, algo, policy, restraints) = setup();
        let a = SuperBB::singleton(0);
        let p = PairTransform {
            from: "A".to_string(),
            to: "A".to_string(),
            transform: Transform::identity(),
            score: 50.0,
            provenance: "s".to_string(),
        };
        let err = a.compose(&a, &p, 0, 0, &table, &subunits, &restraints, &algo, &policy).unwrap_err();
        assert_eq!(err, ComposeError::IncompatibleOverlap);
    }

    #[test]
    fn compose_rejects_collision_when_too_close() {
        let (table, subunits, algo, policy, restraints) = setup();
        let a = SuperBB::singleton(0);
        let b = SuperBB::singleton(1);
        let p = PairTransform {
            from: "A".to_string(),
            to: "A".to_string(),
            transform: Transform::from_euler_translation(0.0, 0.0, 0.0, Vec3::new(0.0, 0.0, 1.0)),
            score: 90.0,
            provenance: "s2".to_string(),
        };
        let err = a.compose(&b, &p, 0, 1, &table, &subunits, &restraints, &algo, &policy).unwrap_err();
        assert_eq!(err, ComposeError::CollisionLimitExceeded);
    }
}
