//! The hierarchical combinatorial folder (spec.md §4.7): the top-level
//! dynamic program that grows `SuperBB`s one size band at a time,
//! bounded by a best-K beam at every step.
//!
//! Concurrency (spec.md §5): each size band enumerates a flat list of
//! `(B_A, B_B, P, A, B)` candidate tuples up front, then hands them to
//! `rayon`'s global thread pool as a single parallel iterator — the
//! job queue is rayon's work-stealing queue, and the
//! "per-identity heap protected by a mutex keyed on the identity bitset"
//! is `IdentityHeap` below, stored in a sharded `HashMap`. The band
//! boundary where `bySize[size]` is computed from `byIdentity` is the
//! barrier: it only runs after the parallel iterator over the band's
//! tuples has fully drained.

use crate::bitset::ChainSet;
use crate::config::{AlgorithmConfig, PolicyConfig};
use crate::restraints::RestraintSet;
use crate::subunit::{ChainSlotTable, SubunitType};
use crate::superbb::SuperBB;
use crate::transform_pool::TransformIndex;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info_span, warn};

/// Tunables bounding the search beam (spec.md §4.7).
#[derive(Debug, Clone, Copy)]
pub struct FolderConfig {
    pub best_k: usize,
    pub max_result_per_res_set: usize,
    pub trans_num_per_pair: usize,
}

/// Per-band bookkeeping surfaced in `<prefix>.log` (SPEC_FULL.md ambient
/// logging section).
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    pub bands: Vec<BandStats>,
}

#[derive(Debug, Clone, Default)]
pub struct BandStats {
    pub size: usize,
    pub candidates_attempted: u64,
    pub incompatible_overlap: u64,
    pub duplicate_placement: u64,
    pub collision_rejected: u64,
    pub constraint_rejected: u64,
    pub survivors: usize,
    pub best_score: Option<f64>,
    pub elapsed: Duration,
}

/// Outcome of a full run of the folder.
#[derive(Debug, Clone, Default)]
pub struct FolderOutcome {
    /// The final whole-complex placements, best first, before clustering.
    pub survivors: Vec<SuperBB>,
    /// Subunit-type names that the graph gate (§4.7) found unreachable
    /// from the rest of the complex.
    pub unreachable: Vec<String>,
    pub timed_out: bool,
    pub stats: SearchStats,
}

/// A fixed-capacity max structure over `SuperBB`, mutex-protected so many
/// worker threads can insert concurrently (spec.md §5, §9 "Best-K heap").
struct IdentityHeap {
    capacity: usize,
    items: Mutex<Vec<SuperBB>>,
}

impl IdentityHeap {
    fn new(capacity: usize) -> Self {
        IdentityHeap {
            capacity,
            items: Mutex::new(Vec::new()),
        }
    }

    fn insert(&self, candidate: SuperBB) {
        let mut items = self.items.lock().unwrap();
        let pos = items
            .binary_search_by(|item| candidate.ranking_key().cmp(&item.ranking_key()))
            .unwrap_or_else(|e| e);
        items.insert(pos, candidate);
        items.truncate(self.capacity);
    }

    fn snapshot(&self) -> Vec<SuperBB> {
        self.items.lock().unwrap().clone()
    }
}

/// Builds the undirected subunit-type graph implied by the transform
/// index and reports which type names are unreachable from the rest
/// (spec.md §4.7 "Graph connectivity gate").
fn unreachable_subunit_types(type_names: &[String], transforms: &TransformIndex) -> Vec<String> {
    if type_names.len() <= 1 {
        return Vec::new();
    }
    let mut parent: Vec<usize> = (0..type_names.len()).collect();
    fn find(parent: &mut [usize], x: usize) -> usize {
        if parent[x] != x {
            parent[x] = find(parent, parent[x]);
        }
        parent[x]
    }
    for i in 0..type_names.len() {
        for j in (i + 1)..type_names.len() {
            if transforms.has_pair(&type_names[i], &type_names[j]) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[ri] = rj;
                }
            }
        }
    }
    let roots: Vec<usize> = (0..type_names.len()).map(|i| find(&mut parent, i)).collect();
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for &r in &roots {
        match counts.iter_mut().find(|(root, _)| *root == r) {
            Some((_, count)) => *count += 1,
            None => counts.push((r, 1)),
        }
    }
    // Ties broken by order of first appearance, so the result is
    // deterministic and biased toward the component containing the
    // first-listed subunit type.
    let mut largest_root = counts[0].0;
    let mut largest_count = counts[0].1;
    for &(root, count) in &counts[1..] {
        if count > largest_count {
            largest_root = root;
            largest_count = count;
        }
    }
    type_names
        .iter()
        .zip(&roots)
        .filter(|(_, &r)| r != largest_root)
        .map(|(name, _)| name.clone())
        .collect()
}

/// Richest connector pair between two groups of chain slots: the
/// subunit-type pair (one present in `a`, one in `b`) with the most
/// transforms on file, and one representative chain slot of each
/// (spec.md §4.7 step 3, design note 9 "pick the richest entry").
fn richest_connector(
    a: ChainSet,
    b: ChainSet,
    table: &ChainSlotTable,
    subunits: &[SubunitType],
    transforms: &TransformIndex,
) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, usize)> = None; // (richness, slot_a, slot_b)
    for slot_a in a.iter() {
        let name_a = &subunits[table.slot(slot_a).subunit_type].name;
        for slot_b in b.iter() {
            let name_b = &subunits[table.slot(slot_b).subunit_type].name;
            let richness = transforms.richness(name_a, name_b);
            if richness == 0 {
                continue;
            }
            let better = match best {
                Some((r, _, _)) => richness > r,
                None => true,
            };
            if better {
                best = Some((richness, slot_a, slot_b));
            }
        }
    }
    best.map(|(_, sa, sb)| (sa, sb))
}

/// The hierarchical folder. Holds references to every immutable input
/// (spec.md §3 lifecycle: "SubunitType, PairTransform, TransformIndex,
/// Restraints — constructed at input load, immutable thereafter").
pub struct Folder<'a> {
    pub table: &'a ChainSlotTable,
    pub subunits: &'a [SubunitType],
    pub transforms: &'a TransformIndex,
    pub restraints: &'a RestraintSet,
    pub algo_config: &'a AlgorithmConfig,
    pub policy: &'a PolicyConfig,
    pub folder_config: &'a FolderConfig,
}

impl<'a> Folder<'a> {
    pub fn run(&self, timeout: Option<Duration>) -> FolderOutcome {
        let n = self.table.len();
        let type_names: Vec<String> = self.subunits.iter().map(|s| s.name.clone()).collect();
        let unreachable = unreachable_subunit_types(&type_names, self.transforms);
        if !unreachable.is_empty() {
            warn!(?unreachable, "subunit types unreachable from the rest of the complex");
        }

        let start = Instant::now();
        let cancelled = AtomicBool::new(false);

        let mut by_identity: HashMap<ChainSet, IdentityHeap> = HashMap::new();
        let mut by_size: HashMap<usize, Vec<ChainSet>> = HashMap::new();

        let mut size1 = Vec::new();
        for slot in self.table.slots() {
            let singleton = SuperBB::singleton(slot.global_id);
            let identity = singleton.identity;
            by_identity
                .entry(identity)
                .or_insert_with(|| IdentityHeap::new(self.folder_config.max_result_per_res_set))
                .insert(singleton);
            size1.push(identity);
        }
        by_size.insert(1, size1);

        let mut stats = SearchStats::default();
        let group_split = self.group_first_split();

        for size in 2..=n {
            if timeout.is_some_and(|t| start.elapsed() > t) {
                cancelled.store(true, Ordering::Relaxed);
                warn!(size, "search timed out; flushing partial results");
                break;
            }

            let span = info_span!("band", size);
            let _enter = span.enter();
            let band_start = Instant::now();

            let splits = self.splits_for(size, n, group_split.as_ref());

            let mut jobs: Vec<(ChainSet, ChainSet, usize, usize)> = Vec::new();
            for (a, b) in &splits {
                let identities_a = by_size.get(a).cloned().unwrap_or_default();
                let identities_b = by_size.get(b).cloned().unwrap_or_default();
                for &ba in &identities_a {
                    for &bb in &identities_b {
                        if a == b && ba >= bb {
                            continue;
                        }
                        if !ba.is_disjoint(&bb) || ba.union(&bb).popcount() as usize != size {
                            continue;
                        }
                        let Some((connector_a, connector_b)) =
                            richest_connector(ba, bb, self.table, self.subunits, self.transforms)
                        else {
                            continue;
                        };
                        jobs.push((ba, bb, connector_a, connector_b));
                        by_identity
                            .entry(ba.union(&bb))
                            .or_insert_with(|| IdentityHeap::new(self.folder_config.max_result_per_res_set));
                    }
                }
            }

            let candidates_attempted = AtomicU64::new(0);
            let incompatible_overlap = AtomicU64::new(0);
            let duplicate_placement = AtomicU64::new(0);
            let collision_rejected = AtomicU64::new(0);
            let constraint_rejected = AtomicU64::new(0);

            jobs.par_iter().for_each(|&(ba, bb, connector_a, connector_b)| {
                if cancelled.load(Ordering::Relaxed) {
                    return;
                }
                if timeout.is_some_and(|t| start.elapsed() > t) {
                    cancelled.store(true, Ordering::Relaxed);
                    return;
                }

                let name_a = &self.subunits[self.table.slot(connector_a).subunit_type].name;
                let name_b = &self.subunits[self.table.slot(connector_b).subunit_type].name;
                let transforms = self
                    .transforms
                    .transforms_for(name_a, name_b, self.folder_config.trans_num_per_pair);

                let a_items = by_identity[&ba].snapshot();
                let b_items = by_identity[&bb].snapshot();
                let union_identity = ba.union(&bb);

                for p in transforms {
                    for a_item in &a_items {
                        for b_item in &b_items {
                            candidates_attempted.fetch_add(1, Ordering::Relaxed);
                            match a_item.compose(
                                b_item,
                                p,
                                connector_a,
                                connector_b,
                                self.table,
                                self.subunits,
                                self.restraints,
                                self.algo_config,
                                self.policy,
                            ) {
                                Ok(composed) => by_identity[&union_identity].insert(composed),
                                Err(crate::error::ComposeError::IncompatibleOverlap) => {
                                    incompatible_overlap.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(crate::error::ComposeError::DuplicatePlacement) => {
                                    duplicate_placement.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(crate::error::ComposeError::CollisionLimitExceeded) => {
                                    collision_rejected.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(crate::error::ComposeError::ConstraintViolation) => {
                                    constraint_rejected.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                        }
                    }
                }
            });

            // Barrier: aggregate survivors of this band's identities into
            // the global top-bestK (spec.md §4.7 step 5).
            let mut ranked: Vec<(ChainSet, SuperBB)> = Vec::new();
            for identity in by_identity.keys().copied().collect::<Vec<_>>() {
                if identity.popcount() as usize != size {
                    continue;
                }
                for item in by_identity[&identity].snapshot() {
                    ranked.push((identity, item));
                }
            }
            ranked.sort_by(|(_, x), (_, y)| y.ranking_key().cmp(&x.ranking_key()));
            ranked.truncate(self.folder_config.best_k);

            let survivors: HashSet<ChainSet> = ranked.iter().map(|(id, _)| *id).collect();
            let best_score = ranked.first().map(|(_, item)| item.score);
            by_size.insert(size, survivors.iter().copied().collect());

            let band_stats = BandStats {
                size,
                candidates_attempted: candidates_attempted.load(Ordering::Relaxed),
                incompatible_overlap: incompatible_overlap.load(Ordering::Relaxed),
                duplicate_placement: duplicate_placement.load(Ordering::Relaxed),
                collision_rejected: collision_rejected.load(Ordering::Relaxed),
                constraint_rejected: constraint_rejected.load(Ordering::Relaxed),
                survivors: survivors.len(),
                best_score,
                elapsed: band_start.elapsed(),
            };
            debug!(?band_stats, "band complete");
            stats.bands.push(band_stats);

            if survivors.is_empty() {
                break;
            }
        }

        let survivors = by_size
            .get(&n)
            .into_iter()
            .flatten()
            .flat_map(|identity| by_identity[identity].snapshot())
            .collect::<Vec<_>>();
        let mut survivors = survivors;
        survivors.sort_by(|x, y| y.ranking_key().cmp(&x.ranking_key()));

        FolderOutcome {
            survivors,
            unreachable,
            timed_out: cancelled.load(Ordering::Relaxed),
            stats,
        }
    }

    /// Every `(a, b)` split with `a + b = size`, `a <= b` (spec.md §4.7
    /// step 1), unless `size` is the full complex and every chain slot
    /// carries a group tag, in which case the outermost split is pinned
    /// to separate group 0 from group 1 (SPEC_FULL.md SUPPLEMENT).
    fn splits_for(&self, size: usize, n: usize, group_split: Option<&(usize, usize)>) -> Vec<(usize, usize)> {
        if size == n {
            if let Some(&(a, b)) = group_split {
                if a + b == size {
                    return vec![(a, b)];
                }
            }
        }
        (1..=size / 2).map(|a| (a, size - a)).collect()
    }

    /// The `(group_0_size, group_1_size)` pair, if every chain slot has a
    /// group tag and both groups are non-empty.
    fn group_first_split(&self) -> Option<(usize, usize)> {
        let groups: Vec<Option<i64>> = self.table.slots().iter().map(|s| s.group).collect();
        if groups.iter().any(Option::is_none) {
            return None;
        }
        let mut tags: Vec<i64> = groups.into_iter().flatten().collect();
        tags.sort_unstable();
        tags.dedup();
        if tags.len() != 2 {
            return None;
        }
        let group0 = self.table.slots().iter().filter(|s| s.group == Some(tags[0])).count();
        let group1 = self.table.slots().iter().filter(|s| s.group == Some(tags[1])).count();
        Some((group0.min(group1), group0.max(group1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Transform, Vec3};
    use crate::restraints::{ConstraintState, DistanceRestraint, RestraintSet};
    use crate::transform_pool::PairTransform;

    fn subunit(name: &str, labels: &[char]) -> SubunitType {
        SubunitType::new(
            name.to_string(),
            labels.to_vec(),
            vec![1, 2, 3, 10],
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(3.0, 0.0, 0.0),
                Vec3::new(0.0, 4.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
            ],
            vec![90.0, 90.0, 90.0, 90.0],
            &AlgorithmConfig::default(),
        )
    }

    /// S1: two copies of the same subunit, one identity-ish transform.
    #[test]
    fn s1_two_identical_copies() {
        let s = subunit("A", &['0', '1']);
        let table = ChainSlotTable::new(std::slice::from_ref(&s), &[]);
        let mut transforms = TransformIndex::new();
        transforms.insert_pair(
            "A",
            "A",
            vec![PairTransform {
                from: "A".to_string(),
                to: "A".to_string(),
                transform: Transform::from_euler_translation(0.0, 0.0, 0.0, Vec3::new(0.0, 0.0, 20.0)),
                score: 90.0,
                provenance: "s1".to_string(),
            }],
            10,
        );
        let restraints = RestraintSet::default();
        let algo_config = AlgorithmConfig::default();
        let policy = PolicyConfig::default();
        let folder_config = FolderConfig {
            best_k: 10,
            max_result_per_res_set: 10,
            trans_num_per_pair: 10,
        };
        let folder = Folder {
            table: &table,
            subunits: std::slice::from_ref(&s),
            transforms: &transforms,
            restraints: &restraints,
            algo_config: &algo_config,
            policy: &policy,
            folder_config: &folder_config,
        };
        let outcome = folder.run(None);
        assert_eq!(outcome.survivors.len(), 1);
        assert!((outcome.survivors[0].score - 90.0).abs() < 1e-9);
    }

    /// S2: same as S1 but the transform places the copies on top of each
    /// other; the final band must end up empty.
    #[test]
    fn s2_collision_rejects_everything() {
        let s = subunit("A", &['0', '1']);
        let table = ChainSlotTable::new(std::slice::from_ref(&s), &[]);
        let mut transforms = TransformIndex::new();
        transforms.insert_pair(
            "A",
            "A",
            vec![PairTransform {
                from: "A".to_string(),
                to: "A".to_string(),
                transform: Transform::from_euler_translation(0.0, 0.0, 0.0, Vec3::new(0.0, 0.0, 1.0)),
                score: 90.0,
                provenance: "s2".to_string(),
            }],
            10,
        );
        let restraints = RestraintSet::default();
        let algo_config = AlgorithmConfig::default();
        let policy = PolicyConfig::default();
        let folder_config = FolderConfig {
            best_k: 10,
            max_result_per_res_set: 10,
            trans_num_per_pair: 10,
        };
        let folder = Folder {
            table: &table,
            subunits: std::slice::from_ref(&s),
            transforms: &transforms,
            restraints: &restraints,
            algo_config: &algo_config,
            policy: &policy,
            folder_config: &folder_config,
        };
        let outcome = folder.run(None);
        assert!(outcome.survivors.is_empty());
    }

    /// S3: heterotrimer A-B-C via two pair transforms, no direct A-C
    /// entry.
    #[test]
    fn s3_heterotrimer_via_two_pairs() {
        let a = subunit("A", &['0']);
        let b = subunit("B", &['0']);
        let c = subunit("C", &['0']);
        let subunits = vec![a, b, c];
        let table = ChainSlotTable::new(&subunits, &[]);

        let mut transforms = TransformIndex::new();
        transforms.insert_pair(
            "A",
            "B",
            vec![PairTransform {
                from: "A".to_string(),
                to: "B".to_string(),
                transform: Transform::from_euler_translation(0.0, 0.0, 0.0, Vec3::new(0.0, 0.0, 20.0)),
                score: 80.0,
                provenance: "ab".to_string(),
            }],
            10,
        );
        transforms.insert_pair(
            "B",
            "C",
            vec![PairTransform {
                from: "B".to_string(),
                to: "C".to_string(),
                transform: Transform::from_euler_translation(0.0, 0.0, 0.0, Vec3::new(0.0, 0.0, 20.0)),
                score: 70.0,
                provenance: "bc".to_string(),
            }],
            10,
        );

        let restraints = RestraintSet::default();
        let algo_config = AlgorithmConfig::default();
        let policy = PolicyConfig::default();
        let folder_config = FolderConfig {
            best_k: 10,
            max_result_per_res_set: 10,
            trans_num_per_pair: 10,
        };
        let folder = Folder {
            table: &table,
            subunits: &subunits,
            transforms: &transforms,
            restraints: &restraints,
            algo_config: &algo_config,
            policy: &policy,
            folder_config: &folder_config,
        };
        let outcome = folder.run(None);
        assert_eq!(outcome.survivors.len(), 1);
        assert!((outcome.survivors[0].score - 75.0).abs() < 1e-6);
    }

    /// S4: unreachable subunit types are reported and the final band is
    /// empty.
    #[test]
    fn s4_unreachable_subunits() {
        let a = subunit("A", &['0']);
        let b = subunit("B", &['0']);
        let subunits = vec![a, b];
        let table = ChainSlotTable::new(&subunits, &[]);
        let transforms = TransformIndex::new();
        let restraints = RestraintSet::default();
        let algo_config = AlgorithmConfig::default();
        let policy = PolicyConfig::default();
        let folder_config = FolderConfig {
            best_k: 10,
            max_result_per_res_set: 10,
            trans_num_per_pair: 10,
        };
        let folder = Folder {
            table: &table,
            subunits: &subunits,
            transforms: &transforms,
            restraints: &restraints,
            algo_config: &algo_config,
            policy: &policy,
            folder_config: &folder_config,
        };
        let outcome = folder.run(None);
        assert!(outcome.survivors.is_empty());
        assert_eq!(outcome.unreachable, vec!["B".to_string()]);
    }

    /// S5: a crosslink restraint between the two copies that ends up
    /// violated should empty the final band (ratio 1.0 > 0.1).
    #[test]
    fn s5_crosslink_rejection() {
        let s = subunit("A", &['0', '1']);
        let table = ChainSlotTable::new(std::slice::from_ref(&s), &[]);
        let mut transforms = TransformIndex::new();
        transforms.insert_pair(
            "A",
            "A",
            vec![PairTransform {
                from: "A".to_string(),
                to: "A".to_string(),
                transform: Transform::from_euler_translation(0.0, 0.0, 0.0, Vec3::new(0.0, 0.0, 20.0)),
                score: 90.0,
                provenance: "s1".to_string(),
            }],
            10,
        );
        let restraints = RestraintSet::new(vec![DistanceRestraint {
            residue1: 10,
            chain1: '0',
            residue2: 10,
            chain2: '1',
            d_min: 0.0,
            d_max: 5.0,
            weight: 1.0,
        }]);
        let algo_config = AlgorithmConfig::default();
        let policy = PolicyConfig::default();
        let folder_config = FolderConfig {
            best_k: 10,
            max_result_per_res_set: 10,
            trans_num_per_pair: 10,
        };
        let folder = Folder {
            table: &table,
            subunits: std::slice::from_ref(&s),
            transforms: &transforms,
            restraints: &restraints,
            algo_config: &algo_config,
            policy: &policy,
            folder_config: &folder_config,
        };
        let outcome = folder.run(None);
        assert!(outcome.survivors.is_empty());
    }

    #[test]
    fn constraint_state_default_has_zero_violation_ratio() {
        assert_eq!(ConstraintState::default().violation_ratio(), 0.0);
    }
}
