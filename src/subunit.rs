//! The subunit model (spec.md §3 "SubunitType", §4.2 "BB and spatial
//! grid") and the fixed enumeration of chain slots it implies.

use crate::bitset::{ChainSet, MAX_CHAIN_SLOTS};
use crate::config::AlgorithmConfig;
use crate::geometry::{Transform, Vec3};
use crate::grid::SpatialGrid;

/// A residue number, as it appears in the structure file (not
/// necessarily contiguous or zero-based).
pub type ResidueNumber = i64;

/// A single subunit type: its backbone point cloud, collision grid, and
/// per-atom confidence. Built once at load, immutable thereafter.
#[derive(Debug, Clone)]
pub struct SubunitType {
    pub name: String,
    /// One label per interchangeable copy; `chain_labels.len()` is the
    /// multiplicity.
    pub chain_labels: Vec<char>,
    /// Residue order matches `points`/`confidence` order (invariant).
    pub residues: Vec<ResidueNumber>,
    pub points: Vec<Vec3>,
    /// Per-point confidence in `[0, 100]` (B-factor style).
    pub confidence: Vec<f64>,
    pub bounding_radius: f64,
    grid: SpatialGrid,
}

impl SubunitType {
    /// Builds a `SubunitType`, computing its bounding radius and spatial
    /// grid from `points`.
    ///
    /// # Panics
    /// Panics if `residues`, `points` and `confidence` do not all have
    /// the same length (the residue-order invariant of spec.md §3), or if
    /// `chain_labels` is empty.
    pub fn new(
        name: String,
        chain_labels: Vec<char>,
        residues: Vec<ResidueNumber>,
        points: Vec<Vec3>,
        confidence: Vec<f64>,
        config: &AlgorithmConfig,
    ) -> Self {
        assert!(!chain_labels.is_empty(), "a subunit type needs at least one chain");
        assert_eq!(residues.len(), points.len(), "residue/point count mismatch");
        assert_eq!(points.len(), confidence.len(), "point/confidence count mismatch");

        let centroid = if points.is_empty() {
            Vec3::zeros()
        } else {
            points.iter().fold(Vec3::zeros(), |acc, p| acc + p) / points.len() as f64
        };
        let bounding_radius = points
            .iter()
            .map(|p| (p - centroid).norm())
            .fold(0.0_f64, f64::max);
        let grid = SpatialGrid::build(&points, config.grid_resolution);

        SubunitType {
            name,
            chain_labels,
            residues,
            points,
            confidence,
            bounding_radius,
            grid,
        }
    }

    pub fn multiplicity(&self) -> usize {
        self.chain_labels.len()
    }

    /// Index of `residue` in this subunit's residue/point arrays, if any.
    pub fn residue_index(&self, residue: ResidueNumber) -> Option<usize> {
        self.residues.iter().position(|&r| r == residue)
    }

    /// Counts points of `other` (transformed by `other_to_self`) that land
    /// within `config.grid_resolution` of one of this BB's own points,
    /// where both the other point and the matched own point have
    /// confidence `>= confidence_threshold` (spec.md §4.2).
    pub fn collision_count(
        &self,
        other: &SubunitType,
        other_to_self: &Transform,
        confidence_threshold: f64,
        config: &AlgorithmConfig,
    ) -> usize {
        let r = config.grid_resolution;
        let r2 = r * r;
        let mut count = 0;
        for (p, &conf) in other.points.iter().zip(&other.confidence) {
            if conf < confidence_threshold {
                continue;
            }
            let q = other_to_self.apply_to_point(p);
            let hit = self.grid.candidates_near(&q).any(|i| {
                let i = i as usize;
                self.confidence[i] >= confidence_threshold
                    && (self.points[i] - q).norm_squared() <= r2
            });
            if hit {
                count += 1;
            }
        }
        count
    }

    /// Number of this BB's own atoms with confidence `>= threshold`
    /// (the denominator of the per-chain collision ratio, spec.md §4.4).
    pub fn atoms_above_threshold(&self, confidence_threshold: f64) -> usize {
        self.confidence.iter().filter(|&&c| c >= confidence_threshold).count()
    }

    /// Maximum signed penetration depth (Å) of any atom of `other`
    /// (transformed by `other_to_self`) inside one of this BB's own atom
    /// spheres, using a unified backbone atom radius (spec.md §4.2, §9
    /// open question). Positive means overlap; returns a very negative
    /// sentinel when no candidate pair is found.
    pub fn max_penetration_depth(
        &self,
        other: &SubunitType,
        other_to_self: &Transform,
        confidence_threshold: f64,
        config: &AlgorithmConfig,
    ) -> f64 {
        let diameter = 2.0 * config.backbone_atom_radius;
        let mut max_depth = f64::NEG_INFINITY;
        for (p, &conf) in other.points.iter().zip(&other.confidence) {
            if conf < confidence_threshold {
                continue;
            }
            let q = other_to_self.apply_to_point(p);
            for i in self.grid.candidates_near(&q) {
                let i = i as usize;
                if self.confidence[i] < confidence_threshold {
                    continue;
                }
                let distance = (self.points[i] - q).norm();
                let depth = diameter - distance;
                if depth > max_depth {
                    max_depth = depth;
                }
            }
        }
        max_depth
    }
}

/// A logical position in the final assembly: one copy of one subunit
/// type, identified by a stable global integer id in `[0, N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainSlot {
    pub subunit_type: usize,
    pub copy_index: usize,
    pub global_id: usize,
    pub label: char,
    /// Optional partition tag from `chain.list` (spec.md §6), used only
    /// to bias the folder's first split (spec.md §6 / SPEC_FULL.md).
    pub group: Option<i64>,
}

/// The fixed enumeration of every chain slot in the complex, built once
/// from the ordered list of subunit types.
#[derive(Debug, Clone)]
pub struct ChainSlotTable {
    slots: Vec<ChainSlot>,
}

impl ChainSlotTable {
    /// Builds the table, assigning global ids in the order subunit types
    /// (and their copies) are given.
    ///
    /// # Panics
    /// Panics if the total chain count exceeds [`MAX_CHAIN_SLOTS`].
    pub fn new(subunits: &[SubunitType], groups: &[Vec<Option<i64>>]) -> Self {
        let mut slots = Vec::new();
        let mut global_id = 0;
        for (type_idx, subunit) in subunits.iter().enumerate() {
            for (copy_index, &label) in subunit.chain_labels.iter().enumerate() {
                assert!(global_id < MAX_CHAIN_SLOTS, "too many chain slots for a single run");
                slots.push(ChainSlot {
                    subunit_type: type_idx,
                    copy_index,
                    global_id,
                    label,
                    group: groups.get(type_idx).and_then(|g| g.get(copy_index)).copied().flatten(),
                });
                global_id += 1;
            }
        }
        ChainSlotTable { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[ChainSlot] {
        &self.slots
    }

    pub fn slot(&self, global_id: usize) -> &ChainSlot {
        &self.slots[global_id]
    }

    pub fn slot_by_label(&self, label: char) -> Option<&ChainSlot> {
        self.slots.iter().find(|s| s.label == label)
    }

    /// The full identity: every chain slot of the complex.
    pub fn full_identity(&self) -> ChainSet {
        (0..self.slots.len()).collect()
    }
}
