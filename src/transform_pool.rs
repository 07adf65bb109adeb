//! The transform pool (spec.md §3 "PairTransform", "TransformIndex"): the
//! full set of candidate pair transforms, indexed by the unordered pair
//! of subunit types they relate.

use crate::geometry::Transform;
use std::collections::HashMap;

/// A candidate placement of one chain slot of type `to` relative to one
/// chain slot of type `from`.
#[derive(Debug, Clone)]
pub struct PairTransform {
    pub from: String,
    pub to: String,
    /// Rigid transform in `from`'s local frame sending `to`'s local frame
    /// into place.
    pub transform: Transform,
    /// Confidence score in `[0, 100]`.
    pub score: f64,
    pub provenance: String,
}

impl PairTransform {
    /// The transform that sends `to`'s frame into `from`'s frame, given
    /// the subunit types at the two ends of a connector pair. Returns
    /// `None` if neither orientation matches.
    pub fn transform_from_to(&self, from: &str, to: &str) -> Option<Transform> {
        if self.from == from && self.to == to {
            Some(self.transform)
        } else if self.from == to && self.to == from {
            Some(self.transform.inverse())
        } else {
            None
        }
    }
}

fn unordered_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// A symmetric mapping from unordered `{A, B}` subunit-type pairs to an
/// ordered list of [`PairTransform`]s, sorted by score descending and
/// capped to a user-supplied number per pair. Read-only after load.
#[derive(Debug, Clone, Default)]
pub struct TransformIndex {
    by_pair: HashMap<(String, String), Vec<PairTransform>>,
}

impl TransformIndex {
    pub fn new() -> Self {
        TransformIndex::default()
    }

    /// Inserts `transforms` for the unordered pair `(a, b)`. Transforms
    /// are stored sorted by descending score and truncated to
    /// `cap_per_pair`.
    pub fn insert_pair(&mut self, a: &str, b: &str, mut transforms: Vec<PairTransform>, cap_per_pair: usize) {
        transforms.sort_by(|x, y| y.score.partial_cmp(&x.score).unwrap_or(std::cmp::Ordering::Equal));
        transforms.truncate(cap_per_pair);
        self.by_pair.insert(unordered_key(a, b), transforms);
    }

    /// All transforms registered for the unordered pair `{a, b}`, best
    /// first, capped to `limit`.
    pub fn transforms_for(&self, a: &str, b: &str, limit: usize) -> &[PairTransform] {
        match self.by_pair.get(&unordered_key(a, b)) {
            Some(v) => &v[..v.len().min(limit)],
            None => &[],
        }
    }

    pub fn has_pair(&self, a: &str, b: &str) -> bool {
        self.by_pair
            .get(&unordered_key(a, b))
            .is_some_and(|v| !v.is_empty())
    }

    /// Number of transforms stored for `{a, b}`; used by the folder's
    /// connector-pair heuristic to pick the "richest" entry (design
    /// note 9).
    pub fn richness(&self, a: &str, b: &str) -> usize {
        self.by_pair.get(&unordered_key(a, b)).map_or(0, Vec::len)
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_pair.keys().map(|(a, b)| (a.as_str(), b.as_str()))
    }
}
