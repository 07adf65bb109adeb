//! The spatial collision index (spec.md §4.2): a uniform 3-D bucket hash
//! of a BB's backbone points, used for the backbone-collision and
//! penetration-depth queries.

use crate::geometry::Vec3;
use std::collections::HashMap;

type CellKey = (i64, i64, i64);

/// A uniform bucket hash over a fixed point cloud. Built once at load time
/// from a [`crate::subunit::SubunitType`]'s backbone points and never
/// mutated afterwards; queries only read it, so it is safe to share across
/// worker threads (spec.md §4.2, "pure read operations; multiple threads
/// may query simultaneously").
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f64,
    buckets: HashMap<CellKey, Vec<u32>>,
}

fn cell_key(p: &Vec3, cell_size: f64) -> CellKey {
    (
        (p.x / cell_size).floor() as i64,
        (p.y / cell_size).floor() as i64,
        (p.z / cell_size).floor() as i64,
    )
}

impl SpatialGrid {
    pub fn build(points: &[Vec3], cell_size: f64) -> Self {
        let mut buckets: HashMap<CellKey, Vec<u32>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            buckets.entry(cell_key(p, cell_size)).or_default().push(i as u32);
        }
        SpatialGrid { cell_size, buckets }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Indices of own points that may be within `radius` of `query`
    /// (radius must not exceed the grid's cell size; candidates from the
    /// 3x3x3 neighborhood of buckets around `query` are returned, an
    /// over-approximation the caller filters with an exact distance
    /// check).
    pub fn candidates_near<'a>(&'a self, query: &Vec3) -> impl Iterator<Item = u32> + 'a {
        let (cx, cy, cz) = cell_key(query, self.cell_size);
        (-1..=1).flat_map(move |dx| {
            (-1..=1).flat_map(move |dy| {
                (-1..=1).flat_map(move |dz| {
                    self.buckets
                        .get(&(cx + dx, cy + dy, cz + dz))
                        .into_iter()
                        .flatten()
                        .copied()
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64, f64)]) -> Vec<Vec3> {
        coords.iter().map(|&(x, y, z)| Vec3::new(x, y, z)).collect()
    }

    #[test]
    fn finds_nearby_points_across_bucket_boundaries() {
        let points = pts(&[(0.0, 0.0, 0.0), (3.4, 0.0, 0.0), (100.0, 100.0, 100.0)]);
        let grid = SpatialGrid::build(&points, 3.5);

        let query = Vec3::new(3.6, 0.0, 0.0);
        let candidates: Vec<u32> = grid.candidates_near(&query).collect();
        assert!(candidates.contains(&0));
        assert!(candidates.contains(&1));
        assert!(!candidates.contains(&2));
    }

    #[test]
    fn empty_grid_has_no_candidates() {
        let grid = SpatialGrid::build(&[], 3.5);
        assert_eq!(grid.candidates_near(&Vec3::zeros()).count(), 0);
    }
}
