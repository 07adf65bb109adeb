//! Static algorithm constants and CLI-visible policy thresholds (design
//! note: "the numeric knobs appear twice"). Both are immutable once loaded;
//! nothing in the core ever rereads them mid-run.

use std::io::BufRead;

/// Algorithm constants that are not meant to be tuned per-run from the
/// command line: grid cell size, broad-phase margins, and the unified
/// backbone atom radius used for penetration depth (open question in
/// spec.md §9 — calibrated against the default `penetrationThr = -1.0 Å`
/// with a single per-backbone-atom radius rather than a full chemistry
/// table).
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmConfig {
    /// Bucket cell size (Å) of the spatial hash grid, and the collision
    /// radius used by `collision_count`.
    pub grid_resolution: f64,
    /// Extra margin (Å) added to a BB's bounding sphere before the
    /// broad-phase overlap test is attempted.
    pub grid_margins: f64,
    /// Unified backbone atom radius (Å); penetration depth between two
    /// atoms is `2 * backbone_atom_radius - distance`.
    pub backbone_atom_radius: f64,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        AlgorithmConfig {
            grid_resolution: 3.5,
            grid_margins: 5.0,
            backbone_atom_radius: 1.9,
        }
    }
}

impl AlgorithmConfig {
    /// Parses the small `key = value` format used for the static config
    /// file, one assignment per line, `#` comments and blank lines
    /// ignored — the same line-oriented idiom `mesh-io` uses for its own
    /// text formats, kept instead of pulling in a TOML/serde dependency
    /// for a handful of scalars.
    pub fn from_reader<R: BufRead>(r: R) -> Result<Self, String> {
        let mut config = AlgorithmConfig::default();
        for (lineno, line) in r.lines().enumerate() {
            let line = line.map_err(|e| format!("line {}: {}", lineno + 1, e))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| format!("line {}: expected `key = value`", lineno + 1))?;
            let key = key.trim();
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| format!("line {}: invalid number for {:?}", lineno + 1, key))?;
            match key {
                "GRID_RESOLUTION" => config.grid_resolution = value,
                "GRID_MARGINS" => config.grid_margins = value,
                "BACKBONE_ATOM_RADIUS" => config.backbone_atom_radius = value,
                other => return Err(format!("line {}: unknown key {:?}", lineno + 1, other)),
            }
        }
        Ok(config)
    }
}

/// CLI-visible policy thresholds (spec.md §6), with the defaults from the
/// same section.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    pub penetration_thr: f64,
    pub restraints_ratio: f64,
    pub cluster_rmsd: f64,
    pub max_backbone_collision_per_chain: f64,
    pub min_temperature_to_consider_collision: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            penetration_thr: -1.0,
            restraints_ratio: 0.10,
            cluster_rmsd: 5.0,
            max_backbone_collision_per_chain: 0.10,
            min_temperature_to_consider_collision: 0.0,
        }
    }
}
