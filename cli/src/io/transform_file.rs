//! Loader for TransformIndex input files (spec.md §6): one file per
//! unordered subunit-type pair, `<prefix><TypeA>_plus_<TypeB>`, lines
//! `<rank> | <score> | <provenance> | <rx> <ry> <rz> <tx> <ty> <tz>`.

use combifold::error::FoldError;
use combifold::geometry::{Transform, Vec3};
use combifold::transform_pool::{PairTransform, TransformIndex};
use std::fs;
use std::path::PathBuf;

/// The file name `TransformIndex` input is read from for the unordered
/// pair `{a, b}`: `<prefix><lower>_plus_<upper>` with `lower <= upper`
/// alphabetically, matching [`combifold::transform_pool::TransformIndex`]'s
/// own unordered key. `prefix` is a plain path prefix, concatenated
/// directly with the file name, not a directory (it may end mid-name,
/// e.g. `/data/transforms/run1_`).
pub fn transform_file_path(prefix: &str, a: &str, b: &str) -> PathBuf {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    PathBuf::from(format!("{prefix}{lo}_plus_{hi}"))
}

/// Parses one TransformIndex input file's contents into `PairTransform`s
/// from `type_a` to `type_b`, in the order they're stored on disk
/// (caller is expected to sort/cap via [`TransformIndex::insert_pair`]).
pub fn parse_transform_file(text: &str, type_a: &str, type_b: &str) -> Result<Vec<PairTransform>, FoldError> {
    let mut out = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(FoldError::InputParse(format!("line {}: expected 4 `|`-separated fields, got {:?}", lineno + 1, line)));
        }
        let _rank = fields[0];
        let score: f64 = fields[1]
            .parse()
            .map_err(|_| FoldError::InputParse(format!("line {}: invalid score {:?}", lineno + 1, fields[1])))?;
        let provenance = fields[2].to_string();
        let wire: Vec<f64> = fields[3]
            .split_whitespace()
            .map(|s| s.parse::<f64>().map_err(|_| FoldError::InputParse(format!("line {}: invalid number {:?}", lineno + 1, s))))
            .collect::<Result<_, _>>()?;
        if wire.len() != 6 {
            return Err(FoldError::InputParse(format!("line {}: expected 6 wire scalars, got {}", lineno + 1, wire.len())));
        }
        let transform = Transform::from_euler_translation(wire[0], wire[1], wire[2], Vec3::new(wire[3], wire[4], wire[5]));
        out.push(PairTransform {
            from: type_a.to_string(),
            to: type_b.to_string(),
            transform,
            score,
            provenance,
        });
    }
    Ok(out)
}

/// Loads every TransformIndex file present for the unordered pairs among
/// `type_names`, silently skipping pairs whose file does not exist (the
/// resulting gap is caught later by the folder's graph connectivity
/// gate, spec.md §4.7).
pub fn load_transform_index(prefix: &str, type_names: &[String], cap_per_pair: usize) -> Result<TransformIndex, FoldError> {
    let mut index = TransformIndex::new();
    for i in 0..type_names.len() {
        for j in i..type_names.len() {
            let a = &type_names[i];
            let b = &type_names[j];
            let path = transform_file_path(prefix, a, b);
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(FoldError::InputParse(format!("reading {}: {}", path.display(), e))),
            };
            let transforms = parse_transform_file(&text, a, b)?;
            index.insert_pair(a, b, transforms, cap_per_pair);
        }
    }
    Ok(index)
}
