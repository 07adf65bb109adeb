//! Loader for the restraints file (spec.md §6): one distance restraint
//! per line, `<res1> <chainLabel1> <res2> <chainLabel2> <dMin> <dMax> <weight>`.

use combifold::error::FoldError;
use combifold::restraints::{DistanceRestraint, RestraintSet};

pub fn parse_restraints_file(text: &str) -> Result<RestraintSet, FoldError> {
    let mut restraints = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 7 {
            return Err(FoldError::InputParse(format!(
                "restraints line {}: expected 7 fields, got {:?}",
                lineno + 1,
                line
            )));
        }
        let parse_num = |s: &str| -> Result<f64, FoldError> {
            s.parse()
                .map_err(|_| FoldError::InputParse(format!("restraints line {}: invalid number {:?}", lineno + 1, s)))
        };
        let parse_residue = |s: &str| -> Result<i64, FoldError> {
            s.parse()
                .map_err(|_| FoldError::InputParse(format!("restraints line {}: invalid residue {:?}", lineno + 1, s)))
        };
        let parse_label = |s: &str| -> Result<char, FoldError> {
            let mut chars = s.chars();
            let c = chars
                .next()
                .ok_or_else(|| FoldError::InputParse(format!("restraints line {}: empty chain label", lineno + 1)))?;
            if chars.next().is_some() {
                return Err(FoldError::InputParse(format!(
                    "restraints line {}: chain label {:?} is not a single character",
                    lineno + 1,
                    s
                )));
            }
            Ok(c)
        };

        restraints.push(DistanceRestraint {
            residue1: parse_residue(fields[0])?,
            chain1: parse_label(fields[1])?,
            residue2: parse_residue(fields[2])?,
            chain2: parse_label(fields[3])?,
            d_min: parse_num(fields[4])?,
            d_max: parse_num(fields[5])?,
            weight: parse_num(fields[6])?,
        });
    }
    Ok(RestraintSet::new(restraints))
}
