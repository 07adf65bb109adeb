//! Loader for `chain.list` and the per-chain atom files it references
//! (spec.md §6). Reading a prediction pipeline's native structure format
//! is explicitly out of scope (§1, "Subunit definition parsing... format
//! glue"); this module instead reads a small self-contained per-residue
//! text format, one line per backbone atom, enough to exercise the core
//! end to end from the command line.

use combifold::config::AlgorithmConfig;
use combifold::error::FoldError;
use combifold::geometry::Vec3;
use combifold::subunit::{ChainSlotTable, ResidueNumber, SubunitType};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One line of `chain.list`: the path to a subunit's atom file, and its
/// optional partition tag.
#[derive(Debug, Clone)]
pub struct ChainListLine {
    pub path: PathBuf,
    pub group: Option<i64>,
}

/// Parses `chain.list`: one `<path> [group]` per chain slot, in global id
/// order (spec.md §6).
pub fn parse_chain_list(text: &str) -> Result<Vec<ChainListLine>, FoldError> {
    let mut lines = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let path = fields
            .next()
            .ok_or_else(|| FoldError::InputParse(format!("chain.list line {}: missing path", lineno + 1)))?;
        let group = match fields.next() {
            Some(g) => Some(
                g.parse::<i64>()
                    .map_err(|_| FoldError::InputParse(format!("chain.list line {}: invalid group {:?}", lineno + 1, g)))?,
            ),
            None => None,
        };
        lines.push(ChainListLine {
            path: PathBuf::from(path),
            group,
        });
    }
    Ok(lines)
}

/// A parsed atom file: one `<residue> <x> <y> <z> <confidence>` record
/// per backbone atom, in residue order (`#` comments and blank lines
/// ignored).
fn load_atom_file(path: &Path) -> Result<(Vec<ResidueNumber>, Vec<Vec3>, Vec<f64>), FoldError> {
    let text = fs::read_to_string(path)
        .map_err(|e| FoldError::InputParse(format!("reading {}: {}", path.display(), e)))?;
    let mut residues = Vec::new();
    let mut points = Vec::new();
    let mut confidence = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(FoldError::InputParse(format!(
                "{}:{}: expected `residue x y z confidence`, got {:?}",
                path.display(),
                lineno + 1,
                line
            )));
        }
        let parse = |s: &str| -> Result<f64, FoldError> {
            s.parse()
                .map_err(|_| FoldError::InputParse(format!("{}:{}: invalid number {:?}", path.display(), lineno + 1, s)))
        };
        let residue: ResidueNumber = fields[0]
            .parse()
            .map_err(|_| FoldError::InputParse(format!("{}:{}: invalid residue {:?}", path.display(), lineno + 1, fields[0])))?;
        let x = parse(fields[1])?;
        let y = parse(fields[2])?;
        let z = parse(fields[3])?;
        let conf = parse(fields[4])?;
        residues.push(residue);
        points.push(Vec3::new(x, y, z));
        confidence.push(conf);
    }
    Ok((residues, points, confidence))
}

/// The pool of 62 short, visually distinct labels used to name chain
/// slots when `chain.list` itself carries no label column: `0`-`9`,
/// `A`-`Z`, `a`-`z`, in that order, matching conventional PDB chain ids.
fn generate_label(index: usize) -> char {
    const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    ALPHABET[index % ALPHABET.len()] as char
}

/// Loads `chain.list` and every atom file it references, grouping chain
/// slots that share the same atom file path into one [`SubunitType`]
/// (its backbone point cloud is the same rigid body for every copy;
/// only the placement differs). Returns the subunit types in order of
/// first appearance and the resulting [`ChainSlotTable`].
pub fn load_chain_list(
    lines: &[ChainListLine],
    algo_config: &AlgorithmConfig,
) -> Result<(Vec<SubunitType>, ChainSlotTable), FoldError> {
    let mut order: Vec<PathBuf> = Vec::new();
    let mut groups_by_path: HashMap<PathBuf, Vec<Option<i64>>> = HashMap::new();
    for line in lines {
        if !groups_by_path.contains_key(&line.path) {
            order.push(line.path.clone());
        }
        groups_by_path.entry(line.path.clone()).or_default().push(line.group);
    }

    let mut subunits = Vec::new();
    let mut groups = Vec::new();
    let mut label_cursor = 0usize;
    for path in &order {
        let (residues, points, confidence) = load_atom_file(path)?;
        let copy_groups = &groups_by_path[path];
        let chain_labels: Vec<char> = (0..copy_groups.len())
            .map(|_| {
                let label = generate_label(label_cursor);
                label_cursor += 1;
                label
            })
            .collect();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        subunits.push(SubunitType::new(name, chain_labels, residues, points, confidence, algo_config));
        groups.push(copy_groups.clone());
    }

    let table = ChainSlotTable::new(&subunits, &groups);
    Ok((subunits, table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_and_group() {
        let text = "# comment\nstructures/a.txt 0\nstructures/a.txt 1\n\nstructures/b.txt\n";
        let lines = parse_chain_list(text).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].group, Some(0));
        assert_eq!(lines[2].group, None);
    }

    #[test]
    fn rejects_invalid_group() {
        let text = "structures/a.txt not-a-number\n";
        assert!(parse_chain_list(text).is_err());
    }

    #[test]
    fn groups_copies_of_the_same_path() {
        use std::io::Write;
        let dir = std::env::temp_dir().join(format!("combifold-test-{:?}", std::thread::current().id()));
        fs::create_dir_all(&dir).unwrap();
        let atom_path = dir.join("a.txt");
        let mut f = fs::File::create(&atom_path).unwrap();
        writeln!(f, "1 0.0 0.0 0.0 90.0").unwrap();
        writeln!(f, "2 3.0 0.0 0.0 90.0").unwrap();
        writeln!(f, "3 0.0 4.0 0.0 90.0").unwrap();

        let lines = vec![
            ChainListLine { path: atom_path.clone(), group: Some(0) },
            ChainListLine { path: atom_path, group: Some(1) },
        ];
        let (subunits, table) = load_chain_list(&lines, &AlgorithmConfig::default()).unwrap();
        assert_eq!(subunits.len(), 1);
        assert_eq!(subunits[0].multiplicity(), 2);
        assert_eq!(table.len(), 2);

        fs::remove_dir_all(&dir).ok();
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn generated_labels_are_distinct_within_one_alphabet_cycle(index in 0usize..62) {
            let label = generate_label(index);
            prop_assert_eq!(label, generate_label(index));
            prop_assert_ne!(label as u32, 0);
        }

        #[test]
        fn generate_label_wraps_every_62_slots(index in 0usize..500) {
            prop_assert_eq!(generate_label(index), generate_label(index % 62));
        }
    }
}
