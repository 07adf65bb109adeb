//! Round-trips the file formats of spec.md §6 for scenario S1 (two copies
//! of the same subunit, one pair transform) through the real loaders and
//! writers, rather than hand-built in-memory fixtures like the core
//! crate's own `folder` tests.

use combifold::cluster;
use combifold::config::{AlgorithmConfig, PolicyConfig};
use combifold::folder::{Folder, FolderConfig};
use combifold_cli::io::{chain_list, output, restraints_file, transform_file};
use std::fs;

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("combifold-cli-test-{name}-{:?}", std::thread::current().id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn s1_two_copies_one_transform_round_trips_through_files() {
    let dir = temp_dir("s1");

    let atom_path = dir.join("a.txt");
    fs::write(&atom_path, "1 0.0 0.0 0.0 90.0\n2 3.0 0.0 0.0 90.0\n3 0.0 4.0 0.0 90.0\n").unwrap();

    let chain_list_path = dir.join("chain.list");
    fs::write(&chain_list_path, format!("{}\n{}\n", atom_path.display(), atom_path.display())).unwrap();

    let trans_prefix = dir.join("trans_").display().to_string();
    fs::write(
        format!("{trans_prefix}a_plus_a"),
        "1 | 90.0 | xl-ms | 0.0 0.0 0.0 0.0 0.0 20.0\n",
    )
    .unwrap();

    let restraints_path = dir.join("restraints.txt");
    fs::write(&restraints_path, "").unwrap();

    let chain_list_text = fs::read_to_string(&chain_list_path).unwrap();
    let lines = chain_list::parse_chain_list(&chain_list_text).unwrap();
    let algo_config = AlgorithmConfig::default();
    let (subunits, table) = chain_list::load_chain_list(&lines, &algo_config).unwrap();
    assert_eq!(subunits.len(), 1);
    assert_eq!(subunits[0].multiplicity(), 2);

    let type_names: Vec<String> = subunits.iter().map(|s| s.name.clone()).collect();
    let transforms = transform_file::load_transform_index(&trans_prefix, &type_names, 10).unwrap();

    let restraints_text = fs::read_to_string(&restraints_path).unwrap();
    let restraints = restraints_file::parse_restraints_file(&restraints_text).unwrap();
    assert!(restraints.is_empty());

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
    assert!((outcome.survivors[0].score - 90.0).abs() < 1e-9);

    let clustered = cluster::cluster(&table, &subunits, &outcome.survivors, policy.cluster_rmsd, 10);
    assert_eq!(clustered.len(), 1);

    let line = output::format_assembly_line(&clustered[0]);
    assert!(line.starts_with("[0("));
    assert!(line.contains("weightedTransScore 90"));
    assert!(line.contains("numTrans 1"));

    fs::remove_dir_all(&dir).ok();
}
