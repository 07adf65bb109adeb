//! `combifold` — the command-line surface of the core search (spec.md §6),
//! following `coupe-tools`'s `apply-part`/`apply-weight` shape: `getopts`
//! for argument parsing, `anyhow` for error context, one `main` that maps
//! the terminal error to an exit code.

use anyhow::Context as _;
use anyhow::Result;
use combifold::cluster;
use combifold::config::{AlgorithmConfig, PolicyConfig};
use combifold::error::FoldError;
use combifold::folder::{Folder, FolderConfig};
use combifold_cli::io::{chain_list, output, restraints_file, transform_file};
use std::env;
use std::fs;
use std::io::BufWriter;
use std::process;
use std::time::Duration;

const USAGE: &str = "Usage: combifold [options] chainList transFilesPrefix transNumPerPair bestK restraintsFile";

fn main() {
    match try_main() {
        Ok(()) => process::exit(0),
        Err(err) => {
            eprintln!("combifold: error: {err:#}");
            process::exit(exit_code_for(&err));
        }
    }
}

/// Maps a terminal `anyhow::Error` to the exit codes of spec.md §6, falling
/// back to 1 ("other fatal") for anything that didn't bottom out in a
/// `FoldError` (argument parsing, I/O errors opening output files, ...).
fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<FoldError>() {
        Some(FoldError::InputParse(_)) | Some(FoldError::Geometry(_)) => 2,
        Some(FoldError::NoAssembly) => 3,
        Some(FoldError::ConstraintsAlwaysUnsatisfiable) => 4,
        Some(FoldError::Timeout) => 0,
        None => 1,
    }
}

/// A restraint whose range can never be satisfied by any geometry
/// (`dMin > dMax`) makes the whole run unsatisfiable regardless of search
/// effort; caught up front rather than discovered the hard way after a
/// full search empties every band (exit 4 vs. exit 3, spec.md §6).
fn restraints_always_unsatisfiable(restraints: &combifold::restraints::RestraintSet) -> bool {
    restraints.restraints().iter().any(|r| r.d_min > r.d_max)
}

fn try_main() -> Result<()> {
    let mut options = getopts::Options::new();
    options.optflag("h", "help", "print this help menu");
    options.optflag("", "version", "print version information");
    options.optopt("", "penetration-thr", "backbone penetration threshold, Å (default -1.0)", "THR");
    options.optopt("", "restraints-ratio", "max violated-restraint weight ratio (default 0.10)", "RATIO");
    options.optopt("", "cluster-rmsd", "clustering RMSD radius, Å (default 5.0)", "RMSD");
    options.optopt("", "max-backbone-collision-per-chain", "max colliding atom fraction per chain (default 0.10)", "RATIO");
    options.optopt("", "min-temperature-to-consider-collision", "confidence threshold below which atoms are ignored in collision checks (default 0)", "CONF");
    options.optopt("", "max-result-per-res-set", "per-identity beam width (default = bestK)", "N");
    options.optopt("", "max-results", "cluster representatives to emit (default = bestK)", "N");
    options.optopt("o", "output-file-name-prefix", "output file prefix (default \"output\")", "PREFIX");
    options.optopt("c", "config", "static algorithm-constants file", "FILE");
    options.optopt("", "timeout-secs", "cancel the search after this many seconds", "SECS");
    options.optopt("", "chrome-trace", "write a tracing-chrome flamegraph to this file", "FILE");

    let matches = options.parse(env::args().skip(1))?;

    if matches.opt_present("h") {
        println!("{}", options.usage(USAGE));
        return Ok(());
    }
    if matches.opt_present("version") {
        println!("combifold version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let chrome_trace = matches.opt_str("chrome-trace");
    let _logging_guard = combifold_cli::init_logging(chrome_trace.as_deref());

    if matches.free.len() != 5 {
        anyhow::bail!("expected 5 positional arguments, got {}\n\n{}", matches.free.len(), options.usage(USAGE));
    }
    let chain_list_path = &matches.free[0];
    let trans_files_prefix = &matches.free[1];
    let trans_num_per_pair: usize = matches.free[2]
        .parse()
        .context("invalid value for transNumPerPair")?;
    let best_k: usize = matches.free[3].parse().context("invalid value for bestK")?;
    let restraints_path = &matches.free[4];

    let max_result_per_res_set: usize = match matches.opt_str("max-result-per-res-set") {
        Some(v) => v.parse().context("invalid value for max-result-per-res-set")?,
        None => best_k,
    };
    let max_results: usize = match matches.opt_str("max-results") {
        Some(v) => v.parse().context("invalid value for max-results")?,
        None => best_k,
    };
    let output_prefix = matches.opt_str("o").unwrap_or_else(|| "output".to_string());
    let timeout = match matches.opt_str("timeout-secs") {
        Some(v) => Some(Duration::from_secs_f64(v.parse().context("invalid value for timeout-secs")?)),
        None => None,
    };

    let policy = PolicyConfig {
        penetration_thr: opt_f64(&matches, "penetration-thr", PolicyConfig::default().penetration_thr)?,
        restraints_ratio: opt_f64(&matches, "restraints-ratio", PolicyConfig::default().restraints_ratio)?,
        cluster_rmsd: opt_f64(&matches, "cluster-rmsd", PolicyConfig::default().cluster_rmsd)?,
        max_backbone_collision_per_chain: opt_f64(
            &matches,
            "max-backbone-collision-per-chain",
            PolicyConfig::default().max_backbone_collision_per_chain,
        )?,
        min_temperature_to_consider_collision: opt_f64(
            &matches,
            "min-temperature-to-consider-collision",
            PolicyConfig::default().min_temperature_to_consider_collision,
        )?,
    };

    let algo_config = match matches.opt_str("c") {
        Some(path) => {
            let file = fs::File::open(&path).with_context(|| format!("opening config file {path}"))?;
            AlgorithmConfig::from_reader(std::io::BufReader::new(file))
                .map_err(FoldError::InputParse)
                .with_context(|| format!("parsing config file {path}"))?
        }
        None => AlgorithmConfig::default(),
    };

    let chain_list_text = fs::read_to_string(chain_list_path)
        .with_context(|| format!("reading chain list {chain_list_path}"))?;
    let chain_lines = chain_list::parse_chain_list(&chain_list_text)?;
    let (subunits, table) = chain_list::load_chain_list(&chain_lines, &algo_config)?;

    let type_names: Vec<String> = subunits.iter().map(|s| s.name.clone()).collect();
    let transforms = transform_file::load_transform_index(trans_files_prefix, &type_names, trans_num_per_pair)?;

    let restraints_text = fs::read_to_string(restraints_path)
        .with_context(|| format!("reading restraints file {restraints_path}"))?;
    let restraints = restraints_file::parse_restraints_file(&restraints_text)?;

    if restraints_always_unsatisfiable(&restraints) {
        return Err(FoldError::ConstraintsAlwaysUnsatisfiable.into());
    }

    let folder_config = FolderConfig {
        best_k,
        max_result_per_res_set,
        trans_num_per_pair,
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
    let outcome = folder.run(timeout);

    if outcome.survivors.is_empty() && !outcome.timed_out {
        write_log(&output_prefix, &outcome)?;
        return Err(FoldError::NoAssembly.into());
    }

    let clustered = cluster::cluster(&table, &subunits, &outcome.survivors, policy.cluster_rmsd, max_results);

    write_res(&format!("{output_prefix}.res"), &outcome.survivors)?;
    write_res(&format!("{output_prefix}_clustered.res"), &clustered)?;
    write_log(&output_prefix, &outcome)?;

    if outcome.timed_out {
        eprintln!("combifold: warning: search timed out; partial results were flushed");
    }

    Ok(())
}

fn opt_f64(matches: &getopts::Matches, name: &str, default: f64) -> Result<f64> {
    match matches.opt_str(name) {
        Some(v) => v.parse().with_context(|| format!("invalid value for {name}")),
        None => Ok(default),
    }
}

fn write_res(path: &str, assemblies: &[combifold::superbb::SuperBB]) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = BufWriter::new(file);
    output::write_assemblies(&mut writer, assemblies).with_context(|| format!("writing {path}"))?;
    Ok(())
}

fn write_log(output_prefix: &str, outcome: &combifold::folder::FolderOutcome) -> Result<()> {
    let path = format!("{output_prefix}.log");
    let file = fs::File::create(&path).with_context(|| format!("creating {path}"))?;
    let mut writer = BufWriter::new(file);
    output::write_log(&mut writer, &outcome.stats, &outcome.unreachable, outcome.timed_out)
        .with_context(|| format!("writing {path}"))?;
    Ok(())
}
