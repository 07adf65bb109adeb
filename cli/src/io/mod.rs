//! File formats of the command-line surface (spec.md §6). Kept out of
//! the core algorithm modules so the library itself stays I/O-free, the
//! same boundary `coupe`/`coupe-tools` draws between the partitioning
//! library and its file-format glue.

pub mod chain_list;
pub mod output;
pub mod restraints_file;
pub mod transform_file;
