//! A hierarchical combinatorial assembler for protein complexes.
//!
//! Given a set of *subunit types*, each with a fixed number of
//! interchangeable chain copies, and a pool of candidate pairwise
//! rigid-body transforms (scored predictions relating one chain to
//! another), this crate searches the combinatorial space of ways those
//! pair transforms can be composed into a sterically valid placement of
//! every chain simultaneously, then clusters and ranks the best whole
//! assemblies found.
//!
//! # Crate layout
//!
//! Leaves-first dependency order, mirroring the search pipeline:
//!
//! - [`geometry`] — rigid transforms, RMSD, least-squares superposition.
//! - [`grid`] — the spatial hash grid backing collision queries.
//! - [`bitset`] — the fixed-width chain-slot identity ([`bitset::ChainSet`]).
//! - [`subunit`] — [`subunit::SubunitType`] and the fixed [`subunit::ChainSlotTable`]
//!   of chain slots it implies.
//! - [`transform_pool`] — the indexed pool of candidate pair transforms.
//! - [`restraints`] — distance restraints (crosslinks, chain connectivity).
//! - [`superbb`] — [`superbb::SuperBB`], the incremental assembly state and
//!   its composition rules.
//! - [`folder`] — the top-level best-K-bounded search.
//! - [`cluster`] — RMSD-based deduplication of final assemblies.
//! - [`analysis`] — post-hoc summary statistics over a set of assemblies.
//! - [`config`] / [`error`] — ambient configuration and error types shared
//!   across the above.
//!
//! This crate has no file I/O and no notion of a process: it is a pure
//! search engine over in-memory inputs. File formats and the
//! command-line surface live in the `combifold-cli` crate.

extern crate nalgebra;
extern crate rayon;

pub mod analysis;
pub mod bitset;
pub mod cluster;
pub mod config;
pub mod error;
pub mod folder;
pub mod geometry;
pub mod grid;
pub mod restraints;
pub mod subunit;
pub mod superbb;
pub mod transform_pool;

#[cfg(test)]
extern crate approx;
