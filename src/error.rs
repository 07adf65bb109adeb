//! Error kinds used across the crate, following the table in the design doc:
//! geometry errors are fatal at load time, compose errors are recoverable
//! (the folder discards the candidate and keeps searching), and
//! [`FoldError`] is what finally reaches a caller.

use thiserror::Error;

/// Raised by the geometry kernel. Only ever produced while loading input
/// (superposing reference structures); never while searching.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("least-squares superposition needs at least 3 non-collinear points")]
    DegenerateInput,
}

/// Raised by [`crate::superbb::SuperBB::compose`]. Every variant here is a
/// rejected candidate, not a bug: the folder catches these, discards the
/// candidate, and tallies them in `SearchStats`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ComposeError {
    #[error("the two partial assemblies occupy overlapping chain slots")]
    IncompatibleOverlap,
    #[error("two chains of the same subunit type would be placed at the same position")]
    DuplicatePlacement,
    #[error("backbone collision or atom penetration exceeds the configured limit")]
    CollisionLimitExceeded,
    #[error("distance restraint violation ratio exceeds the configured limit")]
    ConstraintViolation,
}

/// Top-level error surfaced to the CLI boundary.
#[derive(Debug, Error)]
pub enum FoldError {
    #[error("failed to parse input: {0}")]
    InputParse(String),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("no assembly of the full complex survived the search")]
    NoAssembly,
    #[error("the assembly constraints can never be satisfied for this input")]
    ConstraintsAlwaysUnsatisfiable,
    #[error("search timed out; partial results were flushed")]
    Timeout,
}
