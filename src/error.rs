use std::io;
use std::path::PathBuf;

use crate::types::{VarId, VarSet};

/// Errors raised by the CI-test engine and the Markov-blanket search.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Composing variables whose instance sequences differ in length.
    #[error("variables {first} and {second} have unequal instance counts ({first_len} vs {second_len})")]
    UnequalInstanceCount {
        first: String,
        second: String,
        first_len: usize,
        second_len: usize,
    },

    /// The sample-size heuristic rejected a CI query.
    ///
    /// Backends report this as [`CiOutcome::InsufficientSamples`][crate::ci::CiOutcome];
    /// the error form only exists for callers that convert the outcome with `?`.
    #[error("insufficient samples for CI test {x} ⊥ {y} | {z}: DoF {dof}, N {n}")]
    InsufficientSamples {
        x: VarId,
        y: VarId,
        z: VarSet,
        dof: u64,
        n: usize,
    },

    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("unknown variable {0}")]
    UnknownVariable(VarId),

    #[error("CI test '{backend}' cannot use DoF calculator '{calculator}'")]
    IncompatibleDofCalculator {
        backend: &'static str,
        calculator: &'static str,
    },

    /// A preloaded or persisted count index was built from another dataset.
    #[error("count index does not match dataset '{dataset}': {reason}")]
    CountIndexMismatch { dataset: String, reason: String },

    #[error("no cached DoF table for variables {0:?}")]
    DofCacheMiss(Vec<VarId>),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("(de)serialization error on {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
