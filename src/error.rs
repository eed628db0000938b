//! Error types.
//!
//! Each layer of the pipeline has its own error enum. Configuration problems are fatal
//! before the engine starts, oracle failures are retried a bounded number of times and
//! then abort the run, extraction failures are reported per row.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Invalid factor definitions, settings, or model contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no factors defined")]
    NoFactors,
    #[error("invalid identifier `{0}` (use [A-Za-z_][A-Za-z0-9_]*)")]
    InvalidIdentifier(String),
    #[error("duplicate factor name `{0}`")]
    DuplicateFactor(String),
    #[error("factor `{0}` has an empty domain")]
    EmptyDomain(String),
    #[error("factor `{factor}` declares value {value} more than once")]
    DuplicateValue { factor: String, value: String },
    #[error("factor `{factor}` mixes value kinds: {reason}")]
    KindMismatch { factor: String, reason: String },
    #[error("factor `{factor}` has {atoms} atoms for {values} values")]
    AtomCount {
        factor: String,
        atoms: usize,
        values: usize,
    },
    #[error("unbalanced parentheses in {context}: `{formula}`")]
    UnbalancedFormula { context: String, formula: String },
    #[error("query template `{0}` has no `{{conditions}}` placeholder")]
    MissingPlaceholder(String),
    #[error("model does not declare required observable(s): {}", .0.join(", "))]
    MissingObservable(Vec<String>),
    #[error("malformed settings: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Malformed(e.to_string())
    }
}

/// Failure to obtain a verdict from the decision procedure.
///
/// An oracle error is never a verdict: it must not be read as infeasibility.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("failed to spawn `{binary}`: {source}")]
    Spawn {
        binary: PathBuf,
        source: std::io::Error,
    },
    #[error("oracle I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("oracle timed out after {0:?}")]
    Timeout(Duration),
    #[error("oracle process failed ({status}): {stderr}")]
    Process { status: String, stderr: String },
    #[error("could not parse a verdict from oracle output")]
    UnparseableOutput,
    #[error("malformed trace: {0}")]
    MalformedTrace(String),
    #[error("query rejected: {0}")]
    RejectedQuery(String),
}

/// The trace does not satisfy the model contract needed to read a test from it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("trace has no states")]
    EmptyTrace,
    #[error("termination flag `{0}` never holds in the trace")]
    NoExtractionPoint(String),
    #[error("observable `{observable}` is missing at state {state}")]
    MissingObservable { observable: String, state: usize },
    #[error("observable `{observable}` = `{raw}` is outside the domain of factor `{factor}`")]
    OutOfDomain {
        factor: String,
        observable: String,
        raw: String,
    },
    #[error("observable `{observable}` is not monotonic: `{before}` then `{after}` at state {state}")]
    NonMonotonic {
        observable: String,
        before: String,
        after: String,
        state: usize,
    },
    #[error("extracted assignment {extracted} differs from the requested row {requested}")]
    AssignmentMismatch { requested: String, extracted: String },
}

/// Fatal engine failures.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("oracle failed after {attempts} attempt(s) on `{formula}`: {source}")]
    Oracle {
        formula: String,
        attempts: usize,
        source: OracleError,
    },
    #[error("pair universe invariant violated: {0}")]
    Invariant(String),
    #[error("no progress over a full pass; {unresolved} pair(s) left unresolved")]
    Stalled { unresolved: usize },
}
