//! The oracle boundary.
//!
//! An [`Oracle`] answers whether the model admits an execution satisfying a query. It
//! is asked about the negation of the query formula: a counterexample to the negation is
//! a witness ([`Verdict::Feasible`]), validity of the negation means no execution
//! exists ([`Verdict::Infeasible`]). Anything else (a crash, a timeout, output that
//! cannot be read) is an [`OracleError`] and never a verdict.

use std::fmt;

use crate::error::OracleError;
use crate::row::PartialRow;
use crate::trace::Trace;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum QueryKind {
    /// Full row.
    Row,
    /// Exactly two factors, issued while decomposing an infeasible row.
    Pair,
}

/// One feasibility question: the formula plus the assignment it encodes.
///
/// Process-backed oracles only look at the formula; in-process oracles may decide on
/// the assignment directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    kind: QueryKind,
    formula: String,
    assignment: PartialRow,
}

impl Query {
    pub fn new(kind: QueryKind, formula: String, assignment: PartialRow) -> Self {
        Self {
            kind,
            formula,
            assignment,
        }
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn assignment(&self) -> &PartialRow {
        &self.assignment
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} query `{}`", self.kind, self.formula)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Feasible(Trace),
    Infeasible,
}

impl Verdict {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Verdict::Feasible(_))
    }
}

pub trait Oracle {
    /// Decide a single query. Stateless between calls from the engine's point of view.
    fn decide(&mut self, query: &Query) -> Result<Verdict, OracleError>;
}

impl<O: Oracle + ?Sized> Oracle for &mut O {
    fn decide(&mut self, query: &Query) -> Result<Verdict, OracleError> {
        (**self).decide(query)
    }
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn decide(&mut self, query: &Query) -> Result<Verdict, OracleError> {
        (**self).decide(query)
    }
}
