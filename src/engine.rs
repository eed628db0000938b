//! The row engine: Dynamic IPO with an oracle.
//!
//! **Phase 1** walks an IPO covering array built without any constraint knowledge. Each
//! row, with its don't-cares filled greedily, is skipped if it realizes a pair already
//! proven infeasible or realizes no uncovered pair, and is otherwise asked to the oracle
//! as a whole. A feasible row is turned into a test and covers its pairs. An infeasible
//! row is *decomposed*: each of its pairs not yet known to be feasible is asked on its
//! own, and the infeasible ones are recorded. If decomposition finds no infeasible pair,
//! the row signature is blocked so it is never proposed again.
//!
//! **Phase 2** repeatedly passes over the still-uncovered pairs in insertion order. For
//! each one a [`RowCompletion`] builds a safe, unblocked row fixing that pair, which is
//! then processed like a phase 1 row. The run ends when no pair is uncovered, or when a
//! full pass neither changes a pair's state nor blocks a new row (a *stall*); stalled
//! pairs are left unresolved.
//!
//! Every feasible verdict carries its own witness, so a pair is covered only by a row the
//! oracle accepted, and infeasible only by a pair-level proof.

use std::collections::HashSet;
use std::fmt;

use log::{debug, info, warn};

use crate::completion::{BacktrackingCompletion, Completion, CompletionContext, GreedyCompletion, RowCompletion};
use crate::error::{EngineError, ExtractionError};
use crate::extract::TraceExtractor;
use crate::factor::FactorSpace;
use crate::formula::FormulaBuilder;
use crate::ipo::covering_array;
use crate::minimize::SuiteMinimizer;
use crate::oracle::{Oracle, Query, QueryKind, Verdict};
use crate::pairs::{Pair, PairState, PairUniverse};
use crate::report::PairReport;
use crate::row::{PartialRow, Row};
use crate::suite::{TestCase, TestSuite};
use crate::trace::Trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Extra attempts after a failed oracle call before the run is aborted.
    pub oracle_retries: usize,
    /// Reject witnesses whose extracted assignment differs from the requested row.
    pub verify_assignment: bool,
    /// Upper bound on phase 2 passes; reaching it counts as a stall.
    pub max_passes: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            oracle_retries: 1,
            verify_assignment: true,
            max_passes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// No pair is left uncovered.
    Exhausted,
    /// A full pass made no progress.
    Stalled { unresolved: Vec<Pair> },
}

/// A feasible witness that could not be turned into a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionFailure {
    pub row: Row,
    pub error: ExtractionError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub row_queries: usize,
    pub pair_queries: usize,
    pub phase1_rows: usize,
    pub skipped_rows: usize,
    pub passes: usize,
}

impl RunStats {
    pub fn oracle_calls(&self) -> usize {
        self.row_queries + self.pair_queries
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} oracle call(s) ({} row, {} pair), {} phase 1 row(s) with {} skipped, {} phase 2 pass(es)",
            self.oracle_calls(),
            self.row_queries,
            self.pair_queries,
            self.phase1_rows,
            self.skipped_rows,
            self.passes
        )
    }
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub universe: PairUniverse,
    /// Accepted tests in discovery order.
    pub tests: Vec<TestCase>,
    /// Blocked row signatures in the order they were blocked.
    pub blocked: Vec<Row>,
    pub extraction_failures: Vec<ExtractionFailure>,
    pub termination: Termination,
    pub stats: RunStats,
}

impl RunOutcome {
    pub fn report(&self) -> PairReport {
        PairReport::new(&self.universe)
    }

    /// Greedy minimization of the accepted tests against the covered pairs.
    pub fn minimize(&self) -> TestSuite {
        SuiteMinimizer.minimize(&self.tests, &self.universe.pairs_in(PairState::Covered))
    }

    pub fn is_stalled(&self) -> bool {
        matches!(self.termination, Termination::Stalled { .. })
    }

    /// Turn a stall into an error, for callers that need full coverage.
    pub fn require_complete(self) -> Result<Self, EngineError> {
        match &self.termination {
            Termination::Stalled { unresolved } => Err(EngineError::Stalled {
                unresolved: unresolved.len(),
            }),
            Termination::Exhausted => Ok(self),
        }
    }
}

pub struct RowEngine<'a, O> {
    space: &'a FactorSpace,
    formulas: &'a FormulaBuilder,
    extractor: &'a TraceExtractor,
    oracle: O,
    completion: Box<dyn RowCompletion + 'a>,
    config: EngineConfig,

    universe: PairUniverse,
    tests: Vec<TestCase>,
    accepted: HashSet<Row>,
    blocked: HashSet<Row>,
    blocked_order: Vec<Row>,
    failures: Vec<ExtractionFailure>,
    stats: RunStats,
}

impl<'a, O> RowEngine<'a, O>
where
    O: Oracle,
{
    pub fn new(space: &'a FactorSpace, formulas: &'a FormulaBuilder, extractor: &'a TraceExtractor, oracle: O) -> Self {
        Self {
            space,
            formulas,
            extractor,
            oracle,
            completion: Box::<BacktrackingCompletion>::default(),
            config: EngineConfig::default(),
            universe: PairUniverse::new(space),
            tests: Vec::new(),
            accepted: HashSet::new(),
            blocked: HashSet::new(),
            blocked_order: Vec::new(),
            failures: Vec::new(),
            stats: RunStats::default(),
        }
    }

    pub fn with_completion(mut self, completion: impl RowCompletion + 'a) -> Self {
        self.completion = Box::new(completion);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn universe(&self) -> &PairUniverse {
        &self.universe
    }

    /// Run both phases to completion or stall.
    ///
    /// Returns an error only when the oracle keeps failing or an invariant of the pair
    /// universe is violated; a stall is a normal outcome.
    pub fn run(mut self) -> Result<RunOutcome, EngineError> {
        info!(
            "{} factor(s), {} pair(s), {} exhaustive combination(s)",
            self.space.len(),
            self.universe.len(),
            self.space.combination_count()
        );
        self.phase1()?;
        info!(
            "phase 1 done: {} test(s), {} covered, {} infeasible, {} uncovered",
            self.tests.len(),
            self.universe.count(PairState::Covered),
            self.universe.count(PairState::Infeasible),
            self.universe.count(PairState::Uncovered)
        );
        let termination = self.phase2()?;
        info!("run finished: {} test(s), {}", self.tests.len(), self.stats);

        Ok(RunOutcome {
            universe: self.universe,
            tests: self.tests,
            blocked: self.blocked_order,
            extraction_failures: self.failures,
            termination,
            stats: self.stats,
        })
    }

    fn phase1(&mut self) -> Result<(), EngineError> {
        let array = covering_array(&self.space.domain_sizes());
        self.stats.phase1_rows = array.len();
        info!("phase 1: {} covering array row(s)", array.len());

        for partial in array {
            let completion = GreedyCompletion.complete(&partial, &self.context());
            let row = match completion {
                Completion::Built(row) => row,
                Completion::Unbuildable | Completion::Exhausted => {
                    debug!("phase 1: no safe filling for {}", partial.describe(self.space));
                    self.stats.skipped_rows += 1;
                    continue;
                }
            };
            if !self.worth_asking(&row) {
                debug!("phase 1: skip {}", row);
                self.stats.skipped_rows += 1;
                continue;
            }
            self.process_row(row)?;
        }
        Ok(())
    }

    fn phase2(&mut self) -> Result<Termination, EngineError> {
        loop {
            if self.universe.is_exhausted() {
                return Ok(Termination::Exhausted);
            }
            if let Some(max) = self.config.max_passes {
                if self.stats.passes >= max {
                    warn!("phase 2: pass limit {} reached", max);
                    return Ok(self.stall());
                }
            }
            self.stats.passes += 1;
            let before = self.progress();
            let targets = self.universe.remaining();
            debug!("phase 2 pass {}: {} uncovered pair(s)", self.stats.passes, targets.len());

            for target in targets {
                // Rows accepted earlier in this pass may have covered it already.
                if self.universe.state(&target) != PairState::Uncovered {
                    continue;
                }
                let partial = target.to_partial(self.space.len());
                let completion = self.completion.complete(&partial, &self.context());
                match completion {
                    Completion::Built(row) => {
                        debug!("phase 2: {} -> {}", target.describe(self.space), row);
                        self.process_row(row)?;
                    }
                    Completion::Unbuildable => {
                        warn!("phase 2: no safe row realizes {}", target.describe(self.space));
                        self.universe.mark_unbuildable(&target);
                    }
                    Completion::Exhausted => {
                        debug!("phase 2: every safe row for {} is blocked", target.describe(self.space));
                    }
                }
            }

            if self.progress() == before {
                return Ok(self.stall());
            }
        }
    }

    fn stall(&self) -> Termination {
        let unresolved = self.universe.remaining();
        warn!("stalled with {} uncovered pair(s)", unresolved.len());
        Termination::Stalled { unresolved }
    }

    fn context(&self) -> CompletionContext<'_> {
        CompletionContext {
            space: self.space,
            universe: &self.universe,
            blocked: &self.blocked,
        }
    }

    /// Covered, infeasible and unbuildable pair counts plus blocked rows; a pass made
    /// progress iff this changed. Every component only grows and is bounded.
    fn progress(&self) -> (usize, usize, usize, usize) {
        (
            self.universe.count(PairState::Covered),
            self.universe.count(PairState::Infeasible),
            self.universe.count(PairState::Unbuildable),
            self.blocked.len(),
        )
    }

    fn worth_asking(&self, row: &Row) -> bool {
        if self.blocked.contains(row) {
            return false;
        }
        let pairs = PairUniverse::pairs_of_row(row);
        !pairs.iter().any(|p| self.universe.is_infeasible(p))
            && pairs.iter().any(|p| self.universe.state(p) == PairState::Uncovered)
    }

    fn process_row(&mut self, row: Row) -> Result<(), EngineError> {
        match self.ask(QueryKind::Row, row.to_partial())? {
            Verdict::Feasible(trace) => self.accept(row, &trace),
            Verdict::Infeasible => self.decompose(row),
        }
    }

    fn accept(&mut self, row: Row, trace: &Trace) -> Result<(), EngineError> {
        let extracted = self.extractor.extract(trace, self.space).and_then(|test| {
            if self.config.verify_assignment && test.assignment() != &row {
                Err(ExtractionError::AssignmentMismatch {
                    requested: row.describe(self.space),
                    extracted: test.assignment().describe(self.space),
                })
            } else {
                Ok(test)
            }
        });

        match extracted {
            Ok(test) => {
                let fresh = self.universe.mark_covered(test.assignment())?;
                if self.accepted.insert(test.assignment().clone()) {
                    info!("test {}: {} step(s), {} new pair(s)", test.name(), test.steps().len(), fresh.len());
                    self.tests.push(test);
                }
                Ok(())
            }
            Err(error) => {
                warn!("feasible row {} rejected: {}", row.describe(self.space), error);
                // The row is feasible as a whole, so each of its pairs is.
                for pair in PairUniverse::pairs_of_row(&row) {
                    self.universe.mark_witnessed(&pair);
                }
                self.block(row.clone());
                self.failures.push(ExtractionFailure { row, error });
                Ok(())
            }
        }
    }

    fn decompose(&mut self, row: Row) -> Result<(), EngineError> {
        let mut infeasible = 0;
        for pair in PairUniverse::pairs_of_row(&row) {
            match self.universe.state(&pair) {
                PairState::Infeasible => {
                    infeasible += 1;
                    continue;
                }
                PairState::Covered => continue,
                PairState::Uncovered | PairState::Unbuildable => {}
            }
            if self.universe.is_known_feasible(&pair) {
                continue;
            }
            match self.ask(QueryKind::Pair, pair.to_partial(self.space.len()))? {
                Verdict::Feasible(_) => {
                    self.universe.mark_witnessed(&pair);
                }
                Verdict::Infeasible => {
                    info!("infeasible pair {}", pair.describe(self.space));
                    self.universe.mark_infeasible(&pair)?;
                    infeasible += 1;
                }
            }
        }

        if infeasible == 0 {
            debug!("row {} is infeasible only as a whole", row.describe(self.space));
            self.block(row);
        } else {
            debug!("row {} realizes {} infeasible pair(s)", row.describe(self.space), infeasible);
        }
        Ok(())
    }

    fn block(&mut self, row: Row) {
        if self.blocked.insert(row.clone()) {
            self.blocked_order.push(row);
        }
    }

    fn ask(&mut self, kind: QueryKind, assignment: PartialRow) -> Result<Verdict, EngineError> {
        let formula = self.formulas.build(self.space, &assignment);
        let query = Query::new(kind, formula, assignment);
        match kind {
            QueryKind::Row => self.stats.row_queries += 1,
            QueryKind::Pair => self.stats.pair_queries += 1,
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.oracle.decide(&query) {
                Ok(verdict) => {
                    debug!(
                        "{} -> {}",
                        query,
                        if verdict.is_feasible() { "feasible" } else { "infeasible" }
                    );
                    return Ok(verdict);
                }
                Err(e) if attempts <= self.config.oracle_retries => {
                    warn!("oracle attempt {} failed: {}; retrying", attempts, e);
                }
                Err(source) => {
                    return Err(EngineError::Oracle {
                        formula: query.formula().to_string(),
                        attempts,
                        source,
                    });
                }
            }
        }
    }
}
