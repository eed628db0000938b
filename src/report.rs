//! Final classification of the pair universe.

use std::fmt;

use crate::factor::FactorSpace;
use crate::pairs::{Pair, PairState, PairUniverse};

/// Every pair lands in exactly one of the lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairReport {
    pub covered: Vec<Pair>,
    pub infeasible: Vec<Pair>,
    /// No safe row could be built; feasibility unknown.
    pub unbuildable: Vec<Pair>,
    /// Still uncovered when the run stalled.
    pub uncovered: Vec<Pair>,
}

impl PairReport {
    pub fn new(universe: &PairUniverse) -> Self {
        let mut report = PairReport::default();
        for (pair, state) in universe.iter() {
            match state {
                PairState::Covered => report.covered.push(pair),
                PairState::Infeasible => report.infeasible.push(pair),
                PairState::Unbuildable => report.unbuildable.push(pair),
                PairState::Uncovered => report.uncovered.push(pair),
            }
        }
        report
    }

    /// Pairs with no proof either way.
    pub fn unresolved(&self) -> impl Iterator<Item = &Pair> {
        self.unbuildable.iter().chain(self.uncovered.iter())
    }

    pub fn total(&self) -> usize {
        self.covered.len() + self.infeasible.len() + self.unbuildable.len() + self.uncovered.len()
    }

    pub fn is_complete(&self) -> bool {
        self.unbuildable.is_empty() && self.uncovered.is_empty()
    }

    /// Feasible share of the universe that is covered, in percent.
    ///
    /// Infeasible pairs are excluded from the denominator.
    pub fn coverage_percent(&self) -> f64 {
        let feasible = self.total() - self.infeasible.len();
        if feasible == 0 {
            100.0
        } else {
            100.0 * self.covered.len() as f64 / feasible as f64
        }
    }

    /// Multi-line listing of every non-covered pair, named by factor and value.
    pub fn describe(&self, space: &FactorSpace) -> String {
        let mut out = format!("{}\n", self);
        let sections = [
            ("infeasible", &self.infeasible),
            ("unbuildable", &self.unbuildable),
            ("uncovered", &self.uncovered),
        ];
        for (title, pairs) in sections {
            if pairs.is_empty() {
                continue;
            }
            out.push_str(&format!("{} ({}):\n", title, pairs.len()));
            for pair in pairs.iter() {
                out.push_str(&format!("  {}\n", pair.describe(space)));
            }
        }
        out
    }
}

impl fmt::Display for PairReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pairs: {} covered, {} infeasible, {} unbuildable, {} uncovered ({:.1}% of feasible covered)",
            self.total(),
            self.covered.len(),
            self.infeasible.len(),
            self.unbuildable.len(),
            self.uncovered.len(),
            self.coverage_percent()
        )
    }
}
