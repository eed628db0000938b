//! The pair universe: every 2-wise value combination and its classification.
//!
//! Each [`Pair`] moves through a small monotone state machine:
//!
//! ```text
//!              oracle proves pair infeasible
//!   Uncovered ───────────────────────────────▶ Infeasible
//!       │  │
//!       │  └─ accepted feasible row ─────────▶ Covered
//!       │                                         ▲
//!       └─ no safe row buildable ──▶ Unbuildable ─┘ (a later row realized it)
//! ```
//!
//! `Infeasible` and `Covered` are terminal. `Unbuildable` is an inference of the row
//! completion strategy, not a proof, so it is reported as unresolved and may still be
//! covered by a later row. A pair proven feasible by a pair-level query but not yet
//! realized by an accepted row stays `Uncovered` with its `witnessed` flag set.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::error::EngineError;
use crate::factor::{FactorId, FactorSpace};
use crate::row::{PartialRow, Row};

/// Two `(factor, value index)` slots of distinct factors, ordered by factor.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pair {
    first: (FactorId, usize),
    second: (FactorId, usize),
}

impl Pair {
    pub fn new(f1: FactorId, v1: usize, f2: FactorId, v2: usize) -> Self {
        assert_ne!(f1, f2, "A pair must involve two distinct factors");
        if f1 < f2 {
            Pair {
                first: (f1, v1),
                second: (f2, v2),
            }
        } else {
            Pair {
                first: (f2, v2),
                second: (f1, v1),
            }
        }
    }

    pub fn first(&self) -> (FactorId, usize) {
        self.first
    }

    pub fn second(&self) -> (FactorId, usize) {
        self.second
    }

    pub fn realized_by(&self, row: &Row) -> bool {
        row.get(self.first.0) == self.first.1 && row.get(self.second.0) == self.second.1
    }

    /// The partial assignment fixing exactly the two slots of this pair.
    pub fn to_partial(&self, factors: usize) -> PartialRow {
        PartialRow::empty(factors)
            .with(self.first.0, self.first.1)
            .with(self.second.0, self.second.1)
    }

    pub fn describe(&self, space: &FactorSpace) -> String {
        format!(
            "({}, {})",
            space.describe(self.first.0, self.first.1),
            space.describe(self.second.0, self.second.1)
        )
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}={}, {}={})",
            self.first.0, self.first.1, self.second.0, self.second.1
        )
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PairState {
    Uncovered,
    Infeasible,
    Covered,
    Unbuildable,
}

#[derive(Debug, Clone)]
struct Entry {
    pair: Pair,
    state: PairState,
    witnessed: bool,
}

#[derive(Debug, Clone)]
pub struct PairUniverse {
    factors: usize,
    entries: Vec<Entry>,
    index: HashMap<Pair, usize>,
}

impl PairUniverse {
    /// One `Uncovered` entry per unordered factor pair and value pair, in factor-index order.
    pub fn new(space: &FactorSpace) -> Self {
        let sizes = space.domain_sizes();
        let mut entries = Vec::with_capacity(space.pair_count());
        let mut index = HashMap::with_capacity(space.pair_count());
        for i in 0..sizes.len() {
            for j in (i + 1)..sizes.len() {
                for vi in 0..sizes[i] {
                    for vj in 0..sizes[j] {
                        let pair = Pair::new(FactorId::new(i), vi, FactorId::new(j), vj);
                        index.insert(pair, entries.len());
                        entries.push(Entry {
                            pair,
                            state: PairState::Uncovered,
                            witnessed: false,
                        });
                    }
                }
            }
        }
        Self {
            factors: sizes.len(),
            entries,
            index,
        }
    }

    /// All pairs realized by a full row, `C(k, 2)` of them.
    pub fn pairs_of_row(row: &Row) -> Vec<Pair> {
        let mut pairs = Vec::new();
        for (i, vi) in row.iter() {
            for (j, vj) in row.iter().skip(i.index() + 1) {
                pairs.push(Pair::new(i, vi, j, vj));
            }
        }
        pairs
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn factors(&self) -> usize {
        self.factors
    }

    fn entry(&self, pair: &Pair) -> &Entry {
        &self.entries[self.index[pair]]
    }

    fn entry_mut(&mut self, pair: &Pair) -> &mut Entry {
        let i = self.index[pair];
        &mut self.entries[i]
    }

    pub fn state(&self, pair: &Pair) -> PairState {
        self.entry(pair).state
    }

    pub fn is_infeasible(&self, pair: &Pair) -> bool {
        self.state(pair) == PairState::Infeasible
    }

    /// Whether `f1=v1` and `f2=v2` are known to be jointly infeasible.
    pub fn conflicts(&self, f1: FactorId, v1: usize, f2: FactorId, v2: usize) -> bool {
        f1 != f2 && self.is_infeasible(&Pair::new(f1, v1, f2, v2))
    }

    /// Whether the pair is known to be feasible (covered, or witnessed by a pair query).
    pub fn is_known_feasible(&self, pair: &Pair) -> bool {
        let entry = self.entry(pair);
        entry.state == PairState::Covered || entry.witnessed
    }

    /// `Uncovered`/`Unbuildable` → `Infeasible`. Returns whether the state changed.
    ///
    /// Marking a covered pair infeasible means the oracle contradicted an earlier
    /// feasible verdict, which is an invariant violation.
    pub fn mark_infeasible(&mut self, pair: &Pair) -> Result<bool, EngineError> {
        let entry = self.entry_mut(pair);
        match entry.state {
            PairState::Infeasible => Ok(false),
            PairState::Covered => Err(EngineError::Invariant(format!(
                "pair {} is covered and cannot become infeasible",
                pair
            ))),
            _ if entry.witnessed => Err(EngineError::Invariant(format!(
                "pair {} was witnessed feasible and cannot become infeasible",
                pair
            ))),
            _ => {
                debug!("pair {} -> infeasible", pair);
                entry.state = PairState::Infeasible;
                Ok(true)
            }
        }
    }

    /// Record a feasible pair-level verdict. Returns whether the flag was newly set.
    pub fn mark_witnessed(&mut self, pair: &Pair) -> bool {
        let entry = self.entry_mut(pair);
        let fresh = !entry.witnessed;
        entry.witnessed = true;
        fresh
    }

    /// `Uncovered` → `Unbuildable`. Returns whether the state changed.
    pub fn mark_unbuildable(&mut self, pair: &Pair) -> bool {
        let entry = self.entry_mut(pair);
        if entry.state == PairState::Uncovered {
            debug!("pair {} -> unbuildable", pair);
            entry.state = PairState::Unbuildable;
            true
        } else {
            false
        }
    }

    /// Mark every pair realized by an accepted feasible row as `Covered`.
    ///
    /// Returns the pairs that were not covered before. Nothing is changed if the row
    /// realizes a pair already proven infeasible.
    pub fn mark_covered(&mut self, row: &Row) -> Result<Vec<Pair>, EngineError> {
        let pairs = Self::pairs_of_row(row);
        if let Some(bad) = pairs.iter().find(|p| self.is_infeasible(p)) {
            return Err(EngineError::Invariant(format!(
                "feasible row {} realizes infeasible pair {}",
                row, bad
            )));
        }
        let mut fresh = Vec::new();
        for pair in pairs {
            let entry = self.entry_mut(&pair);
            if entry.state != PairState::Covered {
                entry.state = PairState::Covered;
                fresh.push(pair);
            }
        }
        debug!("row {} covers {} new pair(s)", row, fresh.len());
        Ok(fresh)
    }

    /// Still-`Uncovered` pairs, in insertion order.
    pub fn remaining(&self) -> Vec<Pair> {
        self.pairs_in(PairState::Uncovered)
    }

    pub fn is_exhausted(&self) -> bool {
        self.entries.iter().all(|e| e.state != PairState::Uncovered)
    }

    pub fn pairs_in(&self, state: PairState) -> Vec<Pair> {
        self.entries
            .iter()
            .filter(|e| e.state == state)
            .map(|e| e.pair)
            .collect()
    }

    pub fn count(&self, state: PairState) -> usize {
        self.entries.iter().filter(|e| e.state == state).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pair, PairState)> + '_ {
        self.entries.iter().map(|e| (e.pair, e.state))
    }

    /// Number of `Uncovered` pairs that assigning `id = value` would realize together
    /// with the values already fixed in `partial`.
    pub fn uncovered_gain(&self, partial: &PartialRow, id: FactorId, value: usize) -> usize {
        partial
            .assigned()
            .filter(|&(other, _)| other != id)
            .filter(|&(other, v)| self.state(&Pair::new(id, value, other, v)) == PairState::Uncovered)
            .count()
    }

    /// Whether `id = value` conflicts with any value already fixed in `partial`.
    pub fn is_safe(&self, partial: &PartialRow, id: FactorId, value: usize) -> bool {
        partial
            .assigned()
            .all(|(other, v)| !self.conflicts(id, value, other, v))
    }
}
