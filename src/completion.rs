//! Completing a partial assignment into a full row that avoids known-infeasible pairs.
//!
//! A completion never consults the oracle: it only avoids pairs already proven
//! infeasible, prefers values that realize many uncovered pairs, and refuses rows whose
//! signature is blocked.

use std::collections::HashSet;

use log::{debug, trace};

use crate::factor::{FactorId, FactorSpace};
use crate::pairs::PairUniverse;
use crate::row::{PartialRow, Row};

/// What a completion strategy concluded for one partial assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// A full safe row that is not blocked.
    Built(Row),
    /// No safe full row extends the partial assignment.
    Unbuildable,
    /// Safe rows may exist, but none was found that is not blocked (or the search gave up).
    Exhausted,
}

/// The read-only state a completion strategy looks at.
#[derive(Debug, Clone, Copy)]
pub struct CompletionContext<'a> {
    pub space: &'a FactorSpace,
    pub universe: &'a PairUniverse,
    pub blocked: &'a HashSet<Row>,
}

impl<'a> CompletionContext<'a> {
    /// Safe values of `id` given `partial`: most uncovered pairs first, lowest index on ties.
    pub fn candidates(&self, partial: &PartialRow, id: FactorId) -> Vec<usize> {
        let mut scored: Vec<(usize, usize)> = (0..self.space.factor(id).len())
            .filter(|&v| self.universe.is_safe(partial, id, v))
            .map(|v| (v, self.universe.uncovered_gain(partial, id, v)))
            .collect();
        // Stable sort keeps the lower index first among equal gains.
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.into_iter().map(|(v, _)| v).collect()
    }
}

pub trait RowCompletion {
    fn complete(&self, partial: &PartialRow, ctx: &CompletionContext<'_>) -> Completion;
}

impl<T: RowCompletion + ?Sized> RowCompletion for Box<T> {
    fn complete(&self, partial: &PartialRow, ctx: &CompletionContext<'_>) -> Completion {
        (**self).complete(partial, ctx)
    }
}

/// Assigns factors in index order, each to its best safe value, with no backtracking.
///
/// Fast, but may report [`Completion::Unbuildable`] for a partial assignment that a
/// different choice of earlier values could have completed.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyCompletion;

impl RowCompletion for GreedyCompletion {
    fn complete(&self, partial: &PartialRow, ctx: &CompletionContext<'_>) -> Completion {
        let mut row = partial.clone();
        let free: Vec<FactorId> = partial.unassigned().collect();
        for id in free {
            match ctx.candidates(&row, id).first() {
                Some(&v) => row.set(id, v),
                None => {
                    trace!("greedy completion: no safe value for {}", id);
                    return Completion::Unbuildable;
                }
            }
        }
        match row.to_row() {
            Some(row) if ctx.blocked.contains(&row) => Completion::Exhausted,
            Some(row) => Completion::Built(row),
            None => Completion::Unbuildable,
        }
    }
}

/// Depth-first search over safe values with a node budget.
///
/// Reports [`Completion::Unbuildable`] only after exhausting the search space without
/// meeting a single safe full row, so unbuildable pairs are never a greedy artifact.
#[derive(Debug, Clone, Copy)]
pub struct BacktrackingCompletion {
    max_nodes: usize,
}

impl Default for BacktrackingCompletion {
    fn default() -> Self {
        Self { max_nodes: 100_000 }
    }
}

struct Search {
    nodes: usize,
    max_nodes: usize,
    found_safe: bool,
    gave_up: bool,
}

impl BacktrackingCompletion {
    pub fn new(max_nodes: usize) -> Self {
        Self { max_nodes }
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    fn search(
        &self,
        row: &mut PartialRow,
        free: &[FactorId],
        ctx: &CompletionContext<'_>,
        state: &mut Search,
    ) -> Option<Row> {
        let Some((&id, rest)) = free.split_first() else {
            let full = row.to_row()?;
            state.found_safe = true;
            if ctx.blocked.contains(&full) {
                return None;
            }
            return Some(full);
        };
        for v in ctx.candidates(row, id) {
            if state.nodes >= state.max_nodes {
                state.gave_up = true;
                return None;
            }
            state.nodes += 1;
            row.set(id, v);
            if let Some(full) = self.search(row, rest, ctx, state) {
                return Some(full);
            }
            row.unset(id);
        }
        None
    }
}

impl RowCompletion for BacktrackingCompletion {
    fn complete(&self, partial: &PartialRow, ctx: &CompletionContext<'_>) -> Completion {
        let mut row = partial.clone();
        let free: Vec<FactorId> = partial.unassigned().collect();
        let mut state = Search {
            nodes: 0,
            max_nodes: self.max_nodes,
            found_safe: false,
            gave_up: false,
        };
        match self.search(&mut row, &free, ctx, &mut state) {
            Some(full) => Completion::Built(full),
            None if state.found_safe || state.gave_up => {
                debug!(
                    "completion exhausted after {} node(s) (safe row seen: {}, budget hit: {})",
                    state.nodes, state.found_safe, state.gave_up
                );
                Completion::Exhausted
            }
            None => Completion::Unbuildable,
        }
    }
}
