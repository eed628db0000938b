//! Greedy test-suite minimization.
//!
//! Classical greedy set cover: repeatedly take the test covering the most still-uncovered
//! target pairs, breaking ties by discovery order. The result is within a logarithmic
//! factor of the smallest covering subset, not necessarily the smallest.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::pairs::{Pair, PairUniverse};
use crate::suite::{TestCase, TestSuite};

#[derive(Debug, Default, Clone, Copy)]
pub struct SuiteMinimizer;

impl SuiteMinimizer {
    /// Select a subset of `tests` whose realized pairs cover `target`.
    ///
    /// Target pairs that no test realizes are reported in [`TestSuite::uncoverable`].
    pub fn minimize(&self, tests: &[TestCase], target: &[Pair]) -> TestSuite {
        let target: BTreeSet<Pair> = target.iter().copied().collect();
        let covers: Vec<BTreeSet<Pair>> = tests
            .iter()
            .map(|t| {
                PairUniverse::pairs_of_row(t.assignment())
                    .into_iter()
                    .filter(|p| target.contains(p))
                    .collect()
            })
            .collect();

        let mut remaining = target;
        let mut used = vec![false; tests.len()];
        let mut selected = Vec::new();
        let mut coverage = BTreeMap::new();

        while !remaining.is_empty() {
            let mut best: Option<(usize, usize)> = None;
            for (i, cover) in covers.iter().enumerate() {
                if used[i] {
                    continue;
                }
                let gain = cover.intersection(&remaining).count();
                if gain > best.map_or(0, |(_, g)| g) {
                    best = Some((i, gain));
                }
            }
            let Some((i, gain)) = best else {
                break;
            };
            debug!("select test {} ({}) covering {} new pair(s)", i, tests[i].name(), gain);
            used[i] = true;
            for pair in covers[i].iter() {
                if remaining.remove(pair) {
                    coverage.insert(*pair, selected.len());
                }
            }
            selected.push(tests[i].clone());
        }

        if !remaining.is_empty() {
            warn!("{} target pair(s) are not realized by any test", remaining.len());
        }
        debug!("minimized {} test(s) to {}", tests.len(), selected.len());
        TestSuite::new(selected, coverage, remaining.into_iter().collect())
    }
}
