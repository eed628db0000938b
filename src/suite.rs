//! Tests and test suites.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::pairs::Pair;
use crate::row::Row;

/// One generated test: the action sequence of a witness trace and the factor
/// assignment it realizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    name: String,
    steps: Vec<String>,
    assignment: Row,
}

impl TestCase {
    pub fn new(name: String, steps: Vec<String>, assignment: Row) -> Self {
        Self {
            name,
            steps,
            assignment,
        }
    }

    /// Artifact name, e.g. `A0_B3_C1`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn assignment(&self) -> &Row {
        &self.assignment
    }

    /// Numbered step listing, one step per line (`1. login`).
    pub fn render_steps(&self) -> String {
        let mut out = String::new();
        for (i, step) in self.steps.iter().enumerate() {
            // Writing to a String cannot fail.
            let _ = writeln!(out, "{}. {}", i + 1, step);
        }
        out
    }
}

/// The minimized tests together with, for every covered pair, the selected test that covers it.
#[derive(Debug, Clone, Default)]
pub struct TestSuite {
    tests: Vec<TestCase>,
    coverage: BTreeMap<Pair, usize>,
    uncoverable: Vec<Pair>,
}

impl TestSuite {
    pub(crate) fn new(tests: Vec<TestCase>, coverage: BTreeMap<Pair, usize>, uncoverable: Vec<Pair>) -> Self {
        Self {
            tests,
            coverage,
            uncoverable,
        }
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn covering_test(&self, pair: &Pair) -> Option<&TestCase> {
        self.coverage.get(pair).map(|&i| &self.tests[i])
    }

    /// `(pair, covering test)` for every covered target pair, in pair order.
    pub fn coverage(&self) -> impl Iterator<Item = (&Pair, &TestCase)> {
        self.coverage.iter().map(move |(p, &i)| (p, &self.tests[i]))
    }

    pub fn covered_pairs(&self) -> usize {
        self.coverage.len()
    }

    /// Target pairs that no input test realized.
    pub fn uncoverable(&self) -> &[Pair] {
        &self.uncoverable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_steps() {
        let test = TestCase::new(
            "A0_B3".to_string(),
            vec!["login".to_string(), "add".to_string(), "add".to_string()],
            Row::new(vec![0, 0]),
        );
        assert_eq!(test.render_steps(), "1. login\n2. add\n3. add\n");
        assert_eq!(TestCase::new("x".to_string(), vec![], Row::new(vec![])).render_steps(), "");
    }
}
