//! An in-process oracle for dry runs.
//!
//! [`SimulatedOracle`] decides feasibility with a predicate over the queried
//! assignment instead of a model checker, and synthesizes witness traces that respect
//! the model contract: one `set_<factor>` step per factor, the termination flag raised
//! in the last state, and every factor observable holding its value throughout.

use crate::error::OracleError;
use crate::factor::FactorSpace;
use crate::oracle::{Oracle, Query, Verdict};
use crate::row::PartialRow;
use crate::trace::{State, Trace};

pub struct SimulatedOracle<F> {
    space: FactorSpace,
    step_variable: String,
    termination_flag: Option<String>,
    idle_step: String,
    feasible: F,
    calls: usize,
}

impl<F> SimulatedOracle<F>
where
    F: FnMut(&PartialRow) -> bool,
{
    /// `feasible` returns whether the model admits an execution with the given assignment.
    pub fn new(space: FactorSpace, step_variable: &str, termination_flag: Option<&str>, feasible: F) -> Self {
        Self {
            space,
            step_variable: step_variable.to_string(),
            termination_flag: termination_flag.map(str::to_string),
            idle_step: "idle".to_string(),
            feasible,
            calls: 0,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    /// A witness for `assignment`; unassigned factors take their first value.
    pub fn witness(&self, assignment: &PartialRow) -> Trace {
        let values: Vec<(String, String)> = self
            .space
            .ids()
            .map(|id| {
                let factor = self.space.factor(id);
                let reading = factor.reading(assignment.get(id).unwrap_or(0));
                (factor.observable().to_string(), reading)
            })
            .collect();

        let snapshot = |step: &str, done: bool| {
            let mut state = State::new().with(self.step_variable.as_str(), step);
            if let Some(flag) = &self.termination_flag {
                state.set(flag.as_str(), if done { "TRUE" } else { "FALSE" });
            }
            for (observable, value) in &values {
                state.set(observable.as_str(), value);
            }
            state
        };

        let mut states = vec![snapshot(&self.idle_step, false)];
        let last = self.space.len() - 1;
        for (i, factor) in self.space.factors().iter().enumerate() {
            states.push(snapshot(&format!("set_{}", factor.name()), i == last));
        }
        // Stutter after termination, as a lasso would.
        states.push(snapshot(&self.idle_step, true));
        Trace::new(states).with_loop_start(self.space.len() + 1)
    }
}

impl<F> Oracle for SimulatedOracle<F>
where
    F: FnMut(&PartialRow) -> bool,
{
    fn decide(&mut self, query: &Query) -> Result<Verdict, OracleError> {
        self.calls += 1;
        if query.assignment().len() != self.space.len() {
            return Err(OracleError::RejectedQuery(format!(
                "assignment over {} factors, expected {}",
                query.assignment().len(),
                self.space.len()
            )));
        }
        if (self.feasible)(query.assignment()) {
            Ok(Verdict::Feasible(self.witness(query.assignment())))
        } else {
            Ok(Verdict::Infeasible)
        }
    }
}

/// Helper for predicates: the value assigned to factor `name`, if any, rendered as the
/// model checker prints it.
pub fn assigned_value(space: &FactorSpace, assignment: &PartialRow, name: &str) -> Option<String> {
    let id = space.find(name)?;
    let factor = space.factor(id);
    let index = assignment.get(id)?;
    Some(factor.value(index).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::factor::{Factor, FactorId};
    use crate::oracle::QueryKind;

    fn space() -> FactorSpace {
        FactorSpace::new(vec![Factor::integer("a", "obs_a", &[0, 1]), Factor::boolean("c", "obs_c", None)]).unwrap()
    }

    #[test]
    fn test_witness_shape() {
        let oracle = SimulatedOracle::new(space(), "step", Some("end"), |_: &PartialRow| true);
        let trace = oracle.witness(&PartialRow::empty(2).with(FactorId::new(0), 1));
        assert_eq!(trace.len(), 4);
        assert_eq!(trace.state(0).get("step"), Some("idle"));
        assert_eq!(trace.state(1).get("step"), Some("set_a"));
        assert_eq!(trace.state(2).get("step"), Some("set_c"));
        assert_eq!(trace.state(2).get_bool("end"), Some(true));
        assert_eq!(trace.state(1).get_bool("end"), Some(false));
        assert_eq!(trace.state(2).get_int("obs_a"), Some(1));
        assert_eq!(trace.state(2).get_bool("obs_c"), Some(false));
        assert_eq!(trace.loop_start(), Some(3));
    }

    #[test]
    fn test_decide_uses_predicate() {
        let s = space();
        let predicate_space = s.clone();
        let mut oracle = SimulatedOracle::new(s, "step", None, move |row: &PartialRow| {
            assigned_value(&predicate_space, row, "a").as_deref() != Some("1")
        });
        let ok = Query::new(QueryKind::Pair, String::new(), PartialRow::empty(2).with(FactorId::new(0), 0));
        let bad = Query::new(QueryKind::Pair, String::new(), PartialRow::empty(2).with(FactorId::new(0), 1));
        assert!(oracle.decide(&ok).unwrap().is_feasible());
        assert_eq!(oracle.decide(&bad).unwrap(), Verdict::Infeasible);
        assert_eq!(oracle.calls(), 2);

        let wrong = Query::new(QueryKind::Row, String::new(), PartialRow::empty(5));
        assert!(oracle.decide(&wrong).is_err());
    }

    #[test]
    fn test_witness_of_inverted_factor_extracts_back() {
        use crate::extract::TraceExtractor;
        use crate::row::Row;

        let space = FactorSpace::new(vec![
            Factor::integer("a", "obs_a", &[0, 1]),
            Factor::boolean_inverted("c_no_remove", "removed_ever"),
        ])
        .unwrap();
        let oracle = SimulatedOracle::new(space.clone(), "step", Some("end"), |_: &PartialRow| true);
        let trace = oracle.witness(&PartialRow::empty(2).with(FactorId::new(0), 1).with(FactorId::new(1), 1));
        assert_eq!(trace.state(2).get_bool("removed_ever"), Some(false));

        let extractor = TraceExtractor::new("step").with_termination_flag(Some("end".to_string()));
        let test = extractor.extract(&trace, &space).unwrap();
        assert_eq!(test.assignment(), &Row::new(vec![1, 1]));
    }
}
