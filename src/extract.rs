//! Turning witness traces into tests.
//!
//! The extraction point is the first state where the termination flag holds, or the
//! final state when no flag is configured. The step sequence is read at every state up
//! to and including that point; factor values are read only at that point, from each
//! factor's summary observable.
//!
//! This relies on the model's summary observables being monotonic: the value read at the
//! extraction point must mean the same as the factor's temporal property over the whole
//! trace. The optional sanity pass ([`TraceExtractor::with_monotonicity_check`]) rejects
//! traces where an integer observable decreases or a boolean observable flips back.

use log::debug;

use crate::error::ExtractionError;
use crate::factor::{FactorKind, FactorSpace};
use crate::row::Row;
use crate::suite::TestCase;
use crate::trace::Trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceExtractor {
    step_variable: String,
    termination_flag: Option<String>,
    idle_step: Option<String>,
    check_monotonicity: bool,
}

impl TraceExtractor {
    pub fn new(step_variable: impl Into<String>) -> Self {
        Self {
            step_variable: step_variable.into(),
            termination_flag: None,
            idle_step: None,
            check_monotonicity: false,
        }
    }

    pub fn with_termination_flag(mut self, flag: Option<String>) -> Self {
        self.termination_flag = flag;
        self
    }

    /// Step value to drop from the sequence (compared case-insensitively).
    pub fn with_idle_step(mut self, idle: Option<String>) -> Self {
        self.idle_step = idle.map(|s| normalize_step(&s));
        self
    }

    pub fn with_monotonicity_check(mut self, check: bool) -> Self {
        self.check_monotonicity = check;
        self
    }

    pub fn step_variable(&self) -> &str {
        &self.step_variable
    }

    pub fn termination_flag(&self) -> Option<&str> {
        self.termination_flag.as_deref()
    }

    pub fn extraction_point(&self, trace: &Trace) -> Result<usize, ExtractionError> {
        if trace.is_empty() {
            return Err(ExtractionError::EmptyTrace);
        }
        match &self.termination_flag {
            Some(flag) => trace
                .states()
                .iter()
                .position(|s| s.get_bool(flag) == Some(true))
                .ok_or_else(|| ExtractionError::NoExtractionPoint(flag.clone())),
            None => Ok(trace.len() - 1),
        }
    }

    /// Non-idle step values of states `0..=point`, in order, repeats kept.
    pub fn steps(&self, trace: &Trace, point: usize) -> Vec<String> {
        trace.states()[..=point]
            .iter()
            .filter_map(|s| s.get(&self.step_variable))
            .map(normalize_step)
            .filter(|step| Some(step) != self.idle_step.as_ref())
            .collect()
    }

    /// Every factor's value read from its observable at `point`.
    pub fn assignment(&self, trace: &Trace, point: usize, space: &FactorSpace) -> Result<Row, ExtractionError> {
        let state = trace.state(point);
        let mut values = Vec::with_capacity(space.len());
        for factor in space.factors() {
            let raw = state
                .get(factor.observable())
                .ok_or_else(|| ExtractionError::MissingObservable {
                    observable: factor.observable().to_string(),
                    state: point,
                })?;
            let value = factor.decode(raw).ok_or_else(|| ExtractionError::OutOfDomain {
                factor: factor.name().to_string(),
                observable: factor.observable().to_string(),
                raw: raw.to_string(),
            })?;
            values.push(value);
        }
        Ok(Row::new(values))
    }

    /// Integer observables never decrease and boolean observables change at most once
    /// along states `0..=point`.
    pub fn check_monotonic(&self, trace: &Trace, point: usize, space: &FactorSpace) -> Result<(), ExtractionError> {
        for factor in space.factors() {
            let observable = factor.observable();
            let mut previous: Option<&str> = None;
            let mut changed = false;
            for (i, state) in trace.states()[..=point].iter().enumerate() {
                let Some(raw) = state.get(observable) else {
                    continue;
                };
                if let Some(before) = previous {
                    let violation = match factor.kind() {
                        FactorKind::Integer => match (before.trim().parse::<i64>(), raw.trim().parse::<i64>()) {
                            (Ok(a), Ok(b)) => b < a,
                            _ => false,
                        },
                        FactorKind::Boolean => {
                            let flipped = !before.trim().eq_ignore_ascii_case(raw.trim());
                            let violation = flipped && changed;
                            changed |= flipped;
                            violation
                        }
                    };
                    if violation {
                        return Err(ExtractionError::NonMonotonic {
                            observable: observable.to_string(),
                            before: before.to_string(),
                            after: raw.to_string(),
                            state: i,
                        });
                    }
                }
                previous = Some(raw);
            }
        }
        Ok(())
    }

    pub fn extract(&self, trace: &Trace, space: &FactorSpace) -> Result<TestCase, ExtractionError> {
        let point = self.extraction_point(trace)?;
        if self.check_monotonicity {
            self.check_monotonic(trace, point, space)?;
        }
        let steps = self.steps(trace, point);
        let assignment = self.assignment(trace, point, space)?;
        debug!(
            "extracted {} step(s) at state {} of {}: {}",
            steps.len(),
            point,
            trace.len(),
            assignment
        );
        Ok(TestCase::new(assignment.artifact_name(space), steps, assignment))
    }
}

fn normalize_step(raw: &str) -> String {
    raw.trim().trim_matches('"').to_lowercase()
}
