//! Witness traces returned by the oracle.
//!
//! A [`Trace`] is an ordered sequence of [`State`] snapshots. Each snapshot maps model
//! variable names to their printed values; the core never interprets a value except
//! through [`State::get_bool`], [`State::get_int`] and the factor decoders.
//!
//! [`Trace::parse_nuxmv`] reads the output of `show_traces -v`:
//!
//! ```text
//! Trace Type: Counterexample
//!   -> State: 1.1 <-
//!     step = idle
//!     items = 0
//!   -> State: 1.2 <-
//!     step = add
//!     items = 1
//!   -- Loop starts here
//!   -> State: 1.3 <-
//!     step = idle
//! ```
//!
//! Variables not printed in a state keep their previous value.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::OracleError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    values: BTreeMap<String, String>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl ToString) {
        self.values.insert(name.into(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)?.trim().to_ascii_uppercase().as_str() {
            "TRUE" => Some(true),
            "FALSE" => Some(false),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name)?.trim().parse().ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vars: Vec<String> = self.values.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", vars.join(", "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    states: Vec<State>,
    loop_start: Option<usize>,
}

impl Trace {
    pub fn new(states: Vec<State>) -> Self {
        Self {
            states,
            loop_start: None,
        }
    }

    pub fn with_loop_start(mut self, index: usize) -> Self {
        self.loop_start = Some(index);
        self
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, index: usize) -> &State {
        &self.states[index]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn last(&self) -> Option<&State> {
        self.states.last()
    }

    /// Index of the first state of the loop of a lasso-shaped trace.
    pub fn loop_start(&self) -> Option<usize> {
        self.loop_start
    }

    /// Parse the states of a nuXmv counterexample printed by `show_traces -v`.
    pub fn parse_nuxmv(output: &str) -> Result<Self, OracleError> {
        let mut states = Vec::new();
        let mut loop_start = None;
        let mut current: BTreeMap<String, String> = BTreeMap::new();
        let mut in_state = false;
        let mut in_input = false;

        for line in output.lines() {
            let line = line.trim();
            if line.starts_with("-> State:") {
                if in_state {
                    states.push(State {
                        values: current.clone(),
                    });
                }
                in_state = true;
                in_input = false;
            } else if line.starts_with("-> Input:") {
                if in_state {
                    states.push(State {
                        values: current.clone(),
                    });
                }
                in_state = false;
                in_input = true;
            } else if line.starts_with("-- Loop starts here") {
                loop_start = Some(states.len() + in_state as usize);
            } else if line.starts_with("<!--") || line.starts_with("nuXmv >") {
                // XML trace plugin banners and interactive prompts.
                continue;
            } else if in_state || in_input {
                if let Some((name, value)) = parse_assignment(line) {
                    current.insert(name.to_string(), value.to_string());
                }
            }
        }
        if in_state {
            states.push(State { values: current });
        }

        if let Some(start) = loop_start {
            if start >= states.len() {
                return Err(OracleError::MalformedTrace(format!(
                    "loop starts at state {} of a {}-state trace",
                    start,
                    states.len()
                )));
            }
        }
        Ok(Self { states, loop_start })
    }
}

/// `name = value` where `name` is a (possibly qualified or indexed) variable.
fn parse_assignment(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(" = ")?;
    let name = name.trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']' | '$' | '#' | '-'))
        && !name.starts_with('-');
    if valid {
        Some((name, value.trim()))
    } else {
        None
    }
}
