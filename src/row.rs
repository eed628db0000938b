//! Full and partial factor assignments.

use std::fmt;

use crate::factor::{FactorId, FactorSpace, Value};

/// A full assignment: one value index per factor, in factor order.
///
/// The value vector doubles as the row's signature in the blocked set.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Row(Vec<usize>);

impl Row {
    pub fn new(values: Vec<usize>) -> Self {
        Row(values)
    }

    pub fn get(&self, id: FactorId) -> usize {
        self.0[id.index()]
    }

    pub fn values(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(factor, value index)`.
    pub fn iter(&self) -> impl Iterator<Item = (FactorId, usize)> + '_ {
        self.0.iter().enumerate().map(|(i, &v)| (FactorId::new(i), v))
    }

    pub fn to_partial(&self) -> PartialRow {
        PartialRow(self.0.iter().map(|&v| Some(v)).collect())
    }

    pub fn value(&self, space: &FactorSpace, id: FactorId) -> Value {
        space.factor(id).value(self.get(id))
    }

    /// Human-readable `a=1, b=3, c=TRUE`.
    pub fn describe(&self, space: &FactorSpace) -> String {
        self.iter()
            .map(|(id, v)| space.describe(id, v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Artifact name such as `A0_B3_C1`.
    ///
    /// Factors are sorted by name and each contributes its uppercase initial followed by
    /// the value code (booleans as 0/1, integers as themselves).
    pub fn artifact_name(&self, space: &FactorSpace) -> String {
        let mut parts: Vec<(&str, String)> = self
            .iter()
            .map(|(id, v)| {
                let factor = space.factor(id);
                (factor.name(), factor.value(v).code())
            })
            .collect();
        parts.sort();
        parts
            .into_iter()
            .map(|(name, code)| {
                let initial: String = name.chars().take(1).flat_map(|c| c.to_uppercase()).collect();
                format!("{}{}", initial, code)
            })
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

/// An assignment with possibly unassigned factors.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct PartialRow(Vec<Option<usize>>);

impl PartialRow {
    /// All factors unassigned.
    pub fn empty(factors: usize) -> Self {
        PartialRow(vec![None; factors])
    }

    pub fn get(&self, id: FactorId) -> Option<usize> {
        self.0[id.index()]
    }

    pub fn set(&mut self, id: FactorId, value: usize) {
        self.0[id.index()] = Some(value);
    }

    pub fn unset(&mut self, id: FactorId) {
        self.0[id.index()] = None;
    }

    pub fn with(mut self, id: FactorId, value: usize) -> Self {
        self.set(id, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    /// Iterate over assigned `(factor, value index)` in factor order.
    pub fn assigned(&self) -> impl Iterator<Item = (FactorId, usize)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (FactorId::new(i), v)))
    }

    pub fn unassigned(&self) -> impl Iterator<Item = FactorId> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_none())
            .map(|(i, _)| FactorId::new(i))
    }

    pub fn to_row(&self) -> Option<Row> {
        self.0.iter().copied().collect::<Option<Vec<_>>>().map(Row)
    }

    pub fn describe(&self, space: &FactorSpace) -> String {
        self.assigned()
            .map(|(id, v)| space.describe(id, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
