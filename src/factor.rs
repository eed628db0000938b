//! Factors and the factor space.
//!
//! A [`Factor`] is one test dimension: a finite ordered domain of [`Value`]s, one temporal
//! atom per value, and the name of the model observable that summarizes the factor
//! along a trace. The [`FactorSpace`] is the validated, immutable list of all factors.
//!
//! Factors are addressed by [`FactorId`] (position in the space) and values by their
//! index in the factor's domain, so rows and pairs are plain vectors of indices.

use std::collections::{HashMap, HashSet};
use std::fmt;

use num_bigint::BigUint;

use crate::error::ConfigError;
use crate::formula::check_balanced;

/// A factor value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Value {
    Bool(bool),
    Int(i64),
}

impl Value {
    /// Short code used in artifact names: booleans as `0`/`1`, integers as themselves.
    pub fn code(&self) -> String {
        match self {
            Value::Bool(b) => (*b as u8).to_string(),
            Value::Int(n) => n.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(true) => write!(f, "TRUE"),
            Value::Bool(false) => write!(f, "FALSE"),
            Value::Int(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FactorKind {
    Boolean,
    Integer,
}

/// Position of a factor in its [`FactorSpace`] (0-indexed).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FactorId(usize);

impl FactorId {
    pub fn new(index: usize) -> Self {
        FactorId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FactorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

impl From<FactorId> for usize {
    fn from(id: FactorId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factor {
    name: String,
    kind: FactorKind,
    observable: String,
    values: Vec<Value>,
    atoms: Vec<String>,
    /// Boolean only: the observable reads `FALSE` when the factor is `true`.
    inverted: bool,
}

impl Factor {
    /// Boolean factor with domain `[false, true]`.
    ///
    /// The `true` atom is `atom` (or the observable itself), the `false` atom is its negation.
    pub fn boolean(name: impl Into<String>, observable: impl Into<String>, atom: Option<String>) -> Self {
        let observable = observable.into();
        let base = atom.unwrap_or_else(|| observable.clone());
        Self {
            name: name.into(),
            kind: FactorKind::Boolean,
            observable,
            values: vec![Value::Bool(false), Value::Bool(true)],
            atoms: vec![format!("!({})", base), base],
            inverted: false,
        }
    }

    /// Boolean factor that holds while its observable is `FALSE`, e.g. `no_remove` over
    /// `removed_ever`. The atoms are `observable` for `false` and `!(observable)` for `true`.
    pub fn boolean_inverted(name: impl Into<String>, observable: impl Into<String>) -> Self {
        let observable = observable.into();
        Self {
            name: name.into(),
            kind: FactorKind::Boolean,
            atoms: vec![observable.clone(), format!("!({})", observable)],
            observable,
            values: vec![Value::Bool(false), Value::Bool(true)],
            inverted: true,
        }
    }

    /// Integer factor whose atoms are the equalities `observable = v`.
    pub fn integer(name: impl Into<String>, observable: impl Into<String>, values: &[i64]) -> Self {
        let observable = observable.into();
        let atoms = values.iter().map(|v| format!("{} = {}", observable, v)).collect();
        Self {
            name: name.into(),
            kind: FactorKind::Integer,
            observable,
            values: values.iter().map(|&v| Value::Int(v)).collect(),
            atoms,
            inverted: false,
        }
    }

    /// Integer factor with an explicit atom per value.
    pub fn integer_with_atoms(
        name: impl Into<String>,
        observable: impl Into<String>,
        entries: Vec<(i64, String)>,
    ) -> Self {
        let (values, atoms) = entries.into_iter().map(|(v, a)| (Value::Int(v), a)).unzip();
        Self {
            name: name.into(),
            kind: FactorKind::Integer,
            observable: observable.into(),
            values,
            atoms,
            inverted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> FactorKind {
        self.kind
    }
    pub fn observable(&self) -> &str {
        &self.observable
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn value(&self, index: usize) -> Value {
        self.values[index]
    }
    pub fn atom(&self, index: usize) -> &str {
        &self.atoms[index]
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn is_boolean(&self) -> bool {
        self.kind == FactorKind::Boolean
    }
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn index_of(&self, value: Value) -> Option<usize> {
        self.values.iter().position(|&v| v == value)
    }

    /// Decode a raw observable reading (as printed by the model checker) into a value index.
    pub fn decode(&self, raw: &str) -> Option<usize> {
        let raw = raw.trim().trim_matches('"');
        let value = match self.kind {
            FactorKind::Boolean => match raw.to_ascii_uppercase().as_str() {
                "TRUE" | "1" => Value::Bool(!self.inverted),
                "FALSE" | "0" => Value::Bool(self.inverted),
                _ => return None,
            },
            FactorKind::Integer => Value::Int(raw.parse().ok()?),
        };
        self.index_of(value)
    }

    /// The observable reading that [`decode`](Self::decode)s to value `index`.
    pub fn reading(&self, index: usize) -> String {
        match self.values[index] {
            Value::Bool(b) => Value::Bool(b != self.inverted).to_string(),
            value => value.to_string(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.name) {
            return Err(ConfigError::InvalidIdentifier(self.name.clone()));
        }
        if !is_observable_name(&self.observable) {
            return Err(ConfigError::InvalidIdentifier(self.observable.clone()));
        }
        if self.values.is_empty() {
            return Err(ConfigError::EmptyDomain(self.name.clone()));
        }
        if self.atoms.len() != self.values.len() {
            return Err(ConfigError::AtomCount {
                factor: self.name.clone(),
                atoms: self.atoms.len(),
                values: self.values.len(),
            });
        }
        let mut seen = HashSet::new();
        for value in &self.values {
            let kind_ok = matches!(
                (self.kind, value),
                (FactorKind::Boolean, Value::Bool(_)) | (FactorKind::Integer, Value::Int(_))
            );
            if !kind_ok {
                return Err(ConfigError::KindMismatch {
                    factor: self.name.clone(),
                    reason: format!("value {} does not match kind {:?}", value, self.kind),
                });
            }
            if !seen.insert(*value) {
                return Err(ConfigError::DuplicateValue {
                    factor: self.name.clone(),
                    value: value.to_string(),
                });
            }
        }
        for atom in &self.atoms {
            check_balanced(atom, &format!("atom of factor `{}`", self.name))?;
        }
        Ok(())
    }
}

/// The factor's domain, one value per line with its atom:
///
/// ```text
/// b_max_items (integer, observed as max_items)
///   3: max_items = 3
///   4: max_items = 4
/// ```
impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FactorKind::Boolean if self.inverted => "boolean, inverted",
            FactorKind::Boolean => "boolean",
            FactorKind::Integer => "integer",
        };
        write!(f, "{} ({}, observed as {})", self.name, kind, self.observable)?;
        for (value, atom) in self.values.iter().zip(&self.atoms) {
            write!(f, "\n  {}: {}", value, atom)?;
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Identifier, optionally qualified with module instances (`proc.x`).
fn is_observable_name(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_identifier)
}

/// The validated set of factors of one run.
#[derive(Debug, Clone)]
pub struct FactorSpace {
    factors: Vec<Factor>,
    by_name: HashMap<String, FactorId>,
}

impl FactorSpace {
    pub fn new(factors: Vec<Factor>) -> Result<Self, ConfigError> {
        if factors.is_empty() {
            return Err(ConfigError::NoFactors);
        }
        let mut by_name = HashMap::new();
        for (i, factor) in factors.iter().enumerate() {
            factor.validate()?;
            if by_name.insert(factor.name.clone(), FactorId(i)).is_some() {
                return Err(ConfigError::DuplicateFactor(factor.name.clone()));
            }
        }
        Ok(Self { factors, by_name })
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn factor(&self, id: FactorId) -> &Factor {
        &self.factors[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = FactorId> {
        (0..self.factors.len()).map(FactorId)
    }

    pub fn find(&self, name: &str) -> Option<FactorId> {
        self.by_name.get(name).copied()
    }

    pub fn domain_sizes(&self) -> Vec<usize> {
        self.factors.iter().map(|f| f.len()).collect()
    }

    /// Number of rows of the exhaustive cartesian product.
    pub fn combination_count(&self) -> BigUint {
        self.factors
            .iter()
            .fold(BigUint::from(1u32), |acc, f| acc * BigUint::from(f.len()))
    }

    /// Number of 2-wise value combinations, `Σ |dom(f1)|·|dom(f2)|` over factor pairs.
    pub fn pair_count(&self) -> usize {
        let sizes = self.domain_sizes();
        let mut total = 0;
        for i in 0..sizes.len() {
            for j in (i + 1)..sizes.len() {
                total += sizes[i] * sizes[j];
            }
        }
        total
    }

    /// `name=value` for one factor value.
    pub fn describe(&self, id: FactorId, value: usize) -> String {
        let factor = self.factor(id);
        format!("{}={}", factor.name, factor.value(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn abc() -> FactorSpace {
        FactorSpace::new(vec![
            Factor::integer("a", "a", &[0, 1]),
            Factor::integer("b", "b", &[3, 4, 5]),
            Factor::boolean("c", "c_obs", None),
        ])
        .unwrap()
    }

    #[test]
    fn test_boolean_atoms() {
        let f = Factor::boolean("flag", "done", None);
        assert_eq!(f.values(), &[Value::Bool(false), Value::Bool(true)]);
        assert_eq!(f.atom(0), "!(done)");
        assert_eq!(f.atom(1), "done");

        let f = Factor::boolean("flag", "done", Some("F(done & x > 2)".to_string()));
        assert_eq!(f.atom(0), "!(F(done & x > 2))");
    }

    #[test]
    fn test_inverted_boolean() {
        let f = Factor::boolean_inverted("c_no_remove", "removed_ever");
        assert!(f.is_inverted());
        assert_eq!(f.atom(0), "removed_ever");
        assert_eq!(f.atom(1), "!(removed_ever)");
        assert_eq!(f.decode("FALSE"), Some(1));
        assert_eq!(f.decode("TRUE"), Some(0));
        assert_eq!(f.reading(1), "FALSE");
        assert_eq!(f.reading(0), "TRUE");

        let plain = Factor::boolean("c_removed", "removed_ever", None);
        assert_eq!(plain.reading(1), "TRUE");
        assert_eq!(plain.decode(&plain.reading(0)), Some(0));
    }

    #[test]
    fn test_domain_listing() {
        let f = Factor::integer("b_max_items", "max_items", &[3, 4]);
        assert_eq!(
            f.to_string(),
            "b_max_items (integer, observed as max_items)\n  3: max_items = 3\n  4: max_items = 4"
        );
        let f = Factor::boolean_inverted("c_no_remove", "removed_ever");
        assert_eq!(
            f.to_string(),
            "c_no_remove (boolean, inverted, observed as removed_ever)\n  FALSE: removed_ever\n  TRUE: !(removed_ever)"
        );
    }

    #[test]
    fn test_integer_atoms() {
        let f = Factor::integer("b_max", "max_items", &[3, 4, 5]);
        assert_eq!(f.atom(1), "max_items = 4");
        assert_eq!(f.index_of(Value::Int(5)), Some(2));
        assert_eq!(f.index_of(Value::Int(6)), None);
    }

    #[test]
    fn test_decode() {
        let space = abc();
        let b = space.factor(space.find("b").unwrap());
        assert_eq!(b.decode("4"), Some(1));
        assert_eq!(b.decode(" 5 "), Some(2));
        assert_eq!(b.decode("6"), None);
        assert_eq!(b.decode("x"), None);

        let c = space.factor(space.find("c").unwrap());
        assert_eq!(c.decode("TRUE"), Some(1));
        assert_eq!(c.decode("FALSE"), Some(0));
        assert_eq!(c.decode("maybe"), None);
    }

    #[test]
    fn test_counts() {
        let space = abc();
        assert_eq!(space.pair_count(), 2 * 3 + 2 * 2 + 3 * 2);
        assert_eq!(space.combination_count(), BigUint::from(12u32));
        assert_eq!(space.describe(FactorId::new(1), 0), "b=3");
        assert_eq!(space.describe(FactorId::new(2), 1), "c=TRUE");
    }

    #[test]
    fn test_combination_count_does_not_overflow() {
        let factors = (0..40)
            .map(|i| Factor::integer(format!("f{}", i), format!("f{}", i), &[0, 1, 2, 3]))
            .collect();
        let space = FactorSpace::new(factors).unwrap();
        assert_eq!(space.combination_count(), BigUint::from(4u32).pow(40));
    }

    #[test]
    fn test_rejects_invalid() {
        assert_eq!(FactorSpace::new(vec![]).unwrap_err(), ConfigError::NoFactors);

        let err = FactorSpace::new(vec![Factor::integer("a", "a", &[1]), Factor::integer("a", "x", &[2])]);
        assert_eq!(err.unwrap_err(), ConfigError::DuplicateFactor("a".to_string()));

        let err = FactorSpace::new(vec![Factor::integer("a", "a", &[])]);
        assert_eq!(err.unwrap_err(), ConfigError::EmptyDomain("a".to_string()));

        let err = FactorSpace::new(vec![Factor::integer("a", "a", &[1, 1])]);
        assert!(matches!(err, Err(ConfigError::DuplicateValue { .. })));

        let err = FactorSpace::new(vec![Factor::integer("9a", "a", &[1])]);
        assert_eq!(err.unwrap_err(), ConfigError::InvalidIdentifier("9a".to_string()));

        let err = FactorSpace::new(vec![Factor::boolean("a", "a", Some("F(x".to_string()))]);
        assert!(matches!(err, Err(ConfigError::UnbalancedFormula { .. })));
    }

    #[test]
    fn test_qualified_observable() {
        let space = FactorSpace::new(vec![Factor::integer("a", "proc.count", &[1, 2])]).unwrap();
        assert_eq!(space.factor(FactorId::new(0)).observable(), "proc.count");
    }
}
