//! Query formulas.
//!
//! A query asks for an execution of the model in which a (partial) factor assignment
//! holds. For a row `a=1, b=3` with termination flag `end` and an integer factor `b`
//! observed through `max_items`, the default template produces:
//!
//! ```text
//! (TRUE) & (F(end & (a) & (max_items = 3) & ((max_items = 3 | max_items = 4 | max_items = 5))))
//! ```
//!
//! The trailing disjunction is the domain guard: it keeps the oracle from witnessing a
//! value of an integer observable outside the declared domain, which the trace extractor
//! could not decode.
//!
//! Without a termination flag the extractor reads the last state of the witness, so the
//! default template is `F(G({conditions}))`: the assignment holds on the loop of the
//! lasso, where the printed trace ends.

use crate::error::ConfigError;
use crate::factor::{FactorKind, FactorSpace};
use crate::pairs::Pair;
use crate::row::{PartialRow, Row};

/// Placeholder substituted with the conjunction of conditions.
pub const CONDITIONS: &str = "{conditions}";

/// Placeholder in the test rule substituted with the termination flag name.
pub const END_FLAG: &str = "{end_flag}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaBuilder {
    test_rule: String,
    template: String,
    termination_flag: Option<String>,
}

impl Default for FormulaBuilder {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FormulaBuilder {
    /// Builder with the default test rule (`TRUE`) and the default template: `F({conditions})`
    /// when anchored at a termination flag, `F(G({conditions}))` otherwise.
    pub fn new(termination_flag: Option<String>) -> Self {
        let template = match termination_flag {
            Some(_) => format!("F({})", CONDITIONS),
            None => format!("F(G({}))", CONDITIONS),
        };
        Self {
            test_rule: "TRUE".to_string(),
            template,
            termination_flag,
        }
    }

    pub fn with_test_rule(mut self, test_rule: impl Into<String>) -> Self {
        self.test_rule = test_rule.into();
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn termination_flag(&self) -> Option<&str> {
        self.termination_flag.as_deref()
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.template.contains(CONDITIONS) {
            return Err(ConfigError::MissingPlaceholder(self.template.clone()));
        }
        check_balanced(&self.template, "query template")?;
        check_balanced(&self.test_rule, "test rule")?;
        Ok(())
    }

    /// The test rule with `{end_flag}` resolved.
    pub fn test_rule(&self) -> String {
        match &self.termination_flag {
            Some(flag) => self.test_rule.replace(END_FLAG, flag),
            None => self.test_rule.clone(),
        }
    }

    /// Conjunction of `(obs = v1 | obs = v2 | ...)` over every integer factor of the space.
    pub fn domain_guard(&self, space: &FactorSpace) -> Option<String> {
        let clauses: Vec<String> = space
            .factors()
            .iter()
            .filter(|f| f.kind() == FactorKind::Integer)
            .map(|f| {
                let alternatives: Vec<String> = f
                    .values()
                    .iter()
                    .map(|v| format!("{} = {}", f.observable(), v))
                    .collect();
                format!("({})", alternatives.join(" | "))
            })
            .collect();
        if clauses.is_empty() {
            None
        } else {
            Some(format!("({})", clauses.join(" & ")))
        }
    }

    /// Query for an arbitrary partial assignment.
    pub fn build(&self, space: &FactorSpace, assignment: &PartialRow) -> String {
        let mut conditions = Vec::new();
        if let Some(flag) = &self.termination_flag {
            conditions.push(flag.clone());
        }
        for (id, value) in assignment.assigned() {
            conditions.push(format!("({})", space.factor(id).atom(value)));
        }
        if let Some(guard) = self.domain_guard(space) {
            conditions.push(guard);
        }
        let conditions = if conditions.is_empty() {
            "TRUE".to_string()
        } else {
            conditions.join(" & ")
        };

        let anchored = self.template.replace(CONDITIONS, &conditions);
        format!("({}) & ({})", self.test_rule(), anchored)
    }

    pub fn build_row_formula(&self, space: &FactorSpace, row: &Row) -> String {
        self.build(space, &row.to_partial())
    }

    pub fn build_pair_formula(&self, space: &FactorSpace, pair: &Pair) -> String {
        self.build(space, &pair.to_partial(space.len()))
    }
}

/// `!(formula)`, unless the formula already is a single negated group.
pub fn negate(formula: &str) -> String {
    let trimmed = formula.trim();
    if let Some(inner) = trimmed.strip_prefix('!') {
        if inner.starts_with('(') && closing_paren(inner) == Some(inner.len() - 1) {
            return trimmed.to_string();
        }
    }
    format!("!({})", trimmed)
}

/// Index of the parenthesis closing the one at index 0.
fn closing_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

pub fn check_balanced(formula: &str, context: &str) -> Result<(), ConfigError> {
    let mut depth = 0i64;
    for c in formula.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            break;
        }
    }
    if depth != 0 {
        return Err(ConfigError::UnbalancedFormula {
            context: context.to_string(),
            formula: formula.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::factor::{Factor, FactorId};

    fn space() -> FactorSpace {
        FactorSpace::new(vec![
            Factor::boolean("a_no_logout", "no_logout_after_add", None),
            Factor::integer("b_max_items", "max_items", &[3, 4, 5]),
            Factor::boolean_inverted("c_no_remove", "removed_ever"),
        ])
        .unwrap()
    }

    #[test]
    fn test_row_formula_anchored_at_flag() {
        let space = space();
        let builder = FormulaBuilder::new(Some("end_of_test".to_string()));
        let formula = builder.build_row_formula(&space, &Row::new(vec![1, 0, 0]));
        assert_eq!(
            formula,
            "(TRUE) & (F(end_of_test & (no_logout_after_add) & (max_items = 3) & (removed_ever) \
             & ((max_items = 3 | max_items = 4 | max_items = 5))))"
        );
    }

    #[test]
    fn test_guard_is_present_for_out_of_domain_observable() {
        // The model can push max_items to 6; the query must rule that witness out.
        let space = space();
        let builder = FormulaBuilder::new(Some("end".to_string()));
        let pair = Pair::new(FactorId::new(0), 0, FactorId::new(2), 1);
        let formula = builder.build_pair_formula(&space, &pair);
        assert!(formula.contains("(max_items = 3 | max_items = 4 | max_items = 5)"));
        assert!(!formula.contains("max_items = 6"));
        assert!(!formula.contains("(max_items = 3) &"));
    }

    #[test]
    fn test_pair_formula_only_mentions_pair() {
        let space = space();
        let builder = FormulaBuilder::new(Some("end".to_string()));
        let pair = Pair::new(FactorId::new(1), 2, FactorId::new(0), 0);
        let formula = builder.build_pair_formula(&space, &pair);
        assert_eq!(
            formula,
            "(TRUE) & (F(end & (!(no_logout_after_add)) & (max_items = 5) \
             & ((max_items = 3 | max_items = 4 | max_items = 5))))"
        );
    }

    #[test]
    fn test_unanchored_formula_holds_at_the_end() {
        // Summary observables start at 0/FALSE; a bare `max_items = 4` would be checked
        // in the initial state only.
        let space = space();
        let builder = FormulaBuilder::new(None).with_test_rule("G(step != error)");
        let formula = builder.build(
            &space,
            &PartialRow::empty(3).with(FactorId::new(1), 1).with(FactorId::new(2), 1),
        );
        assert_eq!(
            formula,
            "(G(step != error)) & (F(G((max_items = 4) & (!(removed_ever)) \
             & ((max_items = 3 | max_items = 4 | max_items = 5)))))"
        );
        assert_eq!(builder.template(), "F(G({conditions}))");
    }

    #[test]
    fn test_boolean_only_space_has_no_guard() {
        let space = FactorSpace::new(vec![Factor::boolean("x", "x", None), Factor::boolean("y", "y", None)]).unwrap();
        let builder = FormulaBuilder::new(None);
        assert_eq!(builder.domain_guard(&space), None);
        let formula = builder.build_row_formula(&space, &Row::new(vec![0, 1]));
        assert_eq!(formula, "(TRUE) & (F(G((!(x)) & (y))))");
    }

    #[test]
    fn test_end_flag_placeholder_in_test_rule() {
        let builder = FormulaBuilder::new(Some("done".to_string())).with_test_rule("G({end_flag} -> X {end_flag})");
        assert_eq!(builder.test_rule(), "G(done -> X done)");
    }

    #[test]
    fn test_validate() {
        let builder = FormulaBuilder::new(None).with_template("F(end)");
        assert!(matches!(builder.validate(), Err(ConfigError::MissingPlaceholder(_))));
        let builder = FormulaBuilder::new(None).with_test_rule("G(x");
        assert!(matches!(builder.validate(), Err(ConfigError::UnbalancedFormula { .. })));
        assert!(FormulaBuilder::new(Some("end".to_string())).validate().is_ok());
    }

    #[test]
    fn test_negate() {
        assert_eq!(negate("F(x)"), "!(F(x))");
        assert_eq!(negate("  !(F(x) & y) "), "!(F(x) & y)");
        assert_eq!(negate("!(a) & (b)"), "!(!(a) & (b))");
        assert_eq!(negate("!a"), "!(!a)");
    }

    #[test]
    fn test_check_balanced() {
        assert!(check_balanced("((a) & F(b))", "x").is_ok());
        assert!(check_balanced("(a))", "x").is_err());
        assert!(check_balanced(")(", "x").is_err());
        assert!(check_balanced("((a)", "x").is_err());
    }
}
