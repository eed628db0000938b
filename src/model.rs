//! Checking that a model declares the variables a run reads.
//!
//! Only the declaration sections of the model text are scanned (`VAR`, `IVAR`,
//! `FROZENVAR`, `DEFINE`); no type or expression is interpreted. A qualified name such as
//! `shop.items` is accepted when its instance `shop` is declared.

use std::collections::BTreeSet;

use log::debug;

use crate::config::Settings;
use crate::error::ConfigError;

const DECLARATION_SECTIONS: &[&str] = &["VAR", "IVAR", "FROZENVAR", "DEFINE"];

const OTHER_SECTIONS: &[&str] = &[
    "MODULE",
    "ASSIGN",
    "INIT",
    "TRANS",
    "INVAR",
    "FAIRNESS",
    "JUSTICE",
    "COMPASSION",
    "CONSTANTS",
    "SPEC",
    "CTLSPEC",
    "LTLSPEC",
    "INVARSPEC",
    "PSLSPEC",
    "COMPUTE",
    "ISA",
    "PRED",
    "MIRROR",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelContract {
    declared: BTreeSet<String>,
}

impl ModelContract {
    pub fn parse(model: &str) -> Self {
        let tokens = tokenize(model);
        let mut declared = BTreeSet::new();
        let mut in_section = false;
        let mut at_start = false;
        let mut depth = 0usize;

        for (i, token) in tokens.iter().enumerate() {
            let token = token.as_str();
            if DECLARATION_SECTIONS.contains(&token) {
                in_section = true;
                at_start = true;
                depth = 0;
                continue;
            }
            if OTHER_SECTIONS.contains(&token) {
                in_section = false;
                continue;
            }
            if !in_section {
                continue;
            }
            match token {
                "case" => depth += 1,
                "esac" => depth = depth.saturating_sub(1),
                ";" if depth == 0 => {
                    at_start = true;
                    continue;
                }
                _ => {}
            }
            if at_start {
                let next = tokens.get(i + 1).map(String::as_str);
                if is_word(token) && matches!(next, Some(":") | Some(":=")) {
                    declared.insert(token.to_string());
                }
                at_start = false;
            }
        }

        debug!("model declares {} name(s)", declared.len());
        Self { declared }
    }

    /// Parse `model` and require every name `settings` reads from traces.
    pub fn check(model: &str, settings: &Settings) -> Result<Self, ConfigError> {
        let contract = Self::parse(model);
        contract.require(settings.required_names())?;
        Ok(contract)
    }

    pub fn declares(&self, name: &str) -> bool {
        let instance = name.split('.').next().unwrap_or(name);
        self.declared.contains(name) || self.declared.contains(instance)
    }

    pub fn declared(&self) -> impl Iterator<Item = &str> {
        self.declared.iter().map(String::as_str)
    }

    pub fn require<I, S>(&self, names: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut missing: Vec<String> = names
            .into_iter()
            .filter(|n| !self.declares(n.as_ref()))
            .map(|n| n.as_ref().to_string())
            .collect();
        missing.dedup();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingObservable(missing))
        }
    }
}

fn is_word(token: &str) -> bool {
    token
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
}

/// Words, `:=`, and single punctuation characters; `--` comments are dropped.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '-' && chars.get(i + 1) == Some(&'-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '_' | '$' | '#')) {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
        } else if c == ':' && chars.get(i + 1) == Some(&'=') {
            tokens.push(":=".to_string());
            i += 2;
        } else {
            tokens.push(c.to_string());
            i += 1;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    const SHOP: &str = "
MODULE main
VAR
  step : {idle, login, add, remove, checkout, logout}; -- the action
  items : 0..5;
  max_items : 0..5;
  removed_ever : boolean;
IVAR
  choice : boolean;
DEFINE
  end_of_test := step = checkout;
  level := case items > 3 : 2; items > 0 : 1; TRUE : 0; esac;
  no_logout_after_add := TRUE;
ASSIGN
  init(step) := idle;
  next(items) := case step = add : items + 1; TRUE : items; esac;
LTLSPEC G(items <= 5)
";

    #[test]
    fn test_declared_names() {
        let contract = ModelContract::parse(SHOP);
        let declared: Vec<&str> = contract.declared().collect();
        assert_eq!(
            declared,
            vec![
                "choice",
                "end_of_test",
                "items",
                "level",
                "max_items",
                "no_logout_after_add",
                "removed_ever",
                "step",
            ]
        );
    }

    #[test]
    fn test_require() {
        let contract = ModelContract::parse(SHOP);
        assert!(contract.require(["step", "max_items", "end_of_test"]).is_ok());
        assert_eq!(
            contract.require(["step", "cart_size", "done"]),
            Err(ConfigError::MissingObservable(vec!["cart_size".to_string(), "done".to_string()]))
        );
    }

    #[test]
    fn test_comments_and_assignments_are_not_declarations() {
        let model = "MODULE main\nVAR\n  -- ghost : boolean;\n  x : boolean;\nASSIGN\n  y := x;\n";
        let contract = ModelContract::parse(model);
        assert!(contract.declares("x"));
        assert!(!contract.declares("ghost"));
        assert!(!contract.declares("y"));
    }

    #[test]
    fn test_qualified_names() {
        let model = "MODULE cart\nVAR n : 0..3;\nMODULE main\nVAR shop : cart;\n";
        let contract = ModelContract::parse(model);
        assert!(contract.declares("shop.n"));
        assert!(!contract.declares("other.n"));
    }

    #[test]
    fn test_check_settings() {
        let json = r#"{
            "factors": [ { "name": "b_max_items", "observable": "max_items", "values": [3, 4] } ],
            "step_var": "step",
            "end_flag": "finished"
        }"#;
        let settings = Settings::from_json(json).unwrap();
        assert_eq!(
            ModelContract::check(SHOP, &settings),
            Err(ConfigError::MissingObservable(vec!["finished".to_string()]))
        );
    }
}
