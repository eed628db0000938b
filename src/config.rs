//! Run settings loaded from JSON.
//!
//! ```json
//! {
//!   "factors": [
//!     { "name": "a_no_logout", "observable": "no_logout_after_add", "ltl": "no_logout_after_add" },
//!     { "name": "b_max_items", "observable": "max_items", "values": [3, 4, 5] },
//!     { "name": "c_items", "values": [ { "value": 0, "ltl": "items = 0" }, { "value": 1, "ltl": "items > 0" } ] }
//!   ],
//!   "step_var": "step",
//!   "end_flag": "end_of_test",
//!   "idle_step": "idle",
//!   "test_rule": "TRUE",
//!   "template": "F({conditions})",
//!   "oracle": { "binary": "nuXmv", "timeout_secs": 60, "retries": 1 },
//!   "engine": { "completion": "backtracking", "max_nodes": 100000 }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::completion::{BacktrackingCompletion, GreedyCompletion, RowCompletion};
use crate::engine::EngineConfig;
use crate::error::ConfigError;
use crate::extract::TraceExtractor;
use crate::factor::{is_identifier, Factor, FactorSpace};
use crate::formula::FormulaBuilder;
use crate::nuxmv::NuXmvOracle;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub factors: Vec<FactorSettings>,
    /// Model variable naming the action taken in each state.
    pub step_var: String,
    /// Model flag marking the extraction point.
    #[serde(default)]
    pub end_flag: Option<String>,
    #[serde(default)]
    pub idle_step: Option<String>,
    #[serde(default)]
    pub test_rule: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub check_monotonicity: bool,
    #[serde(default)]
    pub oracle: OracleSettings,
    #[serde(default)]
    pub engine: EngineSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactorSettings {
    pub name: String,
    #[serde(default)]
    pub kind: Option<KindSetting>,
    /// Defaults to the factor name.
    #[serde(default)]
    pub observable: Option<String>,
    /// Base atom of a boolean factor.
    #[serde(default)]
    pub ltl: Option<String>,
    #[serde(default)]
    pub values: Vec<ValueSetting>,
    /// Boolean factor that holds while its observable is `FALSE`.
    #[serde(default)]
    pub inverted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindSetting {
    Boolean,
    Integer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSetting {
    Bool(bool),
    Int(i64),
    WithAtom { value: i64, ltl: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleSettings {
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: usize,
    /// Commands run after `read_model`; `["go"]` by default.
    #[serde(default)]
    pub setup: Option<Vec<String>>,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            setup: None,
        }
    }
}

impl OracleSettings {
    pub fn oracle(&self, model: impl Into<PathBuf>) -> NuXmvOracle {
        let oracle = NuXmvOracle::new(model)
            .with_binary(self.binary.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs));
        match &self.setup {
            Some(setup) => oracle.with_setup(setup.clone()),
            None => oracle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionSetting {
    Greedy,
    Backtracking,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSettings {
    #[serde(default = "default_completion")]
    pub completion: CompletionSetting,
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
    #[serde(default = "default_verify")]
    pub verify_assignment: bool,
    #[serde(default)]
    pub max_passes: Option<usize>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            completion: default_completion(),
            max_nodes: default_max_nodes(),
            verify_assignment: default_verify(),
            max_passes: None,
        }
    }
}

impl EngineSettings {
    pub fn completion(&self) -> Box<dyn RowCompletion> {
        match self.completion {
            CompletionSetting::Greedy => Box::new(GreedyCompletion),
            CompletionSetting::Backtracking => Box::new(BacktrackingCompletion::new(self.max_nodes)),
        }
    }
}

fn default_binary() -> PathBuf {
    PathBuf::from("nuXmv")
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retries() -> usize {
    1
}

fn default_completion() -> CompletionSetting {
    CompletionSetting::Backtracking
}

fn default_max_nodes() -> usize {
    BacktrackingCompletion::default().max_nodes()
}

fn default_verify() -> bool {
    true
}

/// The validated pieces a run is assembled from.
#[derive(Debug, Clone)]
pub struct RunParts {
    pub space: FactorSpace,
    pub formulas: FormulaBuilder,
    pub extractor: TraceExtractor,
    pub engine: EngineConfig,
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Malformed(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn space(&self) -> Result<FactorSpace, ConfigError> {
        let factors = self
            .factors
            .iter()
            .map(FactorSettings::to_factor)
            .collect::<Result<Vec<_>, _>>()?;
        FactorSpace::new(factors)
    }

    /// Every name the model must declare: factor observables, the step variable and the flag.
    pub fn required_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factors
            .iter()
            .map(|f| f.observable.clone().unwrap_or_else(|| f.name.clone()))
            .collect();
        names.push(self.step_var.clone());
        names.extend(self.end_flag.clone());
        names
    }

    pub fn into_parts(self) -> Result<RunParts, ConfigError> {
        if !is_identifier(&self.step_var) {
            return Err(ConfigError::InvalidIdentifier(self.step_var));
        }
        if let Some(flag) = &self.end_flag {
            if !is_identifier(flag) {
                return Err(ConfigError::InvalidIdentifier(flag.clone()));
            }
        }

        let space = self.space()?;

        let mut formulas = FormulaBuilder::new(self.end_flag.clone());
        if let Some(rule) = &self.test_rule {
            formulas = formulas.with_test_rule(rule.clone());
        }
        if let Some(template) = &self.template {
            formulas = formulas.with_template(template.clone());
        }
        formulas.validate()?;

        let extractor = TraceExtractor::new(self.step_var.clone())
            .with_termination_flag(self.end_flag.clone())
            .with_idle_step(self.idle_step.clone())
            .with_monotonicity_check(self.check_monotonicity);

        let engine = EngineConfig {
            oracle_retries: self.oracle.retries,
            verify_assignment: self.engine.verify_assignment,
            max_passes: self.engine.max_passes,
        };

        Ok(RunParts {
            space,
            formulas,
            extractor,
            engine,
        })
    }
}

impl FactorSettings {
    fn kind(&self) -> Result<KindSetting, ConfigError> {
        if let Some(kind) = self.kind {
            return Ok(kind);
        }
        let all_bool = self.values.iter().all(|v| matches!(v, ValueSetting::Bool(_)));
        let any_bool = self.values.iter().any(|v| matches!(v, ValueSetting::Bool(_)));
        if self.ltl.is_some() || all_bool {
            Ok(KindSetting::Boolean)
        } else if !any_bool {
            Ok(KindSetting::Integer)
        } else {
            Err(ConfigError::KindMismatch {
                factor: self.name.clone(),
                reason: "boolean and integer values mixed".to_string(),
            })
        }
    }

    pub fn to_factor(&self) -> Result<Factor, ConfigError> {
        let observable = self.observable.clone().unwrap_or_else(|| self.name.clone());
        match self.kind()? {
            KindSetting::Boolean => {
                if self.values.iter().any(|v| !matches!(v, ValueSetting::Bool(_))) {
                    return Err(ConfigError::KindMismatch {
                        factor: self.name.clone(),
                        reason: "boolean factor with non-boolean values".to_string(),
                    });
                }
                if !self.inverted {
                    return Ok(Factor::boolean(self.name.clone(), observable, self.ltl.clone()));
                }
                if self.ltl.is_some() {
                    return Err(ConfigError::KindMismatch {
                        factor: self.name.clone(),
                        reason: "an inverted factor takes its atoms from the observable, not `ltl`".to_string(),
                    });
                }
                Ok(Factor::boolean_inverted(self.name.clone(), observable))
            }
            KindSetting::Integer => {
                if self.inverted {
                    return Err(ConfigError::KindMismatch {
                        factor: self.name.clone(),
                        reason: "only boolean factors can be inverted".to_string(),
                    });
                }
                if self.ltl.is_some() {
                    return Err(ConfigError::KindMismatch {
                        factor: self.name.clone(),
                        reason: "`ltl` applies to boolean factors; give integer atoms per value".to_string(),
                    });
                }
                let mut entries = Vec::with_capacity(self.values.len());
                for value in &self.values {
                    match value {
                        ValueSetting::Int(v) => entries.push((*v, format!("{} = {}", observable, v))),
                        ValueSetting::WithAtom { value, ltl } => entries.push((*value, ltl.clone())),
                        ValueSetting::Bool(b) => {
                            return Err(ConfigError::KindMismatch {
                                factor: self.name.clone(),
                                reason: format!("boolean value {} in an integer factor", b),
                            })
                        }
                    }
                }
                Ok(Factor::integer_with_atoms(self.name.clone(), observable, entries))
            }
        }
    }
}
