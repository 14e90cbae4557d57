use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::names::{NameError, validate_name, validate_step_name};
use crate::spec::{StepSpec, WizardSpec};

pub const DEFINITION_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WizardDefinition {
    pub version: u32,
    #[serde(flatten)]
    pub spec: WizardSpec,
    #[serde(default)]
    pub rules: BTreeMap<String, OwnerRules>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct OwnerRules {
    #[serde(default)]
    pub required: Vec<String>,
}

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("could not resolve home directory for definition path")]
    HomeDirectoryUnavailable,
    #[error("failed to read wizard definition at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse wizard definition at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid wizard definition: {message}")]
    Validation { message: String },
}

pub fn resolve_config_dir() -> Result<PathBuf, DefinitionError> {
    let base_dirs = BaseDirs::new().ok_or(DefinitionError::HomeDirectoryUnavailable)?;
    Ok(base_dirs.home_dir().join(".config").join("stepwise"))
}

pub fn resolve_definition_path() -> Result<PathBuf, DefinitionError> {
    Ok(resolve_config_dir()?.join("wizard.toml"))
}

pub fn resolve_session_dir() -> Result<PathBuf, DefinitionError> {
    Ok(resolve_config_dir()?.join("sessions"))
}

pub fn load_definition(path: &Path) -> Result<WizardDefinition, DefinitionError> {
    let raw = fs::read_to_string(path).map_err(|source| DefinitionError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed = parse_definition(&raw).map_err(|source| DefinitionError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_definition(&parsed)?;
    Ok(parsed)
}

pub fn parse_definition(raw: &str) -> Result<WizardDefinition, toml::de::Error> {
    toml::from_str(raw)
}

pub fn validate_definition(definition: &WizardDefinition) -> Result<(), DefinitionError> {
    if definition.version != DEFINITION_VERSION {
        return Err(validation(format!("version must be {DEFINITION_VERSION}")));
    }

    let spec = &definition.spec;
    if spec.steps.is_empty() {
        return Err(validation("at least one step must be configured"));
    }

    if spec.wizard_action.trim().is_empty() {
        return Err(validation("wizard_action must be non-empty"));
    }

    validate_groups(&spec.steps)?;

    let mut seen_steps = BTreeSet::new();
    for step in spec.all_step_names() {
        validate_step_name(step).map_err(|error| name_error("step", step, error))?;
        if !seen_steps.insert(step) {
            return Err(validation(format!("step '{step}' is declared more than once")));
        }
    }

    let mut seen_branches = BTreeSet::new();
    for branch in spec.all_branch_names() {
        validate_name(branch).map_err(|error| name_error("branch", branch, error))?;
        if !seen_branches.insert(branch) {
            return Err(validation(format!(
                "branch '{branch}' is declared more than once"
            )));
        }
    }

    for owner in &spec.data_owners {
        if owner.trim().is_empty() {
            return Err(validation("data_owners entries must be non-empty"));
        }
    }

    for owner in definition.rules.keys() {
        if !spec.data_owners.iter().any(|declared| declared == owner) {
            return Err(validation(format!(
                "rules declared for '{owner}' which is not listed in data_owners"
            )));
        }
    }

    Ok(())
}

fn validate_groups(steps: &[StepSpec]) -> Result<(), DefinitionError> {
    for step in steps {
        let StepSpec::Group(group) = step else {
            continue;
        };

        if group.branches.is_empty() {
            return Err(validation("branch groups must contain at least one branch"));
        }

        for branch in &group.branches {
            if branch.steps.is_empty() {
                return Err(validation(format!(
                    "branch '{}' must contain at least one step",
                    branch.name
                )));
            }
            validate_groups(&branch.steps)?;
        }
    }

    Ok(())
}

fn name_error(kind: &str, name: &str, error: NameError) -> DefinitionError {
    validation(format!("invalid {kind} name '{name}': {error}"))
}

fn validation(message: impl Into<String>) -> DefinitionError {
    DefinitionError::Validation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_definition_from_toml(raw: &str) -> Result<WizardDefinition, DefinitionError> {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        fs::write(file.path(), raw).expect("write temp definition");
        load_definition(file.path())
    }

    #[test]
    fn accepts_branching_definition_and_keeps_branch_order() {
        let raw = r#"
version = 1
wizard_action = "signup"
auto_validate = true
data_owners = ["Account"]
steps = ["account", { personal = "profile", business = ["company", "billing"] }, "confirm"]

[rules.Account]
required = ["email"]
"#;

        let definition = load_definition_from_toml(raw).expect("valid definition");
        assert_eq!(definition.spec.wizard_action, "signup");
        assert!(definition.spec.auto_validate);
        assert_eq!(
            definition.spec.all_branch_names(),
            vec!["personal", "business"]
        );
        assert_eq!(definition.rules["Account"].required, vec!["email"]);
    }

    #[test]
    fn applies_flag_defaults() {
        let definition = load_definition_from_toml(
            r#"
version = 1
steps = ["a", "b"]
"#,
        )
        .expect("valid definition");

        assert!(definition.spec.auto_advance);
        assert!(definition.spec.default_branch);
        assert!(!definition.spec.lockdown);
        assert_eq!(definition.spec.wizard_action, "wizard");
    }

    #[test]
    fn rejects_unsupported_version() {
        let error = load_definition_from_toml("version = 2\nsteps = [\"a\"]\n")
            .expect_err("definition should fail");
        assert!(error.to_string().contains("version must be 1"));
    }

    #[test]
    fn rejects_definition_without_steps() {
        let error = load_definition_from_toml("version = 1\nsteps = []\n")
            .expect_err("definition should fail");
        assert!(error.to_string().contains("at least one step"));
    }

    #[test]
    fn rejects_duplicate_steps_across_branches() {
        let raw = r#"
version = 1
steps = ["a", { x = "b", y = "a" }]
"#;
        let error = load_definition_from_toml(raw).expect_err("definition should fail");
        assert!(error.to_string().contains("step 'a' is declared more than once"));
    }

    #[test]
    fn rejects_reserved_step_name() {
        let error = load_definition_from_toml("version = 1\nsteps = [\"reset\"]\n")
            .expect_err("definition should fail");
        assert!(error.to_string().contains("invalid step name 'reset'"));
    }

    #[test]
    fn rejects_empty_branch() {
        let raw = r#"
version = 1
steps = ["a", { x = [] }]
"#;
        let error = load_definition_from_toml(raw).expect_err("definition should fail");
        assert!(error.to_string().contains("branch 'x' must contain at least one step"));
    }

    #[test]
    fn rejects_rules_for_undeclared_owner() {
        let raw = r#"
version = 1
steps = ["a"]

[rules.Account]
required = ["email"]
"#;
        let error = load_definition_from_toml(raw).expect_err("definition should fail");
        assert!(error.to_string().contains("not listed in data_owners"));
    }

    #[test]
    fn reports_parse_errors_with_path() {
        let error = load_definition_from_toml("version = \n").expect_err("definition should fail");
        assert!(matches!(error, DefinitionError::Parse { .. }));
        assert!(error.to_string().contains("failed to parse wizard definition"));
    }
}
