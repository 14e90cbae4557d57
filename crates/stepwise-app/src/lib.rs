use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use stepwise_core::definition::{WizardDefinition, load_definition, resolve_definition_path};
use stepwise_core::hooks::StepHooks;
use stepwise_core::store::SessionStore;
use stepwise_core::wizard::Wizard;
use tracing::info;

mod navigate;
mod report;
pub mod rules;
mod session_file;

pub use navigate::{FieldAssignment, StepRequest, StepResult, parse_assignment};
pub use report::{CheckReport, StatusReport};
pub use session_file::{FileSessionStore, session_path};

use rules::RuleValidator;

pub struct App<'a> {
    pub store: &'a dyn SessionStore,
}

impl<'a> App<'a> {
    pub fn new(store: &'a dyn SessionStore) -> Self {
        Self { store }
    }

    pub fn ensure_definition_ready(&self, path: Option<&Path>) -> Result<WizardDefinition> {
        let definition_path = match path {
            Some(path) => path.to_path_buf(),
            None => resolve_definition_path().context("failed to resolve definition path")?,
        };

        if !definition_path.exists() {
            bail!(
                "missing wizard definition at {}\nCreate ~/.config/stepwise/wizard.toml or pass --definition.",
                definition_path.display()
            );
        }

        load_definition(&definition_path).map_err(|error| {
            anyhow!(
                "invalid wizard definition at {}: {error}\nFix the definition and retry.",
                definition_path.display()
            )
        })
    }

    pub fn branch(&self, definition: &WizardDefinition, name: &str, skip: bool) -> Result<()> {
        ensure_declared_branch(definition, name)?;
        self.wizard(definition)
            .branch(name, skip)
            .with_context(|| format!("failed to record decision for branch '{name}'"))?;
        info!(branch = name, skip, "branch decision recorded");
        Ok(())
    }

    pub fn unbranch(&self, definition: &WizardDefinition, name: &str) -> Result<()> {
        ensure_declared_branch(definition, name)?;
        self.wizard(definition)
            .unbranch(name)
            .with_context(|| format!("failed to clear decision for branch '{name}'"))
    }

    pub fn reset(&self, definition: &WizardDefinition) -> Result<()> {
        self.wizard(definition)
            .reset()
            .with_context(|| format!("failed to reset wizard '{}'", definition.spec.wizard_action))
    }

    fn wizard<'d>(&'d self, definition: &'d WizardDefinition) -> Wizard<'d> {
        let hooks =
            StepHooks::new().with_validator(RuleValidator::new(definition.rules.clone()));
        Wizard::new(&definition.spec, self.store, &definition.spec.wizard_action).with_hooks(hooks)
    }
}

fn ensure_declared_branch(definition: &WizardDefinition, name: &str) -> Result<()> {
    let declared = definition.spec.all_branch_names();
    if declared.contains(&name) {
        return Ok(());
    }

    if declared.is_empty() {
        bail!("unknown branch '{name}': the definition declares no branches");
    }

    bail!(
        "unknown branch '{name}'; declared branches: {}",
        declared.join(", ")
    )
}
