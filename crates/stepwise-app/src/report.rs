use anyhow::{Context, Result};
use stepwise_core::branch::{BranchState, BranchStates};
use stepwise_core::definition::WizardDefinition;
use stepwise_core::flatten::flatten;
use stepwise_core::wizard::{StepProgress, WizardState};

use crate::App;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub scope: String,
    pub state: WizardState,
    pub steps: Vec<StepProgress>,
    pub branches: Vec<(String, BranchState)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub scope: String,
    /// Flattened steps with no branch decisions recorded.
    pub default_steps: Vec<String>,
    pub step_count: usize,
    pub branches: Vec<String>,
    pub data_owners: Vec<String>,
}

impl<'a> App<'a> {
    pub fn status(&self, definition: &WizardDefinition) -> Result<StatusReport> {
        let scope = definition.spec.wizard_action.clone();
        let wizard = self.wizard(definition);

        let state = wizard
            .state()
            .with_context(|| format!("failed to read state of wizard '{scope}'"))?;
        let steps = wizard
            .progress_view()
            .with_context(|| format!("failed to read progress of wizard '{scope}'"))?;
        let branches = wizard
            .branch_states()
            .with_context(|| format!("failed to read branch decisions of wizard '{scope}'"))?
            .iter()
            .map(|(name, state)| (name.to_string(), state))
            .collect();

        Ok(StatusReport {
            scope,
            state,
            steps,
            branches,
        })
    }

    pub fn check(&self, definition: &WizardDefinition) -> CheckReport {
        let spec = &definition.spec;
        let default_steps = flatten(&spec.steps, &BranchStates::new(), spec.default_branch);

        CheckReport {
            scope: spec.wizard_action.clone(),
            default_steps: default_steps.as_slice().to_vec(),
            step_count: spec.all_step_names().len(),
            branches: spec
                .all_branch_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            data_owners: spec.data_owners.clone(),
        }
    }
}
