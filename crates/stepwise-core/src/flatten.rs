use serde::Serialize;

use crate::branch::{BranchState, BranchStates};
use crate::spec::{Branch, BranchGroup, StepSpec};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlatSteps(Vec<String>);

impl FlatSteps {
    pub fn index_of(&self, step: &str) -> Option<usize> {
        self.0.iter().position(|candidate| candidate == step)
    }

    pub fn contains(&self, step: &str) -> bool {
        self.index_of(step).is_some()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn next_after(&self, index: usize) -> Option<&str> {
        self.get(index + 1)
    }

    pub fn before(&self, index: usize) -> Option<&str> {
        index.checked_sub(1).and_then(|previous| self.get(previous))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for FlatSteps {
    fn from(steps: Vec<String>) -> Self {
        Self(steps)
    }
}

pub fn flatten(steps: &[StepSpec], branches: &BranchStates, default_branch: bool) -> FlatSteps {
    let mut flat = Vec::new();
    flatten_into(steps, branches, default_branch, &mut flat);
    FlatSteps(flat)
}

fn flatten_into(
    steps: &[StepSpec],
    branches: &BranchStates,
    default_branch: bool,
    flat: &mut Vec<String>,
) {
    for step in steps {
        match step {
            StepSpec::Step(name) => flat.push(name.clone()),
            StepSpec::Group(group) => {
                if let Some(branch) = choose_branch(group, branches, default_branch) {
                    flatten_into(&branch.steps, branches, default_branch, flat);
                }
            }
        }
    }
}

/// The most recently selected branch wins; otherwise, with `default_branch`,
/// the first branch that has not been skipped.
pub fn choose_branch<'g>(
    group: &'g BranchGroup,
    branches: &BranchStates,
    default_branch: bool,
) -> Option<&'g Branch> {
    let selected = group
        .branches
        .iter()
        .filter_map(|branch| {
            branches
                .selection_rank(&branch.name)
                .map(|rank| (rank, branch))
        })
        .max_by_key(|(rank, _)| *rank)
        .map(|(_, branch)| branch);

    if selected.is_some() || !default_branch {
        return selected;
    }

    group
        .branches
        .iter()
        .find(|branch| branches.state_of(&branch.name) != BranchState::Skipped)
}
