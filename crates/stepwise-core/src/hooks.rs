use std::collections::HashMap;

use serde_json::Value;

use crate::branch::{BranchSelector, BranchState};
use crate::progress::{Payload, ProgressStore, StepData, StoreKeys};
use crate::store::{SessionStore, StoreError};

/// `Ok(false)` keeps the user on the step.
pub type ProcessHook = Box<dyn FnMut(&mut StepContext<'_>, &mut Payload) -> anyhow::Result<bool>>;
pub type PrepareHook = Box<dyn FnMut(&mut StepContext<'_>) -> anyhow::Result<()>>;
pub type CancelHook = Box<dyn FnMut(Option<&str>) -> anyhow::Result<()>>;
pub type CompleteHook = Box<dyn FnMut(&StepData) -> anyhow::Result<()>>;

pub trait PayloadValidator {
    fn validate(&self, owner: &str, data: &Value) -> bool;
}

#[derive(Default)]
pub struct StepHooks {
    process: HashMap<String, ProcessHook>,
    prepare: HashMap<String, PrepareHook>,
    before_cancel: Option<CancelHook>,
    after_complete: Option<CompleteHook>,
    validator: Option<Box<dyn PayloadValidator>>,
}

impl StepHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_process<F>(mut self, step: impl Into<String>, hook: F) -> Self
    where
        F: FnMut(&mut StepContext<'_>, &mut Payload) -> anyhow::Result<bool> + 'static,
    {
        self.process.insert(step.into(), Box::new(hook));
        self
    }

    pub fn on_prepare<F>(mut self, step: impl Into<String>, hook: F) -> Self
    where
        F: FnMut(&mut StepContext<'_>) -> anyhow::Result<()> + 'static,
    {
        self.prepare.insert(step.into(), Box::new(hook));
        self
    }

    pub fn before_cancel<F>(mut self, hook: F) -> Self
    where
        F: FnMut(Option<&str>) -> anyhow::Result<()> + 'static,
    {
        self.before_cancel = Some(Box::new(hook));
        self
    }

    pub fn after_complete<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&StepData) -> anyhow::Result<()> + 'static,
    {
        self.after_complete = Some(Box::new(hook));
        self
    }

    pub fn with_validator(mut self, validator: impl PayloadValidator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn has_process(&self, step: &str) -> bool {
        self.process.contains_key(step)
    }

    pub fn has_prepare(&self, step: &str) -> bool {
        self.prepare.contains_key(step)
    }

    pub(crate) fn process_mut(&mut self, step: &str) -> Option<&mut ProcessHook> {
        self.process.get_mut(step)
    }

    pub(crate) fn prepare_mut(&mut self, step: &str) -> Option<&mut PrepareHook> {
        self.prepare.get_mut(step)
    }

    pub(crate) fn before_cancel_mut(&mut self) -> Option<&mut CancelHook> {
        self.before_cancel.as_mut()
    }

    pub(crate) fn after_complete_mut(&mut self) -> Option<&mut CompleteHook> {
        self.after_complete.as_mut()
    }

    pub(crate) fn validator(&self) -> Option<&dyn PayloadValidator> {
        self.validator.as_deref()
    }
}

pub struct StepContext<'a> {
    step: &'a str,
    branches: BranchSelector<'a>,
    progress: ProgressStore<'a>,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(step: &'a str, store: &'a dyn SessionStore, keys: &'a StoreKeys) -> Self {
        Self {
            step,
            branches: BranchSelector::new(store, keys),
            progress: ProgressStore::new(store, keys),
        }
    }

    pub fn step(&self) -> &str {
        self.step
    }

    pub fn branch(&mut self, name: &str) -> Result<(), StoreError> {
        self.branches.select(name)
    }

    pub fn skip_branch(&mut self, name: &str) -> Result<(), StoreError> {
        self.branches.skip(name)
    }

    pub fn unbranch(&mut self, name: &str) -> Result<(), StoreError> {
        self.branches.clear(name)
    }

    pub fn branch_state(&self, name: &str) -> Result<BranchState, StoreError> {
        self.branches.state_of(name)
    }

    pub fn read(&self, step: &str) -> Result<Option<Payload>, StoreError> {
        self.progress.read_step(step)
    }

    pub fn read_all(&self) -> Result<StepData, StoreError> {
        self.progress.read_all()
    }
}

pub(crate) fn validate_owners(
    validator: Option<&dyn PayloadValidator>,
    owners: &[String],
    payload: &Payload,
) -> bool {
    let Some(validator) = validator else {
        return true;
    };

    payload
        .iter()
        .filter(|(owner, _)| owners.iter().any(|declared| declared == *owner))
        .all(|(owner, data)| validator.validate(owner, data))
}
