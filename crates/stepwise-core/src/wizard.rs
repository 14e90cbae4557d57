use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::branch::{BranchSelector, BranchState, BranchStates};
use crate::flatten::{FlatSteps, flatten};
use crate::hooks::{StepContext, StepHooks, validate_owners};
use crate::names::RESET_STEP;
use crate::progress::{Payload, ProgressStore, StepData, StoreKeys};
use crate::spec::WizardSpec;
use crate::store::{SessionStore, StoreError};

pub const CONFIG_WIZARD_ACTION: &str = "wizard_action";
pub const CONFIG_STEPS: &str = "steps";
pub const CONFIG_EXPECTED_STEP: &str = "expected_step";
pub const CONFIG_ACTIVE_STEP: &str = "active_step";

#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("process hook failed for step '{step}': {source}")]
    ProcessHook {
        step: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("prepare hook failed for step '{step}': {source}")]
    PrepareHook {
        step: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("cancel hook failed: {source}")]
    CancelHook {
        #[source]
        source: anyhow::Error,
    },
    #[error("completion hook failed: {source}")]
    CompleteHook {
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Cancel,
    Previous,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub step: Option<String>,
    pub payload: Option<Payload>,
    pub signal: Option<Signal>,
}

impl Request {
    pub fn entry() -> Self {
        Self::default()
    }

    pub fn step(step: impl Into<String>) -> Self {
        Self {
            step: Some(step.into()),
            ..Self::default()
        }
    }

    pub fn reset() -> Self {
        Self::step(RESET_STEP)
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn previous(mut self) -> Self {
        self.signal = Some(Signal::Previous);
        self
    }

    pub fn cancel(mut self) -> Self {
        self.signal = Some(Signal::Cancel);
        self
    }

    fn requested_step(&self) -> Option<&str> {
        self.step
            .as_deref()
            .map(str::trim)
            .filter(|step| !step.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Target {
    /// The wizard action with a step segment.
    Step(String),
    /// The wizard action without a step segment.
    Action(String),
    Url(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step(step) => write!(f, "step {step}"),
            Self::Action(action) => write!(f, "action {action}"),
            Self::Url(url) => write!(f, "url {url}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Render { step: String, data: Option<Payload> },
    Redirect(Target),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    InvalidStep { step: String },
    MissingProcessHook { step: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStep { step } => write!(f, "step validation: '{step}' is not a valid step"),
            Self::MissingProcessHook { step } => write!(
                f,
                "no process hook registered for step '{step}' and auto-validation is disabled"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub outcome: Outcome,
    pub warnings: Vec<Warning>,
}

impl Response {
    fn redirect(target: Target, warnings: Vec<Warning>) -> Self {
        Self {
            outcome: Outcome::Redirect(target),
            warnings,
        }
    }

    pub fn redirect_target(&self) -> Option<&Target> {
        match &self.outcome {
            Outcome::Redirect(target) => Some(target),
            Outcome::Render { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    Idle,
    AwaitingStep(String),
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Expected,
    Pending,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Expected => write!(f, "expected"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepProgress {
    pub step: String,
    pub status: StepStatus,
    pub active: bool,
}

pub struct Wizard<'a> {
    spec: &'a WizardSpec,
    store: &'a dyn SessionStore,
    keys: StoreKeys,
    hooks: StepHooks,
}

impl<'a> Wizard<'a> {
    pub fn new(spec: &'a WizardSpec, store: &'a dyn SessionStore, scope: &str) -> Self {
        Self {
            spec,
            store,
            keys: StoreKeys::new(scope),
            hooks: StepHooks::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: StepHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn scope(&self) -> &str {
        self.keys.scope()
    }

    pub fn spec(&self) -> &WizardSpec {
        self.spec
    }

    pub fn process(&mut self, request: Request) -> Result<Response, WizardError> {
        let flat = self.flat_steps()?;
        self.publish_config(&flat)?;

        let mut warnings = Vec::new();
        let mut auto_reset = self.spec.auto_reset;
        let requested = request.requested_step().map(str::to_string);

        if request.signal == Some(Signal::Cancel) {
            return self.cancel(&flat, warnings);
        }

        match requested.as_deref() {
            None => {
                if let Some(snapshot) = self.progress().completion()? {
                    return self.finish(&snapshot, warnings);
                }
                auto_reset = false;
            }
            Some(RESET_STEP) => {
                if self.spec.lockdown {
                    debug!(scope = self.scope(), "reset ignored under lockdown");
                } else {
                    self.reset()?;
                }
            }
            Some(step) => match self.valid_index(&flat, step)? {
                Some(index) => return self.process_step(&flat, index, request, warnings),
                None => {
                    warn!(scope = self.scope(), step, "requested step is not valid");
                    warnings.push(Warning::InvalidStep {
                        step: step.to_string(),
                    });
                }
            },
        }

        if requested.as_deref() != Some(RESET_STEP) && auto_reset {
            self.reset()?;
        }

        let target = self.redirect_target(None)?;
        Ok(Response::redirect(target, warnings))
    }

    pub fn branch(&self, name: &str, skip: bool) -> Result<(), StoreError> {
        debug!(scope = self.scope(), branch = name, skip, "branch decision");
        let selector = self.branches();
        if skip {
            selector.skip(name)
        } else {
            selector.select(name)
        }
    }

    pub fn unbranch(&self, name: &str) -> Result<(), StoreError> {
        debug!(scope = self.scope(), branch = name, "branch cleared");
        self.branches().clear(name)
    }

    pub fn branch_state(&self, name: &str) -> Result<BranchState, StoreError> {
        self.branches().state_of(name)
    }

    pub fn branch_states(&self) -> Result<BranchStates, StoreError> {
        self.branches().states()
    }

    pub fn reset(&self) -> Result<(), StoreError> {
        info!(scope = self.scope(), "wizard reset");
        self.branches().clear_all()?;
        self.progress().clear()
    }

    pub fn read(&self, step: &str) -> Result<Option<Payload>, StoreError> {
        self.progress().read_step(step)
    }

    pub fn read_all(&self) -> Result<StepData, StoreError> {
        self.progress().read_all()
    }

    pub fn save(&self, step: &str, payload: Payload) -> Result<(), StoreError> {
        self.progress().write_step(step, payload)
    }

    pub fn config(&self, name: &str) -> Result<Option<Value>, StoreError> {
        self.progress().config(name)
    }

    pub fn set_config(&self, name: &str, value: Value) -> Result<(), StoreError> {
        self.progress().set_config(name, value)
    }

    pub fn flat_steps(&self) -> Result<FlatSteps, StoreError> {
        let states = self.branches().states()?;
        Ok(flatten(&self.spec.steps, &states, self.spec.default_branch))
    }

    pub fn expected_step(&self) -> Result<Option<String>, StoreError> {
        let flat = self.flat_steps()?;
        self.expected_in(&flat)
    }

    pub fn redirect_target(&self, step: Option<&str>) -> Result<Target, StoreError> {
        let step = match step {
            Some(step) => Some(step.to_string()),
            None => self.expected_step()?,
        };

        Ok(match step {
            Some(step) => Target::Step(step),
            None => Target::Action(self.spec.wizard_action.clone()),
        })
    }

    pub fn state(&self) -> Result<WizardState, StoreError> {
        let progress = self.progress();
        if progress.is_complete()? {
            return Ok(WizardState::Complete);
        }

        if progress.read_all()?.is_empty() && self.branches().states()?.is_empty() {
            return Ok(WizardState::Idle);
        }

        Ok(match self.expected_step()? {
            Some(step) => WizardState::AwaitingStep(step),
            None => WizardState::Complete,
        })
    }

    pub fn progress_view(&self) -> Result<Vec<StepProgress>, StoreError> {
        let flat = self.flat_steps()?;
        let progress = self.progress();
        let data = progress.read_all()?;
        let expected = progress.expected_index(&flat)?;
        let active = progress
            .config(CONFIG_ACTIVE_STEP)?
            .and_then(|value| value.as_str().map(str::to_string));

        Ok(flat
            .iter()
            .enumerate()
            .map(|(index, step)| StepProgress {
                step: step.to_string(),
                status: if data.contains_key(step) {
                    StepStatus::Completed
                } else if expected == Some(index) {
                    StepStatus::Expected
                } else {
                    StepStatus::Pending
                },
                active: active.as_deref() == Some(step),
            })
            .collect())
    }

    fn process_step(
        &mut self,
        flat: &FlatSteps,
        index: usize,
        request: Request,
        mut warnings: Vec<Warning>,
    ) -> Result<Response, WizardError> {
        let step = flat.get(index).unwrap_or_default().to_string();
        debug!(scope = self.scope(), step = step.as_str(), index, "processing step");

        let submitted = request.payload.filter(|payload| !payload.is_empty());
        let data = match (request.signal, submitted) {
            (Some(Signal::Previous), submitted) => match flat.before(index) {
                Some(previous) => {
                    return Ok(Response::redirect(
                        Target::Step(previous.to_string()),
                        warnings,
                    ));
                }
                None => self.progress().read_step(&step)?.or(submitted),
            },
            (_, Some(mut payload)) => {
                if self.run_process_hook(&step, &mut payload, &mut warnings)? {
                    return self.accept(&step, payload, warnings);
                }
                Some(payload)
            }
            (_, None) => self.progress().read_step(&step)?,
        };

        self.run_prepare_hook(&step)?;
        self.set_config(CONFIG_ACTIVE_STEP, json!(step))?;

        Ok(Response {
            outcome: Outcome::Render { step, data },
            warnings,
        })
    }

    fn run_process_hook(
        &mut self,
        step: &str,
        payload: &mut Payload,
        warnings: &mut Vec<Warning>,
    ) -> Result<bool, WizardError> {
        let store = self.store;
        let keys = &self.keys;

        if let Some(hook) = self.hooks.process_mut(step) {
            let mut context = StepContext::new(step, store, keys);
            return hook(&mut context, payload).map_err(|source| WizardError::ProcessHook {
                step: step.to_string(),
                source,
            });
        }

        if self.spec.auto_validate {
            let proceed = validate_owners(self.hooks.validator(), &self.spec.data_owners, payload);
            debug!(scope = self.scope(), step, proceed, "auto-validated payload");
            return Ok(proceed);
        }

        warn!(scope = self.scope(), step, "no process hook for step");
        warnings.push(Warning::MissingProcessHook {
            step: step.to_string(),
        });
        Ok(false)
    }

    fn run_prepare_hook(&mut self, step: &str) -> Result<(), WizardError> {
        let store = self.store;
        let keys = &self.keys;

        let Some(hook) = self.hooks.prepare_mut(step) else {
            return Ok(());
        };

        let mut context = StepContext::new(step, store, keys);
        hook(&mut context).map_err(|source| WizardError::PrepareHook {
            step: step.to_string(),
            source,
        })
    }

    fn accept(
        &mut self,
        step: &str,
        payload: Payload,
        warnings: Vec<Warning>,
    ) -> Result<Response, WizardError> {
        self.progress().write_step(step, payload)?;

        // The process hook may have changed branch decisions.
        let flat = self.flat_steps()?;
        let Some(index) = flat.index_of(step) else {
            let target = self.redirect_target(None)?;
            return Ok(Response::redirect(target, warnings));
        };

        if let Some(next) = flat.next_after(index) {
            let target = if self.spec.auto_advance {
                self.redirect_target(None)?
            } else {
                Target::Step(next.to_string())
            };
            debug!(scope = self.scope(), step, target = %target, "step accepted");
            return Ok(Response::redirect(target, warnings));
        }

        let snapshot = self.progress().read_all()?;
        self.reset()?;
        self.progress().mark_complete(&snapshot)?;
        info!(scope = self.scope(), steps = snapshot.len(), "wizard completed");

        Ok(Response::redirect(
            Target::Action(self.spec.wizard_action.clone()),
            warnings,
        ))
    }

    fn cancel(&mut self, flat: &FlatSteps, warnings: Vec<Warning>) -> Result<Response, WizardError> {
        let expected = self.expected_in(flat)?;
        if let Some(hook) = self.hooks.before_cancel_mut() {
            hook(expected.as_deref()).map_err(|source| WizardError::CancelHook { source })?;
        }

        self.reset()?;
        info!(scope = self.scope(), "wizard cancelled");
        Ok(Response::redirect(
            Target::Url(self.spec.cancel_url.clone()),
            warnings,
        ))
    }

    fn finish(&mut self, snapshot: &StepData, warnings: Vec<Warning>) -> Result<Response, WizardError> {
        if let Some(hook) = self.hooks.after_complete_mut() {
            hook(snapshot).map_err(|source| WizardError::CompleteHook { source })?;
        }

        self.reset()?;
        info!(scope = self.scope(), "wizard finalized");
        Ok(Response::redirect(
            Target::Url(self.spec.complete_url.clone()),
            warnings,
        ))
    }

    fn valid_index(&self, flat: &FlatSteps, step: &str) -> Result<Option<usize>, StoreError> {
        let Some(index) = flat.index_of(step) else {
            return Ok(None);
        };

        let expected = self.progress().expected_index(flat)?;
        if let Some(expected) = expected {
            self.set_config(CONFIG_EXPECTED_STEP, json!(flat.get(expected)))?;
        }

        let valid = if self.spec.lockdown {
            expected == Some(index)
        } else {
            index <= expected.unwrap_or(flat.len())
        };

        Ok(valid.then_some(index))
    }

    fn expected_in(&self, flat: &FlatSteps) -> Result<Option<String>, StoreError> {
        let expected = self
            .progress()
            .expected_index(flat)?
            .and_then(|index| flat.get(index))
            .map(str::to_string);

        if let Some(step) = &expected {
            self.set_config(CONFIG_EXPECTED_STEP, json!(step))?;
        }

        Ok(expected)
    }

    fn publish_config(&self, flat: &FlatSteps) -> Result<(), StoreError> {
        self.set_config(CONFIG_WIZARD_ACTION, json!(self.spec.wizard_action))?;
        self.set_config(CONFIG_STEPS, json!(flat))
    }

    fn progress(&self) -> ProgressStore<'_> {
        ProgressStore::new(self.store, &self.keys)
    }

    fn branches(&self) -> BranchSelector<'_> {
        BranchSelector::new(self.store, &self.keys)
    }
}
