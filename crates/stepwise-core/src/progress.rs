use std::collections::BTreeMap;

use serde_json::Value;

use crate::flatten::FlatSteps;
use crate::store::{SessionStore, StoreError, read_decoded, write_encoded};

pub type Payload = serde_json::Map<String, Value>;

pub type StepData = BTreeMap<String, Payload>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    scope: String,
    steps: String,
    branches: String,
    config: String,
    complete: String,
}

impl StoreKeys {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            steps: format!("wizard.{scope}.steps"),
            branches: format!("wizard.{scope}.branches"),
            config: format!("wizard.{scope}.config"),
            complete: format!("wizard.{scope}.complete"),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn steps(&self) -> &str {
        &self.steps
    }

    pub fn branches(&self) -> &str {
        &self.branches
    }

    pub fn config(&self) -> &str {
        &self.config
    }

    pub fn complete(&self) -> &str {
        &self.complete
    }
}

pub struct ProgressStore<'a> {
    store: &'a dyn SessionStore,
    keys: &'a StoreKeys,
}

impl<'a> ProgressStore<'a> {
    pub fn new(store: &'a dyn SessionStore, keys: &'a StoreKeys) -> Self {
        Self { store, keys }
    }

    pub fn is_complete(&self) -> Result<bool, StoreError> {
        Ok(self.store.read(self.keys.complete())?.is_some())
    }

    pub fn completion(&self) -> Result<Option<StepData>, StoreError> {
        read_decoded(self.store, self.keys.complete())
    }

    pub fn mark_complete(&self, snapshot: &StepData) -> Result<(), StoreError> {
        write_encoded(self.store, self.keys.complete(), snapshot)
    }

    pub fn read_all(&self) -> Result<StepData, StoreError> {
        let key = self.data_key()?;
        Ok(read_decoded(self.store, key)?.unwrap_or_default())
    }

    pub fn read_step(&self, step: &str) -> Result<Option<Payload>, StoreError> {
        Ok(self.read_all()?.remove(step))
    }

    pub fn write_step(&self, step: &str, payload: Payload) -> Result<(), StoreError> {
        let key = self.data_key()?;
        let mut data: StepData = read_decoded(self.store, key)?.unwrap_or_default();
        data.insert(step.to_string(), payload);
        write_encoded(self.store, key, &data)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.delete(self.keys.steps())?;
        self.store.delete(self.keys.complete())
    }

    pub fn expected_index(&self, flat: &FlatSteps) -> Result<Option<usize>, StoreError> {
        let data = self.read_all()?;
        Ok(flat.iter().position(|step| !data.contains_key(step)))
    }

    pub fn config(&self, name: &str) -> Result<Option<Value>, StoreError> {
        let config: Option<serde_json::Map<String, Value>> =
            read_decoded(self.store, self.keys.config())?;
        Ok(config.and_then(|mut values| values.remove(name)))
    }

    pub fn set_config(&self, name: &str, value: Value) -> Result<(), StoreError> {
        let mut config: serde_json::Map<String, Value> =
            read_decoded(self.store, self.keys.config())?.unwrap_or_default();
        config.insert(name.to_string(), value);
        write_encoded(self.store, self.keys.config(), &config)
    }

    fn data_key(&self) -> Result<&'a str, StoreError> {
        if self.is_complete()? {
            return Ok(self.keys.complete());
        }
        Ok(self.keys.steps())
    }
}
