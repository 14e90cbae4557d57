use std::sync::Mutex;

use serde_json::Value;

use crate::progress::Payload;
use crate::store::{MemoryStore, SessionStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Read(String),
    Write(String),
    Delete(String),
}

#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<StoreCall>>,
    fail_writes: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl SessionStore for RecordingStore {
    fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.record(StoreCall::Read(key.to_string()));
        self.inner.read(key)
    }

    fn write(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.record(StoreCall::Write(key.to_string()));
        if self.fail_writes {
            return Err(StoreError::Unavailable {
                message: "writes disabled".to_string(),
            });
        }
        self.inner.write(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.record(StoreCall::Delete(key.to_string()));
        self.inner.delete(key)
    }
}

pub fn payload(value: Value) -> Payload {
    value.as_object().cloned().expect("object payload")
}
