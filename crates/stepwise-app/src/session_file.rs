use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stepwise_core::names::sanitize_session_name;
use stepwise_core::store::{SessionStore, StoreError};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

const SESSION_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SessionFile {
    version: u32,
    updated_at: String,
    #[serde(default)]
    values: BTreeMap<String, Value>,
}

/// Session store backed by one JSON file per session name. Every write
/// rewrites the file through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

pub fn session_path(session_dir: &Path, session: &str) -> PathBuf {
    session_dir.join(format!("{}.json", sanitize_session_name(session)))
}

impl FileSessionStore {
    pub fn open(session_dir: &Path, session: &str) -> Self {
        Self {
            path: session_path(session_dir, session),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn updated_at(&self) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.map(|file| file.updated_at))
    }

    fn load(&self) -> Result<Option<SessionFile>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;

        let file: SessionFile = serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        if file.version != SESSION_VERSION {
            return Err(StoreError::Unavailable {
                message: format!(
                    "session file {} has unsupported version {}",
                    self.path.display(),
                    file.version
                ),
            });
        }

        Ok(Some(file))
    }

    fn values(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        Ok(self.load()?.map(|file| file.values).unwrap_or_default())
    }

    fn save(&self, values: BTreeMap<String, Value>) -> Result<(), StoreError> {
        if values.is_empty() {
            return self.remove_file();
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let updated_at =
            OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .map_err(|error| StoreError::Unavailable {
                    message: format!("failed to format session timestamp: {error}"),
                })?;

        let file = SessionFile {
            version: SESSION_VERSION,
            updated_at,
            values,
        };
        let serialized = serde_json::to_string_pretty(&file).map_err(StoreError::Serialize)?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, serialized).map_err(|source| StoreError::Write {
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, &self.path).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), "session file written");
        Ok(())
    }

    fn remove_file(&self) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Ok(());
        }

        fs::remove_file(&self.path).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "session file removed");
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values()?.remove(key))
    }

    fn write(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.values()?;
        values.insert(key.to_string(), value);
        self.save(values)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values()?;
        if values.remove(key).is_none() {
            return Ok(());
        }
        self.save(values)
    }
}
