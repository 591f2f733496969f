//! Credential record persistence.
//!
//! The record is loaded by overlaying whatever the file contains onto a
//! default record, one key at a time, so older or partially corrupt files
//! keep every field that can still be read.

use std::path::{Path, PathBuf};

use magneto_core::{CredentialRecord, DEFAULT_API_BASE_URL};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{default_credentials_path, load_json, save_json};

/// File-backed store for the single [`CredentialRecord`].
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    default_api_base_url: String,
}

impl CredentialStore {
    /// Creates a store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            default_api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Creates a store at the default location.
    pub fn at_default_path() -> Self {
        Self::new(default_credentials_path())
    }

    /// Overrides the API origin given to records that have none.
    #[must_use]
    pub fn with_default_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.default_api_base_url = url.into();
        self
    }

    /// Returns the file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_record(&self) -> CredentialRecord {
        CredentialRecord::new(self.default_api_base_url.clone())
    }

    /// Loads the record, merged with defaults.
    ///
    /// Never fails: a missing or unreadable file yields the default record.
    pub async fn load(&self) -> CredentialRecord {
        let stored = match load_json::<Value>(&self.path).await {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                warn!(path = %self.path.display(), kind = json_kind(&other), "Credential file is not an object, using defaults");
                return self.default_record();
            }
            Err(e) if e.is_not_found() => {
                debug!(path = %self.path.display(), "No credential file, using defaults");
                return self.default_record();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read credentials, using defaults");
                return self.default_record();
            }
        };

        let record = self.merge(stored);
        match record.validate() {
            Ok(()) => record,
            Err(e) => {
                let normalized = record.normalized();
                warn!(error = %e, to = %normalized.auth_status, "Downgrading stored credentials");
                normalized
            }
        }
    }

    /// Overlays stored keys onto the default record, skipping `null`s and any
    /// key whose value cannot be read.
    fn merge(&self, stored: Map<String, Value>) -> CredentialRecord {
        let defaults = self.default_record();
        let Ok(Value::Object(mut merged)) = serde_json::to_value(&defaults) else {
            return defaults;
        };

        for (key, value) in stored {
            if value.is_null() {
                continue;
            }

            let previous = merged.insert(key.clone(), value);
            if serde_json::from_value::<CredentialRecord>(Value::Object(merged.clone())).is_err() {
                warn!(field = %key, "Ignoring unreadable credential field");
                match previous {
                    Some(previous) => merged.insert(key, previous),
                    None => merged.remove(&key),
                };
            }
        }

        let mut record =
            serde_json::from_value::<CredentialRecord>(Value::Object(merged)).unwrap_or(defaults);
        if record.api_base_url.trim().is_empty() {
            record.api_base_url.clone_from(&self.default_api_base_url);
        }
        record
    }

    /// Persists the record.
    ///
    /// Returns false (and logs) on failure; never raises.
    pub async fn save(&self, record: &CredentialRecord) -> bool {
        match self.try_save(record).await {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to save credentials");
                false
            }
        }
    }

    async fn try_save(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        save_json(&self.path, record).await?;
        debug!(path = %self.path.display(), status = %record.auth_status, "Credentials saved");
        Ok(())
    }

    /// Writes a default record if no file exists yet.
    ///
    /// Returns true if the file exists afterwards.
    pub async fn ensure_initialized(&self) -> bool {
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return true;
        }
        info!(path = %self.path.display(), "Initializing credential file");
        self.save(&self.default_record()).await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
