//! Channel selection persistence.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::persistence::{default_selection_path, load_json_or_default, save_json};

/// On-disk format: `{"selected": [ids]}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SelectionFile {
    #[serde(default)]
    selected: BTreeSet<String>,
}

/// File-backed set of channel identifiers the user wants to see.
#[derive(Debug)]
pub struct SelectionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SelectionStore {
    /// Creates a store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Creates a store at the default location.
    pub fn at_default_path() -> Self {
        Self::new(default_selection_path())
    }

    /// Returns the file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the selection. Missing or unreadable files yield an empty set.
    pub async fn load(&self) -> BTreeSet<String> {
        load_json_or_default::<SelectionFile>(&self.path).await.selected
    }

    /// Persists the selection. Returns false (and logs) on failure.
    pub async fn save(&self, selected: &BTreeSet<String>) -> bool {
        self.write(selected).await.is_ok()
    }

    async fn write(&self, selected: &BTreeSet<String>) -> Result<(), StoreError> {
        let file = SelectionFile {
            selected: selected.clone(),
        };
        if let Err(e) = save_json(&self.path, &file).await {
            warn!(path = %self.path.display(), error = %e, "Failed to save selection");
            return Err(e);
        }
        debug!(count = selected.len(), "Selection saved");
        Ok(())
    }

    /// Returns true if `channel_id` is selected.
    pub async fn contains(&self, channel_id: &str) -> bool {
        self.load().await.contains(channel_id)
    }

    /// Adds or removes `channel_id` and returns the updated set.
    ///
    /// # Errors
    ///
    /// Returns an error if the updated set cannot be written. The file is
    /// left as it was.
    pub async fn toggle(&self, channel_id: &str) -> Result<BTreeSet<String>, StoreError> {
        let _guard = self.lock.lock().await;

        let mut selected = self.load().await;
        if !selected.remove(channel_id) {
            selected.insert(channel_id.to_string());
        }
        debug!(channel_id, selected = selected.contains(channel_id), "Toggled channel");

        self.write(&selected).await?;
        Ok(selected)
    }
}
