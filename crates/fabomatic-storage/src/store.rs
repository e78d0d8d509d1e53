//! Settings store backed by a JSON file.
//!
//! A corrupt or incompatible file reads as "no settings": the board falls
//! back to its defaults instead of refusing to boot, and the next save
//! overwrites the bad blob.

#![allow(async_fn_in_trait)]

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::settings::SavedSettings;

/// Persistence seam for the settings blob.
pub trait SettingsStore: Send {
    /// Load the settings, if a compatible blob exists.
    async fn load(&self) -> Result<Option<SavedSettings>>;

    /// Persist the settings, replacing any previous blob.
    async fn save(&self, settings: &SavedSettings) -> Result<()>;

    /// Remove the persisted blob, if any.
    async fn clear(&self) -> Result<()>;
}

/// File-backed store writing one JSON document.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> Result<Option<SavedSettings>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let settings: SavedSettings = match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "corrupt settings file, ignoring");
                return Ok(None);
            }
        };
        if !settings.is_compatible() {
            warn!(path = %self.path.display(), "settings version mismatch, ignoring");
            return Ok(None);
        }
        Ok(Some(settings))
    }

    async fn save(&self, settings: &SavedSettings) -> Result<()> {
        let json = serde_json::to_string_pretty(settings)?;
        // Write to a sibling file first so a power cut mid-write cannot
        // destroy the previous blob.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        info!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
