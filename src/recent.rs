//! Recent-documents list.
//!
//! Every accepted file is registered here before it is processed, standing in
//! for the operating system's "recent documents" menu. Registration is
//! best-effort: the pipeline logs failures and carries on.
//!
//! The list is a JSON array of absolute paths, most recent first,
//! de-duplicated and capped at [`MAX_ENTRIES`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Maximum number of entries kept.
pub const MAX_ENTRIES: usize = 10;

#[derive(Error, Debug)]
pub enum RecentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sink for "this file was just opened" notifications.
pub trait RecentDocuments: Sync {
    fn add(&self, path: &Path) -> Result<(), RecentError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecentManifest {
    entries: Vec<PathBuf>,
}

/// Recent-documents list persisted to a JSON file.
///
/// Writes are serialized through an internal lock so concurrent jobs do not
/// lose each other's entries.
pub struct RecentFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl RecentFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Current entries, most recent first. A missing file reads as empty.
    pub fn entries(&self) -> Result<Vec<PathBuf>, RecentError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.load()?.entries)
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<(), RecentError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.save(&RecentManifest::default())
    }

    fn load(&self) -> Result<RecentManifest, RecentError> {
        if !self.path.exists() {
            return Ok(RecentManifest::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, manifest: &RecentManifest) -> Result<(), RecentError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(manifest)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl RecentDocuments for RecentFile {
    fn add(&self, path: &Path) -> Result<(), RecentError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let absolute = std::path::absolute(path)?;

        let mut manifest = self.load()?;
        manifest.entries.retain(|p| p != &absolute);
        manifest.entries.insert(0, absolute);
        manifest.entries.truncate(MAX_ENTRIES);
        self.save(&manifest)
    }
}
