// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed `ModelStore` for network models (uses platform data dir).

use anm_core::{ModelStore, StoreError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Store model snapshots and settings as JSON files under one directory.
#[derive(Debug, Clone)]
pub struct FsModelStore {
    base: PathBuf,
}

impl FsModelStore {
    /// Create a store rooted at `base`, creating the directory if needed.
    pub fn new(base: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base = base.into();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    /// Create a store rooted at the user data directory (e.g., `~/.local/share/Anm`).
    pub fn default_location() -> Result<Self, StoreError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "Anm")
            .ok_or_else(|| StoreError::Other("could not resolve data dir".into()))?;
        Self::new(proj.data_dir())
    }

    /// Directory holding the stored files.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let filename = format!("{key}.json");
        self.base.join(filename)
    }
}

impl ModelStore for FsModelStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => {
                debug!(path = %path.display(), len = bytes.len(), "loaded");
                Ok(bytes)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        debug!(path = %path.display(), len = data.len(), "saved");
        Ok(())
    }
}
