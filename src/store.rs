// src/store.rs
//
// Whole-collection JSON persistence. Each collection is one file under the
// data directory; reads and writes always cover the entire value, never a
// partial update. A missing or unreadable file reads as "no data" so a
// corrupted snapshot can never take the service down.

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Collection names. Matches the storage keys of the browser-era system so
/// exported data maps one-to-one.
pub mod keys {
    pub const SHIFTS: &str = "shifts";
    pub const CLOCK_RECORDS: &str = "clock_records";
    pub const CUSTOM_SHIFT_SLOTS: &str = "custom_shift_slots";
    pub const LAST_STAFF_ID: &str = "last_staff_id";
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Reads an entire collection. Absence and parse failures both come
    /// back as `None`; a parse failure additionally logs a warning.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        if !path.exists() {
            return None;
        }
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("failed to read {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Replaces an entire collection.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)?;
        debug!("wrote collection {} to {}", key, path.display());
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// Fresh store under a throwaway directory.
#[cfg(test)]
pub fn temp_store(label: &str) -> LocalStore {
    let dir = std::env::temp_dir().join(format!(
        "cafeshift-{}-{}",
        label,
        crate::dates::generate_id()
    ));
    LocalStore::new(dir).expect("temp dir is writable")
}
