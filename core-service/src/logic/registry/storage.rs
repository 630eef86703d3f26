//! Model artifact storage
//!
//! Byte-level load/save keyed by hazard. The model validates the bytes;
//! stores only move them.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::logic::features::HazardType;
use crate::logic::model::error::HazardResult;

pub trait ModelStore: Send + Sync {
    /// `Ok(None)` when nothing has been persisted for `hazard`
    fn load(&self, hazard: HazardType) -> HazardResult<Option<Vec<u8>>>;

    fn save(&self, hazard: HazardType, bytes: &[u8]) -> HazardResult<()>;
}

// ============================================================================
// FILE STORE
// ============================================================================

/// `<dir>/<hazard>_model.json`
pub struct FileModelStore {
    dir: PathBuf,
}

impl FileModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, hazard: HazardType) -> PathBuf {
        self.dir.join(format!("{}_model.json", hazard.as_str()))
    }
}

impl ModelStore for FileModelStore {
    fn load(&self, hazard: HazardType) -> HazardResult<Option<Vec<u8>>> {
        match fs::read(self.path_for(hazard)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, hazard: HazardType, bytes: &[u8]) -> HazardResult<()> {
        fs::create_dir_all(&self.dir)?;

        // Write then rename so a crash never leaves a truncated artifact
        let path = self.path_for(hazard);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

#[derive(Default)]
pub struct MemoryModelStore {
    artifacts: RwLock<HashMap<HazardType, Vec<u8>>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, hazard: HazardType, bytes: Vec<u8>) {
        self.artifacts.write().insert(hazard, bytes);
    }

    pub fn contains(&self, hazard: HazardType) -> bool {
        self.artifacts.read().contains_key(&hazard)
    }
}

impl ModelStore for MemoryModelStore {
    fn load(&self, hazard: HazardType) -> HazardResult<Option<Vec<u8>>> {
        Ok(self.artifacts.read().get(&hazard).cloned())
    }

    fn save(&self, hazard: HazardType, bytes: &[u8]) -> HazardResult<()> {
        self.insert(hazard, bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path().join("models"));

        assert!(store.load(HazardType::Flood).unwrap().is_none());

        store.save(HazardType::Flood, b"{\"a\":1}").unwrap();
        assert_eq!(store.load(HazardType::Flood).unwrap().unwrap(), b"{\"a\":1}".to_vec());
        assert!(store.path_for(HazardType::Flood).ends_with("flood_model.json"));
        assert!(store.load(HazardType::Storm).unwrap().is_none());
    }
}
