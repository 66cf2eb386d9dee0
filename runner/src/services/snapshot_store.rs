//! Snapshot stores
//!
//! [`MemorySnapshotStore`] keeps snapshots for the lifetime of the process.
//! [`JsonSnapshotStore`] loads them from a JSON file and writes them back on
//! [`JsonSnapshotStore::persist`].

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{RunnerError, RunnerResult};
use crate::traits::{SnapshotKey, SnapshotSlot, SnapshotStore};

/// In-memory store
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: RwLock<BTreeMap<SnapshotKey, Value>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Every recorded key, in key order
    pub fn keys(&self) -> Vec<SnapshotKey> {
        self.entries.read().keys().cloned().collect()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(&self, key: &SnapshotKey) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: SnapshotKey, value: Value) {
        self.entries.write().insert(key, value);
    }
}

/// On-disk layout: unit title -> slot -> value
#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotFile {
    units: BTreeMap<String, UnitSnapshots>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UnitSnapshots {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    positional: Vec<Option<Value>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    named: BTreeMap<String, Value>,
}

/// File-backed store; reads happen from memory, writes reach disk on `persist`
#[derive(Debug)]
pub struct JsonSnapshotStore {
    path: PathBuf,
    memory: MemorySnapshotStore,
}

impl JsonSnapshotStore {
    /// Open the store, loading existing snapshots when the file exists
    pub async fn open(path: impl AsRef<Path>) -> RunnerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let memory = MemorySnapshotStore::new();

        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Self { path, memory }),
            Err(error) => return Err(error.into()),
        };
        let file: SnapshotFile = serde_json::from_str(&raw)?;
        for (unit, snapshots) in file.units {
            for (index, value) in snapshots.positional.into_iter().enumerate() {
                if let Some(value) = value {
                    memory.set(SnapshotKey::indexed(unit.clone(), index), value);
                }
            }
            for (id, value) in snapshots.named {
                memory.set(SnapshotKey::with_id(unit.clone(), id), value);
            }
        }
        debug!("📸 Loaded {} snapshots from {}", memory.len(), path.display());

        Ok(Self { path, memory })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write every snapshot back to the file
    pub async fn persist(&self) -> RunnerResult<()> {
        let json = serde_json::to_string_pretty(&self.to_file())?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|_| RunnerError::SnapshotStoreError {
                operation: "create directory".to_string(),
                path: parent.display().to_string(),
            })?;
        }
        fs::write(&self.path, json).await.map_err(|_| RunnerError::SnapshotStoreError {
            operation: "write".to_string(),
            path: self.path.display().to_string(),
        })?;
        debug!("💾 Persisted {} snapshots to {}", self.memory.len(), self.path.display());
        Ok(())
    }

    /// Group snapshots by unit; the read lock is released before any await
    fn to_file(&self) -> SnapshotFile {
        let mut file = SnapshotFile::default();
        for (key, value) in self.memory.entries.read().iter() {
            let unit = file.units.entry(key.unit.clone()).or_default();
            match &key.slot {
                SnapshotSlot::Index(index) => {
                    if unit.positional.len() <= *index {
                        unit.positional.resize(*index + 1, None);
                    }
                    unit.positional[*index] = Some(value.clone());
                }
                SnapshotSlot::Id(id) => {
                    unit.named.insert(id.clone(), value.clone());
                }
            }
        }
        file
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn get(&self, key: &SnapshotKey) -> Option<Value> {
        self.memory.get(key)
    }

    fn set(&self, key: SnapshotKey, value: Value) {
        self.memory.set(key, value);
    }
}
