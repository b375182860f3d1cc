use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::{OverlayError, Result, StreamConfig};

/// Persistence collaborator for viewer overrides.
pub trait ViewerStore {
    /// Override saved for `scene_key`, or `None` when absent or unreadable.
    fn load(&self, scene_key: &str) -> Option<StreamConfig>;

    /// Stores (or with `None`, removes) the override for `scene_key`.
    fn save(&self, scene_key: &str, config: Option<&StreamConfig>);
}

impl<T: ViewerStore + ?Sized> ViewerStore for &T {
    fn load(&self, scene_key: &str) -> Option<StreamConfig> {
        (**self).load(scene_key)
    }

    fn save(&self, scene_key: &str, config: Option<&StreamConfig>) {
        (**self).save(scene_key, config)
    }
}

/// djb2 hash of `input` (`h = h * 33 ^ c`, seeded with 5381), as an
/// unsigned 32-bit number.
pub fn string_to_unique_number(input: &str) -> u32 {
    input
        .encode_utf16()
        .fold(5381u32, |h, c| h.wrapping_mul(33) ^ u32::from(c))
}

/// Keeps overrides in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StreamConfig>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ViewerStore for MemoryStore {
    fn load(&self, scene_key: &str) -> Option<StreamConfig> {
        self.entries.lock().ok()?.get(scene_key).cloned()
    }

    fn save(&self, scene_key: &str, config: Option<&StreamConfig>) {
        let Ok(mut entries) = self.entries.lock() else {
            tracing::warn!(scene_key, "viewer store has been poisoned");
            return;
        };
        match config {
            Some(config) => {
                entries.insert(scene_key.to_string(), config.clone());
            }
            None => {
                entries.remove(scene_key);
            }
        }
    }
}

/// One pretty-printed JSON file per scene inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the override of `scene_key`.
    pub fn path_for(&self, scene_key: &str) -> PathBuf {
        self.dir
            .join(format!("viewer-{}.json", string_to_unique_number(scene_key)))
    }

    fn read(&self, scene_key: &str) -> Result<Option<StreamConfig>> {
        let path = self.path_for(scene_key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn write(&self, scene_key: &str, config: Option<&StreamConfig>) -> Result<()> {
        let path = self.path_for(scene_key);
        let Some(config) = config else {
            if path.exists() {
                fs::remove_file(&path)?;
            }
            return Ok(());
        };

        fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&path, content).map_err(OverlayError::from)
    }
}

impl ViewerStore for JsonFileStore {
    fn load(&self, scene_key: &str) -> Option<StreamConfig> {
        match self.read(scene_key) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(scene_key, %err, "ignoring unreadable viewer configuration");
                None
            }
        }
    }

    fn save(&self, scene_key: &str, config: Option<&StreamConfig>) {
        if let Err(err) = self.write(scene_key, config) {
            tracing::warn!(scene_key, %err, "failed to store viewer configuration");
        }
    }
}
