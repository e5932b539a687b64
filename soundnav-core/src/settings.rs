//! Named string settings that persist across sessions (paths, last endpoint).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::{Result, SoundNavError};
use crate::paths;

pub const PURE_DATA_EXECUTABLE_KEY: &str = "OpenSoundControl/PureDataExecutablePath";
pub const PURE_DATA_PATCH_KEY: &str = "OpenSoundControl/PureDataConfigurationFilePath";
pub const HOSTNAME_KEY: &str = "SoundNav/ConnectionHostName";
pub const PORT_KEY: &str = "SoundNav/ConnectionPort";

pub trait Settings {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Settings kept in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: BTreeMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Settings for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings stored as a flat JSON object, rewritten on every change.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileSettings {
    /// `<config dir>/soundnav/settings.json`.
    pub fn open_default() -> Self {
        Self::open(paths::settings_file())
    }

    /// Load from `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(target: "settings", "ignoring malformed settings {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| storage_error(&self.path, e))?;
        }
        let contents = serde_json::to_string_pretty(&self.values)
            .map_err(|e| storage_error(&self.path, e))?;
        fs::write(&self.path, contents).map_err(|e| storage_error(&self.path, e))
    }
}

fn storage_error(path: &Path, e: impl std::fmt::Display) -> SoundNavError {
    SoundNavError::Configuration(format!("could not write settings {}: {}", path.display(), e))
}

impl Settings for FileSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }
}

/// Parse a port stored as text.
pub fn parse_port(value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| SoundNavError::Configuration(format!("invalid port {:?} (expected 0-65535)", value)))
}
