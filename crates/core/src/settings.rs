use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Macro opened on startup
    pub macro_path: Option<PathBuf>,
    /// Device node of the controller emulator
    pub device: Option<PathBuf>,
    /// Record frames instead of opening the device
    pub stub: bool,
    pub loop_enabled: bool,
    /// Loop count; negative loops until stopped
    pub loop_times: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            macro_path: None,
            device: None,
            stub: false,
            loop_enabled: false,
            loop_times: -1,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Loop count for a plain "run": `None` unless looping is enabled.
    pub fn loop_count(&self) -> Option<i32> {
        self.loop_enabled.then_some(self.loop_times)
    }
}
