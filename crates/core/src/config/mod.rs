use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{OverlayError, Result};

pub const ENV_CONFIG_SERVER_URL: &str = "OVERLAY_CONFIG_SERVER_URL";
pub const ENV_STORAGE_DIR: &str = "OVERLAY_STORAGE_DIR";
pub const ENV_ALLOW_RESIZE: &str = "OVERLAY_ALLOW_RESIZE";
pub const ENV_ALLOW_REPOSITION: &str = "OVERLAY_ALLOW_REPOSITION";

/// Top-level configuration structure for the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL (or directory) serving `<scene>.json` canonical configs.
    pub config_server_url: Option<String>,
    /// Directory holding persisted viewer overrides.
    pub storage_dir: PathBuf,
    pub player: PlayerConfig,
    pub editing: EditingConfig,
    pub use_customization: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_server_url: None,
            storage_dir: PathBuf::from(".overlay"),
            player: PlayerConfig::default(),
            editing: EditingConfig::default(),
            use_customization: true,
        }
    }
}

impl AppConfig {
    /// Reads a JSON config file. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            OverlayError::msg(format!("cannot read config {}: {err}", path.display()))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Optional file, then the process environment on top of it.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `OVERLAY_*` overrides looked up through `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_CONFIG_SERVER_URL) {
            self.config_server_url = Some(url);
        }
        if let Some(dir) = lookup(ENV_STORAGE_DIR) {
            self.storage_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_ALLOW_RESIZE) {
            self.editing.allow_resize = parse_flag(ENV_ALLOW_RESIZE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_ALLOW_REPOSITION) {
            self.editing.allow_reposition = parse_flag(ENV_ALLOW_REPOSITION, &raw)?;
        }
        Ok(self)
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(OverlayError::msg(format!("{key}: expected a boolean, got `{other}`"))),
    }
}

/// Sizing and timing of the render surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub aspect_ratio: f64,
    /// Surface width the font size ranges are authored against.
    pub base_width_px: f64,
    pub tick_seconds: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: 16.0 / 9.0,
            base_width_px: 1920.0,
            tick_seconds: 1.0,
        }
    }
}

/// Which geometry edits viewers may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditingConfig {
    pub allow_resize: bool,
    pub allow_reposition: bool,
}

impl Default for EditingConfig {
    fn default() -> Self {
        Self {
            allow_resize: true,
            allow_reposition: true,
        }
    }
}
