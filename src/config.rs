//! Configuration file support for annolab.
//!
//! Editor preferences, key bindings and the label palette are stored as one
//! versioned JSON document so they can be exported and re-imported.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::canvas::InteractionConfig;
use crate::keybindings::KeyBindings;
use crate::model::{DEFAULT_PALETTE, Tool};
use crate::sync::SaveScheduler;
use crate::transform::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, DEFAULT_ZOOM_STEP, ZoomLimits};
use crate::undo::DEFAULT_HISTORY_CAPACITY;

/// Verbosity of the `log` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    /// Loads, saves and label changes.
    #[default]
    Info,
    /// Store mutations and stale responses.
    Debug,
    Trace,
}

impl LogLevel {
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Filter for `env_logger`.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Format version written by this build. Files with a higher version are refused.
pub const CONFIG_VERSION: u32 = 1;

/// Default number of job log lines kept in memory.
pub const DEFAULT_LOG_BACKLOG: usize = 500;

/// Editor tuning knobs. Distances are in screen pixels unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorPreferences {
    pub log_level: LogLevel,
    pub zoom_step: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub history_capacity: usize,
    pub min_box_screen_size: f32,
    /// Image pixels.
    pub min_resize_size: f32,
    pub polygon_close_radius: f32,
    pub drag_threshold: f32,
    pub handle_radius: f32,
    pub auto_save_debounce_secs: u64,
    pub auto_save_interval_secs: u64,
    /// Tool for images that have never been opened.
    pub default_tool: Tool,
    pub log_backlog: usize,
}

impl Default for EditorPreferences {
    fn default() -> Self {
        let interaction = InteractionConfig::default();
        Self {
            log_level: LogLevel::default(),
            zoom_step: DEFAULT_ZOOM_STEP,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            min_box_screen_size: interaction.min_box_screen_size,
            min_resize_size: interaction.min_resize_size,
            polygon_close_radius: interaction.polygon_close_radius,
            drag_threshold: interaction.drag_threshold,
            handle_radius: interaction.handle_radius,
            auto_save_debounce_secs: SaveScheduler::DEFAULT_DEBOUNCE_DELAY.as_secs(),
            auto_save_interval_secs: SaveScheduler::DEFAULT_SAVE_INTERVAL.as_secs(),
            default_tool: Tool::default(),
            log_backlog: DEFAULT_LOG_BACKLOG,
        }
    }
}

impl EditorPreferences {
    /// Zoom bounds; a min above the max is swapped rather than rejected.
    pub fn zoom_limits(&self) -> ZoomLimits {
        let (min, max) = if self.min_zoom <= self.max_zoom {
            (self.min_zoom, self.max_zoom)
        } else {
            (self.max_zoom, self.min_zoom)
        };
        let step = if self.zoom_step > 1.0 {
            self.zoom_step
        } else {
            DEFAULT_ZOOM_STEP
        };
        ZoomLimits { step, min, max }
    }

    pub fn interaction_config(&self) -> InteractionConfig {
        InteractionConfig {
            min_box_screen_size: self.min_box_screen_size,
            min_resize_size: self.min_resize_size,
            polygon_close_radius: self.polygon_close_radius,
            drag_threshold: self.drag_threshold,
            handle_radius: self.handle_radius,
        }
    }

    pub fn scheduler(&self) -> SaveScheduler {
        SaveScheduler::new()
            .with_debounce_delay(Duration::from_secs(self.auto_save_debounce_secs))
            .with_save_interval(Duration::from_secs(self.auto_save_interval_secs))
    }
}

fn default_palette() -> Vec<String> {
    DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
}

/// Everything persisted in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default)]
    pub preferences: EditorPreferences,

    #[serde(default)]
    pub keybindings: KeyBindings,

    /// Colours handed to new labels, round-robin.
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: EditorPreferences::default(),
            keybindings: KeyBindings::default(),
            palette: default_palette(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    pub fn default_filename() -> &'static str {
        "annolab-config.json"
    }

    /// `<config_dir>/annolab/annolab-config.json`, falling back to `~/.config`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;
        Some(base.join("annolab").join(Self::default_filename()))
    }

    /// Read a config file. A missing file yields the defaults.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config file found at {:?}, using defaults", path);
            return Ok(Self::new());
        }
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("📂 Config loaded from {:?}", path);
        Ok(config)
    }

    /// Config from [`Self::default_path`], if one exists and parses.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config at {:?}", path);
            return None;
        }
        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("❌ Ignoring config {:?}: {}", path, e);
                None
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("💾 Config written to {:?}", path);
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Config file failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error(
        "Config version {file_version} was written by a newer annolab (this build reads up to {supported_version})"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    #[error("Config file I/O: {0}")]
    IoError(#[from] std::io::Error),
}
