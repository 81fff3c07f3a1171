//! Configuration: runtime defaults and the persisted printer preference.
//!
//! The settings file is TOML with a single `[Settings]` section holding the
//! `printer` key. It is created on first write, read once at startup and
//! rewritten whole on every printer change.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::preview::PREVIEW_EDGE;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Runtime configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub preview_edge: u32,
    /// Bound on waiting for an image element on a blob page
    pub browser_wait: Duration,
    /// `None` keeps the HTTP client default
    pub http_timeout: Option<Duration>,
    pub pdf_target_width: i32,
    pub pdf_max_height: i32,
    pub document_title: String,
    /// Where temporary PDF and print files are created
    pub temp_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preview_edge: PREVIEW_EDGE,
            browser_wait: Duration::from_secs(10),
            http_timeout: None,
            pdf_target_width: 2480,
            pdf_max_height: 3508,
            document_title: "QR Code Print".to_string(),
            temp_dir: std::env::temp_dir(),
        }
    }
}

/// Persisted user settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printer: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(rename = "Settings", default)]
    settings: Settings,
}

/// Reads and writes the settings file
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/qrprint/config.toml`, or `./config.toml` when the
    /// platform has no config directory
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("qrprint"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings; a missing file yields empty settings
    pub fn try_load(&self) -> Result<Settings, ConfigError> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let file: SettingsFile = toml::from_str(&content)?;
        Ok(file.settings)
    }

    /// Load settings, falling back to empty settings on any error
    pub fn load(&self) -> Settings {
        self.try_load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings from {}: {}", self.path.display(), e);
            Settings::default()
        })
    }

    /// Overwrite the printer key and rewrite the whole file
    pub fn save_printer(&self, printer: &str) -> Result<(), ConfigError> {
        let mut settings = self.load();
        settings.printer = Some(printer.to_string());
        self.save(&settings)
    }

    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = SettingsFile {
            settings: settings.clone(),
        };
        std::fs::write(&self.path, toml::to_string(&file)?)?;
        tracing::debug!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

/// Pick the startup printer: the saved one if still registered, otherwise
/// the first registered printer, otherwise none.
pub fn initial_printer(saved: Option<&str>, printers: &[String]) -> Option<String> {
    saved
        .and_then(|name| printers.iter().find(|p| p.as_str() == name))
        .or_else(|| printers.first())
        .cloned()
}
