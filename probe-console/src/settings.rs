//! Application settings

use std::path::{Path, PathBuf};

use probe_session::SessionConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine settings path")]
    NoConfigDir,

    #[error("failed to write settings to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Device endpoint, `host:port`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Run length used when `start` is given no arguments
    #[serde(default = "default_duration_secs")]
    pub default_duration_secs: u32,
    /// Sample interval used when `start` is given no arguments
    #[serde(default = "default_rate_ms")]
    pub default_rate_ms: u32,
    /// Session tuning
    #[serde(default)]
    pub session: SessionConfig,
    /// Receive loop period in milliseconds
    #[serde(default = "default_poll_period_ms")]
    pub poll_period_ms: u64,
    /// Display redraw period in milliseconds
    #[serde(default = "default_display_refresh_ms")]
    pub display_refresh_ms: u64,
    /// Directory for exported reports
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
}

fn default_endpoint() -> String {
    "127.0.0.1:49181".to_string()
}

fn default_duration_secs() -> u32 {
    10
}

fn default_rate_ms() -> u32 {
    250
}

fn default_poll_period_ms() -> u64 {
    1
}

fn default_display_refresh_ms() -> u64 {
    250
}

fn default_report_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            default_duration_secs: default_duration_secs(),
            default_rate_ms: default_rate_ms(),
            session: SessionConfig::default(),
            poll_period_ms: default_poll_period_ms(),
            display_refresh_ms: default_display_refresh_ms(),
            report_dir: default_report_dir(),
        }
    }
}

impl Settings {
    /// Get the XDG config directory for probekit
    /// Uses $XDG_CONFIG_HOME/probekit on Linux/macOS, falls back to ~/.config/probekit
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("probekit"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("probekit"))
    }

    /// Default settings file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from `path`, or the default path; missing or corrupt files yield defaults
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path(),
        };
        path.and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save settings to `path`, or the default path
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, SettingsError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path().ok_or(SettingsError::NoConfigDir)?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|source| SettingsError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("probekit-settings-{}-{}", std::process::id(), name))
            .join("settings.json")
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.endpoint, "127.0.0.1:49181");
        assert_eq!(settings.session.window_size, 20);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"endpoint":"10.0.0.2:5000"}"#).unwrap();
        assert_eq!(settings.endpoint, "10.0.0.2:5000");
        assert_eq!(settings.default_rate_ms, 250);
        assert_eq!(settings.session, SessionConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip");
        let settings = Settings {
            endpoint: "192.168.1.20:49181".to_string(),
            default_duration_secs: 3,
            ..Default::default()
        };
        settings.save(Some(&path)).unwrap();
        assert_eq!(Settings::load(Some(&path)), settings);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let path = temp_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load(Some(&path)), Settings::default());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
