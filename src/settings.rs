use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

const CONFIG_DIR: &str = "ndtview";
const CONFIG_FILENAME: &str = "config.toml";

/// Largest value the gauges can show, in Mb/s.
pub const MAX_GAUGE_SCALE: f64 = 10_000.0;
const MIN_GAUGE_SCALE: f64 = 100.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the server discovery service.
    pub discovery_url: String,
    /// Use the TLS variant of the discovery service.
    pub secure: bool,
    /// External NDT client used for the websocket path.
    pub client_command: String,
    /// Replace every backend read with placeholders and run a fixed timeline.
    pub simulate: bool,
    /// Upper bound of both gauges, in Mb/s.
    pub gauge_max: f64,
    pub poll_interval_ms: u64,
    pub transition_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            discovery_url: "https://mlab-ns.appspot.com/".to_string(),
            secure: true,
            client_command: "ndt-client".to_string(),
            simulate: false,
            gauge_max: 1000.0,
            poll_interval_ms: 1000,
            transition_ms: 400,
        }
    }
}

impl Settings {
    pub fn service_variant(&self) -> &'static str {
        if self.secure {
            "ndt_ssl"
        } else {
            "ndt"
        }
    }

    pub fn lookup_url(&self) -> String {
        let base = self.discovery_url.trim_end_matches('/');
        format!("{}/{}?format=json", base, self.service_variant())
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::config("poll_interval_ms must be greater than zero"));
        }
        if !(MIN_GAUGE_SCALE..=MAX_GAUGE_SCALE).contains(&self.gauge_max) {
            return Err(Error::config(format!(
                "gauge_max must be between {} and {}",
                MIN_GAUGE_SCALE, MAX_GAUGE_SCALE
            )));
        }
        if self.client_command.trim().is_empty() {
            return Err(Error::config("client_command must not be empty"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }
}

/// Default location of the config file, `<config_dir>/ndtview/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILENAME))
}

/// Parse and check a TOML settings document.
pub fn parse_settings(content: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(content)?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings from a TOML file, falling back to defaults when the file is
/// missing, unreadable or invalid.
pub fn load_settings(config_path: &Path) -> Settings {
    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    let loaded = std::fs::read_to_string(config_path)
        .map_err(Error::from)
        .and_then(|content| parse_settings(&content));
    match loaded {
        Ok(settings) => {
            debug!("Loaded settings from {:?}", config_path);
            settings
        }
        Err(e) => {
            warn!("Failed to load {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Simulate,
    Secure,
    GaugeMax,
}

impl SettingsField {
    pub fn next(self) -> Self {
        match self {
            SettingsField::Simulate => SettingsField::Secure,
            SettingsField::Secure => SettingsField::GaugeMax,
            SettingsField::GaugeMax => SettingsField::Simulate,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            SettingsField::Simulate => SettingsField::GaugeMax,
            SettingsField::Secure => SettingsField::Simulate,
            SettingsField::GaugeMax => SettingsField::Secure,
        }
    }
}

/// Next gauge scale up the 100 / 1000 / 10000 ladder.
pub fn step_gauge_up(current: f64) -> f64 {
    (current * 10.0).min(MAX_GAUGE_SCALE)
}

pub fn step_gauge_down(current: f64) -> f64 {
    (current / 10.0).max(MIN_GAUGE_SCALE)
}
