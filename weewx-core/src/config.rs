use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

use crate::{
    error::ConfigError,
    model::ResourceKind,
    paths::{Paths, write_atomic},
};

/// Settings URL shipped as an example; never a usable manifest.
pub const EXAMPLE_SETTINGS_URL: &str = "https://example.com/weewx/inigo-settings.txt";

/// Provider selected when a manifest does not name one.
pub const DEFAULT_FCTYPE: &str = "yahoo";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// settings_url = "https://example.com/weewx/inigo-settings.txt"
/// fctype = "weather.gov"
/// forecast_url = "https://forecast.weather.gov/MapClick.php?lat=..."
/// metric = true
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub settings_url: String,
    pub data_url: String,
    pub rad_type: String,
    pub radar_url: String,
    pub fctype: String,
    pub forecast_url: String,
    pub webcam_url: String,
    pub custom_url: String,

    pub indoor_readings: bool,
    pub dark_theme: bool,
    pub metric: bool,
    pub show_radar: bool,
    pub use_icons: bool,
    pub saved: bool,
    pub update_freq: u8,
    pub wifi_download: bool,

    pub icon_version: u32,
    /// Town name for bom.gov.au forecasts, taken from the manifest.
    pub bom_town: String,
    /// Place name resolved by the met.ie reverse geocoder.
    pub met_ie_place: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_url: EXAMPLE_SETTINGS_URL.to_string(),
            data_url: String::new(),
            rad_type: "image".to_string(),
            radar_url: String::new(),
            fctype: DEFAULT_FCTYPE.to_string(),
            forecast_url: String::new(),
            webcam_url: String::new(),
            custom_url: String::new(),
            indoor_readings: false,
            dark_theme: false,
            metric: true,
            show_radar: true,
            use_icons: false,
            saved: false,
            update_freq: 1,
            wifi_download: false,
            icon_version: 0,
            bom_town: String::new(),
            met_ie_place: String::new(),
        }
    }
}

impl Config {
    /// URL committed for a resource slot, empty when unset.
    pub fn url_for(&self, kind: ResourceKind) -> &str {
        match kind {
            ResourceKind::PrimaryFeed => &self.data_url,
            ResourceKind::Radar => &self.radar_url,
            ResourceKind::Forecast => &self.forecast_url,
            ResourceKind::Webcam => &self.webcam_url,
            ResourceKind::Custom => &self.custom_url,
            ResourceKind::IconBundle => crate::icons::ICON_URL,
        }
    }

    pub fn radar_is_image(&self) -> bool {
        self.rad_type != "webpage"
    }

    /// Copy the user-facing preferences into this config.
    pub fn apply_preferences(&mut self, prefs: &Preferences) {
        self.settings_url = prefs.settings_url.clone();
        self.indoor_readings = prefs.indoor_readings;
        self.dark_theme = prefs.dark_theme;
        self.metric = prefs.metric;
        self.show_radar = prefs.show_radar;
        self.use_icons = prefs.use_icons;
        self.update_freq = if prefs.update_freq > 5 {
            1
        } else {
            prefs.update_freq
        };
        self.wifi_download = prefs.wifi_download;
        self.saved = true;
    }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            settings_url: self.settings_url.clone(),
            indoor_readings: self.indoor_readings,
            dark_theme: self.dark_theme,
            metric: self.metric,
            show_radar: self.show_radar,
            use_icons: self.use_icons,
            update_freq: self.update_freq,
            wifi_download: self.wifi_download,
        }
    }
}

/// Options chosen in the settings screen, committed together with a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub settings_url: String,
    pub indoor_readings: bool,
    pub dark_theme: bool,
    pub metric: bool,
    pub show_radar: bool,
    pub use_icons: bool,
    /// 0 = manual, 1..=5 select the refresh interval.
    pub update_freq: u8,
    pub wifi_download: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Config::default().preferences()
    }
}

/// Durable key/value store backing [`Config`].
///
/// Writes go through a temp file and an atomic rename, so a reader never
/// observes a partially written file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(paths: &Paths) -> Self {
        Self {
            path: paths.config_file(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.path.exists() {
            // First run: no config file, return defaults.
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.display().to_string(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(config)?;

        write_atomic(&self.path, toml.as_bytes()).map_err(|source| ConfigError::Io {
            path: self.path.display().to_string(),
            source,
        })?;

        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}
