//! The remote `key=value` settings manifest.

/// Keys the synchronizer understands; anything else is ignored.
pub const RECOGNIZED_KEYS: &[&str] = &[
    "data", "radtype", "radar", "fctype", "forecast", "webcam", "custom",
];

/// Values of a parsed manifest. A key that appears more than once keeps the
/// value of its last occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsManifest {
    pub data: Option<String>,
    pub radtype: Option<String>,
    pub radar: Option<String>,
    pub fctype: Option<String>,
    pub forecast: Option<String>,
    pub webcam: Option<String>,
    pub custom: Option<String>,
}

impl SettingsManifest {
    pub fn parse(text: &str) -> Self {
        let mut manifest = Self::default();

        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();

            let slot = match key.trim() {
                "data" => &mut manifest.data,
                "radtype" => &mut manifest.radtype,
                "radar" => &mut manifest.radar,
                "fctype" => &mut manifest.fctype,
                "forecast" => &mut manifest.forecast,
                "webcam" => &mut manifest.webcam,
                "custom" => &mut manifest.custom,
                _ => continue,
            };
            *slot = Some(value);
        }

        manifest
    }

    /// Value of `key`, with empty strings treated as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "data" => &self.data,
            "radtype" => &self.radtype,
            "radar" => &self.radar,
            "fctype" => &self.fctype,
            "forecast" => &self.forecast,
            "webcam" => &self.webcam,
            "custom" => &self.custom,
            _ => return None,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }
}
