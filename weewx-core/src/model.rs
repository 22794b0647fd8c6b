use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use crate::paths::Paths;

/// The kinds of remote resource the cache knows how to keep fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    PrimaryFeed,
    Radar,
    Forecast,
    Webcam,
    Custom,
    IconBundle,
}

impl ResourceKind {
    pub const fn all() -> &'static [ResourceKind] {
        &[
            ResourceKind::PrimaryFeed,
            ResourceKind::Radar,
            ResourceKind::Forecast,
            ResourceKind::Webcam,
            ResourceKind::Custom,
            ResourceKind::IconBundle,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::PrimaryFeed => "data",
            ResourceKind::Radar => "radar",
            ResourceKind::Forecast => "forecast",
            ResourceKind::Webcam => "webcam",
            ResourceKind::Custom => "custom",
            ResourceKind::IconBundle => "icons",
        }
    }

    /// Maximum age of the cached copy. `None` means it never expires by age.
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            ResourceKind::PrimaryFeed | ResourceKind::Webcam | ResourceKind::Custom => {
                Some(Duration::from_secs(270))
            }
            ResourceKind::Radar => Some(Duration::from_secs(570)),
            ResourceKind::Forecast => Some(Duration::from_secs(7170)),
            ResourceKind::IconBundle => None,
        }
    }

    /// Where the cached copy of this kind lives.
    pub fn local_path(&self, paths: &Paths) -> PathBuf {
        match self {
            ResourceKind::PrimaryFeed => paths.config_dir().join("data.txt"),
            ResourceKind::Forecast => paths.config_dir().join("forecast.txt"),
            ResourceKind::Radar => paths.cache_dir().join("radar.gif"),
            ResourceKind::Webcam => paths.cache_dir().join("webcam.jpg"),
            ResourceKind::Custom => paths.cache_dir().join("custom.html"),
            ResourceKind::IconBundle => paths.cache_dir().join("icons.zip"),
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remote resource and the file that caches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub source_url: String,
    pub local_path: PathBuf,
}

impl ResourceDescriptor {
    pub fn new(kind: ResourceKind, source_url: impl Into<String>, paths: &Paths) -> Self {
        Self {
            kind,
            source_url: source_url.into(),
            local_path: kind.local_path(paths),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.kind.ttl()
    }

    /// Modification time of the cached file; there is no separate ledger.
    pub fn last_fetched_at(&self) -> Option<SystemTime> {
        modified(&self.local_path)
    }

    /// Staleness rule: absent, forced, or older than the kind's TTL.
    pub fn is_stale(&self, force: bool, now: SystemTime) -> bool {
        if force {
            return true;
        }

        let Some(fetched) = self.last_fetched_at() else {
            return true;
        };

        match self.ttl() {
            // a file from the future counts as fresh
            Some(ttl) => now.duration_since(fetched).is_ok_and(|age| age > ttl),
            None => false,
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// The only shape forecast parser adapters may produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub day: String,
    pub icon: String,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub summary: String,
}

/// Adapter output: days in provider order plus a free-form description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedForecast {
    pub days: Vec<ForecastDay>,
    pub summary: String,
}

/// A normalized forecast ready for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub provider: String,
    pub banner: &'static str,
    pub fetched_at: Option<DateTime<Local>>,
    pub days: Vec<ForecastDay>,
    pub summary: String,
}

/// Decoded image bytes with dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn paths() -> (tempfile::TempDir, Paths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path().join("config"), dir.path().join("cache"));
        paths.ensure().unwrap();
        (dir, paths)
    }

    fn age(path: &Path, by: Duration) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    #[test]
    fn ttl_is_fixed_per_kind() {
        assert_eq!(ResourceKind::PrimaryFeed.ttl(), Some(Duration::from_secs(270)));
        assert_eq!(ResourceKind::Webcam.ttl(), Some(Duration::from_secs(270)));
        assert_eq!(ResourceKind::Radar.ttl(), Some(Duration::from_secs(570)));
        assert_eq!(ResourceKind::Forecast.ttl(), Some(Duration::from_secs(7170)));
        assert_eq!(ResourceKind::IconBundle.ttl(), None);
    }

    #[test]
    fn absent_file_is_stale() {
        let (_dir, paths) = paths();
        let desc = ResourceDescriptor::new(ResourceKind::Radar, "http://x/r.gif", &paths);

        assert!(desc.last_fetched_at().is_none());
        assert!(desc.is_stale(false, SystemTime::now()));
    }

    #[test]
    fn staleness_follows_file_age() {
        let (_dir, paths) = paths();
        let desc = ResourceDescriptor::new(ResourceKind::PrimaryFeed, "http://x/d.txt", &paths);
        std::fs::write(&desc.local_path, "4000|a").unwrap();

        assert!(!desc.is_stale(false, SystemTime::now()));
        assert!(desc.is_stale(true, SystemTime::now()));

        age(&desc.local_path, Duration::from_secs(269));
        assert!(!desc.is_stale(false, SystemTime::now()));

        age(&desc.local_path, Duration::from_secs(271));
        assert!(desc.is_stale(false, SystemTime::now()));
    }

    #[test]
    fn icon_bundle_never_expires_by_age() {
        let (_dir, paths) = paths();
        let desc = ResourceDescriptor::new(ResourceKind::IconBundle, "http://x/i.zip", &paths);
        std::fs::write(&desc.local_path, "zip").unwrap();
        age(&desc.local_path, Duration::from_secs(86_400 * 365));

        assert!(!desc.is_stale(false, SystemTime::now()));
    }
}
