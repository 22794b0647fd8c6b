//! Applying a remote settings manifest.
//!
//! A run goes fetch, parse, validate, derive, refresh, commit. Nothing
//! durable changes before commit: the new [`Config`] is staged in memory,
//! refreshed dependents are written beside their cache files, and only once
//! every one of them has been fetched is the config written with a single
//! atomic rename and the staged files moved into place. A failed run leaves
//! the config and the cached copies as they were.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    cache::{ResourceCache, StagedResource},
    config::{Config, ConfigStore, DEFAULT_FCTYPE, Preferences},
    error::{SyncError, ValidationError},
    icons,
    manifest::SettingsManifest,
    model::{ResourceDescriptor, ResourceKind},
    paths::Paths,
    provider::{ProviderId, met_ie_place},
};

/// Data URL of the example manifest; never a real station.
pub const EXAMPLE_DATA_URL: &str = "https://example.com/weewx/inigo-data.txt";

/// Slots refreshed when their URL changes, in fetch order.
const DEPENDENTS: &[ResourceKind] = &[
    ResourceKind::PrimaryFeed,
    ResourceKind::Radar,
    ResourceKind::Forecast,
    ResourceKind::Webcam,
    ResourceKind::Custom,
];

/// What a successful run committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub provider: ProviderId,
    pub rad_type: String,
    pub radar_url: String,
    /// Slots fetched because their URL changed.
    pub refreshed: Vec<ResourceKind>,
    /// Bundle version recorded, if the icons were (re)installed.
    pub icons_installed: Option<u32>,
}

#[derive(Debug)]
pub struct SettingsSynchronizer {
    cache: Arc<ResourceCache>,
    store: ConfigStore,
    paths: Paths,
    running: Mutex<()>,
}

/// Manifest values that passed validation.
#[derive(Debug)]
struct Validated {
    data_url: String,
    rad_type: &'static str,
    radar_url: String,
    provider: ProviderId,
    forecast: String,
    webcam_url: String,
    custom_url: String,
}

impl SettingsSynchronizer {
    pub fn new(cache: Arc<ResourceCache>, paths: Paths) -> Self {
        Self {
            store: ConfigStore::new(&paths),
            cache,
            paths,
            running: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Fetch the manifest named by `prefs`, refresh whatever changed and
    /// commit the result together with the preferences.
    ///
    /// Runs are serialized; a second caller waits for the first to finish.
    pub async fn synchronize(&self, prefs: &Preferences) -> Result<SyncOutcome, SyncError> {
        let _running = self.running.lock().await;
        let committed = self.store.load()?;

        let url = prefs.settings_url.trim();
        info!(url, "fetching settings manifest");
        let body = self.cache.fetcher().fetch(url).await?;
        let manifest = SettingsManifest::parse(&String::from_utf8_lossy(&body));

        let valid = validate(&manifest, prefs.use_icons)?;
        debug!(provider = %valid.provider, rad_type = valid.rad_type, "manifest accepted");

        let mut staged = committed.clone();
        staged.apply_preferences(prefs);
        staged.data_url = valid.data_url;
        staged.rad_type = valid.rad_type.to_string();
        staged.radar_url = valid.radar_url;
        staged.fctype = valid.provider.as_str().to_string();
        staged.webcam_url = valid.webcam_url;
        staged.custom_url = valid.custom_url;

        staged.forecast_url = String::new();
        if !valid.forecast.is_empty() {
            let derived = valid.provider.spec().derive(&valid.forecast, prefs.metric)?;
            staged.forecast_url = derived.forecast_url;

            if let Some(town) = derived.bom_town {
                staged.bom_town = town;
            }
            if let Some(lookup) = derived.reverse_geocode_url {
                if staged.forecast_url != committed.forecast_url {
                    staged.met_ie_place = self.reverse_geocode(&lookup).await?;
                }
            }
        }

        let (refreshed, files) = self.refresh_dependents(&committed, &staged).await?;

        let icons_installed = if staged.use_icons && icons::needs_refresh(&staged, &self.paths) {
            let version = icons::install(&self.cache, &self.paths).await?;
            staged.icon_version = version;
            Some(version)
        } else {
            None
        };

        self.store.save(&staged)?;
        for file in files {
            let kind = file.kind();
            if let Err(e) = file.promote() {
                warn!(%kind, error = %e, "refreshed copy not moved into place");
            }
        }
        info!(
            provider = %valid.provider,
            refreshed = refreshed.len(),
            "settings committed"
        );

        Ok(SyncOutcome {
            provider: valid.provider,
            rad_type: staged.rad_type,
            radar_url: staged.radar_url,
            refreshed,
            icons_installed,
        })
    }

    async fn refresh_dependents(
        &self,
        committed: &Config,
        staged: &Config,
    ) -> Result<(Vec<ResourceKind>, Vec<StagedResource>), SyncError> {
        let mut refreshed = Vec::new();
        let mut files = Vec::new();

        for &kind in DEPENDENTS {
            let url = staged.url_for(kind);
            if url.is_empty() || url == committed.url_for(kind) {
                continue;
            }

            if kind == ResourceKind::Radar && !staged.radar_is_image() {
                // a radar page is shown by the presentation layer, only check it answers
                self.cache.fetcher().fetch(url).await?;
            } else {
                let desc = ResourceDescriptor::new(kind, url, &self.paths);
                files.push(self.cache.stage(&desc).await?);
            }

            debug!(%kind, url, "dependent refreshed");
            refreshed.push(kind);
        }

        Ok((refreshed, files))
    }

    async fn reverse_geocode(&self, url: &str) -> Result<String, SyncError> {
        let body = self.cache.fetcher().fetch(url).await?;
        let place = met_ie_place(&body).map_err(|e| SyncError::Geocode(e.to_string()))?;
        debug!(%place, "reverse geocode resolved");
        Ok(place)
    }
}

fn validate(manifest: &SettingsManifest, use_icons: bool) -> Result<Validated, ValidationError> {
    let data_url = manifest
        .get("data")
        .ok_or(ValidationError::MissingMandatoryField("data"))?;
    if data_url == EXAMPLE_DATA_URL {
        return Err(ValidationError::PlaceholderUrlRejected);
    }

    let fctype = manifest
        .get("fctype")
        .unwrap_or(DEFAULT_FCTYPE)
        .to_lowercase();
    let provider = ProviderId::try_from(fctype.as_str())
        .map_err(|_| ValidationError::UnknownProvider(fctype.clone()))?;
    if provider.spec().requires_icons && !use_icons {
        return Err(ValidationError::IconRequiredButDisabled(fctype));
    }

    let rad_type = match manifest.get("radtype") {
        Some(t) if t.eq_ignore_ascii_case("webpage") => "webpage",
        _ => "image",
    };

    let value = |key: &str| manifest.get(key).unwrap_or_default().to_string();

    Ok(Validated {
        data_url: data_url.to_string(),
        rad_type,
        radar_url: value("radar"),
        provider,
        forecast: value("forecast"),
        webcam_url: value("webcam"),
        custom_url: value("custom"),
    })
}
