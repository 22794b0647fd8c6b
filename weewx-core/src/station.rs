//! Routine polling for the presentation layer.
//!
//! Each call goes through the cache, so a timer may call these as often as
//! it likes; only expired resources hit the network.

use chrono::{DateTime, Local};
use std::sync::Arc;
use tracing::debug;

use crate::{
    cache::ResourceCache,
    config::Config,
    error::{CacheError, StationError},
    feed::{FeedReading, ProtocolVersionGuard},
    forecast::ForecastDispatcher,
    icons, imaging,
    model::{Forecast, Image, ResourceDescriptor, ResourceKind},
    paths::Paths,
    provider::ProviderId,
};

/// What the radar slot currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Radar {
    Image(Image),
    /// A page the presentation layer embeds as is.
    Webpage(String),
}

#[derive(Debug)]
pub struct Station {
    cache: Arc<ResourceCache>,
    paths: Paths,
    guard: ProtocolVersionGuard,
    dispatcher: ForecastDispatcher,
}

impl Station {
    pub fn new(cache: Arc<ResourceCache>, paths: Paths) -> Self {
        Self {
            cache,
            paths,
            guard: ProtocolVersionGuard::default(),
            dispatcher: ForecastDispatcher::with_bundled(),
        }
    }

    /// Adapters for providers without a bundled parser are added here.
    pub fn dispatcher_mut(&mut self) -> &mut ForecastDispatcher {
        &mut self.dispatcher
    }

    fn descriptor(&self, kind: ResourceKind, config: &Config) -> ResourceDescriptor {
        ResourceDescriptor::new(kind, config.url_for(kind), &self.paths)
    }

    /// Latest feed fields. An outdated server still yields its fields, with
    /// a warning attached.
    pub async fn current_conditions(
        &self,
        config: &Config,
        force: bool,
    ) -> Result<FeedReading, StationError> {
        let desc = self.descriptor(ResourceKind::PrimaryFeed, config);
        let raw = self.cache.obtain(&desc, force).await?;

        let reading = FeedReading::from_check(self.guard.check(&String::from_utf8_lossy(&raw)))?;
        if let Some(warning) = &reading.warning {
            debug!(%warning, "feed served in degraded mode");
        }
        Ok(reading)
    }

    pub async fn forecast(&self, config: &Config, force: bool) -> Result<Forecast, StationError> {
        let provider = ProviderId::try_from(config.fctype.as_str())?;
        if config.use_icons {
            icons::check(config)?;
        }

        let desc = self.descriptor(ResourceKind::Forecast, config);
        let raw = self.cache.obtain(&desc, force).await?;
        let text = String::from_utf8_lossy(&raw);
        let parsed = self
            .dispatcher
            .normalize(provider.as_str(), &text, config.metric)?;

        Ok(Forecast {
            provider: provider.as_str().to_string(),
            banner: provider.spec().banner,
            fetched_at: desc.last_fetched_at().map(DateTime::<Local>::from),
            days: parsed.days,
            summary: parsed.summary,
        })
    }

    pub async fn radar(&self, config: &Config, force: bool) -> Result<Radar, StationError> {
        if config.radar_url.trim().is_empty() {
            return Err(CacheError::UrlNotSet(ResourceKind::Radar.as_str()).into());
        }
        if !config.radar_is_image() {
            return Ok(Radar::Webpage(config.radar_url.clone()));
        }

        let desc = self.descriptor(ResourceKind::Radar, config);
        let bytes = self.cache.obtain(&desc, force).await?;
        let (width, height) = imaging::dimensions(&bytes)?;

        Ok(Radar::Image(Image {
            bytes,
            width,
            height,
        }))
    }

    /// Webcam frame, turned upright. The cache keeps the frame as captured.
    pub async fn webcam(&self, config: &Config, force: bool) -> Result<Image, StationError> {
        let desc = self.descriptor(ResourceKind::Webcam, config);
        let bytes = self.cache.obtain(&desc, force).await?;
        Ok(imaging::rotate_webcam(&bytes)?)
    }

    /// Custom page URL, if the manifest set one. The page itself is loaded
    /// by whoever displays it.
    pub fn custom_url(config: &Config) -> Option<&str> {
        Some(config.custom_url.as_str()).filter(|u| !u.trim().is_empty())
    }

    /// Cached copy of the custom page.
    pub async fn custom_page(&self, config: &Config, force: bool) -> Result<Vec<u8>, StationError> {
        let desc = self.descriptor(ResourceKind::Custom, config);
        Ok(self.cache.obtain(&desc, force).await?)
    }
}
