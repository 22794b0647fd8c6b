//! Core library for the `weewx` client.
//!
//! This crate defines:
//! - Transport over HTTP(S), anonymous FTP and raw MJPEG capture
//! - A TTL-governed local cache of the station's resources
//! - The settings synchronizer that applies a remote manifest atomically
//! - Feed version checks and forecast normalization across providers
//!
//! It is used by `weewx-cli`, but any presentation layer can drive it through
//! [`SettingsSynchronizer`] and [`Station`].

pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod forecast;
pub mod icons;
pub mod imaging;
pub mod manifest;
pub mod model;
pub mod paths;
pub mod provider;
pub mod station;
pub mod sync;
pub mod transport;

#[cfg(test)]
mod testing;

pub use cache::{ResourceCache, StagedResource};
pub use config::{Config, ConfigStore, Preferences};
pub use error::{
    CacheError, ConfigError, ForecastError, ParseError, StationError, SyncError, TransportError,
    ValidationError, VersionError,
};
pub use feed::{FeedReading, ProtocolVersionGuard};
pub use forecast::{ForecastDispatcher, ForecastParser};
pub use model::{Forecast, ForecastDay, Image, ResourceDescriptor, ResourceKind};
pub use paths::Paths;
pub use provider::ProviderId;
pub use station::{Radar, Station};
pub use sync::{SettingsSynchronizer, SyncOutcome};
pub use transport::{Fetcher, TransportClient, TransportSettings};
