//! Error taxonomy shared by every component of the core.
//!
//! Each component returns its own typed error; [`SyncError`] wraps all of
//! them for the settings synchronizer, which aborts on the first failure.

use thiserror::Error;

/// Failures while speaking a wire protocol.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Unknown URL handle, can't continue, url: '{0}'")]
    SchemeInvalid(String),

    #[error("{scheme} isn't supported for raw webcam capture: {url}")]
    SchemeUnsupported { scheme: String, url: String },

    #[error("Failed to reach {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("Failed to download {url}, error status: {code}")]
    HttpStatus { url: String, code: u16 },

    #[error("FTP transfer failed: {0}")]
    Ftp(String),

    #[error("Request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("Request to {0} was cancelled")]
    Cancelled(String),

    #[error("HTTP client could not be built: {0}")]
    Client(String),

    #[error("I/O error during transfer: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn unreachable(url: &str, message: impl std::fmt::Display) -> Self {
        Self::Unreachable {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub fn ftp(message: impl std::fmt::Display) -> Self {
        Self::Ftp(message.to_string())
    }
}

/// Failures of the local resource cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to download {kind} from {url}: empty payload")]
    EmptyPayload { kind: &'static str, url: String },

    #[error("{0} URL is not set")]
    UrlNotSet(&'static str),

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Icon archive could not be extracted: {0}")]
    Archive(String),

    #[error("Icon bundle is still incomplete after extraction, missing '{0}'")]
    IncompleteBundle(String),

    #[error("Image could not be decoded: {0}")]
    Image(String),
}

/// Rejections of a settings manifest or of the values derived from it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Mandatory setting '{0}' not found in the settings file.")]
    MissingMandatoryField(&'static str),

    #[error("Invalid data URL supplied. Please check the URL before trying again.")]
    PlaceholderUrlRejected,

    #[error("Forecast type '{0}' isn't a valid option.")]
    UnknownProvider(String),

    #[error("Longitude or Latitude was not specified for {0} forecasts")]
    CoordinatesMissing(String),

    #[error(
        "Forecast type '{0}' needs to have icons available, \
         Please switch to using icons and try again."
    )]
    IconRequiredButDisabled(String),

    #[error("Forecast location for '{provider}' is invalid: {reason}")]
    InvalidForecastLocation { provider: String, reason: String },
}

/// Schema-version mismatches.
///
/// `FeedTooOld` is a soft failure: it still carries the feed fields so the
/// caller can render what it has. `BundleTooOld` is a hard gate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error(
        "This app has been updated but the server you are connecting to hasn't updated \
         the Inigo Plugin for weeWX. Fields may not show up properly until weeWX is updated. \
         (server version {found}, need {minimum})"
    )]
    FeedTooOld {
        found: u32,
        minimum: u32,
        fields: Vec<String>,
    },

    #[error("Feed version banner '{0}' is not an integer")]
    MalformedBanner(String),

    #[error("Icon bundle version {found} is older than the required version {required}")]
    BundleTooOld { found: u32, required: u32 },
}

impl VersionError {
    /// Fields that survived a soft version failure, if any.
    pub fn degraded_fields(&self) -> Option<&[String]> {
        match self {
            VersionError::FeedTooOld { fields, .. } => Some(fields),
            _ => None,
        }
    }
}

/// Failures of the persisted configuration and the provider registry.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fctype is '{0}' which is invalid or not coded yet.")]
    UnknownProvider(String),

    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration to TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine platform config directory")]
    NoHomeDirectory,
}

/// Errors produced by a forecast parser adapter.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to parse {provider} forecast: {message}")]
    Malformed { provider: &'static str, message: String },

    #[error("{0} forecast contained no days")]
    Empty(&'static str),
}

impl ParseError {
    pub fn malformed(provider: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Malformed {
            provider,
            message: message.to_string(),
        }
    }
}

/// Failures while normalizing a cached forecast.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Everything that can abort a settings synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Reverse geocode lookup failed: {0}")]
    Geocode(String),
}

/// Errors surfaced by the routine-poll facade.
#[derive(Debug, Error)]
pub enum StationError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}
