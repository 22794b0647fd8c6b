//! Protocol-polymorphic byte fetching.
//!
//! [`TransportClient`] speaks HTTP(S), anonymous FTP and the raw-socket
//! MJPEG single-frame capture used by some webcams. Every request is bounded
//! by a timeout and races the client's cancellation token, so closing the
//! client aborts whatever is still in flight.

use async_trait::async_trait;
use std::{fmt::Debug, future::Future, path::PathBuf, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{error::TransportError, paths::Paths};

pub mod charset;
pub mod ftp;
pub mod http;
pub mod mjpeg;

/// Desktop browser identity; several providers refuse unknown agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/73.0.3683.86 Safari/537.36";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can turn a URL into bytes.
///
/// The cache and the synchronizer only talk to this trait, which keeps the
/// network out of their tests.
#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    /// Fetch `url` using the protocol named by its scheme.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;

    /// Grab a single webcam frame over a bare socket.
    async fn capture_frame(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub timeout: Duration,
    pub user_agent: String,
    /// Where FTP downloads are staged before being read back.
    pub scratch_dir: PathBuf,
}

impl TransportSettings {
    pub fn new(paths: &Paths) -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
            scratch_dir: paths.cache_dir().to_path_buf(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TransportClient {
    http: reqwest::Client,
    settings: TransportSettings,
    cancel: CancellationToken,
}

impl TransportClient {
    pub fn new(settings: TransportSettings) -> Result<Self, TransportError> {
        Ok(Self {
            http: http::build_client(&settings)?,
            settings,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that aborts every in-flight and future request of this client.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    async fn guarded<T, F>(&self, url: &str, fut: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        let timeout = self.settings.timeout;

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TransportError::Cancelled(url.to_string())),
            res = tokio::time::timeout(timeout, fut) => res.unwrap_or_else(|_| {
                Err(TransportError::Timeout {
                    url: url.to_string(),
                    secs: timeout.as_secs(),
                })
            }),
        }
    }
}

#[async_trait]
impl Fetcher for TransportClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let scheme = Scheme::of(url)?;
        debug!(url, ?scheme, "fetching");

        match scheme {
            Scheme::Http => self.guarded(url, http::get(&self.http, url)).await,
            Scheme::Ftp => {
                self.guarded(url, ftp::retrieve(url, &self.settings.scratch_dir))
                    .await
            }
        }
    }

    async fn capture_frame(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let target = mjpeg::Target::parse(url)?;
        debug!(url, host = %target.host, port = target.port, "capturing mjpeg frame");

        self.guarded(url, mjpeg::capture_from(target)).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    Http,
    Ftp,
}

impl Scheme {
    fn of(url: &str) -> Result<Self, TransportError> {
        let lower = url.trim().to_ascii_lowercase();

        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Scheme::Http)
        } else if lower.starts_with("ftp://") {
            Ok(Scheme::Ftp)
        } else {
            Err(TransportError::SchemeInvalid(url.to_string()))
        }
    }
}
