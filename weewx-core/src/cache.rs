//! TTL-governed local copies of remote resources.
//!
//! The age of a cached resource is the modification time of its file. Writes
//! are atomic renames and each resource kind has its own in-flight lock, so
//! overlapping refreshes of the same kind run one after the other and the
//! later one usually finds a fresh file. Separate processes sharing the same
//! cache directory are not coordinated; last writer wins.

use std::{io, path::PathBuf, sync::Arc, time::SystemTime};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    error::CacheError,
    model::{ResourceDescriptor, ResourceKind},
    paths::{write_atomic, write_beside},
    transport::{Fetcher, mjpeg},
};

/// A fresh copy written next to its cache file but not yet in place.
///
/// Readers keep seeing the previous copy until [`promote`](Self::promote).
/// Dropping it discards the new copy.
#[derive(Debug)]
pub struct StagedResource {
    kind: ResourceKind,
    target: PathBuf,
    file: NamedTempFile,
}

impl StagedResource {
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Rename the staged copy over the cache file. If that fails the old
    /// cache file is removed as well, so the next read fetches again.
    pub fn promote(self) -> io::Result<()> {
        let Err(e) = self.file.persist(&self.target) else {
            return Ok(());
        };
        match std::fs::remove_file(&self.target) {
            Err(rm) if rm.kind() != io::ErrorKind::NotFound => {
                warn!(
                    path = %self.target.display(),
                    error = %rm,
                    "could not drop outdated cache file"
                );
            }
            _ => {}
        }
        Err(e.error)
    }
}

#[derive(Debug)]
pub struct ResourceCache {
    fetcher: Arc<dyn Fetcher>,
    in_flight: Vec<Mutex<()>>,
}

impl ResourceCache {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            in_flight: ResourceKind::all().iter().map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    /// Serve the cached copy, or re-fetch when absent, forced or expired.
    pub async fn obtain(
        &self,
        desc: &ResourceDescriptor,
        force: bool,
    ) -> Result<Vec<u8>, CacheError> {
        if desc.source_url.trim().is_empty() {
            return Err(CacheError::UrlNotSet(desc.kind.as_str()));
        }

        let _slot = self.in_flight[desc.kind.index()].lock().await;

        if !desc.is_stale(force, SystemTime::now()) {
            debug!(kind = %desc.kind, path = %desc.local_path.display(), "cache hit");
            return Ok(tokio::fs::read(&desc.local_path).await?);
        }

        let bytes = self.download(desc).await?;
        let path = desc.local_path.clone();
        let bytes =
            tokio::task::spawn_blocking(move || write_atomic(&path, &bytes).map(|()| bytes))
                .await
                .map_err(io::Error::other)??;
        info!(kind = %desc.kind, url = %desc.source_url, bytes = bytes.len(), "resource refreshed");

        Ok(bytes)
    }

    /// Fetch `desc` unconditionally into a [`StagedResource`], leaving the
    /// cached copy as it is.
    pub async fn stage(&self, desc: &ResourceDescriptor) -> Result<StagedResource, CacheError> {
        if desc.source_url.trim().is_empty() {
            return Err(CacheError::UrlNotSet(desc.kind.as_str()));
        }

        let _slot = self.in_flight[desc.kind.index()].lock().await;

        let bytes = self.download(desc).await?;
        let target = desc.local_path.clone();
        let file = tokio::task::spawn_blocking(move || write_beside(&target, &bytes))
            .await
            .map_err(io::Error::other)??;
        debug!(kind = %desc.kind, url = %desc.source_url, "resource staged");

        Ok(StagedResource {
            kind: desc.kind,
            target: desc.local_path.clone(),
            file,
        })
    }

    /// Fetch `desc`, rejecting a blank payload.
    async fn download(&self, desc: &ResourceDescriptor) -> Result<Vec<u8>, CacheError> {
        let url = desc.source_url.trim();

        let bytes = if desc.kind == ResourceKind::Webcam && mjpeg::is_raw_capture_url(url) {
            self.fetcher.capture_frame(url).await?
        } else {
            self.fetcher.fetch(url).await?
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(CacheError::EmptyPayload {
                kind: desc.kind.as_str(),
                url: desc.source_url.clone(),
            });
        }

        Ok(bytes)
    }
}
