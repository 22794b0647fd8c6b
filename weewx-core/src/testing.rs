//! Scripted [`Fetcher`] used by unit tests.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

use crate::{error::TransportError, transport::Fetcher};

/// Serves canned bodies keyed by URL and records every request.
///
/// Raw webcam captures are keyed as `capture:<url>`. Unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, body: impl AsRef<[u8]>) -> Self {
        self.set(url, body);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set(&self, url: &str, body: impl AsRef<[u8]>) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body.as_ref().to_vec());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    async fn answer(&self, key: String) -> Result<Vec<u8>, TransportError> {
        self.calls.lock().unwrap().push(key.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let body = self.bodies.lock().unwrap().get(&key).cloned();
        body.ok_or(TransportError::HttpStatus { url: key, code: 404 })
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.answer(url.to_string()).await
    }

    async fn capture_frame(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.answer(format!("capture:{url}")).await
    }
}
