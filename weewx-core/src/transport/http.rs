use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};
use tracing::debug;

use super::{TransportSettings, charset};
use crate::error::TransportError;

/// Providers whose payloads arrive as ISO-8859-15 and must be re-encoded.
const LATIN9_PROVIDERS: &[&str] = &["aemet"];

/// One pooled client per transport, carrying the fixed header set.
pub(crate) fn build_client(settings: &TransportSettings) -> Result<Client, TransportError> {
    let mut headers = HeaderMap::new();
    let agent = HeaderValue::from_str(&settings.user_agent)
        .map_err(|e| TransportError::Client(e.to_string()))?;
    headers.insert(USER_AGENT, agent);

    Client::builder()
        .default_headers(headers)
        .timeout(settings.timeout)
        .build()
        .map_err(|e| TransportError::Client(e.to_string()))
}

pub(crate) async fn get(client: &Client, url: &str) -> Result<Vec<u8>, TransportError> {
    let res = client
        .get(url)
        .send()
        .await
        .map_err(|e| TransportError::unreachable(url, e))?;

    let status = res.status();
    if !status.is_success() {
        return Err(TransportError::HttpStatus {
            url: url.to_string(),
            code: status.as_u16(),
        });
    }

    let body = res
        .bytes()
        .await
        .map_err(|e| TransportError::unreachable(url, e))?;

    debug!(url, bytes = body.len(), "http body received");

    if needs_latin9_transcode(url) {
        return Ok(charset::latin9_to_utf8(&body).into_bytes());
    }

    Ok(body.to_vec())
}

fn needs_latin9_transcode(url: &str) -> bool {
    let lower = url.to_lowercase();
    LATIN9_PROVIDERS.iter().any(|p| lower.contains(p))
}
