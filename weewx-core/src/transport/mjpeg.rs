//! Single-frame capture from MJPEG webcams over a bare TCP socket.
//!
//! The camera answers a plain `GET <path> HTTP/1.0` with a header block
//! carrying `Content-Length` and then exactly that many JPEG bytes.

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use tracing::debug;
use url::Url;

use crate::error::TransportError;

/// Largest single read from the socket.
const CHUNK: usize = 1024;

/// Largest frame a camera may announce.
const MAX_FRAME: usize = 16 * 1024 * 1024;

/// Whether a webcam URL must go through raw capture.
pub fn is_raw_capture_url(url: &str) -> bool {
    let lower = url.trim().to_lowercase();
    lower.ends_with("mjpg") || lower.ends_with("mjpeg")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub path: String,
    url: String,
}

impl Target {
    pub fn parse(raw: &str) -> Result<Self, TransportError> {
        let trimmed = raw.trim();
        let lower = trimmed.to_lowercase();

        if lower.starts_with("https://") {
            return Err(TransportError::SchemeUnsupported {
                scheme: "https".to_string(),
                url: raw.to_string(),
            });
        }
        if !lower.starts_with("http://") {
            return Err(TransportError::SchemeInvalid(raw.to_string()));
        }

        let url = Url::parse(trimmed).map_err(|_| TransportError::SchemeInvalid(raw.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| TransportError::SchemeInvalid(raw.to_string()))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(80);

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(Self {
            host,
            port,
            path,
            url: raw.to_string(),
        })
    }
}

pub(crate) async fn capture_from(target: Target) -> Result<Vec<u8>, TransportError> {
    let mut stream = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(|e| TransportError::unreachable(&target.url, e))?;

    capture(&mut stream, &target.path, &target.url).await
}

/// Request one frame on an already-open stream and read exactly its body.
pub async fn capture<S>(stream: &mut S, path: &str, url: &str) -> Result<Vec<u8>, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(format!("GET {path} HTTP/1.0\r\n\r\n").as_bytes())
        .await?;

    let mut buf = [0u8; CHUNK];
    let n = stream.read(&mut buf).await?;
    if n == 0 {
        return Err(TransportError::unreachable(url, "connection closed before any response"));
    }

    let (content_length, body_start) = parse_head(&buf[..n])
        .ok_or_else(|| TransportError::unreachable(url, "no Content-Length in the initial response"))?;

    if content_length > MAX_FRAME {
        return Err(TransportError::unreachable(
            url,
            format!("frame of {content_length} bytes exceeds the {MAX_FRAME} byte limit"),
        ));
    }

    let mut body = Vec::with_capacity(content_length);
    let initial = &buf[body_start..n];
    body.extend_from_slice(&initial[..initial.len().min(content_length)]);

    while body.len() < content_length {
        let want = (content_length - body.len()).min(CHUNK);
        let n = stream.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(TransportError::unreachable(
                url,
                format!("stream ended after {} of {content_length} bytes", body.len()),
            ));
        }
        body.extend_from_slice(&buf[..n]);
    }

    debug!(url, bytes = body.len(), "mjpeg frame captured");
    Ok(body)
}

/// `Content-Length` value and the offset where the body starts.
///
/// The length header is the last line of the header block; the body starts
/// right after the blank line.
fn parse_head(chunk: &[u8]) -> Option<(usize, usize)> {
    let end = chunk.windows(4).position(|w| w == b"\r\n\r\n")?;
    let head = std::str::from_utf8(&chunk[..end]).ok()?;

    let length = head.rsplit("\r\n").find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("content-length")
            .then(|| value.trim().parse::<usize>().ok())?
    })?;

    Some((length, end + 4))
}
