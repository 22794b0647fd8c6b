//! Anonymous passive-mode FTP retrieval.
//!
//! Only what the bom.gov.au feeds need: log in anonymously, change to the
//! remote directory, binary-mode `RETR` into a scratch file, read it back as
//! UTF-8 text, drop the scratch file.

use std::{net::SocketAddr, path::Path};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
};
use tracing::debug;
use url::Url;

use crate::error::TransportError;

const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// Remote file split into its directory and file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FtpTarget {
    pub host: String,
    pub port: u16,
    pub dir: String,
    pub file: String,
}

impl FtpTarget {
    pub fn parse(raw: &str) -> Result<Self, TransportError> {
        let url = Url::parse(raw).map_err(|e| TransportError::ftp(format!("bad url {raw}: {e}")))?;

        let host = url
            .host_str()
            .ok_or_else(|| TransportError::ftp(format!("no host in {raw}")))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(21);

        let path = url.path();
        let (dir, file) = match path.rfind('/') {
            Some(idx) => (&path[..=idx], &path[idx + 1..]),
            None => ("/", path),
        };

        if file.is_empty() {
            return Err(TransportError::ftp(format!("no file name in {raw}")));
        }

        Ok(Self {
            host,
            port,
            dir: dir.to_string(),
            file: file.to_string(),
        })
    }
}

pub(crate) async fn retrieve(url: &str, scratch_dir: &Path) -> Result<Vec<u8>, TransportError> {
    let target = FtpTarget::parse(url)?;
    debug!(host = %target.host, dir = %target.dir, file = %target.file, "ftp retrieve");

    let stream = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(|e| TransportError::ftp(format!("connect to {}: {e}", target.host)))?;
    let peer = stream
        .peer_addr()
        .map_err(|e| TransportError::ftp(format!("peer address: {e}")))?;

    let mut control = Control::new(stream);
    control.expect(&[220]).await?;

    let reply = control.command("USER anonymous", &[230, 331]).await?;
    if reply.code == 331 {
        control
            .command(&format!("PASS {ANONYMOUS_PASSWORD}"), &[230, 202])
            .await?;
    }

    control.command(&format!("CWD {}", target.dir), &[250]).await?;
    control.command("TYPE I", &[200]).await?;

    let pasv = control.command("PASV", &[227]).await?;
    let data_port = parse_pasv_port(&pasv.text)?;
    // the control peer is trusted over the address in the PASV reply
    let data_addr = SocketAddr::new(peer.ip(), data_port);

    let mut data = TcpStream::connect(data_addr)
        .await
        .map_err(|e| TransportError::ftp(format!("data connection to {data_addr}: {e}")))?;

    control
        .command(&format!("RETR {}", target.file), &[125, 150])
        .await?;

    let scratch = tempfile::NamedTempFile::new_in(scratch_dir)
        .map_err(|e| TransportError::ftp(format!("scratch file: {e}")))?;
    let mut out = tokio::fs::File::from_std(
        scratch
            .reopen()
            .map_err(|e| TransportError::ftp(format!("scratch file: {e}")))?,
    );

    tokio::io::copy(&mut data, &mut out)
        .await
        .map_err(|e| TransportError::ftp(format!("transfer of {}: {e}", target.file)))?;
    out.flush()
        .await
        .map_err(|e| TransportError::ftp(format!("scratch file: {e}")))?;
    drop(data);

    control.expect(&[226, 250]).await?;
    // a failed goodbye does not invalidate the file we already have
    let _ = control.command("QUIT", &[221]).await;

    let raw = tokio::fs::read(scratch.path())
        .await
        .map_err(|e| TransportError::ftp(format!("scratch file: {e}")))?;

    Ok(String::from_utf8_lossy(&raw).into_owned().into_bytes())
}

#[derive(Debug)]
struct Reply {
    code: u16,
    text: String,
}

struct Control {
    stream: BufReader<TcpStream>,
}

impl Control {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    async fn command(&mut self, line: &str, accept: &[u16]) -> Result<Reply, TransportError> {
        let shown = if line.starts_with("PASS ") { "PASS ****" } else { line };
        debug!(command = shown, "ftp >");

        self.stream
            .get_mut()
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .map_err(|e| TransportError::ftp(format!("sending {shown}: {e}")))?;

        self.expect(accept).await.map_err(|e| match e {
            TransportError::Ftp(msg) => TransportError::Ftp(format!("{shown}: {msg}")),
            other => other,
        })
    }

    async fn expect(&mut self, accept: &[u16]) -> Result<Reply, TransportError> {
        let reply = self.read_reply().await?;
        if accept.contains(&reply.code) {
            Ok(reply)
        } else {
            Err(TransportError::ftp(format!(
                "unexpected reply {} {}",
                reply.code, reply.text
            )))
        }
    }

    /// Read one reply, following `NNN-` continuation lines to the `NNN ` end.
    async fn read_reply(&mut self) -> Result<Reply, TransportError> {
        let first = self.read_line().await?;
        let code = reply_code(&first)?;
        let mut text = first.get(4..).unwrap_or_default().to_string();

        if first.as_bytes().get(3) == Some(&b'-') {
            let terminator = format!("{code} ");
            loop {
                let line = self.read_line().await?;
                if line.starts_with(&terminator) {
                    text = line[4..].to_string();
                    break;
                }
            }
        }

        Ok(Reply { code, text })
    }

    async fn read_line(&mut self) -> Result<String, TransportError> {
        let mut line = String::new();
        let n = self
            .stream
            .read_line(&mut line)
            .await
            .map_err(|e| TransportError::ftp(format!("reading reply: {e}")))?;

        if n == 0 {
            return Err(TransportError::ftp("server closed the control connection"));
        }

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

fn reply_code(line: &str) -> Result<u16, TransportError> {
    line.get(..3)
        .and_then(|c| c.parse().ok())
        .ok_or_else(|| TransportError::ftp(format!("malformed reply '{line}'")))
}

/// Port from `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`.
fn parse_pasv_port(text: &str) -> Result<u16, TransportError> {
    let malformed = || TransportError::ftp(format!("malformed PASV reply '{text}'"));

    let start = text.find('(').ok_or_else(malformed)?;
    let end = text[start..].find(')').ok_or_else(malformed)? + start;

    let numbers: Vec<u16> = text[start + 1..end]
        .split(',')
        .map(|n| n.trim().parse::<u16>())
        .collect::<Result<_, _>>()
        .map_err(|_| malformed())?;

    match numbers.as_slice() {
        [_, _, _, _, hi, lo] if *hi < 256 && *lo < 256 => Ok(hi * 256 + lo),
        _ => Err(malformed()),
    }
}
