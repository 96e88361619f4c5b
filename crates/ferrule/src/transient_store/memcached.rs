use super::{StoreEngine, StoreError};
use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

/// Default `address` setting for the `memcached` engine.
pub const DEFAULT_MEMCACHED_ADDRESS: &str = "127.0.0.1:11211";

/// Longest key memcached accepts.
const MAX_KEY_LEN: usize = 250;

/// Expiry times above this many seconds are read by memcached as a Unix
/// timestamp rather than a relative TTL.
const MAX_RELATIVE_EXPIRY: u64 = 60 * 60 * 24 * 30;

/// Engine speaking the memcached text protocol.
///
/// Each operation opens its own connection, bounded by the engine timeout.
/// An unreachable server is a [`StoreError::Transport`] on every call.
#[derive(Debug, Clone)]
pub struct MemcachedEngine {
    address: String,
    timeout: Duration,
}

impl MemcachedEngine {
    /// Engine talking to the server at `address` (`host:port`).
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: Duration::from_secs(1),
        }
    }

    /// Set the per-operation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Server address
    pub fn address(&self) -> &str {
        &self.address
    }

    async fn exchange(&self, command: &[u8], reply: Reply) -> Result<Response, StoreError> {
        tokio::time::timeout(self.timeout, self.round_trip(command, reply))
            .await
            .map_err(|_| StoreError::Transport(format!("memcached at {} timed out", self.address)))?
    }

    async fn round_trip(&self, command: &[u8], reply: Reply) -> Result<Response, StoreError> {
        let stream = TcpStream::connect(self.address.as_str()).await?;
        let (reader, mut writer) = stream.into_split();
        writer.write_all(command).await?;
        writer.flush().await?;

        let mut reader = BufReader::new(reader);
        let status = read_line(&mut reader).await?;
        match reply {
            Reply::Status => Ok(Response::Status(status)),
            Reply::Value => {
                if status == "END" {
                    return Ok(Response::Value(None));
                }
                let length = value_length(&status)?;
                let mut data = vec![0; length + 2];
                reader.read_exact(&mut data).await?;
                data.truncate(length);
                let end = read_line(&mut reader).await?;
                if end != "END" {
                    return Err(StoreError::Transport(format!("expected END, got {end:?}")));
                }
                let payload = String::from_utf8(data).map_err(|e| StoreError::Encoding(e.to_string()))?;
                Ok(Response::Value(Some(payload)))
            }
        }
    }
}

enum Reply {
    Status,
    Value,
}

enum Response {
    Status(String),
    Value(Option<String>),
}

#[async_trait]
impl StoreEngine for MemcachedEngine {
    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), StoreError> {
        check_key(key)?;
        let mut command = format!("set {key} 0 {} {}\r\n", expiry(ttl, SystemTime::now()), payload.len()).into_bytes();
        command.extend_from_slice(payload.as_bytes());
        command.extend_from_slice(b"\r\n");

        match self.exchange(&command, Reply::Status).await? {
            Response::Status(status) if status == "STORED" => Ok(()),
            other => Err(rejected(other)),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        check_key(key)?;
        match self.exchange(format!("get {key}\r\n").as_bytes(), Reply::Value).await? {
            Response::Value(value) => Ok(value),
            other => Err(rejected(other)),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        check_key(key)?;
        match self.exchange(format!("delete {key}\r\n").as_bytes(), Reply::Status).await? {
            Response::Status(status) if status == "DELETED" => Ok(true),
            Response::Status(status) if status == "NOT_FOUND" => Ok(false),
            other => Err(rejected(other)),
        }
    }

    async fn close(&self) -> Result<(), StoreError> {
        debug!(address = %self.address, "memcached engine closed");
        Ok(())
    }
}

async fn read_line<R>(reader: &mut BufReader<R>) -> Result<String, StoreError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(StoreError::Transport("memcached closed the connection".into()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Byte count from a `VALUE <key> <flags> <bytes>` header.
fn value_length(header: &str) -> Result<usize, StoreError> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.nth(2)) {
        (Some("VALUE"), Some(bytes)) => bytes
            .parse()
            .map_err(|_| StoreError::Transport(format!("bad value header: {header:?}"))),
        _ => Err(StoreError::Transport(format!("unexpected reply: {header:?}"))),
    }
}

fn rejected(response: Response) -> StoreError {
    match response {
        Response::Status(status) => StoreError::Transport(format!("memcached replied {status:?}")),
        Response::Value(_) => StoreError::Transport("memcached replied with a value".into()),
    }
}

fn check_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.len() > MAX_KEY_LEN || key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(StoreError::Encoding(format!("invalid memcached key: {key:?}")));
    }
    Ok(())
}

/// Expiry field for `ttl`: relative seconds, or an absolute Unix time once
/// past memcached's relative limit. Never 0, which would mean no expiry.
fn expiry(ttl: Duration, now: SystemTime) -> u64 {
    let seconds = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    let seconds = seconds.max(1);
    if seconds <= MAX_RELATIVE_EXPIRY {
        return seconds;
    }
    let epoch = now.duration_since(UNIX_EPOCH).map_or(0, |since| since.as_secs());
    epoch + seconds
}
