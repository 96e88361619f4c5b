use super::ClientError;
use ferrule_core::serde::SerializePipeline;
use ferrule_protocol::{RegistryRequest, RegistryResponse, ResourceKey};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Client for the registry service. Each call uses its own connection.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    addr: SocketAddr,
    timeout: Duration,
}

impl RegistryClient {
    /// Client for the registry at `addr`.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Client for the registry on `port` of the loopback interface.
    pub fn local(port: u16) -> Self {
        Self::new(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Registry address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Check the registry is answering.
    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.call(&RegistryRequest::Ping).await? {
            RegistryResponse::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Record `uri` for `key` unless already recorded; returns whether this
    /// call recorded it.
    pub async fn add(&self, key: &ResourceKey, uri: &str) -> Result<bool, ClientError> {
        let request = RegistryRequest::Add {
            resource: key.resource.clone(),
            version: key.version,
            uri: uri.to_string(),
        };
        match self.call(&request).await? {
            RegistryResponse::Added { added } => Ok(added),
            other => Err(unexpected(other)),
        }
    }

    /// URI recorded for `key`.
    pub async fn find(&self, key: &ResourceKey) -> Result<Option<String>, ClientError> {
        let request = RegistryRequest::Find {
            resource: key.resource.clone(),
            version: key.version,
        };
        match self.call(&request).await? {
            RegistryResponse::Found { uri } => Ok(uri),
            other => Err(unexpected(other)),
        }
    }

    /// Forget every entry.
    pub async fn flush(&self) -> Result<(), ClientError> {
        match self.call(&RegistryRequest::Flush).await? {
            RegistryResponse::Flushed => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Ask the registry to shut down.
    pub async fn stop(&self) -> Result<(), ClientError> {
        match self.call(&RegistryRequest::Stop).await? {
            RegistryResponse::Stopping => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn call(&self, request: &RegistryRequest) -> Result<RegistryResponse, ClientError> {
        tokio::time::timeout(self.timeout, self.exchange(request))
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))?
    }

    async fn exchange(&self, request: &RegistryRequest) -> Result<RegistryResponse, ClientError> {
        let stream = TcpStream::connect(self.addr).await?;
        let (reader, mut writer) = stream.into_split();
        writer.write_all(request.to_json_line()?.as_bytes()).await?;
        writer.flush().await?;

        let mut line = String::new();
        if BufReader::new(reader).read_line(&mut line).await? == 0 {
            return Err(ClientError::Closed);
        }
        match RegistryResponse::from_json_line(&line)? {
            RegistryResponse::Error { message } => Err(ClientError::Rejected(message)),
            response => Ok(response),
        }
    }
}

fn unexpected(response: RegistryResponse) -> ClientError {
    ClientError::Unexpected(format!("{response:?}"))
}
