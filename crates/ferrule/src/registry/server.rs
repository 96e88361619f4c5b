use ferrule_core::serde::SerializePipeline;
use ferrule_protocol::{RegistryRequest, RegistryResponse};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

type Entries = Arc<Mutex<HashMap<(String, u32), String>>>;

/// The registry service.
pub struct RegistryServer {
    listener: TcpListener,
    entries: Entries,
    shutdown: Arc<Notify>,
}

impl RegistryServer {
    /// Bind to `addr`.
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
            entries: Arc::default(),
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle that stops [`run`](Self::run) when notified.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Serve until a `stop` request arrives or the shutdown handle fires.
    pub async fn run(self) -> io::Result<()> {
        info!(addr = ?self.listener.local_addr().ok(), "discovery registry listening");
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    debug!(%peer, "registry connection");
                    let entries = Arc::clone(&self.entries);
                    let shutdown = Arc::clone(&self.shutdown);
                    tokio::spawn(async move {
                        if let Err(err) = serve_connection(stream, entries, shutdown).await {
                            warn!(%peer, error = %err, "registry connection failed");
                        }
                    });
                }
                _ = self.shutdown.notified() => {
                    info!("discovery registry stopping");
                    return Ok(());
                }
            }
        }
    }
}

async fn serve_connection(stream: TcpStream, entries: Entries, shutdown: Arc<Notify>) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let (response, stop) = match RegistryRequest::from_json_line(&line) {
            Ok(request) => handle(request, &entries),
            Err(err) => (
                RegistryResponse::Error {
                    message: err.to_string(),
                },
                false,
            ),
        };
        let encoded = response.to_json_line().map_err(io::Error::other)?;
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
        if stop {
            shutdown.notify_one();
            break;
        }
    }
    Ok(())
}

fn handle(request: RegistryRequest, entries: &Entries) -> (RegistryResponse, bool) {
    match request {
        RegistryRequest::Ping => (RegistryResponse::Pong, false),
        RegistryRequest::Add { resource, version, uri } => {
            let mut entries = entries.lock();
            let key = (resource, version);
            let added = !entries.contains_key(&key);
            if added {
                entries.insert(key, uri);
            }
            (RegistryResponse::Added { added }, false)
        }
        RegistryRequest::Find { resource, version } => {
            let uri = entries.lock().get(&(resource, version)).cloned();
            (RegistryResponse::Found { uri }, false)
        }
        RegistryRequest::Flush => {
            entries.lock().clear();
            (RegistryResponse::Flushed, false)
        }
        RegistryRequest::Stop => (RegistryResponse::Stopping, true),
    }
}
