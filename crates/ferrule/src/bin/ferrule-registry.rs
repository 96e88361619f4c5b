//! Shared discovery registry server
//!
//! Listens on `127.0.0.1` at the port from
//! `FERRULE_DISCOVERY_REGISTRY_PORT_OVERRIDE`, or 8787, until a client
//! sends `stop` or the process is interrupted.

use ferrule::config::{DEFAULT_REGISTRY_PORT, registry_port_override};
use ferrule::registry::RegistryServer;
use std::net::{Ipv4Addr, SocketAddr};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = registry_port_override().unwrap_or(DEFAULT_REGISTRY_PORT);
    let server = RegistryServer::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, port))).await?;
    let shutdown = server.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.notify_one();
        }
    });

    server.run().await?;
    Ok(())
}
