//! The shared registry started as its own process on first use

use ferrule::discovery::{AnnounceOptions, ByRegistry, EndpointDescriptor};
use ferrule::registry::{RegistryClient, RegistryStartup};
use ferrule::{Platform, PlatformConfig};
use std::sync::Arc;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("local addr").port()
}

fn platform(config: &PlatformConfig) -> Platform {
    Platform::builder()
        .with_config(config.clone())
        .with_strategy(Arc::new(ByRegistry::new(RegistryStartup::from_config(config))))
        .build()
        .expect("platform")
}

#[tokio::test]
async fn registry_process_outlives_the_announcing_platform() {
    let port = free_port();
    let config = PlatformConfig::default()
        .with_registry_port(port)
        .with_registry_program(env!("CARGO_BIN_EXE_ferrule-registry"));

    {
        let refunds = platform(&config);
        refunds
            .announce(
                "Refund",
                1,
                AnnounceOptions::default().with_uri("http://refunds.local/v1/refunds"),
            )
            .await
            .expect("announce");
        refunds.shutdown(std::time::Duration::from_secs(1)).await;
    }

    let caller = platform(&config);
    match caller.discoverer().discover("Refund", 1).await.expect("discover") {
        Some(EndpointDescriptor::Http(http)) => {
            assert_eq!(http.endpoint_uri, "http://refunds.local/v1/refunds");
        }
        other => panic!("expected HTTP descriptor, got {other:?}"),
    }

    RegistryClient::local(port).stop().await.expect("stop");
}
