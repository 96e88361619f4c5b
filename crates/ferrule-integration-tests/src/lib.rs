//! Shared fixtures for ferrule's cross-crate tests
//!
//! The tests themselves live in `tests/`: HTTP calls against wiremock, queue
//! calls through the in-memory broker, and discovery through a registry
//! server over TCP.

use async_trait::async_trait;
use ferrule::service::{Context, ResourceImplementation};
use ferrule::{Action, PermissionDecision, Permissions};
use serde_json::json;
use std::net::TcpListener;

/// `Purchase` resource: lists two purchases, shows one to permitted callers.
pub struct Purchases;

#[async_trait]
impl ResourceImplementation for Purchases {
    async fn list(&self, context: &mut Context) {
        context.response.body = Some(json!([{"id": "p1"}, {"id": "p2"}]));
        context.response.dataset_size = Some(2);
    }

    async fn show(&self, context: &mut Context) {
        if !context.permitted("Purchase", Action::Show).is_permitted() {
            context.errors().add_lenient("platform.forbidden", &[]);
            return;
        }
        let ident = context.request.ident.clone().unwrap_or_default();
        if ident != "p1" {
            context.errors().add_lenient("generic.not_found", &[("ident", ident.as_str())]);
            return;
        }
        context.response.body = Some(json!({"id": ident, "total": 12}));
    }
}

/// Permissions allowing everything on purchases
pub fn purchase_permissions() -> Permissions {
    Permissions::new().with_resource("Purchase", PermissionDecision::Allow)
}

/// A loopback port nothing is listening on
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_ports_are_usable() {
        let port = free_port();
        assert_ne!(port, 0);
        assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
    }
}
