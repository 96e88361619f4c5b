//! Common test utilities and helpers

use ferrule::service::{Context, InterfaceDeclaration, ResourceImplementation};
use ferrule::{Action, PermissionDecision, Permissions, ResourceKey, async_trait};
use serde_json::json;
use std::sync::Arc;

/// A `Purchase` implementation answering list and show
#[allow(dead_code)]
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
        context.response.body = Some(json!({"id": context.request.ident}));
    }
}

/// Permissions of a client allowed to do anything with purchases
#[allow(dead_code)]
pub fn purchase_permissions() -> Permissions {
    Permissions::new().with_resource("Purchase", PermissionDecision::Allow)
}

/// `Purchase` v1 interface granting refund creation while creating a purchase
#[allow(dead_code)]
pub fn purchase_interface() -> Arc<InterfaceDeclaration> {
    Arc::new(
        InterfaceDeclaration::new(ResourceKey::new("Purchase", 1)).with_additional_permissions(
            Action::Create,
            Permissions::new().with_resource_action("Refund", Action::Create, PermissionDecision::Allow),
        ),
    )
}
