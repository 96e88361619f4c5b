//! Calling a remote HTTP resource by convention

use ferrule::discovery::ByConvention;
use ferrule::{Platform, Query};
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[rstest]
#[case::list("GET", "/v1/purchases", 200)]
#[case::show("GET", "/v1/purchases/p1", 200)]
#[case::create("POST", "/v1/purchases", 201)]
#[case::update("PATCH", "/v1/purchases/p1", 200)]
#[case::delete("DELETE", "/v1/purchases/p1", 200)]
#[tokio::test]
async fn actions_map_to_methods_and_paths(#[case] verb: &str, #[case] route: &str, #[case] status: u16) {
    let server = MockServer::start().await;
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({"id": "p1"})))
        .expect(1)
        .mount(&server)
        .await;

    let platform = Platform::builder()
        .with_strategy(Arc::new(ByConvention::new(server.uri())))
        .build()
        .unwrap();
    let purchases = platform.endpoint("Purchase", 1).await.unwrap();

    let result = match verb {
        "POST" => purchases.create(json!({}), Query::new()).await,
        "PATCH" => purchases.update("p1", json!({}), Query::new()).await,
        "DELETE" => purchases.delete("p1", Query::new()).await,
        _ if route.ends_with("p1") => purchases.show("p1", Query::new()).await,
        _ => purchases.list(Query::new()).await,
    };
    assert!(!result.is_error(), "{verb} {route} failed: {:?}", result.errors());
}

#[tokio::test]
async fn unparsable_success_bodies_are_faults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/purchases/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let platform = Platform::builder()
        .with_strategy(Arc::new(ByConvention::new(server.uri())))
        .build()
        .unwrap();
    let result = platform
        .endpoint("Purchase", 1)
        .await
        .unwrap()
        .show("p1", Query::new())
        .await;
    assert_eq!(result.status(), 500);
}
