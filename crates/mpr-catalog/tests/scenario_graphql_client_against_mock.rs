//! GraphQL catalog client against a local mock server. No real network.

use httpmock::prelude::*;
use mpr_catalog::GraphqlCatalogClient;
use mpr_reconcile::{CatalogError, CatalogSyncClient};
use rust_decimal_macros::dec;
use serde_json::json;

const PATH: &str = "/admin/api/2024-10/graphql.json";

fn client(server: &MockServer) -> GraphqlCatalogClient {
    GraphqlCatalogClient::new(&server.base_url(), "2024-10", "test-token".to_string())
        .expect("valid endpoint")
}

#[tokio::test]
async fn resolve_parent_returns_product_id() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(PATH)
                .header("X-Shopify-Access-Token", "test-token")
                .body_contains("productVariant(id: $id)")
                .body_contains("gid://shopify/ProductVariant/11");
            then.status(200).json_body(json!({
                "data": {
                    "productVariant": {
                        "id": "gid://shopify/ProductVariant/11",
                        "product": { "id": "gid://shopify/Product/7" }
                    }
                }
            }));
        })
        .await;

    let parent = client(&server)
        .resolve_parent("gid://shopify/ProductVariant/11")
        .await
        .unwrap();

    assert_eq!(parent, "gid://shopify/Product/7");
    m.assert_async().await;
}

#[tokio::test]
async fn unknown_item_is_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(PATH);
            then.status(200)
                .json_body(json!({ "data": { "productVariant": null } }));
        })
        .await;

    let err = client(&server).resolve_parent("gid://x/1").await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(ref id) if id == "gid://x/1"), "{err}");
    assert!(!err.is_transport());
}

#[tokio::test]
async fn submit_sends_single_variant_with_string_price() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(PATH)
                .body_contains("productVariantsBulkUpdate")
                .body_contains(r#""productId":"gid://shopify/Product/7""#)
                .body_contains(r#""price":"2018""#);
            then.status(200).json_body(json!({
                "data": {
                    "productVariantsBulkUpdate": {
                        "productVariants": [
                            { "id": "gid://shopify/ProductVariant/11", "price": "2018.00" }
                        ],
                        "userErrors": []
                    }
                }
            }));
        })
        .await;

    let outcome = client(&server)
        .submit_price(
            "gid://shopify/Product/7",
            "gid://shopify/ProductVariant/11",
            dec!(2018),
        )
        .await
        .unwrap();

    assert_eq!(outcome.updated, vec!["gid://shopify/ProductVariant/11"]);
    assert!(outcome.validation_errors.is_empty());
    m.assert_async().await;
}

#[tokio::test]
async fn user_errors_become_validation_errors_in_order() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(PATH);
            then.status(200).json_body(json!({
                "data": {
                    "productVariantsBulkUpdate": {
                        "productVariants": null,
                        "userErrors": [
                            { "field": ["variants", "0", "price"], "message": "Price must be greater than 0" },
                            { "field": null, "message": "Second problem" }
                        ]
                    }
                }
            }));
        })
        .await;

    let outcome = client(&server)
        .submit_price("p", "v", dec!(5))
        .await
        .unwrap();
    assert!(outcome.updated.is_empty());
    assert_eq!(
        outcome.validation_errors,
        vec!["Price must be greater than 0", "Second problem"]
    );
}

#[tokio::test]
async fn http_status_and_query_errors_are_classified() {
    let server = MockServer::start_async().await;
    let mut unavailable = server
        .mock_async(|when, then| {
            when.method(POST).path(PATH).body_contains("getVariantParent");
            then.status(503).body("upstream unavailable");
        })
        .await;

    let c = client(&server);
    let err = c.resolve_parent("v").await.unwrap_err();
    assert!(
        matches!(err, CatalogError::Http { status: 503, ref body } if body == "upstream unavailable"),
        "{err}"
    );
    assert!(err.is_transport());
    unavailable.delete_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path(PATH).body_contains("getVariantParent");
            then.status(401).body("invalid token");
        })
        .await;
    let err = c.resolve_parent("v").await.unwrap_err();
    assert!(matches!(err, CatalogError::Http { status: 401, .. }));
    assert!(!err.is_transport());

    server
        .mock_async(|when, then| {
            when.method(POST).path(PATH).body_contains("productVariantsBulkUpdate");
            then.status(200).json_body(json!({
                "errors": [{ "message": "Variable $productId of type ID! was provided invalid value" }]
            }));
        })
        .await;
    let err = c.submit_price("bad", "v", dec!(1)).await.unwrap_err();
    assert!(
        matches!(err, CatalogError::Query(ref m) if m.contains("invalid value")),
        "{err}"
    );
    assert!(!err.is_transport());
}

#[tokio::test]
async fn throttled_query_error_is_transport() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(PATH);
            then.status(200).json_body(json!({
                "errors": [{ "message": "Throttled", "extensions": { "code": "THROTTLED" } }]
            }));
        })
        .await;

    let err = client(&server).resolve_parent("v").await.unwrap_err();
    assert!(err.is_transport(), "{err}");
}

#[tokio::test]
async fn unreachable_endpoint_is_transport() {
    // Port 9 (discard) on localhost is not served in test environments.
    let c = GraphqlCatalogClient::new("http://127.0.0.1:9", "2024-10", "t".to_string()).unwrap();
    let err = c.resolve_parent("v").await.unwrap_err();
    assert!(matches!(err, CatalogError::Transport(_)), "{err}");
}
