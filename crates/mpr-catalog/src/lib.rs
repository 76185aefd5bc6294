//! mpr-catalog
//!
//! Admin GraphQL client for the external catalog. Implements
//! [`CatalogSyncClient`]: one query to find an item's parent product and one
//! bulk-update mutation carrying exactly one item per call.
//!
//! The access token is supplied by the caller (resolved from the env var named
//! in config) and never logged.

use anyhow::{bail, Result};
use mpr_reconcile::{CatalogError, CatalogSyncClient, SubmitOutcome};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

mod wire;

use wire::{BulkUpdateData, GraphqlResponse, ParentQueryData};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Response bodies quoted in errors are cut to this many bytes.
const MAX_ERROR_BODY: usize = 512;

const PARENT_QUERY: &str = r#"
query getVariantParent($id: ID!) {
  productVariant(id: $id) {
    id
    product {
      id
    }
  }
}
"#;

const BULK_UPDATE_MUTATION: &str = r#"
mutation productVariantsBulkUpdate($productId: ID!, $variants: [ProductVariantsBulkInput!]!) {
  productVariantsBulkUpdate(productId: $productId, variants: $variants) {
    productVariants {
      id
      price
    }
    userErrors {
      field
      message
    }
  }
}
"#;

#[derive(Clone)]
pub struct GraphqlCatalogClient {
    http: reqwest::Client,
    graphql_url: String,
    access_token: String,
}

impl std::fmt::Debug for GraphqlCatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphqlCatalogClient")
            .field("graphql_url", &self.graphql_url)
            .field("access_token", &"<REDACTED>")
            .finish()
    }
}

impl GraphqlCatalogClient {
    /// `endpoint` is the store base URL; the admin GraphQL path is derived
    /// from `api_version`.
    pub fn new(endpoint: &str, api_version: &str, access_token: String) -> Result<Self> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            bail!("catalog endpoint is empty");
        }
        if api_version.trim().is_empty() {
            bail!("catalog api_version is empty");
        }
        Ok(Self::with_graphql_url(
            format!("{endpoint}/admin/api/{}/graphql.json", api_version.trim()),
            access_token,
        ))
    }

    pub fn with_graphql_url(graphql_url: String, access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            graphql_url,
            access_token,
        }
    }

    pub fn graphql_url(&self) -> &str {
        &self.graphql_url
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: &str,
        variables: Value,
    ) -> Result<T, CatalogError> {
        debug!(operation, "catalog graphql request");
        let resp = self
            .http
            .post(&self.graphql_url)
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| CatalogError::Transport(format!("{operation}: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| CatalogError::Transport(format!("{operation}: {e}")))?;

        if !status.is_success() {
            return Err(CatalogError::Http {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let parsed: GraphqlResponse<T> = serde_json::from_str(&body)
            .map_err(|e| CatalogError::Decode(format!("{operation}: {e}")))?;

        if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
            let message = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            // Rate limiting arrives as a query error with a 200 status.
            if errors.iter().any(|e| e.is_throttled()) {
                return Err(CatalogError::Transport(format!("throttled: {message}")));
            }
            return Err(CatalogError::Query(message));
        }

        parsed
            .data
            .ok_or_else(|| CatalogError::Decode(format!("{operation}: response has no data")))
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[async_trait::async_trait]
impl CatalogSyncClient for GraphqlCatalogClient {
    fn name(&self) -> &'static str {
        "graphql"
    }

    async fn resolve_parent(&self, item_id: &str) -> Result<String, CatalogError> {
        let data: ParentQueryData = self
            .execute("getVariantParent", PARENT_QUERY, json!({ "id": item_id }))
            .await?;
        data.product_variant
            .map(|v| v.product.id)
            .ok_or_else(|| CatalogError::NotFound(item_id.to_string()))
    }

    async fn submit_price(
        &self,
        parent_id: &str,
        item_id: &str,
        price: Decimal,
    ) -> Result<SubmitOutcome, CatalogError> {
        let variables = json!({
            "productId": parent_id,
            "variants": [{ "id": item_id, "price": price.to_string() }],
        });
        let data: BulkUpdateData = self
            .execute("productVariantsBulkUpdate", BULK_UPDATE_MUTATION, variables)
            .await?;
        let payload = data.product_variants_bulk_update.ok_or_else(|| {
            CatalogError::Decode("productVariantsBulkUpdate: payload is null".to_string())
        })?;

        Ok(SubmitOutcome {
            updated: payload
                .product_variants
                .unwrap_or_default()
                .into_iter()
                .map(|v| v.id)
                .collect(),
            validation_errors: payload.user_errors.into_iter().map(|e| e.message).collect(),
        })
    }
}

/// Top-level GraphQL error entry.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GraphqlError {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl GraphqlError {
    fn is_throttled(&self) -> bool {
        self.extensions
            .as_ref()
            .and_then(|x| x.get("code"))
            .and_then(Value::as_str)
            == Some("THROTTLED")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphql_url_is_derived_from_endpoint_and_version() {
        let c = GraphqlCatalogClient::new("https://shop.example.com/", "2024-10", "t".into())
            .unwrap();
        assert_eq!(
            c.graphql_url(),
            "https://shop.example.com/admin/api/2024-10/graphql.json"
        );
        assert!(GraphqlCatalogClient::new("  ", "2024-10", "t".into()).is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let c = GraphqlCatalogClient::with_graphql_url("http://x".into(), "shpat_secret".into());
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("shpat_secret"));
        assert!(dbg.contains("<REDACTED>"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("abc", 10), "abc");
        assert_eq!(truncate("ééé", 3), "é...");
    }
}
