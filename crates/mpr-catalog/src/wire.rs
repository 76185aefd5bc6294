//! Response shapes for the two catalog operations.

use serde::Deserialize;

use crate::GraphqlError;

#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ParentQueryData {
    /// Null when the id does not exist.
    pub product_variant: Option<VariantWithProduct>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VariantWithProduct {
    pub product: IdOnly,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdOnly {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BulkUpdateData {
    pub product_variants_bulk_update: Option<BulkUpdatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BulkUpdatePayload {
    #[serde(default)]
    pub product_variants: Option<Vec<IdOnly>>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserError {
    pub message: String,
}
