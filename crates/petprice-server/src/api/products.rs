use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use petprice_core::{derive_listing_pricing, ProductListing, UnitPrice, WeightSpec};
use petprice_db::ProductRow;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

/// A listing annotated with its live-computed weight and unit price.
#[derive(Debug, Serialize)]
pub(super) struct AnnotatedProduct {
    #[serde(flatten)]
    pub listing: ProductListing,
    pub weight: Option<WeightSpec>,
    pub unit_price: Option<UnitPrice>,
}

impl AnnotatedProduct {
    pub(super) fn from_row(row: &ProductRow) -> Self {
        let listing = row.to_listing();
        let derived = derive_listing_pricing(&listing);
        Self {
            weight: derived.map(|d| d.weight),
            unit_price: derived.map(|d| d.unit_price),
            listing,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    pub search: Option<String>,
    pub brand: Option<String>,
    pub pet_type: Option<String>,
    pub limit: Option<i64>,
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<Vec<AnnotatedProduct>>>, ApiError> {
    let rows = petprice_db::list_products(
        &state.pool,
        &petprice_db::ProductFilters {
            brand: query.brand.as_deref(),
            pet_type: query.pet_type.as_deref(),
            search: query.search.as_deref(),
            limit: Some(normalize_limit(query.limit)),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.iter().map(AnnotatedProduct::from_row).collect();
    Ok(Json(ApiResponse::ok(req_id.0, data)))
}
