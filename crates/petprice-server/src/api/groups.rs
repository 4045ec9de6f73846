use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct GroupItem {
    id: i64,
    brand: String,
    base_product_name: String,
    category: Option<String>,
    pet_type: Option<String>,
    variant_count: i32,
    price_min: Decimal,
    price_max: Decimal,
    unit_price_min: Decimal,
    unit_price_max: Decimal,
    best_value_product_id: i64,
    variants: serde_json::Value,
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GroupsQuery {
    pub brand: Option<String>,
    pub limit: Option<i64>,
}

/// `GET /api/v1/groups` — persisted groups from the latest batch rebuild,
/// cheapest per kilogram first.
pub(super) async fn list_groups(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<GroupsQuery>,
) -> Result<Json<ApiResponse<Vec<GroupItem>>>, ApiError> {
    let rows = petprice_db::list_product_groups(
        &state.pool,
        query.brand.as_deref(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| GroupItem {
            id: row.id,
            brand: row.brand,
            base_product_name: row.base_product_name,
            category: row.category,
            pet_type: row.pet_type,
            variant_count: row.variant_count,
            price_min: row.price_min,
            price_max: row.price_max,
            unit_price_min: row.unit_price_min,
            unit_price_max: row.unit_price_max,
            best_value_product_id: row.best_value_product_id,
            variants: row.variants,
            last_updated: row.last_updated,
        })
        .collect();

    Ok(Json(ApiResponse::ok(req_id.0, data)))
}
