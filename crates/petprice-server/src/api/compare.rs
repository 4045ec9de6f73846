use std::cmp::Ordering;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use petprice_core::{build_groups, GroupingMode, ProductGroup, ProductListing};
use petprice_db::ProductRow;

use crate::middleware::RequestId;

use super::products::AnnotatedProduct;
use super::{map_db_error, ApiError, ApiResponse, AppState};

/// Shortest accepted search pattern; anything shorter matches too much to
/// be a useful comparison query.
const MIN_SEARCH_LEN: usize = 3;

/// Upper bound on listings pulled into a single live grouping pass.
const MAX_SEARCH_CANDIDATES: i64 = 500;

#[derive(Debug, Deserialize)]
pub(super) struct CompareQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct CompareData {
    pub groups: Vec<ProductGroup>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BestValueQuery {
    pub brand: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct BestValueData {
    pub products: Vec<AnnotatedProduct>,
}

#[derive(Debug, Serialize)]
pub(super) struct SizeComparisonData {
    pub product: AnnotatedProduct,
    /// The group the product belongs to, absent when no same-brand listing
    /// with a computable unit price clusters with it.
    pub group: Option<ProductGroup>,
}

pub(super) fn validate_search_query(q: Option<&str>) -> Result<&str, &'static str> {
    let q = q.map(str::trim).unwrap_or_default();
    if q.chars().count() < MIN_SEARCH_LEN {
        return Err("search pattern must be at least 3 characters");
    }
    Ok(q)
}

/// `GET /api/v1/compare?q=` — search listings by name and group them live.
pub(super) async fn search_comparison(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<ApiResponse<CompareData>>, ApiError> {
    let pattern = validate_search_query(query.q.as_deref())
        .map_err(|reason| ApiError::new(req_id.0.clone(), "validation_error", reason))?;

    let rows =
        petprice_db::search_products_by_name(&state.pool, pattern, MAX_SEARCH_CANDIDATES)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let listings: Vec<ProductListing> = rows.iter().map(ProductRow::to_listing).collect();
    let groups = build_groups(
        &listings,
        GroupingMode::LiveQuery,
        &state.config.group_config(),
    );

    Ok(Json(ApiResponse::ok(req_id.0, CompareData { groups })))
}

/// `GET /api/v1/compare/best-value?brand=` — a brand's listings annotated
/// with unit price, cheapest per kilogram first. Zero matches are a
/// success, not an error.
pub(super) async fn best_value_by_brand(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<BestValueQuery>,
) -> Result<Json<ApiResponse<BestValueData>>, ApiError> {
    let brand = query.brand.as_deref().map(str::trim).unwrap_or_default();
    if brand.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "brand parameter is required",
        ));
    }

    let rows = petprice_db::list_products_by_brand(&state.pool, brand)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut products: Vec<AnnotatedProduct> =
        rows.iter().map(AnnotatedProduct::from_row).collect();
    products.sort_by(|a, b| match (a.unit_price, b.unit_price) {
        (Some(x), Some(y)) => x.value.partial_cmp(&y.value).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    Ok(Json(ApiResponse::ok(req_id.0, BestValueData { products })))
}

/// `GET /api/v1/compare/sizes/{product_id}` — one product plus the group of
/// its same-brand size variants.
pub(super) async fn size_comparison(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<SizeComparisonData>>, ApiError> {
    let row = petprice_db::get_product(&state.pool, product_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "product not found"))?;

    let siblings = petprice_db::list_products_by_brand(&state.pool, &row.brand)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let listings: Vec<ProductListing> = siblings.iter().map(ProductRow::to_listing).collect();
    let group = build_groups(
        &listings,
        GroupingMode::LiveQuery,
        &state.config.group_config(),
    )
    .into_iter()
    .find(|g| g.variants.iter().any(|v| v.product_id == product_id));

    Ok(Json(ApiResponse::ok(
        req_id.0,
        SizeComparisonData {
            product: AnnotatedProduct::from_row(&row),
            group,
        },
    )))
}
