mod compare;
mod groups;
mod products;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<petprice_core::AppConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn ok(request_id: String, data: T) -> Self {
        Self {
            success: true,
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "storage_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &petprice_db::DbError) -> ApiError {
    if error.is_unavailable() {
        tracing::error!(error = %error, "storage layer unavailable");
        return ApiError::new(
            request_id,
            "storage_unavailable",
            "storage layer unavailable; retry later",
        );
    }
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

fn comparison_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/products", get(products::list_products))
        .route("/api/v1/compare", get(compare::search_comparison))
        .route(
            "/api/v1/compare/best-value",
            get(compare::best_value_by_brand),
        )
        .route(
            "/api/v1/compare/sizes/{product_id}",
            get(compare::size_comparison),
        )
        .route("/api/v1/groups", get(groups::list_groups))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(comparison_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match petprice_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    success: false,
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use rust_decimal::Decimal;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tower::ServiceExt;

    pub(crate) fn test_config() -> Arc<petprice_core::AppConfig> {
        Arc::new(petprice_core::AppConfig {
            database_url: "postgres://example".to_string(),
            env: petprice_core::Environment::Test,
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            log_level: "info".to_string(),
            db_max_connections: 5,
            db_min_connections: 1,
            db_acquire_timeout_secs: 5,
            similarity_threshold: 0.8,
            group_min_variants: 2,
            job_max_concurrent_writes: 2,
            group_rebuild_schedule: "0 0 3 * * *".to_string(),
            unit_price_refresh_schedule: "0 30 2 * * *".to_string(),
        })
    }

    async fn seed_product(
        pool: &sqlx::PgPool,
        source_product_id: &str,
        name: &str,
        brand: &str,
        cents: i64,
    ) -> i64 {
        petprice_db::upsert_product(
            pool,
            &petprice_db::NewProduct {
                source: "zooshop",
                source_product_id,
                name,
                brand,
                price: Decimal::new(cents, 2),
                currency: "EUR",
                category: Some("dry-food"),
                pet_type: Some("dog"),
                details_weight: None,
            },
        )
        .await
        .expect("seed product")
    }

    // -----------------------------------------------------------------------
    // Envelope and helpers — no DB needed
    // -----------------------------------------------------------------------

    #[test]
    fn api_response_serializes_success_envelope() {
        let response = ApiResponse::ok("req-1".to_string(), vec![1, 2, 3]);
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["meta"]["request_id"], "req-1");
    }

    #[test]
    fn api_error_serializes_failure_envelope() {
        let error = ApiError::new("req-2", "not_found", "product not found");
        let json = serde_json::to_value(&error).expect("serialize");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[test]
    fn error_codes_map_to_statuses() {
        let cases = [
            ("not_found", StatusCode::NOT_FOUND),
            ("bad_request", StatusCode::BAD_REQUEST),
            ("validation_error", StatusCode::BAD_REQUEST),
            ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
            ("storage_unavailable", StatusCode::SERVICE_UNAVAILABLE),
            ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
            ("anything_else", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, status) in cases {
            let response = ApiError::new("req", code, "msg").into_response();
            assert_eq!(response.status(), status, "code {code}");
        }
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn map_db_error_distinguishes_unavailable_storage() {
        let unavailable = map_db_error(
            "req".to_string(),
            &petprice_db::DbError::Sqlx(sqlx::Error::PoolTimedOut),
        );
        assert_eq!(unavailable.error.code, "storage_unavailable");
        assert_eq!(
            unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let internal = map_db_error(
            "req".to_string(),
            &petprice_db::DbError::Sqlx(sqlx::Error::RowNotFound),
        );
        assert_eq!(internal.error.code, "internal_error");
    }

    // -----------------------------------------------------------------------
    // Routes — with DB
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn compare_groups_two_sizes_and_picks_bulk_pack(pool: sqlx::PgPool) {
        seed_product(&pool, "rc-15", "Royal Canin Adult Medium 15kg", "Royal Canin", 5999).await;
        let small =
            seed_product(&pool, "rc-4", "Royal Canin Adult Medium 4kg", "Royal Canin", 2499).await;

        let app = build_app(
            AppState {
                pool,
                config: test_config(),
            },
            default_rate_limit_state(),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/compare?q=adult%20medium")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["success"], true);

        let groups = json["data"]["groups"].as_array().expect("groups array");
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group["base_product_name"], "Royal Canin Adult Medium");
        assert_eq!(group["variant_count"], 2);
        assert_ne!(group["best_value_product_id"], small);
        assert_eq!(group["variants"][0]["best_value"], true);
        assert_eq!(group["variants"][0]["unit_price"]["unit"], "EUR/kg");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn compare_rejects_short_query(pool: sqlx::PgPool) {
        let app = build_app(
            AppState {
                pool,
                config: test_config(),
            },
            default_rate_limit_state(),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/compare?q=ab")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn best_value_with_no_matches_is_an_empty_success(pool: sqlx::PgPool) {
        let app = build_app(
            AppState {
                pool,
                config: test_config(),
            },
            default_rate_limit_state(),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/compare/best-value?brand=nonexistent")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["success"], true);
        assert_eq!(
            json["data"]["products"].as_array().map(Vec::len),
            Some(0),
            "zero matches must be an empty success, not an error"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn best_value_sorts_by_unit_price_ascending(pool: sqlx::PgPool) {
        seed_product(&pool, "rc-4", "Royal Canin Adult Medium 4kg", "Royal Canin", 2499).await;
        seed_product(&pool, "rc-15", "Royal Canin Adult Medium 15kg", "Royal Canin", 5999).await;

        let app = build_app(
            AppState {
                pool,
                config: test_config(),
            },
            default_rate_limit_state(),
        );
        let response = app
            .oneshot(
                Request::builder()
                    // Case differs from the stored brand on purpose.
                    .uri("/api/v1/compare/best-value?brand=royal%20canin")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let products = json["data"]["products"].as_array().expect("products");
        assert_eq!(products.len(), 2);
        let first = products[0]["unit_price"]["value"].as_f64().expect("unit");
        let second = products[1]["unit_price"]["value"].as_f64().expect("unit");
        assert!(first <= second, "expected ascending order: {first} {second}");
        assert!((first - 59.99 / 15.0).abs() < 1e-6);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn size_comparison_returns_product_with_its_group(pool: sqlx::PgPool) {
        let bulk =
            seed_product(&pool, "rc-15", "Royal Canin Adult Medium 15kg", "Royal Canin", 5999)
                .await;
        seed_product(&pool, "rc-4", "Royal Canin Adult Medium 4kg", "Royal Canin", 2499).await;

        let app = build_app(
            AppState {
                pool,
                config: test_config(),
            },
            default_rate_limit_state(),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/compare/sizes/{bulk}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["product"]["id"], bulk);
        let group = &json["data"]["group"];
        assert_eq!(group["variant_count"], 2);
        assert_eq!(group["best_value_product_id"], bulk);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn size_comparison_unknown_product_is_404(pool: sqlx::PgPool) {
        let app = build_app(
            AppState {
                pool,
                config: test_config(),
            },
            default_rate_limit_state(),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/compare/sizes/987654")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn products_endpoint_annotates_unit_prices(pool: sqlx::PgPool) {
        seed_product(&pool, "rc-15", "Royal Canin Adult Medium 15kg", "Royal Canin", 5999).await;

        let app = build_app(
            AppState {
                pool,
                config: test_config(),
            },
            default_rate_limit_state(),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/products?search=adult")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let products = json["data"].as_array().expect("data array");
        assert_eq!(products.len(), 1);
        assert_eq!(products[0]["name"], "Royal Canin Adult Medium 15kg");
        assert_eq!(products[0]["weight"]["unit"], "kg");
        let unit = products[0]["unit_price"]["value"].as_f64().expect("unit");
        assert!((unit - 59.99 / 15.0).abs() < 1e-6);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn groups_endpoint_serves_persisted_groups(pool: sqlx::PgPool) {
        seed_product(&pool, "rc-15", "Royal Canin Adult Medium 15kg", "Royal Canin", 5999).await;
        seed_product(&pool, "rc-4", "Royal Canin Adult Medium 4kg", "Royal Canin", 2499).await;

        let config = test_config();
        crate::scheduler::run_group_rebuild(&pool, &config).await;

        let app = build_app(
            AppState {
                pool,
                config,
            },
            default_rate_limit_state(),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/groups?brand=Royal%20Canin")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let groups = json["data"].as_array().expect("data array");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0]["base_product_name"], "Royal Canin Adult Medium");
        assert_eq!(groups[0]["variant_count"], 2);
    }
}
