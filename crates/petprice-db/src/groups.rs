//! Database operations for the `product_groups` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use petprice_core::ProductGroup;

use crate::DbError;

/// A row from the `product_groups` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductGroupRow {
    pub id: i64,
    pub brand: String,
    pub base_product_name: String,
    pub category: Option<String>,
    pub pet_type: Option<String>,
    pub variant_count: i32,
    pub price_min: Decimal,
    pub price_max: Decimal,
    pub unit_price_min: Decimal,
    pub unit_price_max: Decimal,
    pub best_value_product_id: i64,
    /// Serialized engine variants, exactly as emitted by a rebuild run.
    pub variants: serde_json::Value,
    pub last_updated: DateTime<Utc>,
}

/// Upserts a group keyed by `(brand, base_product_name)`.
///
/// Groups are rebuilt wholesale: a conflict replaces every stored field and
/// stamps `last_updated`, never merging with the previous state. Price
/// fields are bound as `f64` and cast to `NUMERIC` by the database engine.
///
/// Returns the internal `id` of the upserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails or the variants cannot be
/// serialized.
pub async fn upsert_product_group(pool: &PgPool, group: &ProductGroup) -> Result<i64, DbError> {
    let variants = serde_json::to_value(&group.variants)
        .map_err(|e| DbError::Sqlx(sqlx::Error::Encode(Box::new(e))))?;

    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO product_groups \
             (brand, base_product_name, category, pet_type, variant_count, \
              price_min, price_max, unit_price_min, unit_price_max, \
              best_value_product_id, variants, last_updated) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11::jsonb, NOW()) \
         ON CONFLICT (brand, base_product_name) DO UPDATE SET \
             category              = EXCLUDED.category, \
             pet_type              = EXCLUDED.pet_type, \
             variant_count         = EXCLUDED.variant_count, \
             price_min             = EXCLUDED.price_min, \
             price_max             = EXCLUDED.price_max, \
             unit_price_min        = EXCLUDED.unit_price_min, \
             unit_price_max        = EXCLUDED.unit_price_max, \
             best_value_product_id = EXCLUDED.best_value_product_id, \
             variants              = EXCLUDED.variants, \
             last_updated          = NOW() \
         RETURNING id",
    )
    .bind(&group.brand)
    .bind(&group.base_product_name)
    .bind(&group.category)
    .bind(&group.pet_type)
    .bind(i32::try_from(group.variant_count).unwrap_or(i32::MAX))
    .bind(group.price_range.min)
    .bind(group.price_range.max)
    .bind(group.price_range.unit_min)
    .bind(group.price_range.unit_max)
    .bind(group.best_value_product_id)
    .bind(variants)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Lists persisted groups, cheapest-per-kg first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_groups(
    pool: &PgPool,
    brand: Option<&str>,
    limit: i64,
) -> Result<Vec<ProductGroupRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductGroupRow>(
        "SELECT * FROM product_groups \
         WHERE ($1::text IS NULL OR LOWER(brand) = LOWER($1)) \
         ORDER BY unit_price_min, id \
         LIMIT $2",
    )
    .bind(brand)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Deletes groups last touched before `cutoff` — the post-rebuild sweep of
/// groups the latest run no longer produced. Returns the number of rows
/// removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_groups_older_than(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM product_groups WHERE last_updated < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
