//! Database operations for the `products` table.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;

use petprice_core::{DerivedPricing, ProductListing};

use crate::DbError;

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    /// Retail site the listing was scraped from.
    pub source: String,
    pub source_product_id: String,
    pub name: String,
    pub brand: String,
    pub price: Decimal,
    pub currency: String,
    pub category: Option<String>,
    pub pet_type: Option<String>,
    pub details_weight: Option<String>,
    /// Derived EUR/kg; `NULL` until the refresh job computes it, or when
    /// the weight text is unusable.
    pub unit_price: Option<Decimal>,
    pub weight_value: Option<Decimal>,
    pub weight_unit: Option<String>,
    pub weight_grams: Option<Decimal>,
    /// `true` for the one member per group chosen as the base product.
    pub is_base_product: bool,
    pub base_product_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    /// Maps this row into the plain record the engine consumes.
    ///
    /// This is the one ingestion-boundary conversion in the system: stored
    /// `NUMERIC` prices become `f64` here and nowhere else, and the engine
    /// never branches on where a listing came from.
    #[must_use]
    pub fn to_listing(&self) -> ProductListing {
        ProductListing {
            id: self.id,
            name: self.name.clone(),
            brand: self.brand.clone(),
            price: self.price.to_f64().unwrap_or(f64::NAN),
            currency: self.currency.clone(),
            category: self.category.clone(),
            pet_type: self.pet_type.clone(),
            source: self.source.clone(),
            details_weight: self.details_weight.clone(),
        }
    }
}

/// Fields for inserting or refreshing a scraped listing.
#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub source: &'a str,
    pub source_product_id: &'a str,
    pub name: &'a str,
    pub brand: &'a str,
    pub price: Decimal,
    pub currency: &'a str,
    pub category: Option<&'a str>,
    pub pet_type: Option<&'a str>,
    pub details_weight: Option<&'a str>,
}

/// Optional filters for [`list_products`].
#[derive(Debug, Clone, Default)]
pub struct ProductFilters<'a> {
    pub brand: Option<&'a str>,
    pub pet_type: Option<&'a str>,
    /// Case-insensitive substring match on the product name.
    pub search: Option<&'a str>,
    pub limit: Option<i64>,
}

/// Lists products, newest first, honoring the given filters.
///
/// Brand filtering is case-insensitive here (unlike the matcher's exact
/// brand equality) so lookups tolerate cross-source casing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(
    pool: &PgPool,
    filters: &ProductFilters<'_>,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT * FROM products \
         WHERE ($1::text IS NULL OR LOWER(brand) = LOWER($1)) \
           AND ($2::text IS NULL OR pet_type = $2) \
           AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%') \
         ORDER BY updated_at DESC, id \
         LIMIT $4",
    )
    .bind(filters.brand)
    .bind(filters.pet_type)
    .bind(filters.search)
    .bind(filters.limit.unwrap_or(i64::MAX))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches a single product by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: i64) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Lists all products of a brand, case-insensitively.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products_by_brand(pool: &PgPool, brand: &str) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT * FROM products WHERE LOWER(brand) = LOWER($1) ORDER BY id",
    )
    .bind(brand)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Case-insensitive substring search on product names.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_products_by_name(
    pool: &PgPool,
    pattern: &str,
    limit: i64,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT * FROM products WHERE name ILIKE '%' || $1 || '%' ORDER BY id LIMIT $2",
    )
    .bind(pattern)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Upserts a scraped listing.
///
/// Conflicts on `(source, source_product_id)` refresh the scraped fields
/// and `updated_at` in place. Derived pricing and group references are left
/// untouched — those belong to the background jobs.
///
/// Returns the internal `id` of the upserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_product(pool: &PgPool, product: &NewProduct<'_>) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products \
             (source, source_product_id, name, brand, price, currency, \
              category, pet_type, details_weight) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (source, source_product_id) DO UPDATE SET \
             name           = EXCLUDED.name, \
             brand          = EXCLUDED.brand, \
             price          = EXCLUDED.price, \
             currency       = EXCLUDED.currency, \
             category       = EXCLUDED.category, \
             pet_type       = EXCLUDED.pet_type, \
             details_weight = EXCLUDED.details_weight, \
             updated_at     = NOW() \
         RETURNING id",
    )
    .bind(product.source)
    .bind(product.source_product_id)
    .bind(product.name)
    .bind(product.brand)
    .bind(product.price)
    .bind(product.currency)
    .bind(product.category)
    .bind(product.pet_type)
    .bind(product.details_weight)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Writes derived unit price and parsed weight back onto a product row.
///
/// Values are bound as `f64` and cast to the fixed-scale `NUMERIC` columns
/// by the database engine — the documented precision boundary where raw
/// floats are rounded on persistence.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_derived_pricing(
    pool: &PgPool,
    id: i64,
    pricing: &DerivedPricing,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE products SET \
             unit_price   = $2, \
             weight_value = $3, \
             weight_unit  = $4, \
             weight_grams = $5, \
             updated_at   = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(pricing.unit_price.value)
    .bind(pricing.weight.value)
    .bind(pricing.weight.unit.to_string())
    .bind(pricing.grams)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Stamps group reverse references across a group's members: every member
/// points at the base product, and only the base product carries the flag.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_group_references(
    pool: &PgPool,
    member_ids: &[i64],
    base_product_id: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE products SET \
             is_base_product = (id = $2), \
             base_product_id = $2, \
             updated_at      = NOW() \
         WHERE id = ANY($1)",
    )
    .bind(member_ids)
    .bind(base_product_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Clears every group reverse reference, ahead of a full rebuild.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn clear_group_references(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE products SET is_base_product = FALSE, base_product_id = NULL \
         WHERE is_base_product OR base_product_id IS NOT NULL",
    )
    .execute(pool)
    .await?;

    Ok(())
}
