//! Bodies of the recurring maintenance jobs, written as plain async
//! functions so tests can drive them without the scheduler.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use sqlx::PgPool;

use petprice_core::{
    build_groups, derive_listing_pricing, GroupingMode, ProductGroup, ProductListing,
};
use petprice_db::{DbError, ProductFilters, ProductRow};

/// Persists a single group and stamps its member references.
///
/// Extracted to a named async function so the stream combinator below is
/// generic over the borrow lifetime (a bare `async move` closure trips the
/// `FnOnce is not general enough` borrow checker limitation).
async fn persist_group(pool: &PgPool, group: ProductGroup) -> Result<(), DbError> {
    petprice_db::upsert_product_group(pool, &group).await?;
    let member_ids: Vec<i64> = group.variants.iter().map(|v| v.product_id).collect();
    petprice_db::set_group_references(pool, &member_ids, group.best_value_product_id).await?;
    Ok(())
}

/// Rebuilds all persisted product groups from the full product collection.
///
/// Runs the engine in [`GroupingMode::BatchPersist`], upserts each group
/// keyed `(brand, base_product_name)` with bounded write concurrency,
/// stamps reverse references on member products (the best-value member is
/// the base product), and finally sweeps groups the run no longer
/// produced. Per-group failures are logged and counted; they never abort
/// the run.
pub(crate) async fn run_group_rebuild(pool: &PgPool, config: &petprice_core::AppConfig) {
    let run_started = Utc::now();

    let rows = match petprice_db::list_products(pool, &ProductFilters::default()).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, "group rebuild: failed to load products");
            return;
        }
    };

    let listings: Vec<ProductListing> = rows.iter().map(ProductRow::to_listing).collect();
    let groups = build_groups(&listings, GroupingMode::BatchPersist, &config.group_config());
    tracing::info!(
        products = listings.len(),
        groups = groups.len(),
        "group rebuild: engine pass complete"
    );

    if let Err(e) = petprice_db::clear_group_references(pool).await {
        tracing::error!(error = %e, "group rebuild: failed to clear references");
        return;
    }

    let max_concurrent = config.job_max_concurrent_writes.max(1);
    let group_count = groups.len();
    let results: Vec<Result<(), DbError>> =
        stream::iter(groups.into_iter().map(|group| persist_group(pool, group)))
            .buffer_unordered(max_concurrent)
            .collect()
            .await;

    let failed = results.iter().filter(|r| r.is_err()).count();
    for error in results.iter().filter_map(|r| r.as_ref().err()) {
        tracing::warn!(error = %error, "group rebuild: group upsert failed");
    }

    let swept = match petprice_db::delete_groups_older_than(pool, run_started).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, "group rebuild: stale-group sweep failed");
            0
        }
    };

    tracing::info!(
        groups = group_count,
        failed,
        swept,
        "group rebuild: persisted"
    );
}

/// Recomputes derived weight and unit price for every product.
///
/// Products whose weight text does not parse are counted as failures and
/// skipped — never retried within a run. Write errors are counted
/// separately.
pub(crate) async fn run_unit_price_refresh(pool: &PgPool) {
    let rows = match petprice_db::list_products(pool, &ProductFilters::default()).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, "unit-price refresh: failed to load products");
            return;
        }
    };

    let mut updated = 0usize;
    let mut failed = 0usize;
    let mut write_errors = 0usize;

    for row in &rows {
        let listing = row.to_listing();
        match derive_listing_pricing(&listing) {
            Some(derived) => match petprice_db::update_derived_pricing(pool, row.id, &derived)
                .await
            {
                Ok(()) => updated += 1,
                Err(e) => {
                    write_errors += 1;
                    tracing::warn!(product_id = row.id, error = %e, "unit-price refresh: write failed");
                }
            },
            None => {
                failed += 1;
                tracing::debug!(
                    product_id = row.id,
                    "unit-price refresh: no usable weight; skipped"
                );
            }
        }
    }

    tracing::info!(
        total = rows.len(),
        updated,
        failed,
        write_errors,
        "unit-price refresh: complete"
    );
}
