//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring maintenance jobs: the nightly group rebuild and the nightly
//! unit-price refresh.

mod jobs;

pub(crate) use jobs::{run_group_rebuild, run_unit_price_refresh};

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, a
/// job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<petprice_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_group_rebuild_job(&scheduler, pool.clone(), Arc::clone(&config)).await?;
    register_unit_price_refresh_job(&scheduler, pool, config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the group-rebuild job on the schedule from configuration
/// (default 03:00 UTC nightly). Each run regroups the whole product
/// collection and replaces the persisted groups wholesale.
async fn register_group_rebuild_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<petprice_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);
    let schedule = config.group_rebuild_schedule.clone();

    let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting group rebuild run");
            run_group_rebuild(&pool, &config).await;
            tracing::info!("scheduler: group rebuild run complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Register the unit-price refresh job on the schedule from configuration
/// (default 02:30 UTC nightly). Each run recomputes derived pricing for
/// every product; parse failures are counted and skipped, not retried.
async fn register_unit_price_refresh_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<petprice_core::AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);
    let schedule = config.unit_price_refresh_schedule.clone();

    let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);

        Box::pin(async move {
            tracing::info!("scheduler: starting unit-price refresh run");
            run_unit_price_refresh(&pool).await;
            tracing::info!("scheduler: unit-price refresh run complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
