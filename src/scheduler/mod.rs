pub mod cache;
pub mod detector;
pub mod publisher;
pub mod tasks;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

use crate::{
    config::Config,
    scheduler::{cache::EpisodeCache, publisher::Publisher},
    util::fetcher::EpisodeSource,
};

/// Registers the startup refresh, the periodic refresh and the publish check,
/// then starts the scheduler. Cron expressions are evaluated in UTC.
pub async fn start(
    config: &Config,
    cache: Arc<EpisodeCache>,
    source: Arc<dyn EpisodeSource>,
    publisher: Arc<Publisher>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let (startup_cache, startup_source) = (cache.clone(), source.clone());
    scheduler
        .add(Job::new_one_shot_async(
            Duration::from_secs(0),
            move |_uuid, _l| {
                let cache = startup_cache.clone();
                let source = startup_source.clone();
                Box::pin(async move { tasks::refresh(cache, source).await })
            },
        )?)
        .await?;

    scheduler
        .add(Job::new_async(
            config.feed.refresh_cron.as_str(),
            move |_uuid, _l| {
                let cache = cache.clone();
                let source = source.clone();
                Box::pin(async move { tasks::refresh(cache, source).await })
            },
        )?)
        .await?;

    scheduler
        .add(Job::new_async(
            config.feed.publish_cron.as_str(),
            move |_uuid, _l| {
                let publisher = publisher.clone();
                Box::pin(async move { tasks::announce(publisher).await })
            },
        )?)
        .await?;

    scheduler.start().await?;
    info!(
        "Scheduler started: refresh '{}', publish '{}'",
        config.feed.refresh_cron, config.feed.publish_cron
    );
    Ok(scheduler)
}
