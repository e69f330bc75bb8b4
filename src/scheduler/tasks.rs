use std::sync::Arc;

use tracing::{error, info};

use crate::{
    scheduler::{cache::EpisodeCache, publisher::Publisher},
    util::fetcher::EpisodeSource,
};

pub async fn refresh(cache: Arc<EpisodeCache>, source: Arc<dyn EpisodeSource>) {
    if !cache.refresh(source.as_ref()).await {
        info!("Cache refresh skipped, serving previous snapshot");
    }
}

pub async fn announce(publisher: Arc<Publisher>) {
    match publisher.publish_if_new().await {
        Ok(Some(report)) => info!(
            "Announcement sent: {} delivered, {} failed",
            report.delivered, report.failed
        ),
        Ok(None) => {}
        Err(e) => error!("Publish check failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::scheduler::cache::tests::{FixedSource, episode};

    #[tokio::test]
    async fn refresh_job_fills_cache() {
        let cache = Arc::new(EpisodeCache::new(Duration::from_secs(60)));
        let source = Arc::new(FixedSource::with(vec![episode(1), episode(2)]));

        refresh(cache.clone(), source.clone()).await;
        assert_eq!(cache.get().await.len(), 2);

        source.set(Vec::new()).await;
        refresh(cache.clone(), source).await;
        assert_eq!(cache.get().await.len(), 2);
    }
}
