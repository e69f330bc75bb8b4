use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{
    sync::{Mutex, RwLock},
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::{data::models::Episode, util::fetcher::EpisodeSource};

#[derive(Debug, Default)]
struct Snapshot {
    entries: Vec<Episode>,
    fetched_at: Option<DateTime<Utc>>,
}

/// Last good feed snapshot, shared between the refresh job and readers.
pub struct EpisodeCache {
    expiry: Duration,
    snapshot: RwLock<Snapshot>,
}

impl EpisodeCache {
    pub fn new(expiry: Duration) -> Self {
        Self {
            expiry,
            snapshot: RwLock::new(Snapshot::default()),
        }
    }

    /// Fetches and replaces the snapshot. An empty result keeps the previous
    /// snapshot and returns false.
    pub async fn refresh(&self, source: &dyn EpisodeSource) -> bool {
        let entries = source.fetch().await;
        self.store(entries).await
    }

    pub async fn store(&self, entries: Vec<Episode>) -> bool {
        if entries.is_empty() {
            warn!("Feed returned no episodes, keeping previous cache");
            return false;
        }

        let count = entries.len();
        let mut snapshot = self.snapshot.write().await;
        snapshot.entries = entries;
        snapshot.fetched_at = Some(Utc::now());
        info!("Episode cache refreshed with {} episodes", count);
        true
    }

    pub async fn get(&self) -> Vec<Episode> {
        self.snapshot.read().await.entries.clone()
    }

    pub async fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.read().await.fetched_at
    }

    pub async fn is_stale(&self) -> bool {
        match self.fetched_at().await {
            Some(at) => Utc::now()
                .signed_duration_since(at)
                .to_std()
                .map_or(false, |age| age > self.expiry),
            None => true,
        }
    }
}

/// Read path for user-facing episode lists: a fresh cache is served as is,
/// a stale one is refreshed live and only used again if the feed is down.
///
/// Live fetches are spaced by `retry_after`, so a feed that is down costs one
/// slow request per window rather than one per reader.
pub struct Catalog {
    source: Arc<dyn EpisodeSource>,
    cache: Arc<EpisodeCache>,
    retry_after: Duration,
    last_attempt: Mutex<Option<Instant>>,
}

impl Catalog {
    pub fn new(source: Arc<dyn EpisodeSource>, cache: Arc<EpisodeCache>) -> Self {
        Self {
            source,
            cache,
            retry_after: Duration::from_secs(60),
            last_attempt: Mutex::new(None),
        }
    }

    pub fn retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn cache(&self) -> &Arc<EpisodeCache> {
        &self.cache
    }

    pub async fn episodes(&self) -> Vec<Episode> {
        if !self.cache.is_stale().await {
            return self.cache.get().await;
        }

        if !self.claim_attempt().await {
            debug!("Live fetch attempted recently, serving cached episodes");
            return self.cache.get().await;
        }

        debug!("Episode cache is stale, fetching live");
        let live = self.source.fetch().await;
        if live.is_empty() {
            return self.cache.get().await;
        }

        self.cache.store(live.clone()).await;
        live
    }

    /// Records a live fetch attempt unless one happened within `retry_after`.
    async fn claim_attempt(&self) -> bool {
        let mut last_attempt = self.last_attempt.lock().await;
        match *last_attempt {
            Some(at) if at.elapsed() < self.retry_after => false,
            _ => {
                *last_attempt = Some(Instant::now());
                true
            }
        }
    }

    /// Newest first, at most `limit`.
    pub async fn latest(&self, limit: usize) -> Vec<Episode> {
        self.episodes().await.into_iter().rev().take(limit).collect()
    }

    /// Case-insensitive match on title and description, newest first.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<Episode> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.episodes()
            .await
            .into_iter()
            .rev()
            .filter(|e| {
                e.title.to_lowercase().contains(&needle)
                    || e.description.to_lowercase().contains(&needle)
            })
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    pub(crate) fn episode(n: u32) -> Episode {
        Episode {
            title: format!("Episode {}", n),
            url: format!("https://example.com/{}", n),
            description: format!("<p>About topic {}</p>", n),
        }
    }

    /// Source that returns whatever was last set and counts calls.
    #[derive(Default)]
    pub(crate) struct FixedSource {
        pub episodes: Mutex<Vec<Episode>>,
        pub calls: AtomicUsize,
    }

    impl FixedSource {
        pub fn with(episodes: Vec<Episode>) -> Self {
            Self {
                episodes: Mutex::new(episodes),
                calls: AtomicUsize::new(0),
            }
        }

        pub async fn set(&self, episodes: Vec<Episode>) {
            *self.episodes.lock().await = episodes;
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[serenity::async_trait]
    impl EpisodeSource for FixedSource {
        async fn fetch(&self) -> Vec<Episode> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.episodes.lock().await.clone()
        }
    }

    #[tokio::test]
    async fn empty_refresh_keeps_last_good() {
        let cache = EpisodeCache::new(Duration::from_secs(3600));
        let source = FixedSource::with(vec![episode(1), episode(2)]);

        assert!(cache.refresh(&source).await);
        let stamped = cache.fetched_at().await;

        source.set(Vec::new()).await;
        assert!(!cache.refresh(&source).await);

        assert_eq!(cache.get().await.len(), 2);
        assert_eq!(cache.fetched_at().await, stamped);
    }

    #[tokio::test]
    async fn staleness_follows_expiry() {
        let cache = EpisodeCache::new(Duration::from_secs(3600));
        assert!(cache.is_stale().await);

        cache.store(vec![episode(1)]).await;
        assert!(!cache.is_stale().await);

        let expired = EpisodeCache::new(Duration::ZERO);
        expired.store(vec![episode(1)]).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(expired.is_stale().await);
    }

    #[tokio::test]
    async fn catalog_serves_fresh_cache_without_fetching() {
        let source = Arc::new(FixedSource::with(vec![episode(1)]));
        let cache = Arc::new(EpisodeCache::new(Duration::from_secs(3600)));
        let catalog = Catalog::new(source.clone(), cache);

        assert_eq!(catalog.episodes().await.len(), 1);
        assert_eq!(catalog.episodes().await.len(), 1);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn catalog_falls_back_to_stale_cache() {
        let source = Arc::new(FixedSource::with(Vec::new()));
        let cache = Arc::new(EpisodeCache::new(Duration::ZERO));
        cache.store(vec![episode(1), episode(2)]).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        let catalog = Catalog::new(source.clone(), cache);
        assert_eq!(catalog.episodes().await.len(), 2);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn down_feed_is_not_refetched_within_retry_window() {
        let source = Arc::new(FixedSource::with(Vec::new()));
        let cache = Arc::new(EpisodeCache::new(Duration::ZERO));
        cache.store(vec![episode(1)]).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let catalog = Catalog::new(source.clone(), cache).retry_after(Duration::from_secs(60));

        for _ in 0..3 {
            assert_eq!(catalog.latest(5).await, vec![episode(1)]);
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn feed_is_retried_after_window() {
        let source = Arc::new(FixedSource::with(Vec::new()));
        let cache = Arc::new(EpisodeCache::new(Duration::ZERO));
        let catalog = Catalog::new(source.clone(), cache).retry_after(Duration::ZERO);

        assert!(catalog.episodes().await.is_empty());
        source.set(vec![episode(1), episode(2)]).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(catalog.episodes().await.len(), 2);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn latest_and_search_are_newest_first() {
        let source = Arc::new(FixedSource::with(vec![episode(1), episode(2), episode(3)]));
        let cache = Arc::new(EpisodeCache::new(Duration::from_secs(3600)));
        let catalog = Catalog::new(source, cache);

        let latest = catalog.latest(2).await;
        assert_eq!(latest[0].url, "https://example.com/3");
        assert_eq!(latest.len(), 2);

        let found = catalog.search("TOPIC 2", 5).await;
        assert_eq!(found, vec![episode(2)]);
        assert!(catalog.search("   ", 5).await.is_empty());
    }
}
