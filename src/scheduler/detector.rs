use anyhow::Result;
use tracing::{debug, info};

use crate::{
    data::{Database, LAST_POSTED_KEY, models::Episode},
    util::fetcher::EpisodeSource,
};

/// The newest episode in the feed that has a link. Linkless entries cannot
/// be announced or used as the marker, so they are passed over.
pub async fn peek_latest(source: &dyn EpisodeSource) -> Option<Episode> {
    source
        .fetch()
        .await
        .into_iter()
        .rev()
        .find(|e| !e.url.trim().is_empty())
}

/// Url of the last announced episode.
pub async fn marker(database: &Database) -> Result<Option<String>> {
    database.setting(LAST_POSTED_KEY).await
}

pub async fn advance_marker(database: &Database, url: &str) -> Result<()> {
    database.set_setting(LAST_POSTED_KEY, url).await?;
    info!("Last posted marker advanced to {}", url);
    Ok(())
}

/// Returns the latest episode when it has not been announced yet, moving the
/// marker to it. Each `Some` consumes the signal: a second call with an
/// unchanged feed returns `None`.
pub async fn detect(source: &dyn EpisodeSource, database: &Database) -> Result<Option<Episode>> {
    let Some(latest) = peek_latest(source).await else {
        debug!("No episodes fetched, marker left untouched");
        return Ok(None);
    };

    let current = marker(database).await?;
    if current.as_deref() == Some(latest.url.as_str()) {
        debug!("Latest episode {} already announced", latest.url);
        return Ok(None);
    }

    advance_marker(database, &latest.url).await?;
    Ok(Some(latest))
}

/// Predicate form of [`detect`]. Same side effect on the marker.
#[cfg(test)]
pub async fn check(source: &dyn EpisodeSource, database: &Database) -> Result<bool> {
    Ok(detect(source, database).await?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::memory,
        scheduler::cache::tests::{FixedSource, episode},
    };

    #[tokio::test]
    async fn first_run_announces_latest() {
        let db = memory().await;
        let source = FixedSource::with(vec![episode(1), episode(2), episode(3)]);

        assert!(check(&source, &db).await.unwrap());
        assert_eq!(
            marker(&db).await.unwrap().as_deref(),
            Some("https://example.com/3")
        );
    }

    #[tokio::test]
    async fn unchanged_feed_only_fires_once() {
        let db = memory().await;
        let source = FixedSource::with(vec![episode(1), episode(2)]);

        assert!(check(&source, &db).await.unwrap());
        assert!(!check(&source, &db).await.unwrap());
    }

    #[tokio::test]
    async fn marker_equal_to_latest_is_quiet() {
        let db = memory().await;
        advance_marker(&db, "https://example.com/3").await.unwrap();
        let source = FixedSource::with(vec![episode(1), episode(2), episode(3)]);

        assert!(!check(&source, &db).await.unwrap());
    }

    #[tokio::test]
    async fn empty_fetch_keeps_marker() {
        let db = memory().await;
        advance_marker(&db, "https://example.com/2").await.unwrap();
        let source = FixedSource::with(Vec::new());

        assert!(!check(&source, &db).await.unwrap());
        assert_eq!(
            marker(&db).await.unwrap().as_deref(),
            Some("https://example.com/2")
        );
    }

    #[tokio::test]
    async fn new_episode_after_announcement() {
        let db = memory().await;
        let source = FixedSource::with(vec![episode(1)]);
        assert!(check(&source, &db).await.unwrap());

        source.set(vec![episode(1), episode(2)]).await;
        let found = detect(&source, &db).await.unwrap();
        assert_eq!(found, Some(episode(2)));
    }

    #[tokio::test]
    async fn linkless_entries_are_passed_over() {
        let db = memory().await;
        let linkless = Episode {
            title: "Trailer".to_string(),
            ..Default::default()
        };
        let source = FixedSource::with(vec![episode(1), linkless.clone()]);

        assert_eq!(detect(&source, &db).await.unwrap(), Some(episode(1)));
        assert_eq!(
            marker(&db).await.unwrap().as_deref(),
            Some("https://example.com/1")
        );

        source.set(vec![linkless]).await;
        assert_eq!(peek_latest(&source).await, None);
        assert!(!check(&source, &db).await.unwrap());
    }

    #[tokio::test]
    async fn peek_does_not_write() {
        let db = memory().await;
        let source = FixedSource::with(vec![episode(1)]);

        assert_eq!(peek_latest(&source).await, Some(episode(1)));
        assert_eq!(marker(&db).await.unwrap(), None);
    }
}
