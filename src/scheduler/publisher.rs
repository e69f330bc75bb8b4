use std::{fmt, sync::Arc, time::Duration};

use anyhow::Result;
use futures::stream::{self, StreamExt};
use serenity::{
    all::{
        ChannelId, CreateActionRow, CreateButton, CreateMessage, Http, MessageFlags, UserId,
    },
    async_trait,
};
use tokio::time::timeout;
use tracing::{info, warn};
use url::Url;

use crate::{
    data::{Database, models::Episode},
    scheduler::detector,
    util::{fetcher::EpisodeSource, markup},
};

const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Channel(u64),
    User(u64),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Channel(id) => write!(f, "channel {}", id),
            Destination::User(id) => write!(f, "user {}", id),
        }
    }
}

/// Rendered new-episode message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
}

impl Announcement {
    pub fn new(episode: &Episode) -> Self {
        let title = if episode.title.trim().is_empty() {
            "Новый выпуск".to_string()
        } else {
            markup::truncate(episode.title.trim(), MAX_TITLE_CHARS)
        };

        let description = Some(markup::clean(&episode.description))
            .filter(|d| !d.is_empty())
            .map(|d| markup::truncate(&d, MAX_DESCRIPTION_CHARS));

        Self {
            title,
            url: episode.url.clone(),
            description,
        }
    }

    /// Markdown body. The url sits on its own line so it stays clickable even
    /// with link previews suppressed.
    pub fn content(&self) -> String {
        let mut content = format!("🎙 **Новый выпуск!**\n**{}**", markup::escape(&self.title));

        if let Some(description) = &self.description {
            content.push_str("\n\n");
            content.push_str(&markup::escape(description));
        }

        if !self.url.is_empty() {
            content.push_str("\n\n");
            content.push_str(&self.url);
        }

        content
    }

    pub fn components(&self) -> Vec<CreateActionRow> {
        match Url::parse(&self.url) {
            Ok(_) => vec![CreateActionRow::Buttons(vec![
                CreateButton::new_link(&self.url).label("Слушать выпуск"),
            ])],
            Err(_) => Vec::new(),
        }
    }

    pub fn message(&self) -> CreateMessage {
        CreateMessage::new()
            .content(self.content())
            .components(self.components())
            .flags(MessageFlags::SUPPRESS_EMBEDS)
    }
}

/// Delivery primitive: one attempt, one destination.
#[async_trait]
pub trait Courier: Send + Sync {
    async fn deliver(&self, destination: Destination, announcement: &Announcement) -> Result<()>;
}

pub struct DiscordCourier {
    http: Arc<Http>,
}

impl DiscordCourier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Courier for DiscordCourier {
    async fn deliver(&self, destination: Destination, announcement: &Announcement) -> Result<()> {
        if matches!(destination, Destination::Channel(0) | Destination::User(0)) {
            return Err(anyhow::anyhow!("Invalid destination {}", destination));
        }

        match destination {
            Destination::Channel(id) => {
                ChannelId::new(id)
                    .send_message(&self.http, announcement.message())
                    .await?;
            }
            Destination::User(id) => {
                UserId::new(id)
                    .direct_message(&self.http, announcement.message())
                    .await?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct Publisher {
    source: Arc<dyn EpisodeSource>,
    database: Arc<Database>,
    courier: Arc<dyn Courier>,
    channel_id: u64,
    delivery_timeout: Duration,
    concurrency: usize,
}

impl Publisher {
    pub fn new(
        source: Arc<dyn EpisodeSource>,
        database: Arc<Database>,
        courier: Arc<dyn Courier>,
        channel_id: u64,
    ) -> Self {
        Self {
            source,
            database,
            courier,
            channel_id,
            delivery_timeout: Duration::from_secs(15),
            concurrency: 4,
        }
    }

    pub fn delivery_timeout(mut self, delivery_timeout: Duration) -> Self {
        self.delivery_timeout = delivery_timeout;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Announces the latest episode if it has not been announced yet.
    pub async fn publish_if_new(&self) -> Result<Option<FanoutReport>> {
        match detector::detect(self.source.as_ref(), &self.database).await? {
            Some(episode) => {
                info!("New episode found: {}", episode.url);
                self.announce(&episode).await.map(Some)
            }
            None => {
                info!("No new episode to publish");
                Ok(None)
            }
        }
    }

    /// Announces the latest episode unconditionally. `None` when the feed
    /// returned nothing.
    pub async fn force(&self) -> Result<Option<FanoutReport>> {
        let Some(episode) = detector::peek_latest(self.source.as_ref()).await else {
            warn!("Forced publish skipped: feed returned no episodes");
            return Ok(None);
        };

        detector::advance_marker(&self.database, &episode.url).await?;
        self.announce(&episode).await.map(Some)
    }

    /// Channel first, then every subscriber. A failed recipient is logged
    /// and counted, the rest still receive the message.
    pub async fn announce(&self, episode: &Episode) -> Result<FanoutReport> {
        let announcement = Announcement::new(episode);
        let mut report = FanoutReport::default();

        if self
            .deliver(Destination::Channel(self.channel_id), &announcement)
            .await
        {
            report.delivered += 1;
        } else {
            report.failed += 1;
        }

        let subscribers = self.database.subscribers().await?;
        info!(
            "Announcing {} to {} subscribers",
            announcement.url,
            subscribers.len()
        );

        let outcomes: Vec<bool> = stream::iter(subscribers)
            .map(|s| self.deliver(Destination::User(s.user_id as u64), &announcement))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for delivered in outcomes {
            if delivered {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            "Fan-out complete: {} delivered, {} failed",
            report.delivered, report.failed
        );
        Ok(report)
    }

    async fn deliver(&self, destination: Destination, announcement: &Announcement) -> bool {
        match timeout(
            self.delivery_timeout,
            self.courier.deliver(destination, announcement),
        )
        .await
        {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Failed to deliver announcement to {}: {}", destination, e);
                false
            }
            Err(_) => {
                warn!("Timed out delivering announcement to {}", destination);
                false
            }
        }
    }
}
