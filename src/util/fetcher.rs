use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serenity::async_trait;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{data::models::Episode, util::parser};

const MAX_FEED_BYTES: usize = 5_000_000;
const USER_AGENT: &str = "Mozilla/5.0 podbot";

/// Anything that can produce the current episode list.
///
/// Implementations fail soft: an unreachable or broken feed yields an empty
/// list, which callers treat as "no data this cycle".
#[async_trait]
pub trait EpisodeSource: Send + Sync {
    async fn fetch(&self) -> Vec<Episode>;
}

pub struct FeedFetcher {
    client: Client,
    url: String,
}

impl FeedFetcher {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    async fn download(&self) -> Result<Vec<u8>> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("HTTP {}", response.status()));
        }

        let bytes = response.bytes().await?;
        if bytes.len() > MAX_FEED_BYTES {
            return Err(anyhow::anyhow!("Feed too large: {} bytes", bytes.len()));
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl EpisodeSource for FeedFetcher {
    async fn fetch(&self) -> Vec<Episode> {
        let content = match timeout(Duration::from_secs(40), self.download()).await {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => {
                warn!("Failed to fetch feed {}: {}", self.url, e);
                return Vec::new();
            }
            Err(_) => {
                warn!("Timeout fetching feed {}", self.url);
                return Vec::new();
            }
        };

        match parser::parse(&content) {
            Ok(episodes) => {
                debug!("Feed {} has {} episodes", self.url, episodes.len());
                episodes
            }
            Err(e) => {
                warn!("Failed to parse feed {}: {}", self.url, e);
                Vec::new()
            }
        }
    }
}
