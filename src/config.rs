use std::time::Duration;

use anyhow::{Context as _, Result};
use serde::Deserialize;
use url::Url;

const DEFAULT_PATH: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    pub feed: FeedConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub token: String,
    #[serde(default)]
    pub admin_ids: Vec<u64>,
    pub announce_channel_id: u64,
    #[serde(default = "default_search_ttl")]
    pub search_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub url: String,
    #[serde(default = "default_cache_expiry")]
    pub cache_expiry_minutes: u64,
    #[serde(default = "default_refresh_cron")]
    pub refresh_cron: String,
    #[serde(default = "default_publish_cron")]
    pub publish_cron: String,
    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_secs: u64,
    #[serde(default = "default_fanout_concurrency")]
    pub fanout_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_banned_words")]
    pub banned_words: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_search_ttl() -> u64 {
    300
}

fn default_cache_expiry() -> u64 {
    60
}

fn default_refresh_cron() -> String {
    "0 0 * * * *".to_string()
}

fn default_publish_cron() -> String {
    "0 0 10 * * Mon,Thu".to_string()
}

fn default_delivery_timeout() -> u64 {
    15
}

fn default_fanout_concurrency() -> usize {
    4
}

fn default_database_url() -> String {
    "sqlite://podbot.db".to_string()
}

fn default_true() -> bool {
    true
}

fn default_banned_words() -> Vec<String> {
    [
        "casino",
        "казино",
        "ставки на спорт",
        "заработок без вложений",
        "быстрый заработок",
        "crypto giveaway",
        "free nitro",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            banned_words: default_banned_words(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Reads `$PODBOT_CONFIG`, falling back to `config.toml`.
    pub fn load() -> Result<Self> {
        let path = std::env::var("PODBOT_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.bot.token.trim().is_empty() {
            return Err(anyhow::anyhow!("bot.token must not be empty"));
        }

        // Discord ids are non-zero; serenity panics when building one from 0.
        if self.bot.announce_channel_id == 0 {
            return Err(anyhow::anyhow!("bot.announce_channel_id must be a Discord channel id"));
        }
        if self.bot.admin_ids.contains(&0) {
            return Err(anyhow::anyhow!("bot.admin_ids must not contain 0"));
        }

        let url = Url::parse(&self.feed.url)
            .with_context(|| format!("Invalid feed.url: {}", self.feed.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow::anyhow!("feed.url must be http or https"));
        }

        if self.feed.refresh_cron.trim().is_empty() || self.feed.publish_cron.trim().is_empty() {
            return Err(anyhow::anyhow!("feed cron expressions must not be empty"));
        }

        Ok(())
    }

    pub fn cache_expiry(&self) -> Duration {
        Duration::from_secs(self.feed.cache_expiry_minutes * 60)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.feed.delivery_timeout_secs)
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.bot.search_ttl_secs)
    }

    pub fn is_admin(&self, user_id: u64) -> bool {
        self.bot.admin_ids.contains(&user_id)
    }
}
