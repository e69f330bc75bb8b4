use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One item of the podcast feed. Identity is the url.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Episode {
    pub title: String,
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub display_name: String,
    pub last_seen: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscriber {
    pub user_id: i64,
    pub subscribed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ModerationEntry {
    pub id: i64,
    pub guild_id: i64,
    pub channel_id: i64,
    pub user_id: i64,
    pub reason: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub users: i64,
    pub subscribers: i64,
    pub deletions: i64,
}
