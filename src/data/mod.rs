pub mod models;

use std::str::FromStr;

use anyhow::Result;
use models::{ModerationEntry, Stats, Subscriber, User};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

/// Settings key holding the url of the last announced episode.
pub const LAST_POSTED_KEY: &str = "last_posted_url";

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects and applies the embedded migrations.
    ///
    /// In-memory databases are pinned to a single connection that never
    /// expires, otherwise every pooled connection would see its own empty
    /// database.
    pub async fn open(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:");

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn setting(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns false when the user was already subscribed.
    pub async fn subscribe(&self, user_id: u64) -> Result<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO subscriptions (user_id) VALUES (?)")
            .bind(user_id as i64)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn subscribers(&self) -> Result<Vec<Subscriber>> {
        let rows = sqlx::query_as::<_, Subscriber>(
            "SELECT user_id, subscribed_at FROM subscriptions ORDER BY subscribed_at, user_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn touch_user(&self, id: u64, display_name: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, display_name, last_seen) VALUES (?, ?, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(id as i64)
        .bind(display_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn user(&self, id: u64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, display_name, last_seen FROM users WHERE id = ?",
        )
        .bind(id as i64)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn log_moderation(
        &self,
        guild_id: u64,
        channel_id: u64,
        user_id: u64,
        reason: &str,
        content: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO moderation_log (guild_id, channel_id, user_id, reason, content)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(guild_id as i64)
        .bind(channel_id as i64)
        .bind(user_id as i64)
        .bind(reason)
        .bind(content)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn moderation_entries(&self, limit: i64) -> Result<Vec<ModerationEntry>> {
        let rows = sqlx::query_as::<_, ModerationEntry>(
            "SELECT id, guild_id, channel_id, user_id, reason, content, created_at \
             FROM moderation_log ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn stats(&self) -> Result<Stats> {
        let users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let subscribers = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscriptions")
            .fetch_one(&self.pool)
            .await?;
        let deletions = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM moderation_log")
            .fetch_one(&self.pool)
            .await?;

        Ok(Stats {
            users,
            subscribers,
            deletions,
        })
    }
}

#[cfg(test)]
pub(crate) async fn memory() -> Database {
    Database::open("sqlite::memory:")
        .await
        .expect("in-memory database")
}
