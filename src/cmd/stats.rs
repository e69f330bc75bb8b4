use anyhow::Result;
use chrono::Utc;
use serenity::{all::CommandInteraction, prelude::*};

use crate::{
    cmd::{require_admin, respond},
    config::Config,
    data::{Database, models::Stats},
    scheduler::{cache::EpisodeCache, detector},
};

pub async fn execute(
    ctx: &Context,
    command: &CommandInteraction,
    config: &Config,
    database: &Database,
    cache: &EpisodeCache,
) -> Result<()> {
    if !require_admin(&ctx.http, command, config).await? {
        return Ok(());
    }

    let stats = database.stats().await?;
    let marker = detector::marker(database).await?;
    let last_removal = database
        .moderation_entries(1)
        .await?
        .into_iter()
        .next()
        .map(|entry| format!("{} ({})", entry.reason, entry.created_at));
    let cached = cache.get().await.len();
    let age_minutes = cache
        .fetched_at()
        .await
        .map(|at| Utc::now().signed_duration_since(at).num_minutes());

    respond(
        command,
        &ctx.http,
        &render(
            &stats,
            marker.as_deref(),
            last_removal.as_deref(),
            cached,
            age_minutes,
        ),
    )
    .await
}

fn render(
    stats: &Stats,
    marker: Option<&str>,
    last_removal: Option<&str>,
    cached: usize,
    age_minutes: Option<i64>,
) -> String {
    let cache_line = match age_minutes {
        Some(age) => format!("{} выпусков, обновлён {} мин. назад", cached, age),
        None => "ещё не загружен".to_string(),
    };

    format!(
        "📊 **Статистика**\n\
         Пользователей: {}\n\
         Подписчиков: {}\n\
         Удалено сообщений: {}\n\
         Последнее удаление: {}\n\
         Последний анонс: {}\n\
         Кэш ленты: {}",
        stats.users,
        stats.subscribers,
        stats.deletions,
        last_removal.unwrap_or("—"),
        marker.unwrap_or("—"),
        cache_line
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_reports_counts_and_cache() {
        let stats = Stats {
            users: 10,
            subscribers: 4,
            deletions: 1,
        };

        let text = render(
            &stats,
            Some("https://example.com/3"),
            Some("phone number (2025-01-01 10:00:00)"),
            12,
            Some(5),
        );
        assert!(text.contains("Пользователей: 10"));
        assert!(text.contains("Подписчиков: 4"));
        assert!(text.contains("Последний анонс: https://example.com/3"));
        assert!(text.contains("Последнее удаление: phone number"));
        assert!(text.contains("12 выпусков, обновлён 5 мин. назад"));

        let empty = render(&Stats::default(), None, None, 0, None);
        assert!(empty.contains("Последний анонс: —"));
        assert!(empty.contains("ещё не загружен"));
    }
}
