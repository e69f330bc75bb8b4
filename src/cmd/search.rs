use std::{collections::HashMap, time::Duration};

use anyhow::Result;
use serenity::{
    all::{CreateActionRow, CreateButton, CreateMessage, Message, MessageFlags},
    prelude::*,
};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info};

use crate::{
    cmd::menu::Action,
    data::models::Episode,
    scheduler::cache::Catalog,
    util::markup,
};

const MAX_RESULTS: usize = 5;

/// One-shot "next message is a search query" flags, keyed by
/// (channel id, user id).
pub struct SearchSessions {
    ttl: Duration,
    armed: Mutex<HashMap<(u64, u64), Instant>>,
}

impl SearchSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            armed: Mutex::new(HashMap::new()),
        }
    }

    pub async fn arm(&self, channel_id: u64, user_id: u64) {
        let mut armed = self.armed.lock().await;
        armed.retain(|_, at| at.elapsed() <= self.ttl);
        armed.insert((channel_id, user_id), Instant::now());
    }

    /// Clears the flag and reports whether it was set and still fresh.
    pub async fn take(&self, channel_id: u64, user_id: u64) -> bool {
        let armed_at = self.armed.lock().await.remove(&(channel_id, user_id));
        match armed_at {
            Some(at) if at.elapsed() <= self.ttl => true,
            Some(_) => {
                debug!("Search mode for {} in {} expired", user_id, channel_id);
                false
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Search,
    Moderate,
    Ignore,
}

/// Decides what a plain text message is. An armed search flag wins and is
/// consumed; otherwise guild messages go to moderation.
pub async fn route(
    sessions: &SearchSessions,
    channel_id: u64,
    user_id: u64,
    in_guild: bool,
) -> Route {
    if sessions.take(channel_id, user_id).await {
        Route::Search
    } else if in_guild {
        Route::Moderate
    } else {
        Route::Ignore
    }
}

/// Answers `message` as a search query.
pub async fn answer(ctx: &Context, message: &Message, catalog: &Catalog) -> Result<()> {
    let query = message.content.trim();
    let results = catalog.search(query, MAX_RESULTS).await;
    info!(
        "Search '{}' by {}: {} results",
        query,
        message.author.id,
        results.len()
    );

    let reply = CreateMessage::new()
        .content(render(query, &results))
        .components(vec![CreateActionRow::Buttons(vec![
            CreateButton::new(Action::Search.custom_id()).label("🔎 Искать ещё"),
            CreateButton::new(Action::Menu.custom_id()).label("🔙 Обратно"),
        ])])
        .flags(MessageFlags::SUPPRESS_EMBEDS)
        .reference_message(message);

    message.channel_id.send_message(&ctx.http, reply).await?;
    Ok(())
}

pub fn render(query: &str, results: &[Episode]) -> String {
    if results.is_empty() {
        return format!("По запросу «{}» ничего не нашлось 🤷", markup::escape(query));
    }

    let mut text = format!("Нашлось по запросу «{}»:\n", markup::escape(query));
    for (i, episode) in results.iter().enumerate() {
        text.push_str(&format!(
            "\n{}. **{}**\n{}",
            i + 1,
            markup::escape(&episode.title),
            episode.url
        ));
    }
    text
}
