pub mod forcepost;
pub mod menu;
pub mod search;
pub mod start;
pub mod stats;
pub mod subscribe;

use anyhow::Result;
use serenity::{
    all::{
        ActivityData, CommandInteraction, CreateCommand, CreateInteractionResponse,
        CreateInteractionResponseMessage, Http, OnlineStatus, User,
    },
    prelude::*,
};
use tracing::{debug, error, info};

use crate::{config::Config, data::Database};

pub fn commands() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("start").description("Open the podcast menu"),
        CreateCommand::new("subscribe").description("Get new episodes in your direct messages"),
        CreateCommand::new("stats").description("Bot statistics (admins only)"),
        CreateCommand::new("forcepost")
            .description("Announce the latest episode now (admins only)"),
    ]
}

/// Shows the subscriber count as the bot's "Listening to" status.
pub async fn update_presence(ctx: &Context, database: &Database) {
    match database.stats().await {
        Ok(stats) => {
            let count = stats.subscribers;
            let activity = ActivityData::listening(format!("{} subscribers", count));
            ctx.set_presence(Some(activity), OnlineStatus::Online);
            info!("Updated status: Listening to {} subscribers", count);
        }
        Err(e) => error!("Failed to get subscriber count for status: {}", e),
    }
}

pub fn display_name(user: &User) -> String {
    user.global_name.clone().unwrap_or_else(|| user.name.clone())
}

/// Rejects non-admins with an ephemeral message. Returns whether the caller
/// may proceed.
pub async fn require_admin(
    http: &Http,
    command: &CommandInteraction,
    config: &Config,
) -> Result<bool> {
    if config.is_admin(command.user.id.get()) {
        return Ok(true);
    }

    debug!(
        "Rejected /{} from non-admin {}",
        command.data.name, command.user.id
    );
    respond(
        command,
        http,
        "Эта команда доступна только администраторам.",
    )
    .await?;
    Ok(false)
}

pub async fn respond(command: &CommandInteraction, http: &Http, content: &str) -> Result<()> {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    );
    command.create_response(http, response).await?;
    Ok(())
}

pub async fn defer_response(command: &CommandInteraction, http: &Http) -> Result<()> {
    let response =
        CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new().ephemeral(true));
    command.create_response(http, response).await?;
    Ok(())
}
