pub mod filter;

use anyhow::Result;
use serenity::{all::Message, async_trait, prelude::*};
use tracing::{debug, error, info, warn};

pub use filter::{Filter, Violation};

use crate::data::Database;

/// The side of a moderated message that talks to the outside world.
#[async_trait]
pub trait Target: Send + Sync {
    /// Owner or administrator.
    async fn is_elevated(&self) -> Result<bool>;
    async fn delete(&self) -> Result<()>;
    async fn warn(&self, violation: &Violation) -> Result<()>;
    async fn record(&self, violation: &Violation) -> Result<()>;
}

/// Runs the filter against `text`. The sender's role is only resolved for
/// matching messages; elevated senders and senders whose role cannot be
/// resolved are left alone. Each step after that is best-effort.
pub async fn moderate(filter: &Filter, text: &str, target: &dyn Target) -> Option<Violation> {
    if !filter.enabled() {
        return None;
    }

    let violation = filter.inspect(text)?;

    match target.is_elevated().await {
        Ok(true) => return None,
        Ok(false) => {}
        Err(e) => {
            warn!("Unable to resolve sender role, skipping moderation: {}", e);
            return None;
        }
    }

    info!("Removing message: {}", violation);

    if let Err(e) = target.delete().await {
        error!("Failed to delete message: {}", e);
    }
    if let Err(e) = target.warn(&violation).await {
        error!("Failed to send moderation warning: {}", e);
    }
    if let Err(e) = target.record(&violation).await {
        error!("Failed to write moderation log: {}", e);
    }

    Some(violation)
}

/// A guild message as a moderation target.
pub struct GuildMessage<'a> {
    ctx: &'a Context,
    message: &'a Message,
    database: &'a Database,
}

impl<'a> GuildMessage<'a> {
    pub fn new(ctx: &'a Context, message: &'a Message, database: &'a Database) -> Self {
        Self {
            ctx,
            message,
            database,
        }
    }
}

#[async_trait]
impl<'a> Target for GuildMessage<'a> {
    async fn is_elevated(&self) -> Result<bool> {
        let guild_id = self
            .message
            .guild_id
            .ok_or_else(|| anyhow::anyhow!("Not a guild message"))?;
        let author = self.message.author.id;

        let owner = self.ctx.cache.guild(guild_id).map(|g| g.owner_id);
        if owner == Some(author) {
            return Ok(true);
        }

        let member = guild_id.member(&self.ctx.http, author).await?;
        #[allow(deprecated)]
        let permissions = member.permissions(&self.ctx.cache)?;
        debug!("Resolved permissions for {}: {:?}", author, permissions);
        Ok(permissions.administrator())
    }

    async fn delete(&self) -> Result<()> {
        self.message.delete(self.ctx).await?;
        Ok(())
    }

    async fn warn(&self, _violation: &Violation) -> Result<()> {
        let text = format!(
            "<@{}>, сообщение удалено: реклама, спам и номера телефонов в чате запрещены.",
            self.message.author.id
        );
        self.message.channel_id.say(&self.ctx.http, text).await?;
        Ok(())
    }

    async fn record(&self, violation: &Violation) -> Result<()> {
        let guild_id = self.message.guild_id.map(|g| g.get()).unwrap_or_default();
        self.database
            .log_moderation(
                guild_id,
                self.message.channel_id.get(),
                self.message.author.id.get(),
                &violation.reason(),
                &self.message.content,
            )
            .await
    }
}
