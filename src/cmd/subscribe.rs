use anyhow::Result;
use serenity::{all::CommandInteraction, prelude::*};
use tracing::info;

use crate::{
    cmd::{display_name, respond},
    data::Database,
};

pub fn text(newly: bool) -> &'static str {
    if newly {
        "🔔 Готово! Новые выпуски будут приходить вам в личные сообщения."
    } else {
        "Вы уже подписаны на новые выпуски 😉"
    }
}

pub async fn execute(
    ctx: &Context,
    command: &CommandInteraction,
    database: &Database,
) -> Result<()> {
    let user = &command.user;
    database.touch_user(user.id.get(), &display_name(user)).await?;

    let newly = database.subscribe(user.id.get()).await?;
    if newly {
        info!("New subscriber: {}", user.id);
    }

    respond(command, &ctx.http, text(newly)).await
}
