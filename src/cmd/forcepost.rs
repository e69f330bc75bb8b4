use anyhow::Result;
use serenity::{
    all::{CommandInteraction, EditInteractionResponse},
    prelude::*,
};
use tracing::{error, info};

use crate::{
    cmd::{defer_response, require_admin},
    config::Config,
    scheduler::publisher::{FanoutReport, Publisher},
};

pub async fn execute(
    ctx: &Context,
    command: &CommandInteraction,
    config: &Config,
    publisher: &Publisher,
) -> Result<()> {
    if !require_admin(&ctx.http, command, config).await? {
        return Ok(());
    }

    defer_response(command, &ctx.http).await?;
    info!("Forced publish requested by {}", command.user.id);

    let content = match publisher.force().await {
        Ok(report) => summary(report),
        Err(e) => {
            error!("Forced publish failed: {}", e);
            format!("Не удалось опубликовать выпуск: {}", e)
        }
    };

    let edit_response = EditInteractionResponse::new().content(content);
    command.edit_response(&ctx.http, edit_response).await?;
    Ok(())
}

fn summary(report: Option<FanoutReport>) -> String {
    match report {
        Some(report) => format!(
            "Анонс отправлен: {} доставлено, {} с ошибкой",
            report.delivered, report.failed
        ),
        None => "Лента сейчас недоступна, публиковать нечего.".to_string(),
    }
}
