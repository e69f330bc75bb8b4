use anyhow::Result;
use serenity::{
    all::{CommandInteraction, CreateInteractionResponse},
    prelude::*,
};
use tracing::info;

use crate::{
    cmd::{display_name, menu},
    data::Database,
    util::markup,
};

pub async fn execute(
    ctx: &Context,
    command: &CommandInteraction,
    database: &Database,
) -> Result<()> {
    let user = &command.user;
    let name = display_name(user);
    let returning = database.user(user.id.get()).await?.is_some();
    database.touch_user(user.id.get(), &name).await?;
    info!("Showing menu to {} (returning: {})", user.id, returning);

    let mut page = menu::main_page();
    page.content = format!("{}\n\n{}", greeting(&name, returning), page.content);

    let response = CreateInteractionResponse::Message(page.message().ephemeral(true));
    command.create_response(&ctx.http, response).await?;
    Ok(())
}

fn greeting(name: &str, returning: bool) -> String {
    if returning {
        format!("С возвращением, {}! 👋", markup::escape(name))
    } else {
        "Большой привет от маленькой компании подкаста Чё там новости!👋".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_depends_on_first_contact() {
        assert!(greeting("Аня", false).contains("Большой привет"));
        assert_eq!(greeting("Аня", true), "С возвращением, Аня! 👋");
    }
}
