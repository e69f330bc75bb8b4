use anyhow::Result;
use serenity::{
    all::{
        ButtonStyle, ComponentInteraction, CreateActionRow, CreateButton,
        CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
        InteractionResponseFlags,
    },
    prelude::*,
};
use tracing::debug;

use crate::{
    cmd::{display_name, search::SearchSessions, subscribe, update_presence},
    data::{Database, models::Episode},
    scheduler::cache::Catalog,
    util::markup,
};

const SITE: &str = "http://chetamnovosti.ru";

const PLATFORMS: &[(&str, &str)] = &[
    (
        "Apple Podcasts",
        "https://podcasts.apple.com/ru/podcast/чё-там-новости/id1523225500",
    ),
    ("Яндекс.Музыка", "https://music.yandex.ru/album/11402620"),
    ("Подкасты ВКонтакте", "https://vk.com/podcasts-197058964"),
    (
        "Google Podcasts",
        "https://www.google.com/podcasts?feed=aHR0cHM6Ly9hbmNob3IuZm0vcy8yYTRhN2EyMC9wb2RjYXN0L3Jzcw==",
    ),
    ("Mave", "https://che-tam-novosti.mave.digital/"),
    ("Soundstream", "https://soundstream.media/channel/che-tam-novosti"),
    ("Spotify", "https://open.spotify.com/show/0eNkvFFle5c8NFo0GCS7WW"),
    ("Castbox", "https://castbox.fm/channel/Че-там-новости-id3103700"),
    ("Podcast.RU", "https://podcast.ru/1523225500"),
    ("PocketCast", "https://pca.st/itunes/1523225500"),
];

const SOCIAL: &[(&str, &str)] = &[
    ("Мы ВКонтакте", "https://vk.com/che_tam_novosti"),
    ("Телеграм канал", "https://t.me/CheTamNovosti"),
    ("Наш Инстаграм", "https://instagram.com/che_tam_novosti/"),
    (
        "Youtube",
        "https://www.youtube.com/channel/UCW5ggyOrfJu6CDxTFkI7V-Q",
    ),
];

const FEEDBACK: (&str, &str) = ("Пишите в Телеграме 💌", "https://t.me/+ofyomEN0RCNhZDIy");

/// Discord allows five buttons per action row.
const ROW_WIDTH: usize = 5;
const EPISODES_SHOWN: usize = 5;

/// Every button the bot renders that is handled by the bot itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Menu,
    Website,
    Listen,
    Social,
    Feedback,
    Episodes,
    Search,
    Subscribe,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Menu,
        Action::Website,
        Action::Listen,
        Action::Social,
        Action::Feedback,
        Action::Episodes,
        Action::Search,
        Action::Subscribe,
    ];

    pub fn custom_id(self) -> &'static str {
        match self {
            Action::Menu => "menu:main",
            Action::Website => "menu:website",
            Action::Listen => "menu:listen",
            Action::Social => "menu:social",
            Action::Feedback => "menu:feedback",
            Action::Episodes => "menu:episodes",
            Action::Search => "menu:search",
            Action::Subscribe => "menu:subscribe",
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.custom_id() == custom_id)
    }

    fn label(self) -> &'static str {
        match self {
            Action::Menu => "🔙 Обратно",
            Action::Website => "🔥 Наш сайт",
            Action::Listen => "🙉 Где нас послушать",
            Action::Social => "🙈 Мы в соцсетях",
            Action::Feedback => "🙊 Обратная связь",
            Action::Episodes => "🎧 Последние выпуски",
            Action::Search => "🔎 Поиск по выпускам",
            Action::Subscribe => "🔔 Подписаться",
        }
    }

    /// Actions that may change the subscriber count shown in the presence.
    fn changes_subscribers(self) -> bool {
        match self {
            Action::Subscribe => true,
            Action::Menu
            | Action::Website
            | Action::Listen
            | Action::Social
            | Action::Feedback
            | Action::Episodes
            | Action::Search => false,
        }
    }

    fn button(self) -> CreateButton {
        let style = match self {
            Action::Menu => ButtonStyle::Secondary,
            Action::Subscribe => ButtonStyle::Success,
            _ => ButtonStyle::Primary,
        };
        CreateButton::new(self.custom_id())
            .label(self.label())
            .style(style)
    }
}

/// Text plus buttons, rendered either as a new message or in place of the
/// previous menu.
pub struct Page {
    pub content: String,
    pub rows: Vec<CreateActionRow>,
}

impl Page {
    fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            rows: Vec::new(),
        }
    }

    fn links(mut self, links: &[(&str, &str)]) -> Self {
        for chunk in links.chunks(ROW_WIDTH) {
            let buttons = chunk
                .iter()
                .map(|(label, url)| CreateButton::new_link(*url).label(*label))
                .collect();
            self.rows.push(CreateActionRow::Buttons(buttons));
        }
        self
    }

    fn actions(mut self, actions: &[Action]) -> Self {
        for chunk in actions.chunks(ROW_WIDTH) {
            let buttons = chunk.iter().map(|a| a.button()).collect();
            self.rows.push(CreateActionRow::Buttons(buttons));
        }
        self
    }

    fn back(self) -> Self {
        self.actions(&[Action::Menu])
    }

    pub fn message(self) -> CreateInteractionResponseMessage {
        CreateInteractionResponseMessage::new()
            .content(self.content)
            .components(self.rows)
            .flags(InteractionResponseFlags::SUPPRESS_EMBEDS)
    }

    /// Same page as an edit of an already acknowledged interaction.
    pub fn edit(self) -> EditInteractionResponse {
        EditInteractionResponse::new()
            .content(self.content)
            .components(self.rows)
    }
}

pub fn main_page() -> Page {
    Page::new("Выберите интересующий вас раздел").actions(&[
        Action::Website,
        Action::Listen,
        Action::Social,
        Action::Feedback,
        Action::Episodes,
        Action::Search,
        Action::Subscribe,
    ])
}

fn website_page() -> Page {
    Page::new(
        "🫶 На сайте вы найдёте подробную информацию о подкасте и его ведущих\n\n\
         А ещё на страничке с выпусками мы выкладываем разные дополнительные материалы 🎁",
    )
    .links(&[("Добро пожаловать!", SITE)])
    .back()
}

fn listen_page() -> Page {
    Page::new(
        "На любой платформе ❤️ На любой вкус!\n\n\
         Подписывайтесь, чтобы не пропустить новый выпуск!",
    )
    .links(PLATFORMS)
    .back()
}

fn social_page() -> Page {
    Page::new(
        "Читайте нас! ❤️ Пишите нам!\n\n\
         Мы стараемся показывать то, о чём рассказываем. 🎥 Пруфы, линки и ролики.",
    )
    .links(SOCIAL)
    .back()
}

fn feedback_page(name: &str) -> Page {
    Page::new(format!(
        "❗Вот тут нам можно что-то написать:\n\n{}, спасибо! 📜 Обязательно всё прочитаем!",
        markup::escape(name)
    ))
    .links(&[FEEDBACK])
    .back()
}

pub fn episodes_text(episodes: &[Episode]) -> String {
    if episodes.is_empty() {
        return "Не получилось загрузить выпуски, попробуйте чуть позже 🙏".to_string();
    }

    let mut text = "🎧 Последние выпуски:\n".to_string();
    for episode in episodes {
        text.push_str(&format!(
            "\n**{}**\n{}",
            markup::escape(&episode.title),
            episode.url
        ));
    }
    text
}

fn search_page() -> Page {
    Page::new("🔎 Напишите следующим сообщением, что ищем: тему, гостя или слово из названия.")
        .back()
}

fn subscribe_page(newly: bool) -> Page {
    Page::new(subscribe::text(newly)).back()
}

pub async fn handle(
    ctx: &Context,
    interaction: &ComponentInteraction,
    database: &Database,
    catalog: &Catalog,
    sessions: &SearchSessions,
) -> Result<()> {
    let Some(action) = Action::parse(&interaction.data.custom_id) else {
        debug!("Ignoring unknown component {}", interaction.data.custom_id);
        return Ok(());
    };

    let user = &interaction.user;
    database.touch_user(user.id.get(), &display_name(user)).await?;

    let page = match action {
        Action::Menu => main_page(),
        Action::Website => website_page(),
        Action::Listen => listen_page(),
        Action::Social => social_page(),
        Action::Feedback => feedback_page(&display_name(user)),
        Action::Episodes => {
            // A stale cache means a live fetch, which can outlast the
            // interaction's response window.
            interaction
                .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
                .await?;
            let episodes = catalog.latest(EPISODES_SHOWN).await;
            let page = Page::new(episodes_text(&episodes)).back();
            interaction.edit_response(&ctx.http, page.edit()).await?;
            return Ok(());
        }
        Action::Search => {
            sessions
                .arm(interaction.channel_id.get(), user.id.get())
                .await;
            search_page()
        }
        Action::Subscribe => {
            let newly = database.subscribe(user.id.get()).await?;
            subscribe_page(newly)
        }
    };

    interaction
        .create_response(
            &ctx.http,
            CreateInteractionResponse::UpdateMessage(page.message()),
        )
        .await?;

    if action.changes_subscribers() {
        update_presence(ctx, database).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::cache::tests::episode;

    #[test]
    fn custom_ids_are_unique_and_parse_back() {
        for action in Action::ALL {
            assert_eq!(Action::parse(action.custom_id()), Some(action));
        }
        let mut ids: Vec<_> = Action::ALL.iter().map(|a| a.custom_id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), Action::ALL.len());
    }

    #[test]
    fn only_subscribe_changes_subscriber_count() {
        let changing: Vec<_> = Action::ALL
            .into_iter()
            .filter(|a| a.changes_subscribers())
            .collect();
        assert_eq!(changing, vec![Action::Subscribe]);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        assert_eq!(Action::parse("menu:unknown"), None);
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn link_pages_fit_discord_limits() {
        assert_eq!(listen_page().rows.len(), 3);
        assert_eq!(social_page().rows.len(), 2);
        assert_eq!(main_page().rows.len(), 2);
        assert!(PLATFORMS.iter().all(|(_, url)| url::Url::parse(url).is_ok()));
    }

    #[test]
    fn episodes_text_lists_titles_and_links() {
        let text = episodes_text(&[episode(3)]);
        assert!(text.contains("**Episode 3**\nhttps://example.com/3"));
        assert!(episodes_text(&[]).contains("попробуйте чуть позже"));
    }

    #[test]
    fn feedback_names_the_user() {
        assert!(feedback_page("Аня").content.contains("Аня, спасибо!"));
    }
}
