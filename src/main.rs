use std::sync::Arc;

use anyhow::Result;
use serenity::{
    all::{
        Command, CommandInteraction, ComponentInteraction, CreateInteractionResponse,
        CreateInteractionResponseMessage, Http, Interaction, Message, Ready,
    },
    async_trait,
    prelude::*,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod cmd;
mod config;
mod data;
mod moderation;
mod scheduler;
mod util;

use cmd::search::{Route, SearchSessions};
use config::Config;
use data::Database;
use moderation::{Filter, GuildMessage};
use scheduler::{
    cache::{Catalog, EpisodeCache},
    publisher::{DiscordCourier, Publisher},
};
use util::fetcher::{EpisodeSource, FeedFetcher};

struct Handler {
    config: Arc<Config>,
    database: Arc<Database>,
    source: Arc<dyn EpisodeSource>,
    catalog: Arc<Catalog>,
    sessions: Arc<SearchSessions>,
    filter: Filter,
}

impl Handler {
    async fn update(&self, ctx: &Context) {
        cmd::update_presence(ctx, &self.database).await;
    }

    async fn command(&self, ctx: &Context, command: &CommandInteraction) -> Result<()> {
        match command.data.name.as_str() {
            "start" => cmd::start::execute(ctx, command, &self.database).await,
            "subscribe" => {
                let result = cmd::subscribe::execute(ctx, command, &self.database).await;
                self.update(ctx).await;
                result
            }
            "stats" => {
                cmd::stats::execute(
                    ctx,
                    command,
                    &self.config,
                    &self.database,
                    self.catalog.cache(),
                )
                .await
            }
            "forcepost" => {
                let publisher = publisher(
                    &self.config,
                    self.source.clone(),
                    self.database.clone(),
                    ctx.http.clone(),
                );
                cmd::forcepost::execute(ctx, command, &self.config, &publisher).await
            }
            _ => Ok(()),
        }
    }

    async fn component(&self, ctx: &Context, component: &ComponentInteraction) -> Result<()> {
        cmd::menu::handle(
            ctx,
            component,
            &self.database,
            &self.catalog,
            &self.sessions,
        )
        .await
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let result = match &interaction {
            Interaction::Command(command) => self.command(&ctx, command).await,
            Interaction::Component(component) => self.component(&ctx, component).await,
            _ => Ok(()),
        };

        if let Err(e) = result {
            error!("Interaction error: {}", e);
            let response = CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content("An error occurred while processing the command.")
                    .ephemeral(true),
            );
            let _ = match &interaction {
                Interaction::Command(command) => {
                    command.create_response(&ctx.http, response).await
                }
                Interaction::Component(component) => {
                    component.create_response(&ctx.http, response).await
                }
                _ => Ok(()),
            };
        }
    }

    async fn message(&self, ctx: Context, message: Message) {
        if message.author.bot || message.content.trim().is_empty() {
            return;
        }

        let route = cmd::search::route(
            &self.sessions,
            message.channel_id.get(),
            message.author.id.get(),
            message.guild_id.is_some(),
        )
        .await;

        match route {
            Route::Search => {
                if let Err(e) = cmd::search::answer(&ctx, &message, &self.catalog).await {
                    error!("Search reply failed: {}", e);
                }
            }
            Route::Moderate => {
                let target = GuildMessage::new(&ctx, &message, &self.database);
                moderation::moderate(&self.filter, &message.content, &target).await;
            }
            Route::Ignore => {}
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
        self.update(&ctx).await;

        if let Err(e) = Command::set_global_commands(&ctx.http, cmd::commands()).await {
            error!("Failed to set commands: {}", e);
        }
    }
}

fn publisher(
    config: &Config,
    source: Arc<dyn EpisodeSource>,
    database: Arc<Database>,
    http: Arc<Http>,
) -> Publisher {
    Publisher::new(
        source,
        database,
        Arc::new(DiscordCourier::new(http)),
        config.bot.announce_channel_id,
    )
    .delivery_timeout(config.delivery_timeout())
    .concurrency(config.feed.fanout_concurrency)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(Config::load()?);
    init_logging(&config.logging.level);

    let database = Arc::new(Database::open(&config.database.url).await?);
    let source: Arc<dyn EpisodeSource> = Arc::new(FeedFetcher::new(&config.feed.url)?);
    let cache = Arc::new(EpisodeCache::new(config.cache_expiry()));
    let catalog = Arc::new(Catalog::new(source.clone(), cache.clone()));

    let mut client = Client::builder(
        &config.bot.token,
        GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MEMBERS,
    )
    .event_handler(Handler {
        config: config.clone(),
        database: database.clone(),
        source: source.clone(),
        catalog,
        sessions: Arc::new(SearchSessions::new(config.search_ttl())),
        filter: Filter::new(config.moderation.enabled, &config.moderation.banned_words),
    })
    .await?;

    let publisher = Arc::new(publisher(
        &config,
        source.clone(),
        database,
        client.http.clone(),
    ));
    let _scheduler = scheduler::start(&config, cache, source, publisher).await?;

    client.start().await?;
    Ok(())
}
