use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use recsys_bot::bot::{self, BotContext};
use recsys_bot::config::BotConfig;
use recsys_bot::dialogue::Command;
use recsys_bot::directory::DirectoryClient;
use recsys_bot::localization::LocalizationManager;
use recsys_bot::webhook;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();

    info!("Starting recommender systems Telegram bot");

    let config = BotConfig::from_env()?;
    let bot = Bot::new(config.bot_token.clone());

    let me = bot.get_me().await.context("Failed to reach the Telegram Bot API")?;
    let bot_username = me.user.username.clone().unwrap_or_default();
    info!(bot_username = %bot_username, "Bot identity resolved");

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register the command list");
    }

    let directory = DirectoryClient::new(&config.directory)?;
    info!(base_url = %directory.base_url(), "Directory client initialized");

    let localization = Arc::new(LocalizationManager::new()?);

    let ctx = Arc::new(BotContext::new(
        Arc::new(bot.clone()),
        Arc::new(directory),
        localization,
        config.dialogue.clone(),
        bot_username,
    ));

    match config.webhook_endpoint() {
        Some(endpoint) => {
            let url = endpoint
                .parse::<reqwest::Url>()
                .with_context(|| format!("Invalid webhook URL: {endpoint}"))?;
            bot.set_webhook(url).await?;
            info!(webhook = %endpoint, "Webhook registered with Telegram");

            webhook::serve(ctx, config.bind_addr).await?;
        }
        None => {
            info!("WEBHOOK_URL not set, starting long polling");
            bot.delete_webhook().await?;

            let handler = dptree::entry()
                .branch(Update::filter_message().endpoint(bot::message_handler))
                .branch(Update::filter_callback_query().endpoint(bot::callback_handler));

            Dispatcher::builder(bot, handler)
                .dependencies(dptree::deps![ctx])
                .enable_ctrlc_handler()
                .build()
                .dispatch()
                .await;
        }
    }

    info!("Bot stopped");
    Ok(())
}
