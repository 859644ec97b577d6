mod bot;
mod commands;
mod dependencies;
mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::{error_handlers::LoggingErrorHandler, prelude::*};
use zapbase_core::{
    ai::handler::AI,
    conversation::{
        handler::ConversationFlow,
        storage::{ConversationStore, InMemoryConversationStore, SledConversationStore},
    },
    helpers::config::ZapConfig,
    transfer::handler::AssetSender,
};

use crate::{bot::handler_tree::handler_tree, dependencies::BotDependencies};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    log::info!("Starting zapbase_bot...");

    let config = ZapConfig::from_env().context("Invalid configuration")?;

    let bot = Bot::new(config.telegram_bot_token.clone());
    let me = bot.get_me().await.context("Failed to get bot info")?;
    log::info!(
        "Authorized on account {}",
        me.user.username.as_deref().unwrap_or("<no username>")
    );

    let store: Arc<dyn ConversationStore> = match &config.state_db_path {
        Some(path) => {
            log::info!("Persisting conversation state in {}", path);
            Arc::new(SledConversationStore::open(path).context("Failed to open sled DB")?)
        }
        None => Arc::new(InMemoryConversationStore::new()),
    };

    let flow = ConversationFlow::new(
        store,
        Arc::new(AI::from_config(&config)),
        Arc::new(AssetSender::from_config(&config)),
    );
    let bot_deps = BotDependencies { flow };

    let http_addr = config.http_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = server::router::serve(&http_addr).await {
            log::error!("HTTP server on {} stopped: {}", http_addr, e);
        }
    });

    Dispatcher::builder(bot, handler_tree())
        .dependencies(dptree::deps![bot_deps])
        .default_handler(|upd| async move {
            log::debug!("Unhandled update: {:?}", upd);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
