//! Telegram-facing handlers for zapbase_bot.
use anyhow::Result as AnyResult;
use std::time::Duration;
use teloxide::{prelude::*, types::ChatAction};
use tokio::time::sleep;

use crate::dependencies::BotDependencies;

const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

const WELCOME_MESSAGE: &str = "👋 Hi, I'm Frechi, your ZapBase assistant!

Here is what I can do:
• Check your balance: just ask \"what's my balance?\"
• Send ETH to a basename: \"send 0.01 eth to alice.base.eth\", then reply 'yes' to confirm
• Answer questions about ZapBase: say \"help\"";

/// Split a message into chunks that fit within Telegram's message limit
fn split_message(text: &str) -> Vec<String> {
    if text.len() <= TELEGRAM_MESSAGE_LIMIT {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current_chunk = String::new();

    for line in text.lines() {
        if current_chunk.len() + line.len() + 1 > TELEGRAM_MESSAGE_LIMIT {
            if !current_chunk.is_empty() {
                chunks.push(current_chunk.trim().to_string());
                current_chunk.clear();
            }

            // A single oversized line is broken up on word boundaries
            if line.len() > TELEGRAM_MESSAGE_LIMIT {
                for word in line.split_whitespace() {
                    if !current_chunk.is_empty()
                        && current_chunk.len() + word.len() + 1 > TELEGRAM_MESSAGE_LIMIT
                    {
                        chunks.push(current_chunk.trim().to_string());
                        current_chunk.clear();
                    }
                    if !current_chunk.is_empty() {
                        current_chunk.push(' ');
                    }
                    current_chunk.push_str(word);
                }
                continue;
            }

            current_chunk.push_str(line);
        } else {
            if !current_chunk.is_empty() {
                current_chunk.push('\n');
            }
            current_chunk.push_str(line);
        }
    }

    if !current_chunk.is_empty() {
        chunks.push(current_chunk.trim().to_string());
    }

    chunks
}

/// Send a potentially long plain-text message, splitting it if necessary
async fn send_long_message(bot: &Bot, chat_id: ChatId, text: &str) -> AnyResult<()> {
    for (i, chunk) in split_message(text).iter().enumerate() {
        if i > 0 {
            // Small delay between messages to avoid rate limiting
            sleep(Duration::from_millis(100)).await;
        }
        bot.send_message(chat_id, chunk).await?;
    }
    Ok(())
}

pub async fn handle_start(bot: Bot, msg: Message) -> AnyResult<()> {
    bot.send_message(msg.chat.id, WELCOME_MESSAGE).await?;
    Ok(())
}

pub async fn handle_message(bot: Bot, msg: Message, bot_deps: BotDependencies) -> AnyResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let user_id = msg.from.as_ref().map(|u| u.id.0).unwrap_or(0);
    log::info!("User ({}) in chat {}: {}", user_id, msg.chat.id, text);

    if let Err(e) = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await {
        log::warn!("Failed to send typing action to chat {}: {}", msg.chat.id, e);
    }

    let reply = bot_deps.flow.handle_text(msg.chat.id.0, text).await;
    send_long_message(&bot, msg.chat.id, &reply).await
}
