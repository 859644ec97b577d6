use anyhow::Result;
use teloxide::{Bot, types::Message};

use super::handler::handle_start;
use crate::commands::Command;

pub async fn answers(bot: Bot, msg: Message, cmd: Command) -> Result<()> {
    match cmd {
        Command::Start => handle_start(bot, msg).await?,
    };
    Ok(())
}
