use crate::dependencies::BotDependencies;
use anyhow::Result;
use teloxide::{
    Bot,
    dispatching::{DpHandlerDescription, HandlerExt, UpdateFilterExt},
    dptree::{self, Handler},
    types::{Me, Message, Update},
};

use crate::{bot::answers::answers, bot::handler::handle_message, commands::Command};

/// Messages sent by the bot itself are never processed.
fn is_from_other_user(msg: &Message, me: &Me) -> bool {
    msg.from.as_ref().map_or(true, |user| user.id != me.user.id)
}

fn is_text_message(msg: &Message) -> bool {
    msg.text().is_some()
}

pub fn handler_tree() -> Handler<'static, Result<()>, DpHandlerDescription> {
    dptree::entry().branch(
        Update::filter_message()
            .filter(|msg: Message, me: Me| is_from_other_user(&msg, &me))
            .branch(
                dptree::entry()
                    .filter_command::<Command>()
                    .endpoint(answers),
            )
            .branch(
                // Everything else with text goes through the conversation flow
                dptree::entry()
                    .filter(|msg: Message| is_text_message(&msg))
                    .endpoint(
                        |bot: Bot, msg: Message, bot_deps: BotDependencies| async move {
                            handle_message(bot, msg, bot_deps).await
                        },
                    ),
            ),
    )
}
