//! Message Handler module for processing incoming Telegram messages

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::debug;

use crate::dialogue::{Command, Event};
use crate::localization::{detect_language, LocalizationManager};

use super::dialogue_manager::{run_turn, BotContext, Turn};

/// Translate a message into a dialogue event.
///
/// Returns `None` for non-text messages and unknown commands, which are
/// ignored. The localized cancel button label counts as `/cancel`.
pub fn parse_message_event(
    msg: &Message,
    bot_username: &str,
    localization: &LocalizationManager,
) -> Option<Event> {
    let text = msg.text()?;
    let sent_at = msg.date;

    if text.starts_with('/') {
        // Only the command token matters, `/start deeplink` is still `/start`
        let head = text.split_whitespace().next().unwrap_or(text);
        return match Command::parse(head, bot_username) {
            Ok(command) => Some(Event::Command { command, sent_at }),
            Err(e) => {
                debug!(chat_id = %msg.chat.id, error = %e, "Ignoring unknown command");
                None
            }
        };
    }

    if localization.is_cancel_label(text) {
        return Some(Event::Command {
            command: Command::Cancel,
            sent_at,
        });
    }

    Some(Event::Text {
        text: text.to_string(),
        sent_at,
    })
}

pub async fn message_handler(msg: Message, ctx: Arc<BotContext>) -> Result<()> {
    // Extract user's language code from Telegram
    let language = detect_language(
        msg.from
            .as_ref()
            .and_then(|user| user.language_code.as_deref()),
    );

    let Some(event) = parse_message_event(&msg, &ctx.bot_username, &ctx.localization) else {
        debug!(chat_id = %msg.chat.id, "Message carries nothing the bot reacts to");
        return Ok(());
    };

    let turn = Turn {
        chat_id: msg.chat.id,
        language,
        callback_message: None,
    };
    run_turn(&ctx, turn, event).await
}
