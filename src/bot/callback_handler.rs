//! Callback Handler module for processing inline keyboard callback queries

use std::sync::Arc;

use anyhow::Result;
use teloxide::types::CallbackQuery;
use tracing::debug;

use crate::dialogue::Event;
use crate::localization::detect_language;
use crate::profile_model::Gender;

use super::dialogue_manager::{run_turn, BotContext, Turn};

/// Handle callback queries from inline keyboards
pub async fn callback_handler(q: CallbackQuery, ctx: Arc<BotContext>) -> Result<()> {
    debug!(user_id = %q.from.id, data = ?q.data, "Received callback query from user");

    let gender = q.data.as_deref().and_then(Gender::from_callback_data);

    let result = match (gender, &q.message) {
        (Some(gender), Some(message)) => {
            let turn = Turn {
                chat_id: message.chat().id,
                language: detect_language(q.from.language_code.as_deref()),
                callback_message: Some(message.id()),
            };
            run_turn(&ctx, turn, Event::GenderSelected(gender)).await
        }
        _ => {
            // Unknown payload or the message is gone
            debug!(user_id = %q.from.id, "Ignoring callback query");
            Ok(())
        }
    };

    // Answer the callback query to remove the loading state
    ctx.messenger.ack_callback(&q).await?;

    result
}
