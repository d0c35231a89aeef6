//! Outbound side of the bot: everything that talks back to Telegram

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, MessageId, ReplyMarkup};

use super::ui_builder::OutgoingMessage;

/// Sends rendered messages to chats
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a new message to the chat
    async fn send_prompt(&self, chat_id: ChatId, message: OutgoingMessage) -> Result<()>;

    /// Replace the text of an earlier bot message
    async fn edit_prompt(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: OutgoingMessage,
    ) -> Result<()>;

    /// Answer the callback query to remove the loading state
    async fn ack_callback(&self, query: &CallbackQuery) -> Result<()>;
}

#[async_trait]
impl Messenger for Bot {
    async fn send_prompt(&self, chat_id: ChatId, message: OutgoingMessage) -> Result<()> {
        let mut request = self.send_message(chat_id, message.text);
        if let Some(markup) = message.markup {
            request = request.reply_markup(markup);
        }
        request.await?;
        Ok(())
    }

    async fn edit_prompt(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: OutgoingMessage,
    ) -> Result<()> {
        let mut request = self.edit_message_text(chat_id, message_id, message.text);
        // Only inline keyboards can be attached to an edited message
        if let Some(ReplyMarkup::InlineKeyboard(keyboard)) = message.markup {
            request = request.reply_markup(keyboard);
        }
        request.await?;
        Ok(())
    }

    async fn ack_callback(&self, query: &CallbackQuery) -> Result<()> {
        self.answer_callback_query(query.id.clone()).await?;
        Ok(())
    }
}
