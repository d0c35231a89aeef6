//! Shared fakes and update builders for the integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use teloxide::types::{CallbackQuery, ChatId, MessageId, Update, UpdateKind};

use recsys_bot::bot::{BotContext, Messenger, OutgoingMessage};
use recsys_bot::config::DialogueSettings;
use recsys_bot::directory::Directory;
use recsys_bot::directory_errors::DirectoryError;
use recsys_bot::localization::LocalizationManager;
use recsys_bot::profile_model::{ConversationMessage, NewConversation, UserLookup, UserRecord};

pub const MESSAGE_DATE: i64 = 1_750_621_950;

/// In-memory directory recording every call
#[derive(Default)]
pub struct FakeDirectory {
    pub registered: Mutex<HashSet<i64>>,
    pub lookups: Mutex<Vec<i64>>,
    pub created_users: Mutex<Vec<UserRecord>>,
    pub conversations: Mutex<Vec<NewConversation>>,
    pub appended: Mutex<Vec<(String, ConversationMessage)>>,
    pub fail_lookups: AtomicBool,
    pub fail_create_users: AtomicBool,
    pub fail_conversations: AtomicBool,
}

impl FakeDirectory {
    pub fn with_registered(chat_ids: &[i64]) -> Self {
        let directory = Self::default();
        directory.registered.lock().unwrap().extend(chat_ids);
        directory
    }

    pub fn created_users(&self) -> Vec<UserRecord> {
        self.created_users.lock().unwrap().clone()
    }

    pub fn conversations(&self) -> Vec<NewConversation> {
        self.conversations.lock().unwrap().clone()
    }

    pub fn appended(&self) -> Vec<(String, ConversationMessage)> {
        self.appended.lock().unwrap().clone()
    }

    fn unavailable() -> DirectoryError {
        DirectoryError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn lookup_user(&self, chat_id: i64) -> Result<UserLookup, DirectoryError> {
        self.lookups.lock().unwrap().push(chat_id);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        if self.registered.lock().unwrap().contains(&chat_id) {
            Ok(UserLookup::Found)
        } else {
            Ok(UserLookup::NotFound)
        }
    }

    async fn create_user(&self, user: &UserRecord) -> Result<i64, DirectoryError> {
        self.created_users.lock().unwrap().push(user.clone());
        if self.fail_create_users.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.registered.lock().unwrap().insert(user.id);
        Ok(user.id)
    }

    async fn create_conversation(&self, seed: &NewConversation) -> Result<String, DirectoryError> {
        if self.fail_conversations.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let mut conversations = self.conversations.lock().unwrap();
        conversations.push(seed.clone());
        Ok(format!("conv-{}", conversations.len()))
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        message: &ConversationMessage,
    ) -> Result<(), DirectoryError> {
        self.appended
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), message.clone()));
        Ok(())
    }
}

/// Messenger that keeps everything it was asked to send
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<(ChatId, OutgoingMessage)>>,
    pub edits: Mutex<Vec<(ChatId, MessageId, OutgoingMessage)>>,
    pub acks: AtomicUsize,
}

impl RecordingMessenger {
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, message)| message.text.clone())
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().last().cloned()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.edits.lock().unwrap().clear();
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_prompt(&self, chat_id: ChatId, message: OutgoingMessage) -> Result<()> {
        self.sent.lock().unwrap().push((chat_id, message));
        Ok(())
    }

    async fn edit_prompt(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: OutgoingMessage,
    ) -> Result<()> {
        self.edits.lock().unwrap().push((chat_id, message_id, message));
        Ok(())
    }

    async fn ack_callback(&self, _query: &CallbackQuery) -> Result<()> {
        self.acks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Messenger whose every call fails, as if Telegram were unreachable
pub struct FailingMessenger;

#[async_trait]
impl Messenger for FailingMessenger {
    async fn send_prompt(&self, _chat_id: ChatId, _message: OutgoingMessage) -> Result<()> {
        Err(anyhow!("telegram unreachable"))
    }

    async fn edit_prompt(
        &self,
        _chat_id: ChatId,
        _message_id: MessageId,
        _message: OutgoingMessage,
    ) -> Result<()> {
        Err(anyhow!("telegram unreachable"))
    }

    async fn ack_callback(&self, _query: &CallbackQuery) -> Result<()> {
        Err(anyhow!("telegram unreachable"))
    }
}

/// Recording messenger that rejects texts over Telegram's length limit
#[derive(Default)]
pub struct LimitedMessenger {
    pub inner: RecordingMessenger,
}

impl LimitedMessenger {
    pub const MAX_CHARS: usize = 4096;
}

#[async_trait]
impl Messenger for LimitedMessenger {
    async fn send_prompt(&self, chat_id: ChatId, message: OutgoingMessage) -> Result<()> {
        if message.text.chars().count() > Self::MAX_CHARS {
            return Err(anyhow!("Bad Request: message is too long"));
        }
        self.inner.send_prompt(chat_id, message).await
    }

    async fn edit_prompt(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: OutgoingMessage,
    ) -> Result<()> {
        self.inner.edit_prompt(chat_id, message_id, message).await
    }

    async fn ack_callback(&self, query: &CallbackQuery) -> Result<()> {
        self.inner.ack_callback(query).await
    }
}

pub fn build_context(
    messenger: Arc<dyn Messenger>,
    directory: Arc<dyn Directory>,
    settings: DialogueSettings,
) -> Arc<BotContext> {
    let localization = Arc::new(LocalizationManager::new().expect("catalogs load"));
    Arc::new(BotContext::new(
        messenger,
        directory,
        localization,
        settings,
        "recsys_test_bot",
    ))
}

fn user_json(chat_id: i64, language: &str) -> Value {
    json!({
        "id": chat_id,
        "is_bot": false,
        "first_name": "Alice",
        "language_code": language,
    })
}

fn chat_json(chat_id: i64) -> Value {
    json!({ "id": chat_id, "type": "private", "first_name": "Alice" })
}

/// Raw JSON of a text message update, as Telegram would post it
pub fn text_update_json(update_id: i64, chat_id: i64, text: &str, language: &str) -> Value {
    let mut message = json!({
        "message_id": update_id,
        "date": MESSAGE_DATE,
        "chat": chat_json(chat_id),
        "from": user_json(chat_id, language),
        "text": text,
    });

    if text.starts_with('/') {
        let command = text.split_whitespace().next().unwrap_or(text);
        message["entities"] = json!([{
            "type": "bot_command",
            "offset": 0,
            "length": command.encode_utf16().count(),
        }]);
    }

    json!({ "update_id": update_id, "message": message })
}

/// Parse through the serialized text, the same path the webhook body takes.
/// `from_value` does not resolve the update kind.
fn parse_update(value: Value) -> Update {
    serde_json::from_str(&value.to_string()).expect("valid update JSON")
}

pub fn text_update(update_id: i64, chat_id: i64, text: &str) -> Update {
    let update = parse_update(text_update_json(update_id, chat_id, text, "ru"));
    assert!(matches!(update.kind, UpdateKind::Message(_)), "not parsed as a message");
    update
}

/// Callback query update for a button pressed under bot message `message_id`
pub fn callback_update(update_id: i64, chat_id: i64, message_id: i32, data: &str) -> Update {
    let value = json!({
        "update_id": update_id,
        "callback_query": {
            "id": format!("cb-{update_id}"),
            "from": user_json(chat_id, "ru"),
            "chat_instance": "chat-instance",
            "data": data,
            "message": {
                "message_id": message_id,
                "date": MESSAGE_DATE,
                "chat": chat_json(chat_id),
                "from": {
                    "id": 1,
                    "is_bot": true,
                    "first_name": "RecsysBot",
                    "username": "recsys_test_bot",
                },
                "text": "Укажите ваш пол:",
            },
        },
    });
    let update = parse_update(value);
    assert!(
        matches!(update.kind, UpdateKind::CallbackQuery(_)),
        "not parsed as a callback query"
    );
    update
}
