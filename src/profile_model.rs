//! # Profile Data Model
//!
//! Wire types exchanged with the remote directory service: user records,
//! conversations and their messages.
//!
//! Timestamps are sent as ISO-8601 UTC strings with millisecond precision
//! and a `Z` suffix, e.g. `2025-06-22T19:52:30.467Z`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Sender tag used for every message originating from a chat user
pub const USER_SENDER: &str = "user";

/// Placeholder text a new conversation is seeded with
pub const STARTING_MESSAGE: &str = "STARTING_MESSAGE";

/// Gender as chosen from the registration keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /// Callback payload carried by the inline button for this gender
    pub fn callback_data(self) -> &'static str {
        match self {
            Gender::Male => "gender_male",
            Gender::Female => "gender_female",
        }
    }

    /// Inverse of [`Gender::callback_data`]
    pub fn from_callback_data(data: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.callback_data() == data)
    }
}

/// User record as stored by the directory service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Telegram chat identifier
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    pub language: String,
    pub recommendation_method: String,
    pub launch_count: u32,
    pub conversations_count: u32,
    pub current_bundle_version: String,
    pub bundle_version_at_install: String,
}

impl UserRecord {
    /// A freshly registered user with zeroed counters
    pub fn new(
        id: i64,
        name: impl Into<String>,
        language: impl Into<String>,
        recommendation_method: impl Into<String>,
        bundle_version: impl Into<String>,
    ) -> Self {
        let bundle_version = bundle_version.into();
        Self {
            id,
            name: name.into(),
            surname: None,
            gender: None,
            language: language.into(),
            recommendation_method: recommendation_method.into(),
            launch_count: 0,
            conversations_count: 0,
            current_bundle_version: bundle_version.clone(),
            bundle_version_at_install: bundle_version,
        }
    }

    pub fn with_surname(mut self, surname: impl Into<String>) -> Self {
        self.surname = Some(surname.into());
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }
}

/// Result of probing the directory for a chat id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLookup {
    Found,
    NotFound,
}

impl UserLookup {
    pub fn is_found(self) -> bool {
        matches!(self, UserLookup::Found)
    }
}

/// One message inside a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub sender: String,
    pub text: String,
    pub time: String,
}

impl ConversationMessage {
    /// Message authored by the chat user at `sent_at`
    pub fn from_user(text: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self {
            sender: USER_SENDER.to_string(),
            text: text.into(),
            time: format_timestamp(sent_at),
        }
    }
}

/// Payload creating a new conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConversation {
    pub user_id: i64,
    pub messages: Vec<ConversationMessage>,
}

impl NewConversation {
    /// Conversation seeded with the placeholder starting message
    pub fn seeded(user_id: i64, started_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            messages: vec![ConversationMessage::from_user(STARTING_MESSAGE, started_at)],
        }
    }
}

/// Format a timestamp the way the directory service expects
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
