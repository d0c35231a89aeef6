//! Dialogue Manager module: runs one turn of the state machine for a chat
//! and carries out the effects it asks for.

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::types::{ChatId, MessageId};
use tracing::{debug, error, warn};

use crate::config::DialogueSettings;
use crate::dialogue::{
    transition, ChatDialogue, ChatSession, Effect, Event, RemoteOperation, Transition, TurnContext,
};
use crate::directory::Directory;
use crate::localization::LocalizationManager;

use super::messenger::Messenger;
use super::ui_builder::render_prompt;

/// Everything a handler needs, shared across updates
pub struct BotContext {
    pub messenger: Arc<dyn Messenger>,
    pub directory: Arc<dyn Directory>,
    pub storage: Arc<InMemStorage<ChatSession>>,
    pub localization: Arc<LocalizationManager>,
    pub settings: DialogueSettings,
    /// Used to accept `/command@bot_username`; empty accepts bare commands only
    pub bot_username: String,
}

impl BotContext {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        directory: Arc<dyn Directory>,
        localization: Arc<LocalizationManager>,
        settings: DialogueSettings,
        bot_username: impl Into<String>,
    ) -> Self {
        Self {
            messenger,
            directory,
            storage: InMemStorage::new(),
            localization,
            settings,
            bot_username: bot_username.into(),
        }
    }

    /// Current session for a chat, created lazily
    pub async fn session(&self, chat_id: ChatId) -> Result<ChatSession> {
        let dialogue = ChatDialogue::new(self.storage.clone(), chat_id);
        Ok(dialogue.get_or_default().await?)
    }
}

/// Where one inbound update came from
#[derive(Clone, Copy, Debug)]
pub struct Turn {
    pub chat_id: ChatId,
    pub language: &'static str,
    /// Message carrying the pressed inline button, if any
    pub callback_message: Option<MessageId>,
}

/// Feed one event into the chat's state machine and execute the resulting effects.
///
/// Effects run in order. A remote call that yields a follow-up event is
/// transitioned immediately and its effects run before the remaining ones.
/// A failed remote call drops whatever the turn had left to do.
/// The session is stored after every transition.
pub async fn run_turn(ctx: &BotContext, turn: Turn, event: Event) -> Result<()> {
    let dialogue = ChatDialogue::new(ctx.storage.clone(), turn.chat_id);
    let session = dialogue.get_or_default().await?;
    let turn_ctx = TurnContext {
        chat_id: turn.chat_id.0,
        language: turn.language,
        settings: &ctx.settings,
    };

    debug!(
        chat_id = %turn.chat_id,
        state = ?session.state,
        event = ?event,
        "Running dialogue turn"
    );

    let Transition {
        mut session,
        effects,
    } = transition(session, event, &turn_ctx);
    dialogue.update(session.clone()).await?;

    let mut queue: VecDeque<Effect> = effects.into();
    while let Some(effect) = queue.pop_front() {
        let Some(follow_up) = execute_effect(ctx, &turn, effect).await? else {
            continue;
        };

        if matches!(follow_up, Event::RemoteFailed(_)) {
            queue.clear();
        }

        let next = transition(session, follow_up, &turn_ctx);
        session = next.session;
        dialogue.update(session.clone()).await?;
        for effect in next.effects.into_iter().rev() {
            queue.push_front(effect);
        }
    }

    debug!(chat_id = %turn.chat_id, state = ?session.state, "Dialogue turn finished");
    Ok(())
}

async fn execute_effect(ctx: &BotContext, turn: &Turn, effect: Effect) -> Result<Option<Event>> {
    let chat_id = turn.chat_id;

    match effect {
        Effect::Reply(prompt) => {
            let message = render_prompt(&prompt, &ctx.localization, turn.language);
            ctx.messenger.send_prompt(chat_id, message).await?;
            Ok(None)
        }
        Effect::EditPrompt(prompt) => {
            let message = render_prompt(&prompt, &ctx.localization, turn.language);
            match turn.callback_message {
                Some(message_id) => {
                    if let Err(e) = ctx.messenger.edit_prompt(chat_id, message_id, message).await {
                        error!(chat_id = %chat_id, error = %e, "Failed to edit prompt message");
                    }
                }
                None => ctx.messenger.send_prompt(chat_id, message).await?,
            }
            Ok(None)
        }
        Effect::LookupUser(flow) => match ctx.directory.lookup_user(chat_id.0).await {
            Ok(lookup) => Ok(Some(Event::LookupCompleted {
                flow,
                registered: lookup.is_found(),
            })),
            Err(e) => Ok(Some(remote_failure(chat_id, RemoteOperation::LookupUser, &e))),
        },
        Effect::CreateUser(record) => match ctx.directory.create_user(&record).await {
            Ok(_) => Ok(None),
            Err(e) => Ok(Some(remote_failure(chat_id, RemoteOperation::CreateUser, &e))),
        },
        Effect::CreateConversation(seed) => match ctx.directory.create_conversation(&seed).await {
            Ok(conversation_id) => Ok(Some(Event::ConversationCreated { conversation_id })),
            Err(e) => Ok(Some(remote_failure(
                chat_id,
                RemoteOperation::CreateConversation,
                &e,
            ))),
        },
        Effect::AppendMessage {
            conversation_id,
            message,
        } => match ctx.directory.append_message(&conversation_id, &message).await {
            Ok(()) => Ok(None),
            Err(e) => Ok(Some(remote_failure(chat_id, RemoteOperation::AppendMessage, &e))),
        },
    }
}

fn remote_failure(
    chat_id: ChatId,
    operation: RemoteOperation,
    error: &crate::directory_errors::DirectoryError,
) -> Event {
    warn!(chat_id = %chat_id, operation = ?operation, error = %error, "Directory call failed");
    Event::RemoteFailed(operation)
}
