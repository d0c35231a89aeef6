//! Dialogue module: per-chat conversation state and the transition function.
//!
//! The machine is pure. [`transition`] takes the current [`ChatSession`] and
//! one [`Event`] and returns the next session together with the [`Effect`]s
//! the router must carry out, in order. Remote results that influence the
//! flow (lookup outcome, created conversation id, failures) come back in as
//! follow-up events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::utils::command::BotCommands;

use crate::config::{DialogueSettings, IdleTextPolicy};
use crate::profile_model::{ConversationMessage, Gender, NewConversation, UserRecord};

/// Longest accepted name or surname, in characters
pub const MAX_NAME_CHARS: usize = 255;

/// Commands understood by the bot
#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case")]
pub enum Command {
    #[command(description = "начать работу с ботом")]
    Start,
    #[command(description = "основные правила пользования ботом")]
    Help,
    #[command(description = "задать вопрос")]
    Ask,
    #[command(description = "обновить чат")]
    Reload,
    #[command(description = "войти в аккаунт")]
    LogIn,
    #[command(description = "выйти из аккаунта")]
    LogOut,
    #[command(description = "отменить текущее действие")]
    Cancel,
}

/// Which registration variant collects the name
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationFlow {
    /// `/start`: name only
    #[default]
    Quick,
    /// `/log_in`: name, surname and gender
    Full,
}

/// Where a chat currently is in the conversation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueState {
    #[default]
    Idle,
    AwaitingName {
        flow: RegistrationFlow,
    },
    AwaitingSurname,
    AwaitingGender,
    AwaitingQuestion,
}

/// Transient per-chat data
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub state: DialogueState,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub gender: Option<Gender>,
    pub active_conversation_id: Option<String>,
    pub last_message_text: Option<String>,
}

impl ChatSession {
    fn in_state(mut self, state: DialogueState) -> Self {
        self.state = state;
        self
    }

    /// Back to idle with every transient field cleared
    fn reset() -> Self {
        Self::default()
    }
}

/// Session storage keyed by chat id
pub type ChatDialogue = Dialogue<ChatSession, InMemStorage<ChatSession>>;

/// Remote operations whose failure the machine reacts to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteOperation {
    LookupUser,
    CreateUser,
    CreateConversation,
    AppendMessage,
}

/// Inputs to the state machine
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Command {
        command: Command,
        sent_at: DateTime<Utc>,
    },
    Text {
        text: String,
        sent_at: DateTime<Utc>,
    },
    GenderSelected(Gender),
    LookupCompleted {
        flow: RegistrationFlow,
        registered: bool,
    },
    ConversationCreated {
        conversation_id: String,
    },
    RemoteFailed(RemoteOperation),
}

/// Why a name was rejected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameError {
    Empty,
    TooLong,
}

/// Messages the bot can send; rendered to text and keyboards by the UI layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prompt {
    Greeting,
    AlreadyRegistered,
    AskName(RegistrationFlow),
    NameAccepted { name: String },
    AskSurname { name: String },
    AskGender,
    GenderChosen(Gender),
    UseGenderButtons,
    RegistrationComplete { name: String, surname: String },
    InvalidName(NameError),
    AskQuestion,
    QuestionEcho { text: String },
    Echo { text: String },
    Cancelled,
    Help,
    Reloaded,
    LoggedOut,
    RemoteError,
}

/// Side effects requested by a transition
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Send a new message to the chat
    Reply(Prompt),
    /// Replace the text of the message carrying the pressed inline button
    EditPrompt(Prompt),
    LookupUser(RegistrationFlow),
    CreateUser(UserRecord),
    CreateConversation(NewConversation),
    AppendMessage {
        conversation_id: String,
        message: ConversationMessage,
    },
}

/// Per-update context the transition needs besides the session
#[derive(Clone, Copy, Debug)]
pub struct TurnContext<'a> {
    pub chat_id: i64,
    pub language: &'a str,
    pub settings: &'a DialogueSettings,
}

/// Outcome of one transition
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub session: ChatSession,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn new(session: ChatSession, effects: Vec<Effect>) -> Self {
        Self { session, effects }
    }

    fn unchanged(session: ChatSession) -> Self {
        Self::new(session, Vec::new())
    }
}

/// Validates a name or surname input
pub fn validate_name(input: &str) -> Result<String, NameError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }

    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(NameError::TooLong);
    }

    Ok(trimmed.to_string())
}

/// Apply one event to a session
pub fn transition(session: ChatSession, event: Event, ctx: &TurnContext<'_>) -> Transition {
    match event {
        Event::Command { command, sent_at } => on_command(session, command, sent_at, ctx),
        Event::Text { text, sent_at } => on_text(session, text, sent_at, ctx),
        Event::GenderSelected(gender) => on_gender(session, gender, ctx),
        Event::LookupCompleted { flow, registered } => {
            if registered {
                Transition::new(
                    session.in_state(DialogueState::Idle),
                    vec![Effect::Reply(Prompt::AlreadyRegistered)],
                )
            } else {
                Transition::new(
                    session.in_state(DialogueState::AwaitingName { flow }),
                    vec![Effect::Reply(Prompt::AskName(flow))],
                )
            }
        }
        Event::ConversationCreated { conversation_id } => {
            let mut session = session;
            if session.state == DialogueState::AwaitingQuestion {
                session.active_conversation_id = Some(conversation_id);
            }
            Transition::unchanged(session)
        }
        Event::RemoteFailed(operation) => on_remote_failure(session, operation),
    }
}

fn on_command(
    session: ChatSession,
    command: Command,
    sent_at: DateTime<Utc>,
    ctx: &TurnContext<'_>,
) -> Transition {
    match command {
        Command::Start => Transition::new(
            ChatSession::reset(),
            vec![
                Effect::Reply(Prompt::Greeting),
                Effect::LookupUser(RegistrationFlow::Quick),
            ],
        ),
        Command::LogIn => Transition::new(
            ChatSession::reset(),
            vec![Effect::LookupUser(RegistrationFlow::Full)],
        ),
        Command::Ask => Transition::new(
            ChatSession::reset().in_state(DialogueState::AwaitingQuestion),
            vec![
                Effect::CreateConversation(NewConversation::seeded(ctx.chat_id, sent_at)),
                Effect::Reply(Prompt::AskQuestion),
            ],
        ),
        Command::Cancel => {
            Transition::new(ChatSession::reset(), vec![Effect::Reply(Prompt::Cancelled)])
        }
        Command::Help => Transition::new(session, vec![Effect::Reply(Prompt::Help)]),
        Command::Reload => Transition::new(session, vec![Effect::Reply(Prompt::Reloaded)]),
        Command::LogOut => Transition::new(session, vec![Effect::Reply(Prompt::LoggedOut)]),
    }
}

fn on_text(
    mut session: ChatSession,
    text: String,
    sent_at: DateTime<Utc>,
    ctx: &TurnContext<'_>,
) -> Transition {
    match session.state {
        DialogueState::Idle => match ctx.settings.idle_text {
            IdleTextPolicy::Echo => {
                Transition::new(session, vec![Effect::Reply(Prompt::Echo { text })])
            }
            IdleTextPolicy::Ignore => Transition::unchanged(session),
        },
        DialogueState::AwaitingName { flow } => {
            let name = match validate_name(&text) {
                Ok(name) => name,
                Err(e) => {
                    return Transition::new(session, vec![Effect::Reply(Prompt::InvalidName(e))])
                }
            };
            session.name = Some(name.clone());

            match flow {
                RegistrationFlow::Quick => {
                    let record = new_user_record(ctx, &name);
                    Transition::new(
                        session.in_state(DialogueState::Idle),
                        vec![
                            Effect::Reply(Prompt::NameAccepted { name }),
                            Effect::CreateUser(record),
                        ],
                    )
                }
                RegistrationFlow::Full => Transition::new(
                    session.in_state(DialogueState::AwaitingSurname),
                    vec![Effect::Reply(Prompt::AskSurname { name })],
                ),
            }
        }
        DialogueState::AwaitingSurname => match validate_name(&text) {
            Ok(surname) => {
                session.surname = Some(surname);
                Transition::new(
                    session.in_state(DialogueState::AwaitingGender),
                    vec![Effect::Reply(Prompt::AskGender)],
                )
            }
            Err(e) => Transition::new(session, vec![Effect::Reply(Prompt::InvalidName(e))]),
        },
        DialogueState::AwaitingGender => {
            Transition::new(session, vec![Effect::Reply(Prompt::UseGenderButtons)])
        }
        DialogueState::AwaitingQuestion => {
            session.last_message_text = Some(text.clone());
            // Recorded before the echo so a failed reply cannot lose the question
            let mut effects = Vec::with_capacity(2);
            if let Some(conversation_id) = session.active_conversation_id.clone() {
                effects.push(Effect::AppendMessage {
                    conversation_id,
                    message: ConversationMessage::from_user(text.clone(), sent_at),
                });
            }
            effects.push(Effect::Reply(Prompt::QuestionEcho { text }));
            Transition::new(session, effects)
        }
    }
}

fn on_gender(mut session: ChatSession, gender: Gender, ctx: &TurnContext<'_>) -> Transition {
    if session.state != DialogueState::AwaitingGender {
        return Transition::unchanged(session);
    }
    let (Some(name), Some(surname)) = (session.name.clone(), session.surname.clone()) else {
        return Transition::unchanged(session.in_state(DialogueState::Idle));
    };

    session.gender = Some(gender);
    let record = new_user_record(ctx, &name)
        .with_surname(surname.clone())
        .with_gender(gender);

    Transition::new(
        session.in_state(DialogueState::Idle),
        vec![
            Effect::EditPrompt(Prompt::GenderChosen(gender)),
            Effect::CreateUser(record),
            Effect::Reply(Prompt::RegistrationComplete { name, surname }),
        ],
    )
}

fn on_remote_failure(session: ChatSession, operation: RemoteOperation) -> Transition {
    let session = match operation {
        RemoteOperation::LookupUser | RemoteOperation::CreateConversation => ChatSession::reset(),
        RemoteOperation::CreateUser | RemoteOperation::AppendMessage => session,
    };
    Transition::new(session, vec![Effect::Reply(Prompt::RemoteError)])
}

fn new_user_record(ctx: &TurnContext<'_>, name: &str) -> UserRecord {
    UserRecord::new(
        ctx.chat_id,
        name,
        ctx.language,
        ctx.settings.recommendation_method.clone(),
        ctx.settings.bundle_version.clone(),
    )
}
