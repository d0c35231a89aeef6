//! UI Builder module for creating keyboards and rendering prompts

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, ReplyMarkup,
};

use crate::dialogue::{NameError, Prompt, RegistrationFlow};
use crate::localization::LocalizationManager;
use crate::profile_model::Gender;

/// A rendered message ready to be sent or used as an edit
#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingMessage {
    pub text: String,
    pub markup: Option<ReplyMarkup>,
}

impl OutgoingMessage {
    fn plain(text: String) -> Self {
        Self { text, markup: None }
    }

    fn with_markup(text: String, markup: impl Into<ReplyMarkup>) -> Self {
        Self {
            text,
            markup: Some(markup.into()),
        }
    }
}

/// Persistent main menu keyboard
pub fn create_main_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new("/ask"), KeyboardButton::new("/help")],
        vec![KeyboardButton::new("/reload")],
        vec![KeyboardButton::new("/log_in"), KeyboardButton::new("/log_out")],
    ])
    .resize_keyboard()
}

/// One-time keyboard with a single cancel button, shown during `/ask`
pub fn create_cancel_keyboard(loc: &LocalizationManager, language: &str) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(
        loc.t("button-cancel", language),
    )]])
    .resize_keyboard()
    .one_time_keyboard()
}

/// Inline two-choice gender selector
pub fn create_gender_keyboard(loc: &LocalizationManager, language: &str) -> InlineKeyboardMarkup {
    let buttons = Gender::ALL
        .into_iter()
        .map(|gender| {
            let label = gender_label(gender, loc, language);
            InlineKeyboardButton::callback(label, gender.callback_data())
        })
        .collect::<Vec<_>>();

    InlineKeyboardMarkup::new(vec![buttons])
}

pub fn gender_label(gender: Gender, loc: &LocalizationManager, language: &str) -> String {
    match gender {
        Gender::Male => loc.t("gender-male", language),
        Gender::Female => loc.t("gender-female", language),
    }
}

/// Turn a prompt into text plus the keyboard that goes with it
pub fn render_prompt(
    prompt: &Prompt,
    loc: &LocalizationManager,
    language: &str,
) -> OutgoingMessage {
    // Replies that leave the user at the main menu
    let menu =
        |key: &str| OutgoingMessage::with_markup(loc.t(key, language), create_main_keyboard());

    match prompt {
        Prompt::Greeting => menu("greeting"),
        Prompt::AlreadyRegistered => menu("already-registered"),
        Prompt::AskName(RegistrationFlow::Quick) => menu("ask-name"),
        Prompt::AskName(RegistrationFlow::Full) => {
            OutgoingMessage::plain(loc.t("login-ask-name", language))
        }
        Prompt::NameAccepted { name } => OutgoingMessage::with_markup(
            loc.t_args("name-accepted", &[("name", name.as_str())], language),
            create_main_keyboard(),
        ),
        Prompt::AskSurname { name } => {
            let text = loc.t_args("ask-surname", &[("name", name.as_str())], language);
            OutgoingMessage::plain(text)
        }
        Prompt::AskGender => OutgoingMessage::with_markup(
            loc.t("ask-gender", language),
            create_gender_keyboard(loc, language),
        ),
        Prompt::GenderChosen(gender) => {
            let label = gender_label(*gender, loc, language);
            let text = loc.t_args("gender-chosen", &[("gender", label.as_str())], language);
            OutgoingMessage::plain(text)
        }
        Prompt::UseGenderButtons => OutgoingMessage::plain(loc.t("use-gender-buttons", language)),
        Prompt::RegistrationComplete { name, surname } => OutgoingMessage::with_markup(
            loc.t_args(
                "registration-complete",
                &[("name", name.as_str()), ("surname", surname.as_str())],
                language,
            ),
            create_main_keyboard(),
        ),
        Prompt::InvalidName(NameError::Empty) => {
            OutgoingMessage::plain(loc.t("name-empty", language))
        }
        Prompt::InvalidName(NameError::TooLong) => {
            OutgoingMessage::plain(loc.t("name-too-long", language))
        }
        Prompt::AskQuestion => OutgoingMessage::with_markup(
            loc.t("ask-question", language),
            create_cancel_keyboard(loc, language),
        ),
        // The cancel keyboard is one-time, the menu comes back with the echo
        Prompt::QuestionEcho { text } => OutgoingMessage::with_markup(
            loc.t_args("question-echo", &[("text", text.as_str())], language),
            create_main_keyboard(),
        ),
        Prompt::Echo { text } => OutgoingMessage::with_markup(text.clone(), create_main_keyboard()),
        Prompt::Cancelled => menu("cancelled"),
        Prompt::Help => menu("help-commands"),
        Prompt::Reloaded => menu("reloaded"),
        Prompt::LoggedOut => menu("logged-out"),
        Prompt::RemoteError => menu("error-remote"),
    }
}
