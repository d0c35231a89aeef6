//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules for better organization:
//! - `message_handler`: Turns incoming messages into dialogue events
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `dialogue_manager`: Runs a dialogue turn and executes its effects
//! - `messenger`: Sends and edits messages on Telegram
//! - `ui_builder`: Creates keyboards and renders prompts

pub mod callback_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod messenger;
pub mod ui_builder;

use std::sync::Arc;

use anyhow::Result;
use teloxide::types::{Update, UpdateKind};
use tracing::debug;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

pub use dialogue_manager::{run_turn, BotContext, Turn};
pub use messenger::Messenger;
pub use ui_builder::{render_prompt, OutgoingMessage};

/// Route one raw update to the matching handler
pub async fn handle_update(update: Update, ctx: Arc<BotContext>) -> Result<()> {
    match update.kind {
        UpdateKind::Message(msg) => message_handler(msg, ctx).await,
        UpdateKind::CallbackQuery(q) => callback_handler(q, ctx).await,
        _ => {
            debug!("Ignoring unsupported update kind");
            Ok(())
        }
    }
}
