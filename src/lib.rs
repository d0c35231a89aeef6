//! # Recommender Systems Telegram Bot
//!
//! A Telegram bot that registers users and records their questions in a
//! remote user/conversation directory service. Conversations are driven by
//! a small per-chat state machine.

pub mod bot;
pub mod config;
pub mod dialogue;
pub mod directory;
pub mod directory_errors;
pub mod localization;
pub mod profile_model;
pub mod webhook;
