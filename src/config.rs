//! # Configuration Module
//!
//! Runtime configuration for the bot, read from the environment (and an
//! optional `.env` file loaded by `main`). Every setting except the bot
//! token has a default.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_DIRECTORY_BASE_URL: &str = "https://swpdb-production.up.railway.app";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_RECOMMENDATION_METHOD: &str = "default";
pub const DEFAULT_BUNDLE_VERSION: &str = "1.0.0";
pub const WEBHOOK_PATH: &str = "/webhook";

/// Retry settings for calls to the directory service
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_retry_delay_ms: 200,
            max_retry_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    /// No retries at all, useful against mock servers
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Connection settings for the remote user/conversation directory
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DIRECTORY_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

/// What to do with free text received while no flow is active
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdleTextPolicy {
    /// Reply with the same text
    #[default]
    Echo,
    /// Drop the message silently
    Ignore,
}

impl FromStr for IdleTextPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "echo" => Ok(Self::Echo),
            "ignore" => Ok(Self::Ignore),
            other => Err(anyhow!("unknown idle text policy: {other}")),
        }
    }
}

/// Settings consulted by the dialogue state machine
#[derive(Debug, Clone)]
pub struct DialogueSettings {
    pub idle_text: IdleTextPolicy,
    pub recommendation_method: String,
    pub bundle_version: String,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            idle_text: IdleTextPolicy::default(),
            recommendation_method: DEFAULT_RECOMMENDATION_METHOD.to_string(),
            bundle_version: DEFAULT_BUNDLE_VERSION.to_string(),
        }
    }
}

/// Top-level bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    /// Public base URL; when absent the bot falls back to long polling
    pub webhook_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub directory: DirectoryConfig,
    pub dialogue: DialogueSettings,
}

impl BotConfig {
    /// Build the configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let bot_token =
            env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN must be set")?;

        let webhook_url = env::var("WEBHOOK_URL")
            .ok()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        let bind_addr = env_or("BIND_ADDR", DEFAULT_BIND_ADDR)
            .parse()
            .context("BIND_ADDR must be a socket address")?;

        let retry_defaults = RetryConfig::default();
        let directory = DirectoryConfig {
            base_url: env_or("DIRECTORY_BASE_URL", DEFAULT_DIRECTORY_BASE_URL),
            timeout: Duration::from_secs(env_parse("DIRECTORY_TIMEOUT_SECS", 10)?),
            retry: RetryConfig {
                max_retries: env_parse("DIRECTORY_MAX_RETRIES", retry_defaults.max_retries)?,
                base_retry_delay_ms: env_parse(
                    "DIRECTORY_RETRY_BASE_MS",
                    retry_defaults.base_retry_delay_ms,
                )?,
                max_retry_delay_ms: env_parse(
                    "DIRECTORY_RETRY_MAX_MS",
                    retry_defaults.max_retry_delay_ms,
                )?,
            },
        };

        let dialogue = DialogueSettings {
            idle_text: env_or("IDLE_TEXT_POLICY", "echo").parse()?,
            recommendation_method: env_or("RECOMMENDATION_METHOD", DEFAULT_RECOMMENDATION_METHOD),
            bundle_version: env_or("BUNDLE_VERSION", DEFAULT_BUNDLE_VERSION),
        };

        Ok(Self {
            bot_token,
            webhook_url,
            bind_addr,
            directory,
            dialogue,
        })
    }

    /// Full URL Telegram should deliver updates to
    pub fn webhook_endpoint(&self) -> Option<String> {
        self.webhook_url
            .as_ref()
            .map(|base| format!("{base}{WEBHOOK_PATH}"))
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid value for {key}: {e}")),
        _ => Ok(default),
    }
}
