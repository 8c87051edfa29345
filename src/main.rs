// This is the entry point of the Telegram moderation bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (Bot API client, keyword file)
// - `telegram/` = Telegram-specific adapters (update handling, polling)
//
// This file's job is to:
// 1. Load configuration
// 2. Load the keyword list
// 3. Initialize services (dependency injection)
// 4. Poll for updates until Ctrl-C

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "config/bot_config.rs"]
mod config;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;
#[path = "telegram/telegram_layer.rs"]
mod telegram;

use crate::config::{BotConfig, LogLevel};
use crate::core::moderation::{KeywordStore, ModerationService};
use crate::infra::keywords::YamlKeywordStore;
use crate::infra::telegram::TelegramApiClient;
use crate::telegram::poller;
use crate::telegram::Data;
use anyhow::Context;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Logging comes first so config warnings are visible.
    let raw_level = std::env::var("LOGGING_LEVEL").ok();
    let (log_level, bad_level) = LogLevel::from_setting(raw_level.as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(log_level.env_filter())
        .init();
    if let Some(bad) = bad_level {
        tracing::warn!("Invalid logging level: {}. Defaulting to INFO.", bad);
    }

    if let Err(e) = run().await {
        tracing::error!("Startup failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = BotConfig::from_env().context("Invalid configuration")?;

    tracing::info!(
        token = "<censored>",
        group_chat_id = config.group_chat_id,
        action = %config.moderation.action,
        readonly_days = config.moderation.readonly_duration_days,
        admin_check_policy = %config.moderation.admin_check_policy,
        log_level = %config.log_level,
        "Configuration loaded"
    );

    let keywords = YamlKeywordStore::new(&config.keywords_file)
        .load_keywords()
        .await
        .context("Error loading keywords")?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // One client serves both the polling loop and the moderation actions.

    let client = Arc::new(
        TelegramApiClient::new(
            &config.token,
            config.request_timeout,
            config.poll_timeout,
        )
        .context("Failed to create Telegram API client")?,
    );

    let moderation = ModerationService::new(Arc::clone(&client), keywords, config.moderation);
    let data = Arc::new(Data {
        group_chat_id: config.group_chat_id,
        moderation,
    });

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Ctrl-C received"),
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    poller::run_polling(client, data, shutdown).await;

    tracing::info!("Bot stopped");
    Ok(())
}
