// Telegram Bot API integration.

pub mod telegram_client;
pub mod telegram_models;

pub use telegram_client::TelegramApiClient;
