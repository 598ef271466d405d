//! A small client for the parts of the Telegram Bot API the parcel tracker needs: delivering text messages and
//! checking the bot token.
mod api;
mod config;
mod data_objects;
mod error;
mod helpers;

pub use api::TelegramApi;
pub use config::{TelegramConfig, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT};
pub use data_objects::{ApiResponse, BotUser, Chat, Message, ParseMode, ResponseParameters, SendMessageRequest};
pub use error::TelegramApiError;
pub use helpers::{fit_message, MAX_MESSAGE_LENGTH};
