use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TelegramApiError;

/// The envelope every Bot API method answers with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<u16>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
    pub migrate_to_chat_id: Option<i64>,
}

impl<T> ApiResponse<T> {
    /// Unwraps the result, turning an `ok: false` envelope into [`TelegramApiError::ApiError`]. `status` is the HTTP
    /// status, used when the envelope carries no error code of its own.
    pub fn into_result(self, status: u16) -> Result<T, TelegramApiError> {
        if self.ok {
            return self.result.ok_or(TelegramApiError::EmptyResponse);
        }
        Err(TelegramApiError::ApiError {
            status: self.error_code.unwrap_or(status),
            description: self.description.unwrap_or_else(|| "no description".to_string()),
            retry_after: self.parameters.and_then(|p| p.retry_after),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    Markdown,
    MarkdownV2,
    #[serde(rename = "HTML")]
    Html,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    pub disable_web_page_preview: bool,
}

impl SendMessageRequest {
    pub fn new<S: Into<String>>(chat_id: i64, text: S) -> Self {
        Self { chat_id, text: text.into(), parse_mode: None, disable_web_page_preview: true }
    }

    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = Some(parse_mode);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub date: DateTime<Utc>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}
