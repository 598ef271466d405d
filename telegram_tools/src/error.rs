use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelegramApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("No bot token has been configured")]
    NotConfigured,
    #[error("Request did not complete: {0}")]
    RequestError(String),
    #[error("The Bot API did not answer in time")]
    Timeout,
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Bot API call failed. Error {status}. {description}")]
    ApiError {
        status: u16,
        description: String,
        /// Seconds to wait before retrying, when the API is rate limiting us.
        retry_after: Option<u64>,
    },
    #[error("The Bot API reported success but sent no result")]
    EmptyResponse,
}

impl TelegramApiError {
    /// The Bot API's own description of the failure, where there is one.
    pub fn description(&self) -> String {
        match self {
            TelegramApiError::ApiError { description, .. } => description.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for TelegramApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TelegramApiError::Timeout
        } else if e.is_decode() {
            TelegramApiError::JsonError(e.to_string())
        } else {
            TelegramApiError::RequestError(e.to_string())
        }
    }
}
