use std::sync::Arc;

use log::*;
use reqwest::{header::HeaderValue, Client};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::TelegramConfig,
    data_objects::{ApiResponse, BotUser, Message, ParseMode, SendMessageRequest},
    helpers::fit_message,
    TelegramApiError,
};

#[derive(Clone)]
pub struct TelegramApi {
    config: TelegramConfig,
    client: Arc<Client>,
}

impl TelegramApi {
    pub fn new(config: TelegramConfig) -> Result<Self, TelegramApiError> {
        if !config.is_configured() {
            return Err(TelegramApiError::NotConfigured);
        }
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TelegramApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    /// Calls a Bot API method with a JSON body.
    ///
    /// The Bot API answers failures with a JSON envelope too, so the body is decoded whatever the HTTP status. Only
    /// if that fails is the raw status reported.
    pub async fn call<T: DeserializeOwned, B: Serialize>(&self, method: &str, body: &B) -> Result<T, TelegramApiError> {
        trace!("Calling Bot API method {method}");
        let response = self
            .client
            .post(self.method_url(method))
            .header(reqwest::header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        match serde_json::from_str::<ApiResponse<T>>(&text) {
            Ok(envelope) => envelope.into_result(status),
            Err(e) if (200..300).contains(&status) => Err(TelegramApiError::JsonError(e.to_string())),
            Err(_) => Err(TelegramApiError::ApiError { status, description: text, retry_after: None }),
        }
    }

    /// Sends a text message, cut to the Bot API's length limit if needed.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<Message, TelegramApiError> {
        let mut request = SendMessageRequest::new(chat_id, fit_message(text));
        if let Some(mode) = parse_mode {
            request = request.with_parse_mode(mode);
        }
        let message = self.call::<Message, _>("sendMessage", &request).await?;
        debug!("Message {} delivered to chat {chat_id}", message.message_id);
        Ok(message)
    }

    /// Checks the token against the Bot API and returns the bot's own account.
    pub async fn get_me(&self) -> Result<BotUser, TelegramApiError> {
        let me = self.call::<BotUser, _>("getMe", &serde_json::json!({})).await?;
        info!("Connected to the Bot API as @{}", me.username.as_deref().unwrap_or("<no username>"));
        Ok(me)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.config.api_url, self.config.bot_token.reveal())
    }
}
