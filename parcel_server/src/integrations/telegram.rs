use log::*;
use parcel_engine::{
    traits::RecipientId,
    DeliveryError,
    DeliveryErrorKind,
    MessagingChannel,
};
use telegram_tools::{ParseMode, TelegramApi, TelegramApiError};

/// Delivers notifications through the Telegram Bot API.
///
/// Messages are sent as Markdown. If Telegram refuses the markup, the same text is sent again as plain text so that a
/// stray `*` or `_` in a client name never costs a notification.
#[derive(Clone)]
pub struct TelegramChannel {
    api: TelegramApi,
}

impl TelegramChannel {
    pub fn new(api: TelegramApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &TelegramApi {
        &self.api
    }
}

impl MessagingChannel for TelegramChannel {
    async fn send(&self, recipient: RecipientId, text: &str) -> Result<(), DeliveryError> {
        match self.api.send_message(recipient, text, Some(ParseMode::Markdown)).await {
            Ok(_) => Ok(()),
            Err(e) if is_markup_error(&e) => {
                debug!("📨️ Markdown was rejected for chat {recipient}. Retrying as plain text. {e}");
                self.api.send_message(recipient, text, None).await.map(|_| ()).map_err(delivery_error)
            },
            Err(e) => Err(delivery_error(e)),
        }
    }
}

fn is_markup_error(e: &TelegramApiError) -> bool {
    matches!(
        e,
        TelegramApiError::ApiError { status: 400, description, .. } if description.contains("can't parse entities")
    )
}

/// Classifies a Bot API failure for the dispatch report.
pub fn delivery_error(e: TelegramApiError) -> DeliveryError {
    let kind = match &e {
        TelegramApiError::Timeout => DeliveryErrorKind::Timeout,
        TelegramApiError::ApiError { status: 429, .. } => DeliveryErrorKind::RateLimited,
        TelegramApiError::ApiError { status: 403, .. } => DeliveryErrorKind::RecipientBlocked,
        TelegramApiError::ApiError { description, .. } => DeliveryErrorKind::classify(description),
        TelegramApiError::JsonError(_) | TelegramApiError::EmptyResponse => DeliveryErrorKind::Unknown,
        other => DeliveryErrorKind::classify(&other.to_string()),
    };
    DeliveryError::new(kind, e.description())
}

/// Writes notifications to the log instead of sending them. Used when `PARCEL_DRY_RUN` is set.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogOnlyChannel;

impl MessagingChannel for LogOnlyChannel {
    async fn send(&self, recipient: RecipientId, text: &str) -> Result<(), DeliveryError> {
        info!("📨️ [dry run] To {recipient}: {}", text.replace('\n', " ⏎ "));
        Ok(())
    }
}

/// The channel the server was started with.
#[derive(Clone)]
pub enum ServerChannel {
    Telegram(TelegramChannel),
    LogOnly(LogOnlyChannel),
}

impl MessagingChannel for ServerChannel {
    async fn send(&self, recipient: RecipientId, text: &str) -> Result<(), DeliveryError> {
        match self {
            ServerChannel::Telegram(channel) => channel.send(recipient, text).await,
            ServerChannel::LogOnly(channel) => channel.send(recipient, text).await,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn api_error(status: u16, description: &str) -> TelegramApiError {
        TelegramApiError::ApiError { status, description: description.into(), retry_after: None }
    }

    #[test]
    fn classify_bot_api_failures() {
        let rate_limited = delivery_error(api_error(429, "Too Many Requests: retry after 3"));
        assert_eq!(rate_limited.kind, DeliveryErrorKind::RateLimited);
        assert_eq!(rate_limited.message, "Too Many Requests: retry after 3");
        let blocked = delivery_error(api_error(403, "Forbidden: user is deactivated"));
        assert_eq!(blocked.kind, DeliveryErrorKind::RecipientBlocked);
        let unknown = delivery_error(api_error(400, "Bad Request: chat not found"));
        assert_eq!(unknown.kind, DeliveryErrorKind::RecipientUnknown);
        assert_eq!(delivery_error(TelegramApiError::Timeout).kind, DeliveryErrorKind::Timeout);
        assert_eq!(delivery_error(TelegramApiError::EmptyResponse).kind, DeliveryErrorKind::Unknown);
    }

    #[test]
    fn markup_errors() {
        assert!(is_markup_error(&api_error(400, "Bad Request: can't parse entities: Can't find end of the entity")));
        assert!(!is_markup_error(&api_error(400, "Bad Request: chat not found")));
        assert!(!is_markup_error(&TelegramApiError::Timeout));
    }

    #[tokio::test]
    async fn dry_run_always_delivers() {
        let channel = ServerChannel::LogOnly(LogOnlyChannel);
        assert!(channel.send(42, "📦 Order *CN-1*").await.is_ok());
    }
}
