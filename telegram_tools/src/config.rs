use std::time::Duration;

use log::*;
use parcel_common::Secret;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: Secret<String>,
    /// Base URL of the Bot API. Overridable so that a local Bot API server (or a test double) can be used.
    pub api_url: String,
    pub request_timeout: Duration,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: Secret::default(),
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl TelegramConfig {
    pub fn new<S: Into<String>>(bot_token: S) -> Self {
        Self { bot_token: Secret::new(bot_token.into()), ..Default::default() }
    }

    pub fn with_api_url<S: Into<String>>(mut self, api_url: S) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// True if a bot token has been supplied.
    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_blank()
    }

    pub fn new_from_env_or_default() -> Self {
        let bot_token = std::env::var("PARCEL_BOT_TOKEN").unwrap_or_else(|_| {
            warn!("PARCEL_BOT_TOKEN not set. Notifications will not reach anyone.");
            String::default()
        });
        let api_url = std::env::var("PARCEL_BOT_API_URL").unwrap_or_else(|_| {
            debug!("PARCEL_BOT_API_URL not set, using {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });
        let request_timeout = std::env::var("PARCEL_SEND_TIMEOUT_MS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("Invalid PARCEL_SEND_TIMEOUT_MS value '{s}'. {e}. Using the default."))
                    .ok()
            })
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        Self::new(bot_token).with_api_url(api_url).with_request_timeout(request_timeout)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builder() {
        let config = TelegramConfig::new("123:abc").with_api_url("http://localhost:8081/");
        assert!(config.is_configured());
        assert_eq!(config.api_url, "http://localhost:8081");
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert!(!TelegramConfig::default().is_configured());
        assert_eq!(format!("{:?}", config.bot_token), "****");
    }
}
