use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric identity of a message recipient on the messaging platform.
pub type RecipientId = i64;

/// The one operation the engine needs from a messaging platform.
///
/// Implementations should return a classified [`DeliveryError`] rather than a generic one wherever the platform's
/// response allows it. The dispatcher applies its own timeout around each call.
#[allow(async_fn_in_trait)]
pub trait MessagingChannel {
    async fn send(&self, recipient: RecipientId, text: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryErrorKind {
    RecipientBlocked,
    RecipientUnknown,
    RateLimited,
    MalformedRequest,
    Timeout,
    Unknown,
}

impl DeliveryErrorKind {
    /// Best-effort classification of a platform error description.
    pub fn classify(description: &str) -> Self {
        let text = description.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));
        if has(&["forbidden", "blocked", "deactivated"]) {
            Self::RecipientBlocked
        } else if has(&["chat not found", "user not found", "not found"]) {
            Self::RecipientUnknown
        } else if has(&["bad request"]) {
            Self::MalformedRequest
        } else if has(&["retry after", "flood", "too many requests"]) {
            Self::RateLimited
        } else if has(&["timeout", "timed out"]) {
            Self::Timeout
        } else {
            Self::Unknown
        }
    }
}

impl Display for DeliveryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RecipientBlocked => "recipient_blocked",
            Self::RecipientUnknown => "recipient_unknown",
            Self::RateLimited => "rate_limited",
            Self::MalformedRequest => "malformed_request",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Delivery failed ({kind}). {message}")]
pub struct DeliveryError {
    pub kind: DeliveryErrorKind,
    pub message: String,
}

impl DeliveryError {
    pub fn new<S: Into<String>>(kind: DeliveryErrorKind, message: S) -> Self {
        Self { kind, message: message.into() }
    }

    /// Builds an error whose kind is inferred from the description.
    pub fn from_description<S: Into<String>>(description: S) -> Self {
        let message = description.into();
        Self { kind: DeliveryErrorKind::classify(&message), message }
    }
}
