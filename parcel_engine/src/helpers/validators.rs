use thiserror::Error;

use crate::db_types::OrderId;

/// Rejections of user-entered values. These are raised before anything reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'{0}' is not a valid order id. Expected something like CN-1001.")]
    InvalidOrderId(String),
    #[error("Orders with the prefix '{prefix}' are not supported. Allowed prefixes: {allowed}.")]
    UnsupportedCountry { prefix: String, allowed: String },
    #[error("'{0}' is not a valid phone number. Expected 11 digits starting with 8 (or +7).")]
    InvalidPhone(String),
    #[error("'{0}' is not a valid postcode. Expected 5 or 6 digits.")]
    InvalidPostcode(String),
    #[error("'{0}' is not one of the configured order statuses.")]
    UnknownStatus(String),
    #[error("Status number {index} is out of range. There are {count} statuses.")]
    StatusIndexOutOfRange { index: usize, count: usize },
    #[error("No usernames were supplied.")]
    NoUsernames,
    #[error("The field '{0}' must not be empty.")]
    EmptyField(&'static str),
    #[error("Invalid status list. {0}")]
    InvalidStatusList(String),
}

/// Normalises a phone number to the 11-digit domestic form (`8XXXXXXXXXX`).
///
/// Spaces, dashes and brackets are ignored, and a leading `+7` or `7` is rewritten to `8`.
pub fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let compact: String = raw.chars().filter(|c| !matches!(c, ' ' | '-' | '(' | ')')).collect();
    let digits = if let Some(rest) = compact.strip_prefix("+7") {
        format!("8{rest}")
    } else if let Some(rest) = compact.strip_prefix('7') {
        format!("8{rest}")
    } else {
        compact
    };
    if digits.len() == 11 && digits.starts_with('8') && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(digits)
    } else {
        Err(ValidationError::InvalidPhone(raw.trim().to_string()))
    }
}

pub fn validate_postcode(raw: &str) -> Result<String, ValidationError> {
    let postcode = raw.trim();
    if (5..=6).contains(&postcode.len()) && postcode.chars().all(|c| c.is_ascii_digit()) {
        Ok(postcode.to_string())
    } else {
        Err(ValidationError::InvalidPostcode(postcode.to_string()))
    }
}

/// Returns the country code implied by the order id prefix, provided it is one of the `allowed` prefixes.
/// An empty allow-list accepts every prefix.
pub fn country_for_order(order_id: &OrderId, allowed: &[String]) -> Result<String, ValidationError> {
    let prefix = order_id.prefix().ok_or_else(|| ValidationError::InvalidOrderId(order_id.to_string()))?.to_uppercase();
    if allowed.is_empty() || allowed.iter().any(|p| p.eq_ignore_ascii_case(&prefix)) {
        Ok(prefix)
    } else {
        Err(ValidationError::UnsupportedCountry { prefix, allowed: allowed.join(", ") })
    }
}
