//! # Status registry
//!
//! The ordered list of order statuses that staff can pick from. The registry is built once at start-up (from the
//! defaults or from configuration) and never changes afterwards.
//!
//! Stored statuses are plain strings. Anything that is not a registry label is still a legal stored value: older
//! records carry free-form text, or an indirection token of the form `<scope>:pick_status_id:<index>` that points into
//! this list. [`StatusRegistry::classify`] turns a stored value into an [`OrderStatus`], and
//! [`StatusRegistry::display`] gives the text to show a user.
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::helpers::ValidationError;

/// Marker that identifies a legacy index token, e.g. `adm:pick_status_id:3`.
pub const LEGACY_STATUS_MARKER: &str = "pick_status_id";

pub const DEFAULT_STATUSES: [&str; 11] = [
    "🛒 Purchased",
    "📦 Shipping to the warehouse (Korea)",
    "📦 Shipping to the warehouse (China)",
    "📬 Arrived at the warehouse (Korea)",
    "📬 Arrived at the warehouse (China)",
    "🛫 Awaiting delivery to Kazakhstan",
    "🚚 Shipped to Kazakhstan",
    "🏠 Arrived at the admin in Kazakhstan",
    "📦 Awaiting dispatch within Kazakhstan",
    "🚚 Shipped within Kazakhstan",
    "✅ Received by the customer",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownStatus {
    pub index: usize,
    pub label: String,
}

/// A stored status, as understood by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OrderStatus {
    Known(KnownStatus),
    /// Not a registry label. Shown to users as-is.
    Raw(String),
}

impl OrderStatus {
    pub fn text(&self) -> &str {
        match self {
            OrderStatus::Known(status) => &status.label,
            OrderStatus::Raw(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, OrderStatus::Known(_))
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRegistry {
    labels: Vec<String>,
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self { labels: DEFAULT_STATUSES.iter().map(|s| s.to_string()).collect() }
    }
}

impl StatusRegistry {
    /// Builds a registry from an ordered list of labels. Labels are trimmed; blank lists and case-insensitive
    /// duplicates are rejected.
    pub fn new<I, S>(labels: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result: Vec<String> = Vec::new();
        for label in labels {
            let label = label.as_ref().trim();
            if label.is_empty() {
                continue;
            }
            if result.iter().any(|l| l.to_lowercase() == label.to_lowercase()) {
                return Err(ValidationError::InvalidStatusList(format!("'{label}' appears more than once")));
            }
            result.push(label.to_string());
        }
        if result.is_empty() {
            return Err(ValidationError::InvalidStatusList("at least one status is required".into()));
        }
        Ok(Self { labels: result })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The status given to orders created without an explicit one.
    pub fn initial(&self) -> KnownStatus {
        KnownStatus { index: 0, label: self.labels[0].clone() }
    }

    /// Case-insensitive, whitespace-trimmed exact match against the labels.
    pub fn is_valid(&self, candidate: &str) -> bool {
        self.index_of(candidate).is_some()
    }

    pub fn index_of(&self, candidate: &str) -> Option<usize> {
        let candidate = candidate.trim().to_lowercase();
        self.labels.iter().position(|label| label.to_lowercase() == candidate)
    }

    pub fn by_index(&self, index: usize) -> Result<KnownStatus, ValidationError> {
        self.labels
            .get(index)
            .map(|label| KnownStatus { index, label: label.clone() })
            .ok_or(ValidationError::StatusIndexOutOfRange { index, count: self.labels.len() })
    }

    /// Validates user-entered status text and returns the canonical label. Legacy index tokens are accepted when they
    /// resolve.
    pub fn parse(&self, candidate: &str) -> Result<KnownStatus, ValidationError> {
        match self.classify(candidate) {
            OrderStatus::Known(status) => Ok(status),
            OrderStatus::Raw(_) => Err(ValidationError::UnknownStatus(candidate.trim().to_string())),
        }
    }

    /// Interprets a stored status value. Never fails: unrecognised values come back as [`OrderStatus::Raw`].
    pub fn classify(&self, stored: &str) -> OrderStatus {
        if let Some(index) = self.index_of(stored) {
            return OrderStatus::Known(KnownStatus { index, label: self.labels[index].clone() });
        }
        match self.resolve_legacy(stored) {
            Some(status) => OrderStatus::Known(status),
            None => OrderStatus::Raw(stored.to_string()),
        }
    }

    /// The text to show a user for a stored status value.
    pub fn display(&self, stored: &str) -> String {
        self.classify(stored).text().to_string()
    }

    /// Resolves a legacy `...pick_status_id:<n>` token by its trailing digits, if `n` is in range.
    pub fn resolve_legacy(&self, stored: &str) -> Option<KnownStatus> {
        if !stored.contains(LEGACY_STATUS_MARKER) {
            return None;
        }
        let index = trailing_number(stored)?;
        self.by_index(index).ok()
    }
}

fn trailing_number(value: &str) -> Option<usize> {
    let value = value.trim_end();
    let digits_start = value.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    value[digits_start..].parse().ok()
}
