//! Row types for the four tracker tables, plus the write-side structs used to create them.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

use crate::helpers::{extract_order_id, normalize_phone, normalize_username, validate_postcode, ValidationError};

//--------------------------------------        OrderId        ---------------------------------------------------------
/// A human-entered order code of the form `PREFIX-SUFFIX`, e.g. `CN-1001`.
///
/// Stores compare order ids exactly. Use [`OrderId::from_str`] (strict) or [`OrderId::normalize`] (lenient) to turn
/// user input into the canonical upper-case form before a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical form of `raw` if it parses as an order id, otherwise the trimmed, upper-cased input.
    pub fn normalize(raw: &str) -> Self {
        extract_order_id(raw).unwrap_or_else(|| Self(raw.trim().to_uppercase()))
    }

    /// The part before the first dash, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.0.split_once('-').map(|(prefix, _)| prefix).filter(|p| !p.is_empty())
    }
}

impl FromStr for OrderId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        extract_order_id(s).ok_or_else(|| ValidationError::InvalidOrderId(s.trim().to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    /// Free-text client label. May embed `@username` mentions.
    pub client_name: String,
    pub phone: Option<String>,
    pub origin: Option<String>,
    /// The stored status text. Usually a registry label, but legacy values are kept verbatim.
    pub status: String,
    pub note: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
/// The writable fields of an order. Upserting a `NewOrder` overwrites every field of an existing order with the same
/// id, except `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub client_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl NewOrder {
    pub fn new<S1: Into<String>, S2: Into<String>>(order_id: OrderId, client_name: S1, status: S2) -> Self {
        Self {
            order_id,
            client_name: client_name.into(),
            phone: None,
            origin: None,
            status: status.into(),
            note: None,
            country: None,
        }
    }

    pub fn with_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_origin<S: Into<String>>(mut self, origin: S) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_country<S: Into<String>>(mut self, country: S) -> Self {
        self.country = Some(country.into());
        self
    }
}

//--------------------------------------      Participant      ---------------------------------------------------------
/// A client attached to an order, with its own payment flag.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Participant {
    pub order_id: OrderId,
    /// Normalised: lower case, no leading `@`.
    pub username: String,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        Address        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Address {
    pub user_id: i64,
    pub username: Option<String>,
    pub full_name: String,
    pub phone: String,
    pub city: String,
    pub address: String,
    pub postcode: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    pub full_name: String,
    pub phone: String,
    pub city: String,
    pub address: String,
    pub postcode: String,
}

impl NewAddress {
    /// Checks and normalises the user-entered fields: phone to `8XXXXXXXXXX`, postcode to 5-6 digits, username to its
    /// canonical form. Text fields must not be blank.
    pub fn validated(self) -> Result<Self, ValidationError> {
        let full_name = non_blank(self.full_name, "full_name")?;
        let city = non_blank(self.city, "city")?;
        let address = non_blank(self.address, "address")?;
        let phone = normalize_phone(&self.phone)?;
        let postcode = validate_postcode(&self.postcode)?;
        let username = self.username.as_deref().and_then(normalize_username);
        Ok(Self { user_id: self.user_id, username, full_name, phone, city, address, postcode })
    }
}

fn non_blank(value: String, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

//--------------------------------------     Subscription      ---------------------------------------------------------
/// A client's opt-in to status notifications for one order.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: i64,
    pub order_id: OrderId,
    /// The status most recently delivered to this subscriber (the watermark). Only advanced after a confirmed send.
    pub last_sent_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_id_parsing() {
        assert_eq!(OrderId::from_str(" cn-1001 ").unwrap(), OrderId::from("CN-1001"));
        assert!(matches!(OrderId::from_str("1001"), Err(ValidationError::InvalidOrderId(s)) if s == "1001"));
        assert_eq!(OrderId::normalize("weird id"), OrderId::from("WEIRD ID"));
        assert_eq!(OrderId::from("KR-77").prefix(), Some("KR"));
        assert_eq!(OrderId::from("KR77").prefix(), None);
        assert_eq!(OrderId::from("KR-77").to_string(), "KR-77");
    }

    #[test]
    fn address_validation() {
        let address = NewAddress {
            user_id: 42,
            username: Some("@Dana_Q".into()),
            full_name: " Dana Q ".into(),
            phone: "+7 701 000 11 22".into(),
            city: "Almaty".into(),
            address: "Abay 1".into(),
            postcode: "050000".into(),
        };
        let valid = address.clone().validated().unwrap();
        assert_eq!(valid.username.as_deref(), Some("dana_q"));
        assert_eq!(valid.phone, "87010001122");
        assert_eq!(valid.full_name, "Dana Q");

        let bad_city = NewAddress { city: "  ".into(), ..address.clone() };
        assert_eq!(bad_city.validated().unwrap_err(), ValidationError::EmptyField("city"));
        let bad_postcode = NewAddress { postcode: "12".into(), ..address };
        assert!(matches!(bad_postcode.validated(), Err(ValidationError::InvalidPostcode(_))));
    }
}
