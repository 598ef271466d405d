use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::{OrderId, Participant};

/// The largest page [`ParticipantQuery`] will return.
pub const MAX_PAGE_SIZE: u32 = 200;
const DEFAULT_PAGE_SIZE: u32 = 50;

//--------------------------------------      OrderUpdate      ---------------------------------------------------------
/// A partial order update. Only these fields may be edited after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl OrderUpdate {
    pub fn with_client_name<S: Into<String>>(mut self, client_name: S) -> Self {
        self.client_name = Some(client_name.into());
        self
    }

    pub fn with_country<S: Into<String>>(mut self, country: S) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_status<S: Into<String>>(mut self, status: S) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.client_name.is_none() && self.country.is_none() && self.note.is_none() && self.status.is_none()
    }
}

//--------------------------------------   ParticipantQuery    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantQuery {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub paid: Option<bool>,
    /// Case-insensitive substring of the username.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default = "default_page_size")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for ParticipantQuery {
    fn default() -> Self {
        Self { order_id: None, paid: None, search: None, limit: DEFAULT_PAGE_SIZE, offset: 0 }
    }
}

impl ParticipantQuery {
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_paid(mut self, paid: bool) -> Self {
        self.paid = Some(paid);
        self
    }

    pub fn with_search<S: Into<String>>(mut self, search: S) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// The page size, clamped to `1..=MAX_PAGE_SIZE`.
    pub fn page_size(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    /// The search fragment in the form usernames are stored in, or `None` if it is blank.
    pub fn search_fragment(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|s| s.trim().trim_start_matches('@').to_lowercase())
            .filter(|s| !s.is_empty())
    }

    pub fn is_unfiltered(&self) -> bool {
        self.order_id.is_none() && self.paid.is_none() && self.search_fragment().is_none()
    }
}

impl Display for ParticipantQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "participants")?;
        if let Some(order_id) = &self.order_id {
            write!(f, " order={order_id}")?;
        }
        if let Some(paid) = self.paid {
            write!(f, " paid={paid}")?;
        }
        if let Some(search) = self.search_fragment() {
            write!(f, " search='{search}'")?;
        }
        write!(f, " limit={} offset={}", self.page_size(), self.offset)
    }
}

//--------------------------------------    ParticipantPage    ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantPage {
    pub items: Vec<Participant>,
    pub total: u64,
    pub has_more: bool,
}

impl ParticipantPage {
    pub fn new(items: Vec<Participant>, total: u64, offset: u32) -> Self {
        let has_more = (offset as u64) + (items.len() as u64) < total;
        Self { items, total, has_more }
    }
}

//--------------------------------------   ResolvedRecipient   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRecipient {
    pub username: String,
    pub user_id: i64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn page_flags() {
        assert!(ParticipantPage::new(vec![], 80, 0).has_more);
        assert!(!ParticipantPage::new(vec![], 0, 0).has_more);
        assert!(!ParticipantPage::new(vec![], 80, 80).has_more);
    }

    #[test]
    fn query_normalisation() {
        let query = ParticipantQuery::default().with_search("  @ALI ").with_page(10_000, 5);
        assert_eq!(query.search_fragment().as_deref(), Some("ali"));
        assert_eq!(query.page_size(), MAX_PAGE_SIZE);
        assert!(!query.is_unfiltered());
        assert!(ParticipantQuery::default().with_search("  ").is_unfiltered());
        assert_eq!(ParticipantQuery::default().with_page(0, 0).page_size(), 1);
        assert_eq!(
            ParticipantQuery::default().with_order_id("CN-1".into()).with_paid(false).to_string(),
            "participants order=CN-1 paid=false limit=50 offset=0"
        );
    }

    #[test]
    fn empty_updates() {
        assert!(OrderUpdate::default().is_empty());
        assert!(!OrderUpdate::default().with_note("fragile").is_empty());
    }
}
