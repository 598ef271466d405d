use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderId, Participant},
    helpers::ValidationError,
    status_registry::{KnownStatus, OrderStatus, StatusRegistry},
    tracker_api::notifications::DispatchReport,
};

/// How staff pick a status: by its label, or by its position in the registry (as the status menu does).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusChoice {
    Label(String),
    Index(usize),
}

impl StatusChoice {
    pub fn resolve(&self, registry: &StatusRegistry) -> Result<KnownStatus, ValidationError> {
        match self {
            StatusChoice::Label(label) => registry.parse(label),
            StatusChoice::Index(index) => registry.by_index(*index),
        }
    }
}

impl Display for StatusChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusChoice::Label(label) => write!(f, "'{label}'"),
            StatusChoice::Index(index) => write!(f, "#{index}"),
        }
    }
}

/// A staff request to create (or overwrite) an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub order_id: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Derived from the order id prefix when absent.
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// The registry's initial status when absent.
    #[serde(default)]
    pub status: Option<StatusChoice>,
    /// Subscribe the `@username`s found in `client_name` and send them a "new order" notice.
    #[serde(default = "default_true")]
    pub notify_participants: bool,
}

fn default_true() -> bool {
    true
}

impl NewOrderRequest {
    pub fn new<S1: Into<String>, S2: Into<String>>(order_id: S1, client_name: S2) -> Self {
        Self {
            order_id: order_id.into(),
            client_name: client_name.into(),
            phone: None,
            country: None,
            origin: None,
            note: None,
            status: None,
            notify_participants: true,
        }
    }

    pub fn with_status(mut self, status: StatusChoice) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_country<S: Into<String>>(mut self, country: S) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn without_notifications(mut self) -> Self {
        self.notify_participants = false;
        self
    }
}

/// An order together with its interpreted status, as shown to staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub order: Order,
    pub status: OrderStatus,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderResult {
    pub order: Order,
    pub participants_added: u64,
    /// Participants that could be mapped to a recipient id and were subscribed.
    pub subscribed: usize,
    /// Participants with no known recipient id.
    pub unresolved: Vec<String>,
    pub notifications: DispatchReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeResult {
    pub order: Order,
    /// `None` if the fan-out could not start. The status change itself still stands.
    pub notifications: Option<DispatchReport>,
    #[serde(default)]
    pub notification_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatus {
    pub order_id: OrderId,
    pub found: bool,
    /// Ready-to-send text: the status message, or the "not found" message.
    pub text: String,
}
