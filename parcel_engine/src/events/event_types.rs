use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId};

/// An order was created, or re-created through an upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
    /// Participants newly attached by this call.
    pub participants_added: u64,
}

impl OrderCreatedEvent {
    pub fn new(order: Order, participants_added: u64) -> Self {
        Self { order, participants_added }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order_id: OrderId,
    /// The stored status after the change.
    pub status: String,
    /// `None` when the previous status was not read, e.g. after a set-based bulk write.
    pub old_status: Option<String>,
}

impl OrderStatusChangedEvent {
    pub fn new<S: Into<String>>(order_id: OrderId, status: S, old_status: Option<String>) -> Self {
        Self { order_id, status: status.into(), old_status }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDeletedEvent {
    pub order_id: OrderId,
}

impl OrderDeletedEvent {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
    OrderDeleted(OrderDeletedEvent),
}
