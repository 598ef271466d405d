//! Read access to orders for staff and clients.
use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    config::EngineConfig,
    db_types::{Order, OrderId},
    helpers::with_deadline,
    traits::{OrderManagement, ParticipantManagement, StoreError},
    tracker_api::{
        messages,
        order_objects::{ClientStatus, OrderView},
    },
};

pub struct OrderApi<B> {
    db: B,
    config: Arc<EngineConfig>,
}

impl<B: Debug> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi ({:?})", self.db)
    }
}

impl<B> OrderApi<B>
where B: OrderManagement
{
    pub fn new(db: B, config: Arc<EngineConfig>) -> Self {
        Self { db, config }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        with_deadline(self.config.store_timeout, "fetch_order", self.db.fetch_order(order_id)).await
    }

    /// Answers a client's "where is my order" question. `raw_order_id` is whatever the client typed.
    ///
    /// An unknown order is not an error: the result carries the plain "not found" text instead.
    pub async fn client_status(&self, raw_order_id: &str) -> Result<ClientStatus, StoreError> {
        let order_id = OrderId::normalize(raw_order_id);
        let result = match self.fetch_order(&order_id).await? {
            Some(order) => {
                let status_text = self.config.registry.display(&order.status);
                let text = messages::client_status(&order_id, &status_text, order.origin.as_deref());
                ClientStatus { order_id, found: true, text }
            },
            None => {
                debug!("🔄️ Client asked about unknown order [{order_id}]");
                ClientStatus { order_id, found: false, text: messages::ORDER_NOT_FOUND.to_string() }
            },
        };
        Ok(result)
    }

    pub async fn recent_orders(&self, limit: u32) -> Result<Vec<Order>, StoreError> {
        with_deadline(self.config.store_timeout, "fetch_recent_orders", self.db.fetch_recent_orders(limit)).await
    }

    pub async fn orders_by_status(&self, statuses: &[String]) -> Result<Vec<Order>, StoreError> {
        with_deadline(self.config.store_timeout, "fetch_orders_by_status", self.db.fetch_orders_by_status(statuses))
            .await
    }

    pub async fn search_by_note(&self, fragment: &str) -> Result<Vec<Order>, StoreError> {
        if fragment.trim().is_empty() {
            return Ok(vec![]);
        }
        with_deadline(self.config.store_timeout, "search_orders_by_note", self.db.search_orders_by_note(fragment)).await
    }

    pub async fn orders_for_participant(&self, username: &str) -> Result<Vec<Order>, StoreError> {
        let call = self.db.fetch_orders_for_participant(username);
        with_deadline(self.config.store_timeout, "fetch_orders_for_participant", call).await
    }
}

impl<B> OrderApi<B>
where B: OrderManagement + ParticipantManagement
{
    /// The order with its interpreted status and its participants.
    pub async fn order_view(&self, order_id: &OrderId) -> Result<Option<OrderView>, StoreError> {
        let Some(order) = self.fetch_order(order_id).await? else {
            return Ok(None);
        };
        let participants =
            with_deadline(self.config.store_timeout, "fetch_participants", self.db.fetch_participants(order_id))
                .await?;
        let status = self.config.registry.classify(&order.status);
        Ok(Some(OrderView { order, status, participants }))
    }
}
