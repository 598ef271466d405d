use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    config::EngineConfig,
    db_types::{OrderId, Subscription},
    helpers::with_deadline,
    traits::{OrderManagement, SubscriptionManagement},
    tracker_api::errors::OrderFlowError,
};

/// Client subscriptions to order status notifications.
pub struct SubscriptionApi<B> {
    db: B,
    config: Arc<EngineConfig>,
}

impl<B: Debug> Debug for SubscriptionApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SubscriptionApi ({:?})", self.db)
    }
}

impl<B> SubscriptionApi<B>
where B: SubscriptionManagement + OrderManagement
{
    pub fn new(db: B, config: Arc<EngineConfig>) -> Self {
        Self { db, config }
    }

    /// Subscribes a client to an existing order. Returns `false` if they already were.
    pub async fn subscribe(&self, user_id: i64, order_id: &OrderId) -> Result<bool, OrderFlowError> {
        let timeout = self.config.store_timeout;
        if with_deadline(timeout, "fetch_order", self.db.fetch_order(order_id)).await?.is_none() {
            return Err(OrderFlowError::OrderNotFound(order_id.clone()));
        }
        let added = with_deadline(timeout, "subscribe", self.db.subscribe(user_id, order_id)).await?;
        if added {
            debug!("🔄️ User {user_id} subscribed to [{order_id}]");
        }
        Ok(added)
    }

    pub async fn unsubscribe(&self, user_id: i64, order_id: &OrderId) -> Result<bool, OrderFlowError> {
        let call = self.db.unsubscribe(user_id, order_id);
        Ok(with_deadline(self.config.store_timeout, "unsubscribe", call).await?)
    }

    pub async fn is_subscribed(&self, user_id: i64, order_id: &OrderId) -> Result<bool, OrderFlowError> {
        let call = self.db.is_subscribed(user_id, order_id);
        Ok(with_deadline(self.config.store_timeout, "is_subscribed", call).await?)
    }

    pub async fn for_user(&self, user_id: i64) -> Result<Vec<Subscription>, OrderFlowError> {
        let call = self.db.fetch_subscriptions_for_user(user_id);
        Ok(with_deadline(self.config.store_timeout, "fetch_subscriptions_for_user", call).await?)
    }

    pub async fn for_order(&self, order_id: &OrderId) -> Result<Vec<Subscription>, OrderFlowError> {
        let call = self.db.fetch_subscriptions_for_order(order_id);
        Ok(with_deadline(self.config.store_timeout, "fetch_subscriptions_for_order", call).await?)
    }

    /// Forgets what this subscriber was last sent, so the next status change is delivered regardless of dedup.
    pub async fn reset_watermark(&self, user_id: i64, order_id: &OrderId) -> Result<bool, OrderFlowError> {
        let call = self.db.reset_last_sent_status(user_id, order_id);
        Ok(with_deadline(self.config.store_timeout, "reset_last_sent_status", call).await?)
    }
}
