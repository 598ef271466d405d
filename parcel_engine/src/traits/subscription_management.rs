use crate::{
    db_types::{OrderId, Subscription},
    traits::StoreError,
};

/// Persistence for notification subscriptions and their delivery watermarks.
#[allow(async_fn_in_trait)]
pub trait SubscriptionManagement {
    /// Subscribes the user to the order. Returns `false` (and changes nothing) if they were already subscribed.
    async fn subscribe(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError>;

    /// Returns `false` if there was no such subscription.
    async fn unsubscribe(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError>;

    async fn is_subscribed(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError>;

    async fn fetch_subscriptions_for_user(&self, user_id: i64) -> Result<Vec<Subscription>, StoreError>;

    async fn fetch_subscriptions_for_order(&self, order_id: &OrderId) -> Result<Vec<Subscription>, StoreError>;

    /// Records that `status` was delivered to the subscriber. Only call this after the messaging channel confirmed
    /// the send. Returns `false` if the subscription no longer exists.
    async fn set_last_sent_status(&self, user_id: i64, order_id: &OrderId, status: &str) -> Result<bool, StoreError>;

    /// Clears one subscriber's watermark.
    async fn reset_last_sent_status(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError>;

    /// Clears the watermark of every subscriber of the order. Returns the number of subscriptions reset.
    async fn reset_last_sent_for_order(&self, order_id: &OrderId) -> Result<u64, StoreError>;
}
