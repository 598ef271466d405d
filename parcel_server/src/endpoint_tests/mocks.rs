use std::collections::BTreeMap;

use mockall::mock;
use parcel_engine::{
    db_types::{Address, NewAddress, NewOrder, Order, OrderId, Participant, Subscription},
    traits::{
        AddressManagement,
        DeliveryError,
        MessagingChannel,
        OrderManagement,
        OrderUpdate,
        ParticipantManagement,
        ParticipantPage,
        ParticipantQuery,
        RecipientId,
        ResolvedRecipient,
        StoreError,
        SubscriptionManagement,
    },
};

mock! {
    pub TrackerDb {}
    impl OrderManagement for TrackerDb {
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;
        async fn upsert_order(&self, order: NewOrder) -> Result<Order, StoreError>;
        async fn update_order_status(&self, order_id: &OrderId, status: &str) -> Result<Option<Order>, StoreError>;
        async fn update_order_fields(
            &self,
            order_id: &OrderId,
            update: OrderUpdate,
        ) -> Result<Option<Order>, StoreError>;
        async fn delete_order(&self, order_id: &OrderId) -> Result<bool, StoreError>;
        async fn fetch_recent_orders(&self, limit: u32) -> Result<Vec<Order>, StoreError>;
        async fn fetch_orders_by_status(&self, statuses: &[String]) -> Result<Vec<Order>, StoreError>;
        async fn search_orders_by_note(&self, fragment: &str) -> Result<Vec<Order>, StoreError>;
        async fn bulk_update_status(&self, order_ids: &[OrderId], status: &str) -> Result<u64, StoreError>;
        async fn fetch_orders_for_participant(&self, username: &str) -> Result<Vec<Order>, StoreError>;
    }
    impl ParticipantManagement for TrackerDb {
        async fn ensure_participants(&self, order_id: &OrderId, usernames: &[String]) -> Result<u64, StoreError>;
        async fn fetch_participants(&self, order_id: &OrderId) -> Result<Vec<Participant>, StoreError>;
        async fn toggle_paid(&self, order_id: &OrderId, username: &str) -> Result<Participant, StoreError>;
        async fn fetch_unpaid_usernames(&self, order_id: &OrderId) -> Result<Vec<String>, StoreError>;
        async fn fetch_unpaid_by_order(&self) -> Result<BTreeMap<OrderId, Vec<String>>, StoreError>;
        async fn search_participants(&self, query: ParticipantQuery) -> Result<ParticipantPage, StoreError>;
    }
    impl SubscriptionManagement for TrackerDb {
        async fn subscribe(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError>;
        async fn unsubscribe(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError>;
        async fn is_subscribed(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError>;
        async fn fetch_subscriptions_for_user(&self, user_id: i64) -> Result<Vec<Subscription>, StoreError>;
        async fn fetch_subscriptions_for_order(&self, order_id: &OrderId) -> Result<Vec<Subscription>, StoreError>;
        async fn set_last_sent_status(
            &self,
            user_id: i64,
            order_id: &OrderId,
            status: &str,
        ) -> Result<bool, StoreError>;
        async fn reset_last_sent_status(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError>;
        async fn reset_last_sent_for_order(&self, order_id: &OrderId) -> Result<u64, StoreError>;
    }
    impl AddressManagement for TrackerDb {
        async fn upsert_address(&self, address: NewAddress) -> Result<Address, StoreError>;
        async fn fetch_address(&self, user_id: i64) -> Result<Option<Address>, StoreError>;
        async fn delete_address(&self, user_id: i64) -> Result<bool, StoreError>;
        async fn resolve_usernames(&self, usernames: &[String]) -> Result<Vec<ResolvedRecipient>, StoreError>;
    }
}

mock! {
    pub Channel {}
    impl MessagingChannel for Channel {
        async fn send(&self, recipient: RecipientId, text: &str) -> Result<(), DeliveryError>;
    }
}
