use crate::{
    db_types::{NewOrder, Order, OrderId},
    traits::{OrderUpdate, StoreError},
};

/// Persistence for orders.
///
/// All lookups compare order ids exactly; callers normalise user input first. Every mutation stamps `updated_at`.
/// None of these methods validate status text against the status registry: that is the job of the write paths that
/// accept user input.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches the order with the given id, if it exists.
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Inserts the order, or overwrites `client_name`, `phone`, `origin`, `status`, `note` and `country` of the
    /// existing order with the same id. `created_at` is never touched. Returns the stored record.
    async fn upsert_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    /// Sets the status of an order. Returns `None` if the order does not exist.
    async fn update_order_status(&self, order_id: &OrderId, status: &str) -> Result<Option<Order>, StoreError>;

    /// Applies a partial update restricted to the fields of [`OrderUpdate`]. Returns `None` if the order does not
    /// exist, and [`StoreError::OrderModificationNoOp`] if the update is empty.
    ///
    /// A status change made here does not notify anyone. That is left to the caller.
    async fn update_order_fields(&self, order_id: &OrderId, update: OrderUpdate) -> Result<Option<Order>, StoreError>;

    /// Deletes the order together with its participants and subscriptions, as one atomic unit.
    /// Returns `false` if there was no such order.
    async fn delete_order(&self, order_id: &OrderId) -> Result<bool, StoreError>;

    /// The most recently modified orders, newest first.
    async fn fetch_recent_orders(&self, limit: u32) -> Result<Vec<Order>, StoreError>;

    /// Orders whose stored status is exactly one of `statuses`. Order of results is unspecified.
    async fn fetch_orders_by_status(&self, statuses: &[String]) -> Result<Vec<Order>, StoreError>;

    /// Orders whose note contains `fragment`, ignoring case.
    async fn search_orders_by_note(&self, fragment: &str) -> Result<Vec<Order>, StoreError>;

    /// Sets the same status on all the given orders in one set-based write. Returns the number of orders changed.
    async fn bulk_update_status(&self, order_ids: &[OrderId], status: &str) -> Result<u64, StoreError>;

    /// Orders that have `username` as a participant, newest first.
    async fn fetch_orders_for_participant(&self, username: &str) -> Result<Vec<Order>, StoreError>;
}
