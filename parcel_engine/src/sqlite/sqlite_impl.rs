//! `SqliteDatabase` is the durable tracker backend.
//!
//! It implements all the storage traits defined in the [`crate::traits`] module on top of a SQLite connection pool.
use std::{collections::BTreeMap, fmt::Debug};

use log::*;
use sqlx::SqlitePool;

use super::db::{addresses, db_url, new_pool, orders, participants, subscriptions, SqliteOptions};
use crate::{
    db_types::{Address, NewAddress, NewOrder, Order, OrderId, Participant, Subscription},
    helpers::normalize_username,
    traits::{
        AddressManagement,
        OrderManagement,
        OrderUpdate,
        ParticipantManagement,
        ParticipantPage,
        ParticipantQuery,
        ResolvedRecipient,
        StoreError,
        SubscriptionManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `PARCEL_DATABASE_URL` (or the default) as the connection string.
    pub async fn new(max_connections: u32) -> Result<Self, StoreError> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteOptions::default().with_max_connections(max_connections);
        SqliteDatabase::new_with_options(url, &options).await
    }

    pub async fn new_with_options(url: &str, options: &SqliteOptions) -> Result<Self, StoreError> {
        let pool = new_pool(url, options).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Migration failed. {e}")))?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn upsert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::upsert_order(order, &mut conn).await?;
        Ok(order)
    }

    async fn update_order_status(&self, order_id: &OrderId, status: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::update_order_status(order_id, status, &mut conn).await?;
        Ok(order)
    }

    async fn update_order_fields(&self, order_id: &OrderId, update: OrderUpdate) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order_fields(order_id, update, &mut conn).await
    }

    /// Participants, subscriptions and the order itself are removed in a single transaction.
    async fn delete_order(&self, order_id: &OrderId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let participants = participants::delete_for_order(order_id, &mut tx).await?;
        let subscriptions = subscriptions::delete_for_order(order_id, &mut tx).await?;
        let deleted = orders::delete_order(order_id, &mut tx).await?;
        tx.commit().await?;
        if deleted {
            debug!(
                "🗃️ Order [{order_id}] deleted along with {participants} participants and {subscriptions} subscriptions"
            );
        }
        Ok(deleted)
    }

    async fn fetch_recent_orders(&self, limit: u32) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_recent_orders(limit, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_orders_by_status(&self, statuses: &[String]) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_by_status(statuses, &mut conn).await?;
        Ok(orders)
    }

    async fn search_orders_by_note(&self, fragment: &str) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders_by_note(fragment, &mut conn).await?;
        Ok(orders)
    }

    async fn bulk_update_status(&self, order_ids: &[OrderId], status: &str) -> Result<u64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let count = orders::bulk_update_status(order_ids, status, &mut conn).await?;
        Ok(count)
    }

    async fn fetch_orders_for_participant(&self, username: &str) -> Result<Vec<Order>, StoreError> {
        let Some(username) = normalize_username(username) else {
            return Ok(vec![]);
        };
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_participant(&username, &mut conn).await?;
        Ok(orders)
    }
}

impl ParticipantManagement for SqliteDatabase {
    async fn ensure_participants(&self, order_id: &OrderId, usernames: &[String]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut added = 0;
        for username in usernames.iter().filter_map(|u| normalize_username(u)) {
            if participants::insert_if_absent(order_id, &username, &mut tx).await? {
                trace!("🗃️ @{username} added to [{order_id}]");
                added += 1;
            }
        }
        tx.commit().await?;
        Ok(added)
    }

    async fn fetch_participants(&self, order_id: &OrderId) -> Result<Vec<Participant>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let participants = participants::fetch_for_order(order_id, &mut conn).await?;
        Ok(participants)
    }

    async fn toggle_paid(&self, order_id: &OrderId, username: &str) -> Result<Participant, StoreError> {
        let normalized = normalize_username(username).unwrap_or_default();
        let mut conn = self.pool.acquire().await?;
        participants::toggle_paid(order_id, &normalized, &mut conn).await?.ok_or_else(|| {
            StoreError::ParticipantNotFound { order_id: order_id.clone(), username: username.to_string() }
        })
    }

    async fn fetch_unpaid_usernames(&self, order_id: &OrderId) -> Result<Vec<String>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let usernames = participants::fetch_unpaid_usernames(order_id, &mut conn).await?;
        Ok(usernames)
    }

    async fn fetch_unpaid_by_order(&self) -> Result<BTreeMap<OrderId, Vec<String>>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let rows = participants::fetch_all_unpaid(&mut conn).await?;
        let mut result: BTreeMap<OrderId, Vec<String>> = BTreeMap::new();
        for (order_id, username) in rows {
            result.entry(order_id).or_default().push(username);
        }
        Ok(result)
    }

    async fn search_participants(&self, query: ParticipantQuery) -> Result<ParticipantPage, StoreError> {
        trace!("🗃️ Searching {query}");
        let mut conn = self.pool.acquire().await?;
        let page = participants::search(query, &mut conn).await?;
        Ok(page)
    }
}

impl SubscriptionManagement for SqliteDatabase {
    async fn subscribe(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let added = subscriptions::subscribe(user_id, order_id, &mut conn).await?;
        Ok(added)
    }

    async fn unsubscribe(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let removed = subscriptions::unsubscribe(user_id, order_id, &mut conn).await?;
        Ok(removed)
    }

    async fn is_subscribed(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let subscribed = subscriptions::is_subscribed(user_id, order_id, &mut conn).await?;
        Ok(subscribed)
    }

    async fn fetch_subscriptions_for_user(&self, user_id: i64) -> Result<Vec<Subscription>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = subscriptions::fetch_for_user(user_id, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_subscriptions_for_order(&self, order_id: &OrderId) -> Result<Vec<Subscription>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = subscriptions::fetch_for_order(order_id, &mut conn).await?;
        Ok(result)
    }

    async fn set_last_sent_status(&self, user_id: i64, order_id: &OrderId, status: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let updated = subscriptions::set_last_sent(user_id, order_id, Some(status), &mut conn).await?;
        Ok(updated)
    }

    async fn reset_last_sent_status(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let updated = subscriptions::set_last_sent(user_id, order_id, None, &mut conn).await?;
        Ok(updated)
    }

    async fn reset_last_sent_for_order(&self, order_id: &OrderId) -> Result<u64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let count = subscriptions::reset_for_order(order_id, &mut conn).await?;
        Ok(count)
    }
}

impl AddressManagement for SqliteDatabase {
    async fn upsert_address(&self, address: NewAddress) -> Result<Address, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let address = addresses::upsert_address(address, &mut conn).await?;
        Ok(address)
    }

    async fn fetch_address(&self, user_id: i64) -> Result<Option<Address>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let address = addresses::fetch_address(user_id, &mut conn).await?;
        Ok(address)
    }

    async fn delete_address(&self, user_id: i64) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let deleted = addresses::delete_address(user_id, &mut conn).await?;
        Ok(deleted)
    }

    async fn resolve_usernames(&self, usernames: &[String]) -> Result<Vec<ResolvedRecipient>, StoreError> {
        let normalized: Vec<String> = usernames.iter().filter_map(|u| normalize_username(u)).collect();
        let mut conn = self.pool.acquire().await?;
        let resolved = addresses::resolve_usernames(&normalized, &mut conn).await?;
        Ok(resolved)
    }
}
