//! `MemoryDatabase` keeps every table in process memory.
//!
//! It behaves like [`crate::SqliteDatabase`] in every respect the engine relies on, which makes it useful for tests
//! and for short-lived dry runs. All data is lost when the process exits.
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use chrono::{DateTime, Duration, Utc};
use log::*;
use tokio::sync::RwLock;

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

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    last_stamp: Option<DateTime<Utc>>,
    orders: BTreeMap<OrderId, Order>,
    participants: BTreeMap<(OrderId, String), Participant>,
    subscriptions: BTreeMap<(i64, OrderId), Subscription>,
    addresses: HashMap<i64, Address>,
}

impl Tables {
    /// The current time, nudged forward if needed so that successive writes never share a timestamp.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
}

impl OrderManagement for MemoryDatabase {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.tables.read().await.orders.get(order_id).cloned())
    }

    async fn upsert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        let (id, created_at) = match tables.orders.get(&order.order_id) {
            Some(existing) => (existing.id, existing.created_at),
            None => {
                tables.next_id += 1;
                (tables.next_id, now)
            },
        };
        let NewOrder { order_id, client_name, phone, origin, status, note, country } = order;
        let record = Order {
            id,
            order_id: order_id.clone(),
            client_name,
            phone,
            origin,
            status,
            note,
            country,
            created_at,
            updated_at: now,
        };
        tables.orders.insert(order_id, record.clone());
        trace!("🗃️ Order [{}] upserted in memory", record.order_id);
        Ok(record)
    }

    async fn update_order_status(&self, order_id: &OrderId, status: &str) -> Result<Option<Order>, StoreError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        let result = tables.orders.get_mut(order_id).map(|order| {
            order.status = status.to_string();
            order.updated_at = now;
            order.clone()
        });
        Ok(result)
    }

    async fn update_order_fields(&self, order_id: &OrderId, update: OrderUpdate) -> Result<Option<Order>, StoreError> {
        if update.is_empty() {
            return Err(StoreError::OrderModificationNoOp);
        }
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        let Some(order) = tables.orders.get_mut(order_id) else {
            return Ok(None);
        };
        let OrderUpdate { client_name, country, note, status } = update;
        if let Some(client_name) = client_name {
            order.client_name = client_name;
        }
        if let Some(country) = country {
            order.country = Some(country);
        }
        if let Some(note) = note {
            order.note = Some(note);
        }
        if let Some(status) = status {
            order.status = status;
        }
        order.updated_at = now;
        Ok(Some(order.clone()))
    }

    async fn delete_order(&self, order_id: &OrderId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        tables.participants.retain(|(oid, _), _| oid != order_id);
        tables.subscriptions.retain(|(_, oid), _| oid != order_id);
        Ok(tables.orders.remove(order_id).is_some())
    }

    async fn fetch_recent_orders(&self, limit: u32) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self.tables.read().await.orders.values().cloned().collect();
        newest_first(&mut orders);
        orders.truncate(limit as usize);
        Ok(orders)
    }

    async fn fetch_orders_by_status(&self, statuses: &[String]) -> Result<Vec<Order>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.orders.values().filter(|o| statuses.contains(&o.status)).cloned().collect())
    }

    async fn search_orders_by_note(&self, fragment: &str) -> Result<Vec<Order>, StoreError> {
        let needle = fragment.trim().to_lowercase();
        let mut orders: Vec<Order> = self
            .tables
            .read()
            .await
            .orders
            .values()
            .filter(|o| o.note.as_deref().map(|n| !n.is_empty() && n.to_lowercase().contains(&needle)).unwrap_or(false))
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn bulk_update_status(&self, order_ids: &[OrderId], status: &str) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        let mut count = 0;
        for order_id in order_ids {
            if let Some(order) = tables.orders.get_mut(order_id) {
                order.status = status.to_string();
                order.updated_at = now;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn fetch_orders_for_participant(&self, username: &str) -> Result<Vec<Order>, StoreError> {
        let Some(username) = normalize_username(username) else {
            return Ok(vec![]);
        };
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .participants
            .keys()
            .filter(|(_, name)| *name == username)
            .filter_map(|(order_id, _)| tables.orders.get(order_id).cloned())
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }
}

impl ParticipantManagement for MemoryDatabase {
    async fn ensure_participants(&self, order_id: &OrderId, usernames: &[String]) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        let mut added = 0;
        for username in usernames.iter().filter_map(|u| normalize_username(u)) {
            let key = (order_id.clone(), username.clone());
            if tables.participants.contains_key(&key) {
                continue;
            }
            let participant =
                Participant { order_id: order_id.clone(), username, paid: false, created_at: now, updated_at: now };
            tables.participants.insert(key, participant);
            added += 1;
        }
        Ok(added)
    }

    async fn fetch_participants(&self, order_id: &OrderId) -> Result<Vec<Participant>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.participants.values().filter(|p| &p.order_id == order_id).cloned().collect())
    }

    async fn toggle_paid(&self, order_id: &OrderId, username: &str) -> Result<Participant, StoreError> {
        let normalized = normalize_username(username).unwrap_or_default();
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        let key = (order_id.clone(), normalized);
        match tables.participants.get_mut(&key) {
            Some(participant) => {
                participant.paid = !participant.paid;
                participant.updated_at = now;
                Ok(participant.clone())
            },
            None => Err(StoreError::ParticipantNotFound { order_id: order_id.clone(), username: username.to_string() }),
        }
    }

    async fn fetch_unpaid_usernames(&self, order_id: &OrderId) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .participants
            .values()
            .filter(|p| &p.order_id == order_id && !p.paid)
            .map(|p| p.username.clone())
            .collect())
    }

    async fn fetch_unpaid_by_order(&self) -> Result<BTreeMap<OrderId, Vec<String>>, StoreError> {
        let tables = self.tables.read().await;
        let mut result: BTreeMap<OrderId, Vec<String>> = BTreeMap::new();
        for participant in tables.participants.values().filter(|p| !p.paid) {
            result.entry(participant.order_id.clone()).or_default().push(participant.username.clone());
        }
        Ok(result)
    }

    async fn search_participants(&self, query: ParticipantQuery) -> Result<ParticipantPage, StoreError> {
        let tables = self.tables.read().await;
        let fragment = query.search_fragment();
        let matching: Vec<&Participant> = tables
            .participants
            .values()
            .filter(|p| query.order_id.as_ref().map(|oid| &p.order_id == oid).unwrap_or(true))
            .filter(|p| query.paid.map(|paid| p.paid == paid).unwrap_or(true))
            .filter(|p| fragment.as_ref().map(|f| p.username.contains(f.as_str())).unwrap_or(true))
            .collect();
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.page_size() as usize)
            .cloned()
            .collect();
        Ok(ParticipantPage::new(items, total, query.offset))
    }
}

impl SubscriptionManagement for MemoryDatabase {
    async fn subscribe(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let key = (user_id, order_id.clone());
        if tables.subscriptions.contains_key(&key) {
            return Ok(false);
        }
        let now = tables.tick();
        let subscription =
            Subscription { user_id, order_id: order_id.clone(), last_sent_status: None, created_at: now, updated_at: now };
        tables.subscriptions.insert(key, subscription);
        Ok(true)
    }

    async fn unsubscribe(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.subscriptions.remove(&(user_id, order_id.clone())).is_some())
    }

    async fn is_subscribed(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.subscriptions.contains_key(&(user_id, order_id.clone())))
    }

    async fn fetch_subscriptions_for_user(&self, user_id: i64) -> Result<Vec<Subscription>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.subscriptions.values().filter(|s| s.user_id == user_id).cloned().collect())
    }

    async fn fetch_subscriptions_for_order(&self, order_id: &OrderId) -> Result<Vec<Subscription>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.subscriptions.values().filter(|s| &s.order_id == order_id).cloned().collect())
    }

    async fn set_last_sent_status(&self, user_id: i64, order_id: &OrderId, status: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        match tables.subscriptions.get_mut(&(user_id, order_id.clone())) {
            Some(subscription) => {
                subscription.last_sent_status = Some(status.to_string());
                subscription.updated_at = now;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn reset_last_sent_status(&self, user_id: i64, order_id: &OrderId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        match tables.subscriptions.get_mut(&(user_id, order_id.clone())) {
            Some(subscription) => {
                subscription.last_sent_status = None;
                subscription.updated_at = now;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn reset_last_sent_for_order(&self, order_id: &OrderId) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        let mut count = 0;
        for subscription in tables.subscriptions.values_mut().filter(|s| &s.order_id == order_id) {
            subscription.last_sent_status = None;
            subscription.updated_at = now;
            count += 1;
        }
        Ok(count)
    }
}

impl AddressManagement for MemoryDatabase {
    async fn upsert_address(&self, address: NewAddress) -> Result<Address, StoreError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        let created_at = tables.addresses.get(&address.user_id).map(|a| a.created_at).unwrap_or(now);
        let NewAddress { user_id, username, full_name, phone, city, address, postcode } = address;
        let record =
            Address { user_id, username, full_name, phone, city, address, postcode, created_at, updated_at: now };
        tables.addresses.insert(user_id, record.clone());
        Ok(record)
    }

    async fn fetch_address(&self, user_id: i64) -> Result<Option<Address>, StoreError> {
        Ok(self.tables.read().await.addresses.get(&user_id).cloned())
    }

    async fn delete_address(&self, user_id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.addresses.remove(&user_id).is_some())
    }

    async fn resolve_usernames(&self, usernames: &[String]) -> Result<Vec<ResolvedRecipient>, StoreError> {
        let tables = self.tables.read().await;
        let mut result = Vec::new();
        for username in usernames.iter().filter_map(|u| normalize_username(u)) {
            if result.iter().any(|r: &ResolvedRecipient| r.username == username) {
                continue;
            }
            let newest = tables
                .addresses
                .values()
                .filter(|a| a.username.as_deref() == Some(username.as_str()))
                .max_by_key(|a| a.updated_at);
            if let Some(address) = newest {
                result.push(ResolvedRecipient { username, user_id: address.user_id });
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn order(id: &str) -> NewOrder {
        NewOrder::new(OrderId::from(id), "@alice_k", "🛒 Purchased")
    }

    #[tokio::test]
    async fn upsert_keeps_identity() {
        let db = MemoryDatabase::new();
        let first = db.upsert_order(order("CN-1")).await.unwrap();
        let second = db.upsert_order(order("CN-1").with_note("fragile")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.note.as_deref(), Some("fragile"));
    }

    #[tokio::test]
    async fn delete_cascades() {
        let db = MemoryDatabase::new();
        let oid = OrderId::from("CN-1");
        db.upsert_order(order("CN-1")).await.unwrap();
        db.ensure_participants(&oid, &["alice_k".into()]).await.unwrap();
        db.subscribe(7, &oid).await.unwrap();
        assert!(db.delete_order(&oid).await.unwrap());
        assert!(db.fetch_participants(&oid).await.unwrap().is_empty());
        assert!(!db.is_subscribed(7, &oid).await.unwrap());
        assert!(!db.delete_order(&oid).await.unwrap());
    }

    #[tokio::test]
    async fn recent_orders_are_newest_first() {
        let db = MemoryDatabase::new();
        for id in ["CN-1", "CN-2", "CN-3"] {
            db.upsert_order(order(id)).await.unwrap();
        }
        db.update_order_status(&OrderId::from("CN-1"), "📦 Shipping to the warehouse (China)").await.unwrap();
        let recent = db.fetch_recent_orders(2).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, ["CN-1", "CN-3"]);
    }

    #[tokio::test]
    async fn usernames_resolve_case_insensitively() {
        let db = MemoryDatabase::new();
        let address = NewAddress {
            user_id: 99,
            username: Some("alice_k".into()),
            full_name: "Alice K".into(),
            phone: "87011234567".into(),
            city: "Almaty".into(),
            address: "Abay 1".into(),
            postcode: "050000".into(),
        };
        db.upsert_address(address).await.unwrap();
        let resolved = db.resolve_usernames(&["@Alice_K".into(), "nobody".into()]).await.unwrap();
        assert_eq!(resolved, vec![ResolvedRecipient { username: "alice_k".into(), user_id: 99 }]);
    }
}
