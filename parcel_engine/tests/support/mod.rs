#![allow(dead_code)]
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use log::*;
use parcel_engine::{
    db_types::{NewAddress, NewOrder, OrderId},
    DeliveryError,
    DeliveryErrorKind,
    MessagingChannel,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("parcel_it_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn new_sqlite_db() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_path();
    Sqlite::create_database(&url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error connecting to database");
    db.migrate().await.expect("Error running migrations");
    debug!("🚀️ Test database ready at {url}");
    db
}

pub async fn tear_down(mut db: SqliteDatabase) {
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    if let Err(e) = Sqlite::drop_database(db.url()).await {
        warn!("🚀️ Failed to drop database: {e}");
    }
}

pub fn purchased_order(order_id: &str, client_name: &str) -> NewOrder {
    NewOrder::new(OrderId::from(order_id), client_name, "🛒 Purchased").with_country(&order_id[..2])
}

pub fn address_for(user_id: i64, username: &str) -> NewAddress {
    NewAddress {
        user_id,
        username: Some(username.to_string()),
        full_name: format!("Client {user_id}"),
        phone: "87011234567".into(),
        city: "Almaty".into(),
        address: "Abay 1".into(),
        postcode: "050000".into(),
    }
}

/// A messaging channel that records what it sends and fails or stalls for chosen recipients.
#[derive(Clone, Default)]
pub struct ScriptedChannel {
    sent: Arc<Mutex<Vec<(i64, String)>>>,
    failures: HashMap<i64, DeliveryErrorKind>,
    delays: HashMap<i64, Duration>,
}

impl ScriptedChannel {
    pub fn failing_for(mut self, user_id: i64, kind: DeliveryErrorKind) -> Self {
        self.failures.insert(user_id, kind);
        self
    }

    pub fn stalling_for(mut self, user_id: i64, delay: Duration) -> Self {
        self.delays.insert(user_id, delay);
        self
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<i64> {
        self.sent().into_iter().map(|(id, _)| id).collect()
    }
}

impl MessagingChannel for ScriptedChannel {
    async fn send(&self, recipient: i64, text: &str) -> Result<(), DeliveryError> {
        if let Some(delay) = self.delays.get(&recipient) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(kind) = self.failures.get(&recipient) {
            return Err(DeliveryError::new(*kind, "scripted failure"));
        }
        self.sent.lock().unwrap().push((recipient, text.to_string()));
        Ok(())
    }
}
