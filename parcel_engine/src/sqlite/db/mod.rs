//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! Statements with a `RETURNING` clause are always read with `fetch_all`. SQLite only commits such a write once the
//! statement has been stepped to completion, which `fetch_one` and `fetch_optional` do not do.
use std::{env, str::FromStr, time::Duration};

use log::*;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::traits::StoreError;

pub mod addresses;
pub mod orders;
pub mod participants;
pub mod subscriptions;

const SQLITE_DB_URL: &str = "sqlite://data/parcel_tracker.db";

pub fn db_url() -> String {
    let result = env::var("PARCEL_DATABASE_URL").unwrap_or_else(|_| {
        info!("PARCEL_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

/// Pool tuning for [`new_pool`].
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub max_connections: u32,
    /// How many times to try to open the pool before giving up. Always at least one attempt is made.
    pub connect_retries: u32,
    /// How long a connection waits on a locked database before reporting `SQLITE_BUSY`.
    pub busy_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            connect_retries: 3,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl SqliteOptions {
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_connect_retries(mut self, connect_retries: u32) -> Self {
        self.connect_retries = connect_retries;
        self
    }
}

/// Opens a connection pool, retrying a bounded number of times with a linear back-off.
pub async fn new_pool(url: &str, options: &SqliteOptions) -> Result<SqlitePool, StoreError> {
    let connect_options =
        SqliteConnectOptions::from_str(url)?.busy_timeout(options.busy_timeout).create_if_missing(true);
    let max_attempts = options.connect_retries.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect_options.clone())
            .await;
        match result {
            Ok(pool) => {
                debug!("🗃️ Connected to {url} after {attempt} attempt(s)");
                return Ok(pool);
            },
            Err(e) if attempt < max_attempts => {
                warn!("🗃️ Could not connect to {url} (attempt {attempt}/{max_attempts}): {e}. Retrying.");
                tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
            },
            Err(e) => {
                error!("🗃️ Giving up on {url} after {attempt} attempt(s): {e}");
                return Err(StoreError::ConnectionFailed { attempts: attempt, reason: e.to_string() });
            },
        }
    }
}
