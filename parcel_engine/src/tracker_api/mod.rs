//! # Parcel tracker public API
//!
//! The `tracker_api` module exposes the programmatic API of the engine. It is modular, so that callers can pick the
//! parts they need.
//!
//! * [`order_flow_api`] handles every staff action that changes orders: creation, status changes (single, forced and
//!   bulk), edits, deletion and import. It drives the notification dispatcher.
//! * [`order_api`] provides read access to orders, including the client-facing status query.
//! * [`participant_api`], [`subscription_api`] and [`address_api`] cover the remaining stores.
//! * [`reminders`] sends payment reminders to participants who have not paid.
//!
//! # API usage
//!
//! Every API is created by supplying a backend that implements the traits it needs, plus the shared
//! [`EngineConfig`](crate::EngineConfig):
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use parcel_engine::{EngineConfig, OrderApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = OrderApi::new(db, Arc::new(EngineConfig::default()));
//! let status = api.client_status("cn-1001").await?;
//! ```
pub mod address_api;
pub mod bulk_operator;
pub mod errors;
pub mod import;
pub mod messages;
pub mod notifications;
pub mod order_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod participant_api;
pub mod reminders;
pub mod subscription_api;

pub use notifications::DedupPolicy;
