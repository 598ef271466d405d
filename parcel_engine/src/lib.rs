//! Parcel Tracker Engine
//!
//! The engine behind the parcel tracker: a service that lets clients of a group-buy operation follow their orders
//! and get told when an order's status changes. This library holds the core logic. It knows nothing about HTTP or
//! about any particular messaging platform.
//!
//! The library is divided into these main sections:
//! 1. Storage. The traits in [`traits`] describe the four stores (orders, participants, subscriptions and
//!    addresses). [`SqliteDatabase`] and [`MemoryDatabase`] implement them. The row types live in [`db_types`].
//! 2. The public API ([`tracker_api`]). [`OrderFlowApi`] handles every staff action that changes orders and drives
//!    the [`NotificationDispatcher`], which fans status changes out to subscribers through any
//!    [`MessagingChannel`]. The other APIs cover reads, participants, subscriptions and addresses.
//! 3. The [`status_registry`], the ordered list of statuses staff can choose from.
//!
//! The engine also publishes events when orders are created, change status or are deleted. A simple actor framework
//! ([`events`]) lets you hook into them.
pub mod config;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod memory;
pub mod status_registry;
pub mod traits;
pub mod tracker_api;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::EngineConfig;
pub use memory::MemoryDatabase;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, SqliteOptions};
pub use status_registry::{KnownStatus, OrderStatus, StatusRegistry};
pub use traits::{
    AddressManagement,
    DeliveryError,
    DeliveryErrorKind,
    MessagingChannel,
    OrderManagement,
    ParticipantManagement,
    StoreError,
    SubscriptionManagement,
    TrackerDatabase,
};
pub use tracker_api::{
    address_api::AddressApi,
    bulk_operator::{BulkOutcome, BulkReport},
    errors::{DispatchError, OrderFlowError},
    import::{ImportReport, ImportRow},
    notifications::{DedupPolicy, DispatchReport, NotificationDispatcher},
    order_api::OrderApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    participant_api::ParticipantApi,
    reminders::{BroadcastReport, ReminderApi, ReminderReport},
    subscription_api::SubscriptionApi,
};
