//! # Storage and messaging contracts
//!
//! This module defines the behaviour a backend must provide to host the parcel tracker, and the narrow interface the
//! engine uses to talk to a messaging platform.
//!
//! ## Stores
//! * [`OrderManagement`] persists orders keyed by their order id, with upsert semantics and a cascading delete.
//! * [`ParticipantManagement`] keeps the clients attached to each order and their payment flags.
//! * [`SubscriptionManagement`] tracks which clients want status notifications for which orders, and the last status
//!   each of them actually received (the watermark).
//! * [`AddressManagement`] holds client delivery addresses, and resolves usernames to numeric recipient ids.
//!
//! [`TrackerDatabase`] is implemented automatically for any backend that provides all four. The engine ships two
//! backends: `SqliteDatabase` and `MemoryDatabase`. Business logic never knows which one it is talking to.
//!
//! ## Messaging
//! [`MessagingChannel`] is the single `send` call the notification dispatcher needs. Delivery failures are classified
//! into [`DeliveryErrorKind`]s so that reports can say *why* a recipient was missed.
mod address_management;
mod data_objects;
mod messaging;
mod order_management;
mod participant_management;
mod store_error;
mod subscription_management;

pub use address_management::AddressManagement;
pub use data_objects::{OrderUpdate, ParticipantPage, ParticipantQuery, ResolvedRecipient, MAX_PAGE_SIZE};
pub use messaging::{DeliveryError, DeliveryErrorKind, MessagingChannel, RecipientId};
pub use order_management::OrderManagement;
pub use participant_management::ParticipantManagement;
pub use store_error::StoreError;
pub use subscription_management::SubscriptionManagement;

/// Everything a storage backend needs to provide to run the full order flow.
pub trait TrackerDatabase: OrderManagement + ParticipantManagement + SubscriptionManagement + AddressManagement {}

impl<T> TrackerDatabase for T where T: OrderManagement + ParticipantManagement + SubscriptionManagement + AddressManagement
{}
