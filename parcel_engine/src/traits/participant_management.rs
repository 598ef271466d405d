use std::collections::BTreeMap;

use crate::{
    db_types::{OrderId, Participant},
    traits::{ParticipantPage, ParticipantQuery, StoreError},
};

/// Persistence for order participants. Usernames are normalised by the store (lower case, no leading `@`).
#[allow(async_fn_in_trait)]
pub trait ParticipantManagement {
    /// Adds each username to the order unless it is already there. Existing rows, and their `paid` flags, are left
    /// alone. Returns the number of participants actually added.
    async fn ensure_participants(&self, order_id: &OrderId, usernames: &[String]) -> Result<u64, StoreError>;

    /// The order's participants, ordered by username.
    async fn fetch_participants(&self, order_id: &OrderId) -> Result<Vec<Participant>, StoreError>;

    /// Flips the `paid` flag and returns the updated participant.
    /// Returns [`StoreError::ParticipantNotFound`] if the pair does not exist.
    async fn toggle_paid(&self, order_id: &OrderId, username: &str) -> Result<Participant, StoreError>;

    /// Usernames of the order's participants who have not paid, ordered by username.
    async fn fetch_unpaid_usernames(&self, order_id: &OrderId) -> Result<Vec<String>, StoreError>;

    /// Every unpaid participant, grouped by order id.
    async fn fetch_unpaid_by_order(&self) -> Result<BTreeMap<OrderId, Vec<String>>, StoreError>;

    /// A filtered page of participants, ordered by order id then username.
    ///
    /// The total and the page are two separate reads, so under concurrent writes they may disagree slightly. `has_more`
    /// is derived from both and is never inconsistent with the page itself.
    async fn search_participants(&self, query: ParticipantQuery) -> Result<ParticipantPage, StoreError>;
}
