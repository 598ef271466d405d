use crate::{
    db_types::{Address, NewAddress},
    traits::{ResolvedRecipient, StoreError},
};

/// Persistence for client delivery addresses, which double as the username → recipient id directory.
#[allow(async_fn_in_trait)]
pub trait AddressManagement {
    /// Creates or replaces the address of `address.user_id`.
    async fn upsert_address(&self, address: NewAddress) -> Result<Address, StoreError>;

    async fn fetch_address(&self, user_id: i64) -> Result<Option<Address>, StoreError>;

    async fn delete_address(&self, user_id: i64) -> Result<bool, StoreError>;

    /// Maps usernames to numeric recipient ids. Usernames without an address are simply absent from the result.
    async fn resolve_usernames(&self, usernames: &[String]) -> Result<Vec<ResolvedRecipient>, StoreError>;
}
