use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    config::EngineConfig,
    db_types::{Address, NewAddress},
    helpers::with_deadline,
    traits::{AddressManagement, ResolvedRecipient},
    tracker_api::errors::OrderFlowError,
};

/// The client address book.
pub struct AddressApi<B> {
    db: B,
    config: Arc<EngineConfig>,
}

impl<B: Debug> Debug for AddressApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AddressApi ({:?})", self.db)
    }
}

impl<B> AddressApi<B>
where B: AddressManagement
{
    pub fn new(db: B, config: Arc<EngineConfig>) -> Self {
        Self { db, config }
    }

    /// Validates and stores a client's address, replacing any previous one.
    pub async fn save(&self, address: NewAddress) -> Result<Address, OrderFlowError> {
        let address = address.validated()?;
        let user_id = address.user_id;
        let saved = with_deadline(self.config.store_timeout, "upsert_address", self.db.upsert_address(address)).await?;
        debug!("🔄️ Address of user {user_id} saved");
        Ok(saved)
    }

    pub async fn fetch(&self, user_id: i64) -> Result<Option<Address>, OrderFlowError> {
        Ok(with_deadline(self.config.store_timeout, "fetch_address", self.db.fetch_address(user_id)).await?)
    }

    pub async fn delete(&self, user_id: i64) -> Result<bool, OrderFlowError> {
        Ok(with_deadline(self.config.store_timeout, "delete_address", self.db.delete_address(user_id)).await?)
    }

    pub async fn resolve(&self, usernames: &[String]) -> Result<Vec<ResolvedRecipient>, OrderFlowError> {
        let call = self.db.resolve_usernames(usernames);
        Ok(with_deadline(self.config.store_timeout, "resolve_usernames", call).await?)
    }
}
