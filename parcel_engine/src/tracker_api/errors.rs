use thiserror::Error;

use crate::{db_types::OrderId, helpers::ValidationError, traits::StoreError};

/// The one failure that stops a notification fan-out: the subscriber list itself could not be read.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("Could not load the subscribers of order {order_id}. {source}")]
    SubscribersUnavailable { order_id: OrderId, source: StoreError },
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("{0}")]
    Dispatch(#[from] DispatchError),
}

impl OrderFlowError {
    pub fn is_not_found(&self) -> bool {
        match self {
            OrderFlowError::OrderNotFound(_) => true,
            OrderFlowError::Store(e) => e.is_not_found(),
            _ => false,
        }
    }
}
