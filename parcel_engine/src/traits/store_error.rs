use thiserror::Error;

use crate::db_types::OrderId;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("Could not connect to the database after {attempts} attempt(s). {reason}")]
    ConnectionFailed { attempts: u32, reason: String },
    #[error("Storage call '{operation}' timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("{username} is not a participant of order {order_id}")]
    ParticipantNotFound { order_id: OrderId, username: String },
    #[error("The requested order change would result in a no-op.")]
    OrderModificationNoOp,
}

impl StoreError {
    /// True for the "absent record" family, as opposed to storage failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::OrderNotFound(_) | StoreError::ParticipantNotFound { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}
