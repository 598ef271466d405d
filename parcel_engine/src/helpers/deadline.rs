use std::{future::Future, time::Duration};

use log::*;

use crate::traits::StoreError;

/// Runs a storage call with an upper bound on how long it may take.
///
/// A call that overruns is abandoned and reported as [`StoreError::Timeout`], which callers treat as the failure of
/// that one unit of work.
pub async fn with_deadline<T, F>(limit: Duration, operation: &str, call: F) -> Result<T, StoreError>
where F: Future<Output = Result<T, StoreError>> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!("🗃️ Storage call '{operation}' did not complete within {}ms", limit.as_millis());
            Err(StoreError::Timeout { operation: operation.to_string(), millis: limit.as_millis() as u64 })
        },
    }
}
