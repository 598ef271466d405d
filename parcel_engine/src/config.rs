//! Engine-wide settings, assembled once at start-up and shared read-only.
use std::time::Duration;

use crate::{status_registry::StatusRegistry, tracker_api::DedupPolicy};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub registry: StatusRegistry,
    /// Order id prefixes that new orders may use. Empty means any prefix.
    pub allowed_prefixes: Vec<String>,
    /// Upper bound on each individual storage call made by the flows.
    pub store_timeout: Duration,
    /// Upper bound on each individual messaging send.
    pub send_timeout: Duration,
    pub dedup: DedupPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            registry: StatusRegistry::default(),
            allowed_prefixes: vec!["CN".into(), "KR".into()],
            store_timeout: DEFAULT_STORE_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            dedup: DedupPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_registry(mut self, registry: StatusRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_allowed_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_prefixes = prefixes.into_iter().map(|p| p.as_ref().trim().to_uppercase()).collect();
        self
    }

    pub fn with_timeouts(mut self, store_timeout: Duration, send_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self.send_timeout = send_timeout;
        self
    }

    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }
}
