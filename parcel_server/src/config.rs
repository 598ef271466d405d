use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use parcel_common::{parse_boolean_flag, parse_id_list, parse_list};
use parcel_engine::{
    config::{DEFAULT_SEND_TIMEOUT, DEFAULT_STORE_TIMEOUT},
    DedupPolicy,
    EngineConfig,
    SqliteOptions,
    StatusRegistry,
};
use telegram_tools::TelegramConfig;

use crate::errors::ServerError;

const DEFAULT_PARCEL_HOST: &str = "127.0.0.1";
const DEFAULT_PARCEL_PORT: u16 = 8380;
const DEFAULT_ALLOWED_PREFIXES: &str = "CN,KR";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" | "in-memory" | "mem" => Ok(Self::Memory),
            other => Err(ServerError::ConfigurationError(format!("'{other}' is not a storage backend"))),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Recipient ids allowed to use the admin API.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdminAllowlist(Vec<i64>);

impl AdminAllowlist {
    pub fn new(ids: Vec<i64>) -> Self {
        Self(ids)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.0.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: String,
    pub db_options: SqliteOptions,
    pub store_timeout: Duration,
    pub send_timeout: Duration,
    pub admin_ids: AdminAllowlist,
    pub allowed_prefixes: Vec<String>,
    /// Replaces the built-in status list when set.
    pub statuses: Option<Vec<String>>,
    pub dedup_notifications: bool,
    /// Log notifications instead of sending them. No bot token is needed.
    pub dry_run: bool,
    pub telegram: TelegramConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PARCEL_HOST.to_string(),
            port: DEFAULT_PARCEL_PORT,
            storage: StorageBackend::default(),
            database_url: String::default(),
            db_options: SqliteOptions::default(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            admin_ids: AdminAllowlist::default(),
            allowed_prefixes: parse_list(DEFAULT_ALLOWED_PREFIXES, ','),
            statuses: None,
            dedup_notifications: false,
            dry_run: false,
            telegram: TelegramConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PARCEL_HOST").ok().unwrap_or_else(|| DEFAULT_PARCEL_HOST.into());
        let port = env_number("PARCEL_PORT", DEFAULT_PARCEL_PORT);
        let storage = env::var("PARCEL_STORAGE")
            .ok()
            .and_then(|s| {
                s.parse::<StorageBackend>()
                    .map_err(|e| error!("🪛️ Invalid PARCEL_STORAGE. {e}. Using sqlite instead."))
                    .ok()
            })
            .unwrap_or_default();
        let database_url = env::var("PARCEL_DATABASE_URL").ok().unwrap_or_else(|| {
            if storage == StorageBackend::Sqlite {
                error!("🪛️ PARCEL_DATABASE_URL is not set. Please set it to the URL for the parcel tracker database.");
            }
            String::default()
        });
        let defaults = SqliteOptions::default();
        let db_options = SqliteOptions::default()
            .with_max_connections(env_number("PARCEL_DB_MAX_CONNECTIONS", defaults.max_connections))
            .with_connect_retries(env_number("PARCEL_DB_CONNECT_RETRIES", defaults.connect_retries));
        let store_timeout =
            Duration::from_millis(env_number("PARCEL_STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT.as_millis() as u64));
        let send_timeout =
            Duration::from_millis(env_number("PARCEL_SEND_TIMEOUT_MS", DEFAULT_SEND_TIMEOUT.as_millis() as u64));
        let admin_ids = env::var("PARCEL_ADMIN_IDS")
            .ok()
            .and_then(|s| {
                parse_id_list::<i64>(&s).map_err(|e| error!("🪛️ Invalid PARCEL_ADMIN_IDS. {e}")).ok()
            })
            .map(AdminAllowlist::new)
            .unwrap_or_default();
        if admin_ids.is_empty() {
            warn!("🪛️ PARCEL_ADMIN_IDS is empty. Nobody will be able to use the admin API.");
        }
        let allowed_prefixes = env::var("PARCEL_ALLOWED_PREFIXES").ok().unwrap_or_else(|| {
            info!("🪛️ PARCEL_ALLOWED_PREFIXES is not set. Using {DEFAULT_ALLOWED_PREFIXES}.");
            DEFAULT_ALLOWED_PREFIXES.to_string()
        });
        let allowed_prefixes = parse_list(&allowed_prefixes, ',').into_iter().map(|p| p.to_uppercase()).collect();
        let statuses = env::var("PARCEL_STATUSES").ok().map(|s| parse_list(&s, '|'));
        let dedup_notifications = parse_boolean_flag(env::var("PARCEL_DEDUP_NOTIFICATIONS").ok(), false);
        let dry_run = parse_boolean_flag(env::var("PARCEL_DRY_RUN").ok(), false);
        let telegram = TelegramConfig::new_from_env_or_default().with_request_timeout(send_timeout);
        Self {
            host,
            port,
            storage,
            database_url,
            db_options,
            store_timeout,
            send_timeout,
            admin_ids,
            allowed_prefixes,
            statuses,
            dedup_notifications,
            dry_run,
            telegram,
        }
    }

    /// Checks the settings that the server cannot start without.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.storage == StorageBackend::Sqlite && self.database_url.trim().is_empty() {
            return Err(ServerError::ConfigurationError("PARCEL_DATABASE_URL is required for sqlite storage".into()));
        }
        if !self.dry_run && !self.telegram.is_configured() {
            return Err(ServerError::ConfigurationError(
                "PARCEL_BOT_TOKEN is required unless PARCEL_DRY_RUN is set".into(),
            ));
        }
        if self.store_timeout.is_zero() || self.send_timeout.is_zero() {
            return Err(ServerError::ConfigurationError("Timeouts must be greater than zero".into()));
        }
        Ok(())
    }

    /// Builds the engine settings. Fails if a custom status list is malformed.
    pub fn engine_config(&self) -> Result<EngineConfig, ServerError> {
        let mut config = EngineConfig::default()
            .with_allowed_prefixes(self.allowed_prefixes.iter().cloned())
            .with_timeouts(self.store_timeout, self.send_timeout);
        if let Some(statuses) = &self.statuses {
            let registry = StatusRegistry::new(statuses.iter().cloned())
                .map_err(|e| ServerError::ConfigurationError(format!("PARCEL_STATUSES: {e}")))?;
            config = config.with_registry(registry);
        }
        if self.dedup_notifications {
            config = config.with_dedup(DedupPolicy::SkipAlreadySent);
        }
        Ok(config)
    }
}

fn env_number<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn storage_backends() {
        assert_eq!("SQLite".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert_eq!(" memory ".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("postgres".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn validation() {
        let mut config = ServerConfig::default();
        assert!(matches!(config.validate(), Err(ServerError::ConfigurationError(_))));
        config.database_url = "sqlite://data/test.db".into();
        assert!(config.validate().is_err());
        config.dry_run = true;
        assert!(config.validate().is_ok());
        config.storage = StorageBackend::Memory;
        config.database_url = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn engine_settings() {
        let mut config = ServerConfig { dedup_notifications: true, ..Default::default() };
        let engine = config.engine_config().unwrap();
        assert_eq!(engine.allowed_prefixes, ["CN", "KR"]);
        assert_eq!(engine.dedup, DedupPolicy::SkipAlreadySent);
        assert_eq!(engine.registry.len(), 11);

        config.statuses = Some(vec!["new".into(), "done".into()]);
        assert_eq!(config.engine_config().unwrap().registry.labels(), ["new", "done"]);
        config.statuses = Some(vec![]);
        assert!(config.engine_config().is_err());
    }

    #[test]
    fn admin_allowlist() {
        let admins = AdminAllowlist::new(vec![10, 20]);
        assert!(admins.contains(20));
        assert!(!admins.contains(30));
        assert!(AdminAllowlist::default().is_empty());
    }
}
