use std::{env, time::Duration};

use anyhow::{anyhow, Result};
use log::warn;
use url::Url;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8380";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: Url,
    /// Sent as the admin header on every `/api` call.
    pub admin_id: Option<i64>,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Reads `PARCEL_SERVER_URL` and `PARCEL_ADMIN_ID`. Command-line values, when given, win over the environment.
    pub fn new_from_env_or_default(server: Option<String>, admin_id: Option<i64>) -> Result<Self> {
        let server = server.or_else(|| env::var("PARCEL_SERVER_URL").ok()).unwrap_or_else(|| {
            warn!("PARCEL_SERVER_URL is not set. Using {DEFAULT_SERVER_URL}");
            DEFAULT_SERVER_URL.to_string()
        });
        let server = Url::parse(&server).map_err(|e| anyhow!("'{server}' is not a valid server URL. {e}"))?;
        let admin_id = match admin_id {
            Some(id) => Some(id),
            None => parse_admin_id(env::var("PARCEL_ADMIN_ID").ok())?,
        };
        Ok(Self { server, admin_id, timeout: DEFAULT_TIMEOUT })
    }
}

fn parse_admin_id(raw: Option<String>) -> Result<Option<i64>> {
    match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse::<i64>().map(Some).map_err(|e| anyhow!("PARCEL_ADMIN_ID '{s}' is not a valid user id. {e}")),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn admin_ids() {
        assert_eq!(parse_admin_id(None).unwrap(), None);
        assert_eq!(parse_admin_id(Some("  ".into())).unwrap(), None);
        assert_eq!(parse_admin_id(Some(" 1001 ".into())).unwrap(), Some(1001));
        assert!(parse_admin_id(Some("root".into())).is_err());
    }

    #[test]
    fn explicit_values_win() {
        let config = ClientConfig::new_from_env_or_default(Some("http://tracker.local:9000".into()), Some(5)).unwrap();
        assert_eq!(config.server.as_str(), "http://tracker.local:9000/");
        assert_eq!(config.admin_id, Some(5));
        assert!(ClientConfig::new_from_env_or_default(Some("not a url".into()), Some(5)).is_err());
    }
}
