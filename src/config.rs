//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Portal configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Listen port for the HTTP server.
    pub port: u16,
    /// libSQL file holding session drafts. `:memory:` keeps them in process.
    pub db_path: String,
    /// Base URL of the account service. `None` runs against an in-memory
    /// account service (development only).
    pub accounts_url: Option<String>,
    /// Base URL of the PSP API.
    pub psp_api_url: String,
    pub psp_api_key: SecretString,
    /// Timeout for outbound requests to both the PSP and the account service.
    pub request_timeout: Duration,
    /// Drafts untouched for longer than this are purged.
    pub draft_max_age: Duration,
}

impl PortalConfig {
    pub const DEFAULT_PORT: u16 = 9200;
    pub const DEFAULT_DB_PATH: &'static str = "./data/portal-sessions.db";
    pub const DEFAULT_PSP_API_URL: &'static str = "https://api.stripe.com";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
    pub const DEFAULT_DRAFT_MAX_AGE_DAYS: u64 = 30;

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                message: format!("'{raw}' is not a valid port"),
            })?,
            None => Self::DEFAULT_PORT,
        };

        let timeout_secs: u64 = match get("PSP_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PSP_TIMEOUT_SECS".to_string(),
                message: format!("'{raw}' is not a whole number of seconds"),
            })?,
            None => Self::DEFAULT_TIMEOUT_SECS,
        };

        let draft_max_age_days: u64 = match get("DRAFT_MAX_AGE_DAYS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "DRAFT_MAX_AGE_DAYS".to_string(),
                message: format!("'{raw}' is not a whole number of days"),
            })?,
            None => Self::DEFAULT_DRAFT_MAX_AGE_DAYS,
        };

        let psp_api_key = get("PSP_API_KEY")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("PSP_API_KEY".to_string()))?;

        Ok(Self {
            port,
            db_path: get("PORTAL_DB_PATH").unwrap_or_else(|| Self::DEFAULT_DB_PATH.to_string()),
            accounts_url: get("ACCOUNTS_URL"),
            psp_api_url: get("PSP_API_URL").unwrap_or_else(|| Self::DEFAULT_PSP_API_URL.to_string()),
            psp_api_key,
            request_timeout: Duration::from_secs(timeout_secs),
            draft_max_age: Duration::from_secs(draft_max_age_days.saturating_mul(24 * 60 * 60)),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<PortalConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PortalConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("PSP_API_KEY", "sk_test_123")]).unwrap();
        assert_eq!(config.port, 9200);
        assert_eq!(config.db_path, "./data/portal-sessions.db");
        assert_eq!(config.accounts_url, None);
        assert_eq!(config.psp_api_url, "https://api.stripe.com");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.draft_max_age, Duration::from_secs(30 * 86_400));
        assert_eq!(config.psp_api_key.expose_secret(), "sk_test_123");
    }

    #[test]
    fn overrides_are_read() {
        let config = load(&[
            ("PSP_API_KEY", "sk_test_123"),
            ("PORT", "8081"),
            ("PORTAL_DB_PATH", ":memory:"),
            ("ACCOUNTS_URL", "http://accounts.internal"),
            ("PSP_TIMEOUT_SECS", "3"),
            ("DRAFT_MAX_AGE_DAYS", "7"),
        ])
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.db_path, ":memory:");
        assert_eq!(config.accounts_url.as_deref(), Some("http://accounts.internal"));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.draft_max_age, Duration::from_secs(7 * 86_400));
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = load(&[("PSP_API_KEY", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "PSP_API_KEY"));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = load(&[("PSP_API_KEY", "k"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PORT"));

        let err = load(&[("PSP_API_KEY", "k"), ("PSP_TIMEOUT_SECS", "-1")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PSP_TIMEOUT_SECS"));

        let err = load(&[("PSP_API_KEY", "k"), ("DRAFT_MAX_AGE_DAYS", "forever")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "DRAFT_MAX_AGE_DAYS"));
    }
}
