//! Application configuration loaded from environment variables.
//!
//! All settings are read once at startup. For local development a `.env`
//! file is honored; in production the deployment injects env vars.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Withings OAuth client ID (public)
    pub client_id: String,
    /// Withings OAuth client secret
    pub client_secret: String,
    /// Public URL of this service; used as the OAuth redirect URI and as
    /// the notification callback registered with the vendor.
    pub callback_url: String,
    /// Vendor account the connector ingests for when a request does not
    /// name one explicitly.
    pub default_account_id: i64,
    /// Base URL of the Withings API (overridable for tests/emulation).
    pub api_base_url: String,
    /// Notification categories to acknowledge without processing.
    pub disabled_applis: Vec<i32>,
    /// Upper bound on fallback refresh attempts when no valid credential
    /// is on file.
    pub max_refresh_attempts: u32,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
            callback_url: "http://localhost:8080".to_string(),
            default_account_id: 123,
            api_base_url: "https://wbsapi.withings.net".to_string(),
            disabled_applis: Vec::new(),
            max_refresh_attempts: 3,
            gcp_project_id: "test-project".to_string(),
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            client_id: env::var("WITHINGS_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("WITHINGS_CLIENT_ID"))?,
            client_secret: env::var("WITHINGS_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("WITHINGS_CLIENT_SECRET"))?,
            callback_url: env::var("CALLBACK_URL")
                .map_err(|_| ConfigError::Missing("CALLBACK_URL"))?,
            default_account_id: env::var("DEFAULT_ACCOUNT_ID")
                .map_err(|_| ConfigError::Missing("DEFAULT_ACCOUNT_ID"))?
                .parse()
                .map_err(|_| ConfigError::Invalid("DEFAULT_ACCOUNT_ID"))?,
            api_base_url: env::var("WITHINGS_API_URL")
                .unwrap_or_else(|_| "https://wbsapi.withings.net".to_string()),
            disabled_applis: parse_appli_list(
                &env::var("DISABLED_APPLIS").unwrap_or_default(),
            ),
            max_refresh_attempts: env::var("MAX_REFRESH_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
        })
    }
}

/// Parse a comma-separated list of notification category codes.
/// Unparseable items are dropped rather than failing startup.
fn parse_appli_list(raw: &str) -> Vec<i32> {
    raw.split(',')
        .filter_map(|item| item.trim().parse().ok())
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Environment variable has an invalid value: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("WITHINGS_CLIENT_ID", "test_id");
        env::set_var("WITHINGS_CLIENT_SECRET", "test_secret");
        env::set_var("CALLBACK_URL", "https://connector.example.com");
        env::set_var("DEFAULT_ACCOUNT_ID", "42");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.client_id, "test_id");
        assert_eq!(config.client_secret, "test_secret");
        assert_eq!(config.default_account_id, 42);
        assert_eq!(config.api_base_url, "https://wbsapi.withings.net");
        assert_eq!(config.max_refresh_attempts, 3);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_parse_appli_list() {
        assert_eq!(parse_appli_list("1,44"), vec![1, 44]);
        assert_eq!(parse_appli_list(" 16 "), vec![16]);
        assert_eq!(parse_appli_list(""), Vec::<i32>::new());
        assert_eq!(parse_appli_list("junk,44"), vec![44]);
    }
}
