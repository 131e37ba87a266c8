use config::{Config, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Development => "development",
            RunMode::Production => "production",
        }
    }

    pub fn is_development(&self) -> bool {
        *self == RunMode::Development
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    pub environment: RunMode,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connection string; may carry `<USERNAME>` and `<PASSWORD>` placeholders.
    pub database: String,
    pub database_username: Option<String>,
    pub database_password: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expires_in_days")]
    pub jwt_expires_in_days: i64,
    #[serde(default = "default_jwt_expires_in_days")]
    pub jwt_cookie_expires_in_days: i64,
    #[serde(default = "default_email_host")]
    pub email_host: String,
    #[serde(default = "default_email_port")]
    pub email_port: u16,
    #[serde(default)]
    pub email_username: String,
    #[serde(default)]
    pub email_password: String,
    #[serde(default = "default_email_from")]
    pub email_from: String,
    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max: u32,
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    /// Static files; uploads land in `{public_dir}/img`.
    #[serde(default = "default_public_dir")]
    pub public_dir: String,
    /// Reverse proxies whose `X-Forwarded-For` entries are trusted.
    #[serde(default)]
    pub trusted_proxy_hops: usize,
    #[serde(default)]
    pub telemetry_enabled: bool,
    #[serde(default = "default_telemetry_service_name")]
    pub telemetry_service_name: String,
    #[serde(default = "default_telemetry_service_version")]
    pub telemetry_service_version: String,
    #[serde(default = "default_telemetry_otlp_endpoint")]
    pub telemetry_otlp_endpoint: String,
}

fn default_environment() -> RunMode {
    RunMode::Development
}

fn default_port() -> u16 {
    3000
}

fn default_jwt_expires_in_days() -> i64 {
    90
}

fn default_email_host() -> String {
    "localhost".to_string()
}

fn default_email_port() -> u16 {
    25
}

fn default_email_from() -> String {
    "Natours <hello@natours.io>".to_string()
}

fn default_rate_limit_max() -> u32 {
    100
}

fn default_rate_limit_window_secs() -> u64 {
    3600
}

fn default_public_dir() -> String {
    "public".to_string()
}

fn default_telemetry_service_name() -> String {
    "tours-api".to_string()
}

fn default_telemetry_service_version() -> String {
    "1.0.0".to_string()
}

fn default_telemetry_otlp_endpoint() -> String {
    "http://localhost:4317".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(Environment::default())
    }

    fn from_source(source: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("database_max_connections", 5)?
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// Connection string with credential placeholders filled in.
    pub fn database_url(&self) -> String {
        let mut url = self.database.clone();
        if let Some(username) = &self.database_username {
            url = url.replace("<USERNAME>", username);
        }
        if let Some(password) = &self.database_password {
            url = url.replace("<PASSWORD>", password);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Map;

    fn source(vars: &[(&str, &str)]) -> Environment {
        let map: Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::default().source(Some(map))
    }

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_source(source(&[
            ("DATABASE", "postgres://localhost/tours"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.environment, RunMode::Development);
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.jwt_expires_in_days, 90);
        assert_eq!(config.rate_limit_max, 100);
        assert_eq!(config.rate_limit_window_secs, 3600);
        assert_eq!(config.trusted_proxy_hops, 0);
        assert_eq!(config.public_dir, "public");
        assert!(!config.telemetry_enabled);
    }

    #[test]
    fn test_database_placeholders_are_substituted() {
        let config = AppConfig::from_source(source(&[
            ("DATABASE", "postgres://<USERNAME>:<PASSWORD>@db/tours"),
            ("DATABASE_USERNAME", "natours"),
            ("DATABASE_PASSWORD", "s3cret"),
            ("JWT_SECRET", "secret"),
            ("ENVIRONMENT", "production"),
        ]))
        .unwrap();

        assert_eq!(config.database_url(), "postgres://natours:s3cret@db/tours");
        assert_eq!(config.environment, RunMode::Production);
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        let result = AppConfig::from_source(source(&[("DATABASE", "postgres://localhost/tours")]));

        assert!(result.is_err());
    }
}
