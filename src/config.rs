//! Configuration loader and validator for the warehouse manager.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub database: Database,
    pub spapi: SpApi,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    /// SQLite URL; may be overridden by `DATABASE_URL`.
    pub url: String,
}

/// Selling Partner API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpApi {
    pub base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_ship_to_country")]
    pub ship_to_country_code: String,
    #[serde(default = "default_min_interval_ms")]
    pub min_request_interval_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_ship_to_country() -> String {
    "US".into()
}

fn default_min_interval_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Database URL, preferring the `DATABASE_URL` environment variable.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database.url.clone())
    }
}

impl SpApi {
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.database.url.trim().is_empty() {
        return Err(ConfigError::Invalid("database.url must be non-empty"));
    }

    let sp = &cfg.spapi;
    if reqwest::Url::parse(&sp.base_url).is_err() {
        return Err(ConfigError::Invalid("spapi.base_url must be an absolute URL"));
    }
    if reqwest::Url::parse(&sp.token_url).is_err() {
        return Err(ConfigError::Invalid("spapi.token_url must be an absolute URL"));
    }
    if sp.client_id.trim().is_empty() {
        return Err(ConfigError::Invalid("spapi.client_id must be non-empty"));
    }
    if sp.client_secret.trim().is_empty() {
        return Err(ConfigError::Invalid("spapi.client_secret must be non-empty"));
    }
    if sp.ship_to_country_code.trim().len() != 2 {
        return Err(ConfigError::Invalid(
            "spapi.ship_to_country_code must be a two-letter country code",
        ));
    }
    if sp.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("spapi.request_timeout_secs must be > 0"));
    }
    // min_request_interval_ms of 0 disables pacing

    Ok(())
}

/// Returns a complete, valid example configuration.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

database:
  url: "sqlite://./data/fba.db"

spapi:
  base_url: "https://sellingpartnerapi-na.amazon.com/"
  token_url: "https://api.amazon.com/auth/o2/token"
  client_id: "amzn1.application-oa2-client.EXAMPLE"
  client_secret: "YOUR_LWA_CLIENT_SECRET"
  ship_to_country_code: "US"
  min_request_interval_ms: 500
  request_timeout_secs: 30
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.spapi.min_request_interval(), Duration::from_millis(500));
    }

    #[test]
    fn pacing_defaults_when_omitted() {
        let yaml = example()
            .lines()
            .filter(|l| !l.contains("min_request_interval_ms") && !l.contains("request_timeout_secs"))
            .collect::<Vec<_>>()
            .join("\n");
        let cfg: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(cfg.spapi.min_request_interval_ms, 500);
        assert_eq!(cfg.spapi.request_timeout_secs, 30);
    }

    #[test]
    fn invalid_client_credentials() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.spapi.client_id = " ".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("client_id")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.spapi.client_secret = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_urls() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.spapi.base_url = "not a url".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("base_url")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.spapi.token_url = "/relative".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.database.url = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_country_and_timeout() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.spapi.ship_to_country_code = "USA".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.spapi.request_timeout_secs = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.spapi.ship_to_country_code, "US");
    }
}
