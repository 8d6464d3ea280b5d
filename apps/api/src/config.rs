//! # API Configuration
//!
//! ## Load Order (later overrides earlier)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. Defaults            127.0.0.1:8080, ./harvest.db, threshold 10      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  2. TOML file           $HARVEST_CONFIG, else ./harvest.toml if present │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  3. Environment         HARVEST_PORT, HARVEST_DB_PATH, ...              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  4. validate()                                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Config File
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "/var/lib/harvest/harvest.db"
//! max_connections = 5
//!
//! [ledger]
//! low_stock_threshold = 10
//! default_invoice_prefix = "INV"
//! default_currency = "USD"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use harvest_core::validation::validate_invoice_prefix;
use harvest_db::{DbConfig, LedgerConfig};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "harvest.toml";

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// SQLite settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: PathBuf::from("./harvest.db"),
            max_connections: 5,
        }
    }
}

/// Complete API configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl ApiConfig {
    /// Loads configuration from defaults, file and environment.
    ///
    /// `config_path` wins over `HARVEST_CONFIG`; without either, `./harvest.toml`
    /// is read when it exists.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let explicit = config_path.or_else(|| std::env::var("HARVEST_CONFIG").ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(&fallback)?
                } else {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML file; missing sections take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Applies `HARVEST_*` overrides read through `lookup`.
    ///
    /// Unparseable numbers are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("HARVEST_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("HARVEST_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(value = %port, "Ignoring invalid HARVEST_PORT"),
            }
        }

        if let Some(path) = lookup("HARVEST_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("HARVEST_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(m) => self.database.max_connections = m,
                Err(_) => warn!(value = %max, "Ignoring invalid HARVEST_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(threshold) = lookup("HARVEST_LOW_STOCK_THRESHOLD") {
            match threshold.parse::<i64>() {
                Ok(t) => self.ledger.low_stock_threshold = t,
                Err(_) => warn!(value = %threshold, "Ignoring invalid HARVEST_LOW_STOCK_THRESHOLD"),
            }
        }

        if let Some(prefix) = lookup("HARVEST_INVOICE_PREFIX") {
            self.ledger.default_invoice_prefix = prefix;
        }

        if let Some(currency) = lookup("HARVEST_CURRENCY") {
            self.ledger.default_currency = currency.to_uppercase();
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be greater than 0".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.ledger.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "ledger.low_stock_threshold cannot be negative".into(),
            ));
        }

        validate_invoice_prefix(&self.ledger.default_invoice_prefix)
            .map_err(|e| ConfigError::Invalid(format!("ledger.default_invoice_prefix: {e}")))?;

        let currency = &self.ledger.default_currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::Invalid(format!(
                "ledger.default_currency must be a 3-letter ISO code, got: {currency}"
            )));
        }

        Ok(())
    }

    /// Pool settings for [`harvest_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = ApiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.ledger.low_stock_threshold, 10);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ApiConfig = toml::from_str(
            r#"
            [server]
            port = 9090

            [ledger]
            low_stock_threshold = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.ledger.low_stock_threshold, 3);
        assert_eq!(config.ledger.default_invoice_prefix, "INV");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("HARVEST_PORT", "7000"),
            ("HARVEST_DB_PATH", "/tmp/farm.db"),
            ("HARVEST_CURRENCY", "eur"),
            ("HARVEST_DB_MAX_CONNECTIONS", "many"),
        ]);

        let mut config = ApiConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.database.path, PathBuf::from("/tmp/farm.db"));
        assert_eq!(config.ledger.default_currency, "EUR");
        // unparseable value ignored
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ApiConfig::default();
        config.ledger.default_invoice_prefix = "INV-".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ApiConfig::default();
        config.ledger.default_currency = "dollars".into();
        assert!(config.validate().is_err());

        let mut config = ApiConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("harvest-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[database]\npath = \"./data/farm.db\"\n").unwrap();

        let config = ApiConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.database.path, PathBuf::from("./data/farm.db"));
        assert!(matches!(
            ApiConfig::from_file(Path::new("/nonexistent/harvest.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
