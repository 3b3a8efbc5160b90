// Configuration management for the Trellis framework

pub mod env;
pub mod error;
pub mod loader;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trellis_core::Provider;

/// Top-level application configuration.
///
/// Registered as a provider during bootstrap so any component can resolve
/// it from the container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Configuration {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

impl Provider for Configuration {}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Load from a JSON or TOML file, detected by extension.
    pub fn from_file(path: &str) -> Result<Self> {
        let value = ConfigLoader::auto(path)?.load_file(path)?;
        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// Load from a file, then apply `TRELLIS_*` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        EnvLoader::new().apply(&mut config)?;
        Ok(config)
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Database connection configuration consumed by a persistence unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    pub driver: String,
    pub url: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Free-form properties handed through to the persistence layer.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl DatabaseConfig {
    pub fn new(driver: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            url: url.into(),
            user: None,
            password: None,
            properties: HashMap::new(),
        }
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Flatten to the string-keyed mapping handed to a persistence unit:
    /// `db.driver`, `db.url`, `db.user`, `db.password` plus the free-form
    /// properties verbatim.
    pub fn to_properties(&self) -> HashMap<String, String> {
        let mut properties = self.properties.clone();
        properties.insert("db.driver".to_string(), self.driver.clone());
        properties.insert("db.url".to_string(), self.url.clone());
        if let Some(user) = &self.user {
            properties.insert("db.user".to_string(), user.clone());
        }
        if let Some(password) = &self.password {
            properties.insert("db.password".to_string(), password.clone());
        }
        properties
    }
}

/// Fluent builder for a `Configuration`.
#[derive(Default)]
pub struct ConfigurationBuilder {
    http: HttpConfig,
    database: Option<DatabaseConfig>,
}

impl ConfigurationBuilder {
    pub fn port(mut self, port: u16) -> Self {
        self.http.port = port;
        self
    }

    pub fn database(mut self, database: DatabaseConfig) -> Self {
        self.database = Some(database);
        self
    }

    pub fn build(self) -> Configuration {
        Configuration {
            http: self.http,
            database: self.database,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_is_8080() {
        let config = Configuration::default();
        assert_eq!(config.http.port, 8080);
        assert!(config.database.is_none());
    }

    #[test]
    fn test_builder() {
        let config = Configuration::builder()
            .port(9000)
            .database(DatabaseConfig::new("postgres", "postgres://localhost/app"))
            .build();

        assert_eq!(config.http.port, 9000);
        assert_eq!(config.database.unwrap().driver, "postgres");
    }

    #[test]
    fn test_deserialize_toml() {
        let value = ConfigLoader::new(FileFormat::Toml)
            .parse("[http]\nport = 9000\n\n[database]\ndriver = \"postgres\"\nurl = \"postgres://localhost/app\"\n")
            .unwrap();
        let config: Configuration = serde_json::from_value(value).unwrap();

        assert_eq!(config.http.port, 9000);
        assert_eq!(config.database.unwrap().url, "postgres://localhost/app");
    }

    #[test]
    fn test_deserialize_defaults_apply() {
        let config: Configuration = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(config.http.port, 8080);
    }

    #[test]
    fn test_to_properties() {
        let database = DatabaseConfig::new("postgres", "postgres://localhost/app")
            .user("app")
            .password("secret")
            .property("pool.size", "10");

        let properties = database.to_properties();
        assert_eq!(properties.get("db.driver"), Some(&"postgres".to_string()));
        assert_eq!(properties.get("db.url"), Some(&"postgres://localhost/app".to_string()));
        assert_eq!(properties.get("db.user"), Some(&"app".to_string()));
        assert_eq!(properties.get("db.password"), Some(&"secret".to_string()));
        assert_eq!(properties.get("pool.size"), Some(&"10".to_string()));
    }

    #[test]
    fn test_to_properties_without_credentials() {
        let properties = DatabaseConfig::new("sqlite", "sqlite::memory:").to_properties();
        assert!(!properties.contains_key("db.user"));
        assert!(!properties.contains_key("db.password"));
    }
}
