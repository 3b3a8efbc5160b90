// Environment variable configuration

use crate::{Configuration, DatabaseConfig, ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Applies `TRELLIS_*` environment variables on top of a configuration.
///
/// Recognized variables (with the default prefix):
/// - `TRELLIS_HTTP_PORT`
/// - `TRELLIS_DATABASE_DRIVER`
/// - `TRELLIS_DATABASE_URL`
/// - `TRELLIS_DATABASE_USER`
/// - `TRELLIS_DATABASE_PASSWORD`
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    pub fn new() -> Self {
        Self::with_prefix("TRELLIS")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load a `.env` file into the process environment first, then apply.
    /// A missing default `.env` file is not an error.
    pub fn load_dotenv(&self, path: Option<&str>, config: &mut Configuration) -> Result<()> {
        if let Some(path) = path {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        } else {
            dotenvy::dotenv().ok();
        }
        self.apply(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply(&self, config: &mut Configuration) -> Result<()> {
        let marker = format!("{}_", self.prefix);
        let vars: HashMap<String, String> = env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(&marker)
                    .map(|stripped| (stripped.to_string(), value))
            })
            .collect();
        self.apply_map(&vars, config)
    }

    /// Apply overrides from an already-collected variable map, keyed
    /// without the prefix (`HTTP_PORT`, `DATABASE_URL`, ...).
    pub fn apply_map(
        &self,
        vars: &HashMap<String, String>,
        config: &mut Configuration,
    ) -> Result<()> {
        if let Some(port) = vars.get("HTTP_PORT") {
            config.http.port = port
                .parse()
                .map_err(|_| ConfigError::ParseError(format!("Invalid HTTP_PORT: {}", port)))?;
        }

        if let Some(url) = vars.get("DATABASE_URL") {
            let database = config
                .database
                .get_or_insert_with(|| DatabaseConfig::new("postgres", url.clone()));
            database.url = url.clone();
        }

        if let Some(database) = config.database.as_mut() {
            if let Some(driver) = vars.get("DATABASE_DRIVER") {
                database.driver = driver.clone();
            }
            if let Some(user) = vars.get("DATABASE_USER") {
                database.user = Some(user.clone());
            }
            if let Some(password) = vars.get("DATABASE_PASSWORD") {
                database.password = Some(password.clone());
            }
        }

        Ok(())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new()
    }
}
