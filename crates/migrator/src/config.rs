//! Migrator configuration
//!
//! Read from the environment or from a YAML file. Everything here is
//! operator configuration; the table name ends up unquoted in SQL.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{MigrateError, MigrateResult};
use crate::ledger::{is_valid_table_name, DEFAULT_TABLE_NAME};

pub const DRIVER_ENV: &str = "MIGRATOR_DRIVER";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const TABLE_ENV: &str = "MIGRATOR_TABLE";

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

/// Construction-time settings for a [`Migrator`](crate::Migrator)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigratorConfig {
    pub driver: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

impl MigratorConfig {
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            database_url: None,
            table_name: default_table_name(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// `MIGRATOR_DRIVER` is required; `DATABASE_URL` and `MIGRATOR_TABLE`
    /// are optional.
    pub fn from_env() -> MigrateResult<Self> {
        let driver = env::var(DRIVER_ENV).map_err(|_| {
            MigrateError::configuration(format!("{} must be set", DRIVER_ENV))
        })?;

        let mut config = Self::new(driver);
        config.database_url = env::var(DATABASE_URL_ENV).ok();
        if let Ok(table) = env::var(TABLE_ENV) {
            config.table_name = table;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate YAML configuration
    pub fn from_yaml(yaml: &str) -> MigrateResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file
    pub fn load(path: impl AsRef<Path>) -> MigrateResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn validate(&self) -> MigrateResult<()> {
        Dialect::from_driver(&self.driver)?;

        if !is_valid_table_name(&self.table_name) {
            return Err(MigrateError::InvalidTableName(self.table_name.clone()));
        }

        if let Some(url) = &self.database_url {
            if url.trim().is_empty() {
                return Err(MigrateError::configuration("database_url must not be empty"));
            }
        }

        Ok(())
    }

    pub fn dialect(&self) -> MigrateResult<Dialect> {
        Dialect::from_driver(&self.driver)
    }

    pub fn database_url(&self) -> MigrateResult<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| MigrateError::configuration("database_url is not configured"))
    }
}
