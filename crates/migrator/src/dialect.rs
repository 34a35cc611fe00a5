//! SQL dialects understood by the ledger
//!
//! A dialect only decides the placeholder syntax used when the ledger binds a
//! migration id. Everything else in the ledger SQL is portable.

use std::fmt;
use std::str::FromStr;

use crate::error::MigrateError;

/// Database driver names accepted by the engine
pub const SUPPORTED_DRIVERS: &[&str] = &["postgres", "mysql"];

/// SQL dialect enumeration for parameterized ledger statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    PostgreSQL,
    MySQL,
}

impl Dialect {
    /// Resolve a driver name into its dialect
    pub fn from_driver(name: &str) -> Result<Self, MigrateError> {
        match name {
            "postgres" => Ok(Dialect::PostgreSQL),
            "mysql" => Ok(Dialect::MySQL),
            other => Err(MigrateError::UnsupportedDriver(other.to_string())),
        }
    }

    /// Driver name this dialect was registered under
    pub fn driver_name(&self) -> &'static str {
        match self {
            Dialect::PostgreSQL => "postgres",
            Dialect::MySQL => "mysql",
        }
    }

    /// Placeholder for the first (and only) bound parameter
    pub fn placeholder(&self) -> &'static str {
        match self {
            Dialect::PostgreSQL => "$1",
            Dialect::MySQL => "?",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.driver_name())
    }
}

impl FromStr for Dialect {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::from_driver(s)
    }
}
