//! Migration Ledger
//!
//! The table recording which migration ids are applied. One row per applied
//! id, `version` as primary key. Row order carries no meaning.
//!
//! The table name is injected into the SQL unquoted. It is operator
//! configuration and must never come from untrusted input; [`Ledger::new`]
//! only accepts plain identifiers.

use crate::backends::{DatabaseConnection, DatabaseValue, SqlHandle};
use crate::dialect::Dialect;
use crate::error::{MigrateError, MigrateResult};
use crate::migration::Direction;

/// Default ledger table name
pub const DEFAULT_TABLE_NAME: &str = "schema_migration";

/// Persistent record of applied migrations
#[derive(Debug, Clone)]
pub struct Ledger {
    table: String,
    dialect: Dialect,
}

impl Ledger {
    pub fn new(table: impl Into<String>, dialect: Dialect) -> MigrateResult<Self> {
        let table = table.into();
        if !is_valid_table_name(&table) {
            return Err(MigrateError::InvalidTableName(table));
        }
        Ok(Self { table, dialect })
    }

    /// Ledger under the default table name
    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            table: DEFAULT_TABLE_NAME.to_string(),
            dialect,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Create the ledger table if it does not exist yet
    pub async fn ensure(&self, conn: &dyn DatabaseConnection) -> MigrateResult<()> {
        conn.execute(&self.create_table_sql(), &[]).await?;
        tracing::debug!("Ledger table '{}' ready", self.table);
        Ok(())
    }

    /// Applied ids, highest first
    pub async fn versions(&self, conn: &dyn DatabaseConnection) -> MigrateResult<Vec<String>> {
        let rows = conn.fetch_all(&self.select_versions_sql(), &[]).await?;

        let mut versions = Vec::with_capacity(rows.len());
        for row in rows {
            versions.push(row.get_by_name("version")?.into_string("version")?);
        }
        // database collations need not agree with byte order
        versions.sort_unstable_by(|a, b| b.cmp(a));
        Ok(versions)
    }

    /// Insert (`Up`) or delete (`Down`) the row for `id`
    ///
    /// Runs on whatever handle it is given, so a transactional migration
    /// records its version inside its own transaction.
    pub async fn record(&self, handle: &mut SqlHandle<'_>, id: &str, direction: Direction) -> MigrateResult<()> {
        let sql = match direction {
            Direction::Up => self.insert_version_sql(),
            Direction::Down => self.delete_version_sql(),
        };
        handle.execute(&sql, &[DatabaseValue::from(id)]).await?;
        Ok(())
    }

    /// SQL to create the ledger table
    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (version VARCHAR(255) NOT NULL PRIMARY KEY)",
            self.table
        )
    }

    /// SQL to record an applied migration
    pub fn insert_version_sql(&self) -> String {
        format!(
            "INSERT INTO {} (version) VALUES ({})",
            self.table,
            self.dialect.placeholder()
        )
    }

    /// SQL to forget a reverted migration
    pub fn delete_version_sql(&self) -> String {
        format!(
            "DELETE FROM {} WHERE version = {}",
            self.table,
            self.dialect.placeholder()
        )
    }

    /// SQL to list applied migrations
    pub fn select_versions_sql(&self) -> String {
        format!("SELECT version FROM {} ORDER BY version DESC", self.table)
    }
}

/// Plain identifier, optionally schema-qualified once (`schema.table`)
pub fn is_valid_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 {
        return false;
    }
    parts.iter().all(|part| {
        let mut chars = part.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    })
}
