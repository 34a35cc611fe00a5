//! Migration Catalog
//!
//! The ordered set of migrations a caller registers. Ordering is the plain
//! lexicographic order of ids; ids are never parsed.

use std::collections::BTreeMap;

use crate::error::{MigrateError, MigrateResult};
use crate::migration::Migration;

/// Ordered, de-duplicated collection of migrations keyed by id
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    migrations: BTreeMap<String, Migration>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from migrations in any order
    pub fn from_migrations<I, M>(migrations: I) -> MigrateResult<Self>
    where
        I: IntoIterator<Item = M>,
        M: Into<Migration>,
    {
        let mut catalog = Self::new();
        for migration in migrations {
            catalog.add(migration)?;
        }
        Ok(catalog)
    }

    /// Register a migration
    ///
    /// Empty ids are rejected, and so is an id that is already registered:
    /// the existing entry is kept and `DuplicateMigration` is returned.
    pub fn add(&mut self, migration: impl Into<Migration>) -> MigrateResult<()> {
        let migration = migration.into();
        if migration.id().is_empty() {
            return Err(MigrateError::InvalidMigrationId {
                id: String::new(),
                reason: "id must not be empty".to_string(),
            });
        }
        if self.migrations.contains_key(migration.id()) {
            return Err(MigrateError::DuplicateMigration(migration.id().to_string()));
        }
        self.migrations.insert(migration.id().to_string(), migration);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Migration> {
        self.migrations.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.migrations.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Ids in ascending order
    pub fn ids(&self) -> Vec<&str> {
        self.migrations.keys().map(String::as_str).collect()
    }

    /// Migrations in ascending id order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Migration> {
        self.migrations.values()
    }

    /// Check every id starts with exactly `width` ASCII digits
    ///
    /// Helps enforce the zero-padding convention that keeps string order
    /// chronological. The digits are only inspected, never converted.
    pub fn check_numeric_prefix(&self, width: usize) -> MigrateResult<()> {
        for id in self.migrations.keys() {
            let digits = id.bytes().take_while(u8::is_ascii_digit).count();
            if digits != width {
                return Err(MigrateError::InvalidMigrationId {
                    id: id.clone(),
                    reason: format!("expected a {}-digit numeric prefix, found {} digits", width, digits),
                });
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Migration;
    type IntoIter = std::collections::btree_map::Values<'a, String, Migration>;

    fn into_iter(self) -> Self::IntoIter {
        self.migrations.values()
    }
}
