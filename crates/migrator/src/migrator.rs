//! Migrator - orchestrates migration runs
//!
//! Ties the catalog, ledger, planner and executor together. A run ensures the
//! ledger table exists, reads the applied ids, plans, then executes the plan
//! in order and stops at the first failure. Migrations that completed before
//! the failure stay applied.
//!
//! One run at a time per database: there is no cross-process lock, so two
//! concurrent runs race on the ledger primary key.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::backends::{self, DatabaseConnection};
use crate::catalog::Catalog;
use crate::config::MigratorConfig;
use crate::dialect::Dialect;
use crate::error::{MigrateError, MigrateResult};
use crate::executor::Executor;
use crate::ledger::{Ledger, DEFAULT_TABLE_NAME};
use crate::logger::{MigrationLogger, TracingLogger};
use crate::migration::{Direction, Migration, MigrationMode};
use crate::planner;

/// Result of a migration run
///
/// A failed run still reports the migrations it completed before the error.
#[derive(Debug)]
pub struct MigrationRunResult {
    /// Direction of the run
    pub direction: Direction,
    /// IDs of migrations that were applied or reverted, in execution order
    pub applied_migrations: Vec<String>,
    /// The error that stopped the run, if any
    pub error: Option<MigrateError>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrationRunResult {
    pub fn applied_count(&self) -> usize {
        self.applied_migrations.len()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Count of completed migrations, or the error that stopped the run
    pub fn into_result(self) -> MigrateResult<usize> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.applied_migrations.len()),
        }
    }
}

/// Builder for [`Migrator`]
#[derive(Default)]
pub struct MigratorBuilder {
    driver: Option<String>,
    dialect: Option<Dialect>,
    table_name: Option<String>,
    database_url: Option<String>,
    logger: Option<Box<dyn MigrationLogger>>,
    migrations: Vec<Migration>,
}

impl MigratorBuilder {
    /// Select the dialect by driver name (`postgres` or `mysql`)
    pub fn driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self.dialect = None;
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self.driver = None;
        self
    }

    /// Override the ledger table name (default `schema_migration`)
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Database URL used by [`MigratorBuilder::connect`]
    pub fn database_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = Some(database_url.into());
        self
    }

    /// Destination for progress lines (default [`TracingLogger`])
    pub fn logger(mut self, logger: impl MigrationLogger + 'static) -> Self {
        self.logger = Some(Box::new(logger));
        self
    }

    pub fn migration(mut self, migration: impl Into<Migration>) -> Self {
        self.migrations.push(migration.into());
        self
    }

    pub fn migrations<I, M>(mut self, migrations: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Migration>,
    {
        self.migrations.extend(migrations.into_iter().map(Into::into));
        self
    }

    /// Apply driver, database URL and table name from configuration
    pub fn config(mut self, config: &MigratorConfig) -> Self {
        self = self.driver(config.driver.clone());
        self.table_name = Some(config.table_name.clone());
        if let Some(url) = &config.database_url {
            self.database_url = Some(url.clone());
        }
        self
    }

    fn resolve_dialect(&self) -> MigrateResult<Dialect> {
        match (&self.driver, self.dialect) {
            (Some(driver), _) => Dialect::from_driver(driver),
            (None, Some(dialect)) => Ok(dialect),
            (None, None) => Err(MigrateError::configuration(
                "a driver or dialect must be set",
            )),
        }
    }

    /// Build the migrator over an existing connection
    pub fn build(self, conn: Arc<dyn DatabaseConnection>) -> MigrateResult<Migrator> {
        let dialect = self.resolve_dialect()?;
        let table_name = self
            .table_name
            .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());
        let ledger = Ledger::new(table_name, dialect)?;
        let catalog = Catalog::from_migrations(self.migrations)?;
        let logger = self.logger.unwrap_or_else(|| Box::new(TracingLogger));

        tracing::debug!(
            "Migrator ready: {} migration(s), dialect {}, ledger table '{}'",
            catalog.len(),
            dialect,
            ledger.table_name()
        );

        Ok(Migrator {
            conn,
            ledger,
            catalog,
            logger,
        })
    }

    /// Connect to the configured database URL and build the migrator
    ///
    /// The driver is checked before any connection attempt.
    pub async fn connect(self) -> MigrateResult<Migrator> {
        let dialect = self.resolve_dialect()?;
        let url = self
            .database_url
            .clone()
            .ok_or_else(|| MigrateError::configuration("database_url is not configured"))?;
        let conn = backends::connect(dialect, &url).await?;
        self.build(conn)
    }
}

/// Schema migration engine
pub struct Migrator {
    conn: Arc<dyn DatabaseConnection>,
    ledger: Ledger,
    catalog: Catalog,
    logger: Box<dyn MigrationLogger>,
}

impl Migrator {
    pub fn builder() -> MigratorBuilder {
        MigratorBuilder::default()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn dialect(&self) -> Dialect {
        self.ledger.dialect()
    }

    pub fn connection(&self) -> &Arc<dyn DatabaseConnection> {
        &self.conn
    }

    /// Run at most `max` migrations in `direction`; 0 means all of them
    ///
    /// Nothing to do is not an error: the result is then empty and
    /// successful.
    pub async fn migrate(&self, direction: Direction, max: usize) -> MigrationRunResult {
        let start_time = Instant::now();
        let mut applied_migrations = Vec::new();

        let error = self
            .run(direction, max, &mut applied_migrations)
            .await
            .err();

        if let Some(e) = &error {
            tracing::error!(
                "Migration run ({}) stopped after {} migration(s): {}",
                direction,
                applied_migrations.len(),
                e
            );
        }

        MigrationRunResult {
            direction,
            applied_migrations,
            error,
            execution_time_ms: start_time.elapsed().as_millis(),
        }
    }

    async fn run(
        &self,
        direction: Direction,
        max: usize,
        completed: &mut Vec<String>,
    ) -> MigrateResult<()> {
        let conn = self.conn.as_ref();
        self.ledger.ensure(conn).await?;
        let versions = self.ledger.versions(conn).await?;

        let plan = planner::plan(&self.catalog, &versions, direction, max)?;
        if plan.is_empty() {
            self.logger.log("no more migrations to apply");
            return Ok(());
        }

        let executor = Executor::new(conn, &self.ledger);
        for migration in plan.steps() {
            let kind = match migration.mode() {
                MigrationMode::Transactional => "migration",
                MigrationMode::NonTransactional => "no tx migration",
            };
            self.logger.log(&format!(
                "applying {} {} {} named '{}'...",
                direction,
                kind,
                migration.id(),
                migration.name()
            ));

            executor.execute(direction, migration).await?;
            completed.push(migration.id().to_string());

            self.logger.log(&format!(
                "applied {} {} {} named '{}'",
                direction,
                kind,
                migration.id(),
                migration.name()
            ));
        }

        Ok(())
    }

    /// Apply the next pending migration
    pub async fn up(&self) -> MigrationRunResult {
        self.migrate(Direction::Up, 1).await
    }

    /// Revert the most recently applied migration
    pub async fn down(&self) -> MigrationRunResult {
        self.migrate(Direction::Down, 1).await
    }

    pub async fn up_all(&self) -> MigrationRunResult {
        self.migrate(Direction::Up, 0).await
    }

    pub async fn down_all(&self) -> MigrationRunResult {
        self.migrate(Direction::Down, 0).await
    }

    /// Migrations an unbounded up run would execute, in order
    pub async fn pending(&self) -> MigrateResult<Vec<&Migration>> {
        let versions = self.applied().await?;
        let plan = planner::plan(&self.catalog, &versions, Direction::Up, 0)?;
        Ok(plan.into_steps())
    }

    /// Applied ids, highest first
    pub async fn applied(&self) -> MigrateResult<Vec<String>> {
        let conn = self.conn.as_ref();
        self.ledger.ensure(conn).await?;
        self.ledger.versions(conn).await
    }

    /// Every catalog entry with its applied flag, in id order
    pub async fn status(&self) -> MigrateResult<Vec<(&Migration, bool)>> {
        let versions = self.applied().await?;
        Ok(self
            .catalog
            .iter()
            .map(|migration| {
                let is_applied = versions.iter().any(|v| v == migration.id());
                (migration, is_applied)
            })
            .collect())
    }

    /// Close the underlying connection
    pub async fn close(&self) -> MigrateResult<()> {
        self.conn.close().await
    }
}

impl fmt::Debug for Migrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migrator")
            .field("ledger", &self.ledger)
            .field("catalog", &self.catalog)
            .finish()
    }
}
