//! # migrator: schema migrations for PostgreSQL and MySQL
//!
//! Migrations are Rust closures registered under string ids. The engine keeps
//! a ledger table of applied ids, plans which migrations to run in a given
//! direction, and runs each one either inside a transaction together with its
//! ledger update or, for statements that cannot run in a transaction, on the
//! raw connection.
//!
//! ```rust,no_run
//! use migrator::{Migrator, TxMigration};
//!
//! # async fn run() -> migrator::MigrateResult<()> {
//! let migrator = Migrator::builder()
//!     .driver("postgres")
//!     .database_url("postgres://localhost/app")
//!     .migration(TxMigration::new("0001_create_users", |tx| {
//!         Box::pin(async move {
//!             tx.execute("CREATE TABLE users (id BIGINT PRIMARY KEY)", &[]).await?;
//!             Ok(())
//!         })
//!     }))
//!     .connect()
//!     .await?;
//!
//! let applied = migrator.up_all().await.into_result()?;
//! println!("applied {} migration(s)", applied);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod catalog;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod logger;
pub mod migration;
pub mod migrator;
pub mod planner;

#[cfg(test)]
mod testing;

pub use backends::{
    DatabaseConnection, DatabaseRow, DatabaseTransaction, DatabaseValue, MySqlConnection,
    PostgresConnection, SqlHandle,
};
pub use catalog::Catalog;
pub use config::MigratorConfig;
pub use dialect::{Dialect, SUPPORTED_DRIVERS};
pub use error::{BoxError, MigrateError, MigrateResult};
pub use executor::Executor;
pub use ledger::{Ledger, DEFAULT_TABLE_NAME};
pub use logger::{MigrationLogger, TracingLogger, WriterLogger};
pub use migration::{
    ActionResult, ConnAction, Direction, Migration, MigrationActions, MigrationMode,
    NoTxMigration, TxAction, TxMigration,
};
pub use migrator::{MigrationRunResult, Migrator, MigratorBuilder};
pub use planner::{plan, Plan};
