//! Database Backend Abstractions
//!
//! The engine works against the traits in [`core`]; PostgreSQL and MySQL
//! implementations built on sqlx pools are provided.

pub mod core;
pub mod mysql;
pub mod postgres;

use std::sync::Arc;

pub use self::core::*;
pub use self::mysql::MySqlConnection;
pub use self::postgres::PostgresConnection;

use crate::dialect::Dialect;
use crate::error::MigrateResult;

/// Open and ping a connection for the given dialect
///
/// Connection failures surface as `MigrateError::DatabaseUnavailable`.
pub async fn connect(dialect: Dialect, database_url: &str) -> MigrateResult<Arc<dyn DatabaseConnection>> {
    let conn: Arc<dyn DatabaseConnection> = match dialect {
        Dialect::PostgreSQL => Arc::new(PostgresConnection::connect(database_url).await?),
        Dialect::MySQL => Arc::new(MySqlConnection::connect(database_url).await?),
    };
    Ok(conn)
}
