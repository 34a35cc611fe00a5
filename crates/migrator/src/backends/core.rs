//! Core Database Backend Traits
//!
//! The engine never talks to a driver directly. It only needs a connection
//! handle that can run statements and open transactions, plus a transaction
//! handle that can run statements and finish.

use async_trait::async_trait;

use crate::error::{MigrateError, MigrateResult};

/// Abstract database connection trait
///
/// Implementations are usually a pool; every call may check out a different
/// physical connection, except inside a transaction.
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
    /// Execute a statement and return the affected rows count
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> MigrateResult<u64>;

    /// Execute a query and return the result rows
    async fn fetch_all(
        &self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigrateResult<Vec<Box<dyn DatabaseRow>>>;

    /// Begin a transaction
    async fn begin_transaction(&self) -> MigrateResult<Box<dyn DatabaseTransaction>>;

    /// Check the database is reachable
    async fn ping(&self) -> MigrateResult<()>;

    /// Close the connection
    async fn close(&self) -> MigrateResult<()>;
}

/// Abstract database transaction trait
#[async_trait]
pub trait DatabaseTransaction: Send {
    /// Execute a statement within the transaction
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> MigrateResult<u64>;

    /// Execute a query and return result rows within the transaction
    async fn fetch_all(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigrateResult<Vec<Box<dyn DatabaseRow>>>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> MigrateResult<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> MigrateResult<()>;
}

/// Abstract database row trait
pub trait DatabaseRow: Send + Sync {
    /// Get a column value by index
    fn get_by_index(&self, index: usize) -> MigrateResult<DatabaseValue>;

    /// Get a column value by name
    fn get_by_name(&self, name: &str) -> MigrateResult<DatabaseValue>;

    /// Get column count
    fn column_count(&self) -> usize;

    /// Get column names
    fn column_names(&self) -> Vec<String>;
}

/// Either side of the executor's envelope: the raw connection or an open
/// transaction. Statements go to whichever one it holds.
pub enum SqlHandle<'a> {
    Connection(&'a dyn DatabaseConnection),
    Transaction(&'a mut dyn DatabaseTransaction),
}

impl SqlHandle<'_> {
    pub async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> MigrateResult<u64> {
        match self {
            SqlHandle::Connection(conn) => conn.execute(sql, params).await,
            SqlHandle::Transaction(tx) => tx.execute(sql, params).await,
        }
    }

    pub async fn fetch_all(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigrateResult<Vec<Box<dyn DatabaseRow>>> {
        match self {
            SqlHandle::Connection(conn) => conn.fetch_all(sql, params).await,
            SqlHandle::Transaction(tx) => tx.fetch_all(sql, params).await,
        }
    }

    /// True when statements run inside a transaction
    pub fn is_transaction(&self) -> bool {
        matches!(self, SqlHandle::Transaction(_))
    }
}

/// Database value enumeration for parameter binding and row decoding
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl DatabaseValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DatabaseValue::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Take the value as an owned string, failing for any other type
    pub fn into_string(self, column: &str) -> MigrateResult<String> {
        match self {
            DatabaseValue::String(s) => Ok(s),
            other => Err(MigrateError::Decode {
                column: column.to_string(),
                message: format!("expected a string, found {:?}", other),
            }),
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Int64(value as i64)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Float64(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(value: Vec<u8>) -> Self {
        DatabaseValue::Bytes(value)
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}
