//! MySQL Backend Implementation
//!
//! Implements the backend traits on top of a sqlx `MySqlPool`.
//!
//! MySQL commits implicitly around most DDL statements, so a transactional
//! migration only stays atomic when its action limits itself to DML.

use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, MySql, Row};

use super::core::*;
use crate::error::{MigrateError, MigrateResult};

/// MySQL connection backed by a sqlx pool
#[derive(Debug, Clone)]
pub struct MySqlConnection {
    pool: MySqlPool,
}

impl MySqlConnection {
    /// Wrap an existing pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Open a pool for `database_url` and make sure the server answers
    pub async fn connect(database_url: &str) -> MigrateResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| MigrateError::DatabaseUnavailable(Box::new(e)))?;

        let conn = Self::new(pool);
        conn.ping()
            .await
            .map_err(|e| MigrateError::DatabaseUnavailable(Box::new(e)))?;
        tracing::debug!("MySQL connection established");
        Ok(conn)
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl DatabaseConnection for MySqlConnection {
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> MigrateResult<u64> {
        let result = bind_all(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(
        &self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigrateResult<Vec<Box<dyn DatabaseRow>>> {
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| Box::new(MySqlDatabaseRow::new(row)) as Box<dyn DatabaseRow>)
            .collect())
    }

    async fn begin_transaction(&self) -> MigrateResult<Box<dyn DatabaseTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlTransaction::new(tx)))
    }

    async fn ping(&self) -> MigrateResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) -> MigrateResult<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// MySQL transaction implementation
pub struct MySqlTransaction {
    tx: sqlx::Transaction<'static, MySql>,
}

impl MySqlTransaction {
    pub fn new(tx: sqlx::Transaction<'static, MySql>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl DatabaseTransaction for MySqlTransaction {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> MigrateResult<u64> {
        let result = bind_all(sqlx::query(sql), params)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigrateResult<Vec<Box<dyn DatabaseRow>>> {
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| Box::new(MySqlDatabaseRow::new(row)) as Box<dyn DatabaseRow>)
            .collect())
    }

    async fn commit(self: Box<Self>) -> MigrateResult<()> {
        let MySqlTransaction { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> MigrateResult<()> {
        let MySqlTransaction { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}

/// MySQL row implementation
pub struct MySqlDatabaseRow {
    row: MySqlRow,
}

impl MySqlDatabaseRow {
    pub fn new(row: MySqlRow) -> Self {
        Self { row }
    }
}

impl DatabaseRow for MySqlDatabaseRow {
    fn get_by_index(&self, index: usize) -> MigrateResult<DatabaseValue> {
        if index >= self.row.len() {
            return Err(MigrateError::ColumnNotFound(index.to_string()));
        }
        decode_value(&self.row, index)
    }

    fn get_by_name(&self, name: &str) -> MigrateResult<DatabaseValue> {
        let index = self
            .row
            .columns()
            .iter()
            .position(|col| col.name() == name)
            .ok_or_else(|| MigrateError::ColumnNotFound(name.to_string()))?;
        decode_value(&self.row, index)
    }

    fn column_count(&self) -> usize {
        self.row.len()
    }

    fn column_names(&self) -> Vec<String> {
        self.row
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect()
    }
}

fn bind_all<'q>(
    mut query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    params: &[DatabaseValue],
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            DatabaseValue::Null => query.bind(Option::<String>::None),
            DatabaseValue::Bool(b) => query.bind(*b),
            DatabaseValue::Int64(i) => query.bind(*i),
            DatabaseValue::Float64(f) => query.bind(*f),
            DatabaseValue::String(s) => query.bind(s.clone()),
            DatabaseValue::Bytes(b) => query.bind(b.clone()),
        };
    }
    query
}

fn decode_value(row: &MySqlRow, index: usize) -> MigrateResult<DatabaseValue> {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return Ok(value.into());
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.into());
    }
    if let Ok(value) = row.try_get::<Option<i32>, _>(index) {
        return Ok(value.into());
    }
    if let Ok(value) = row.try_get::<Option<i16>, _>(index) {
        return Ok(value.map(i64::from).into());
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return Ok(value.into());
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return Ok(value.into());
    }
    if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return Ok(value.into());
    }
    Err(MigrateError::Decode {
        column: row.columns()[index].name().to_string(),
        message: "unsupported MySQL column type".to_string(),
    })
}
