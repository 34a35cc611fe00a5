//! Shared helpers for integration tests
//!
//! Runs the engine against an in-memory SQLite database through sqlx. SQLite
//! accepts `?` placeholders, so the MySQL dialect drives the ledger SQL here.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use migrator::{
    DatabaseConnection, DatabaseRow, DatabaseTransaction, DatabaseValue, Dialect, MigrateError,
    MigrateResult, MigrationLogger, Migrator, TxMigration,
};
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite};

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("migrator=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Single-connection in-memory database; the connection must never be
/// recycled or the database disappears with it
pub async fn memory_pool() -> SqlitePool {
    init_tracing();
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite pool")
}

#[derive(Debug, Clone)]
pub struct SqliteConnection {
    pool: SqlitePool,
}

impl SqliteConnection {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn memory() -> Self {
        Self::new(memory_pool().await)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn table_exists(&self, table: &str) -> bool {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await
        .expect("sqlite_master query");
        count > 0
    }

    pub async fn count_rows(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .expect("count query")
    }

    /// Ledger rows straight from the table, ascending
    pub async fn ledger_rows(&self, table: &str) -> Vec<String> {
        sqlx::query_scalar(&format!("SELECT version FROM {} ORDER BY version", table))
            .fetch_all(&self.pool)
            .await
            .expect("ledger query")
    }

    pub async fn seed_ledger(&self, table: &str, versions: &[&str]) {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (version VARCHAR(255) NOT NULL PRIMARY KEY)",
            table
        ))
        .execute(&self.pool)
        .await
        .expect("create ledger");
        for version in versions {
            sqlx::query(&format!("INSERT INTO {} (version) VALUES (?)", table))
                .bind(*version)
                .execute(&self.pool)
                .await
                .expect("seed ledger");
        }
    }
}

#[async_trait]
impl DatabaseConnection for SqliteConnection {
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
            .map(|row| Box::new(SqliteDatabaseRow { row }) as Box<dyn DatabaseRow>)
            .collect())
    }

    async fn begin_transaction(&self) -> MigrateResult<Box<dyn DatabaseTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTransaction { tx }))
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

pub struct SqliteTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

#[async_trait]
impl DatabaseTransaction for SqliteTransaction {
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
            .map(|row| Box::new(SqliteDatabaseRow { row }) as Box<dyn DatabaseRow>)
            .collect())
    }

    async fn commit(self: Box<Self>) -> MigrateResult<()> {
        let SqliteTransaction { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> MigrateResult<()> {
        let SqliteTransaction { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}

pub struct SqliteDatabaseRow {
    row: SqliteRow,
}

impl DatabaseRow for SqliteDatabaseRow {
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
    mut query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[DatabaseValue],
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
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

fn decode_value(row: &SqliteRow, index: usize) -> MigrateResult<DatabaseValue> {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return Ok(value.into());
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.into());
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return Ok(value.into());
    }
    if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return Ok(value.into());
    }
    Err(MigrateError::Decode {
        column: index.to_string(),
        message: "unsupported column type".to_string(),
    })
}

/// Logger that keeps every line for later assertions
#[derive(Clone, Default)]
pub struct RecordingLogger {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    /// Ids from the "applying ..." lines, in order
    pub fn started_ids(&self) -> Vec<String> {
        self.lines()
            .iter()
            .filter(|line| line.starts_with("applying"))
            .filter_map(|line| {
                line.split_whitespace()
                    .skip_while(|word| *word != "migration")
                    .nth(1)
                    .map(str::to_string)
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lines.lock().unwrap().clear();
    }
}

impl MigrationLogger for RecordingLogger {
    fn log(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

/// Transactional migration running one SQL statement each way
pub fn sql_migration(id: &str, up: &'static str, down: Option<&'static str>) -> TxMigration {
    let migration = TxMigration::new(id, move |tx| {
        Box::pin(async move {
            tx.execute(up, &[]).await?;
            Ok(())
        })
    });
    match down {
        Some(down) => migration.down(move |tx| {
            Box::pin(async move {
                tx.execute(down, &[]).await?;
                Ok(())
            })
        }),
        None => migration,
    }
}

/// The two-step catalog of the basic up/down scenario
pub fn table_and_row() -> Vec<TxMigration> {
    vec![
        sql_migration("1", "CREATE TABLE t (x INT)", Some("DROP TABLE t")),
        sql_migration("2", "INSERT INTO t VALUES (1)", Some("DELETE FROM t WHERE x = 1")),
    ]
}

pub fn build_migrator(
    conn: &SqliteConnection,
    logger: &RecordingLogger,
    migrations: Vec<TxMigration>,
) -> Migrator {
    Migrator::builder()
        .dialect(Dialect::MySQL)
        .logger(logger.clone())
        .migrations(migrations)
        .build(Arc::new(conn.clone()))
        .expect("migrator builds")
}
