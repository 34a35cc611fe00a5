//! In-memory connection used by unit tests
//!
//! Understands the ledger statements and records every other statement it is
//! given. Statements starting with `FAIL` are rejected like a syntax error.
//! Transactions work on a snapshot that only replaces the shared state on
//! commit.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::backends::{DatabaseConnection, DatabaseRow, DatabaseTransaction, DatabaseValue};
use crate::error::{MigrateError, MigrateResult};

#[derive(Debug, Clone, Default)]
struct MockData {
    ledger_created: bool,
    versions: BTreeSet<String>,
    statements: Vec<String>,
}

#[derive(Debug, Default)]
struct Failures {
    begin: bool,
    commit: bool,
    rollback: bool,
    ledger_writes: bool,
}

#[derive(Debug, Default)]
struct MockState {
    data: MockData,
    failures: Failures,
    transactions_begun: usize,
    rollbacks: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the ledger table present and holding `versions`
    pub fn with_versions(versions: &[&str]) -> Self {
        let conn = Self::new();
        {
            let mut state = conn.state.lock().unwrap();
            state.data.ledger_created = true;
            state.data.versions = versions.iter().map(|v| v.to_string()).collect();
        }
        conn
    }

    /// Committed ledger rows in ascending order
    pub fn versions(&self) -> Vec<String> {
        self.state.lock().unwrap().data.versions.iter().cloned().collect()
    }

    /// Committed non-ledger statements in execution order
    pub fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().data.statements.clone()
    }

    pub fn transactions_begun(&self) -> usize {
        self.state.lock().unwrap().transactions_begun
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }

    pub fn fail_begin(&self) {
        self.state.lock().unwrap().failures.begin = true;
    }

    pub fn fail_commit(&self) {
        self.state.lock().unwrap().failures.commit = true;
    }

    pub fn fail_rollback(&self) {
        self.state.lock().unwrap().failures.rollback = true;
    }

    pub fn fail_ledger_writes(&self) {
        self.state.lock().unwrap().failures.ledger_writes = true;
    }

    fn run(&self, data: &mut MockData, sql: &str, params: &[DatabaseValue]) -> MigrateResult<MockOutput> {
        let fail_ledger_writes = self.state.lock().unwrap().failures.ledger_writes;
        apply(data, sql, params, fail_ledger_writes)
    }
}

struct MockOutput {
    affected: u64,
    rows: Vec<Box<dyn DatabaseRow>>,
}

fn database_error(message: impl Into<String>) -> MigrateError {
    MigrateError::Database(sqlx::Error::Protocol(message.into()))
}

fn bound_version(params: &[DatabaseValue]) -> MigrateResult<String> {
    params
        .first()
        .and_then(DatabaseValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| database_error("missing version parameter"))
}

fn apply(
    data: &mut MockData,
    sql: &str,
    params: &[DatabaseValue],
    fail_ledger_writes: bool,
) -> MigrateResult<MockOutput> {
    let empty = |affected| MockOutput {
        affected,
        rows: Vec::new(),
    };

    if sql.starts_with("FAIL") {
        return Err(database_error(format!("syntax error at or near \"{}\"", sql)));
    }
    if sql.starts_with("CREATE TABLE IF NOT EXISTS") && sql.contains("(version VARCHAR(255)") {
        data.ledger_created = true;
        return Ok(empty(0));
    }

    let is_ledger_insert = sql.starts_with("INSERT INTO") && sql.contains("(version)");
    let is_ledger_delete = sql.starts_with("DELETE FROM") && sql.contains("WHERE version");
    let is_ledger_select = sql.starts_with("SELECT version FROM");

    if (is_ledger_insert || is_ledger_delete || is_ledger_select) && !data.ledger_created {
        return Err(database_error("relation does not exist"));
    }
    if (is_ledger_insert || is_ledger_delete) && fail_ledger_writes {
        return Err(database_error("permission denied for ledger table"));
    }

    if is_ledger_insert {
        let version = bound_version(params)?;
        if !data.versions.insert(version.clone()) {
            return Err(database_error(format!(
                "duplicate key value violates unique constraint: version={}",
                version
            )));
        }
        Ok(empty(1))
    } else if is_ledger_delete {
        let version = bound_version(params)?;
        Ok(empty(data.versions.remove(&version) as u64))
    } else if is_ledger_select {
        // ascending; callers must not rely on row order
        let rows = data
            .versions
            .iter()
            .map(|v| {
                Box::new(MockRow {
                    columns: vec!["version".to_string()],
                    values: vec![DatabaseValue::String(v.clone())],
                }) as Box<dyn DatabaseRow>
            })
            .collect();
        Ok(MockOutput { affected: 0, rows })
    } else {
        data.statements.push(sql.to_string());
        Ok(empty(0))
    }
}

#[async_trait]
impl DatabaseConnection for MockConnection {
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> MigrateResult<u64> {
        let mut data = self.state.lock().unwrap().data.clone();
        let output = self.run(&mut data, sql, params)?;
        self.state.lock().unwrap().data = data;
        Ok(output.affected)
    }

    async fn fetch_all(
        &self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigrateResult<Vec<Box<dyn DatabaseRow>>> {
        let mut data = self.state.lock().unwrap().data.clone();
        let output = self.run(&mut data, sql, params)?;
        self.state.lock().unwrap().data = data;
        Ok(output.rows)
    }

    async fn begin_transaction(&self) -> MigrateResult<Box<dyn DatabaseTransaction>> {
        let mut state = self.state.lock().unwrap();
        if state.failures.begin {
            return Err(database_error("connection refused"));
        }
        state.transactions_begun += 1;
        Ok(Box::new(MockTransaction {
            conn: self.clone(),
            data: state.data.clone(),
        }))
    }

    async fn ping(&self) -> MigrateResult<()> {
        Ok(())
    }

    async fn close(&self) -> MigrateResult<()> {
        Ok(())
    }
}

pub struct MockTransaction {
    conn: MockConnection,
    data: MockData,
}

#[async_trait]
impl DatabaseTransaction for MockTransaction {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> MigrateResult<u64> {
        let output = self.conn.run(&mut self.data, sql, params)?;
        Ok(output.affected)
    }

    async fn fetch_all(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> MigrateResult<Vec<Box<dyn DatabaseRow>>> {
        let output = self.conn.run(&mut self.data, sql, params)?;
        Ok(output.rows)
    }

    async fn commit(self: Box<Self>) -> MigrateResult<()> {
        let MockTransaction { conn, data } = *self;
        let mut state = conn.state.lock().unwrap();
        if state.failures.commit {
            return Err(database_error("could not commit: connection lost"));
        }
        state.data = data;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> MigrateResult<()> {
        let mut state = self.conn.state.lock().unwrap();
        state.rollbacks += 1;
        if state.failures.rollback {
            return Err(database_error("could not roll back: connection lost"));
        }
        Ok(())
    }
}

struct MockRow {
    columns: Vec<String>,
    values: Vec<DatabaseValue>,
}

impl DatabaseRow for MockRow {
    fn get_by_index(&self, index: usize) -> MigrateResult<DatabaseValue> {
        self.values
            .get(index)
            .cloned()
            .ok_or_else(|| MigrateError::ColumnNotFound(index.to_string()))
    }

    fn get_by_name(&self, name: &str) -> MigrateResult<DatabaseValue> {
        let index = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| MigrateError::ColumnNotFound(name.to_string()))?;
        self.get_by_index(index)
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.clone()
    }
}
