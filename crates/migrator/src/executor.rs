//! Migration Executor
//!
//! Runs one planned migration and moves the ledger with it.
//!
//! Transactional migrations run their action and the ledger update in one
//! transaction: either both become visible on commit or neither does.
//!
//! Non-transactional migrations run the action on the raw connection, then
//! update the ledger on that same connection. If the action fails the ledger
//! is untouched but the schema may be partially changed. If the action
//! succeeds and the ledger update fails, schema and ledger disagree and an
//! operator has to reconcile them by hand.

use tracing::{debug, warn};

use crate::backends::{DatabaseConnection, DatabaseTransaction, SqlHandle};
use crate::error::{MigrateError, MigrateResult};
use crate::ledger::Ledger;
use crate::migration::{ConnAction, Direction, Migration, MigrationActions, TxAction};

/// Applies single migrations against one connection
pub struct Executor<'a> {
    conn: &'a dyn DatabaseConnection,
    ledger: &'a Ledger,
}

impl<'a> Executor<'a> {
    pub fn new(conn: &'a dyn DatabaseConnection, ledger: &'a Ledger) -> Self {
        Self { conn, ledger }
    }

    /// Run `migration` in `direction` and record the outcome in the ledger
    pub async fn execute(&self, direction: Direction, migration: &Migration) -> MigrateResult<()> {
        match migration.actions() {
            MigrationActions::Transactional { up, down } => {
                let action = select_action(migration, direction, up, down.as_ref())?;
                self.execute_in_transaction(direction, migration, action).await
            }
            MigrationActions::NonTransactional { up, down } => {
                let action = select_action(migration, direction, up, down.as_ref())?;
                self.execute_on_connection(direction, migration, action).await
            }
        }
    }

    async fn execute_in_transaction(
        &self,
        direction: Direction,
        migration: &Migration,
        action: &TxAction,
    ) -> MigrateResult<()> {
        let id = migration.id();
        let mut tx = self
            .conn
            .begin_transaction()
            .await
            .map_err(|e| MigrateError::BeginFailed {
                id: id.to_string(),
                source: Box::new(e),
            })?;

        let outcome = self
            .run_in_transaction(tx.as_mut(), direction, migration, action)
            .await;

        match outcome {
            Ok(()) => {
                tx.commit().await.map_err(|e| MigrateError::CommitFailed {
                    id: id.to_string(),
                    source: Box::new(e),
                })?;
                debug!("Committed migration {} ({})", id, direction);
                Ok(())
            }
            Err(err) => {
                warn!("Rolling back migration {} ({}): {}", id, direction, err);
                match tx.rollback().await {
                    Ok(()) => Err(err),
                    Err(rollback) => Err(MigrateError::RollbackFailed {
                        rollback: Box::new(rollback),
                        source: Box::new(err),
                    }),
                }
            }
        }
    }

    async fn run_in_transaction(
        &self,
        tx: &mut dyn DatabaseTransaction,
        direction: Direction,
        migration: &Migration,
        action: &TxAction,
    ) -> MigrateResult<()> {
        action(&mut *tx)
            .await
            .map_err(|source| MigrateError::ActionFailed {
                id: migration.id().to_string(),
                direction,
                source,
            })?;

        let mut handle = SqlHandle::Transaction(tx);
        self.ledger
            .record(&mut handle, migration.id(), direction)
            .await
            .map_err(|e| MigrateError::LedgerUpdateFailed {
                id: migration.id().to_string(),
                direction,
                source: Box::new(e),
            })
    }

    async fn execute_on_connection(
        &self,
        direction: Direction,
        migration: &Migration,
        action: &ConnAction,
    ) -> MigrateResult<()> {
        action(self.conn)
            .await
            .map_err(|source| MigrateError::ActionFailed {
                id: migration.id().to_string(),
                direction,
                source,
            })?;

        let mut handle = SqlHandle::Connection(self.conn);
        self.ledger
            .record(&mut handle, migration.id(), direction)
            .await
            .map_err(|e| {
                warn!(
                    "Migration {} ({}) ran but the ledger was not updated; schema and ledger now disagree",
                    migration.id(),
                    direction
                );
                MigrateError::LedgerUpdateFailed {
                    id: migration.id().to_string(),
                    direction,
                    source: Box::new(e),
                }
            })
    }
}

fn select_action<'m, A>(
    migration: &Migration,
    direction: Direction,
    up: &'m A,
    down: Option<&'m A>,
) -> MigrateResult<&'m A> {
    match direction {
        Direction::Up => Ok(up),
        Direction::Down => {
            down.ok_or_else(|| MigrateError::IrreversibleMigration(migration.id().to_string()))
        }
    }
}
