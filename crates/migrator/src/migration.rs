//! Migration Definitions
//!
//! A migration is an id, a display name and an up action with an optional
//! down action. Both actions share one execution mode, fixed when the
//! migration is built:
//!
//! - [`TxMigration`] actions receive an open transaction; the ledger update
//!   is written in that same transaction.
//! - [`NoTxMigration`] actions receive the raw connection, for statements
//!   that cannot run inside a transaction (`CREATE INDEX CONCURRENTLY`, ...).
//!
//! Ids are compared as plain strings. Pad numeric prefixes (`0001_init`,
//! `0002_users`, or a `YYYYMMDDHHMMSS` timestamp) so that lexicographic order
//! matches creation order; otherwise `"10"` sorts before `"2"`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::backends::{DatabaseConnection, DatabaseTransaction};
use crate::error::{BoxError, MigrateError};

/// Result of a user-supplied migration action
pub type ActionResult = Result<(), BoxError>;

/// Action run inside a transaction
pub type TxAction =
    Arc<dyn for<'a> Fn(&'a mut dyn DatabaseTransaction) -> BoxFuture<'a, ActionResult> + Send + Sync>;

/// Action run against the raw connection
pub type ConnAction =
    Arc<dyn for<'a> Fn(&'a dyn DatabaseConnection) -> BoxFuture<'a, ActionResult> + Send + Sync>;

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Apply the migration
    Up,
    /// Revert the migration
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(MigrateError::InvalidDirection(other.to_string())),
        }
    }
}

/// Execution mode of a migration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationMode {
    Transactional,
    NonTransactional,
}

/// The actions of a migration, tagged by execution mode
#[derive(Clone)]
pub enum MigrationActions {
    Transactional {
        up: TxAction,
        down: Option<TxAction>,
    },
    NonTransactional {
        up: ConnAction,
        down: Option<ConnAction>,
    },
}

/// Represents a single registered migration
#[derive(Clone)]
pub struct Migration {
    id: String,
    name: String,
    actions: MigrationActions,
}

impl Migration {
    /// Unique identifier, also the sort key
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable name, the id unless one was given
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> MigrationMode {
        match self.actions {
            MigrationActions::Transactional { .. } => MigrationMode::Transactional,
            MigrationActions::NonTransactional { .. } => MigrationMode::NonTransactional,
        }
    }

    pub fn actions(&self) -> &MigrationActions {
        &self.actions
    }

    /// Whether a down action exists
    pub fn is_reversible(&self) -> bool {
        match &self.actions {
            MigrationActions::Transactional { down, .. } => down.is_some(),
            MigrationActions::NonTransactional { down, .. } => down.is_some(),
        }
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mode", &self.mode())
            .field("reversible", &self.is_reversible())
            .finish()
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builder for a transactional migration
///
/// ```rust,no_run
/// use migrator::TxMigration;
///
/// let migration = TxMigration::new("0001_create_users", |tx| {
///     Box::pin(async move {
///         tx.execute("CREATE TABLE users (id INT PRIMARY KEY)", &[]).await?;
///         Ok(())
///     })
/// })
/// .down(|tx| {
///     Box::pin(async move {
///         tx.execute("DROP TABLE users", &[]).await?;
///         Ok(())
///     })
/// });
/// ```
pub struct TxMigration {
    id: String,
    name: Option<String>,
    up: TxAction,
    down: Option<TxAction>,
}

impl TxMigration {
    pub fn new<F>(id: impl Into<String>, up: F) -> Self
    where
        F: for<'a> Fn(&'a mut dyn DatabaseTransaction) -> BoxFuture<'a, ActionResult>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: id.into(),
            name: None,
            up: Arc::new(up),
            down: None,
        }
    }

    /// Set the display name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the action that reverts this migration
    pub fn down<F>(mut self, down: F) -> Self
    where
        F: for<'a> Fn(&'a mut dyn DatabaseTransaction) -> BoxFuture<'a, ActionResult>
            + Send
            + Sync
            + 'static,
    {
        self.down = Some(Arc::new(down));
        self
    }
}

impl From<TxMigration> for Migration {
    fn from(m: TxMigration) -> Self {
        let name = m.name.unwrap_or_else(|| m.id.clone());
        Migration {
            id: m.id,
            name,
            actions: MigrationActions::Transactional {
                up: m.up,
                down: m.down,
            },
        }
    }
}

/// Builder for a migration that runs outside a transaction
pub struct NoTxMigration {
    id: String,
    name: Option<String>,
    up: ConnAction,
    down: Option<ConnAction>,
}

impl NoTxMigration {
    pub fn new<F>(id: impl Into<String>, up: F) -> Self
    where
        F: for<'a> Fn(&'a dyn DatabaseConnection) -> BoxFuture<'a, ActionResult>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: id.into(),
            name: None,
            up: Arc::new(up),
            down: None,
        }
    }

    /// Set the display name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the action that reverts this migration
    pub fn down<F>(mut self, down: F) -> Self
    where
        F: for<'a> Fn(&'a dyn DatabaseConnection) -> BoxFuture<'a, ActionResult>
            + Send
            + Sync
            + 'static,
    {
        self.down = Some(Arc::new(down));
        self
    }
}

impl From<NoTxMigration> for Migration {
    fn from(m: NoTxMigration) -> Self {
        let name = m.name.unwrap_or_else(|| m.id.clone());
        Migration {
            id: m.id,
            name,
            actions: MigrationActions::NonTransactional {
                up: m.up,
                down: m.down,
            },
        }
    }
}
