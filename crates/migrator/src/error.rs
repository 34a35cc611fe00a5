//! Error types for the migration engine
//!
//! Every failure the engine can report is a variant of [`MigrateError`].
//! Wrapped causes stay reachable through `std::error::Error::source`.

use crate::migration::Direction;

/// Boxed error returned by user-supplied migration actions
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for migration operations
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Error types for migration operations
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("driver '{0}' not supported, valid values are: (postgres, mysql)")]
    UnsupportedDriver(String),

    #[error("database unavailable: {0}")]
    DatabaseUnavailable(#[source] BoxError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("applied migration number on db ({applied}) cannot be greater than the defined migration list ({available})")]
    LedgerAhead { applied: usize, available: usize },

    #[error("applied migrations diverge from the catalog at position {position}: applied '{applied}', expected '{expected}'")]
    DivergedHistory {
        position: usize,
        applied: String,
        expected: String,
    },

    #[error("applied migration '{0}' is not present in the migration catalog")]
    UnknownAppliedMigration(String),

    #[error("migration '{0}' is irreversible: no down action defined")]
    IrreversibleMigration(String),

    #[error("error executing migration {id} ({direction}): {source}")]
    ActionFailed {
        id: String,
        direction: Direction,
        #[source]
        source: BoxError,
    },

    #[error("error updating migration versions for {id} ({direction}): {source}")]
    LedgerUpdateFailed {
        id: String,
        direction: Direction,
        #[source]
        source: Box<MigrateError>,
    },

    #[error("error starting transaction for migration {id}: {source}")]
    BeginFailed {
        id: String,
        #[source]
        source: Box<MigrateError>,
    },

    #[error("error committing migration {id}: {source}")]
    CommitFailed {
        id: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// The rollback itself failed; `source` is the error that triggered it.
    #[error("error rolling back: {rollback}\n{source}")]
    RollbackFailed {
        rollback: Box<MigrateError>,
        #[source]
        source: Box<MigrateError>,
    },

    #[error("invalid direction '{0}', expected 'up' or 'down'")]
    InvalidDirection(String),

    #[error("migration '{0}' is defined more than once")]
    DuplicateMigration(String),

    #[error("invalid migration id '{id}': {reason}")]
    InvalidMigrationId { id: String, reason: String },

    #[error("invalid ledger table name '{0}'")]
    InvalidTableName(String),

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("failed to decode column {column}: {message}")]
    Decode { column: String, message: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MigrateError {
    /// Build a configuration error from any message
    pub fn configuration(message: impl Into<String>) -> Self {
        MigrateError::Configuration {
            message: message.into(),
        }
    }

    /// Id of the migration this error belongs to, when there is one
    pub fn migration_id(&self) -> Option<&str> {
        match self {
            MigrateError::UnknownAppliedMigration(id)
            | MigrateError::IrreversibleMigration(id)
            | MigrateError::DuplicateMigration(id) => Some(id),
            MigrateError::ActionFailed { id, .. }
            | MigrateError::LedgerUpdateFailed { id, .. }
            | MigrateError::BeginFailed { id, .. }
            | MigrateError::CommitFailed { id, .. }
            | MigrateError::InvalidMigrationId { id, .. } => Some(id),
            MigrateError::RollbackFailed { source, .. } => source.migration_id(),
            _ => None,
        }
    }

    /// True when the error came from planning, before any action ran
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            MigrateError::LedgerAhead { .. }
                | MigrateError::DivergedHistory { .. }
                | MigrateError::UnknownAppliedMigration(_)
        )
    }
}
