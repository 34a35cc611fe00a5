//! Migration Planner
//!
//! Decides which migrations a run executes, from the catalog and the ids the
//! ledger reports as applied. The applied ids must be a prefix of the catalog
//! in ascending id order; anything else is refused before a single action
//! runs.

use crate::catalog::Catalog;
use crate::error::{MigrateError, MigrateResult};
use crate::migration::{Direction, Migration};

/// Ordered work list for one run
#[derive(Debug)]
pub struct Plan<'c> {
    direction: Direction,
    steps: Vec<&'c Migration>,
}

impl<'c> Plan<'c> {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn steps(&self) -> &[&'c Migration] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Nothing to do in this direction; not an error
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn ids(&self) -> Vec<&'c str> {
        self.steps.iter().map(|m| m.id()).collect()
    }

    pub fn into_steps(self) -> Vec<&'c Migration> {
        self.steps
    }
}

/// Compute the plan for `direction`
///
/// `applied` may come in any order. A `max` of 0 means no limit; otherwise
/// at most `max` migrations are planned.
pub fn plan<'c>(
    catalog: &'c Catalog,
    applied: &[String],
    direction: Direction,
    max: usize,
) -> MigrateResult<Plan<'c>> {
    let mut applied: Vec<&str> = applied.iter().map(String::as_str).collect();
    applied.sort_unstable();

    let available: Vec<&'c Migration> = catalog.iter().collect();

    if let Some(unknown) = applied.iter().find(|id| !catalog.contains(id)) {
        return Err(MigrateError::UnknownAppliedMigration(unknown.to_string()));
    }

    if applied.len() > available.len() {
        return Err(MigrateError::LedgerAhead {
            applied: applied.len(),
            available: available.len(),
        });
    }

    for (position, (applied_id, migration)) in applied.iter().zip(&available).enumerate() {
        if *applied_id != migration.id() {
            return Err(MigrateError::DivergedHistory {
                position,
                applied: applied_id.to_string(),
                expected: migration.id().to_string(),
            });
        }
    }

    let applied_count = applied.len();
    let mut steps: Vec<&'c Migration> = match direction {
        Direction::Up => available[applied_count..].to_vec(),
        Direction::Down => available[..applied_count].iter().rev().copied().collect(),
    };

    if max > 0 {
        steps.truncate(max);
    }

    tracing::debug!(
        "Planned {} {} migration(s) ({} applied, {} defined)",
        steps.len(),
        direction,
        applied_count,
        available.len()
    );

    Ok(Plan { direction, steps })
}
