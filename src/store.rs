use crate::{
    config::ModelConfig,
    expense::{Expense, ExpenseError},
};
use chrono::{NaiveDate, Utc};
use log::{error, info};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// A persistent home for expense records.
///
/// This is the seam to whatever hosted table the application writes to. Calls are
/// plain request/response; implementations should not retry.
pub trait ExpenseStore {
    /// Returns every expense that carries a schedule
    fn recurring(&self) -> Result<Vec<Expense>, StoreError>;

    /// Inserts the expense, or replaces the stored record with the same id
    fn upsert(&mut self, expense: &Expense) -> Result<(), StoreError>;
}

#[derive(Error, Debug, Eq, PartialEq)]
pub enum StoreError {
    #[error("the store is unavailable: {0}")]
    Unavailable(String),
    #[error("the store rejected expense {0}: {1}")]
    Rejected(Uuid, String),
}

/// Why a single recurring expense could not be caught up
#[derive(Error, Debug, Eq, PartialEq)]
pub enum CatchUpError {
    #[error(transparent)]
    Expense(#[from] ExpenseError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The outcome of a catch-up run across a store
#[derive(Debug, Default, PartialEq)]
pub struct CatchUpReport {
    /// Every record materialised and written
    pub created: Vec<Expense>,
    /// Expenses that could not be caught up, with the reason
    pub failures: Vec<(Uuid, CatchUpError)>,
}

impl CatchUpReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Catches up every recurring expense in `store`.
///
/// Failures are logged and collected in the report. One expense failing doesn't
/// stop the others. If the store can't list expenses at all, that failure is
/// returned directly.
pub fn process_recurring<S: ExpenseStore + ?Sized>(
    store: &mut S,
    today: Option<NaiveDate>, // This allows overriding the current date for testing
    config: &ModelConfig,
) -> Result<CatchUpReport, StoreError> {
    let today = today.unwrap_or_else(|| Utc::now().date_naive());

    let expenses = store.recurring().map_err(|e| {
        error!("could not load recurring expenses: {}", e);
        e
    })?;

    let mut report = CatchUpReport::default();

    for mut expense in expenses.into_iter().filter(|e| e.is_due(today)) {
        let id = expense.id;

        match catch_up_one(store, &mut expense, today, config) {
            Ok(mut created) => report.created.append(&mut created),
            Err(e) => {
                error!("could not catch up expense {}: {}", id, e);
                report.failures.push((id, e));
            }
        }
    }

    info!(
        "recurring catch-up to {}: {} created, {} failed",
        today,
        report.created.len(),
        report.failures.len()
    );

    Ok(report)
}

// The new records are written before the head loses its schedule. If a write fails
// part way, the head still recurs and the next run writes the same records again
// under the same ids.
fn catch_up_one<S: ExpenseStore + ?Sized>(
    store: &mut S,
    expense: &mut Expense,
    today: NaiveDate,
    config: &ModelConfig,
) -> Result<Vec<Expense>, CatchUpError> {
    let created = expense.catch_up(Some(today), config)?;

    for e in &created {
        store.upsert(e)?;
    }
    store.upsert(expense)?;

    Ok(created)
}

/// An in-memory store, ordered by id
#[derive(Debug, Default)]
pub struct MemoryStore {
    expenses: BTreeMap<Uuid, Expense>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &Uuid) -> Option<&Expense> {
        self.expenses.get(id)
    }

    pub fn len(&self) -> usize {
        self.expenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expense> {
        self.expenses.values()
    }
}

impl ExpenseStore for MemoryStore {
    fn recurring(&self) -> Result<Vec<Expense>, StoreError> {
        Ok(self
            .expenses
            .values()
            .filter(|e| e.recurrence.is_some())
            .cloned()
            .collect())
    }

    fn upsert(&mut self, expense: &Expense) -> Result<(), StoreError> {
        self.expenses.insert(expense.id, expense.clone());
        Ok(())
    }
}
