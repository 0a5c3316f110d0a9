mod budget;
mod config;
mod expense;
mod frequency;
mod item;
mod notes;
mod store;

pub use budget::{Budget, BudgetError, BudgetRecord, BudgetTotals};
pub use config::{ConfigError, ModelConfig};
pub use expense::{Expense, ExpenseError, Recurrence};
pub use frequency::{Frequency, ParseFrequencyError};
pub use item::{BudgetItem, BudgetItemRecord, ItemEdit, ItemError};
pub use notes::{decode, encode, ItemNotes, NOTES_PREFIX};
pub use store::{
    process_recurring, CatchUpError, CatchUpReport, ExpenseStore, MemoryStore, StoreError,
};

// The number of decimal places summarised totals are rounded to unless configured
// otherwise.
const CURRENCY_PRECISION: u32 = 2;
