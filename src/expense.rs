use crate::{config::ModelConfig, frequency::Frequency};
use chrono::{NaiveDate, Utc};
use log::{debug, trace, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// An expense record, optionally repeating on a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    /// The record this one was generated from, if it was materialised by a catch-up
    #[serde(default)]
    pub source_id: Option<Uuid>,
}

/// The schedule an expense repeats on.
///
/// `next_occurrence` is always the date that follows the owning expense's `date`
/// under `frequency`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub frequency: Frequency,
    pub next_occurrence: NaiveDate,
}

#[derive(Error, Debug, Eq, PartialEq)]
pub enum ExpenseError {
    #[error("the {0} occurrence after {1} falls outside the supported calendar")]
    DateOutOfRange(Frequency, NaiveDate),
    #[error("catching up would create more than {0} occurrences")]
    ExcessiveBacklog(u32),
}

impl Expense {
    pub fn new<S: Into<String>>(description: S, amount: Decimal, date: NaiveDate) -> Self {
        Expense {
            id: Uuid::new_v4(),
            description: description.into(),
            category: None,
            amount,
            date,
            recurrence: None,
            source_id: None,
        }
    }

    /// Creates an expense that repeats on `frequency`, starting from `date`
    pub fn recurring<S: Into<String>>(
        description: S,
        amount: Decimal,
        date: NaiveDate,
        frequency: Frequency,
    ) -> Result<Self, ExpenseError> {
        let mut expense = Self::new(description, amount, date);
        expense.set_recurrence(Some(frequency))?;
        Ok(expense)
    }

    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets or clears the schedule. The next occurrence is derived from this
    /// expense's date.
    pub fn set_recurrence(&mut self, frequency: Option<Frequency>) -> Result<(), ExpenseError> {
        self.recurrence = match frequency {
            Some(f) => Some(Recurrence {
                frequency: f,
                next_occurrence: next_date(f, self.date)?,
            }),
            None => None,
        };
        Ok(())
    }

    /// Whether an occurrence of this expense is owed on or before `today`
    pub fn is_due(&self, today: NaiveDate) -> bool {
        match self.recurrence {
            Some(r) => r.next_occurrence <= today,
            None => false,
        }
    }

    /// Materialises every occurrence missed up to and including `today`.
    ///
    /// The schedule moves along with the occurrences: `self` stops recurring, and the
    /// last record returned carries the schedule, with its next occurrence after
    /// `today`. Each returned record points back at `self` via `source_id`. If
    /// nothing is due, nothing changes and no records are returned.
    ///
    /// `today` defaults to the current UTC date.
    pub fn catch_up(
        &mut self,
        today: Option<NaiveDate>, // This allows overriding the current date for testing
        config: &ModelConfig,
    ) -> Result<Vec<Expense>, ExpenseError> {
        let today = today.unwrap_or_else(|| Utc::now().date_naive());

        let recurrence = match self.recurrence {
            Some(r) if r.next_occurrence <= today => r,
            _ => return Ok(Vec::new()),
        };

        // Work out every date before touching anything, so a refusal leaves `self`
        // as it was.
        let mut dates = Vec::new();
        let mut next = recurrence.next_occurrence;
        while next <= today {
            if dates.len() >= config.max_backlog as usize {
                warn!(
                    "refusing to catch up '{}': more than {} occurrences since {}",
                    self.description, config.max_backlog, self.date
                );
                return Err(ExpenseError::ExcessiveBacklog(config.max_backlog));
            }

            dates.push(next);
            next = next_date(recurrence.frequency, next)?;
        }

        debug!(
            "catching up '{}': {} {} occurrences, next due {}",
            self.description,
            dates.len(),
            recurrence.frequency,
            next
        );

        let mut occurrences: Vec<Expense> = dates
            .into_iter()
            .map(|date| {
                trace!("materialising '{}' on {}", self.description, date);
                Expense {
                    id: occurrence_id(self.id, date),
                    description: self.description.clone(),
                    category: self.category.clone(),
                    amount: self.amount,
                    date,
                    recurrence: None,
                    source_id: Some(self.id),
                }
            })
            .collect();

        if let Some(last) = occurrences.last_mut() {
            last.recurrence = Some(Recurrence {
                frequency: recurrence.frequency,
                next_occurrence: next,
            });
        }
        self.recurrence = None;

        Ok(occurrences)
    }
}

// An occurrence's id depends only on where it came from and when it falls, so writing
// the same catch-up twice replaces rows rather than duplicating them.
fn occurrence_id(source_id: Uuid, date: NaiveDate) -> Uuid {
    Uuid::new_v5(&source_id, date.to_string().as_bytes())
}

fn next_date(frequency: Frequency, date: NaiveDate) -> Result<NaiveDate, ExpenseError> {
    frequency
        .next_date(date)
        .ok_or(ExpenseError::DateOutOfRange(frequency, date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn recurring_sets_next_occurrence() {
        let expense =
            Expense::recurring("Rent", dec!(2200), ymd(2024, 1, 31), Frequency::Monthly).unwrap();
        assert_eq!(
            expense.recurrence,
            Some(Recurrence {
                frequency: Frequency::Monthly,
                next_occurrence: ymd(2024, 2, 29),
            })
        );
    }

    #[test]
    fn set_recurrence_clears() {
        let mut expense =
            Expense::recurring("Phone", dec!(45), ymd(2024, 5, 2), Frequency::Monthly).unwrap();
        expense.set_recurrence(None).unwrap();
        assert_eq!(expense.recurrence, None);
        assert!(!expense.is_due(ymd(2030, 1, 1)));
    }

    #[test]
    fn recurring_at_end_of_calendar() {
        let result = Expense::recurring("Forever", dec!(1), NaiveDate::MAX, Frequency::Weekly);
        assert_eq!(
            result.err(),
            Some(ExpenseError::DateOutOfRange(Frequency::Weekly, NaiveDate::MAX))
        );
    }

    #[test]
    fn is_due() {
        let expense =
            Expense::recurring("Insurance", dec!(600), ymd(2024, 1, 15), Frequency::Quarterly)
                .unwrap();
        assert!(!expense.is_due(ymd(2024, 4, 14)));
        assert!(expense.is_due(ymd(2024, 4, 15)));
        assert!(!Expense::new("Once", dec!(1), ymd(2000, 1, 1)).is_due(ymd(2024, 1, 1)));
    }

    #[test]
    fn catch_up_not_due() {
        let mut expense =
            Expense::recurring("Hosting", dec!(20), ymd(2024, 3, 1), Frequency::Monthly).unwrap();
        let before = expense.clone();

        let created = expense
            .catch_up(Some(ymd(2024, 3, 31)), &ModelConfig::default())
            .unwrap();
        assert!(created.is_empty());
        assert_eq!(expense, before);
    }

    #[test]
    fn catch_up_materialises_each_missed_occurrence() {
        init();
        let mut expense =
            Expense::recurring("Cleaner", dec!(90), ymd(2024, 1, 3), Frequency::Weekly)
                .unwrap()
                .with_category("Office");
        let today = ymd(2024, 1, 31);

        let created = expense.catch_up(Some(today), &ModelConfig::default()).unwrap();

        let dates: Vec<NaiveDate> = created.iter().map(|e| e.date).collect();
        assert_eq!(
            dates,
            vec![ymd(2024, 1, 10), ymd(2024, 1, 17), ymd(2024, 1, 24), ymd(2024, 1, 31)]
        );

        for e in &created {
            assert_eq!(e.amount, dec!(90));
            assert_eq!(e.category.as_deref(), Some("Office"));
            assert_eq!(e.source_id, Some(expense.id));
            assert_ne!(e.id, expense.id);
        }

        assert_eq!(expense.recurrence, None);
        assert!(created[..3].iter().all(|e| e.recurrence.is_none()));

        let head = created.last().unwrap();
        assert_eq!(
            head.recurrence,
            Some(Recurrence {
                frequency: Frequency::Weekly,
                next_occurrence: ymd(2024, 2, 7),
            })
        );
        assert!(!head.is_due(today));
    }

    #[test]
    fn catch_up_ids_are_stable() {
        let expense =
            Expense::recurring("Internet", dec!(89), ymd(2024, 1, 20), Frequency::Monthly).unwrap();
        let today = Some(ymd(2024, 3, 25));

        let first = expense.clone().catch_up(today, &ModelConfig::default()).unwrap();
        let second = expense.clone().catch_up(today, &ModelConfig::default()).unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_ne!(first[0].id, first[1].id);
    }

    #[test]
    fn catch_up_keeps_next_occurrence_invariant() {
        let mut expense =
            Expense::recurring("Software", dec!(300), ymd(2022, 11, 30), Frequency::Quarterly)
                .unwrap();
        let created = expense
            .catch_up(Some(ymd(2024, 1, 1)), &ModelConfig::default())
            .unwrap();

        // 2023-02-28, 2023-05-28, 2023-08-28, 2023-11-28
        assert_eq!(created.len(), 4);
        assert_eq!(created[0].date, ymd(2023, 2, 28));

        for e in created.iter().chain(std::iter::once(&expense)) {
            if let Some(r) = e.recurrence {
                assert_eq!(Some(r.next_occurrence), r.frequency.next_date(e.date));
            }
        }
    }

    #[test]
    fn catch_up_refuses_excessive_backlog() {
        let mut expense =
            Expense::recurring("Coffee", dec!(4.5), ymd(2020, 1, 1), Frequency::Weekly).unwrap();
        let before = expense.clone();
        let config = ModelConfig {
            max_backlog: 10,
            ..ModelConfig::default()
        };

        let result = expense.catch_up(Some(ymd(2024, 1, 1)), &config);
        assert_eq!(result, Err(ExpenseError::ExcessiveBacklog(10)));
        assert_eq!(expense, before);
    }

    #[test]
    fn catch_up_exactly_at_backlog_limit() {
        let mut expense =
            Expense::recurring("Lease", dec!(1000), ymd(2023, 1, 1), Frequency::Monthly).unwrap();
        let config = ModelConfig {
            max_backlog: 12,
            ..ModelConfig::default()
        };

        let created = expense.catch_up(Some(ymd(2024, 1, 1)), &config).unwrap();
        assert_eq!(created.len(), 12);
        assert_eq!(created[11].date, ymd(2024, 1, 1));
    }

    #[test]
    fn serde_shape() {
        let expense =
            Expense::recurring("Rates", dec!(410.25), ymd(2024, 7, 1), Frequency::Yearly).unwrap();
        let json = serde_json::to_value(&expense).unwrap();
        assert_eq!(json["date"], "2024-07-01");
        assert_eq!(json["amount"], "410.25");
        assert_eq!(json["recurrence"]["frequency"], "yearly");
        assert_eq!(json["recurrence"]["next_occurrence"], "2025-07-01");

        let back: Expense = serde_json::from_value(json).unwrap();
        assert_eq!(back, expense);
    }
}
