use crate::{
    config::ModelConfig,
    item::{margin, BudgetItem, BudgetItemRecord, ItemEdit, ItemError},
};
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A client budget: a named list of priced lines.
///
/// Nothing about the totals is stored. They are summed from the items whenever they
/// are asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    id: Uuid,
    name: String,
    client: Option<String>,
    items: Vec<BudgetItem>,
}

/// Totals across every line of a budget
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetTotals {
    pub total_price: Decimal,
    pub internal_total_price: Decimal,
    pub profit: Decimal,
    pub margin: Option<Decimal>,
    /// The client price of the cost lines alone
    pub cost_total: Decimal,
}

#[derive(Error, Debug, Eq, PartialEq)]
pub enum BudgetError {
    #[error("there is no item at position {0}")]
    ItemNotFound(usize),
    #[error("could not update item")]
    Item(#[from] ItemError),
    #[error("the budget total is too large to represent")]
    Overflow,
}

/// The persisted shape of a budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub items: Vec<BudgetItemRecord>,
}

impl Budget {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Budget {
            id: Uuid::new_v4(),
            name: name.into(),
            client: None,
            items: Vec::new(),
        }
    }

    pub fn with_client<S: Into<String>>(mut self, client: S) -> Self {
        self.client = Some(client.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> Option<&str> {
        self.client.as_deref()
    }

    pub fn items(&self) -> &[BudgetItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Result<&BudgetItem, BudgetError> {
        self.items.get(index).ok_or(BudgetError::ItemNotFound(index))
    }

    pub fn push(&mut self, item: BudgetItem) {
        self.items.push(item);
    }

    pub fn remove(&mut self, index: usize) -> Result<BudgetItem, BudgetError> {
        if index >= self.items.len() {
            return Err(BudgetError::ItemNotFound(index));
        }

        Ok(self.items.remove(index))
    }

    /// Applies a field edit to one line
    pub fn edit(&mut self, index: usize, edit: ItemEdit) -> Result<(), BudgetError> {
        let item = self
            .items
            .get_mut(index)
            .ok_or(BudgetError::ItemNotFound(index))?;
        item.apply(edit)?;
        Ok(())
    }

    /// Sums every line
    pub fn totals(&self) -> Result<BudgetTotals, BudgetError> {
        let mut totals = BudgetTotals::default();

        for item in &self.items {
            totals.total_price = add(totals.total_price, item.total_price())?;
            totals.internal_total_price =
                add(totals.internal_total_price, item.internal_total_price())?;
            totals.profit = add(totals.profit, item.profit())?;

            if item.is_cost() {
                totals.cost_total = add(totals.cost_total, item.total_price())?;
            }
        }

        totals.margin = margin(totals.profit, totals.total_price);

        debug!(
            "budget '{}' over {} items: total {}, profit {}",
            self.name,
            self.items.len(),
            totals.total_price,
            totals.profit
        );

        Ok(totals)
    }

    /// Totals rounded for presentation
    pub fn summary(&self, config: &ModelConfig) -> Result<BudgetTotals, BudgetError> {
        let totals = self.totals()?;
        let dp = config.currency_precision;

        Ok(BudgetTotals {
            total_price: totals.total_price.round_dp(dp),
            internal_total_price: totals.internal_total_price.round_dp(dp),
            profit: totals.profit.round_dp(dp),
            margin: totals.margin.map(|m| m.round_dp(dp)),
            cost_total: totals.cost_total.round_dp(dp),
        })
    }

    pub fn to_record(&self) -> BudgetRecord {
        BudgetRecord {
            id: self.id,
            name: self.name.clone(),
            client: self.client.clone(),
            items: self.items.iter().map(BudgetItem::to_record).collect(),
        }
    }

    pub fn from_record(record: BudgetRecord) -> Result<Self, BudgetError> {
        let items = record
            .items
            .into_iter()
            .map(BudgetItem::from_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Budget {
            id: record.id,
            name: record.name,
            client: record.client,
            items,
        })
    }
}

fn add(a: Decimal, b: Decimal) -> Result<Decimal, BudgetError> {
    a.checked_add(b).ok_or(BudgetError::Overflow)
}
