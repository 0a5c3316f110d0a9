use crate::notes;
use log::trace;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const PERCENT: Decimal = dec!(100);

/// A single priced line within a client budget.
///
/// Every item carries two sets of figures: the quantity and unit price the client is
/// charged, and the internal quantity and unit price it costs the business to
/// deliver. The totals, profit and margin are derived from those four numbers and
/// are recomputed on every edit.
///
/// A *cost line* represents pure internal expense with no markup. Its internal
/// figures always mirror the public ones, so its profit is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetItem {
    description: String,
    quantity: Decimal,
    price_per_unit: Decimal,
    internal_quantity: Decimal,
    internal_price_per_unit: Decimal,
    notes: String,
    is_cost: bool,

    // Derived
    total_price: Decimal,
    internal_total_price: Decimal,
    profit: Decimal,
}

/// A single field edit, as it arrives from a form
#[derive(Debug, Clone, PartialEq)]
pub enum ItemEdit {
    Description(String),
    Quantity(Decimal),
    PricePerUnit(Decimal),
    InternalQuantity(Decimal),
    InternalPricePerUnit(Decimal),
    Notes(String),
    Cost(bool),
}

#[derive(Error, Debug, Eq, PartialEq)]
pub enum ItemError {
    #[error("the internal figures of a cost line mirror its public figures and can't be edited")]
    CostLineLocked,
    #[error("the total of {0} x {1} is too large to represent")]
    Overflow(Decimal, Decimal), // quantity, price
    #[error("the profit of {0} less {1} is too large to represent")]
    ProfitOverflow(Decimal, Decimal), // total, internal total
}

/// The shape a budget item is persisted in.
///
/// The store has no column for the cost flag, so it travels inside `notes`. See
/// [`crate::encode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetItemRecord {
    pub description: String,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub internal_quantity: Decimal,
    pub internal_price_per_unit: Decimal,
    pub total_price: Decimal,
    pub internal_total_price: Decimal,
    pub profit: Decimal,
    #[serde(default)]
    pub notes: String,
}

impl BudgetItem {
    /// Creates a billable line. The internal figures start out equal to the public
    /// ones and can be edited independently afterwards.
    pub fn new<S: Into<String>>(
        description: S,
        quantity: Decimal,
        price_per_unit: Decimal,
    ) -> Result<Self, ItemError> {
        let mut item = BudgetItem {
            description: description.into(),
            quantity,
            price_per_unit,
            internal_quantity: quantity,
            internal_price_per_unit: price_per_unit,
            notes: String::new(),
            is_cost: false,
            total_price: Decimal::ZERO,
            internal_total_price: Decimal::ZERO,
            profit: Decimal::ZERO,
        };
        item.recompute()?;
        Ok(item)
    }

    /// Creates a cost line
    pub fn cost<S: Into<String>>(
        description: S,
        quantity: Decimal,
        price_per_unit: Decimal,
    ) -> Result<Self, ItemError> {
        let mut item = Self::new(description, quantity, price_per_unit)?;
        item.is_cost = true;
        Ok(item)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn price_per_unit(&self) -> Decimal {
        self.price_per_unit
    }

    pub fn internal_quantity(&self) -> Decimal {
        self.internal_quantity
    }

    pub fn internal_price_per_unit(&self) -> Decimal {
        self.internal_price_per_unit
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn is_cost(&self) -> bool {
        self.is_cost
    }

    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    pub fn internal_total_price(&self) -> Decimal {
        self.internal_total_price
    }

    pub fn profit(&self) -> Decimal {
        self.profit
    }

    /// Profit as a percentage of the client price. There is no margin on a line that
    /// isn't charged for.
    pub fn margin(&self) -> Option<Decimal> {
        margin(self.profit, self.total_price)
    }

    pub fn set_description<S: Into<String>>(&mut self, description: S) {
        self.description = description.into();
    }

    pub fn set_quantity(&mut self, quantity: Decimal) -> Result<(), ItemError> {
        self.apply(ItemEdit::Quantity(quantity))
    }

    pub fn set_price_per_unit(&mut self, price: Decimal) -> Result<(), ItemError> {
        self.apply(ItemEdit::PricePerUnit(price))
    }

    pub fn set_internal_quantity(&mut self, quantity: Decimal) -> Result<(), ItemError> {
        self.apply(ItemEdit::InternalQuantity(quantity))
    }

    pub fn set_internal_price_per_unit(&mut self, price: Decimal) -> Result<(), ItemError> {
        self.apply(ItemEdit::InternalPricePerUnit(price))
    }

    pub fn set_notes<S: Into<String>>(&mut self, notes: S) {
        self.notes = notes.into();
    }

    /// Flags or unflags this item as a cost line.
    ///
    /// Flagging copies the public figures over the internal ones. Unflagging leaves
    /// the internal figures where they were.
    pub fn set_cost(&mut self, is_cost: bool) -> Result<(), ItemError> {
        self.apply(ItemEdit::Cost(is_cost))
    }

    /// Applies a single edit and recomputes every derived value. If the edit fails,
    /// the item is left as it was.
    pub fn apply(&mut self, edit: ItemEdit) -> Result<(), ItemError> {
        let mut next = self.clone();

        match edit {
            ItemEdit::Description(d) => next.description = d,
            ItemEdit::Quantity(q) => next.quantity = q,
            ItemEdit::PricePerUnit(p) => next.price_per_unit = p,
            ItemEdit::InternalQuantity(_) | ItemEdit::InternalPricePerUnit(_) if next.is_cost => {
                return Err(ItemError::CostLineLocked);
            }
            ItemEdit::InternalQuantity(q) => next.internal_quantity = q,
            ItemEdit::InternalPricePerUnit(p) => next.internal_price_per_unit = p,
            ItemEdit::Notes(n) => next.notes = n,
            ItemEdit::Cost(c) => next.is_cost = c,
        }

        next.recompute()?;
        *self = next;
        Ok(())
    }

    fn recompute(&mut self) -> Result<(), ItemError> {
        if self.is_cost {
            self.internal_quantity = self.quantity;
            self.internal_price_per_unit = self.price_per_unit;
        }

        self.total_price = product(self.quantity, self.price_per_unit)?;
        self.internal_total_price =
            product(self.internal_quantity, self.internal_price_per_unit)?;
        self.profit = self
            .total_price
            .checked_sub(self.internal_total_price)
            .ok_or(ItemError::ProfitOverflow(
                self.total_price,
                self.internal_total_price,
            ))?;

        trace!(
            "recomputed '{}': total {}, internal {}, profit {}",
            self.description,
            self.total_price,
            self.internal_total_price,
            self.profit
        );

        Ok(())
    }

    /// Converts this item into its persisted shape, packing the cost flag into the
    /// notes.
    pub fn to_record(&self) -> BudgetItemRecord {
        BudgetItemRecord {
            description: self.description.clone(),
            quantity: self.quantity,
            price_per_unit: self.price_per_unit,
            internal_quantity: self.internal_quantity,
            internal_price_per_unit: self.internal_price_per_unit,
            total_price: self.total_price,
            internal_total_price: self.internal_total_price,
            profit: self.profit,
            notes: notes::encode(&self.notes, self.is_cost),
        }
    }

    /// Rebuilds an item from its persisted shape. Stored totals are ignored and
    /// recomputed, and a cost line has its internal figures re-mirrored.
    pub fn from_record(record: BudgetItemRecord) -> Result<Self, ItemError> {
        let decoded = notes::decode(&record.notes);

        let mut item = BudgetItem {
            description: record.description,
            quantity: record.quantity,
            price_per_unit: record.price_per_unit,
            internal_quantity: record.internal_quantity,
            internal_price_per_unit: record.internal_price_per_unit,
            notes: decoded.notes,
            is_cost: decoded.is_cost,
            total_price: Decimal::ZERO,
            internal_total_price: Decimal::ZERO,
            profit: Decimal::ZERO,
        };
        item.recompute()?;
        Ok(item)
    }
}

fn product(quantity: Decimal, price: Decimal) -> Result<Decimal, ItemError> {
    quantity
        .checked_mul(price)
        .ok_or(ItemError::Overflow(quantity, price))
}

pub(crate) fn margin(profit: Decimal, total: Decimal) -> Option<Decimal> {
    if total.is_zero() {
        return None;
    }

    profit.checked_div(total)?.checked_mul(PERCENT)
}
