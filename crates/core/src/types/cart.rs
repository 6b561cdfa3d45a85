//! The ordered cart and its pure mutation rules.
//!
//! [`Cart`] enforces three invariants on every path that produces one:
//!
//! - at most one [`LineItem`] per [`ItemId`]
//! - every quantity is at least 1
//! - every unit price is at least 0
//!
//! Insertion order is display order. Appending is the only mutation that
//! changes positions; quantity updates and removals keep the relative order
//! of everything else.

use std::num::NonZeroU32;

use rust_decimal::Decimal;

use super::id::ItemId;
use super::line_item::{LineItem, NormalizedCatalogRecord};

/// Errors found when rebuilding a cart from untrusted items.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartInvariantError {
    /// Two entries share the same id.
    #[error("duplicate cart entry for item {0}")]
    DuplicateId(ItemId),
    /// An entry carries a negative price.
    #[error("item {id} has a negative unit price {price}")]
    NegativePrice {
        /// Offending item.
        id: ItemId,
        /// Offending price.
        price: Decimal,
    },
}

/// Result of adding a record to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddOutcome {
    /// A new line item was appended with quantity 1.
    Added,
    /// The id was already in the cart; nothing changed.
    AlreadyPresent,
}

/// Result of setting a line item's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetQuantityOutcome {
    /// The quantity was changed in place.
    Updated,
    /// No line item has that id.
    NotFound,
    /// The requested quantity is below 1 (or out of range); nothing changed.
    Rejected,
}

/// Result of removing a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoveOutcome {
    /// The line item was removed.
    Removed,
    /// No line item has that id.
    NotFound,
}

impl AddOutcome {
    /// Whether the cart changed.
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Added)
    }
}

impl SetQuantityOutcome {
    /// Whether the cart changed.
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Updated)
    }
}

impl RemoveOutcome {
    /// Whether the cart changed.
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Removed)
    }
}

/// The ordered collection of a visitor's line items.
///
/// The empty cart is the zero value.
///
/// ```
/// use rust_decimal::Decimal;
/// use recipe_box_core::{AddOutcome, Cart, ItemId, NormalizedCatalogRecord};
///
/// let mut cart = Cart::default();
/// let record = NormalizedCatalogRecord::new(
///     ItemId::parse("52772").unwrap(),
///     "Teriyaki Chicken Casserole",
///     "https://example.com/thumb.jpg",
///     Decimal::new(999, 2),
/// )
/// .unwrap();
///
/// assert_eq!(cart.add(record.clone()), AddOutcome::Added);
/// assert_eq!(cart.add(record), AddOutcome::AlreadyPresent);
/// assert_eq!(cart.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Rebuild a cart from items of unknown provenance (e.g. decoded storage).
    ///
    /// Quantities are already guaranteed non-zero by [`LineItem`]'s type.
    ///
    /// # Errors
    ///
    /// Returns `CartInvariantError` if an id repeats or a price is negative.
    pub fn from_items(items: Vec<LineItem>) -> Result<Self, CartInvariantError> {
        for (index, item) in items.iter().enumerate() {
            if item.unit_price() < Decimal::ZERO {
                return Err(CartInvariantError::NegativePrice {
                    id: item.id().clone(),
                    price: item.unit_price(),
                });
            }
            if items
                .iter()
                .take(index)
                .any(|earlier| earlier.id() == item.id())
            {
                return Err(CartInvariantError::DuplicateId(item.id().clone()));
            }
        }
        Ok(Self { items })
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Consume the cart, returning its items in insertion order.
    #[must_use]
    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    /// Number of distinct line items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a line item by id.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.get(id).is_some()
    }

    /// Append a record as a new line item unless its id is already present.
    pub fn add(&mut self, record: NormalizedCatalogRecord) -> AddOutcome {
        if self.contains(record.id()) {
            return AddOutcome::AlreadyPresent;
        }
        self.items.push(LineItem::from_record(record));
        AddOutcome::Added
    }

    /// Set the quantity of an existing line item.
    ///
    /// A quantity below 1 is rejected rather than clamped or treated as a
    /// removal.
    pub fn set_quantity(&mut self, id: &ItemId, quantity: i64) -> SetQuantityOutcome {
        let Some(quantity) = u32::try_from(quantity).ok().and_then(NonZeroU32::new) else {
            return SetQuantityOutcome::Rejected;
        };
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                item.set_quantity(quantity);
                SetQuantityOutcome::Updated
            }
            None => SetQuantityOutcome::NotFound,
        }
    }

    /// Remove a line item.
    pub fn remove(&mut self, id: &ItemId) -> RemoveOutcome {
        match self.items.iter().position(|item| item.id() == id) {
            Some(index) => {
                self.items.remove(index);
                RemoveOutcome::Removed
            }
            None => RemoveOutcome::NotFound,
        }
    }

    /// Remove everything, returning how many line items were dropped.
    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        removed
    }

    /// `Σ unit_price × quantity` at full precision.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity())).sum()
    }
}
