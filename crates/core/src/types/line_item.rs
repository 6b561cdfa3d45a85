//! Line items and the normalized catalog record they are built from.

use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ItemId, ItemIdError};

/// Errors produced when a catalog record cannot become a cart candidate.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidRecord {
    /// The record has no usable identifier.
    #[error("catalog record has no usable id: {0}")]
    MissingId(#[from] ItemIdError),
    /// The record has no display name.
    #[error("catalog record has no name")]
    MissingName,
    /// The record carries a negative price.
    #[error("catalog record has a negative price: {0}")]
    NegativePrice(Decimal),
}

/// A catalog record that is guaranteed to satisfy every cart invariant.
///
/// Only constructible through [`NormalizedCatalogRecord::new`], so the cart
/// never receives a candidate with an empty id or name, or a negative price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCatalogRecord {
    id: ItemId,
    name: String,
    image_ref: String,
    unit_price: Decimal,
}

impl NormalizedCatalogRecord {
    /// Build a normalized record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRecord::MissingName` if the trimmed name is empty and
    /// `InvalidRecord::NegativePrice` if `unit_price` is below zero.
    pub fn new(
        id: ItemId,
        name: &str,
        image_ref: &str,
        unit_price: Decimal,
    ) -> Result<Self, InvalidRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InvalidRecord::MissingName);
        }
        if unit_price < Decimal::ZERO {
            return Err(InvalidRecord::NegativePrice(unit_price));
        }
        Ok(Self {
            id,
            name: name.to_owned(),
            image_ref: image_ref.trim().to_owned(),
            unit_price,
        })
    }

    #[must_use]
    pub const fn id(&self) -> &ItemId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn image_ref(&self) -> &str {
        &self.image_ref
    }

    #[must_use]
    pub const fn unit_price(&self) -> Decimal {
        self.unit_price
    }
}

/// One distinct purchasable entry in the cart.
///
/// Display fields and the price snapshot are fixed when the item is added;
/// only the quantity changes afterwards, and only through [`super::Cart`].
///
/// The serialized shape is `{id, name, imageRef, unitPrice, quantity}`. The
/// older `image` / `price` field names are accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    id: ItemId,
    name: String,
    #[serde(alias = "image")]
    image_ref: String,
    #[serde(alias = "price")]
    unit_price: Decimal,
    quantity: NonZeroU32,
}

impl LineItem {
    /// A fresh line item with quantity 1.
    #[must_use]
    pub fn from_record(record: NormalizedCatalogRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            image_ref: record.image_ref,
            unit_price: record.unit_price,
            quantity: NonZeroU32::MIN,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &ItemId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn image_ref(&self) -> &str {
        &self.image_ref
    }

    #[must_use]
    pub const fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity.get()
    }

    /// `unit_price * quantity` at full precision.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity.get())
    }

    pub(crate) fn set_quantity(&mut self, quantity: NonZeroU32) {
        self.quantity = quantity;
    }
}
