//! Core types for Recipe Box.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod cart;
pub mod id;
pub mod line_item;
pub mod price;

pub use cart::{AddOutcome, Cart, CartInvariantError, RemoveOutcome, SetQuantityOutcome};
pub use id::{ItemId, ItemIdError};
pub use line_item::{InvalidRecord, LineItem, NormalizedCatalogRecord};
pub use price::{CurrencyCode, DEFAULT_UNIT_PRICE, Price, UnknownCurrency};
