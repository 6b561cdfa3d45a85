//! Catalog item identifier.
//!
//! Catalog IDs are opaque strings assigned by the remote recipe catalog
//! (e.g. `"52772"`). The cart uses them as its primary key, so an
//! [`ItemId`] can never be empty.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`ItemId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemIdError {
    /// The input is empty or whitespace only.
    #[error("item id cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("item id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A stable catalog identifier, unique within a cart.
///
/// Surrounding whitespace is trimmed on parse.
///
/// ## Examples
///
/// ```
/// use recipe_box_core::ItemId;
///
/// assert!(ItemId::parse("52772").is_ok());
/// assert_eq!(ItemId::parse(" 52772 ").unwrap().as_str(), "52772");
///
/// assert!(ItemId::parse("").is_err());
/// assert!(ItemId::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Maximum length of an item id.
    pub const MAX_LENGTH: usize = 128;

    /// Parse an `ItemId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty or longer than
    /// [`Self::MAX_LENGTH`].
    pub fn parse(s: &str) -> Result<Self, ItemIdError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ItemIdError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(ItemIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ItemId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = ItemIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ItemId {
    type Error = ItemIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
