//! Checkout hand-off.
//!
//! Payment is not handled here. Checkout only snapshots what the visitor is
//! buying and then applies a [`CheckoutPolicy`] to the cart. Whether a cart
//! should survive checkout is a deployment decision, so it is a flag rather
//! than built-in behavior.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use crate::repository::CartRepository;
use crate::store::CartStore;

/// What checkout does to the cart afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckoutPolicy {
    /// Leave the cart untouched.
    #[default]
    KeepCart,
    /// Empty the cart once checkout has been handed off.
    ClearCart,
}

/// Error returned for an unknown policy name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown checkout policy {0:?} (expected \"keep\" or \"clear\")")]
pub struct UnknownPolicy(pub String);

impl FromStr for CheckoutPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep-cart" | "keep_cart" => Ok(Self::KeepCart),
            "clear" | "clear-cart" | "clear_cart" => Ok(Self::ClearCart),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for CheckoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::KeepCart => "keep",
            Self::ClearCart => "clear",
        })
    }
}

/// Result of a checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutSummary {
    /// Nothing to check out.
    EmptyCart,
    /// Checkout was handed off with this cart.
    Proceeded {
        /// Sum of quantities at hand-off.
        item_count: u64,
        /// Exact total at hand-off.
        total: Decimal,
        /// Whether the cart was emptied afterwards.
        cleared: bool,
        /// Whether clearing reached the store (always true when not cleared).
        persisted: bool,
    },
}

/// Hand the current cart off to checkout and apply `policy`.
#[instrument(skip(repo))]
pub fn checkout<S: CartStore>(repo: &CartRepository<S>, policy: CheckoutPolicy) -> CheckoutSummary {
    let cart = repo.snapshot();
    if cart.is_empty() {
        return CheckoutSummary::EmptyCart;
    }

    let item_count = cart.item_count();
    let total = cart.total();
    tracing::info!(item_count, %total, %policy, "Proceeding to checkout");

    let (cleared, persisted) = match policy {
        CheckoutPolicy::KeepCart => (false, true),
        CheckoutPolicy::ClearCart => {
            let applied = repo.clear();
            (true, applied.is_persisted())
        }
    };

    CheckoutSummary::Proceeded {
        item_count,
        total,
        cleared,
        persisted,
    }
}
