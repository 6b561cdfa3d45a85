//! Cart view binding.
//!
//! [`CartBinding`] mirrors the repository into a render-ready [`CartView`]
//! and turns the cart screen's buttons into repository calls. It never
//! mutates the cart itself: every change goes through the repository, which
//! publishes the new cart; the binding re-renders from that notification.

use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::instrument;

use recipe_box_core::{
    Cart, CurrencyCode, ItemId, LineItem, Price, RemoveOutcome, SetQuantityOutcome,
};

use crate::checkout::{CheckoutPolicy, CheckoutSummary, checkout};
use crate::repository::CartRepository;
use crate::store::{CartStore, StorageError};

/// Cart row display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemView {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    /// False at quantity 1, where the decrement button does nothing.
    pub can_decrement: bool,
}

/// Cart display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u64,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty(currency: CurrencyCode) -> Self {
        Self {
            items: Vec::new(),
            subtotal: format_price(Decimal::ZERO, currency),
            item_count: 0,
        }
    }

    /// Render a cart.
    #[must_use]
    pub fn render(cart: &Cart, currency: CurrencyCode) -> Self {
        Self {
            items: cart
                .items()
                .iter()
                .map(|item| CartItemView::render(item, currency))
                .collect(),
            subtotal: format_price(cart.total(), currency),
            item_count: cart.item_count(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CartItemView {
    fn render(item: &LineItem, currency: CurrencyCode) -> Self {
        Self {
            id: item.id().to_string(),
            name: item.name().to_string(),
            image_url: Some(item.image_ref())
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            quantity: item.quantity(),
            price: format_price(item.unit_price(), currency),
            line_price: format_price(item.line_total(), currency),
            can_decrement: item.quantity() > 1,
        }
    }
}

/// Format an amount for display, rounded to two places.
#[must_use]
pub fn format_price(amount: Decimal, currency: CurrencyCode) -> String {
    Price::new(amount, currency).display()
}

/// Reactive binding between a [`CartRepository`] and the cart screen.
///
/// The view is rendered eagerly on construction, so the first paint
/// already shows the persisted cart.
pub struct CartBinding<S> {
    repo: CartRepository<S>,
    changes: watch::Receiver<Cart>,
    currency: CurrencyCode,
    checkout_policy: CheckoutPolicy,
    view: CartView,
    last_storage_error: Option<StorageError>,
}

impl<S: CartStore> CartBinding<S> {
    /// Bind to `repo` and render its current cart.
    #[must_use]
    pub fn new(repo: CartRepository<S>, currency: CurrencyCode) -> Self {
        let mut changes = repo.subscribe();
        let view = CartView::render(&changes.borrow_and_update(), currency);
        Self {
            repo,
            changes,
            currency,
            checkout_policy: CheckoutPolicy::default(),
            view,
            last_storage_error: None,
        }
    }

    /// Use `policy` for [`Self::checkout`].
    #[must_use]
    pub fn with_checkout_policy(mut self, policy: CheckoutPolicy) -> Self {
        self.checkout_policy = policy;
        self
    }

    /// The current rendering.
    #[must_use]
    pub const fn view(&self) -> &CartView {
        &self.view
    }

    /// The repository this binding dispatches to.
    #[must_use]
    pub const fn repository(&self) -> &CartRepository<S> {
        &self.repo
    }

    /// Persistence failure from the most recent intent, if any.
    ///
    /// Lets the screen warn that changes may not survive a reload.
    #[must_use]
    pub const fn last_storage_error(&self) -> Option<&StorageError> {
        self.last_storage_error.as_ref()
    }

    /// Re-render if the repository published a change since the last render.
    ///
    /// Returns whether the view changed.
    pub fn refresh(&mut self) -> bool {
        if !self.changes.has_changed().unwrap_or(false) {
            return false;
        }
        let cart = self.changes.borrow_and_update();
        let view = CartView::render(&cart, self.currency);
        drop(cart);
        let changed = view != self.view;
        self.view = view;
        changed
    }

    /// "+" button: raise the quantity by one.
    #[instrument(skip(self))]
    pub fn increment(&mut self, id: &ItemId) -> SetQuantityOutcome {
        let Some(current) = self.repo.get(id) else {
            return SetQuantityOutcome::NotFound;
        };
        self.set_quantity(id, i64::from(current.quantity()) + 1)
    }

    /// "-" button: lower the quantity by one.
    ///
    /// At quantity 1 the repository rejects the change and nothing happens;
    /// the item is not removed.
    #[instrument(skip(self))]
    pub fn decrement(&mut self, id: &ItemId) -> SetQuantityOutcome {
        let Some(current) = self.repo.get(id) else {
            return SetQuantityOutcome::NotFound;
        };
        let outcome = self.set_quantity(id, i64::from(current.quantity()) - 1);
        if outcome == SetQuantityOutcome::Rejected {
            tracing::debug!(%id, "Ignoring decrement below 1");
        }
        outcome
    }

    /// Quantity input: set an explicit quantity.
    pub fn set_quantity(&mut self, id: &ItemId, quantity: i64) -> SetQuantityOutcome {
        let (outcome, storage_error) = self.repo.set_quantity(id, quantity).into_parts();
        self.last_storage_error = storage_error;
        self.refresh();
        outcome
    }

    /// "Remove" button.
    #[instrument(skip(self))]
    pub fn remove(&mut self, id: &ItemId) -> RemoveOutcome {
        let (outcome, storage_error) = self.repo.remove(id).into_parts();
        self.last_storage_error = storage_error;
        self.refresh();
        outcome
    }

    /// "Proceed to Checkout" button.
    pub fn checkout(&mut self) -> CheckoutSummary {
        let summary = checkout(&self.repo, self.checkout_policy);
        self.refresh();
        summary
    }
}
