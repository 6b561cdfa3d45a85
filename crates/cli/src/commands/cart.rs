//! Cart commands.
//!
//! Every command opens the configured cart, dispatches one intent through
//! the [`CartBinding`] the cart screen uses, and prints the result.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use thiserror::Error;

use recipe_box_cart::catalog::{Meal, MealsEnvelope, add_to_cart};
use recipe_box_cart::store::{FileStore, StorageError};
use recipe_box_cart::{
    CartBinding, CartConfig, CartError, CartRepository, CartView, CheckoutPolicy, CheckoutSummary,
};
use recipe_box_core::{
    AddOutcome, ItemId, ItemIdError, NormalizedCatalogRecord, RemoveOutcome, SetQuantityOutcome,
};

/// Errors that can occur during cart commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Invalid item id: {0}")]
    InvalidId(#[from] ItemIdError),

    #[error("Item {0} is not in the cart")]
    NotInCart(ItemId),

    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),

    #[error("Catalog response contains no meals")]
    NoMeal,
}

impl From<recipe_box_core::InvalidRecord> for CommandError {
    fn from(e: recipe_box_core::InvalidRecord) -> Self {
        Self::Cart(e.into())
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(e: serde_json::Error) -> Self {
        Self::Cart(e.into())
    }
}

impl From<io::Error> for CommandError {
    fn from(e: io::Error) -> Self {
        Self::Cart(e.into())
    }
}

/// The configured cart, opened over the file store.
pub struct Context {
    config: CartConfig,
    binding: CartBinding<FileStore>,
}

impl Context {
    /// Load configuration and open the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment configuration is invalid.
    pub fn load(store_dir: Option<PathBuf>) -> Result<Self, CommandError> {
        let mut config = CartConfig::from_env().map_err(CartError::from)?;
        if let Some(dir) = store_dir {
            config.store_dir = dir;
        }
        tracing::debug!(store_dir = %config.store_dir.display(), key = %config.cart_key, "Opening cart");

        let repo = CartRepository::open(FileStore::new(&config.store_dir), config.cart_key.clone());
        let binding =
            CartBinding::new(repo, config.currency).with_checkout_policy(config.checkout_policy);
        Ok(Self { config, binding })
    }

    fn repository(&self) -> &CartRepository<FileStore> {
        self.binding.repository()
    }
}

/// Print the cart.
///
/// # Errors
///
/// Returns an error if the cart cannot be serialized.
pub fn list(ctx: &Context, json: bool) -> Result<(), CommandError> {
    if json {
        let body = serde_json::to_string_pretty(&ctx.repository().get_all())?;
        #[allow(clippy::print_stdout)]
        {
            println!("{body}");
        }
        return Ok(());
    }
    print_view(ctx.binding.view());
    Ok(())
}

/// Add an item from command-line fields.
///
/// # Errors
///
/// Returns an error if the fields do not form a valid catalog record.
pub fn add(
    ctx: &Context,
    id: &str,
    name: &str,
    image: &str,
    price: Option<Decimal>,
) -> Result<(), CommandError> {
    let record = NormalizedCatalogRecord::new(
        ItemId::parse(id)?,
        name,
        image,
        price.unwrap_or(ctx.config.default_price),
    )?;
    let (outcome, storage_error) = ctx.repository().add(record).into_parts();
    report_add(outcome, id);
    warn_unsaved(storage_error.as_ref());
    Ok(())
}

/// Add a meal from catalog JSON read from `path` (`-` reads stdin).
///
/// Accepts either a lookup response (`{"meals": [...]}`, first meal used)
/// or a bare meal object.
///
/// # Errors
///
/// Returns an error if the input cannot be read or parsed, holds no meal,
/// or the meal has no usable id or name.
pub fn add_json(ctx: &Context, path: &Path) -> Result<(), CommandError> {
    let input = read_input(path)?;
    let meal = parse_meal(&input)?;

    let applied = add_to_cart(ctx.repository(), &meal, ctx.config.default_price)?;
    let (outcome, storage_error) = applied.into_parts();
    report_add(outcome, meal.id.as_deref().unwrap_or_default());
    warn_unsaved(storage_error.as_ref());
    Ok(())
}

/// Raise an item's quantity by one.
///
/// # Errors
///
/// Returns an error if the id is invalid or not in the cart.
pub fn increment(ctx: &mut Context, id: &str) -> Result<(), CommandError> {
    let id = ItemId::parse(id)?;
    let outcome = ctx.binding.increment(&id);
    finish_quantity_change(ctx, id, outcome, None)
}

/// Lower an item's quantity by one. At quantity 1 nothing happens.
///
/// # Errors
///
/// Returns an error if the id is invalid or not in the cart.
pub fn decrement(ctx: &mut Context, id: &str) -> Result<(), CommandError> {
    let id = ItemId::parse(id)?;
    match ctx.binding.decrement(&id) {
        SetQuantityOutcome::Rejected => {
            #[allow(clippy::print_stdout)]
            {
                println!("{id} is already at quantity 1");
            }
            Ok(())
        }
        outcome => finish_quantity_change(ctx, id, outcome, None),
    }
}

/// Set an item's quantity.
///
/// # Errors
///
/// Returns an error if the id is invalid or not in the cart, or the
/// quantity is below 1.
pub fn set_quantity(ctx: &mut Context, id: &str, quantity: i64) -> Result<(), CommandError> {
    let id = ItemId::parse(id)?;
    let outcome = ctx.binding.set_quantity(&id, quantity);
    finish_quantity_change(ctx, id, outcome, Some(quantity))
}

/// Remove an item.
///
/// # Errors
///
/// Returns an error if the id is invalid or not in the cart.
pub fn remove(ctx: &mut Context, id: &str) -> Result<(), CommandError> {
    let id = ItemId::parse(id)?;
    match ctx.binding.remove(&id) {
        RemoveOutcome::Removed => {
            #[allow(clippy::print_stdout)]
            {
                println!("Removed {id}");
            }
            warn_unsaved(ctx.binding.last_storage_error());
            Ok(())
        }
        RemoveOutcome::NotFound => Err(CommandError::NotInCart(id)),
    }
}

/// Print the cart total.
pub fn total(ctx: &Context) {
    let view = ctx.binding.view();
    #[allow(clippy::print_stdout)]
    {
        println!("{} ({} items)", view.subtotal, view.item_count);
    }
}

/// Remove every item.
pub fn clear(ctx: &Context) {
    let (removed, storage_error) = ctx.repository().clear().into_parts();
    #[allow(clippy::print_stdout)]
    {
        println!("Removed {removed} items");
    }
    warn_unsaved(storage_error.as_ref());
}

/// Hand the cart off to checkout.
#[allow(clippy::print_stdout)]
pub fn checkout(ctx: &mut Context, policy: Option<CheckoutPolicy>) {
    if let Some(policy) = policy {
        ctx.binding = CartBinding::new(ctx.repository().clone(), ctx.config.currency)
            .with_checkout_policy(policy);
    }

    match ctx.binding.checkout() {
        CheckoutSummary::EmptyCart => println!("Cart is empty, nothing to check out"),
        CheckoutSummary::Proceeded {
            item_count,
            total,
            cleared,
            persisted,
        } => {
            println!(
                "Checking out {item_count} items, total {}",
                recipe_box_cart::view::format_price(total, ctx.config.currency)
            );
            if cleared {
                println!("Cart cleared");
            }
            if !persisted {
                tracing::warn!("Cleared cart was not saved");
            }
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn read_input(path: &Path) -> Result<String, CommandError> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        return Ok(input);
    }
    Ok(fs::read_to_string(path)?)
}

/// Parse a lookup response or a single meal object.
fn parse_meal(input: &str) -> Result<Meal, CommandError> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    if value.get("meals").is_some() {
        let envelope: MealsEnvelope<Meal> = serde_json::from_value(value)?;
        return envelope.into_first().ok_or(CommandError::NoMeal);
    }
    Ok(serde_json::from_value(value)?)
}

fn finish_quantity_change(
    ctx: &Context,
    id: ItemId,
    outcome: SetQuantityOutcome,
    requested: Option<i64>,
) -> Result<(), CommandError> {
    match outcome {
        SetQuantityOutcome::Updated => {
            let quantity = ctx.repository().get(&id).map_or(0, |item| item.quantity());
            #[allow(clippy::print_stdout)]
            {
                println!("{id} x{quantity}");
            }
            warn_unsaved(ctx.binding.last_storage_error());
            Ok(())
        }
        SetQuantityOutcome::NotFound => Err(CommandError::NotInCart(id)),
        SetQuantityOutcome::Rejected => Err(CommandError::InvalidQuantity(requested.unwrap_or(0))),
    }
}

#[allow(clippy::print_stdout)]
fn report_add(outcome: AddOutcome, id: &str) {
    match outcome {
        AddOutcome::Added => println!("Added {id}"),
        AddOutcome::AlreadyPresent => println!("{id} is already in the cart"),
    }
}

fn warn_unsaved(error: Option<&StorageError>) {
    if let Some(e) = error {
        tracing::warn!(error = %e, "Change applied but not saved");
        #[allow(clippy::print_stderr)]
        {
            eprintln!("warning: change may not survive a restart ({e})");
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_view(view: &CartView) {
    if view.is_empty() {
        println!("Cart is empty");
        return;
    }
    for item in &view.items {
        println!(
            "{:<12} {:<40} {:>4} x {:>9} = {:>10}",
            item.id, item.name, item.quantity, item.price, item.line_price
        );
    }
    println!("{} items, subtotal {}", view.item_count, view.subtotal);
}
