//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `RECIPE_BOX_STORE_DIR` - Directory for the file-backed store (default: .recipe-box)
//! - `RECIPE_BOX_CART_KEY` - Key of the persisted cart record (default: cart)
//! - `RECIPE_BOX_DEFAULT_PRICE` - Unit price for catalog items without one (default: 9.99)
//! - `RECIPE_BOX_CURRENCY` - ISO 4217 display currency (default: USD)
//! - `RECIPE_BOX_CHECKOUT_POLICY` - `keep` or `clear` the cart after checkout (default: keep)

use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use recipe_box_core::{CurrencyCode, DEFAULT_UNIT_PRICE};

use crate::checkout::CheckoutPolicy;

const DEFAULT_STORE_DIR: &str = ".recipe-box";
const DEFAULT_CART_KEY: &str = "cart";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Directory holding the persisted cart
    pub store_dir: PathBuf,
    /// Namespaced key of the cart record
    pub cart_key: String,
    /// Price snapshot for catalog records without a price
    pub default_price: Decimal,
    /// Currency used when formatting prices
    pub currency: CurrencyCode,
    /// What checkout does to the cart
    pub checkout_policy: CheckoutPolicy,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            cart_key: DEFAULT_CART_KEY.to_string(),
            default_price: DEFAULT_UNIT_PRICE,
            currency: CurrencyCode::default(),
            checkout_policy: CheckoutPolicy::default(),
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparsable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let store_dir = lookup("RECIPE_BOX_STORE_DIR")
            .map_or(defaults.store_dir, PathBuf::from);
        let cart_key = match lookup("RECIPE_BOX_CART_KEY") {
            Some(key) if key.trim().is_empty() => {
                return Err(invalid("RECIPE_BOX_CART_KEY", "must not be empty"));
            }
            Some(key) => key.trim().to_string(),
            None => defaults.cart_key,
        };
        let default_price = lookup("RECIPE_BOX_DEFAULT_PRICE")
            .map(|value| parse_price("RECIPE_BOX_DEFAULT_PRICE", &value))
            .transpose()?
            .unwrap_or(defaults.default_price);
        let currency = lookup("RECIPE_BOX_CURRENCY")
            .map(|value| {
                CurrencyCode::from_str(&value)
                    .map_err(|e| invalid("RECIPE_BOX_CURRENCY", &e.to_string()))
            })
            .transpose()?
            .unwrap_or(defaults.currency);
        let checkout_policy = lookup("RECIPE_BOX_CHECKOUT_POLICY")
            .map(|value| {
                CheckoutPolicy::from_str(&value)
                    .map_err(|e| invalid("RECIPE_BOX_CHECKOUT_POLICY", &e.to_string()))
            })
            .transpose()?
            .unwrap_or(defaults.checkout_policy);

        Ok(Self {
            store_dir,
            cart_key,
            default_price,
            currency,
            checkout_policy,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), reason.to_string())
}

/// Parse a non-negative decimal price.
fn parse_price(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    let price = Decimal::from_str(value.trim()).map_err(|e| invalid(key, &e.to_string()))?;
    if price < Decimal::ZERO {
        return Err(invalid(key, "must not be negative"));
    }
    Ok(price)
}
