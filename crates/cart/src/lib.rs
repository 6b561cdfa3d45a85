//! Recipe Box cart library.
//!
//! The persisted shopping cart behind the recipe browsing client. Catalog
//! screens are stateless views over the remote recipe catalog; the cart is
//! the only part with state that outlives a screen.
//!
//! # Components
//!
//! - [`store`] - Durable key/value byte storage ([`store::MemoryStore`], [`store::FileStore`])
//! - [`payload`] - Versioned JSON encoding of the stored cart
//! - [`repository`] - [`CartRepository`], the sole owner and mutator of the cart
//! - [`view`] - [`CartBinding`], the cart screen's reactive projection
//! - [`catalog`] - Normalization of catalog meal records into cart candidates
//! - [`checkout`] - Checkout hand-off and the keep/clear policy
//! - [`config`] - Environment configuration
//!
//! # Example
//!
//! ```
//! use recipe_box_cart::catalog::{Meal, add_to_cart};
//! use recipe_box_cart::store::MemoryStore;
//! use recipe_box_cart::{CartBinding, CartRepository};
//! use recipe_box_core::{CurrencyCode, DEFAULT_UNIT_PRICE};
//!
//! let repo = CartRepository::open(MemoryStore::new(), "cart");
//! let meal = Meal {
//!     id: Some("52772".to_string()),
//!     name: Some("Teriyaki Chicken Casserole".to_string()),
//!     ..Meal::default()
//! };
//! let applied = add_to_cart(&repo, &meal, DEFAULT_UNIT_PRICE).unwrap();
//! assert!(applied.is_persisted());
//!
//! let binding = CartBinding::new(repo, CurrencyCode::USD);
//! assert_eq!(binding.view().subtotal, "$9.99");
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod payload;
pub mod repository;
pub mod store;
pub mod view;

pub use checkout::{CheckoutPolicy, CheckoutSummary};
pub use config::CartConfig;
pub use error::{CartError, Result};
pub use repository::{Applied, CartRepository};
pub use view::{CartBinding, CartView};
