//! Integration tests for the Recipe Box cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p recipe-box-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_scenarios` - End-to-end cart flows through the repository
//! - `cart_persistence` - File-backed storage, corrupt and legacy records
//! - `cart_binding` - The cart screen binding over shared repositories
//!
//! Tests run against a [`FileStore`] in a fresh temporary directory, so they
//! need no setup and never touch a real cart.

use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use tempfile::TempDir;

use recipe_box_cart::CartRepository;
use recipe_box_cart::catalog::Meal;
use recipe_box_cart::store::FileStore;
use recipe_box_core::{ItemId, NormalizedCatalogRecord};

/// Key used for the cart record in every test.
pub const CART_KEY: &str = "cart";

/// A file store in a temporary directory, removed on drop.
pub struct TestContext {
    dir: TempDir,
}

impl TestContext {
    /// Create a context with an empty store directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn store(&self) -> FileStore {
        FileStore::new(self.dir.path())
    }

    /// Open a new session over the store, like a fresh page load.
    #[must_use]
    pub fn open(&self) -> CartRepository<FileStore> {
        CartRepository::open(self.store(), CART_KEY)
    }

    /// Path of the persisted cart record.
    #[must_use]
    pub fn record_path(&self) -> std::path::PathBuf {
        self.dir.path().join(format!("{CART_KEY}.json"))
    }

    /// Overwrite the persisted cart record with raw bytes.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_record(&self, bytes: &[u8]) {
        std::fs::write(self.record_path(), bytes).expect("Failed to write cart record");
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an id known to be valid.
///
/// # Panics
///
/// Panics if `id` is blank.
#[must_use]
pub fn item_id(id: &str) -> ItemId {
    ItemId::parse(id).expect("Invalid test id")
}

/// Parse a decimal known to be valid.
///
/// # Panics
///
/// Panics if `value` is not a decimal.
#[must_use]
pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("Invalid test decimal")
}

/// A cart candidate named after its id.
///
/// # Panics
///
/// Panics if `id` is blank or `price` is not a non-negative decimal.
#[must_use]
pub fn record(id: &str, price: &str) -> NormalizedCatalogRecord {
    NormalizedCatalogRecord::new(
        item_id(id),
        &format!("Meal {id}"),
        &format!("https://www.themealdb.com/images/media/meals/{id}.jpg"),
        dec(price),
    )
    .expect("Invalid test record")
}

/// A catalog meal as returned by the lookup endpoint, without a price.
#[must_use]
pub fn meal(id: &str, name: &str) -> Meal {
    Meal {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        thumbnail: Some(format!(
            "https://www.themealdb.com/images/media/meals/{id}.jpg"
        )),
        category: Some("Chicken".to_string()),
        ..Meal::default()
    }
}
