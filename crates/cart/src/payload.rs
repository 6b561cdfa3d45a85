//! Persisted cart payload.
//!
//! The stored record is a JSON envelope:
//!
//! ```json
//! {
//!   "version": 3,
//!   "writer": "6f1c4b0e-8a4e-4d55-9c57-0b4f6d1f3f5a",
//!   "updatedAt": "2026-10-17T12:00:00Z",
//!   "items": [
//!     {"id": "52772", "name": "Teriyaki Chicken Casserole",
//!      "imageRef": "https://...", "unitPrice": "9.99", "quantity": 2}
//!   ]
//! }
//! ```
//!
//! A bare JSON array of items (the format written by earlier browser builds)
//! decodes as version 0 with no writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use recipe_box_core::{Cart, CartInvariantError, LineItem};

/// Errors decoding a stored payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Not valid JSON, or not shaped like a cart.
    #[error("malformed cart payload: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Well-formed JSON that violates a cart invariant.
    #[error("cart payload violates invariant: {0}")]
    Invariant(#[from] CartInvariantError),
}

/// A decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCart {
    /// Monotonic write counter.
    pub version: u64,
    /// Repository instance that produced the payload.
    pub writer: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
    pub cart: Cart,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeRef<'a> {
    version: u64,
    writer: Uuid,
    updated_at: DateTime<Utc>,
    items: &'a [LineItem],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    version: u64,
    #[serde(default)]
    writer: Option<Uuid>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    items: Vec<LineItem>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnyPayload {
    Envelope(Envelope),
    Legacy(Vec<LineItem>),
}

/// Encode a cart for storage.
///
/// # Errors
///
/// Returns `serde_json::Error` if serialization fails.
pub fn encode(
    cart: &Cart,
    version: u64,
    writer: Uuid,
    updated_at: DateTime<Utc>,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&EnvelopeRef {
        version,
        writer,
        updated_at,
        items: cart.items(),
    })
}

/// Decode and validate a stored payload.
///
/// # Errors
///
/// Returns `PayloadError` for anything that is not a valid cart.
pub fn decode(bytes: &[u8]) -> Result<StoredCart, PayloadError> {
    let stored = match serde_json::from_slice::<AnyPayload>(bytes)? {
        AnyPayload::Envelope(envelope) => StoredCart {
            version: envelope.version,
            writer: envelope.writer,
            updated_at: envelope.updated_at,
            cart: Cart::from_items(envelope.items)?,
        },
        AnyPayload::Legacy(items) => StoredCart {
            version: 0,
            writer: None,
            updated_at: None,
            cart: Cart::from_items(items)?,
        },
    };
    Ok(stored)
}
