//! Recipe Box Core - Shared cart domain types.
//!
//! This crate provides the types every Recipe Box component agrees on:
//! - `cart` - Cart repository, store adapters, and view binding
//! - `cli` - Command-line driver over a file-backed cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure operations - no I/O, no
//! persistence, no logging. This keeps the cart invariants testable in
//! isolation and usable anywhere.
//!
//! # Modules
//!
//! - [`types`] - Item IDs, prices, line items, and the cart itself

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
