//! Command implementations.

mod cart;

pub use cart::*;
