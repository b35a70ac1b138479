//! Inventory ledger
//!
//! - [`StockMutator`] - the only writer of stock quantities; record, log and catalog mirror in one transaction
//! - [`LedgerError`] - ledger error taxonomy
//! - [`RetryPolicy`] - bounded retry on conflicts plus timeout
//!
//! # Invariants
//!
//! - `is_low_stock == (quantity <= low_stock_threshold)`
//! - replaying log deltas in creation order yields the current quantity
//! - `quantity >= 0`

pub mod error;
pub mod mutator;
pub mod retry;

pub use error::LedgerError;
pub use mutator::{
    MutationOutcome, QuantityChange, StockMutation, StockMutator, apply, normalize_variant_key,
};
pub use retry::RetryPolicy;
