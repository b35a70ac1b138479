//! POS checkout
//!
//! # Responsibilities
//!
//! - unit prices, subtotal and total are recomputed server-side; client amounts are only tolerance-checked
//! - stock goes through [`crate::fulfillment::Coordinator`], the same path as web orders
//! - order numbers are `POS` + YYMMDD + a 4-digit daily counter, allocated inside the order transaction

pub mod checkout;
pub mod numbering;

pub use checkout::PosCheckoutProcessor;
