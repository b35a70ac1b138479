//! Data models
//!
//! Shared between the server and API clients. With the `db` feature the
//! row types also derive `sqlx::FromRow`.

pub mod inventory;
pub mod order;
pub mod pos_order;
pub mod product;
pub mod reconciliation;
pub mod statistics;

pub use inventory::*;
pub use order::*;
pub use pos_order::*;
pub use product::*;
pub use reconciliation::*;
pub use statistics::*;
