//! Shared types for the stock ledger
//!
//! Wire and domain types used by the server and by API clients:
//! the unified error system, inventory/order models, statistics
//! response shapes and small utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
