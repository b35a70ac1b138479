//! Stock Server - inventory ledger and multi-channel order fulfillment
//!
//! # Architecture
//!
//! - **Inventory ledger** (`inventory`): the only path that changes stock; every change appends one immutable log entry
//! - **Fulfillment** (`fulfillment`): decrements stock and persists the order in one transaction
//! - **POS checkout** (`pos`): in-store orders through the same coordinator
//! - **Sales statistics** (`statistics`): combined web + POS reports
//! - **Reconciliation** (`reconciliation`): alert channel for possible ledger/order divergence
//! - **HTTP API** (`api`): REST endpoints (JWT auth)
//!
//! # Module Structure
//!
//! ```text
//! stock-server/src/
//! ├── core/            # config, state, server
//! ├── auth/            # JWT verification, permissions
//! ├── api/             # HTTP routes and handlers
//! ├── db/              # SQLite pool and repositories
//! ├── inventory/       # Stock Mutator, ledger errors, retry
//! ├── fulfillment/     # coordinator, web orders, pricing
//! ├── pos/             # POS checkout, order numbers
//! ├── statistics/      # sales aggregation
//! ├── reconciliation/  # reconciliation alerts
//! └── utils/           # logging, time, validation
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod fulfillment;
pub mod inventory;
pub mod money;
pub mod pos;
pub mod reconciliation;
pub mod statistics;
pub mod utils;

// Re-export public types
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState, build_app};
pub use inventory::{LedgerError, StockMutator};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::init_logger_with_file;

// Security logging macro - supports tracing format specifiers
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}
