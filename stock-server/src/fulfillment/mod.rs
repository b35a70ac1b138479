//! Order fulfillment
//!
//! Web and POS share one stock decrement path:
//!
//! ```text
//! WebOrderService / PosCheckoutProcessor
//!   └─ reprice + amount checks
//!        └─ Coordinator::place_order(draft)
//!             ├─ read-only prevalidation (shortfall returns early, no side effects)
//!             └─ one transaction: sold per line → draft.persist() → commit
//! ```
//!
//! Any failure rolls everything back. A failed rollback or commit is reported to reconciliation.

pub mod coordinator;
pub mod pricing;
pub mod web_orders;

use std::future::Future;

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::inventory::LedgerError;

pub use coordinator::Coordinator;
pub use pricing::{PricedLine, resolve_line};
pub use web_orders::WebOrderService;

/// Order channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Web,
    Pos,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Pos => "pos",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line that decrements stock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: i64,
    pub variant_key: Option<String>,
    pub quantity: i64,
}

/// Channel order draft
///
/// Prices are already recomputed by the channel service. `persist` writes the order in the
/// same transaction as the decrements; `order_id` is the log entries' `reference`.
pub trait OrderDraft: Send + Sync {
    type Output: Send;

    fn channel(&self) -> Channel;

    fn lines(&self) -> &[OrderLine];

    fn persist(
        &self,
        conn: &mut SqliteConnection,
        order_id: i64,
    ) -> impl Future<Output = Result<Self::Output, LedgerError>> + Send;
}
