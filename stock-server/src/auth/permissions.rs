//! Permission Definitions
//!
//! Permissions are granted per feature area; the `admin` role holds all of them.
//! Placing a web order only requires a login.

/// Inventory management (view, add stock, adjust, logs, ledger verification)
pub const INVENTORY_MANAGE: &str = "inventory:manage";
/// POS checkout (create, view, update payment status)
pub const POS_CHECKOUT: &str = "pos:checkout";
/// Web order management (view, status changes, mark paid)
pub const ORDERS_MANAGE: &str = "orders:manage";
/// View sales reports
pub const REPORTS_VIEW: &str = "reports:view";
/// Handle reconciliation issues
pub const RECONCILIATION_MANAGE: &str = "reconciliation:manage";

