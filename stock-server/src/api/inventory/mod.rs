//! Inventory API
//!
//! | Path | Method | Description |
//! |------|------|------|
//! | /api/inventory | GET | List records (`lowStockOnly`) |
//! | /api/inventory/logs | GET | Query the audit log |
//! | /api/inventory/{product_id} | GET / PUT | Get / manual adjustment |
//! | /api/inventory/{product_id}/stock | POST | Add stock |
//! | /api/inventory/{product_id}/verify | GET | Replay and verify the ledger |
//!
//! All routes require `inventory:manage`. Variants are selected with the `variantKey` query parameter.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::permissions::INVENTORY_MANAGE;
use crate::auth::require_permission;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/inventory", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list))
        .route("/logs", get(handler::query_logs))
        .route("/{product_id}", get(handler::get_record).put(handler::adjust))
        .route("/{product_id}/stock", post(handler::add_stock))
        .route("/{product_id}/verify", get(handler::verify))
        .layer(middleware::from_fn(require_permission(INVENTORY_MANAGE)))
}
