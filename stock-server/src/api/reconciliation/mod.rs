//! Reconciliation API
//!
//! Operators list and resolve reconciliation issues. Requires `reconciliation:manage`.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::permissions::RECONCILIATION_MANAGE;
use crate::auth::require_permission;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/reconciliation", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/issues", get(handler::list))
        .route("/issues/{id}/resolve", post(handler::resolve))
        .layer(middleware::from_fn(require_permission(RECONCILIATION_MANAGE)))
}
