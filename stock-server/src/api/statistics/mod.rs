//! Statistics API
//!
//! Cross-channel (web + POS) sales statistics. Requires `reports:view`.

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::permissions::REPORTS_VIEW;
use crate::auth::require_permission;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/statistics", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/sales", get(handler::sales))
        .layer(middleware::from_fn(require_permission(REPORTS_VIEW)))
}
