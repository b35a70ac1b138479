//! POS API
//!
//! All routes require `pos:checkout`. The staff id comes from the token.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, put},
};

use crate::auth::permissions::POS_CHECKOUT;
use crate::auth::require_permission;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/pos", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/orders", get(handler::list).post(handler::create))
        .route("/orders/{id}", get(handler::get_by_id))
        .route("/orders/{id}/payment", put(handler::update_payment))
        .layer(middleware::from_fn(require_permission(POS_CHECKOUT)))
}
