//! Web Order API
//!
//! Placing an order only needs a login. Listing, status changes and marking paid need `orders:manage`.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::permissions::ORDERS_MANAGE;
use crate::auth::require_permission;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    let checkout_routes = Router::new().route("/", post(handler::create));

    let manage_routes = Router::new()
        .route("/", get(handler::list))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/pay", put(handler::mark_paid))
        .layer(middleware::from_fn(require_permission(ORDERS_MANAGE)));

    checkout_routes.merge(manage_routes)
}
