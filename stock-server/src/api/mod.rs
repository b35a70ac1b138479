//! API routes
//!
//! # Structure
//!
//! - [`health`] - health check
//! - [`inventory`] - inventory ledger
//! - [`orders`] - web orders
//! - [`pos`] - POS checkout
//! - [`statistics`] - cross-channel sales statistics
//! - [`reconciliation`] - reconciliation issue handling

pub mod health;
pub mod inventory;
pub mod orders;
pub mod pos;
pub mod reconciliation;
pub mod statistics;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};

use crate::core::ServerState;
use crate::utils::{AppError, ErrorCode};

pub use crate::utils::AppResult;

/// Default page size
pub const DEFAULT_PAGE_SIZE: i64 = 20;
/// Maximum page size
pub const MAX_PAGE_SIZE: i64 = 100;

/// Register all routes (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        // Health API - public route
        .merge(health::router())
        // Inventory API - inventory:manage
        .merge(inventory::router())
        // Web orders - authenticated / orders:manage
        .merge(orders::router())
        // POS - pos:checkout
        .merge(pos::router())
        // Statistics - reports:view
        .merge(statistics::router())
        // Reconciliation - reconciliation:manage
        .merge(reconciliation::router())
}

/// Normalize pagination: page >= 1, 1 <= limit <= 100
pub fn pagination(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

/// JSON body extractor
///
/// Same as `axum::Json`, but a rejected body becomes the unified [`AppError`] response.
/// Bad quantities map to `InvalidQuantity`, bad payment methods to `PaymentInvalidMethod`.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection_to_error(&rejection)),
        }
    }
}

fn json_rejection_to_error(rejection: &JsonRejection) -> AppError {
    let text = rejection.body_text();
    let code = if text.contains("quantity") {
        ErrorCode::InvalidQuantity
    } else if text.contains("paymentMethod") || text.contains("payment_method") {
        ErrorCode::PaymentInvalidMethod
    } else {
        ErrorCode::InvalidRequest
    };
    AppError::with_message(code, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_bounds() {
        assert_eq!(pagination(None, None), (1, 20));
        assert_eq!(pagination(Some(0), Some(500)), (1, 100));
        assert_eq!(pagination(Some(3), Some(0)), (3, 1));
    }
}
