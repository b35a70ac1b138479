//! Ledger error taxonomy

use crate::db::repository::RepoError;
use crate::utils::{AppError, ErrorCode};
use shared::models::OrderStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Product {product_id} not found")]
    ProductNotFound {
        product_id: i64,
        variant_key: Option<String>,
    },

    #[error("Insufficient inventory for {product_name}: {available} available, {requested} requested")]
    InsufficientInventory {
        product_id: i64,
        variant_key: Option<String>,
        product_name: String,
        available: i64,
        requested: i64,
    },

    #[error("{field} mismatch: expected {expected:.2}, received {received:.2}")]
    AmountMismatch {
        field: &'static str,
        expected: f64,
        received: f64,
    },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Order has no items")]
    EmptyOrder,

    #[error("No inventory record for product {product_id}")]
    RecordNotFound {
        product_id: i64,
        variant_key: Option<String>,
    },

    #[error("Order {0} not found")]
    OrderNotFound(i64),

    #[error("Cannot change order status from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order {0} is already paid")]
    OrderAlreadyPaid(i64),

    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Ledger and order state may have diverged; an operator alert was raised
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Safe to rerun the whole unit of work
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrentModification(_))
    }
}

impl From<RepoError> for LedgerError {
    fn from(err: RepoError) -> Self {
        match err {
            // a unique-key race (record insert, order id, order number) is a lost race, not bad input
            RepoError::Busy(msg) | RepoError::Duplicate(msg) => {
                LedgerError::ConcurrentModification(msg)
            }
            RepoError::Validation(msg) => LedgerError::Validation(msg),
            RepoError::NotFound(msg) | RepoError::Database(msg) => LedgerError::Database(msg),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::from(err).into()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::ProductNotFound {
                product_id,
                variant_key,
            } => AppError::with_message(ErrorCode::ProductNotFound, message)
                .with_detail("productId", product_id)
                .with_detail("variantKey", variant_key),
            LedgerError::InsufficientInventory {
                product_id,
                variant_key,
                product_name,
                available,
                requested,
            } => AppError::with_message(ErrorCode::InsufficientInventory, message)
                .with_detail("productId", product_id)
                .with_detail("variantKey", variant_key)
                .with_detail("productName", product_name)
                .with_detail("available", available)
                .with_detail("requested", requested),
            LedgerError::AmountMismatch {
                field,
                expected,
                received,
            } => AppError::with_message(ErrorCode::AmountMismatch, message)
                .with_detail("field", field)
                .with_detail("expected", expected)
                .with_detail("received", received),
            LedgerError::InvalidQuantity(_) => {
                AppError::with_message(ErrorCode::InvalidQuantity, message)
            }
            LedgerError::EmptyOrder => AppError::with_message(ErrorCode::OrderEmpty, message),
            LedgerError::RecordNotFound {
                product_id,
                variant_key,
            } => AppError::with_message(ErrorCode::InventoryRecordNotFound, message)
                .with_detail("productId", product_id)
                .with_detail("variantKey", variant_key),
            LedgerError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message).with_detail("orderId", id)
            }
            LedgerError::InvalidStatusTransition { from, to } => {
                AppError::with_message(ErrorCode::InvalidStatusTransition, message)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            LedgerError::OrderAlreadyPaid(id) => {
                AppError::with_message(ErrorCode::OrderAlreadyPaid, message)
                    .with_detail("orderId", id)
            }
            LedgerError::InvalidPaymentMethod(_) => {
                AppError::with_message(ErrorCode::PaymentInvalidMethod, message)
            }
            LedgerError::Validation(msg) => AppError::validation(msg),
            LedgerError::ConcurrentModification(_) => AppError::with_message(
                ErrorCode::ConcurrentModification,
                "Stock is being modified concurrently, please retry",
            ),
            LedgerError::Timeout(_) => AppError::with_message(ErrorCode::TimeoutError, message),
            LedgerError::PersistenceFailure(_) => AppError::with_message(
                ErrorCode::PersistenceFailure,
                "Order could not be persisted; the incident was reported for reconciliation",
            ),
            LedgerError::Database(msg) => {
                tracing::error!(error = %msg, "Ledger database error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_inventory_names_product() {
        let err: AppError = LedgerError::InsufficientInventory {
            product_id: 7,
            variant_key: Some("large".into()),
            product_name: "Kraft Box".into(),
            available: 4,
            requested: 10,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientInventory);
        assert!(err.message.contains("Kraft Box"));
        let details = err.details.unwrap();
        assert_eq!(details["productId"], 7);
        assert_eq!(details["variantKey"], "large");
        assert_eq!(details["available"], 4);
        assert_eq!(details["requested"], 10);
    }

    #[test]
    fn test_amount_mismatch_reports_both_values() {
        let err: AppError = LedgerError::AmountMismatch {
            field: "totalAmount",
            expected: 95.0,
            received: 100.0,
        }
        .into();
        assert_eq!(err.code, ErrorCode::AmountMismatch);
        let details = err.details.unwrap();
        assert_eq!(details["expected"], 95.0);
        assert_eq!(details["received"], 100.0);
        assert_eq!(details["field"], "totalAmount");
    }

    #[test]
    fn test_repo_conflicts_are_retryable() {
        let busy: LedgerError = RepoError::Busy("database is locked".into()).into();
        let dup: LedgerError = RepoError::Duplicate("UNIQUE constraint failed".into()).into();
        assert!(busy.is_retryable());
        assert!(dup.is_retryable());
        assert!(!LedgerError::EmptyOrder.is_retryable());
        assert!(!LedgerError::Timeout(5000).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        let err: AppError = LedgerError::ConcurrentModification("x".into()).into();
        assert_eq!(err.http_status(), http::StatusCode::SERVICE_UNAVAILABLE);
        let err: AppError = LedgerError::PersistenceFailure("x".into()).into();
        assert_eq!(err.http_status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        let err: AppError = LedgerError::EmptyOrder.into();
        assert_eq!(err.http_status(), http::StatusCode::BAD_REQUEST);
    }
}
