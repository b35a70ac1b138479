//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Inventory / product errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 values on the wire so clients in any language can
/// switch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has no line items
    OrderEmpty = 4002,
    /// Client-submitted amounts disagree with the server-side recomputation
    AmountMismatch = 4003,
    /// Requested status change is not allowed from the current status
    InvalidStatusTransition = 4004,
    /// Order has already been paid
    OrderAlreadyPaid = 4005,

    // ==================== 5xxx: Payment ====================
    /// Invalid payment method
    PaymentInvalidMethod = 5001,

    // ==================== 6xxx: Inventory ====================
    /// Product (or variant) does not exist in the catalog
    ProductNotFound = 6001,
    /// Not enough stock to satisfy the request
    InsufficientInventory = 6002,
    /// Quantity is negative, zero where not allowed, or not a number
    InvalidQuantity = 6003,
    /// No inventory record tracked for the product/variant
    InventoryRecordNotFound = 6004,

    // ==================== 9xxx: System ====================
    InternalError = 9001,
    DatabaseError = 9002,
    /// Lock / version conflict that survived the internal retries
    ConcurrentModification = 9003,
    TimeoutError = 9004,
    /// Ledger and order state may have diverged, manual reconciliation needed
    PersistenceFailure = 9005,
    ConfigError = 9006,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Default human-readable message
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Order has no items",
            ErrorCode::AmountMismatch => "Order amounts do not match",
            ErrorCode::InvalidStatusTransition => "Order status change not allowed",
            ErrorCode::OrderAlreadyPaid => "Order has already been paid",

            // Payment
            ErrorCode::PaymentInvalidMethod => "Invalid payment method",

            // Inventory
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::InsufficientInventory => "Insufficient inventory",
            ErrorCode::InvalidQuantity => "Invalid quantity",
            ErrorCode::InventoryRecordNotFound => "Inventory record not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConcurrentModification => {
                "Stock was modified concurrently, please retry"
            }
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::PersistenceFailure => {
                "Order could not be persisted, manual reconciliation required"
            }
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderEmpty),
            4003 => Ok(ErrorCode::AmountMismatch),
            4004 => Ok(ErrorCode::InvalidStatusTransition),
            4005 => Ok(ErrorCode::OrderAlreadyPaid),

            // Payment
            5001 => Ok(ErrorCode::PaymentInvalidMethod),

            // Inventory
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::InsufficientInventory),
            6003 => Ok(ErrorCode::InvalidQuantity),
            6004 => Ok(ErrorCode::InventoryRecordNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConcurrentModification),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::PersistenceFailure),
            9006 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[ErrorCode] = &[
        ErrorCode::Success,
        ErrorCode::Unknown,
        ErrorCode::ValidationFailed,
        ErrorCode::NotFound,
        ErrorCode::AlreadyExists,
        ErrorCode::InvalidRequest,
        ErrorCode::NotAuthenticated,
        ErrorCode::TokenExpired,
        ErrorCode::TokenInvalid,
        ErrorCode::PermissionDenied,
        ErrorCode::OrderNotFound,
        ErrorCode::OrderEmpty,
        ErrorCode::AmountMismatch,
        ErrorCode::InvalidStatusTransition,
        ErrorCode::OrderAlreadyPaid,
        ErrorCode::PaymentInvalidMethod,
        ErrorCode::ProductNotFound,
        ErrorCode::InsufficientInventory,
        ErrorCode::InvalidQuantity,
        ErrorCode::InventoryRecordNotFound,
        ErrorCode::InternalError,
        ErrorCode::DatabaseError,
        ErrorCode::ConcurrentModification,
        ErrorCode::TimeoutError,
        ErrorCode::PersistenceFailure,
        ErrorCode::ConfigError,
    ];

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::AmountMismatch.code(), 4003);
        assert_eq!(ErrorCode::InsufficientInventory.code(), 6002);
        assert_eq!(ErrorCode::ConcurrentModification.code(), 9003);
        assert_eq!(ErrorCode::PersistenceFailure.code(), 9005);
    }

    #[test]
    fn test_every_code_converts_back() {
        for code in ALL {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(*code));
        }
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(6999), Err(InvalidErrorCode(6999)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::InsufficientInventory).unwrap();
        assert_eq!(json, "6002");

        let code: ErrorCode = serde_json::from_str("4003").unwrap();
        assert_eq!(code, ErrorCode::AmountMismatch);

        assert!(serde_json::from_str::<ErrorCode>("12345").is_err());
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::InsufficientInventory.is_success());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::ProductNotFound.to_string(), "6001");
        assert_eq!(InvalidErrorCode(7).to_string(), "invalid error code: 7");
    }
}
