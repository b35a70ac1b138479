//! Web Order Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Web order lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// pending → processing → shipped → delivered, and
    /// pending | processing → cancelled
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Shipped)
                | (Self::Shipped, Self::Delivered)
                | (Self::Pending, Self::Cancelled)
                | (Self::Processing, Self::Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Postal address (shipping or billing)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub full_name: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Web order line (price re-derived from the catalog at checkout)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: i64,
    pub variant_key: Option<String>,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
}

/// Web order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    /// Customer account id (from the auth token)
    pub user_id: String,
    #[cfg_attr(feature = "db", sqlx(skip))]
    pub items: Vec<OrderItem>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub shipping_address: Address,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub billing_address: Option<Address>,
    pub payment_method: String,
    pub status: OrderStatus,
    pub is_paid: bool,
    pub paid_at: Option<i64>,
    pub payment_reference: Option<String>,
    pub subtotal: f64,
    pub tax: f64,
    pub shipping_cost: f64,
    pub total_price: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Requested order line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product_id: i64,
    #[serde(default)]
    pub variant_key: Option<String>,
    pub quantity: i64,
    /// Client-side price, informational only
    #[serde(default)]
    pub price: Option<f64>,
}

/// Create web order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemInput>,
    pub shipping_address: Address,
    #[serde(default)]
    pub billing_address: Option<Address>,
    pub payment_method: String,
    pub subtotal: f64,
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub shipping_cost: f64,
    pub total_price: f64,
}

/// Status change payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// Mark paid payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidRequest {
    #[serde(default)]
    pub payment_reference: Option<String>,
}

/// Paginated order list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub page: i64,
    pub pages: i64,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Cancelled));

        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Delivered));
    }

    #[test]
    fn test_create_request_defaults() {
        let json = r#"{
            "items": [{"productId": 1, "quantity": 2}],
            "shippingAddress": {"address": "1 Main St", "city": "Lyon", "postalCode": "69001", "country": "FR"},
            "paymentMethod": "card",
            "subtotal": 20.0,
            "totalPrice": 20.0
        }"#;
        let req: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.items.len(), 1);
        assert!(req.items[0].variant_key.is_none());
        assert_eq!(req.tax, 0.0);
        assert_eq!(req.shipping_cost, 0.0);
        assert!(req.billing_address.is_none());
    }
}
