//! Web checkout and order lifecycle

use rust_decimal::Decimal;
use shared::models::{
    Address, CreateOrderRequest, Order, OrderItem, OrderPage, OrderStatus, PlacedOrder,
};
use sqlx::SqliteConnection;

use super::{Channel, Coordinator, OrderDraft, OrderLine, resolve_line};
use crate::db::repository::order;
use crate::inventory::{LedgerError, normalize_variant_key};
use crate::money::{self, line_total, to_decimal, to_f64, within_tolerance};
use crate::utils::validation::{MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_SHORT_TEXT_LEN};

struct WebOrderDraft {
    user_id: String,
    lines: Vec<OrderLine>,
    items: Vec<OrderItem>,
    shipping_address: Address,
    billing_address: Option<Address>,
    payment_method: String,
    subtotal: f64,
    tax: f64,
    shipping_cost: f64,
    total_price: f64,
}

impl OrderDraft for WebOrderDraft {
    type Output = Order;

    fn channel(&self) -> Channel {
        Channel::Web
    }

    fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    async fn persist(
        &self,
        conn: &mut SqliteConnection,
        order_id: i64,
    ) -> Result<Order, LedgerError> {
        let now = shared::util::now_millis();
        let order = Order {
            id: order_id,
            user_id: self.user_id.clone(),
            items: self.items.clone(),
            shipping_address: self.shipping_address.clone(),
            billing_address: self.billing_address.clone(),
            payment_method: self.payment_method.clone(),
            status: OrderStatus::Pending,
            is_paid: false,
            paid_at: None,
            payment_reference: None,
            subtotal: self.subtotal,
            tax: self.tax,
            shipping_cost: self.shipping_cost,
            total_price: self.total_price,
            created_at: now,
            updated_at: now,
        };
        order::insert(conn, &order).await?;
        Ok(order)
    }
}

fn validate_address(address: &Address, field: &str) -> Result<(), LedgerError> {
    let required = [
        ("address", &address.address),
        ("city", &address.city),
        ("postalCode", &address.postal_code),
        ("country", &address.country),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(LedgerError::Validation(format!("{field}.{name} must not be empty")));
        }
        if value.len() > MAX_ADDRESS_LEN {
            return Err(LedgerError::Validation(format!("{field}.{name} is too long")));
        }
    }
    for value in [&address.full_name, &address.phone].into_iter().flatten() {
        if value.len() > MAX_NAME_LEN {
            return Err(LedgerError::Validation(format!("{field} contains a value that is too long")));
        }
    }
    Ok(())
}

fn validate_amount(value: f64, field: &str) -> Result<(), LedgerError> {
    if !money::is_valid_amount(value) {
        return Err(LedgerError::Validation(format!(
            "{field} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

/// Web order service: checkout through the coordinator plus status/payment changes
#[derive(Debug, Clone)]
pub struct WebOrderService {
    coordinator: Coordinator,
}

impl WebOrderService {
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }

    /// Checkout: re-derive prices, check claimed totals, place the order
    pub async fn create(
        &self,
        req: CreateOrderRequest,
        user_id: &str,
    ) -> Result<PlacedOrder<Order>, LedgerError> {
        if req.items.is_empty() {
            return Err(LedgerError::EmptyOrder);
        }
        if req.payment_method.trim().is_empty() {
            return Err(LedgerError::InvalidPaymentMethod(
                "paymentMethod must not be empty".into(),
            ));
        }
        if req.payment_method.len() > MAX_NAME_LEN {
            return Err(LedgerError::InvalidPaymentMethod(
                "paymentMethod is too long".into(),
            ));
        }
        validate_address(&req.shipping_address, "shippingAddress")?;
        if let Some(billing) = &req.billing_address {
            validate_address(billing, "billingAddress")?;
        }
        validate_amount(req.subtotal, "subtotal")?;
        validate_amount(req.tax, "tax")?;
        validate_amount(req.shipping_cost, "shippingCost")?;
        validate_amount(req.total_price, "totalPrice")?;

        let mut lines = Vec::with_capacity(req.items.len());
        let mut items = Vec::with_capacity(req.items.len());
        let mut subtotal = Decimal::ZERO;
        {
            let mut conn = self.coordinator.pool().acquire().await?;
            for input in req.items {
                if input.quantity <= 0 {
                    return Err(LedgerError::InvalidQuantity(format!(
                        "quantity for product {} must be positive, got {}",
                        input.product_id, input.quantity
                    )));
                }
                let variant_key = normalize_variant_key(input.variant_key);
                if variant_key.as_ref().is_some_and(|k| k.len() > MAX_SHORT_TEXT_LEN) {
                    return Err(LedgerError::Validation("variantKey is too long".into()));
                }
                let priced =
                    resolve_line(&mut *conn, input.product_id, variant_key.as_deref()).await?;
                subtotal += line_total(priced.unit_price, input.quantity);
                lines.push(OrderLine {
                    product_id: input.product_id,
                    variant_key: variant_key.clone(),
                    quantity: input.quantity,
                });
                items.push(OrderItem {
                    product_id: input.product_id,
                    variant_key,
                    name: priced.name,
                    quantity: input.quantity,
                    price: priced.unit_price,
                });
            }
        }

        if !within_tolerance(subtotal, req.subtotal) {
            return Err(LedgerError::AmountMismatch {
                field: "subtotal",
                expected: to_f64(subtotal),
                received: req.subtotal,
            });
        }
        let total = subtotal + to_decimal(req.tax) + to_decimal(req.shipping_cost);
        if !within_tolerance(total, req.total_price) {
            return Err(LedgerError::AmountMismatch {
                field: "totalPrice",
                expected: to_f64(total),
                received: req.total_price,
            });
        }

        let draft = WebOrderDraft {
            user_id: user_id.to_string(),
            lines,
            items,
            shipping_address: req.shipping_address,
            billing_address: req.billing_address,
            payment_method: req.payment_method.trim().to_string(),
            subtotal: to_f64(subtotal),
            tax: to_f64(to_decimal(req.tax)),
            shipping_cost: to_f64(to_decimal(req.shipping_cost)),
            total_price: to_f64(total),
        };
        self.coordinator.place_order(&draft, Some(user_id)).await
    }

    pub async fn get(&self, id: i64) -> Result<Order, LedgerError> {
        let mut conn = self.coordinator.pool().acquire().await?;
        order::find_by_id(&mut conn, id)
            .await?
            .ok_or(LedgerError::OrderNotFound(id))
    }

    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<OrderPage, LedgerError> {
        Ok(order::list(self.coordinator.pool(), status, None, page, limit).await?)
    }

    /// Move the order along its lifecycle; cancelling puts every line back in stock
    pub async fn update_status(
        &self,
        id: i64,
        status: OrderStatus,
        actor: Option<&str>,
    ) -> Result<Order, LedgerError> {
        let coordinator = &self.coordinator;
        coordinator
            .retry()
            .run("update_order_status", || async move {
                let mut tx = coordinator.pool().begin().await?;
                let mut current = order::find_by_id(&mut tx, id)
                    .await?
                    .ok_or(LedgerError::OrderNotFound(id))?;
                if !current.status.can_transition_to(status) {
                    return Err(LedgerError::InvalidStatusTransition {
                        from: current.status,
                        to: status,
                    });
                }

                let reference = id.to_string();
                let outcomes = if status == OrderStatus::Cancelled {
                    let lines: Vec<OrderLine> = current
                        .items
                        .iter()
                        .map(|item| OrderLine {
                            product_id: item.product_id,
                            variant_key: item.variant_key.clone(),
                            quantity: item.quantity,
                        })
                        .collect();
                    coordinator
                        .return_lines(&mut tx, &lines, &reference, actor, "order cancelled")
                        .await?
                } else {
                    Vec::new()
                };

                let now = shared::util::now_millis();
                order::update_status(&mut tx, id, status, now).await?;
                coordinator
                    .commit_or_escalate(tx, Channel::Web, &reference, &outcomes)
                    .await?;

                tracing::info!(
                    order_id = id,
                    from = %current.status,
                    to = %status,
                    restocked_lines = outcomes.len(),
                    "Order status updated"
                );
                current.status = status;
                current.updated_at = now;
                Ok(current)
            })
            .await
    }

    pub async fn mark_paid(
        &self,
        id: i64,
        payment_reference: Option<String>,
    ) -> Result<Order, LedgerError> {
        if payment_reference
            .as_ref()
            .is_some_and(|r| r.len() > MAX_SHORT_TEXT_LEN)
        {
            return Err(LedgerError::Validation("paymentReference is too long".into()));
        }
        let mut tx = self.coordinator.pool().begin().await?;
        let mut current = order::find_by_id(&mut tx, id)
            .await?
            .ok_or(LedgerError::OrderNotFound(id))?;
        if current.is_paid {
            return Err(LedgerError::OrderAlreadyPaid(id));
        }
        if current.status == OrderStatus::Cancelled {
            return Err(LedgerError::Validation(format!(
                "order {id} is cancelled and cannot be paid"
            )));
        }
        let now = shared::util::now_millis();
        if !order::mark_paid(&mut tx, id, payment_reference.as_deref(), now).await? {
            return Err(LedgerError::OrderAlreadyPaid(id));
        }
        tx.commit().await?;

        tracing::info!(order_id = id, "Order marked as paid");
        current.is_paid = true;
        current.paid_at = Some(now);
        current.payment_reference = payment_reference;
        current.updated_at = now;
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::catalog;
    use crate::inventory::{RetryPolicy, StockMutator};
    use crate::reconciliation::ReconciliationService;
    use shared::models::{AddStockRequest, InventoryLogType, OrderItemInput};
    use std::time::Duration;

    struct Fixture {
        service: WebOrderService,
        mutator: StockMutator,
        product_id: i64,
    }

    async fn setup(stock: i64) -> Fixture {
        let db = DbService::open_in_memory().await.unwrap();
        let retry = RetryPolicy::new(3, Duration::from_secs(5));
        let (reconciliation, _rx) = ReconciliationService::new(db.pool.clone(), 16);
        let coordinator = Coordinator::new(db.pool.clone(), retry, 10, reconciliation.clone());
        let mutator = StockMutator::new(db.pool.clone(), retry, 10, reconciliation);
        let product = catalog::create_product(&db.pool, "Kraft Box", 12.5, None)
            .await
            .unwrap();
        mutator
            .add_stock(
                product.id,
                None,
                AddStockRequest {
                    quantity: stock,
                    reason: None,
                    low_stock_threshold: None,
                },
                None,
            )
            .await
            .unwrap();
        Fixture {
            service: WebOrderService::new(coordinator),
            mutator,
            product_id: product.id,
        }
    }

    fn address() -> Address {
        Address {
            full_name: Some("Ada Lovelace".into()),
            address: "1 Main St".into(),
            city: "Lyon".into(),
            postal_code: "69001".into(),
            country: "FR".into(),
            phone: None,
        }
    }

    fn request(product_id: i64, quantity: i64, subtotal: f64, total: f64) -> CreateOrderRequest {
        CreateOrderRequest {
            items: vec![OrderItemInput {
                product_id,
                variant_key: None,
                quantity,
                // client price is ignored
                price: Some(0.01),
            }],
            shipping_address: address(),
            billing_address: None,
            payment_method: "card".into(),
            subtotal,
            tax: 2.0,
            shipping_cost: 5.0,
            total_price: total,
        }
    }

    async fn stock(f: &Fixture) -> i64 {
        f.mutator.get_record(f.product_id, None).await.unwrap().quantity
    }

    #[tokio::test]
    async fn test_create_reprices_and_persists() {
        let f = setup(10).await;
        let placed = f
            .service
            .create(request(f.product_id, 2, 25.0, 32.0), "user-1")
            .await
            .unwrap();

        let order = placed.order;
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.is_paid);
        assert_eq!(order.items[0].price, 12.5);
        assert_eq!(order.items[0].name, "Kraft Box");
        assert_eq!(order.total_price, 32.0);
        assert_eq!(placed.stock_changes[0].new_quantity, 8);
        assert_eq!(stock(&f).await, 8);

        let loaded = f.service.get(order.id).await.unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.user_id, "user-1");
        assert_eq!(loaded.shipping_address, address());
        assert!(loaded.billing_address.is_none());
    }

    #[tokio::test]
    async fn test_amount_mismatch_has_no_side_effects() {
        let f = setup(10).await;
        let err = f
            .service
            .create(request(f.product_id, 2, 20.0, 27.0), "user-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::AmountMismatch { field: "subtotal", .. }
        ));

        let err = f
            .service
            .create(request(f.product_id, 2, 25.0, 40.0), "user-1")
            .await
            .unwrap_err();
        match err {
            LedgerError::AmountMismatch {
                field,
                expected,
                received,
            } => {
                assert_eq!(field, "totalPrice");
                assert_eq!(expected, 32.0);
                assert_eq!(received, 40.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(stock(&f).await, 10);
        assert_eq!(f.service.list(None, 1, 20).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_insufficient_stock_persists_nothing() {
        let f = setup(4).await;
        let err = f
            .service
            .create(request(f.product_id, 10, 125.0, 132.0), "user-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientInventory { available: 4, requested: 10, .. }
        ));
        assert_eq!(stock(&f).await, 4);
        assert_eq!(f.service.list(None, 1, 20).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let f = setup(4).await;
        let mut req = request(f.product_id, 1, 12.5, 19.5);
        req.items.clear();
        assert!(matches!(
            f.service.create(req, "u").await,
            Err(LedgerError::EmptyOrder)
        ));

        let mut req = request(f.product_id, 1, 12.5, 19.5);
        req.payment_method = " ".into();
        assert!(matches!(
            f.service.create(req, "u").await,
            Err(LedgerError::InvalidPaymentMethod(_))
        ));

        let mut req = request(f.product_id, 1, 12.5, 19.5);
        req.shipping_address.city = String::new();
        assert!(matches!(
            f.service.create(req, "u").await,
            Err(LedgerError::Validation(_))
        ));

        let req = request(f.product_id, -1, 12.5, 19.5);
        assert!(matches!(
            f.service.create(req, "u").await,
            Err(LedgerError::InvalidQuantity(_))
        ));
    }

    #[tokio::test]
    async fn test_unrepresentable_amounts_are_rejected() {
        let f = setup(4).await;
        let mut req = request(f.product_id, 1, 12.5, 19.5);
        req.tax = 1e300;
        assert!(matches!(
            f.service.create(req, "u").await,
            Err(LedgerError::Validation(_))
        ));

        let mut req = request(f.product_id, 1, 12.5, 19.5);
        req.shipping_cost = 1e29;
        assert!(matches!(
            f.service.create(req, "u").await,
            Err(LedgerError::Validation(_))
        ));

        assert_eq!(stock(&f).await, 4);
        assert_eq!(f.service.list(None, 1, 20).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_cancel_returns_stock_once() {
        let f = setup(10).await;
        let order = f
            .service
            .create(request(f.product_id, 3, 37.5, 44.5), "user-1")
            .await
            .unwrap()
            .order;
        assert_eq!(stock(&f).await, 7);

        let cancelled = f
            .service
            .update_status(order.id, OrderStatus::Cancelled, Some("admin-1"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(stock(&f).await, 10);

        let again = f
            .service
            .update_status(order.id, OrderStatus::Cancelled, Some("admin-1"))
            .await;
        assert!(matches!(again, Err(LedgerError::InvalidStatusTransition { .. })));
        assert_eq!(stock(&f).await, 10);

        let report = f.mutator.verify_ledger(f.product_id, None).await.unwrap();
        assert!(report.consistent);
        assert_eq!(report.entry_count, 3);

        let logs = f
            .mutator
            .query_logs(
                &crate::db::repository::inventory_log::LogFilter {
                    log_type: Some(InventoryLogType::Returned),
                    ..Default::default()
                },
                1,
                20,
            )
            .await
            .unwrap();
        assert_eq!(logs.logs[0].reference, Some(order.id.to_string()));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let f = setup(10).await;
        let order = f
            .service
            .create(request(f.product_id, 1, 12.5, 19.5), "user-1")
            .await
            .unwrap()
            .order;
        for status in [OrderStatus::Processing, OrderStatus::Shipped] {
            f.service.update_status(order.id, status, None).await.unwrap();
        }
        assert!(matches!(
            f.service
                .update_status(order.id, OrderStatus::Cancelled, None)
                .await,
            Err(LedgerError::InvalidStatusTransition { .. })
        ));
        assert_eq!(stock(&f).await, 9);
        assert!(matches!(
            f.service.update_status(1, OrderStatus::Processing, None).await,
            Err(LedgerError::OrderNotFound(1))
        ));
    }

    #[tokio::test]
    async fn test_mark_paid_once() {
        let f = setup(10).await;
        let order = f
            .service
            .create(request(f.product_id, 1, 12.5, 19.5), "user-1")
            .await
            .unwrap()
            .order;

        let paid = f
            .service
            .mark_paid(order.id, Some("pi_123".into()))
            .await
            .unwrap();
        assert!(paid.is_paid);
        assert!(paid.paid_at.is_some());

        assert!(matches!(
            f.service.mark_paid(order.id, None).await,
            Err(LedgerError::OrderAlreadyPaid(_))
        ));
        let loaded = f.service.get(order.id).await.unwrap();
        assert_eq!(loaded.payment_reference.as_deref(), Some("pi_123"));
    }
}
