//! POS Checkout Processor
//!
//! Every price field is recomputed from the catalog; the client totals are
//! only compared against the recomputed ones. Stock goes through the same
//! coordinator as web orders.

use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use shared::models::{
    CreatePosOrderRequest, PlacedOrder, PosOrder, PosOrderItem, PosOrderPage, PosPaymentMethod,
    PosPaymentStatus, UpdatePosPaymentRequest, WALK_IN_CUSTOMER,
};
use sqlx::SqliteConnection;

use super::numbering;
use crate::db::repository::pos_order;
use crate::fulfillment::{Channel, Coordinator, OrderDraft, OrderLine, resolve_line};
use crate::inventory::{LedgerError, normalize_variant_key};
use crate::money::{is_valid_amount, line_total, to_decimal, to_f64, within_tolerance};
use crate::utils::time::{day_end_millis, day_start_millis};
use crate::utils::validation::{MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN};

/// Order content fixed before the transaction; number and id come inside it
struct PosOrderDraft {
    tz: Tz,
    lines: Vec<OrderLine>,
    items: Vec<PosOrderItem>,
    customer_id: Option<String>,
    customer_name: String,
    staff_id: String,
    subtotal: f64,
    tax: f64,
    discount: f64,
    discount_code: Option<String>,
    total_amount: f64,
    payment_method: PosPaymentMethod,
    notes: Option<String>,
}

impl OrderDraft for PosOrderDraft {
    type Output = PosOrder;

    fn channel(&self) -> Channel {
        Channel::Pos
    }

    fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    async fn persist(
        &self,
        conn: &mut SqliteConnection,
        order_id: i64,
    ) -> Result<PosOrder, LedgerError> {
        let now = shared::util::now_millis();
        let order_number = numbering::allocate(&mut *conn, now, self.tz).await?;
        let order = PosOrder {
            id: order_id,
            order_number,
            items: self.items.clone(),
            customer_id: self.customer_id.clone(),
            customer_name: self.customer_name.clone(),
            staff_id: self.staff_id.clone(),
            subtotal: self.subtotal,
            tax: self.tax,
            discount: self.discount,
            discount_code: self.discount_code.clone(),
            total_amount: self.total_amount,
            payment_method: self.payment_method,
            payment_status: self.payment_method.initial_status(),
            notes: self.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        pos_order::insert(conn, &order).await?;
        Ok(order)
    }
}

fn check_text(value: Option<&str>, field: &str, max_len: usize) -> Result<(), LedgerError> {
    match value {
        Some(v) if v.len() > max_len => Err(LedgerError::Validation(format!(
            "{field} must be at most {max_len} characters"
        ))),
        _ => Ok(()),
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone)]
pub struct PosCheckoutProcessor {
    coordinator: Coordinator,
    tz: Tz,
}

impl PosCheckoutProcessor {
    pub fn new(coordinator: Coordinator, tz: Tz) -> Self {
        Self { coordinator, tz }
    }

    /// Reprice, verify totals, decrement stock and persist with a fresh number
    pub async fn process(
        &self,
        req: CreatePosOrderRequest,
        staff_id: &str,
    ) -> Result<PlacedOrder<PosOrder>, LedgerError> {
        if staff_id.trim().is_empty() {
            return Err(LedgerError::Validation("staff id is required".into()));
        }
        if req.items.is_empty() {
            return Err(LedgerError::EmptyOrder);
        }
        for (field, value) in [
            ("subtotal", req.subtotal),
            ("tax", req.tax),
            ("discount", req.discount),
            ("totalAmount", req.total_amount),
        ] {
            if !is_valid_amount(value) {
                return Err(LedgerError::Validation(format!(
                    "{field} must be a non-negative number, got {value}"
                )));
            }
        }
        check_text(req.notes.as_deref(), "notes", MAX_NOTE_LEN)?;
        check_text(req.discount_code.as_deref(), "discountCode", MAX_SHORT_TEXT_LEN)?;
        let customer = req.customer.unwrap_or_default();
        check_text(customer.id.as_deref(), "customer.id", MAX_SHORT_TEXT_LEN)?;
        check_text(customer.name.as_deref(), "customer.name", MAX_NAME_LEN)?;

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
                check_text(variant_key.as_deref(), "variantKey", MAX_SHORT_TEXT_LEN)?;
                let priced =
                    resolve_line(&mut *conn, input.product_id, variant_key.as_deref()).await?;
                let line_subtotal = line_total(priced.unit_price, input.quantity);
                subtotal += line_subtotal;
                lines.push(OrderLine {
                    product_id: input.product_id,
                    variant_key: variant_key.clone(),
                    quantity: input.quantity,
                });
                items.push(PosOrderItem {
                    product_id: input.product_id,
                    variant_key,
                    name: priced.name,
                    quantity: input.quantity,
                    price: priced.unit_price,
                    subtotal: to_f64(line_subtotal),
                });
            }
        }

        let total = subtotal + to_decimal(req.tax) - to_decimal(req.discount);
        if total < Decimal::ZERO {
            return Err(LedgerError::Validation(format!(
                "discount {} exceeds the order amount",
                req.discount
            )));
        }
        if !within_tolerance(subtotal, req.subtotal) {
            return Err(LedgerError::AmountMismatch {
                field: "subtotal",
                expected: to_f64(subtotal),
                received: req.subtotal,
            });
        }
        if !within_tolerance(total, req.total_amount) {
            return Err(LedgerError::AmountMismatch {
                field: "totalAmount",
                expected: to_f64(total),
                received: req.total_amount,
            });
        }

        let customer_id = trimmed(customer.id);
        let customer_name = trimmed(customer.name).unwrap_or_else(|| WALK_IN_CUSTOMER.to_string());
        let draft = PosOrderDraft {
            tz: self.tz,
            lines,
            items,
            customer_id,
            customer_name,
            staff_id: staff_id.to_string(),
            subtotal: to_f64(subtotal),
            tax: to_f64(to_decimal(req.tax)),
            discount: to_f64(to_decimal(req.discount)),
            discount_code: trimmed(req.discount_code),
            total_amount: to_f64(total),
            payment_method: req.payment_method,
            notes: trimmed(req.notes),
        };
        let placed = self.coordinator.place_order(&draft, Some(staff_id)).await?;
        tracing::info!(
            order_number = %placed.order.order_number,
            staff_id,
            total_amount = placed.order.total_amount,
            "POS order created"
        );
        Ok(placed)
    }

    pub async fn get(&self, id: i64) -> Result<PosOrder, LedgerError> {
        pos_order::find_by_id(self.coordinator.pool(), id)
            .await?
            .ok_or(LedgerError::OrderNotFound(id))
    }

    /// Orders of one business day, or all of them
    pub async fn list(
        &self,
        date: Option<NaiveDate>,
        page: i64,
        limit: i64,
    ) -> Result<PosOrderPage, LedgerError> {
        let (start, end) = match date {
            Some(date) => (
                Some(day_start_millis(date, self.tz)),
                Some(day_end_millis(date, self.tz)),
            ),
            None => (None, None),
        };
        Ok(pos_order::list(self.coordinator.pool(), start, end, page, limit).await?)
    }

    pub async fn update_payment(
        &self,
        id: i64,
        req: UpdatePosPaymentRequest,
    ) -> Result<PosOrder, LedgerError> {
        if req.payment_status.is_none() && req.payment_method.is_none() {
            return Err(LedgerError::Validation(
                "paymentStatus or paymentMethod is required".into(),
            ));
        }
        let mut order = self.get(id).await?;
        let status = req.payment_status.unwrap_or(order.payment_status);
        let method = req.payment_method.unwrap_or(order.payment_method);
        let now = shared::util::now_millis();
        if !pos_order::update_payment(self.coordinator.pool(), id, status, method, now).await? {
            return Err(LedgerError::OrderNotFound(id));
        }
        tracing::info!(order_id = id, payment_status = ?status, payment_method = ?method, "POS payment updated");
        order.payment_status = status;
        order.payment_method = method;
        order.updated_at = now;
        Ok(order)
    }
}
