//! Order Fulfillment Coordinator
//!
//! All-or-nothing placement: every line mutation, the order row and (for
//! POS) the order number share one SQLite transaction. A failed line or a
//! failed persist rolls the transaction back, so no partial decrement is
//! ever committed.

use std::sync::Arc;

use serde_json::json;
use shared::models::{InventoryLogType, PlacedOrder, StockChange};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use super::{Channel, OrderDraft, OrderLine};
use crate::db::repository::{catalog, inventory};
use crate::inventory::mutator::display_name;
use crate::inventory::{LedgerError, MutationOutcome, RetryPolicy, StockMutation, apply};
use crate::reconciliation::{AlertKind, ReconciliationAlert, ReconciliationService};

#[derive(Debug, Clone)]
pub struct Coordinator {
    pool: SqlitePool,
    retry: RetryPolicy,
    default_threshold: i64,
    reconciliation: Arc<ReconciliationService>,
}

/// Lines merged per (product, variant), first-seen order kept
fn aggregate_demand(lines: &[OrderLine]) -> Result<Vec<OrderLine>, LedgerError> {
    if lines.is_empty() {
        return Err(LedgerError::EmptyOrder);
    }
    let mut demand: Vec<OrderLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(LedgerError::InvalidQuantity(format!(
                "quantity for product {} must be positive, got {}",
                line.product_id, line.quantity
            )));
        }
        match demand
            .iter_mut()
            .find(|d| d.product_id == line.product_id && d.variant_key == line.variant_key)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(line.quantity).ok_or_else(|| {
                    LedgerError::InvalidQuantity(format!(
                        "quantity overflow for product {}",
                        line.product_id
                    ))
                })?;
            }
            None => demand.push(line.clone()),
        }
    }
    Ok(demand)
}

fn changes_json(outcomes: &[MutationOutcome]) -> serde_json::Value {
    let changes: Vec<StockChange> = outcomes.iter().map(MutationOutcome::stock_change).collect();
    serde_json::to_value(changes).unwrap_or_default()
}

impl Coordinator {
    pub fn new(
        pool: SqlitePool,
        retry: RetryPolicy,
        default_threshold: i64,
        reconciliation: Arc<ReconciliationService>,
    ) -> Self {
        Self {
            pool,
            retry,
            default_threshold,
            reconciliation,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Validate, decrement every line and persist the order atomically
    pub async fn place_order<D: OrderDraft>(
        &self,
        draft: &D,
        actor: Option<&str>,
    ) -> Result<PlacedOrder<D::Output>, LedgerError> {
        let demand = aggregate_demand(draft.lines())?;
        self.prevalidate(&demand).await?;

        let demand = &demand;
        let placed = self
            .retry
            .run("place_order", || async move {
                self.attempt(draft, demand, actor).await
            })
            .await;

        match &placed {
            Ok(placed) => tracing::info!(
                channel = %draft.channel(),
                lines = placed.stock_changes.len(),
                "Order placed"
            ),
            Err(e) => tracing::warn!(
                channel = %draft.channel(),
                error = %e,
                "Order placement failed"
            ),
        }
        placed
    }

    /// Read-only stock check; fails fast with no side effects
    async fn prevalidate(&self, demand: &[OrderLine]) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        for line in demand {
            let variant_key = line.variant_key.as_deref();
            let record = inventory::find_by_key(&mut *conn, line.product_id, variant_key).await?;
            let available = match record {
                Some(record) => record.quantity,
                None => {
                    if catalog::find_product(&mut *conn, line.product_id).await?.is_none() {
                        return Err(LedgerError::ProductNotFound {
                            product_id: line.product_id,
                            variant_key: line.variant_key.clone(),
                        });
                    }
                    0
                }
            };
            if available < line.quantity {
                return Err(LedgerError::InsufficientInventory {
                    product_id: line.product_id,
                    variant_key: line.variant_key.clone(),
                    product_name: display_name(&mut *conn, line.product_id, variant_key).await?,
                    available,
                    requested: line.quantity,
                });
            }
        }
        Ok(())
    }

    async fn attempt<D: OrderDraft>(
        &self,
        draft: &D,
        demand: &[OrderLine],
        actor: Option<&str>,
    ) -> Result<PlacedOrder<D::Output>, LedgerError> {
        let channel = draft.channel();
        let order_id = shared::util::snowflake_id();
        let reference = order_id.to_string();

        let mut tx = self.pool.begin().await?;
        let mut outcomes = Vec::with_capacity(demand.len());
        for line in demand {
            let mutation = StockMutation::delta(
                line.product_id,
                line.variant_key.clone(),
                -line.quantity,
                InventoryLogType::Sold,
            )
            .with_reference(Some(reference.clone()))
            .with_actor(actor.map(str::to_string))
            .with_reason(Some(format!("{channel} order")));
            let applied = apply(&mut *tx, &mutation, self.default_threshold).await;
            match applied {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => return Err(self.abort(tx, e, channel, &reference, &outcomes).await),
            }
        }

        let persisted = draft.persist(&mut *tx, order_id).await;
        let order = match persisted {
            Ok(order) => order,
            Err(e) if e.is_retryable() => {
                return Err(self.abort(tx, e, channel, &reference, &outcomes).await);
            }
            Err(e) => {
                let err = self.abort(tx, e, channel, &reference, &outcomes).await;
                if matches!(err, LedgerError::PersistenceFailure(_)) {
                    return Err(err);
                }
                self.reconciliation.raise(
                    ReconciliationAlert::new(
                        AlertKind::PersistFailed,
                        format!("{channel} order {reference} could not be persisted after stock was decremented: {err}"),
                    )
                    .with_channel(channel)
                    .with_reference(reference.clone())
                    .with_details(json!({
                        "stockChanges": changes_json(&outcomes),
                        "rolledBack": true,
                        "error": err.to_string(),
                    })),
                );
                return Err(LedgerError::PersistenceFailure(err.to_string()));
            }
        };

        self.commit_or_escalate(tx, channel, &reference, &outcomes)
            .await?;

        Ok(PlacedOrder {
            order,
            stock_changes: outcomes.iter().map(MutationOutcome::stock_change).collect(),
        })
    }

    /// Roll back explicitly; a failed rollback is escalated
    async fn abort(
        &self,
        tx: Transaction<'_, Sqlite>,
        err: LedgerError,
        channel: Channel,
        reference: &str,
        outcomes: &[MutationOutcome],
    ) -> LedgerError {
        match tx.rollback().await {
            Ok(()) => err,
            Err(rollback_err) => {
                self.reconciliation.raise(
                    ReconciliationAlert::new(
                        AlertKind::RollbackFailed,
                        format!("rollback of {channel} order {reference} failed after: {err}"),
                    )
                    .with_channel(channel)
                    .with_reference(reference)
                    .with_details(json!({
                        "stockChanges": changes_json(outcomes),
                        "error": err.to_string(),
                        "rollbackError": rollback_err.to_string(),
                    })),
                );
                LedgerError::PersistenceFailure(format!(
                    "rollback failed: {rollback_err} (after: {err})"
                ))
            }
        }
    }

    /// Commit; on error the outcome is unknown and escalated
    pub(crate) async fn commit_or_escalate(
        &self,
        tx: Transaction<'_, Sqlite>,
        channel: Channel,
        reference: &str,
        outcomes: &[MutationOutcome],
    ) -> Result<(), LedgerError> {
        if let Err(e) = tx.commit().await {
            self.reconciliation.raise(
                ReconciliationAlert::new(
                    AlertKind::CommitFailed,
                    format!("commit of {channel} order {reference} failed: {e}"),
                )
                .with_channel(channel)
                .with_reference(reference)
                .with_details(json!({
                    "stockChanges": changes_json(outcomes),
                    "error": e.to_string(),
                })),
            );
            return Err(LedgerError::PersistenceFailure(format!("commit failed: {e}")));
        }
        Ok(())
    }

    /// Put order lines back into stock inside the caller's transaction
    pub(crate) async fn return_lines(
        &self,
        conn: &mut SqliteConnection,
        lines: &[OrderLine],
        reference: &str,
        actor: Option<&str>,
        reason: &str,
    ) -> Result<Vec<MutationOutcome>, LedgerError> {
        let mut outcomes = Vec::with_capacity(lines.len());
        for line in aggregate_demand(lines)? {
            let mutation = StockMutation::delta(
                line.product_id,
                line.variant_key,
                line.quantity,
                InventoryLogType::Returned,
            )
            .with_reference(Some(reference.to_string()))
            .with_actor(actor.map(str::to_string))
            .with_reason(Some(reason.to_string()));
            outcomes.push(apply(&mut *conn, &mutation, self.default_threshold).await?);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::inventory_log::{self, LogFilter};
    use crate::inventory::StockMutator;
    use crate::reconciliation::ReconciliationWorker;
    use shared::models::{AddStockRequest, ReconciliationIssue};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    enum PersistMode {
        Ok,
        FailPermanently,
        FailOnce,
    }

    struct TestDraft {
        lines: Vec<OrderLine>,
        mode: PersistMode,
        attempts: AtomicU32,
    }

    impl TestDraft {
        fn new(lines: Vec<OrderLine>, mode: PersistMode) -> Self {
            Self {
                lines,
                mode,
                attempts: AtomicU32::new(0),
            }
        }
    }

    impl OrderDraft for TestDraft {
        type Output = i64;

        fn channel(&self) -> Channel {
            Channel::Web
        }

        fn lines(&self) -> &[OrderLine] {
            &self.lines
        }

        async fn persist(
            &self,
            _conn: &mut SqliteConnection,
            order_id: i64,
        ) -> Result<i64, LedgerError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                PersistMode::Ok => Ok(order_id),
                PersistMode::FailPermanently => {
                    Err(LedgerError::Database("disk I/O error".into()))
                }
                PersistMode::FailOnce if attempt == 0 => Err(LedgerError::ConcurrentModification(
                    "UNIQUE constraint failed".into(),
                )),
                PersistMode::FailOnce => Ok(order_id),
            }
        }
    }

    struct Fixture {
        pool: SqlitePool,
        coordinator: Coordinator,
        mutator: StockMutator,
        reconciliation: Arc<ReconciliationService>,
    }

    async fn setup() -> Fixture {
        let db = DbService::open_in_memory().await.unwrap();
        let retry = RetryPolicy::new(3, Duration::from_secs(5));
        let (reconciliation, rx) = ReconciliationService::new(db.pool.clone(), 16);
        tokio::spawn(ReconciliationWorker::new(db.pool.clone()).run(rx));
        Fixture {
            coordinator: Coordinator::new(db.pool.clone(), retry, 10, reconciliation.clone()),
            mutator: StockMutator::new(db.pool.clone(), retry, 10, reconciliation.clone()),
            pool: db.pool,
            reconciliation,
        }
    }

    async fn stocked_product(f: &Fixture, name: &str, quantity: i64) -> i64 {
        let product = catalog::create_product(&f.pool, name, 1.0, None).await.unwrap();
        f.mutator
            .add_stock(
                product.id,
                None,
                AddStockRequest {
                    quantity,
                    reason: None,
                    low_stock_threshold: None,
                },
                None,
            )
            .await
            .unwrap();
        product.id
    }

    fn line(product_id: i64, quantity: i64) -> OrderLine {
        OrderLine {
            product_id,
            variant_key: None,
            quantity,
        }
    }

    async fn quantity(f: &Fixture, product_id: i64) -> i64 {
        f.mutator.get_record(product_id, None).await.unwrap().quantity
    }

    async fn wait_for_issues(f: &Fixture) -> Vec<ReconciliationIssue> {
        for _ in 0..100 {
            let issues = f.reconciliation.list(None).await.unwrap();
            if !issues.is_empty() {
                return issues;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no reconciliation issue recorded");
    }

    #[tokio::test]
    async fn test_empty_order_rejected() {
        let f = setup().await;
        let draft = TestDraft::new(vec![], PersistMode::Ok);
        assert!(matches!(
            f.coordinator.place_order(&draft, None).await,
            Err(LedgerError::EmptyOrder)
        ));
    }

    #[tokio::test]
    async fn test_non_positive_quantity_rejected() {
        let f = setup().await;
        let a = stocked_product(&f, "A", 5).await;
        let draft = TestDraft::new(vec![line(a, 0)], PersistMode::Ok);
        assert!(matches!(
            f.coordinator.place_order(&draft, None).await,
            Err(LedgerError::InvalidQuantity(_))
        ));
    }

    #[tokio::test]
    async fn test_places_order_and_references_it_in_log() {
        let f = setup().await;
        let a = stocked_product(&f, "A", 5).await;
        let b = stocked_product(&f, "B", 8).await;

        let draft = TestDraft::new(vec![line(a, 3), line(b, 1)], PersistMode::Ok);
        let placed = f.coordinator.place_order(&draft, Some("user-1")).await.unwrap();

        assert_eq!(placed.stock_changes.len(), 2);
        assert_eq!(placed.stock_changes[0].previous_quantity, 5);
        assert_eq!(placed.stock_changes[0].new_quantity, 2);
        assert_eq!(quantity(&f, a).await, 2);
        assert_eq!(quantity(&f, b).await, 7);

        let filter = LogFilter {
            reference: Some(placed.order.to_string()),
            ..Default::default()
        };
        let logs = inventory_log::query(&f.pool, &filter, 1, 20).await.unwrap();
        assert_eq!(logs.total, 2);
        assert!(logs.logs.iter().all(|l| l.log_type == InventoryLogType::Sold));
        assert!(logs.logs.iter().all(|l| l.performed_by.as_deref() == Some("user-1")));
    }

    #[tokio::test]
    async fn test_oversold_line_leaves_every_record_untouched() {
        let f = setup().await;
        let a = stocked_product(&f, "A", 10).await;
        let b = stocked_product(&f, "B", 4).await;
        let c = stocked_product(&f, "C", 10).await;

        let draft = TestDraft::new(vec![line(a, 2), line(b, 10), line(c, 1)], PersistMode::Ok);
        let err = f.coordinator.place_order(&draft, None).await.unwrap_err();
        match err {
            LedgerError::InsufficientInventory {
                product_id,
                product_name,
                available,
                requested,
                ..
            } => {
                assert_eq!(product_id, b);
                assert_eq!(product_name, "B");
                assert_eq!(available, 4);
                assert_eq!(requested, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(quantity(&f, a).await, 10);
        assert_eq!(quantity(&f, b).await, 4);
        assert_eq!(quantity(&f, c).await, 10);
        assert_eq!(draft.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_duplicate_lines_are_checked_together() {
        let f = setup().await;
        let a = stocked_product(&f, "A", 5).await;
        let draft = TestDraft::new(vec![line(a, 3), line(a, 3)], PersistMode::Ok);
        assert!(matches!(
            f.coordinator.place_order(&draft, None).await,
            Err(LedgerError::InsufficientInventory { requested: 6, available: 5, .. })
        ));
        assert_eq!(quantity(&f, a).await, 5);
    }

    #[tokio::test]
    async fn test_untracked_product_is_insufficient_and_unknown_is_not_found() {
        let f = setup().await;
        let untracked = catalog::create_product(&f.pool, "Untracked", 1.0, None)
            .await
            .unwrap();
        let draft = TestDraft::new(vec![line(untracked.id, 1)], PersistMode::Ok);
        assert!(matches!(
            f.coordinator.place_order(&draft, None).await,
            Err(LedgerError::InsufficientInventory { available: 0, .. })
        ));

        let draft = TestDraft::new(vec![line(424242, 1)], PersistMode::Ok);
        assert!(matches!(
            f.coordinator.place_order(&draft, None).await,
            Err(LedgerError::ProductNotFound { product_id: 424242, .. })
        ));
    }

    #[tokio::test]
    async fn test_persist_failure_rolls_back_and_escalates() {
        let f = setup().await;
        let a = stocked_product(&f, "A", 5).await;

        let draft = TestDraft::new(vec![line(a, 2)], PersistMode::FailPermanently);
        let err = f.coordinator.place_order(&draft, None).await.unwrap_err();
        assert!(matches!(err, LedgerError::PersistenceFailure(_)));
        assert_eq!(quantity(&f, a).await, 5);

        let report = f.mutator.verify_ledger(a, None).await.unwrap();
        assert!(report.consistent);
        assert_eq!(report.entry_count, 1);

        let issues = wait_for_issues(&f).await;
        assert_eq!(issues[0].kind, "persist_failed");
        assert_eq!(issues[0].channel.as_deref(), Some("web"));
    }

    #[tokio::test]
    async fn test_retryable_persist_failure_is_retried_cleanly() {
        let f = setup().await;
        let a = stocked_product(&f, "A", 5).await;

        let draft = TestDraft::new(vec![line(a, 2)], PersistMode::FailOnce);
        let placed = f.coordinator.place_order(&draft, None).await.unwrap();
        assert_eq!(draft.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(quantity(&f, a).await, 3);

        // the rolled-back attempt left no log entry behind
        let report = f.mutator.verify_ledger(a, None).await.unwrap();
        assert!(report.consistent);
        assert_eq!(report.entry_count, 2);

        let filter = LogFilter {
            reference: Some(placed.order.to_string()),
            ..Default::default()
        };
        assert_eq!(inventory_log::query(&f.pool, &filter, 1, 20).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_return_lines_restores_stock() {
        let f = setup().await;
        let a = stocked_product(&f, "A", 5).await;
        let draft = TestDraft::new(vec![line(a, 4)], PersistMode::Ok);
        let placed = f.coordinator.place_order(&draft, None).await.unwrap();

        let mut tx = f.pool.begin().await.unwrap();
        let outcomes = f
            .coordinator
            .return_lines(&mut tx, &[line(a, 4)], &placed.order.to_string(), None, "cancelled")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(outcomes[0].entry.log_type, InventoryLogType::Returned);
        assert_eq!(quantity(&f, a).await, 5);
    }
}
