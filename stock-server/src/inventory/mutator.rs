//! Stock Mutator
//!
//! The only code path that changes `inventory.quantity`. Every change runs
//! inside the caller's transaction and, in order:
//!
//! 1. claims the record (`lock_by_key`), taking the database write lock
//! 2. validates the new quantity against the claimed state
//! 3. writes quantity + threshold + `is_low_stock` with a version check
//! 4. appends exactly one log entry
//! 5. mirrors the new quantity onto the catalog stock column
//!
//! Nothing is visible until the caller commits, so a crash between steps
//! leaves no trace.

use std::sync::Arc;

use super::{LedgerError, RetryPolicy};
use crate::db::repository::inventory_log::{self, LogFilter, NewLogEntry};
use crate::db::repository::{RepoError, catalog, inventory};
use crate::reconciliation::{AlertKind, ReconciliationAlert, ReconciliationService};
use crate::utils::validation::{MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN};
use shared::models::{
    AddStockRequest, AdjustInventoryRequest, InventoryLogEntry, InventoryLogPage,
    InventoryLogType, InventoryRecord, LedgerVerification, StockChange,
};
use sqlx::{SqliteConnection, SqlitePool};

/// How the quantity changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// Signed delta, never zero
    Delta(i64),
    /// Absolute quantity (manual adjustment)
    Set(i64),
}

/// One requested change to one inventory record
#[derive(Debug, Clone)]
pub struct StockMutation {
    pub product_id: i64,
    pub variant_key: Option<String>,
    pub change: QuantityChange,
    pub log_type: InventoryLogType,
    /// New threshold, written together with the quantity
    pub low_stock_threshold: Option<i64>,
    pub reason: Option<String>,
    pub performed_by: Option<String>,
    pub reference: Option<String>,
}

impl StockMutation {
    pub fn delta(
        product_id: i64,
        variant_key: Option<String>,
        delta: i64,
        log_type: InventoryLogType,
    ) -> Self {
        Self {
            product_id,
            variant_key,
            change: QuantityChange::Delta(delta),
            log_type,
            low_stock_threshold: None,
            reason: None,
            performed_by: None,
            reference: None,
        }
    }

    pub fn set(product_id: i64, variant_key: Option<String>, quantity: i64) -> Self {
        Self {
            product_id,
            variant_key,
            change: QuantityChange::Set(quantity),
            log_type: InventoryLogType::Adjusted,
            low_stock_threshold: None,
            reason: None,
            performed_by: None,
            reference: None,
        }
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn with_actor(mut self, performed_by: Option<String>) -> Self {
        self.performed_by = performed_by;
        self
    }

    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_threshold(mut self, low_stock_threshold: Option<i64>) -> Self {
        self.low_stock_threshold = low_stock_threshold;
        self
    }

    /// Sign rules per log type, before touching the database
    pub fn validate(&self) -> Result<(), LedgerError> {
        match (self.change, self.log_type) {
            (QuantityChange::Delta(0), _) => {
                return Err(LedgerError::InvalidQuantity(
                    "quantity change must not be zero".into(),
                ));
            }
            (QuantityChange::Delta(d), InventoryLogType::Added | InventoryLogType::Returned)
                if d < 0 =>
            {
                return Err(LedgerError::InvalidQuantity(format!(
                    "{} requires a positive quantity, got {d}",
                    self.log_type
                )));
            }
            (QuantityChange::Delta(d), InventoryLogType::Sold) if d > 0 => {
                return Err(LedgerError::InvalidQuantity(format!(
                    "sold requires a negative delta, got {d}"
                )));
            }
            (QuantityChange::Set(q), _) if q < 0 => {
                return Err(LedgerError::InvalidQuantity(format!(
                    "quantity must not be negative, got {q}"
                )));
            }
            (QuantityChange::Set(_), t) if t != InventoryLogType::Adjusted => {
                return Err(LedgerError::Validation(
                    "absolute quantity changes are always adjustments".into(),
                ));
            }
            _ => {}
        }
        if let Some(threshold) = self.low_stock_threshold
            && threshold < 0
        {
            return Err(LedgerError::Validation(format!(
                "lowStockThreshold must not be negative, got {threshold}"
            )));
        }
        if let Some(key) = &self.variant_key
            && key.len() > MAX_SHORT_TEXT_LEN
        {
            return Err(LedgerError::Validation("variantKey is too long".into()));
        }
        if let Some(reason) = &self.reason
            && reason.len() > MAX_NOTE_LEN
        {
            return Err(LedgerError::Validation(format!(
                "reason is too long ({} chars, max {MAX_NOTE_LEN})",
                reason.len()
            )));
        }
        Ok(())
    }
}

/// Updated record plus the log entry that explains it
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub record: InventoryRecord,
    pub entry: InventoryLogEntry,
}

impl MutationOutcome {
    pub fn stock_change(&self) -> StockChange {
        StockChange {
            product_id: self.record.product_id,
            variant_key: self.record.variant_key.clone(),
            previous_quantity: self.entry.previous_quantity,
            new_quantity: self.entry.new_quantity,
        }
    }
}

/// `''` and whitespace-only keys mean "no variant"
pub fn normalize_variant_key(variant_key: Option<String>) -> Option<String> {
    variant_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Display name used in insufficient-stock messages
pub(crate) async fn display_name(
    conn: &mut SqliteConnection,
    product_id: i64,
    variant_key: Option<&str>,
) -> Result<String, LedgerError> {
    let Some(product) = catalog::find_product(&mut *conn, product_id).await? else {
        return Ok(format!("product {product_id}"));
    };
    if let Some(key) = variant_key
        && let Some(variant) = catalog::find_variant(&mut *conn, product_id, key).await?
    {
        return Ok(format!("{} ({})", product.name, variant.name));
    }
    Ok(product.name)
}

async fn ensure_catalog_entry(
    conn: &mut SqliteConnection,
    product_id: i64,
    variant_key: Option<&str>,
) -> Result<(), LedgerError> {
    let not_found = || LedgerError::ProductNotFound {
        product_id,
        variant_key: variant_key.map(str::to_string),
    };
    let Some(product) = catalog::find_product(&mut *conn, product_id).await? else {
        return Err(not_found());
    };
    match variant_key {
        Some(key) => {
            if catalog::find_variant(&mut *conn, product_id, key).await?.is_none() {
                return Err(not_found());
            }
        }
        None if product.has_variants => return Err(variant_key_required(product_id)),
        None => {}
    }
    Ok(())
}

/// A product with variants only has per-variant records
pub(crate) fn variant_key_required(product_id: i64) -> LedgerError {
    LedgerError::Validation(format!(
        "product {product_id} has variants, a variant key is required"
    ))
}

/// Apply one mutation inside the caller's transaction
pub async fn apply(
    conn: &mut SqliteConnection,
    mutation: &StockMutation,
    default_threshold: i64,
) -> Result<MutationOutcome, LedgerError> {
    mutation.validate()?;
    let product_id = mutation.product_id;
    let variant_key = mutation.variant_key.as_deref();
    let now = shared::util::now_millis();

    let record = match inventory::lock_by_key(&mut *conn, product_id, variant_key).await? {
        Some(record) => {
            // product-level record left over from before variants were added
            if variant_key.is_none() {
                ensure_catalog_entry(&mut *conn, product_id, None).await?;
            }
            record
        }
        None => {
            if let QuantityChange::Delta(d) = mutation.change
                && d < 0
            {
                ensure_catalog_entry(&mut *conn, product_id, variant_key).await?;
                return Err(LedgerError::InsufficientInventory {
                    product_id,
                    variant_key: mutation.variant_key.clone(),
                    product_name: display_name(&mut *conn, product_id, variant_key).await?,
                    available: 0,
                    requested: -d,
                });
            }
            ensure_catalog_entry(&mut *conn, product_id, variant_key).await?;
            let threshold = mutation.low_stock_threshold.unwrap_or(default_threshold);
            let record =
                inventory::insert(&mut *conn, product_id, variant_key, threshold, now).await?;
            tracing::info!(product_id, variant_key = ?variant_key, threshold, "Inventory record created");
            record
        }
    };

    let previous = record.quantity;
    let new_quantity = match mutation.change {
        QuantityChange::Delta(d) => previous
            .checked_add(d)
            .ok_or_else(|| LedgerError::InvalidQuantity(format!("quantity overflow: {previous} + {d}")))?,
        QuantityChange::Set(q) => q,
    };
    if new_quantity < 0 {
        return Err(LedgerError::InsufficientInventory {
            product_id,
            variant_key: mutation.variant_key.clone(),
            product_name: display_name(&mut *conn, product_id, variant_key).await?,
            available: previous,
            requested: previous - new_quantity,
        });
    }

    let threshold = mutation
        .low_stock_threshold
        .unwrap_or(record.low_stock_threshold);
    let updated = inventory::update_quantity(
        &mut *conn,
        record.id,
        record.version,
        new_quantity,
        threshold,
        now,
    )
    .await?;

    let entry = inventory_log::append(
        &mut *conn,
        NewLogEntry {
            inventory_id: record.id,
            product_id,
            variant_key,
            log_type: mutation.log_type,
            previous_quantity: previous,
            new_quantity,
            reason: mutation.reason.as_deref(),
            performed_by: mutation.performed_by.as_deref(),
            reference: mutation.reference.as_deref(),
            created_at: now,
        },
    )
    .await?;

    let mirrored = match variant_key {
        Some(key) => catalog::set_variant_stock(&mut *conn, product_id, key, new_quantity).await,
        None => catalog::set_product_stock(&mut *conn, product_id, new_quantity).await,
    };
    match mirrored {
        Ok(()) => {}
        Err(RepoError::NotFound(_)) => {
            return Err(LedgerError::ProductNotFound {
                product_id,
                variant_key: mutation.variant_key.clone(),
            });
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        product_id,
        variant_key = ?variant_key,
        log_type = %mutation.log_type,
        delta = new_quantity - previous,
        previous,
        new = new_quantity,
        reference = ?mutation.reference,
        low_stock = updated.is_low_stock,
        "Stock mutated"
    );

    Ok(MutationOutcome {
        record: updated,
        entry,
    })
}

/// Inventory service: reads plus single-record mutations in their own transaction
#[derive(Debug, Clone)]
pub struct StockMutator {
    pool: SqlitePool,
    retry: RetryPolicy,
    default_threshold: i64,
    reconciliation: Arc<ReconciliationService>,
}

impl StockMutator {
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

    pub fn default_threshold(&self) -> i64 {
        self.default_threshold
    }

    pub async fn get_record(
        &self,
        product_id: i64,
        variant_key: Option<&str>,
    ) -> Result<InventoryRecord, LedgerError> {
        inventory::find_by_key(&self.pool, product_id, variant_key)
            .await?
            .ok_or_else(|| LedgerError::RecordNotFound {
                product_id,
                variant_key: variant_key.map(str::to_string),
            })
    }

    pub async fn list(&self, low_stock_only: bool) -> Result<Vec<InventoryRecord>, LedgerError> {
        Ok(inventory::find_all(&self.pool, low_stock_only).await?)
    }

    /// Apply one mutation in its own transaction, retrying lost races
    pub async fn mutate(&self, mutation: StockMutation) -> Result<MutationOutcome, LedgerError> {
        mutation.validate()?;
        let pool = &self.pool;
        let mutation = &mutation;
        let default_threshold = self.default_threshold;
        self.retry
            .run("stock_mutation", || async move {
                let mut tx = pool.begin().await?;
                let outcome = apply(&mut tx, mutation, default_threshold).await?;
                tx.commit().await?;
                Ok(outcome)
            })
            .await
    }

    /// Restock; creates the record on first use
    pub async fn add_stock(
        &self,
        product_id: i64,
        variant_key: Option<String>,
        req: AddStockRequest,
        performed_by: Option<String>,
    ) -> Result<MutationOutcome, LedgerError> {
        if req.quantity <= 0 {
            return Err(LedgerError::InvalidQuantity(format!(
                "quantity must be positive, got {}",
                req.quantity
            )));
        }
        let mutation = StockMutation::delta(
            product_id,
            normalize_variant_key(variant_key),
            req.quantity,
            InventoryLogType::Added,
        )
        .with_threshold(req.low_stock_threshold)
        .with_reason(req.reason)
        .with_actor(performed_by);
        self.mutate(mutation).await
    }

    /// Set an absolute quantity; always logs one `adjusted` entry, even for delta 0
    pub async fn adjust(
        &self,
        product_id: i64,
        variant_key: Option<String>,
        req: AdjustInventoryRequest,
        performed_by: Option<String>,
    ) -> Result<MutationOutcome, LedgerError> {
        if req.quantity < 0 {
            return Err(LedgerError::InvalidQuantity(format!(
                "quantity must not be negative, got {}",
                req.quantity
            )));
        }
        if req.reason.trim().is_empty() {
            return Err(LedgerError::Validation("reason must not be empty".into()));
        }
        let mutation = StockMutation::set(product_id, normalize_variant_key(variant_key), req.quantity)
            .with_threshold(req.low_stock_threshold)
            .with_reason(Some(req.reason))
            .with_actor(performed_by);
        self.mutate(mutation).await
    }

    /// Replay the record's log from zero and compare with the stored quantity
    pub async fn verify_ledger(
        &self,
        product_id: i64,
        variant_key: Option<&str>,
    ) -> Result<LedgerVerification, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let record = inventory::find_by_key(&mut *tx, product_id, variant_key)
            .await?
            .ok_or_else(|| LedgerError::RecordNotFound {
                product_id,
                variant_key: variant_key.map(str::to_string),
            })?;
        let entries = inventory_log::find_for_key(&mut *tx, product_id, variant_key).await?;
        tx.commit().await?;

        let mut replayed = 0_i64;
        let mut chain_intact = true;
        for entry in &entries {
            if entry.previous_quantity != replayed
                || entry.new_quantity - entry.previous_quantity != entry.quantity_delta
            {
                chain_intact = false;
            }
            replayed += entry.quantity_delta;
        }

        let consistent = chain_intact && replayed == record.quantity;
        if !consistent {
            self.reconciliation.raise(
                ReconciliationAlert::new(
                    AlertKind::LedgerMismatch,
                    "Inventory ledger replay does not match record",
                )
                .with_details(serde_json::json!({
                    "product_id": product_id,
                    "variant_key": variant_key,
                    "record_quantity": record.quantity,
                    "replayed_quantity": replayed,
                    "chain_intact": chain_intact,
                })),
            );
        }

        Ok(LedgerVerification {
            product_id,
            variant_key: record.variant_key.clone(),
            record_quantity: record.quantity,
            replayed_quantity: replayed,
            entry_count: entries.len() as i64,
            consistent,
            low_stock_consistent: record.low_stock_consistent(),
        })
    }

    pub async fn query_logs(
        &self,
        filter: &LogFilter,
        page: i64,
        limit: i64,
    ) -> Result<InventoryLogPage, LedgerError> {
        Ok(inventory_log::query(&self.pool, filter, page, limit).await?)
    }
}
