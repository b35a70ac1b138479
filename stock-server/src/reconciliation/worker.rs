//! Reconciliation background worker
//!
//! Consumes alerts from the mpsc channel and writes them to reconciliation_issue.
//! Exits when the channel closes.

use sqlx::SqlitePool;

use super::service::ReconciliationAlert;
use crate::db::repository::reconciliation;

pub struct ReconciliationWorker {
    pool: SqlitePool,
}

impl ReconciliationWorker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run the worker until the channel closes
    pub async fn run(self, mut rx: tokio::sync::mpsc::Receiver<ReconciliationAlert>) {
        tracing::info!("Reconciliation worker started");

        while let Some(alert) = rx.recv().await {
            match reconciliation::create(&self.pool, &alert.into_new_issue()).await {
                Ok(issue) => {
                    tracing::info!(
                        target: "reconciliation",
                        issue_id = issue.id,
                        kind = %issue.kind,
                        "Reconciliation issue recorded"
                    );
                }
                Err(e) => {
                    tracing::error!(target: "reconciliation", error = %e, "Failed to write reconciliation issue");
                }
            }
        }

        tracing::info!("Reconciliation channel closed, worker stopping");
    }
}
