//! Reconciliation service
//!
//! `raise()` is synchronous: it logs at ERROR, then hands the alert to the background worker.
//! When the channel is unavailable the alert is persisted directly from a spawned task.

use std::sync::Arc;

use serde_json::Value;
use shared::models::{ReconciliationIssue, ReconciliationStatus};
use sqlx::SqlitePool;
use tokio::sync::mpsc;

use crate::db::repository::{RepoResult, reconciliation};
use crate::fulfillment::Channel;

/// Alert kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// The explicit rollback after a failure failed
    RollbackFailed,
    /// Commit returned an error; outcome unknown
    CommitFailed,
    /// Order persist failed after stock was decremented (transaction rolled back)
    PersistFailed,
    /// Log replay disagrees with the record quantity
    LedgerMismatch,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RollbackFailed => "rollback_failed",
            Self::CommitFailed => "commit_failed",
            Self::PersistFailed => "persist_failed",
            Self::LedgerMismatch => "ledger_mismatch",
        }
    }
}

/// Alert handed to the worker
#[derive(Debug, Clone)]
pub struct ReconciliationAlert {
    pub kind: AlertKind,
    pub channel: Option<Channel>,
    pub order_reference: Option<String>,
    pub message: String,
    /// Context such as stock changes that may have applied
    pub details: Value,
    pub created_at: i64,
}

impl ReconciliationAlert {
    pub fn new(kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            channel: None,
            order_reference: None,
            message: message.into(),
            details: Value::Object(Default::default()),
            created_at: shared::util::now_millis(),
        }
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.order_reference = Some(reference.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub(crate) fn into_new_issue(self) -> reconciliation::NewIssue {
        reconciliation::NewIssue {
            kind: self.kind.as_str().to_string(),
            channel: self.channel.map(|c| c.as_str().to_string()),
            order_reference: self.order_reference,
            message: self.message,
            details: self.details,
            created_at: self.created_at,
        }
    }
}

/// Reconciliation service
pub struct ReconciliationService {
    pool: SqlitePool,
    tx: mpsc::Sender<ReconciliationAlert>,
}

impl std::fmt::Debug for ReconciliationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationService").finish_non_exhaustive()
    }
}

impl ReconciliationService {
    pub fn new(
        pool: SqlitePool,
        buffer_size: usize,
    ) -> (Arc<Self>, mpsc::Receiver<ReconciliationAlert>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        (Arc::new(Self { pool, tx }), rx)
    }

    /// Raise an alert (never blocks the caller)
    pub fn raise(&self, alert: ReconciliationAlert) {
        tracing::error!(
            target: "reconciliation",
            kind = alert.kind.as_str(),
            channel = ?alert.channel.map(|c| c.as_str()),
            order_reference = ?alert.order_reference,
            details = %alert.details,
            "{}",
            alert.message
        );

        if let Err(e) = self.tx.try_send(alert) {
            let alert = match e {
                mpsc::error::TrySendError::Full(alert) | mpsc::error::TrySendError::Closed(alert) => {
                    alert
                }
            };
            tracing::warn!(
                target: "reconciliation",
                "Reconciliation worker unavailable, persisting alert directly"
            );
            let pool = self.pool.clone();
            tokio::spawn(async move {
                if let Err(e) = reconciliation::create(&pool, &alert.into_new_issue()).await {
                    tracing::error!(target: "reconciliation", error = %e, "Failed to persist reconciliation issue");
                }
            });
        }
    }

    pub async fn list(
        &self,
        status: Option<ReconciliationStatus>,
    ) -> RepoResult<Vec<ReconciliationIssue>> {
        reconciliation::list(&self.pool, status).await
    }

    pub async fn resolve(
        &self,
        id: i64,
        note: &str,
        resolved_by: &str,
    ) -> RepoResult<ReconciliationIssue> {
        let issue =
            reconciliation::resolve(&self.pool, id, note, resolved_by, shared::util::now_millis())
                .await?;
        tracing::info!(
            target: "reconciliation",
            issue_id = id,
            resolved_by,
            "Reconciliation issue resolved"
        );
        Ok(issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::RepoError;
    use crate::reconciliation::ReconciliationWorker;
    use std::time::Duration;

    async fn wait_for_issues(service: &ReconciliationService, n: usize) -> Vec<ReconciliationIssue> {
        for _ in 0..100 {
            let issues = service.list(None).await.unwrap();
            if issues.len() >= n {
                return issues;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("reconciliation issues were not persisted");
    }

    #[tokio::test]
    async fn test_raise_persists_through_worker() {
        let db = DbService::open_in_memory().await.unwrap();
        let (service, rx) = ReconciliationService::new(db.pool.clone(), 16);
        tokio::spawn(ReconciliationWorker::new(db.pool.clone()).run(rx));

        service.raise(
            ReconciliationAlert::new(AlertKind::CommitFailed, "commit failed for order 42")
                .with_channel(Channel::Pos)
                .with_reference("42")
                .with_details(serde_json::json!({ "stockChanges": [] })),
        );

        let issues = wait_for_issues(&service, 1).await;
        assert_eq!(issues[0].kind, "commit_failed");
        assert_eq!(issues[0].channel.as_deref(), Some("pos"));
        assert_eq!(issues[0].order_reference.as_deref(), Some("42"));
        assert_eq!(issues[0].status, ReconciliationStatus::Open);
    }

    #[tokio::test]
    async fn test_raise_without_worker_still_persists() {
        let db = DbService::open_in_memory().await.unwrap();
        let (service, rx) = ReconciliationService::new(db.pool.clone(), 1);
        drop(rx);

        service.raise(ReconciliationAlert::new(AlertKind::RollbackFailed, "rollback failed"));
        let issues = wait_for_issues(&service, 1).await;
        assert_eq!(issues[0].kind, "rollback_failed");
    }

    #[tokio::test]
    async fn test_resolve_once() {
        let db = DbService::open_in_memory().await.unwrap();
        let (service, rx) = ReconciliationService::new(db.pool.clone(), 16);
        tokio::spawn(ReconciliationWorker::new(db.pool.clone()).run(rx));

        service.raise(ReconciliationAlert::new(AlertKind::PersistFailed, "persist failed"));
        let issues = wait_for_issues(&service, 1).await;
        let id = issues[0].id;

        let resolved = service.resolve(id, "stock recounted", "admin-1").await.unwrap();
        assert_eq!(resolved.status, ReconciliationStatus::Resolved);
        assert_eq!(resolved.resolved_by.as_deref(), Some("admin-1"));

        assert!(matches!(
            service.resolve(id, "again", "admin-1").await,
            Err(RepoError::Duplicate(_))
        ));
        assert!(matches!(
            service.resolve(1, "missing", "admin-1").await,
            Err(RepoError::NotFound(_))
        ));
        assert!(service
            .list(Some(ReconciliationStatus::Open))
            .await
            .unwrap()
            .is_empty());
    }
}
