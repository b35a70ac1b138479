//! Reconciliation Issue Model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum ReconciliationStatus {
    Open,
    Resolved,
}

/// Ledger/order divergence waiting for an operator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationIssue {
    pub id: i64,
    /// e.g. `rollback_failed`, `commit_failed`, `persist_failed`
    pub kind: String,
    /// `web` or `pos`
    pub channel: Option<String>,
    /// Order id the failed unit of work was creating or changing
    pub order_reference: Option<String>,
    pub message: String,
    /// JSON object with the stock changes that may have been applied
    #[cfg_attr(feature = "db", sqlx(json))]
    pub details: serde_json::Value,
    pub status: ReconciliationStatus,
    pub resolution_note: Option<String>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<i64>,
    pub created_at: i64,
}

/// Resolve payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveIssueRequest {
    pub note: String,
}
